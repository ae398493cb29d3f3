use anyhow::{Context, Result};
use regex::Regex;
use tracing::{debug, warn};

use crate::model::{LayoutBlock, PageIndexMap};

use super::layout::PageLayoutSource;

/// Recovers printed page numbers from the document's running header.
#[derive(Debug)]
pub struct PageIndexResolver {
    header_number: Regex,
}

#[derive(Debug, Default)]
pub struct PageIndexStats {
    pub header_fallback_pages: usize,
    pub printed_page_collisions: usize,
}

impl PageIndexResolver {
    pub fn new(running_title: &str) -> Result<Self> {
        Ok(Self {
            header_number: Regex::new(&format!(
                r"{}\s+–\s+.*?\s+(\d+)\s*$",
                regex::escape(running_title)
            ))
            .context("failed to compile running header regex")?,
        })
    }

    pub fn printed_page_number(&self, blocks: &[LayoutBlock]) -> Option<u32> {
        blocks.iter().find_map(|block| {
            self.header_number
                .captures(&block.text)
                .and_then(|captures| captures.get(1))
                .and_then(|value| value.as_str().parse::<u32>().ok())
        })
    }

    /// Builds the printed-number map over every physical page. A page without
    /// a readable header falls back to `physical_index + 1`; when two pages
    /// claim the same printed number the later one wins.
    pub fn build_map(&self, source: &dyn PageLayoutSource) -> (PageIndexMap, PageIndexStats) {
        let mut map = PageIndexMap::new();
        let mut stats = PageIndexStats::default();

        for physical_index in 0..source.page_count() {
            let printed = match self.printed_page_number(source.page_blocks(physical_index)) {
                Some(number) => number,
                None => {
                    stats.header_fallback_pages += 1;
                    let fallback = u32::try_from(physical_index + 1).unwrap_or(u32::MAX);
                    debug!(
                        physical_index,
                        printed_page = fallback,
                        "running header not found; using physical position"
                    );
                    fallback
                }
            };

            if let Some(previous) = map.insert(printed, physical_index) {
                stats.printed_page_collisions += 1;
                warn!(
                    printed_page = printed,
                    previous_physical_index = previous,
                    physical_index,
                    "printed page number resolved twice; keeping later page"
                );
            }
        }

        (map, stats)
    }
}
