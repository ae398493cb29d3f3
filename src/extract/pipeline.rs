use anyhow::Result;
use tracing::{debug, info, warn};

use crate::config::ExtractorConfig;
use crate::model::{
    ExtractionCounts, LayoutBlock, LayoutDumpPage, PageIndexMap, ParagraphRecord, TextBlock,
};

use super::classify::BlockClassifier;
use super::layout::PageLayoutSource;
use super::normalize::TextNormalizer;
use super::page_index::PageIndexResolver;
use super::state::ExtractionRun;

#[derive(Debug)]
pub struct Extraction {
    pub records: Vec<ParagraphRecord>,
    pub page_index: PageIndexMap,
    pub counts: ExtractionCounts,
    pub warnings: Vec<String>,
}

/// Normalizes a page's raw blocks, dropping any that end up empty.
pub fn collect_blocks(raw_blocks: &[LayoutBlock], normalizer: &TextNormalizer) -> Vec<TextBlock> {
    raw_blocks
        .iter()
        .filter_map(|block| {
            let text = normalizer.normalize(&block.text);
            if text.is_empty() {
                return None;
            }
            Some(TextBlock {
                text,
                max_font_size: block.max_font_size,
            })
        })
        .collect()
}

#[derive(Debug)]
pub struct ParagraphExtractor {
    normalizer: TextNormalizer,
    classifier: BlockClassifier,
    resolver: PageIndexResolver,
}

impl ParagraphExtractor {
    pub fn new(config: &ExtractorConfig) -> Result<Self> {
        Ok(Self {
            normalizer: TextNormalizer::new(&config.running_title)?,
            classifier: BlockClassifier::new(config)?,
            resolver: PageIndexResolver::new(&config.running_title)?,
        })
    }

    /// Scans the inclusive printed-page range in reading order and returns the
    /// emitted paragraphs. Printed pages missing from the document are skipped.
    pub fn extract(&self, source: &dyn PageLayoutSource, start: u32, end: u32) -> Extraction {
        let (page_index, index_stats) = self.resolver.build_map(source);
        let mut warnings = Vec::new();
        let mut run = ExtractionRun::new(&self.classifier, &self.normalizer);
        let mut present = Vec::new();

        if start > end {
            warn!(start, end, "empty printed page range");
            warnings.push(format!("printed page range {start}..={end} is empty"));
        } else {
            for (&printed_page, &physical_index) in page_index.range(start..=end) {
                let blocks = collect_blocks(source.page_blocks(physical_index), &self.normalizer);
                run.counts_mut().pages_scanned += 1;
                present.push(printed_page);
                for block in &blocks {
                    run.process_block(block, printed_page);
                }
            }
        }

        let gaps = missing_ranges(&present, start, end);
        let skipped: u64 = gaps.iter().map(|&(first, last)| u64::from(last - first) + 1).sum();
        for &(first, last) in &gaps {
            debug!(first, last, "printed pages not present in document");
        }

        let (records, mut counts) = run.finish();
        counts.pages_skipped = usize::try_from(skipped).unwrap_or(usize::MAX);
        counts.physical_page_count = source.page_count();
        counts.header_fallback_pages = index_stats.header_fallback_pages;
        counts.printed_page_collisions = index_stats.printed_page_collisions;

        if skipped > 0 {
            warnings.push(format!(
                "{skipped} printed pages in range had no matching page: {}",
                summarize_ranges(&gaps)
            ));
        }

        info!(
            pages_scanned = counts.pages_scanned,
            pages_skipped = counts.pages_skipped,
            paragraphs = records.len(),
            "extraction finished"
        );

        Extraction {
            records,
            page_index,
            counts,
            warnings,
        }
    }

    /// Per-page normalized blocks with their resolved printed numbers.
    pub fn layout_dump(
        &self,
        source: &dyn PageLayoutSource,
        page_index: &PageIndexMap,
    ) -> Vec<LayoutDumpPage> {
        let mut printed_by_physical = vec![None; source.page_count()];
        for (&printed, &physical) in page_index {
            if let Some(slot) = printed_by_physical.get_mut(physical) {
                *slot = Some(printed);
            }
        }

        (0..source.page_count())
            .map(|physical_index| LayoutDumpPage {
                physical_index,
                printed_page: printed_by_physical[physical_index].unwrap_or_else(|| {
                    self.resolver
                        .printed_page_number(source.page_blocks(physical_index))
                        .unwrap_or(u32::try_from(physical_index + 1).unwrap_or(u32::MAX))
                }),
                blocks: collect_blocks(source.page_blocks(physical_index), &self.normalizer),
            })
            .collect()
    }
}

/// Inclusive runs of `start..=end` not covered by `present`, which must be
/// sorted ascending and lie inside the range.
fn missing_ranges(present: &[u32], start: u32, end: u32) -> Vec<(u32, u32)> {
    if start > end {
        return Vec::new();
    }

    let mut gaps = Vec::new();
    let mut next_expected = Some(start);
    for &page in present {
        if let Some(expected) = next_expected
            && expected < page
        {
            gaps.push((expected, page - 1));
        }
        next_expected = page.checked_add(1);
    }
    if let Some(expected) = next_expected
        && expected <= end
    {
        gaps.push((expected, end));
    }
    gaps
}

/// Renders page runs compactly, e.g. `1-3, 7`.
fn summarize_ranges(ranges: &[(u32, u32)]) -> String {
    ranges
        .iter()
        .map(|&(first, last)| {
            if first == last {
                first.to_string()
            } else {
                format!("{first}-{last}")
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}
