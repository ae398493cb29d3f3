use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::ExtractorConfig;

pub const UNSET_LABEL: &str = "N/A";

/// Printed page number (from the running header) to 0-based physical page index.
pub type PageIndexMap = BTreeMap<u32, usize>;

/// One layout block as it comes out of the PDF, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutBlock {
    pub text: String,
    pub max_font_size: f64,
}

impl LayoutBlock {
    pub fn new(text: impl Into<String>, max_font_size: f64) -> Self {
        Self {
            text: text.into(),
            max_font_size,
        }
    }
}

/// A normalized, non-empty block ready for classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextBlock {
    pub text: String,
    pub max_font_size: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadingContext {
    pub title: Option<String>,
    pub section: Option<String>,
    pub subsection: Option<String>,
    pub chapter_id: Option<String>,
}

impl HeadingContext {
    pub fn start_chapter(&mut self, title: &str) {
        self.title = Some(title.to_string());
        self.section = None;
        self.subsection = None;
        self.chapter_id = None;
    }

    pub fn enter_heading(&mut self, chapter_id: &str, heading: &str) {
        self.chapter_id = Some(chapter_id.to_string());
        self.section = Some(label_or_unset(self.title.as_deref()));
        self.subsection = Some(heading.to_string());
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParagraphRecord {
    pub title: String,
    pub section: String,
    pub subsection: String,
    pub paragraph_number: String,
    pub page: u32,
    pub text: String,
}

pub fn label_or_unset(value: Option<&str>) -> String {
    value.unwrap_or(UNSET_LABEL).to_string()
}

/// Joins every record's text the way the wordcloud corpus expects it.
pub fn corpus_text(records: &[ParagraphRecord]) -> String {
    records
        .iter()
        .map(|record| record.text.as_str())
        .collect::<Vec<&str>>()
        .join(" ")
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionCounts {
    pub physical_page_count: usize,
    pub header_fallback_pages: usize,
    pub printed_page_collisions: usize,
    pub pages_scanned: usize,
    pub pages_skipped: usize,
    pub blocks_seen: usize,
    pub chapter_titles: usize,
    pub headings: usize,
    pub footnote_or_table_blocks_discarded: usize,
    pub stray_blocks_discarded: usize,
    pub paragraphs_opened: usize,
    pub paragraphs_emitted: usize,
    pub empty_paragraphs_dropped: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageRange {
    pub start: u32,
    pub end: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractionRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub started_at: String,
    pub updated_at: String,
    pub source_pdf: String,
    pub source_sha256: String,
    pub output_path: String,
    pub page_range: PageRange,
    pub pdftohtml_version: Option<String>,
    pub config: ExtractorConfig,
    pub counts: ExtractionCounts,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LayoutDumpPage {
    pub physical_index: usize,
    pub printed_page: u32,
    pub blocks: Vec<TextBlock>,
}
