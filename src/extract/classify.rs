use anyhow::{Context, Result};
use regex::Regex;

use crate::config::ExtractorConfig;
use crate::model::TextBlock;

/// The role a block plays in the document, decided from font size and shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockClass<'t> {
    ChapterTitle,
    /// `1.2 Label` or `A.1 Label`.
    SubsectionHeading { chapter_id: &'t str },
    /// `3 Label words` or `A Label words`, printed without a separate subsection line.
    SectionHeading { chapter_id: &'t str },
    FootnoteOrTable,
    ParagraphStart { number: &'t str, body: &'t str },
    Continuation,
}

#[derive(Debug)]
pub struct BlockClassifier {
    title_min_pt: f64,
    heading_min_pt: f64,
    footnote_max_pt: f64,
    title_max_chars: usize,
    table_prefixes: Vec<String>,
    numeric_subsection: Regex,
    alpha_subsection: Regex,
    numeric_section: Regex,
    alpha_section: Regex,
    paragraph_start: Regex,
}

impl BlockClassifier {
    pub fn new(config: &ExtractorConfig) -> Result<Self> {
        Ok(Self {
            title_min_pt: config.title_min_pt,
            heading_min_pt: config.heading_min_pt,
            footnote_max_pt: config.footnote_max_pt,
            title_max_chars: config.title_max_chars,
            table_prefixes: config.table_prefixes.clone(),
            numeric_subsection: Regex::new(r"^\s*(\d+)\.(\d+)\s+(.+)$")
                .context("failed to compile numeric subsection regex")?,
            alpha_subsection: Regex::new(r"^\s*([A-Z])\.(\d+)\s+(.+)$")
                .context("failed to compile alphabetic subsection regex")?,
            numeric_section: Regex::new(r"^\s*(\d+)\s+(.+)$")
                .context("failed to compile numeric section regex")?,
            alpha_section: Regex::new(r"^\s*([A-Z])\s+(.+)$")
                .context("failed to compile alphabetic section regex")?,
            paragraph_start: Regex::new(r"^\s*(\d+)\.\s+")
                .context("failed to compile paragraph start regex")?,
        })
    }

    /// Applies the classification rules in priority order; the first match wins.
    pub fn classify<'t>(&self, block: &'t TextBlock) -> BlockClass<'t> {
        let text = block.text.as_str();
        let size = block.max_font_size;

        if size >= self.title_min_pt
            && text.chars().count() < self.title_max_chars
            && text.to_lowercase() != "contents"
        {
            return BlockClass::ChapterTitle;
        }

        if size >= self.heading_min_pt {
            if let Some(class) = self.heading_class(text) {
                return class;
            }
        }

        if size < self.footnote_max_pt || self.looks_like_table_heading(text) {
            return BlockClass::FootnoteOrTable;
        }

        if let Some(captures) = self.paragraph_start.captures(text) {
            if let (Some(whole), Some(number)) = (captures.get(0), captures.get(1)) {
                return BlockClass::ParagraphStart {
                    number: number.as_str(),
                    body: text[whole.end()..].trim(),
                };
            }
        }

        BlockClass::Continuation
    }

    fn heading_class<'t>(&self, text: &'t str) -> Option<BlockClass<'t>> {
        let leading_id = |regex: &Regex| {
            regex
                .captures(text)
                .and_then(|captures| captures.get(1))
                .map(|value| value.as_str())
        };
        let has_label_words = text.split_whitespace().count() > 2;

        if let Some(chapter_id) = leading_id(&self.numeric_subsection) {
            return Some(BlockClass::SubsectionHeading { chapter_id });
        }
        if let Some(chapter_id) = leading_id(&self.alpha_subsection) {
            return Some(BlockClass::SubsectionHeading { chapter_id });
        }
        if has_label_words {
            if let Some(chapter_id) = leading_id(&self.numeric_section) {
                return Some(BlockClass::SectionHeading { chapter_id });
            }
            if let Some(chapter_id) = leading_id(&self.alpha_section) {
                return Some(BlockClass::SectionHeading { chapter_id });
            }
        }

        None
    }

    fn looks_like_table_heading(&self, text: &str) -> bool {
        self.table_prefixes
            .iter()
            .any(|prefix| text.starts_with(prefix.as_str()))
    }
}
