use tracing::debug;

use crate::model::{ExtractionCounts, HeadingContext, ParagraphRecord, TextBlock, label_or_unset};

use super::classify::{BlockClass, BlockClassifier};
use super::normalize::TextNormalizer;

#[derive(Debug)]
struct InFlightParagraph {
    record: ParagraphRecord,
    buffer: Vec<String>,
}

/// Heading context and paragraph accumulation for one extraction run.
///
/// Blocks must be fed in reading order; a run is never reused for another
/// document.
#[derive(Debug)]
pub struct ExtractionRun<'a> {
    classifier: &'a BlockClassifier,
    normalizer: &'a TextNormalizer,
    context: HeadingContext,
    in_flight: Option<InFlightParagraph>,
    records: Vec<ParagraphRecord>,
    counts: ExtractionCounts,
}

impl<'a> ExtractionRun<'a> {
    pub fn new(classifier: &'a BlockClassifier, normalizer: &'a TextNormalizer) -> Self {
        Self {
            classifier,
            normalizer,
            context: HeadingContext::default(),
            in_flight: None,
            records: Vec::new(),
            counts: ExtractionCounts::default(),
        }
    }

    #[cfg(test)]
    pub fn context(&self) -> &HeadingContext {
        &self.context
    }

    #[cfg(test)]
    pub fn has_paragraph_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn counts_mut(&mut self) -> &mut ExtractionCounts {
        &mut self.counts
    }

    pub fn process_block(&mut self, block: &TextBlock, printed_page: u32) {
        self.counts.blocks_seen += 1;

        match self.classifier.classify(block) {
            BlockClass::ChapterTitle => {
                self.counts.chapter_titles += 1;
                self.context.start_chapter(&block.text);
                debug!(page = printed_page, title = %block.text, "chapter title");
            }
            BlockClass::SubsectionHeading { chapter_id }
            | BlockClass::SectionHeading { chapter_id } => {
                self.flush();
                self.counts.headings += 1;
                self.context.enter_heading(chapter_id, &block.text);
                debug!(
                    page = printed_page,
                    chapter_id,
                    heading = %block.text,
                    "heading"
                );
            }
            BlockClass::FootnoteOrTable => {
                self.counts.footnote_or_table_blocks_discarded += 1;
            }
            BlockClass::ParagraphStart { number, body } => {
                self.flush();
                self.counts.paragraphs_opened += 1;
                debug!(
                    page = printed_page,
                    paragraph = number,
                    chapter_id = ?self.context.chapter_id,
                    "paragraph start"
                );

                let mut buffer = Vec::new();
                if !body.is_empty() {
                    buffer.push(body.to_string());
                }
                self.in_flight = Some(InFlightParagraph {
                    record: ParagraphRecord {
                        title: label_or_unset(self.context.title.as_deref()),
                        section: label_or_unset(self.context.section.as_deref()),
                        subsection: label_or_unset(self.context.subsection.as_deref()),
                        paragraph_number: number.to_string(),
                        page: printed_page,
                        text: String::new(),
                    },
                    buffer,
                });
            }
            BlockClass::Continuation => match self.in_flight.as_mut() {
                Some(paragraph) => paragraph.buffer.push(block.text.clone()),
                None => self.counts.stray_blocks_discarded += 1,
            },
        }
    }

    /// Finalizes the in-flight paragraph, if any. Paragraphs whose text
    /// normalizes to nothing are dropped.
    pub fn flush(&mut self) {
        let Some(InFlightParagraph { mut record, buffer }) = self.in_flight.take() else {
            return;
        };

        let text = self.normalizer.normalize(&buffer.join(" "));
        if text.is_empty() {
            self.counts.empty_paragraphs_dropped += 1;
            debug!(
                page = record.page,
                paragraph = %record.paragraph_number,
                "dropping empty paragraph"
            );
            return;
        }

        record.text = text;
        self.counts.paragraphs_emitted += 1;
        self.records.push(record);
    }

    pub fn finish(mut self) -> (Vec<ParagraphRecord>, ExtractionCounts) {
        self.flush();
        (self.records, self.counts)
    }
}
