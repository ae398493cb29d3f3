use std::collections::HashMap;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, bail};
use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use tracing::{debug, info};

use crate::model::LayoutBlock;

/// Lines whose tops differ by less than this fraction of the line height are
/// treated as one visual line (superscripts, inline font changes).
const SAME_LINE_TOLERANCE: f64 = 0.5;

/// Lines of one block must share a font size within this many points.
const FONT_SIZE_TOLERANCE: f64 = 0.5;

/// Random access to the raw layout blocks of each physical page.
pub trait PageLayoutSource {
    fn page_count(&self) -> usize;

    /// Blocks of one physical page in reading order. Out-of-range indices yield no blocks.
    fn page_blocks(&self, physical_index: usize) -> &[LayoutBlock];
}

impl PageLayoutSource for Vec<Vec<LayoutBlock>> {
    fn page_count(&self) -> usize {
        self.len()
    }

    fn page_blocks(&self, physical_index: usize) -> &[LayoutBlock] {
        self.get(physical_index).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Page layout of a whole PDF, read from `pdftohtml -xml`.
#[derive(Debug, Default)]
pub struct PdfLayout {
    pages: Vec<Vec<LayoutBlock>>,
}

impl PageLayoutSource for PdfLayout {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_blocks(&self, physical_index: usize) -> &[LayoutBlock] {
        self.pages
            .get(physical_index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl PdfLayout {
    pub fn load(pdf_path: &Path, block_gap_factor: f64) -> Result<Self> {
        let xml = run_pdftohtml(pdf_path)?;
        let layout = Self::from_xml(&xml, block_gap_factor)
            .with_context(|| format!("failed to parse pdftohtml output for {}", pdf_path.display()))?;

        info!(
            path = %pdf_path.display(),
            pages = layout.page_count(),
            "loaded page layout"
        );
        Ok(layout)
    }

    pub fn from_xml(xml: &str, block_gap_factor: f64) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut font_sizes: HashMap<String, f64> = HashMap::new();
        let mut pages = Vec::new();
        let mut page_lines: Option<Vec<PendingLine>> = None;
        let mut current: Option<PendingLine> = None;

        loop {
            let position = reader.buffer_position();
            let event = reader
                .read_event()
                .with_context(|| format!("malformed pdftohtml xml near byte {position}"))?;

            match event {
                Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"fontspec" => {
                    record_fontspec(&e, &mut font_sizes);
                }
                Event::Start(e) if e.name().as_ref() == b"page" => {
                    page_lines = Some(Vec::new());
                }
                Event::Empty(e) if e.name().as_ref() == b"page" => {
                    pages.push(Vec::new());
                }
                Event::Start(e) if e.name().as_ref() == b"text" => {
                    current = Some(PendingLine::from_element(&e));
                }
                Event::Text(e) => {
                    if let Some(line) = current.as_mut() {
                        line.text.push_str(&String::from_utf8_lossy(e.as_ref()));
                    }
                }
                Event::GeneralRef(e) => {
                    if let Some(line) = current.as_mut() {
                        line.push_reference(&String::from_utf8_lossy(e.as_ref()));
                    }
                }
                Event::End(e) if e.name().as_ref() == b"text" => {
                    let (Some(line), Some(lines)) = (current.take(), page_lines.as_mut()) else {
                        continue;
                    };
                    if !line.text.trim().is_empty() {
                        lines.push(line);
                    }
                }
                Event::End(e) if e.name().as_ref() == b"page" => {
                    let lines = page_lines
                        .take()
                        .unwrap_or_default()
                        .into_iter()
                        .map(|line| line.resolve(&font_sizes))
                        .collect();
                    let blocks = group_lines_into_blocks(lines, block_gap_factor);
                    debug!(
                        physical_index = pages.len(),
                        blocks = blocks.len(),
                        "grouped page lines into blocks"
                    );
                    pages.push(blocks);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if pages.is_empty() && !xml.trim().is_empty() {
            bail!("pdftohtml output contained no <page> elements");
        }

        Ok(Self { pages })
    }
}

fn run_pdftohtml(pdf_path: &Path) -> Result<String> {
    if !pdf_path.is_file() {
        bail!("input PDF not found: {}", pdf_path.display());
    }

    let output = Command::new("pdftohtml")
        .arg("-xml")
        .arg("-i")
        .arg("-q")
        .arg("-zoom")
        .arg("1")
        .arg("-stdout")
        .arg(pdf_path)
        .output()
        .with_context(|| format!("failed to execute pdftohtml for {}", pdf_path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "pdftohtml returned non-zero exit status for {}: {}",
            pdf_path.display(),
            stderr.trim()
        );
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

pub fn pdftohtml_version() -> Option<String> {
    let output = Command::new("pdftohtml").arg("-v").output().ok()?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let source = if stdout.trim().is_empty() {
        stderr.trim()
    } else {
        stdout.trim()
    };

    source
        .lines()
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.to_string())
}

#[derive(Debug, Clone, PartialEq)]
struct TextLine {
    top: f64,
    left: f64,
    height: f64,
    font_size: f64,
    text: String,
}

/// A `<text>` element read before its page's font sizes are resolved.
#[derive(Debug, Default)]
struct PendingLine {
    top: f64,
    left: f64,
    height: f64,
    font: String,
    text: String,
}

impl PendingLine {
    fn from_element(element: &BytesStart<'_>) -> Self {
        let mut line = Self::default();
        for attr in element.attributes().flatten() {
            let value = String::from_utf8_lossy(&attr.value);
            match attr.key.as_ref() {
                b"top" => line.top = value.parse().unwrap_or(0.0),
                b"left" => line.left = value.parse().unwrap_or(0.0),
                b"height" => line.height = value.parse().unwrap_or(0.0),
                b"font" => line.font = value.into_owned(),
                _ => {}
            }
        }
        line
    }

    fn push_reference(&mut self, name: &str) {
        // Unknown named entities are dropped.
        if let Ok(resolved) = unescape(&format!("&{name};")) {
            self.text.push_str(&resolved);
        }
    }

    fn resolve(self, font_sizes: &HashMap<String, f64>) -> TextLine {
        TextLine {
            top: self.top,
            left: self.left,
            height: self.height,
            font_size: font_sizes.get(&self.font).copied().unwrap_or(0.0),
            text: self.text,
        }
    }
}

fn record_fontspec(element: &BytesStart<'_>, font_sizes: &mut HashMap<String, f64>) {
    let mut id = None;
    let mut size = None;
    for attr in element.attributes().flatten() {
        match attr.key.as_ref() {
            b"id" => id = Some(String::from_utf8_lossy(&attr.value).into_owned()),
            b"size" => size = String::from_utf8_lossy(&attr.value).parse::<f64>().ok(),
            _ => {}
        }
    }
    if let (Some(id), Some(size)) = (id, size) {
        font_sizes.insert(id, size.max(0.0));
    }
}

#[derive(Debug)]
struct BlockBuilder {
    text: String,
    max_font_size: f64,
    base_font_size: f64,
    top: f64,
    left: f64,
    line_top: f64,
    line_height: f64,
}

impl BlockBuilder {
    fn start(line: TextLine) -> Self {
        Self {
            max_font_size: line.font_size,
            base_font_size: line.font_size,
            top: line.top,
            left: line.left,
            line_top: line.top,
            line_height: line.height,
            text: line.text,
        }
    }

    fn on_same_visual_line(&self, line: &TextLine) -> bool {
        let tolerance = self.line_height.max(line.height) * SAME_LINE_TOLERANCE;
        (line.top - self.line_top).abs() <= tolerance
    }

    fn continues_with(&self, line: &TextLine, block_gap_factor: f64) -> bool {
        let advance = line.top - self.line_top;
        advance > 0.0
            && advance <= self.base_font_size * block_gap_factor
            && (line.font_size - self.base_font_size).abs() <= FONT_SIZE_TOLERANCE
    }

    fn push(&mut self, line: TextLine, separator: char) {
        self.text.push(separator);
        self.text.push_str(&line.text);
        self.max_font_size = self.max_font_size.max(line.font_size);
        if separator == '\n' {
            self.line_top = line.top;
            self.line_height = line.height;
        }
    }

    fn finish(self) -> (f64, f64, LayoutBlock) {
        (
            self.top,
            self.left,
            LayoutBlock::new(self.text, self.max_font_size),
        )
    }
}

/// Groups pdftohtml text lines (in emission order) into blocks and returns
/// them sorted top-to-bottom, left-to-right.
fn group_lines_into_blocks(lines: Vec<TextLine>, block_gap_factor: f64) -> Vec<LayoutBlock> {
    let mut finished: Vec<(f64, f64, LayoutBlock)> = Vec::new();
    let mut current: Option<BlockBuilder> = None;

    for line in lines {
        current = Some(match current.take() {
            Some(mut builder) if builder.on_same_visual_line(&line) => {
                builder.push(line, ' ');
                builder
            }
            Some(mut builder) if builder.continues_with(&line, block_gap_factor) => {
                builder.push(line, '\n');
                builder
            }
            Some(builder) => {
                finished.push(builder.finish());
                BlockBuilder::start(line)
            }
            None => BlockBuilder::start(line),
        });
    }

    if let Some(builder) = current {
        finished.push(builder.finish());
    }

    finished.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
    finished.into_iter().map(|(_, _, block)| block).collect()
}
