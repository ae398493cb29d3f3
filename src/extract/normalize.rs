use anyhow::{Context, Result};
use regex::Regex;

/// Whitespace, hyphenation and running-header cleanup shared by block
/// collection and paragraph flushing.
#[derive(Debug)]
pub struct TextNormalizer {
    hyphen_break: Regex,
    header_strip: Regex,
    whitespace: Regex,
}

impl TextNormalizer {
    pub fn new(running_title: &str) -> Result<Self> {
        Ok(Self {
            hyphen_break: Regex::new(r"-[ \t]*\r?\n[ \t]*")
                .context("failed to compile hyphen break regex")?,
            header_strip: Regex::new(&format!(
                r"{}\s+–\s+.*?\s+\d+\s*",
                regex::escape(running_title)
            ))
            .context("failed to compile running header strip regex")?,
            whitespace: Regex::new(r"\s+").context("failed to compile whitespace regex")?,
        })
    }

    /// Soft hyphens go first, then hyphenated line breaks are joined, then
    /// remaining breaks become spaces. Header stripping repeats until nothing
    /// matches so the result is a fixpoint.
    pub fn normalize(&self, raw: &str) -> String {
        let text = raw.replace('\u{00AD}', "");
        let text = self.hyphen_break.replace_all(&text, "-");
        let text = text.replace("\r\n", " ").replace(['\n', '\r'], " ");

        let mut text = self.whitespace.replace_all(&text, " ").into_owned();
        while self.header_strip.is_match(&text) {
            let stripped = self.header_strip.replace_all(&text, " ");
            text = self.whitespace.replace_all(&stripped, " ").into_owned();
        }
        text.trim().to_string()
    }
}
