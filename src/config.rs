use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::cli::Cli;

/// Document-specific calibration for block classification and layout grouping.
///
/// The defaults match the typography of the ECB guide to internal models:
/// 20 pt chapter titles, 14 pt numbered headings, 11 pt body text and 7 pt
/// footnotes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub running_title: String,
    pub title_min_pt: f64,
    pub heading_min_pt: f64,
    pub footnote_max_pt: f64,
    pub title_max_chars: usize,
    pub table_prefixes: Vec<String>,
    pub block_gap_factor: f64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            running_title: "ECB guide to internal models".to_string(),
            title_min_pt: 18.0,
            heading_min_pt: 12.5,
            footnote_max_pt: 8.5,
            title_max_chars: 200,
            table_prefixes: vec![
                "Table ".to_string(),
                "Relevant regulatory references".to_string(),
            ],
            block_gap_factor: 1.4,
        }
    }
}

impl ExtractorConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse calibration file {}", path.display()))
    }

    /// Builds the effective config: calibration file (or defaults), then CLI overrides.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.calibration {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };

        if let Some(title) = &cli.running_title {
            config.running_title = title.clone();
        }
        if let Some(value) = cli.title_min_pt {
            config.title_min_pt = value;
        }
        if let Some(value) = cli.heading_min_pt {
            config.heading_min_pt = value;
        }
        if let Some(value) = cli.footnote_max_pt {
            config.footnote_max_pt = value;
        }
        if !cli.table_prefixes.is_empty() {
            config.table_prefixes = cli.table_prefixes.clone();
        }
        if let Some(value) = cli.block_gap_factor {
            config.block_gap_factor = value;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.running_title.trim().is_empty() {
            bail!("running title must not be empty");
        }

        for (name, value) in [
            ("title_min_pt", self.title_min_pt),
            ("heading_min_pt", self.heading_min_pt),
            ("footnote_max_pt", self.footnote_max_pt),
            ("block_gap_factor", self.block_gap_factor),
        ] {
            if !value.is_finite() || value < 0.0 {
                bail!("{name} must be a finite non-negative number, got {value}");
            }
        }

        if self.footnote_max_pt > self.heading_min_pt || self.heading_min_pt > self.title_min_pt {
            bail!(
                "font thresholds must satisfy footnote_max_pt <= heading_min_pt <= title_min_pt (got {} / {} / {})",
                self.footnote_max_pt,
                self.heading_min_pt,
                self.title_min_pt
            );
        }

        if self.table_prefixes.iter().any(|prefix| prefix.is_empty()) {
            bail!("table prefixes must not be empty strings");
        }

        Ok(())
    }
}
