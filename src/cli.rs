use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "guide-paragraphs",
    version,
    about = "Extract numbered paragraphs with heading context from a supervisory guide PDF"
)]
pub struct Cli {
    #[arg(long)]
    pub pdf: PathBuf,

    #[arg(long)]
    pub out: PathBuf,

    /// First printed page to scan (inclusive).
    #[arg(long, default_value_t = 5)]
    pub start: u32,

    /// Last printed page to scan (inclusive).
    #[arg(long, default_value_t = 357)]
    pub end: u32,

    /// JSON calibration file; explicit flags below take precedence.
    #[arg(long)]
    pub calibration: Option<PathBuf>,

    #[arg(long)]
    pub running_title: Option<String>,

    #[arg(long)]
    pub title_min_pt: Option<f64>,

    #[arg(long)]
    pub heading_min_pt: Option<f64>,

    #[arg(long)]
    pub footnote_max_pt: Option<f64>,

    #[arg(long = "table-prefix")]
    pub table_prefixes: Vec<String>,

    #[arg(long)]
    pub block_gap_factor: Option<f64>,

    #[arg(long)]
    pub manifest: Option<PathBuf>,

    #[arg(long)]
    pub dump_layout: Option<PathBuf>,

    #[arg(long)]
    pub corpus_out: Option<PathBuf>,
}
