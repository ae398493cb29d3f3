use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, info};

use crate::cli::Cli;
use crate::config::ExtractorConfig;
use crate::model::{ExtractionRunManifest, PageRange, corpus_text};
use crate::util::{now_utc_string, sha256_file, utc_compact_string, write_json_pretty, write_text};

use super::layout::{PdfLayout, pdftohtml_version};
use super::pipeline::ParagraphExtractor;

pub fn run(cli: Cli) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("extract-{}", utc_compact_string(started_ts));

    let config = ExtractorConfig::from_cli(&cli).context("invalid extraction configuration")?;

    info!(
        run_id = %run_id,
        pdf = %cli.pdf.display(),
        start = cli.start,
        end = cli.end,
        "starting extraction"
    );

    let layout = PdfLayout::load(&cli.pdf, config.block_gap_factor)?;
    let extractor = ParagraphExtractor::new(&config)?;
    let extraction = extractor.extract(&layout, cli.start, cli.end);

    for warning in &extraction.warnings {
        debug!(warning = %warning, "extraction warning");
    }

    write_json_pretty(&cli.out, &extraction.records)?;
    info!(
        path = %cli.out.display(),
        paragraphs = extraction.records.len(),
        "wrote paragraph json"
    );

    if let Some(path) = &cli.dump_layout {
        let dump = extractor.layout_dump(&layout, &extraction.page_index);
        write_json_pretty(path, &dump)?;
        info!(path = %path.display(), pages = dump.len(), "wrote layout dump");
    }

    if let Some(path) = &cli.corpus_out {
        write_text(path, &corpus_text(&extraction.records))?;
        info!(path = %path.display(), "wrote corpus text");
    }

    if let Some(path) = &cli.manifest {
        let manifest = ExtractionRunManifest {
            manifest_version: 1,
            run_id: run_id.clone(),
            started_at,
            updated_at: now_utc_string(),
            source_pdf: cli.pdf.display().to_string(),
            source_sha256: sha256_file(&cli.pdf)?,
            output_path: cli.out.display().to_string(),
            page_range: PageRange {
                start: cli.start,
                end: cli.end,
            },
            pdftohtml_version: pdftohtml_version(),
            config,
            counts: extraction.counts,
            warnings: extraction.warnings,
        };
        write_json_pretty(path, &manifest)?;
        info!(path = %path.display(), "wrote run manifest");
    }

    println!("Wrote JSON to: {}", cli.out.display());
    Ok(())
}
