//! Convert CC-CEDICT into the text dictionary format.
//!
//! Usage:
//!   cargo run -p fix_cedict -- data/cedict_ts.u8 data/cedict_fixed.u8

use anyhow::{Context, Result};
use clap::Parser;
use libdict_core::cedict;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "fix_cedict")]
#[command(about = "Rewrite CC-CEDICT as simplified-word<TAB>[pinyin]gloss lines")]
struct Args {
    /// CC-CEDICT source (cedict_ts.u8)
    input: PathBuf,

    /// Converted text dictionary
    output: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let input = File::open(&args.input).with_context(|| format!("open {}", args.input.display()))?;
    let output =
        File::create(&args.output).with_context(|| format!("create {}", args.output.display()))?;

    let report = cedict::convert(BufReader::new(input), BufWriter::new(output))
        .with_context(|| format!("convert {}", args.input.display()))?;

    info!(
        lines = report.lines,
        entries = report.entries,
        merged = report.merged,
        dropped = report.dropped,
        "wrote {}",
        args.output.display()
    );
    Ok(())
}
