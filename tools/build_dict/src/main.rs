//! Build a binary snapshot from a text dictionary.
//!
//! Usage:
//!   cargo run -p build_dict -- --input data/ecdict.txt --output data/ecdict.bin --capacity 60000
//!   cargo run -p build_dict -- --input data/cedict_fixed.u8 --output data/cedict.bin --verify

use anyhow::{Context, Result};
use clap::Parser;
use libdict_core::{PrefixDictionary, TrieBuilder};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "build_dict")]
#[command(about = "Convert a KEY<TAB>INFO text dictionary into a binary snapshot")]
struct Args {
    /// Text dictionary (one `key<TAB>info` entry per line)
    #[arg(short, long)]
    input: PathBuf,

    /// Snapshot output path
    #[arg(short, long)]
    output: PathBuf,

    /// Expected number of entries (pre-sizes the trie)
    #[arg(long, default_value_t = 0)]
    capacity: usize,

    /// Reload the snapshot and compare it entry by entry with the text load
    #[arg(long)]
    verify: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let tick = Instant::now();
    let mut builder = TrieBuilder::with_capacity(args.capacity);
    let report = builder
        .load_text_file(&args.input)
        .with_context(|| format!("load {}", args.input.display()))?;
    let dict = builder.build();
    let text_ms = tick.elapsed().as_millis();
    if report.skipped > 0 {
        warn!(skipped = report.skipped, "some lines were not dictionary entries");
    }

    dict.save_to_binary_file(&args.output)
        .with_context(|| format!("save {}", args.output.display()))?;

    let tick = Instant::now();
    let reloaded = PrefixDictionary::load_binary_file(&args.output)
        .with_context(|| format!("reload {}", args.output.display()))?;
    let bin_ms = tick.elapsed().as_millis();

    if args.verify {
        let mut checked = 0usize;
        for entry in dict.iter() {
            if reloaded.find(&entry.text) != Some(entry.info) {
                anyhow::bail!("snapshot disagrees on key {:?}", entry.text);
            }
            checked += 1;
        }
        info!(checked, "snapshot verified");
    }

    println!("lines:      {}", report.lines);
    println!("entries:    {}", dict.len());
    println!("skipped:    {}", report.skipped);
    println!("nodes:      {}", dict.node_count());
    println!("text load:  {}ms", text_ms);
    println!("bin load:   {}ms", bin_ms);
    Ok(())
}
