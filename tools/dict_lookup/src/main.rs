//! Query a dictionary from the command line.
//!
//! The dictionary is opened the way the input-method filters open it: from
//! the snapshot when present, otherwise from text (writing the snapshot for
//! next time).
//!
//! Usage:
//!   cargo run -p dict_lookup -- --text data/ecdict.txt --bin data/ecdict.bin find accord
//!   cargo run -p dict_lookup -- --config dict.toml prefix accord --json
//!   cargo run -p dict_lookup -- --config dict.toml senses 点点

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use libdict_core::{payload, Config, DictSource, Key};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "dict_lookup")]
#[command(about = "Exact and prefix lookups against a text/snapshot dictionary")]
struct Args {
    /// TOML config with a [dictionary] section
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Text dictionary (overrides the config)
    #[arg(long)]
    text: Option<PathBuf>,

    /// Snapshot path (overrides the config)
    #[arg(long)]
    bin: Option<PathBuf>,

    /// NFC-normalize the query before lookup
    #[arg(long)]
    nfc: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Exact lookup
    Find { key: String },
    /// Every entry starting with the prefix
    Prefix {
        prefix: String,
        /// Maximum results (defaults to the config's max_results)
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Exact lookup, with a `||`-joined CC-CEDICT payload split into readings
    Senses { key: String },
}

#[derive(Serialize)]
struct SenseOut<'a> {
    pinyin: &'a str,
    glosses: Vec<&'a str>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_toml(path).with_context(|| format!("config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(text) = &args.text {
        config.dictionary.text_path = text.clone();
    }
    if let Some(bin) = &args.bin {
        config.dictionary.binary_path = bin.clone();
    }
    let source: &DictSource = config.source();

    let loaded = source.load().context("load dictionary")?;
    info!(origin = ?loaded.origin, elapsed_ms = loaded.elapsed.as_millis() as u64, "dictionary opened");
    let dict = &loaded.dictionary;

    let query = |s: &str| {
        if args.nfc {
            Key::nfc(s).to_string()
        } else {
            s.to_string()
        }
    };

    match &args.command {
        Command::Find { key } => {
            let info = dict.find(&query(key));
            if args.json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                match info {
                    Some(info) => println!("{}", payload::unescape_newlines(info, "  ")),
                    None => println!("(not found)"),
                }
            }
        }
        Command::Prefix { prefix, limit } => {
            let prefix = query(prefix);
            let limit = limit.unwrap_or(config.max_results);
            let hits = dict.prefix_search_limited(&prefix, limit);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&hits)?);
            } else {
                for hit in &hits {
                    println!("{}\t{}", hit.text, hit.info);
                }
                println!("({} results)", hits.len());
            }
        }
        Command::Senses { key } => {
            let key = query(key);
            let Some(info) = dict.find(&key) else {
                println!("(not found)");
                return Ok(());
            };
            let senses: Vec<SenseOut> = payload::cedict_senses(info)
                .into_iter()
                .map(|s| SenseOut {
                    pinyin: s.pinyin,
                    glosses: s.glosses().collect(),
                })
                .collect();
            if args.json {
                println!("{}", serde_json::to_string_pretty(&senses)?);
            } else {
                for sense in &senses {
                    println!("〖{}〗{}", sense.pinyin, sense.glosses.join(" / "));
                }
            }
        }
    }
    Ok(())
}
