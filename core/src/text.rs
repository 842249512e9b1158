//! Text dictionary loader.
//!
//! Format: UTF-8, one `KEY<TAB>INFO` entry per line. The line is split at the
//! first tab with a plain byte scan; the info keeps any further tabs. Lines
//! that are blank, have no tab, have an empty key or an empty info, or are not
//! valid UTF-8 are skipped and counted, never reported as errors. A UTF-8
//! byte order mark at the start of the file is dropped. Escape sequences
//! inside the info (such as a literal `\n`) are left untouched.
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Instant;

use tracing::{debug, info};

use crate::error::{DictError, Result};
use crate::trie::{PrefixDictionary, TrieBuilder};

/// Why a text line was not turned into an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Blank,
    NoTab,
    EmptyKey,
    EmptyInfo,
    InvalidUtf8,
}

/// Counters from one text load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Lines read, skipped ones included.
    pub lines: usize,
    /// Lines inserted into the trie (re-inserted keys count each time).
    pub entries: usize,
    pub skipped: usize,
}

/// Split one line into `(key, info)`.
///
/// A trailing `\n` or `\r\n` is ignored.
///
/// # Example
/// ```
/// use libdict_core::text::{split_line, SkipReason};
///
/// assert_eq!(split_line("中\t[zhōng]center"), Ok(("中", "[zhōng]center")));
/// assert_eq!(split_line("no tab here"), Err(SkipReason::NoTab));
/// assert_eq!(split_line("\tinfo"), Err(SkipReason::EmptyKey));
/// ```
pub fn split_line(line: &str) -> std::result::Result<(&str, &str), SkipReason> {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let line = line.strip_suffix('\r').unwrap_or(line);
    if line.is_empty() {
        return Err(SkipReason::Blank);
    }
    let tab = line.find('\t').ok_or(SkipReason::NoTab)?;
    let (key, info) = (&line[..tab], &line[tab + 1..]);
    if key.is_empty() {
        return Err(SkipReason::EmptyKey);
    }
    if info.is_empty() {
        return Err(SkipReason::EmptyInfo);
    }
    Ok((key, info))
}

/// [`split_line`] without the reason.
pub fn parse_line(line: &str) -> Option<(&str, &str)> {
    split_line(line).ok()
}

impl TrieBuilder {
    /// Insert every valid line of the text dictionary at `path`.
    pub fn load_text_file<P: AsRef<Path>>(&mut self, path: P) -> Result<LoadReport> {
        self.load_text_with(path, |line_no, reason, line| {
            debug!(line_no, ?reason, line, "skipping dictionary line");
        })
    }

    /// Like [`TrieBuilder::load_text_file`], reporting each skipped line to
    /// `on_skip` as `(1-based line number, reason, raw line)`.
    pub fn load_text_with<P, F>(&mut self, path: P, on_skip: F) -> Result<LoadReport>
    where
        P: AsRef<Path>,
        F: FnMut(usize, SkipReason, &str),
    {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| DictError::io(path, e))?;
        self.load_text_from_reader(BufReader::new(file), on_skip)
            .map_err(|e| match e {
                DictError::Stream(source) => DictError::io(path, source),
                other => other,
            })
    }

    /// Insert every valid line read from `reader`.
    pub fn load_text_from_reader<R, F>(&mut self, mut reader: R, mut on_skip: F) -> Result<LoadReport>
    where
        R: BufRead,
        F: FnMut(usize, SkipReason, &str),
    {
        let mut report = LoadReport::default();
        let mut buf = Vec::with_capacity(256);
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            report.lines += 1;
            let parsed = match std::str::from_utf8(&buf) {
                Ok(line) => {
                    let line = if report.lines == 1 {
                        line.strip_prefix('\u{feff}').unwrap_or(line)
                    } else {
                        line
                    };
                    split_line(line).map_err(|reason| (reason, line))
                }
                Err(_) => Err((SkipReason::InvalidUtf8, "")),
            };
            match parsed {
                Ok((key, info)) => {
                    self.insert(key, info);
                    report.entries += 1;
                }
                Err((SkipReason::Blank, _)) => report.skipped += 1,
                Err((reason, line)) => {
                    report.skipped += 1;
                    on_skip(report.lines, reason, line.trim_end_matches(['\r', '\n']));
                }
            }
        }
        Ok(report)
    }
}

impl PrefixDictionary {
    /// Load a text dictionary.
    ///
    /// `capacity_hint` is the expected entry count and only pre-sizes storage.
    /// Fails only when the file cannot be opened or read; malformed lines are
    /// skipped.
    pub fn load_text_file<P: AsRef<Path>>(path: P, capacity_hint: usize) -> Result<Self> {
        let path = path.as_ref();
        let started = Instant::now();
        let mut builder = TrieBuilder::with_capacity(capacity_hint);
        let report = builder.load_text_file(path)?;
        let dict = builder.build();
        info!(
            path = %path.display(),
            entries = dict.len(),
            skipped = report.skipped,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "loaded text dictionary"
        );
        Ok(dict)
    }

    /// Parse a dictionary held in memory.
    pub fn from_text(text: &str) -> Self {
        let mut builder = TrieBuilder::new();
        // Reading from a byte slice cannot fail.
        let _ = builder.load_text_from_reader(text.as_bytes(), |_, _, _| {});
        builder.build()
    }
}
