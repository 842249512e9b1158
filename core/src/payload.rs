//! Helpers for interpreting info payloads.
//!
//! The dictionary stores info strings verbatim. Dictionaries built from
//! CC-CEDICT join the readings of a heteronym with `||` and prefix each
//! reading with its bracketed pinyin; English dictionaries such as ECDICT
//! embed literal `\n` escapes. These functions live outside the engine so it
//! stays usable for dictionaries with other conventions.

/// Separator between readings of one key.
pub const SENSE_SEPARATOR: &str = "||";

/// Split a payload into its readings, dropping empty parts.
///
/// # Example
/// ```
/// use libdict_core::payload::split_senses;
///
/// let info = "[diǎn diǎn]Diandian||[diǎn diǎn]point/speck";
/// assert_eq!(split_senses(info).count(), 2);
/// ```
pub fn split_senses(info: &str) -> impl Iterator<Item = &str> {
    info.split(SENSE_SEPARATOR).filter(|s| !s.is_empty())
}

/// Replace literal `\n` escape sequences with a newline followed by `indent`.
pub fn unescape_newlines(info: &str, indent: &str) -> String {
    let replacement = format!("\n{indent}");
    info.replace("\\n", &replacement)
}

/// One `[pinyin]gloss` reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CedictSense<'a> {
    pub pinyin: &'a str,
    pub gloss: &'a str,
}

impl<'a> CedictSense<'a> {
    /// The `/`-separated translations, excluding measure-word notes (`CL:`).
    pub fn glosses(&self) -> impl Iterator<Item = &'a str> {
        self.gloss
            .split('/')
            .filter(|g| !g.is_empty() && !g.contains("CL"))
    }

    /// Pinyin syllables separated by spaces.
    pub fn syllables(&self) -> impl Iterator<Item = &'a str> {
        self.pinyin.split(' ').filter(|s| !s.is_empty())
    }
}

/// Parse `[pinyin]gloss`; returns `None` when the bracket is missing or empty.
pub fn parse_cedict_sense(sense: &str) -> Option<CedictSense<'_>> {
    let rest = sense.strip_prefix('[')?;
    let close = rest.find(']')?;
    let pinyin = &rest[..close];
    if pinyin.is_empty() {
        return None;
    }
    Some(CedictSense {
        pinyin,
        gloss: &rest[close + 1..],
    })
}

/// Parse every reading of a CC-CEDICT payload, skipping malformed ones.
pub fn cedict_senses(info: &str) -> Vec<CedictSense<'_>> {
    split_senses(info).filter_map(parse_cedict_sense).collect()
}
