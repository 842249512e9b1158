//! libdict-core
//!
//! Prefix dictionary engine shared by the dictionary-backed input-method
//! filters (English -> Chinese glosses, Chinese -> pinyin/English
//! annotations).
//!
//! A dictionary is a trie over Unicode scalar values mapping each word to an
//! opaque info string. It is built once, from a `KEY<TAB>INFO` text file or
//! from a binary snapshot, and is read-only afterwards.
//!
//! Public API:
//! - `TrieBuilder` - mutable construction-phase trie (insert, last write wins)
//! - `PrefixDictionary` - frozen dictionary: `find`, `prefix_search`, snapshot save/load
//! - `DictSource` - snapshot-first loading with text fallback
//! - `Config` - TOML configuration for dictionary paths and lookup limits
//! - `payload`, `cedict` - caller-side helpers for CC-CEDICT style data
use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod error;
pub use error::{DictError, Result};

pub mod key;
pub use key::Key;

pub mod trie;
pub use trie::{PrefixDictionary, TrieBuilder};

pub mod query;
pub use query::Match;

pub mod text;
pub use text::{LoadReport, SkipReason};

pub mod codec;

pub mod source;
pub use source::{snapshot_exists, DictSource, LoadOrigin, Loaded};

pub mod payload;
pub mod cedict;

/// Configuration for a dictionary-backed lookup.
///
/// Every field has a default, so a TOML file only needs the keys it changes.
///
/// ```toml
/// min_prefix_len = 3
/// max_results = 200
///
/// [dictionary]
/// text_path = "data/ecdict.txt"
/// binary_path = "data/ecdict.bin"
/// capacity_hint = 60000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Shortest input that is expanded with a prefix search.
    /// Shorter prefixes match too much of the dictionary to be useful.
    pub min_prefix_len: usize,

    /// Upper bound on prefix-search results handed to the caller.
    pub max_results: usize,

    pub dictionary: DictSource,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_prefix_len: 3,
            max_results: 200,
            dictionary: DictSource::new("data/dict.txt", "data/dict.bin"),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| DictError::io(path, e))?;
        Self::from_toml_str(&content)
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = self.to_toml_string()?;
        std::fs::write(path, content).map_err(|e| DictError::io(path, e))
    }

    /// Load configuration from TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| DictError::Config(e.to_string()))
    }

    /// Serialize configuration to TOML string.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| DictError::Config(e.to_string()))
    }

    /// Where to load the dictionary from.
    pub fn source(&self) -> &DictSource {
        &self.dictionary
    }

    /// Whether `prefix` is long enough (in code points) to be expanded.
    pub fn should_expand(&self, prefix: &str) -> bool {
        prefix.chars().count() >= self.min_prefix_len
    }

    /// Prefix search capped at `max_results`, or nothing when the prefix is too short.
    pub fn complete<'a>(&self, dict: &'a PrefixDictionary, prefix: &str) -> Vec<Match<'a>> {
        if !self.should_expand(prefix) {
            return Vec::new();
        }
        dict.prefix_search_limited(prefix, self.max_results)
    }
}

/// Utility helpers.
pub mod utils {
    /// Normalize input strings (NFC) and trim whitespace.
    pub fn normalize(s: &str) -> String {
        use unicode_normalization::UnicodeNormalization;
        s.nfc().collect::<String>().trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_present() {
        let cfg = Config::default();
        assert_eq!(cfg.min_prefix_len, 3);
        assert_eq!(cfg.max_results, 200);
        assert_eq!(cfg.dictionary.capacity_hint, 0);
    }

    #[test]
    fn config_partial_toml_uses_defaults() {
        let cfg = Config::from_toml_str(
            r#"
            max_results = 50

            [dictionary]
            text_path = "data/cedict_fixed.u8"
            binary_path = "data/cedict.bin"
            capacity_hint = 119000
            "#,
        )
        .unwrap();
        assert_eq!(cfg.max_results, 50);
        assert_eq!(cfg.min_prefix_len, 3);
        assert_eq!(cfg.source().capacity_hint, 119000);
        assert!(cfg.source().binary_path.ends_with("cedict.bin"));
    }

    #[test]
    fn config_toml_roundtrip() {
        let mut cfg = Config::default();
        cfg.min_prefix_len = 1;
        let text = cfg.to_toml_string().unwrap();
        assert_eq!(Config::from_toml_str(&text).unwrap(), cfg);
    }

    #[test]
    fn config_rejects_bad_toml() {
        let err = Config::from_toml_str("max_results = \"many\"").unwrap_err();
        assert!(matches!(err, DictError::Config(_)));
    }

    #[test]
    fn short_prefixes_are_not_expanded() {
        let dict = PrefixDictionary::from_entries([("aaa", "1"), ("aaab", "2")]);
        let cfg = Config::default();
        assert!(cfg.complete(&dict, "aa").is_empty());
        assert_eq!(cfg.complete(&dict, "aaa").len(), 2);
        assert_eq!(cfg.complete(&dict, "aaab").len(), 1);
    }

    #[test]
    fn normalize_composes_and_trims() {
        assert_eq!(utils::normalize(" a\u{0304} "), "ā");
    }
}
