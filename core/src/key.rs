//! Character-sequence keys.
//!
//! Every trie level corresponds to exactly one Unicode scalar value. A CJK
//! Extension B ideograph (two UTF-16 units, four UTF-8 bytes) is one level, and
//! so is a combining tone mark following a base letter.
use std::fmt;

/// An owned key as a sequence of `char`s.
///
/// # Example
/// ```
/// use libdict_core::Key;
///
/// let key = Key::new("𠀀好");
/// assert_eq!(key.len(), 2);
/// assert_eq!(key.to_string(), "𠀀好");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Key {
    chars: Vec<char>,
}

impl Key {
    pub fn new(s: &str) -> Self {
        Self {
            chars: chars_of(s).collect(),
        }
    }

    /// Build a key from NFC-normalized text.
    ///
    /// Dictionaries are indexed by code point without normalization, so a
    /// decomposed `a` + U+0304 and a precomposed `ā` are different keys. Callers
    /// whose dictionary is authored in NFC can normalize user input with this.
    pub fn nfc(s: &str) -> Self {
        Self::new(&crate::utils::normalize(s))
    }

    /// Number of trie levels (code points) in this key.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn push(&mut self, ch: char) {
        self.chars.push(ch);
    }

    pub fn pop(&mut self) -> Option<char> {
        self.chars.pop()
    }

    /// True if `self` starts with every char of `prefix`.
    pub fn starts_with(&self, prefix: &Key) -> bool {
        self.chars.starts_with(&prefix.chars)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ch in &self.chars {
            fmt::Write::write_char(f, *ch)?;
        }
        Ok(())
    }
}

/// Iterate the trie levels of `s`.
pub fn chars_of(s: &str) -> std::str::Chars<'_> {
    s.chars()
}
