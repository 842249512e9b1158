//! Exact lookup and prefix search over a [`PrefixDictionary`].
//!
//! Both operations are pure in-memory walks. Prefix search reports entries in
//! depth-first order with siblings in insertion order, which is the order the
//! frozen node table is already laid out in: the subtree below a prefix is a
//! contiguous run of node ids, so the search is a linear scan of that run.
use serde::Serialize;

use crate::key::Key;
use crate::trie::{PrefixDictionary, ROOT};

/// One prefix-search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Match<'a> {
    /// The full key.
    pub text: String,
    /// The key's payload, borrowed from the dictionary.
    pub info: &'a str,
}

impl PrefixDictionary {
    /// Exact-match lookup.
    ///
    /// Returns the info stored for `key`, or `None` when `key` is absent or
    /// is only a prefix of stored keys.
    ///
    /// # Example
    /// ```
    /// use libdict_core::PrefixDictionary;
    ///
    /// let dict = PrefixDictionary::from_entries([("accord", "一致"), ("accordion", "手风琴")]);
    /// assert_eq!(dict.find("accordion"), Some("手风琴"));
    /// assert_eq!(dict.find("accordi"), None);
    /// ```
    pub fn find(&self, key: &str) -> Option<&str> {
        if key.is_empty() {
            return None;
        }
        let node = self.walk(key)?;
        self.payload(node)
    }

    /// True when some stored key starts with `prefix`.
    pub fn contains_prefix(&self, prefix: &str) -> bool {
        match self.walk(prefix) {
            // The root exists even in an empty dictionary.
            Some(node) => node != ROOT || !self.is_empty(),
            None => false,
        }
    }

    /// Every entry whose key starts with `prefix`, `prefix` itself included.
    ///
    /// Results come in depth-first order, siblings in insertion order, and are
    /// identical across runs and across a snapshot round trip. There is no
    /// built-in cap; see [`PrefixDictionary::prefix_search_limited`].
    pub fn prefix_search(&self, prefix: &str) -> Vec<Match<'_>> {
        self.prefix_search_limited(prefix, usize::MAX)
    }

    /// Like [`PrefixDictionary::prefix_search`] but stops after `limit` hits.
    pub fn prefix_search_limited(&self, prefix: &str, limit: usize) -> Vec<Match<'_>> {
        let mut out = Vec::new();
        if limit == 0 {
            return out;
        }
        let Some(start) = self.walk(prefix) else {
            return out;
        };
        self.scan_subtree(start, Key::new(prefix), |m| {
            out.push(m);
            out.len() < limit
        });
        out
    }

    /// Iterate every entry in depth-first, insertion order.
    pub fn iter(&self) -> impl Iterator<Item = Match<'_>> + '_ {
        self.prefix_search("").into_iter()
    }

    /// Visit the subtree rooted at `start`, whose key is `key`.
    ///
    /// `visit` returns `false` to stop early.
    fn scan_subtree<'a, F>(&'a self, start: u32, mut key: Key, mut visit: F)
    where
        F: FnMut(Match<'a>) -> bool,
    {
        if let Some(info) = self.payload(start) {
            if !visit(Match {
                text: key.to_string(),
                info,
            }) {
                return;
            }
        }

        // Ancestors of the current node, `start` at the bottom.
        let mut path: Vec<u32> = vec![start];
        for node in start + 1..self.subtree_end(start) {
            let parent = self.parent(node);
            while let Some(&top) = path.last() {
                if top == parent {
                    break;
                }
                path.pop();
                key.pop();
            }
            path.push(node);
            key.push(self.edge_char(node));

            if let Some(info) = self.payload(node) {
                if !visit(Match {
                    text: key.to_string(),
                    info,
                }) {
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accord_family() -> PrefixDictionary {
        PrefixDictionary::from_entries([
            ("accord", "[ә'kɒ:d]; n. 一致"),
            ("accordion", "[ә'kɒ:djәn]; n. 手风琴"),
            ("accordant", "a. 一致的"),
            ("according", "a. 相符的"),
            ("accords", "n. 协议"),
            ("accordingly", "ad. 因此"),
            ("account", "n. 账户"),
            ("apple", "n. 苹果"),
        ])
    }

    #[test]
    fn find_exact_only() {
        let dict = accord_family();
        assert_eq!(dict.find("accord"), Some("[ә'kɒ:d]; n. 一致"));
        assert_eq!(dict.find("accordion"), Some("[ә'kɒ:djәn]; n. 手风琴"));
        assert_eq!(dict.find("accor"), None);
        assert_eq!(dict.find("nonexistent-word"), None);
        assert_eq!(dict.find(""), None);
    }

    #[test]
    fn prefix_search_counts_prefix_itself() {
        let dict = accord_family();
        let hits = dict.prefix_search("accord");
        assert_eq!(hits.len(), 6);
        assert_eq!(hits[0].text, "accord");
        assert!(hits.iter().all(|m| m.text.starts_with("accord")));
    }

    #[test]
    fn prefix_search_order_is_dfs_insertion_order() {
        let dict = accord_family();
        let texts: Vec<String> = dict.prefix_search("accord").into_iter().map(|m| m.text).collect();
        // accord -> 'i' (accordion), then 'a' (accordant), 'i' subtree also holds
        // according/accordingly, then 's' (accords).
        assert_eq!(
            texts,
            vec![
                "accord",
                "accordion",
                "according",
                "accordingly",
                "accordant",
                "accords"
            ]
        );
    }

    #[test]
    fn prefix_search_missing_prefix_is_empty() {
        let dict = accord_family();
        assert!(dict.prefix_search("zz").is_empty());
        assert!(dict.prefix_search("accordx").is_empty());
    }

    #[test]
    fn prefix_search_limited_truncates() {
        let dict = accord_family();
        let hits = dict.prefix_search_limited("acc", 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "accord");
        assert!(dict.prefix_search_limited("acc", 0).is_empty());
    }

    #[test]
    fn empty_prefix_lists_everything() {
        let dict = accord_family();
        assert_eq!(dict.prefix_search("").len(), dict.len());
        assert_eq!(dict.iter().count(), 8);
    }

    #[test]
    fn contains_prefix_checks_edges() {
        let dict = accord_family();
        assert!(dict.contains_prefix("app"));
        assert!(dict.contains_prefix(""));
        assert!(!dict.contains_prefix("b"));
        assert!(!PrefixDictionary::default().contains_prefix(""));
    }

    #[test]
    fn cjk_prefix_search() {
        let dict = PrefixDictionary::from_entries([
            ("中", "[zhōng]center"),
            ("中国", "[zhōng guó]China"),
            ("中国人", "[zhōng guó rén]Chinese person"),
            ("种过", "[zhòng guò]111"),
        ]);
        let hits = dict.prefix_search("中国");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[1].text, "中国人");
        assert_eq!(hits[1].info, "[zhōng guó rén]Chinese person");
    }
}
