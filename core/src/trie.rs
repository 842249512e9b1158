/// Prefix trie storage: a mutable builder and the frozen dictionary it produces.
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::key::chars_of;

/// Sentinel for "no payload" in [`NodeRecord::payload`].
pub(crate) const NO_PAYLOAD: u32 = u32::MAX;
/// Sentinel parent of the root node.
pub(crate) const NO_NODE: u32 = u32::MAX;
pub(crate) const ROOT: u32 = 0;

/// Node ids are `u32` and `NO_NODE` is reserved.
const MAX_NODES: usize = NO_NODE as usize;
/// Payload offsets are `u32`.
const MAX_PAYLOAD_BYTES: usize = u32::MAX as usize;

/// Construction-phase trie.
///
/// Keys are inserted one code point per level. Children remember the order in
/// which they were first created, and that order survives into the
/// [`PrefixDictionary`] returned by [`TrieBuilder::build`].
///
/// # Example
/// ```
/// use libdict_core::TrieBuilder;
///
/// let mut builder = TrieBuilder::new();
/// builder.insert("accord", "n. 一致");
/// builder.insert("accordion", "n. 手风琴");
///
/// let dict = builder.build();
/// assert_eq!(dict.find("accord"), Some("n. 一致"));
/// assert_eq!(dict.find("acc"), None);
/// ```
#[derive(Debug)]
pub struct TrieBuilder {
    nodes: Vec<BuilderNode>,
    /// (parent, char) -> child
    index: AHashMap<(u32, char), u32>,
    entries: usize,
    payload_bytes: usize,
    max_nodes: usize,
    max_payload_bytes: usize,
}

#[derive(Debug)]
struct BuilderNode {
    ch: char,
    /// Child ids in insertion order.
    children: Vec<u32>,
    payload: Option<String>,
}

impl BuilderNode {
    fn new(ch: char) -> Self {
        Self {
            ch,
            children: Vec::new(),
            payload: None,
        }
    }
}

impl Default for TrieBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TrieBuilder {
    /// Create an empty trie holding only the root.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty trie pre-sized for roughly `estimated_entries` keys.
    ///
    /// The hint only affects allocation; any number of entries may be inserted.
    pub fn with_capacity(estimated_entries: usize) -> Self {
        // Dictionary words share prefixes, so a few nodes per entry is typical.
        let nodes = estimated_entries.saturating_mul(3);
        let mut builder = Self {
            nodes: Vec::with_capacity(nodes.saturating_add(1)),
            index: AHashMap::with_capacity(nodes),
            entries: 0,
            payload_bytes: 0,
            max_nodes: MAX_NODES,
            max_payload_bytes: MAX_PAYLOAD_BYTES,
        };
        builder.nodes.push(BuilderNode::new('\0'));
        builder
    }

    /// Insert `key` with its `info`, returning the info it replaced.
    ///
    /// Re-inserting a key overwrites its info (last write wins) and never
    /// creates a second entry. The empty key is ignored because the root never
    /// carries a payload.
    ///
    /// An insert that would take the trie past `u32` node ids or past 4 GiB
    /// of payload text is refused with an `error!` and leaves the trie as it
    /// was.
    pub fn insert(&mut self, key: &str, info: impl Into<String>) -> Option<String> {
        if key.is_empty() {
            return None;
        }
        let info = info.into();
        if self.payload_bytes + info.len() > self.max_payload_bytes {
            let replaced = self.find(key).map_or(0, str::len);
            if self.payload_bytes - replaced + info.len() > self.max_payload_bytes {
                error!(key, payload_bytes = self.payload_bytes, "payload text limit reached, entry dropped");
                return None;
            }
        }
        let levels = chars_of(key).count();
        if self.nodes.len() + levels > self.max_nodes {
            let missing = levels - self.walk_existing(key);
            if self.nodes.len() + missing > self.max_nodes {
                error!(key, nodes = self.nodes.len(), "node id limit reached, entry dropped");
                return None;
            }
        }

        let mut node = ROOT;
        for ch in chars_of(key) {
            node = self.child_or_insert(node, ch);
        }
        self.payload_bytes += info.len();
        let previous = self.nodes[node as usize].payload.replace(info);
        match &previous {
            Some(old) => self.payload_bytes -= old.len(),
            None => self.entries += 1,
        }
        previous
    }

    /// Number of leading chars of `key` already present as a path.
    fn walk_existing(&self, key: &str) -> usize {
        let mut node = ROOT;
        let mut depth = 0;
        for ch in chars_of(key) {
            match self.index.get(&(node, ch)) {
                Some(&child) => node = child,
                None => break,
            }
            depth += 1;
        }
        depth
    }

    fn child_or_insert(&mut self, parent: u32, ch: char) -> u32 {
        if let Some(&child) = self.index.get(&(parent, ch)) {
            return child;
        }
        // `insert` checked the node budget before walking.
        let child = self.nodes.len() as u32;
        self.nodes.push(BuilderNode::new(ch));
        self.nodes[parent as usize].children.push(child);
        self.index.insert((parent, ch), child);
        child
    }

    #[cfg(test)]
    fn with_limits(max_nodes: usize, max_payload_bytes: usize) -> Self {
        let mut builder = Self::new();
        builder.max_nodes = max_nodes;
        builder.max_payload_bytes = max_payload_bytes;
        builder
    }

    /// Exact lookup during construction.
    pub fn find(&self, key: &str) -> Option<&str> {
        if key.is_empty() {
            return None;
        }
        let mut node = ROOT;
        for ch in chars_of(key) {
            node = *self.index.get(&(node, ch))?;
        }
        self.nodes[node as usize].payload.as_deref()
    }

    /// Number of distinct keys inserted so far.
    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Number of trie nodes, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Freeze the trie into its flat, read-only form.
    ///
    /// Nodes are renumbered in depth-first preorder with children taken in
    /// insertion order, so each subtree becomes one contiguous id range.
    ///
    /// `insert` keeps the node count and payload size within `u32`, so the
    /// narrowing casts below are lossless.
    pub fn build(mut self) -> PrefixDictionary {
        let count = self.nodes.len();
        // new id -> old id
        let mut order: Vec<u32> = Vec::with_capacity(count);
        let mut parents: Vec<u32> = Vec::with_capacity(count);
        let mut stack: Vec<(u32, u32)> = vec![(ROOT, NO_NODE)];
        while let Some((old, new_parent)) = stack.pop() {
            let new_id = order.len() as u32;
            order.push(old);
            parents.push(new_parent);
            // Reverse so the first-inserted child is visited first.
            for &child in self.nodes[old as usize].children.iter().rev() {
                stack.push((child, new_id));
            }
        }

        let mut subtree_end: Vec<u32> = (1..=count as u32).collect();
        for id in (1..count).rev() {
            let parent = parents[id] as usize;
            subtree_end[parent] = subtree_end[parent].max(subtree_end[id]);
        }

        let mut children: Vec<Vec<EdgeRecord>> = vec![Vec::new(); count];
        for id in 1..count {
            let ch = self.nodes[order[id] as usize].ch;
            children[parents[id] as usize].push(EdgeRecord {
                ch: ch as u32,
                child: id as u32,
            });
        }

        let mut nodes = Vec::with_capacity(count);
        let mut edges = Vec::with_capacity(count.saturating_sub(1));
        let mut payload_offsets = Vec::with_capacity(self.entries + 1);
        let mut payload_text = String::new();
        payload_offsets.push(0u32);

        for (id, &old) in order.iter().enumerate() {
            let source = &mut self.nodes[old as usize];
            let mut outgoing = std::mem::take(&mut children[id]);
            outgoing.sort_unstable_by_key(|e| e.ch);

            let payload = match source.payload.take() {
                Some(info) => {
                    payload_text.push_str(&info);
                    payload_offsets.push(payload_text.len() as u32);
                    (payload_offsets.len() - 2) as u32
                }
                None => NO_PAYLOAD,
            };

            nodes.push(NodeRecord {
                parent: parents[id],
                ch: if id == 0 { 0 } else { source.ch as u32 },
                first_edge: edges.len() as u32,
                edge_count: outgoing.len() as u32,
                subtree_end: subtree_end[id],
                payload,
            });
            edges.extend(outgoing);
        }

        PrefixDictionary {
            nodes,
            edges,
            payload_offsets,
            payload_text,
        }
    }
}

/// One node of the frozen trie.
///
/// Field widths are fixed so the snapshot body has a predictable size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct NodeRecord {
    pub parent: u32,
    /// Code point on the edge from `parent`; 0 for the root.
    pub ch: u32,
    pub first_edge: u32,
    pub edge_count: u32,
    /// One past the last node id of this subtree.
    pub subtree_end: u32,
    pub payload: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct EdgeRecord {
    pub ch: u32,
    pub child: u32,
}

/// An immutable prefix dictionary.
///
/// Built once, either through [`TrieBuilder::build`], the text loader or the
/// snapshot loader, and then only read. It holds no interior mutability, so a
/// shared reference (or an `Arc`) can be handed to any number of reader
/// threads once construction has finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixDictionary {
    pub(crate) nodes: Vec<NodeRecord>,
    /// Outgoing edges, grouped per node and sorted by char within a group.
    pub(crate) edges: Vec<EdgeRecord>,
    /// `payload_offsets[i]..payload_offsets[i + 1]` is payload `i`.
    pub(crate) payload_offsets: Vec<u32>,
    pub(crate) payload_text: String,
}

impl Default for PrefixDictionary {
    fn default() -> Self {
        TrieBuilder::new().build()
    }
}

impl PrefixDictionary {
    /// Build a dictionary from (key, info) pairs; later duplicates win.
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut builder = TrieBuilder::new();
        for (key, info) in entries {
            builder.insert(key.as_ref(), info);
        }
        builder.build()
    }

    /// Number of entries (terminal nodes).
    pub fn len(&self) -> usize {
        self.payload_offsets.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of trie nodes, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn child(&self, node: u32, ch: char) -> Option<u32> {
        let record = &self.nodes[node as usize];
        let start = record.first_edge as usize;
        let group = &self.edges[start..start + record.edge_count as usize];
        group
            .binary_search_by_key(&(ch as u32), |e| e.ch)
            .ok()
            .map(|i| group[i].child)
    }

    /// Follow `path` from the root, one code point per edge.
    pub(crate) fn walk(&self, path: &str) -> Option<u32> {
        let mut node = ROOT;
        for ch in chars_of(path) {
            node = self.child(node, ch)?;
        }
        Some(node)
    }

    pub(crate) fn payload(&self, node: u32) -> Option<&str> {
        let index = self.nodes[node as usize].payload;
        if index == NO_PAYLOAD {
            return None;
        }
        let start = self.payload_offsets[index as usize] as usize;
        let end = self.payload_offsets[index as usize + 1] as usize;
        Some(&self.payload_text[start..end])
    }

    pub(crate) fn edge_char(&self, node: u32) -> char {
        char::from_u32(self.nodes[node as usize].ch).unwrap_or(char::REPLACEMENT_CHARACTER)
    }

    pub(crate) fn parent(&self, node: u32) -> u32 {
        self.nodes[node as usize].parent
    }

    pub(crate) fn subtree_end(&self, node: u32) -> u32 {
        self.nodes[node as usize].subtree_end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_insert_and_find() {
        let mut trie = TrieBuilder::new();
        trie.insert("ni", "你");
        trie.insert("hao", "好");
        trie.insert("nihao", "你好");

        assert_eq!(trie.find("ni"), Some("你"));
        assert_eq!(trie.find("hao"), Some("好"));
        assert_eq!(trie.find("nihao"), Some("你好"));
        assert_eq!(trie.find("n"), None);
        assert_eq!(trie.find("niha"), None);
        assert_eq!(trie.len(), 3);
    }

    #[test]
    fn test_reinsert_overwrites() {
        let mut trie = TrieBuilder::new();
        assert_eq!(trie.insert("accord", "v1"), None);
        assert_eq!(trie.insert("accord", "v1"), Some("v1".to_string()));
        assert_eq!(trie.len(), 1);
        assert_eq!(trie.insert("accord", "v2"), Some("v1".to_string()));
        assert_eq!(trie.find("accord"), Some("v2"));
        assert_eq!(trie.len(), 1);

        let dict = trie.build();
        assert_eq!(dict.len(), 1);
        assert_eq!(dict.find("accord"), Some("v2"));
    }

    #[test]
    fn test_empty_key_ignored() {
        let mut trie = TrieBuilder::new();
        assert_eq!(trie.insert("", "nothing"), None);
        assert!(trie.is_empty());
        let dict = trie.build();
        assert_eq!(dict.find(""), None);
        assert_eq!(dict.node_count(), 1);
    }

    #[test]
    fn test_node_count_equals_shared_prefixes() {
        let mut trie = TrieBuilder::new();
        trie.insert("abc", "1");
        trie.insert("abd", "2");
        // root + a + b + c + d
        assert_eq!(trie.node_count(), 5);
        assert_eq!(trie.build().node_count(), 5);
    }

    #[test]
    fn test_build_preorder_layout() {
        let mut trie = TrieBuilder::new();
        trie.insert("b", "1");
        trie.insert("ab", "2");
        trie.insert("ba", "3");

        let dict = trie.build();
        // preorder with insertion order: root, b, ba, a, ab
        let chars: Vec<u32> = dict.nodes.iter().map(|n| n.ch).collect();
        assert_eq!(chars, vec![0, 'b' as u32, 'a' as u32, 'a' as u32, 'b' as u32]);
        assert_eq!(dict.subtree_end(0), 5);
        assert_eq!(dict.subtree_end(1), 3);
        assert_eq!(dict.subtree_end(3), 5);
        // edges of the root are sorted by char for binary search
        let root = dict.nodes[0];
        let group = &dict.edges[root.first_edge as usize..(root.first_edge + root.edge_count) as usize];
        assert_eq!(group[0].ch, 'a' as u32);
        assert_eq!(group[1].ch, 'b' as u32);
    }

    #[test]
    fn test_unicode_zhuyin() {
        let mut trie = TrieBuilder::new();
        trie.insert("ㄋㄧˇ", "你");
        trie.insert("ㄏㄠˇ", "好");

        let dict = trie.build();
        assert_eq!(dict.find("ㄋㄧˇ"), Some("你"));
        assert_eq!(dict.find("ㄏㄠˇ"), Some("好"));
        // three code points, three levels
        assert_eq!(dict.node_count(), 7);
    }

    #[test]
    fn test_from_entries_last_write_wins() {
        let dict = PrefixDictionary::from_entries([("中", "a"), ("中国", "b"), ("中", "c")]);
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.find("中"), Some("c"));
    }

    #[test]
    fn test_node_limit_refuses_insert() {
        // root + a + b + c
        let mut trie = TrieBuilder::with_limits(4, MAX_PAYLOAD_BYTES);
        assert_eq!(trie.insert("abc", "1"), None);
        assert_eq!(trie.insert("abd", "2"), None);
        assert_eq!(trie.find("abd"), None);
        assert_eq!(trie.node_count(), 4);

        // existing paths need no new nodes
        trie.insert("ab", "3");
        assert_eq!(trie.insert("abc", "4"), Some("1".to_string()));

        let dict = trie.build();
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.find("abc"), Some("4"));
    }

    #[test]
    fn test_payload_limit_counts_replacements() {
        let mut trie = TrieBuilder::with_limits(MAX_NODES, 5);
        trie.insert("a", "abc");
        trie.insert("b", "xyz");
        assert_eq!(trie.find("b"), None);
        assert_eq!(trie.node_count(), 2);

        // replacing frees the old payload first
        assert_eq!(trie.insert("a", "vwxyz"), Some("abc".to_string()));
        trie.insert("c", "");
        assert_eq!(trie.len(), 2);

        let dict = trie.build();
        assert_eq!(dict.find("a"), Some("vwxyz"));
        assert_eq!(dict.find("c"), Some(""));
        assert_eq!(dict.payload_text.len(), 5);
    }
}
