//! Binary snapshot codec.
//!
//! A snapshot is the frozen node/edge/payload tables written with bincode's
//! fixed-width encoding:
//!
//! ```text
//! header: magic "LIBDICT\0" | version u32 | node_count u64 | edge_count u64
//!         | payload_count u64 | text_len u64
//! body:   nodes   (u64 len, 6 x u32 each)
//!         edges   (u64 len, 2 x u32 each)
//!         offsets (u64 len, u32 each, payload_count + 1 of them)
//!         text    (u64 len, UTF-8 bytes)
//! ```
//!
//! Loading is a bulk decode of those tables followed by one validation pass.
//! There is no per-key parsing and no hashing, which is what makes it much
//! cheaper than the text loader. Every size is known from the header, so a
//! short file is reported as truncated before the body is decoded.
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use bincode::Options;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{DictError, Result};
use crate::trie::{EdgeRecord, NodeRecord, PrefixDictionary, NO_NODE, NO_PAYLOAD, ROOT};

pub const MAGIC: [u8; 8] = *b"LIBDICT\0";
pub const FORMAT_VERSION: u32 = 1;

const HEADER_LEN: u64 = 8 + 4 + 8 * 4;
const NODE_LEN: u64 = 6 * 4;
const EDGE_LEN: u64 = 2 * 4;
const OFFSET_LEN: u64 = 4;
const SEQ_PREFIX_LEN: u64 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct SnapshotHeader {
    magic: [u8; 8],
    version: u32,
    node_count: u64,
    edge_count: u64,
    payload_count: u64,
    text_len: u64,
}

impl SnapshotHeader {
    fn body_len(&self) -> Option<u64> {
        let nodes = self.node_count.checked_mul(NODE_LEN)?;
        let edges = self.edge_count.checked_mul(EDGE_LEN)?;
        let offsets = self.payload_count.checked_add(1)?.checked_mul(OFFSET_LEN)?;
        nodes
            .checked_add(edges)?
            .checked_add(offsets)?
            .checked_add(self.text_len)?
            .checked_add(4 * SEQ_PREFIX_LEN)
    }
}

#[derive(Serialize)]
struct BodyRef<'a> {
    nodes: &'a [NodeRecord],
    edges: &'a [EdgeRecord],
    payload_offsets: &'a [u32],
    payload_text: &'a str,
}

#[derive(Deserialize)]
struct Body {
    nodes: Vec<NodeRecord>,
    edges: Vec<EdgeRecord>,
    payload_offsets: Vec<u32>,
    payload_text: String,
}

/// Fixed-width little-endian decoding that never reads more than `limit`
/// bytes, so a damaged length prefix cannot trigger a huge allocation.
fn decode_options(limit: u64) -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
        .with_limit(limit)
}

fn corrupt(msg: impl Into<String>) -> DictError {
    DictError::Corrupt(msg.into())
}

fn encode_error(path: &Path, err: bincode::Error) -> DictError {
    match *err {
        bincode::ErrorKind::Io(source) => DictError::io(path, source),
        other => corrupt(other.to_string()),
    }
}

impl PrefixDictionary {
    fn header(&self) -> SnapshotHeader {
        SnapshotHeader {
            magic: MAGIC,
            version: FORMAT_VERSION,
            node_count: self.nodes.len() as u64,
            edge_count: self.edges.len() as u64,
            payload_count: self.len() as u64,
            text_len: self.payload_text.len() as u64,
        }
    }

    fn body(&self) -> BodyRef<'_> {
        BodyRef {
            nodes: &self.nodes,
            edges: &self.edges,
            payload_offsets: &self.payload_offsets,
            payload_text: &self.payload_text,
        }
    }

    /// Encode the dictionary as an in-memory snapshot.
    pub fn to_bytes(&self) -> Vec<u8> {
        let header = self.header();
        let mut out = Vec::with_capacity((HEADER_LEN + header.body_len().unwrap_or(0)) as usize);
        // Writing into a Vec only fails on allocation, which aborts anyway.
        let _ = bincode::serialize_into(&mut out, &header);
        let _ = bincode::serialize_into(&mut out, &self.body());
        out
    }

    /// Write a snapshot to `path`.
    ///
    /// The file is written next to its destination under a temporary name and
    /// renamed into place, so an interrupted save never leaves a partial
    /// snapshot at `path`. Missing parent directories are created.
    pub fn save_to_binary_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let started = Instant::now();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| DictError::io(parent, e))?;
        }

        let tmp = temp_path(path);
        let written = self
            .write_snapshot(&tmp)
            .and_then(|()| fs::rename(&tmp, path).map_err(|e| DictError::io(path, e)));
        if let Err(err) = written {
            if let Err(cleanup) = fs::remove_file(&tmp) {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %tmp.display(), error = %cleanup, "could not remove temporary snapshot");
                }
            }
            return Err(err);
        }

        info!(
            path = %path.display(),
            entries = self.len(),
            nodes = self.node_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "saved dictionary snapshot"
        );
        Ok(())
    }

    fn write_snapshot(&self, tmp: &Path) -> Result<()> {
        let file = File::create(tmp).map_err(|e| DictError::io(tmp, e))?;
        let mut writer = BufWriter::new(file);
        bincode::serialize_into(&mut writer, &self.header()).map_err(|e| encode_error(tmp, e))?;
        bincode::serialize_into(&mut writer, &self.body()).map_err(|e| encode_error(tmp, e))?;
        writer.flush().map_err(|e| DictError::io(tmp, e))
    }

    /// Load a snapshot written by [`PrefixDictionary::save_to_binary_file`].
    ///
    /// A missing or unreadable file is an I/O error; anything structurally
    /// wrong with the contents is reported through an error for which
    /// [`DictError::is_corrupt`] holds.
    pub fn load_binary_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let started = Instant::now();
        let bytes = fs::read(path).map_err(|e| DictError::io(path, e))?;
        let dict = Self::from_bytes(&bytes)?;
        info!(
            path = %path.display(),
            entries = dict.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "loaded dictionary snapshot"
        );
        Ok(dict)
    }

    /// Decode and validate an in-memory snapshot.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < MAGIC.len() || bytes[..MAGIC.len()] != MAGIC {
            return Err(DictError::InvalidMagic);
        }
        if (bytes.len() as u64) < HEADER_LEN {
            return Err(DictError::Truncated {
                expected: HEADER_LEN,
                actual: bytes.len() as u64,
            });
        }

        let (head, rest) = bytes.split_at(HEADER_LEN as usize);
        let header: SnapshotHeader = decode_options(HEADER_LEN)
            .deserialize(head)
            .map_err(|e| corrupt(e.to_string()))?;
        if header.version != FORMAT_VERSION {
            return Err(DictError::UnsupportedVersion {
                found: header.version,
                expected: FORMAT_VERSION,
            });
        }

        let body_len = header
            .body_len()
            .ok_or_else(|| corrupt("header sizes overflow"))?;
        let actual = rest.len() as u64;
        if actual < body_len {
            return Err(DictError::Truncated {
                expected: HEADER_LEN + body_len,
                actual: bytes.len() as u64,
            });
        }
        if actual > body_len {
            return Err(corrupt(format!("{} trailing bytes", actual - body_len)));
        }

        // Length prefixes inside the body are not covered by the header check;
        // decoding from the slice bounds each one by the bytes that remain.
        let body: Body = decode_options(body_len)
            .deserialize(rest)
            .map_err(|e| corrupt(e.to_string()))?;
        if body.nodes.len() as u64 != header.node_count
            || body.edges.len() as u64 != header.edge_count
            || body.payload_offsets.len() as u64 != header.payload_count + 1
            || body.payload_text.len() as u64 != header.text_len
        {
            return Err(corrupt("table sizes disagree with header"));
        }

        let dict = PrefixDictionary {
            nodes: body.nodes,
            edges: body.edges,
            payload_offsets: body.payload_offsets,
            payload_text: body.payload_text,
        };
        dict.validate()?;
        Ok(dict)
    }

    /// Check every invariant the query code relies on.
    fn validate(&self) -> Result<()> {
        let count = self.nodes.len();
        if count == 0 {
            return Err(corrupt("no root node"));
        }
        if count > u32::MAX as usize || self.edges.len() != count - 1 {
            return Err(corrupt("edge count must be node count - 1"));
        }

        let offsets = &self.payload_offsets;
        if offsets.first() != Some(&0) || offsets.last().map(|&o| o as usize) != Some(self.payload_text.len()) {
            return Err(corrupt("payload offsets do not span the text"));
        }
        for pair in offsets.windows(2) {
            if pair[0] > pair[1] || !self.payload_text.is_char_boundary(pair[1] as usize) {
                return Err(corrupt("payload offsets not ordered on char boundaries"));
            }
        }

        let root = &self.nodes[ROOT as usize];
        if root.parent != NO_NODE || root.payload != NO_PAYLOAD {
            return Err(corrupt("malformed root"));
        }

        // Replays the preorder walk used by prefix search: each node's parent
        // must be on the current ancestor path.
        let mut path: Vec<u32> = vec![ROOT];
        let mut computed_end: Vec<u32> = (1..=count as u32).collect();
        let mut next_payload: u32 = 0;
        for (id, node) in self.nodes.iter().enumerate() {
            let id = id as u32;
            if id != ROOT {
                if char::from_u32(node.ch).is_none() {
                    return Err(corrupt(format!("node {id} has invalid char {:#x}", node.ch)));
                }
                while path.last().is_some_and(|&top| top != node.parent) {
                    path.pop();
                }
                if path.is_empty() {
                    return Err(corrupt(format!("node {id} is out of preorder")));
                }
                path.push(id);
            }

            if node.payload != NO_PAYLOAD {
                if node.payload != next_payload {
                    return Err(corrupt(format!("node {id} has out-of-order payload")));
                }
                next_payload += 1;
            }

            let start = node.first_edge as u64;
            let end = start + node.edge_count as u64;
            if end > self.edges.len() as u64 {
                return Err(corrupt(format!("node {id} edges out of range")));
            }
            let mut last_ch: Option<u32> = None;
            for edge in &self.edges[start as usize..end as usize] {
                let child = edge.child as usize;
                if child >= count
                    || edge.child <= id
                    || self.nodes[child].parent != id
                    || self.nodes[child].ch != edge.ch
                    || last_ch.is_some_and(|prev| prev >= edge.ch)
                {
                    return Err(corrupt(format!("node {id} has an inconsistent edge")));
                }
                last_ch = Some(edge.ch);
            }
        }
        if next_payload as usize != self.len() {
            return Err(corrupt("payload count mismatch"));
        }

        for id in (1..count).rev() {
            let parent = self.nodes[id].parent as usize;
            computed_end[parent] = computed_end[parent].max(computed_end[id]);
        }
        if self
            .nodes
            .iter()
            .zip(&computed_end)
            .any(|(node, &end)| node.subtree_end != end)
        {
            return Err(corrupt("subtree ranges disagree with parents"));
        }
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PrefixDictionary {
        PrefixDictionary::from_entries([
            ("accord", "[ә'kɒ:d]; n. 一致"),
            ("accordion", "n. 手风琴"),
            ("点点", "[diǎn diǎn]Diandian||[diǎn diǎn]point/speck"),
            ("\u{20000}", "ext-b"),
        ])
    }

    #[test]
    fn bytes_roundtrip_preserves_tables() {
        let dict = sample();
        let bytes = dict.to_bytes();
        let loaded = PrefixDictionary::from_bytes(&bytes).unwrap();
        assert_eq!(loaded, dict);
    }

    #[test]
    fn encoded_size_matches_header_arithmetic() {
        let dict = sample();
        let header = dict.header();
        assert_eq!(
            dict.to_bytes().len() as u64,
            HEADER_LEN + header.body_len().unwrap()
        );
    }

    #[test]
    fn empty_dictionary_roundtrip() {
        let dict = PrefixDictionary::default();
        let loaded = PrefixDictionary::from_bytes(&dict.to_bytes()).unwrap();
        assert!(loaded.is_empty());
        assert_eq!(loaded.node_count(), 1);
    }

    #[test]
    fn bad_magic_rejected() {
        let mut bytes = sample().to_bytes();
        bytes[0] = b'X';
        assert!(matches!(
            PrefixDictionary::from_bytes(&bytes),
            Err(DictError::InvalidMagic)
        ));
        assert!(matches!(
            PrefixDictionary::from_bytes(b"LIB"),
            Err(DictError::InvalidMagic)
        ));
    }

    #[test]
    fn wrong_version_rejected() {
        let mut bytes = sample().to_bytes();
        bytes[8..12].copy_from_slice(&7u32.to_le_bytes());
        assert!(matches!(
            PrefixDictionary::from_bytes(&bytes),
            Err(DictError::UnsupportedVersion { found: 7, .. })
        ));
    }

    #[test]
    fn truncation_detected() {
        let bytes = sample().to_bytes();
        for cut in [10, HEADER_LEN as usize, bytes.len() - 1] {
            let err = PrefixDictionary::from_bytes(&bytes[..cut]).unwrap_err();
            assert!(matches!(err, DictError::Truncated { .. }), "cut at {cut}: {err}");
        }
    }

    #[test]
    fn trailing_bytes_rejected() {
        let mut bytes = sample().to_bytes();
        bytes.push(0);
        assert!(PrefixDictionary::from_bytes(&bytes).unwrap_err().is_corrupt());
    }

    /// Either a corruption error or a dictionary that answers queries.
    fn assert_rejected_or_usable(bytes: &[u8], what: &str) {
        match PrefixDictionary::from_bytes(bytes) {
            Err(e) => assert!(e.is_corrupt(), "{what}: unexpected error {e}"),
            Ok(dict) => {
                let all = dict.prefix_search("");
                assert_eq!(all.len(), dict.len(), "{what}");
                for hit in &all {
                    let _ = dict.find(&hit.text);
                }
                let _ = dict.prefix_search("acc");
            }
        }
    }

    #[test]
    fn oversized_length_prefixes_rejected() {
        let dict = sample();
        let bytes = dict.to_bytes();
        let header = dict.header();

        // Offsets of the four sequence length prefixes in the body.
        let nodes_at = HEADER_LEN;
        let edges_at = nodes_at + SEQ_PREFIX_LEN + header.node_count * NODE_LEN;
        let offsets_at = edges_at + SEQ_PREFIX_LEN + header.edge_count * EDGE_LEN;
        let text_at = offsets_at + SEQ_PREFIX_LEN + (header.payload_count + 1) * OFFSET_LEN;
        let stored = u64::from_le_bytes(bytes[text_at as usize..text_at as usize + 8].try_into().unwrap());
        assert_eq!(stored, header.text_len);

        for at in [nodes_at, edges_at, offsets_at, text_at] {
            for huge in [u64::MAX, 0x7f00_0000_0000_0001, 1 << 40] {
                let mut bad = bytes.clone();
                bad[at as usize..at as usize + 8].copy_from_slice(&huge.to_le_bytes());
                let err = PrefixDictionary::from_bytes(&bad).unwrap_err();
                assert!(err.is_corrupt(), "prefix at {at} = {huge:#x}: {err}");
            }
        }

        // High byte only, as a single bit flip would do.
        let mut bad = bytes.clone();
        bad[text_at as usize + 7] = 0x7f;
        assert!(PrefixDictionary::from_bytes(&bad).unwrap_err().is_corrupt());
    }

    #[test]
    fn single_byte_flips_never_abort() {
        let bytes = sample().to_bytes();
        for i in 0..bytes.len() {
            for mask in [0x01u8, 0x80, 0xff] {
                let mut bad = bytes.clone();
                bad[i] ^= mask;
                assert_rejected_or_usable(&bad, &format!("byte {i} ^ {mask:#x}"));
            }
        }
    }

    #[test]
    fn failed_save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // Renaming a file over a non-empty directory fails.
        let target = dir.path().join("dict.bin");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep"), b"x").unwrap();

        let err = sample().save_to_binary_file(&target).unwrap_err();
        assert!(err.is_io(), "{err}");
        assert!(!temp_path(&target).exists());
        assert!(target.join("keep").exists());
    }

    #[test]
    fn tampered_tables_rejected() {
        let dict = sample();

        let mut bad = dict.clone();
        bad.edges[0].child = 0;
        assert!(PrefixDictionary::from_bytes(&bad.to_bytes()).unwrap_err().is_corrupt());

        let mut bad = dict.clone();
        bad.nodes[1].ch = 0xD800;
        assert!(PrefixDictionary::from_bytes(&bad.to_bytes()).unwrap_err().is_corrupt());

        let mut bad = dict.clone();
        bad.nodes[0].subtree_end = 1;
        assert!(PrefixDictionary::from_bytes(&bad.to_bytes()).unwrap_err().is_corrupt());

        let mut bad = dict.clone();
        let last = bad.payload_offsets.len() - 2;
        bad.payload_offsets[last] = bad.payload_offsets[last + 1] + 1;
        assert!(PrefixDictionary::from_bytes(&bad.to_bytes()).unwrap_err().is_corrupt());
    }
}
