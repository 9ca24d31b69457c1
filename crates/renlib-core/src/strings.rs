//! # Annotation String Pool
//!
//! Append-only byte buffer holding `[u16 LE length][UTF-8 bytes]` entries,
//! plus one open-addressing slot table per [`AnnotationKind`] mapping a node
//! id to the offset of its latest entry.
//!
//! Entries are never removed. Re-inserting for the same `(node, kind)` key
//! appends a new entry and repoints the slot; an empty entry reads back as
//! "no annotation". Only [`StringPool::reset`] reclaims space.

use crate::primitives::{MAX_ANNOTATION_BYTES, STRING_POOL_INITIAL_BYTES};
use crate::{AnnotationKind, NodeId};

/// Raw "empty slot" key.
const EMPTY_SLOT: u32 = u32::MAX;

/// Length prefix size of a pool entry.
const ENTRY_HEADER: usize = 2;

/// Linear-probing table keyed by node id.
#[derive(Debug)]
struct SlotTable {
    keys: Vec<u32>,
    offsets: Vec<usize>,
    used: usize,
    initial_bits: u32,
}

impl SlotTable {
    fn new(bits: u32) -> Self {
        let size = 1usize << bits;
        Self {
            keys: vec![EMPTY_SLOT; size],
            offsets: vec![0; size],
            used: 0,
            initial_bits: bits,
        }
    }

    #[inline]
    fn mask(&self) -> usize {
        self.keys.len() - 1
    }

    fn reset(&mut self) {
        *self = Self::new(self.initial_bits);
    }

    /// Slot holding `node`, or the empty slot where it would go.
    fn probe(&self, node: u32) -> usize {
        let mask = self.mask();
        let mut slot = node as usize & mask;
        loop {
            let key = self.keys[slot];
            if key == EMPTY_SLOT || key == node {
                return slot;
            }
            slot = (slot + 1) & mask;
        }
    }

    fn get(&self, node: u32) -> Option<usize> {
        let slot = self.probe(node);
        (self.keys[slot] == node).then(|| self.offsets[slot])
    }

    fn set(&mut self, node: u32, offset: usize) {
        // Keep the load factor at or below one half so probing terminates.
        if (self.used + 1) * 2 > self.keys.len() {
            self.grow();
        }
        let slot = self.probe(node);
        if self.keys[slot] == EMPTY_SLOT {
            self.keys[slot] = node;
            self.used += 1;
        }
        self.offsets[slot] = offset;
    }

    fn grow(&mut self) {
        let old_keys = std::mem::take(&mut self.keys);
        let old_offsets = std::mem::take(&mut self.offsets);
        let size = old_keys.len() * 2;
        self.keys = vec![EMPTY_SLOT; size];
        self.offsets = vec![0; size];
        for (key, offset) in old_keys.into_iter().zip(old_offsets) {
            if key != EMPTY_SLOT {
                let slot = self.probe(key);
                self.keys[slot] = key;
                self.offsets[slot] = offset;
            }
        }
    }
}

/// Per-node comment and text storage.
#[derive(Debug)]
pub struct StringPool {
    bytes: Vec<u8>,
    comments: SlotTable,
    texts: SlotTable,
}

impl StringPool {
    /// Create an empty pool whose slot tables start at 2^`table_bits` slots.
    #[must_use]
    pub fn new(table_bits: u32) -> Self {
        Self {
            bytes: Vec::with_capacity(STRING_POOL_INITIAL_BYTES),
            comments: SlotTable::new(table_bits),
            texts: SlotTable::new(table_bits),
        }
    }

    /// Forget every annotation.
    pub fn reset(&mut self) {
        self.bytes.clear();
        self.comments.reset();
        self.texts.reset();
    }

    /// Bytes appended so far, including superseded entries.
    #[must_use]
    pub fn bytes_used(&self) -> usize {
        self.bytes.len()
    }

    fn table(&self, kind: AnnotationKind) -> &SlotTable {
        match kind {
            AnnotationKind::Comment => &self.comments,
            AnnotationKind::Text => &self.texts,
        }
    }

    fn table_mut(&mut self, kind: AnnotationKind) -> &mut SlotTable {
        match kind {
            AnnotationKind::Comment => &mut self.comments,
            AnnotationKind::Text => &mut self.texts,
        }
    }

    /// Store `text` as the `kind` annotation of `node`.
    ///
    /// Text longer than the u16 length prefix allows is cut at the last
    /// character boundary that fits. An empty string clears the annotation.
    pub fn insert(&mut self, node: NodeId, kind: AnnotationKind, text: &str) {
        let mut end = text.len().min(MAX_ANNOTATION_BYTES);
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        let payload = &text.as_bytes()[..end];

        if payload.is_empty() && self.table(kind).get(node.0).is_none() {
            return;
        }

        if self.bytes.len() + ENTRY_HEADER + payload.len() > self.bytes.capacity() {
            let target = (self.bytes.capacity() * 2).max(self.bytes.len() + ENTRY_HEADER + payload.len());
            self.bytes.reserve_exact(target - self.bytes.len());
        }

        let offset = self.bytes.len();
        self.bytes
            .extend_from_slice(&(payload.len() as u16).to_le_bytes());
        self.bytes.extend_from_slice(payload);
        self.table_mut(kind).set(node.0, offset);
    }

    /// The `kind` annotation of `node`, if present and non-empty.
    #[must_use]
    pub fn get(&self, node: NodeId, kind: AnnotationKind) -> Option<&str> {
        let offset = self.table(kind).get(node.0)?;
        let header = self.bytes.get(offset..offset + ENTRY_HEADER)?;
        let len = u16::from_le_bytes([header[0], header[1]]) as usize;
        if len == 0 {
            return None;
        }
        let body = self.bytes.get(offset + ENTRY_HEADER..offset + ENTRY_HEADER + len)?;
        std::str::from_utf8(body).ok()
    }

    /// Whether `node` has a non-empty `kind` annotation.
    #[must_use]
    pub fn contains(&self, node: NodeId, kind: AnnotationKind) -> bool {
        self.get(node, kind).is_some()
    }

    /// Clear both annotations of `node`.
    pub fn clear_node(&mut self, node: NodeId) {
        for kind in AnnotationKind::ALL {
            if self.contains(node, kind) {
                self.insert(node, kind, "");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get_per_kind() {
        let mut pool = StringPool::new(4);
        pool.insert(NodeId(3), AnnotationKind::Comment, "hello");
        pool.insert(NodeId(3), AnnotationKind::Text, "A");
        assert_eq!(pool.get(NodeId(3), AnnotationKind::Comment), Some("hello"));
        assert_eq!(pool.get(NodeId(3), AnnotationKind::Text), Some("A"));
        assert_eq!(pool.get(NodeId(4), AnnotationKind::Comment), None);
    }

    #[test]
    fn reinsert_replaces() {
        let mut pool = StringPool::new(4);
        pool.insert(NodeId(1), AnnotationKind::Comment, "first");
        pool.insert(NodeId(1), AnnotationKind::Comment, "second");
        assert_eq!(pool.get(NodeId(1), AnnotationKind::Comment), Some("second"));
    }

    #[test]
    fn empty_insert_clears() {
        let mut pool = StringPool::new(4);
        pool.insert(NodeId(1), AnnotationKind::Text, "B");
        pool.insert(NodeId(1), AnnotationKind::Text, "");
        assert!(!pool.contains(NodeId(1), AnnotationKind::Text));
    }

    #[test]
    fn table_grows_past_initial_size() {
        let mut pool = StringPool::new(2);
        for i in 0..100 {
            pool.insert(NodeId(i), AnnotationKind::Comment, &format!("c{}", i));
        }
        for i in 0..100 {
            assert_eq!(
                pool.get(NodeId(i), AnnotationKind::Comment),
                Some(format!("c{}", i).as_str())
            );
        }
    }

    #[test]
    fn colliding_nodes_probe_linearly() {
        let mut pool = StringPool::new(3);
        pool.insert(NodeId(1), AnnotationKind::Comment, "one");
        pool.insert(NodeId(9), AnnotationKind::Comment, "nine");
        assert_eq!(pool.get(NodeId(1), AnnotationKind::Comment), Some("one"));
        assert_eq!(pool.get(NodeId(9), AnnotationKind::Comment), Some("nine"));
    }

    #[test]
    fn oversized_text_is_cut_on_char_boundary() {
        let mut pool = StringPool::new(4);
        let long = "あ".repeat(MAX_ANNOTATION_BYTES / 3 + 10);
        pool.insert(NodeId(1), AnnotationKind::Comment, &long);
        let stored = pool.get(NodeId(1), AnnotationKind::Comment).expect("stored");
        assert!(stored.len() <= MAX_ANNOTATION_BYTES);
        assert!(long.starts_with(stored));
    }

    #[test]
    fn reset_forgets_everything() {
        let mut pool = StringPool::new(4);
        pool.insert(NodeId(1), AnnotationKind::Comment, "x");
        pool.reset();
        assert_eq!(pool.bytes_used(), 0);
        assert!(!pool.contains(NodeId(1), AnnotationKind::Comment));
    }

    #[test]
    fn clear_node_drops_both_kinds() {
        let mut pool = StringPool::new(4);
        pool.insert(NodeId(2), AnnotationKind::Comment, "c");
        pool.insert(NodeId(2), AnnotationKind::Text, "t");
        pool.clear_node(NodeId(2));
        assert!(!pool.contains(NodeId(2), AnnotationKind::Comment));
        assert!(!pool.contains(NodeId(2), AnnotationKind::Text));
    }
}
