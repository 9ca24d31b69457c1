//! # Transposition Index
//!
//! Intrusive chained hash table from a canonical position hash to the nodes
//! recorded at that position.
//!
//! The bucket array holds only chain heads; the chain links and the full
//! hash live in the arena's `hash_next` and `stored_hash` columns, so the
//! index adds no per-node allocation. Buckets are selected by the low bits
//! of the hash and every lookup compares the full 64-bit value.

use crate::arena::NodeArena;
use crate::NodeId;

/// Raw "empty bucket" value.
const EMPTY_BUCKET: u32 = u32::MAX;

/// Canonical hash → node chains.
#[derive(Debug)]
pub struct TranspositionIndex {
    heads: Vec<u32>,
    mask: u64,
}

impl TranspositionIndex {
    /// Create an index with 2^`bits` buckets.
    #[must_use]
    pub fn new(bits: u32) -> Self {
        let size = 1usize << bits;
        Self {
            heads: vec![EMPTY_BUCKET; size],
            mask: (size as u64) - 1,
        }
    }

    /// Empty every bucket. The caller resets the arena columns alongside.
    pub fn reset(&mut self) {
        self.heads.fill(EMPTY_BUCKET);
    }

    #[inline]
    fn bucket(&self, hash: u64) -> usize {
        (hash & self.mask) as usize
    }

    #[inline]
    fn head(&self, bucket: usize) -> Option<NodeId> {
        self.heads
            .get(bucket)
            .and_then(|&raw| (raw != EMPTY_BUCKET).then_some(NodeId(raw)))
    }

    /// Record `node` under `hash`, at the head of its bucket chain.
    ///
    /// A node already registered is unlinked from its old chain first.
    pub fn insert(&mut self, arena: &mut NodeArena, node: NodeId, hash: u64) {
        if !arena.contains(node) {
            return;
        }
        self.remove(arena, node);
        let bucket = self.bucket(hash);
        arena.set_stored_hash(node, Some(hash));
        arena.set_hash_next(node, self.head(bucket));
        self.heads[bucket] = node.0;
    }

    /// Unlink `node`. Returns `false` when it was not registered.
    pub fn remove(&mut self, arena: &mut NodeArena, node: NodeId) -> bool {
        let Some(hash) = arena.stored_hash(node) else {
            return false;
        };
        let bucket = self.bucket(hash);
        let next = arena.hash_next(node);

        let mut prev: Option<NodeId> = None;
        let mut cursor = self.head(bucket);
        while let Some(current) = cursor {
            if current == node {
                match prev {
                    None => self.heads[bucket] = next.map_or(EMPTY_BUCKET, |n| n.0),
                    Some(p) => arena.set_hash_next(p, next),
                }
                break;
            }
            prev = Some(current);
            cursor = arena.hash_next(current);
        }

        arena.set_stored_hash(node, None);
        arena.set_hash_next(node, None);
        true
    }

    /// Every node recorded under `hash`, most recently registered first.
    #[must_use]
    pub fn lookup(&self, arena: &NodeArena, hash: u64) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut cursor = self.head(self.bucket(hash));
        while let Some(node) = cursor {
            if arena.stored_hash(node) == Some(hash) {
                found.push(node);
            }
            cursor = arena.hash_next(node);
        }
        found
    }

    /// Most recently registered node under `hash`.
    #[must_use]
    pub fn first(&self, arena: &NodeArena, hash: u64) -> Option<NodeId> {
        let mut cursor = self.head(self.bucket(hash));
        while let Some(node) = cursor {
            if arena.stored_hash(node) == Some(hash) {
                return Some(node);
            }
            cursor = arena.hash_next(node);
        }
        None
    }

    /// Whether any node is recorded under `hash`.
    #[must_use]
    pub fn contains(&self, arena: &NodeArena, hash: u64) -> bool {
        self.first(arena, hash).is_some()
    }
}
