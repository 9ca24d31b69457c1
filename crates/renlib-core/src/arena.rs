//! # Node Arena
//!
//! Chunked struct-of-arrays storage for tree nodes.
//!
//! Every column (coordinates, parent/child/sibling links, stored hash and
//! the transposition chain link) lives in its own fixed-size array per chunk.
//! A node id splits into `(chunk, slot)` with a shift and a mask, and chunks
//! are never moved once allocated, so ids stay valid across growth.
//!
//! Link writers do no structural validation: callers keep the tree
//! invariants (`parent(child(n)) == n`, `parent(sibling(n)) == parent(n)`).
//! Ids outside the allocated range read as empty and ignore writes.

use crate::primitives::{CHUNK_BITS, CHUNK_MASK, CHUNK_SIZE};
use crate::{Coord, LibraryError, NodeId};

/// Raw "no link" value inside the link columns.
const NO_LINK: u32 = u32::MAX;

#[inline]
fn encode_link(link: Option<NodeId>) -> u32 {
    link.map_or(NO_LINK, |id| id.0)
}

#[inline]
fn decode_link(raw: u32) -> Option<NodeId> {
    (raw != NO_LINK).then_some(NodeId(raw))
}

#[inline]
fn locate(id: NodeId) -> (usize, usize) {
    ((id.0 >> CHUNK_BITS) as usize, (id.0 & CHUNK_MASK) as usize)
}

/// One fixed-size block of node columns.
struct Chunk {
    x: Box<[i8]>,
    y: Box<[i8]>,
    parent: Box<[u32]>,
    child: Box<[u32]>,
    sibling: Box<[u32]>,
    hash: Box<[u64]>,
    hash_next: Box<[u32]>,
    hashed: Box<[bool]>,
}

impl Chunk {
    fn new() -> Self {
        Self {
            x: vec![-1; CHUNK_SIZE].into_boxed_slice(),
            y: vec![-1; CHUNK_SIZE].into_boxed_slice(),
            parent: vec![NO_LINK; CHUNK_SIZE].into_boxed_slice(),
            child: vec![NO_LINK; CHUNK_SIZE].into_boxed_slice(),
            sibling: vec![NO_LINK; CHUNK_SIZE].into_boxed_slice(),
            hash: vec![0; CHUNK_SIZE].into_boxed_slice(),
            hash_next: vec![NO_LINK; CHUNK_SIZE].into_boxed_slice(),
            hashed: vec![false; CHUNK_SIZE].into_boxed_slice(),
        }
    }

    fn clear_slot(&mut self, slot: usize) {
        self.x[slot] = -1;
        self.y[slot] = -1;
        self.parent[slot] = NO_LINK;
        self.child[slot] = NO_LINK;
        self.sibling[slot] = NO_LINK;
        self.hash[slot] = 0;
        self.hash_next[slot] = NO_LINK;
        self.hashed[slot] = false;
    }
}

/// Append-only node store with a live-node cap.
pub struct NodeArena {
    chunks: Vec<Chunk>,
    len: u32,
    cap: u32,
}

impl std::fmt::Debug for NodeArena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeArena")
            .field("len", &self.len)
            .field("cap", &self.cap)
            .field("chunks", &self.chunks.len())
            .finish()
    }
}

impl NodeArena {
    /// Create an arena holding only the root, capped at `cap` live nodes.
    #[must_use]
    pub fn new(cap: u32) -> Self {
        Self {
            chunks: vec![Chunk::new()],
            len: 1,
            cap: cap.max(1),
        }
    }

    /// Drop every node except a fresh root.
    pub fn reset(&mut self) {
        self.chunks.truncate(1);
        match self.chunks.first_mut() {
            Some(first) => {
                let used = (self.len as usize).min(CHUNK_SIZE);
                for slot in 0..used {
                    first.clear_slot(slot);
                }
            }
            None => self.chunks.push(Chunk::new()),
        }
        self.len = 1;
    }

    /// Live nodes, root included.
    #[inline]
    #[must_use]
    pub fn node_count(&self) -> u32 {
        self.len
    }

    /// Cap on live nodes.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.cap
    }

    /// Whether `id` names an allocated node.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.len
    }

    /// Allocate a node with pass coordinates and no links.
    ///
    /// Fails with `CapacityExceeded` once the live count reaches the cap.
    pub fn allocate(&mut self) -> Result<NodeId, LibraryError> {
        if self.len >= self.cap {
            return Err(LibraryError::CapacityExceeded { cap: self.cap });
        }
        let id = NodeId(self.len);
        let (chunk, _) = locate(id);
        if chunk == self.chunks.len() {
            self.chunks.push(Chunk::new());
        }
        self.len += 1;
        Ok(id)
    }

    /// Return the most recently allocated node to the free range.
    ///
    /// Only the last node can be released, and never the root. The caller
    /// guarantees nothing links to it.
    pub(crate) fn release_last(&mut self, id: NodeId) -> bool {
        if id.is_root() || id.0 + 1 != self.len {
            return false;
        }
        let (chunk, slot) = locate(id);
        if let Some(chunk) = self.chunks.get_mut(chunk) {
            chunk.clear_slot(slot);
        }
        self.len -= 1;
        true
    }

    #[inline]
    fn chunk(&self, id: NodeId) -> Option<(&Chunk, usize)> {
        if !self.contains(id) {
            return None;
        }
        let (chunk, slot) = locate(id);
        self.chunks.get(chunk).map(|c| (c, slot))
    }

    #[inline]
    fn chunk_mut(&mut self, id: NodeId) -> Option<(&mut Chunk, usize)> {
        if !self.contains(id) {
            return None;
        }
        let (chunk, slot) = locate(id);
        self.chunks.get_mut(chunk).map(|c| (c, slot))
    }

    // -------------------------------------------------------------------------
    // Coordinates
    // -------------------------------------------------------------------------

    /// Move coordinate of a node.
    #[inline]
    #[must_use]
    pub fn coord(&self, id: NodeId) -> Coord {
        self.chunk(id)
            .map(|(c, s)| Coord::new(c.x[s], c.y[s]))
            .unwrap_or(Coord::PASS)
    }

    /// Overwrite the move coordinate of a node.
    #[inline]
    pub fn set_coord(&mut self, id: NodeId, coord: Coord) {
        if let Some((c, s)) = self.chunk_mut(id) {
            c.x[s] = coord.x;
            c.y[s] = coord.y;
        }
    }

    // -------------------------------------------------------------------------
    // Tree links
    // -------------------------------------------------------------------------

    #[inline]
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.chunk(id).and_then(|(c, s)| decode_link(c.parent[s]))
    }

    #[inline]
    #[must_use]
    pub fn child(&self, id: NodeId) -> Option<NodeId> {
        self.chunk(id).and_then(|(c, s)| decode_link(c.child[s]))
    }

    #[inline]
    #[must_use]
    pub fn sibling(&self, id: NodeId) -> Option<NodeId> {
        self.chunk(id).and_then(|(c, s)| decode_link(c.sibling[s]))
    }

    #[inline]
    pub fn set_parent(&mut self, id: NodeId, parent: Option<NodeId>) {
        if let Some((c, s)) = self.chunk_mut(id) {
            c.parent[s] = encode_link(parent);
        }
    }

    #[inline]
    pub fn set_child(&mut self, id: NodeId, child: Option<NodeId>) {
        if let Some((c, s)) = self.chunk_mut(id) {
            c.child[s] = encode_link(child);
        }
    }

    #[inline]
    pub fn set_sibling(&mut self, id: NodeId, sibling: Option<NodeId>) {
        if let Some((c, s)) = self.chunk_mut(id) {
            c.sibling[s] = encode_link(sibling);
        }
    }

    // -------------------------------------------------------------------------
    // Transposition columns
    // -------------------------------------------------------------------------

    /// Canonical hash stored for a node, if it is registered.
    #[inline]
    #[must_use]
    pub fn stored_hash(&self, id: NodeId) -> Option<u64> {
        self.chunk(id)
            .and_then(|(c, s)| c.hashed[s].then_some(c.hash[s]))
    }

    #[inline]
    pub(crate) fn set_stored_hash(&mut self, id: NodeId, hash: Option<u64>) {
        if let Some((c, s)) = self.chunk_mut(id) {
            c.hash[s] = hash.unwrap_or(0);
            c.hashed[s] = hash.is_some();
        }
    }

    #[inline]
    pub(crate) fn hash_next(&self, id: NodeId) -> Option<NodeId> {
        self.chunk(id).and_then(|(c, s)| decode_link(c.hash_next[s]))
    }

    #[inline]
    pub(crate) fn set_hash_next(&mut self, id: NodeId, next: Option<NodeId>) {
        if let Some((c, s)) = self.chunk_mut(id) {
            c.hash_next[s] = encode_link(next);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
