//! # Library Engine
//!
//! The one value that owns a move tree: node arena, annotation pool,
//! transposition index, key table and sizing configuration.
//!
//! Every load builds into a fresh library (see [`Library::empty_like`]) and
//! the caller swaps it in only on success, so a failed load never disturbs
//! the tree that was open before.

use crate::arena::NodeArena;
use crate::board::BoardState;
use crate::primitives::BOARD_CELLS;
use crate::strings::StringPool;
use crate::symmetry::SymmetryKeys;
use crate::transposition::TranspositionIndex;
use crate::{AnnotationKind, Coord, LibraryConfig, LibraryError, NodeId, Stone};
use std::sync::Arc;

/// Move tree plus its side tables.
#[derive(Debug)]
pub struct Library {
    config: LibraryConfig,
    keys: Arc<SymmetryKeys>,
    arena: NodeArena,
    strings: StringPool,
    positions: TranspositionIndex,
}

/// Iterator over the children of a node, head of the sibling list first.
#[derive(Debug, Clone)]
pub struct Children<'a> {
    arena: &'a NodeArena,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.arena.sibling(current);
        Some(current)
    }
}

impl Library {
    /// Create a library holding only the root, with the empty-board hash
    /// registered at node 0.
    pub fn new(config: LibraryConfig, keys: Arc<SymmetryKeys>) -> Result<Self, LibraryError> {
        config.validate()?;
        let mut library = Self {
            arena: NodeArena::new(config.max_nodes),
            strings: StringPool::new(config.annotation_table_bits),
            positions: TranspositionIndex::new(config.hash_table_bits),
            config,
            keys,
        };
        library.register_root();
        Ok(library)
    }

    /// Fresh library sharing this one's configuration and key table.
    #[must_use]
    pub fn empty_like(&self) -> Self {
        let mut library = Self {
            arena: NodeArena::new(self.config.max_nodes),
            strings: StringPool::new(self.config.annotation_table_bits),
            positions: TranspositionIndex::new(self.config.hash_table_bits),
            config: self.config.clone(),
            keys: Arc::clone(&self.keys),
        };
        library.register_root();
        library
    }

    /// Drop the whole tree (new-board semantics).
    pub fn reset(&mut self) {
        self.arena.reset();
        self.strings.reset();
        self.positions.reset();
        self.register_root();
    }

    fn register_root(&mut self) {
        let empty = BoardState::new(Arc::clone(&self.keys));
        self.positions
            .insert(&mut self.arena, NodeId::ROOT, empty.canonical_hash());
    }

    /// Sizing configuration.
    #[must_use]
    pub fn config(&self) -> &LibraryConfig {
        &self.config
    }

    /// Key table used for every hash in this library.
    #[must_use]
    pub fn keys(&self) -> &Arc<SymmetryKeys> {
        &self.keys
    }

    /// A board bound to this library's key table.
    #[must_use]
    pub fn new_board(&self) -> BoardState {
        BoardState::new(Arc::clone(&self.keys))
    }

    // =========================================================================
    // TREE
    // =========================================================================

    /// Live nodes, root included.
    #[must_use]
    pub fn node_count(&self) -> u32 {
        self.arena.node_count()
    }

    /// Whether `node` exists.
    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        self.arena.contains(node)
    }

    fn require(&self, node: NodeId) -> Result<(), LibraryError> {
        if self.arena.contains(node) {
            Ok(())
        } else {
            Err(LibraryError::NodeNotFound(node))
        }
    }

    #[must_use]
    pub fn coord(&self, node: NodeId) -> Coord {
        self.arena.coord(node)
    }

    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.arena.parent(node)
    }

    #[must_use]
    pub fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.arena.child(node)
    }

    #[must_use]
    pub fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.arena.sibling(node)
    }

    /// Children of `node`, most recently added first.
    #[must_use]
    pub fn children(&self, node: NodeId) -> Children<'_> {
        Children {
            arena: &self.arena,
            next: self.arena.child(node),
        }
    }

    /// Child of `parent` carrying exactly `coord`.
    #[must_use]
    pub fn find_child(&self, parent: NodeId, coord: Coord) -> Option<NodeId> {
        self.children(parent).find(|&c| self.arena.coord(c) == coord)
    }

    /// Prepend a new child at `coord` to the child list of `parent`.
    pub fn add_child(&mut self, parent: NodeId, coord: Coord) -> Result<NodeId, LibraryError> {
        self.require(parent)?;
        let node = self.arena.allocate()?;
        self.arena.set_coord(node, coord);
        self.arena.set_parent(node, Some(parent));
        self.arena.set_sibling(node, self.arena.child(parent));
        self.arena.set_child(parent, Some(node));
        Ok(node)
    }

    /// Existing child of `parent` at `coord`, or a new one.
    ///
    /// The flag is `true` when the child was created by this call.
    pub fn get_or_create_child(
        &mut self,
        parent: NodeId,
        coord: Coord,
    ) -> Result<(NodeId, bool), LibraryError> {
        if let Some(existing) = self.find_child(parent, coord) {
            return Ok((existing, false));
        }
        self.add_child(parent, coord).map(|node| (node, true))
    }

    /// Moves from the root down to `node` (the root itself contributes none).
    #[must_use]
    pub fn path(&self, node: NodeId) -> Vec<Coord> {
        let mut moves = Vec::new();
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current.is_root() || !self.arena.contains(current) {
                break;
            }
            moves.push(self.arena.coord(current));
            cursor = self.arena.parent(current);
        }
        moves.reverse();
        moves
    }

    /// Distance from the root.
    #[must_use]
    pub fn depth(&self, node: NodeId) -> usize {
        self.path(node).len()
    }

    /// Detach `node` and its whole subtree.
    ///
    /// Every node of the subtree leaves the transposition index. Arena slots
    /// are not reclaimed. Returns the number of nodes detached; the root
    /// cannot be deleted and yields zero.
    pub fn delete_subtree(&mut self, node: NodeId) -> Result<u32, LibraryError> {
        self.require(node)?;
        if node.is_root() {
            return Ok(0);
        }

        if let Some(parent) = self.arena.parent(node) {
            let next = self.arena.sibling(node);
            if self.arena.child(parent) == Some(node) {
                self.arena.set_child(parent, next);
            } else {
                let mut cursor = self.arena.child(parent);
                while let Some(current) = cursor {
                    let following = self.arena.sibling(current);
                    if following == Some(node) {
                        self.arena.set_sibling(current, next);
                        break;
                    }
                    cursor = following;
                }
            }
        }
        self.arena.set_sibling(node, None);

        let mut detached = 0u32;
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            self.positions.remove(&mut self.arena, current);
            detached += 1;
            stack.extend(self.children(current));
        }
        tracing::debug!(node = %node, detached, "deleted subtree");
        Ok(detached)
    }

    // =========================================================================
    // ANNOTATIONS
    // =========================================================================

    /// The `kind` annotation of `node`.
    #[must_use]
    pub fn annotation(&self, node: NodeId, kind: AnnotationKind) -> Option<&str> {
        self.strings.get(node, kind)
    }

    #[must_use]
    pub fn comment(&self, node: NodeId) -> Option<&str> {
        self.strings.get(node, AnnotationKind::Comment)
    }

    #[must_use]
    pub fn text(&self, node: NodeId) -> Option<&str> {
        self.strings.get(node, AnnotationKind::Text)
    }

    /// Set the `kind` annotation of `node`. An empty string clears it.
    pub fn set_annotation(
        &mut self,
        node: NodeId,
        kind: AnnotationKind,
        text: &str,
    ) -> Result<(), LibraryError> {
        self.require(node)?;
        self.strings.insert(node, kind, text);
        Ok(())
    }

    /// Bytes held by the annotation pool.
    #[must_use]
    pub fn annotation_bytes(&self) -> usize {
        self.strings.bytes_used()
    }

    // =========================================================================
    // POSITIONS
    // =========================================================================

    /// Record `node` as reaching the position with canonical `hash`.
    pub fn register_position(&mut self, node: NodeId, hash: u64) -> Result<(), LibraryError> {
        self.require(node)?;
        self.positions.insert(&mut self.arena, node, hash);
        Ok(())
    }

    /// Nodes recorded at canonical `hash`, most recent first.
    #[must_use]
    pub fn positions(&self, hash: u64) -> Vec<NodeId> {
        self.positions.lookup(&self.arena, hash)
    }

    /// Most recent node recorded at canonical `hash`.
    #[must_use]
    pub fn first_position(&self, hash: u64) -> Option<NodeId> {
        self.positions.first(&self.arena, hash)
    }

    #[must_use]
    pub fn has_position(&self, hash: u64) -> bool {
        self.positions.contains(&self.arena, hash)
    }

    /// Canonical hash `node` is registered under, if any.
    #[must_use]
    pub fn stored_hash(&self, node: NodeId) -> Option<u64> {
        self.arena.stored_hash(node)
    }

    /// Grid reached by replaying the path to `node` from the empty board.
    ///
    /// Black plays the root's child; every ply alternates, passes included,
    /// so the grid agrees with [`BoardState`] replaying the same path and a
    /// pass hands the move to the other side. Off-board legacy coordinates
    /// are skipped like the codecs skip them.
    #[must_use]
    pub fn position_grid(&self, node: NodeId) -> [Stone; BOARD_CELLS] {
        let mut grid = [Stone::Empty; BOARD_CELLS];
        let mut player = Stone::Black;
        for coord in self.path(node).into_iter().filter(|c| c.is_playable()) {
            if let Some(cell) = coord.cell() {
                grid[cell] = player;
            }
            player = player.opponent();
        }
        grid
    }

    // =========================================================================
    // CODEC HOOKS
    // =========================================================================

    /// Allocate an unlinked node at `coord`.
    pub(crate) fn allocate_node(&mut self, coord: Coord) -> Result<NodeId, LibraryError> {
        let node = self.arena.allocate()?;
        self.arena.set_coord(node, coord);
        Ok(node)
    }

    /// Make `child` the head of `parent`'s child list.
    pub(crate) fn link_first_child(&mut self, parent: NodeId, child: NodeId) {
        self.arena.set_parent(child, Some(parent));
        self.arena.set_child(parent, Some(child));
    }

    /// Append `node` after `previous` in the same child list.
    pub(crate) fn link_next_sibling(&mut self, previous: NodeId, node: NodeId) {
        self.arena.set_parent(node, self.arena.parent(previous));
        self.arena.set_sibling(previous, Some(node));
    }

    /// Forget a just-allocated, unlinked node and its annotations.
    pub(crate) fn discard_last(&mut self, node: NodeId) -> bool {
        self.positions.remove(&mut self.arena, node);
        self.strings.clear_node(node);
        self.arena.release_last(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> Library {
        Library::new(LibraryConfig::compact(), Arc::new(SymmetryKeys::from_seed(3)))
            .expect("library")
    }

    #[test]
    fn position_grid_counts_passes_like_the_board() {
        let mut lib = library();
        let pass = lib.add_child(NodeId::ROOT, Coord::PASS).expect("pass");
        let a = lib.add_child(pass, Coord::new(7, 7)).expect("a");
        let mut board = lib.new_board();
        board.play(Coord::PASS);
        board.play(Coord::new(7, 7));
        assert_eq!(&lib.position_grid(a), board.grid());
        assert_eq!(board.stone(Coord::new(7, 7)), Stone::White);
    }

    #[test]
    fn root_registered_at_empty_hash() {
        let lib = library();
        let empty = lib.new_board().canonical_hash();
        assert_eq!(lib.positions(empty), vec![NodeId::ROOT]);
        assert_eq!(lib.node_count(), 1);
    }

    #[test]
    fn add_child_prepends() {
        let mut lib = library();
        let a = lib.add_child(NodeId::ROOT, Coord::new(7, 7)).expect("a");
        let b = lib.add_child(NodeId::ROOT, Coord::new(6, 6)).expect("b");
        let kids: Vec<_> = lib.children(NodeId::ROOT).collect();
        assert_eq!(kids, vec![b, a]);
        assert_eq!(lib.parent(a), Some(NodeId::ROOT));
    }

    #[test]
    fn get_or_create_reuses_existing_child() {
        let mut lib = library();
        let (a, created) = lib
            .get_or_create_child(NodeId::ROOT, Coord::new(7, 7))
            .expect("create");
        assert!(created);
        let (again, created) = lib
            .get_or_create_child(NodeId::ROOT, Coord::new(7, 7))
            .expect("reuse");
        assert!(!created);
        assert_eq!(a, again);
        assert_eq!(lib.node_count(), 2);
    }

    #[test]
    fn path_and_depth() {
        let mut lib = library();
        let a = lib.add_child(NodeId::ROOT, Coord::new(7, 7)).expect("a");
        let b = lib.add_child(a, Coord::new(8, 8)).expect("b");
        assert_eq!(lib.path(b), vec![Coord::new(7, 7), Coord::new(8, 8)]);
        assert_eq!(lib.depth(b), 2);
        assert_eq!(lib.depth(NodeId::ROOT), 0);
    }

    #[test]
    fn add_child_to_missing_parent_fails() {
        let mut lib = library();
        let err = lib.add_child(NodeId(9), Coord::new(1, 1)).unwrap_err();
        assert_eq!(err, LibraryError::NodeNotFound(NodeId(9)));
    }

    #[test]
    fn annotations_set_and_clear() {
        let mut lib = library();
        let a = lib.add_child(NodeId::ROOT, Coord::new(7, 7)).expect("a");
        lib.set_annotation(a, AnnotationKind::Comment, "main line").expect("set");
        assert_eq!(lib.comment(a), Some("main line"));
        lib.set_annotation(a, AnnotationKind::Comment, "").expect("clear");
        assert_eq!(lib.comment(a), None);
    }

    #[test]
    fn delete_subtree_unlinks_and_unregisters() {
        let mut lib = library();
        let a = lib.add_child(NodeId::ROOT, Coord::new(7, 7)).expect("a");
        let b = lib.add_child(NodeId::ROOT, Coord::new(6, 6)).expect("b");
        let c = lib.add_child(a, Coord::new(8, 8)).expect("c");
        lib.register_position(a, 11).expect("reg a");
        lib.register_position(c, 12).expect("reg c");
        lib.register_position(b, 13).expect("reg b");

        let detached = lib.delete_subtree(a).expect("delete");
        assert_eq!(detached, 2);
        assert_eq!(lib.children(NodeId::ROOT).collect::<Vec<_>>(), vec![b]);
        assert!(!lib.has_position(11));
        assert!(!lib.has_position(12));
        assert_eq!(lib.positions(13), vec![b]);
    }

    #[test]
    fn delete_middle_sibling() {
        let mut lib = library();
        let a = lib.add_child(NodeId::ROOT, Coord::new(1, 1)).expect("a");
        let b = lib.add_child(NodeId::ROOT, Coord::new(2, 2)).expect("b");
        let c = lib.add_child(NodeId::ROOT, Coord::new(3, 3)).expect("c");
        lib.delete_subtree(b).expect("delete");
        assert_eq!(lib.children(NodeId::ROOT).collect::<Vec<_>>(), vec![c, a]);
    }

    #[test]
    fn root_cannot_be_deleted() {
        let mut lib = library();
        assert_eq!(lib.delete_subtree(NodeId::ROOT), Ok(0));
        assert!(lib.has_position(lib.new_board().canonical_hash()));
    }

    #[test]
    fn position_grid_alternates_from_black() {
        let mut lib = library();
        let a = lib.add_child(NodeId::ROOT, Coord::new(7, 7)).expect("a");
        let b = lib.add_child(a, Coord::new(8, 8)).expect("b");
        let grid = lib.position_grid(b);
        assert_eq!(grid[7 * 15 + 7], Stone::Black);
        assert_eq!(grid[8 * 15 + 8], Stone::White);
    }

    #[test]
    fn reset_keeps_only_registered_root() {
        let mut lib = library();
        lib.add_child(NodeId::ROOT, Coord::new(7, 7)).expect("a");
        lib.reset();
        assert_eq!(lib.node_count(), 1);
        assert_eq!(lib.first_child(NodeId::ROOT), None);
        assert_eq!(lib.stored_hash(NodeId::ROOT), Some(0));
    }

    #[test]
    fn capacity_error_surfaces_from_add_child() {
        let mut lib = Library::new(
            LibraryConfig {
                max_nodes: 2,
                ..LibraryConfig::compact()
            },
            Arc::new(SymmetryKeys::from_seed(3)),
        )
        .expect("library");
        lib.add_child(NodeId::ROOT, Coord::new(7, 7)).expect("fits");
        assert_eq!(
            lib.add_child(NodeId::ROOT, Coord::new(6, 6)),
            Err(LibraryError::CapacityExceeded { cap: 2 })
        );
    }
}
