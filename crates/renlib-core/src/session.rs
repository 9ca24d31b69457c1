//! # Session Module
//!
//! Editor state on top of a [`Library`]: the live board, the node that
//! board corresponds to, the played line and a redo stack.
//!
//! The displayed board may be any rotation or reflection of the position
//! the tree recorded, because a move can follow a continuation stored under
//! another orientation. Every lookup therefore goes through the orientation
//! that maps the live grid onto the current node's recorded grid, and new
//! children are stored in the recorded orientation.
//!
//! Puzzle mode plays a scratch line on top of the live position without
//! touching the tree. Leaving it restores the line, node and redo stack
//! saved on entry.

use crate::board::BoardState;
use crate::formats::{
    read_library, write_library, LibraryFormat, LoadReport, ProgressObserver, ReadOptions,
    WriteOptions,
};
use crate::notation::{moves_to_notation, moves_to_sgf};
use crate::primitives::BOARD_CELLS;
use crate::symmetry::{match_transforms, Symmetry, SymmetryKeys};
use crate::{AnnotationKind, Coord, Library, LibraryConfig, LibraryError, NodeId, Stone};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// =============================================================================
// CONTINUATIONS
// =============================================================================

/// How a continuation was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContinuationKind {
    /// A child of the current node.
    Direct,
    /// Another branch already reaching the resulting position.
    Transposed,
}

/// A recorded move available from the live board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Continuation {
    /// Where to play on the live board.
    pub coord: Coord,
    /// Node the move leads to.
    pub node: NodeId,
    pub kind: ContinuationKind,
    /// Board label of that node.
    pub text: Option<String>,
}

// =============================================================================
// SESSION
// =============================================================================

/// Navigation state parked while puzzle mode is on.
#[derive(Debug, Clone)]
struct SavedLine {
    moves: Vec<Coord>,
    current: NodeId,
    redo: Vec<Coord>,
}

/// One open library plus navigation state.
#[derive(Debug)]
pub struct Session {
    library: Library,
    board: BoardState,
    current: NodeId,
    moves: Vec<Coord>,
    redo: Vec<Coord>,
    puzzle: Option<SavedLine>,
}

impl Session {
    /// Session over an empty library.
    pub fn new(config: LibraryConfig, keys: Arc<SymmetryKeys>) -> Result<Self, LibraryError> {
        Library::new(config, keys).map(Self::from_library)
    }

    /// Session over an existing library, positioned at the root.
    #[must_use]
    pub fn from_library(library: Library) -> Self {
        let board = library.new_board();
        Self {
            library,
            board,
            current: NodeId::ROOT,
            moves: Vec::new(),
            redo: Vec::new(),
            puzzle: None,
        }
    }

    #[must_use]
    pub fn library(&self) -> &Library {
        &self.library
    }

    #[must_use]
    pub fn board(&self) -> &BoardState {
        &self.board
    }

    #[must_use]
    pub fn current_node(&self) -> NodeId {
        self.current
    }

    /// Moves played on the live board, in order. In puzzle mode only the
    /// scratch moves played since entering it.
    #[must_use]
    pub fn moves(&self) -> &[Coord] {
        &self.moves
    }

    #[must_use]
    pub fn to_move(&self) -> Stone {
        self.board.to_move()
    }

    #[must_use]
    pub fn grid(&self) -> &[Stone; BOARD_CELLS] {
        self.board.grid()
    }

    /// The played line in letter + row notation.
    #[must_use]
    pub fn line_notation(&self) -> String {
        moves_to_notation(&self.moves)
    }

    /// The played line as an SGF record.
    #[must_use]
    pub fn line_sgf(&self) -> String {
        moves_to_sgf(&self.moves)
    }

    fn reset_navigation(&mut self) {
        self.board = self.library.new_board();
        self.current = NodeId::ROOT;
        self.moves.clear();
        self.redo.clear();
        self.puzzle = None;
    }

    // -------------------------------------------------------------------------
    // Puzzle mode
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn is_puzzle(&self) -> bool {
        self.puzzle.is_some()
    }

    /// Enter or leave puzzle mode. Returns whether it is now on.
    ///
    /// Entering parks the played line and starts an empty scratch line on
    /// the same board. Leaving drops the scratch moves and rebuilds the
    /// board from the parked line.
    pub fn toggle_puzzle(&mut self) -> bool {
        match self.puzzle.take() {
            None => {
                self.puzzle = Some(SavedLine {
                    moves: std::mem::take(&mut self.moves),
                    current: self.current,
                    redo: std::mem::take(&mut self.redo),
                });
                true
            }
            Some(saved) => {
                self.board = self.library.new_board();
                for &coord in &saved.moves {
                    self.board.play(coord);
                }
                self.moves = saved.moves;
                self.current = saved.current;
                self.redo = saved.redo;
                false
            }
        }
    }

    // -------------------------------------------------------------------------
    // Orientation
    // -------------------------------------------------------------------------

    /// Transform mapping the live grid onto the current node's recorded
    /// grid, preferring the identity.
    fn orientation(&self) -> Option<Symmetry> {
        let recorded = self.library.position_grid(self.current);
        let matches = match_transforms(self.board.grid(), &recorded);
        if matches.contains(&Symmetry::Identity) {
            Some(Symmetry::Identity)
        } else {
            matches.first().copied()
        }
    }

    fn matches_board(&self, node: NodeId) -> bool {
        let recorded = self.library.position_grid(node);
        !match_transforms(self.board.grid(), &recorded).is_empty()
    }

    fn direct_child(&self, coord: Coord, orientation: Option<Symmetry>) -> Option<NodeId> {
        let orientation = orientation?;
        let recorded = orientation.apply(coord);
        self.library.find_child(self.current, recorded)
    }

    fn continuation_with(
        &self,
        coord: Coord,
        orientation: Option<Symmetry>,
        probe: &mut BoardState,
    ) -> Option<Continuation> {
        if !self.board.is_empty_cell(coord) {
            return None;
        }
        let (node, kind) = match self.direct_child(coord, orientation) {
            Some(node) => (node, ContinuationKind::Direct),
            None => {
                let node = self.library.first_position(probe.probe_hash(coord))?;
                (node, ContinuationKind::Transposed)
            }
        };
        Some(Continuation {
            coord,
            node,
            kind,
            text: self.library.text(node).map(str::to_owned),
        })
    }

    /// The recorded continuation played at `coord` on the live board.
    #[must_use]
    pub fn continuation_at(&self, coord: Coord) -> Option<Continuation> {
        if self.is_puzzle() {
            return None;
        }
        let mut probe = self.board.clone();
        self.continuation_with(coord, self.orientation(), &mut probe)
    }

    /// Every empty cell offering a recorded continuation, in row-major order.
    ///
    /// Direct children win over transpositions at the same cell. Empty in
    /// puzzle mode.
    #[must_use]
    pub fn continuations(&self) -> Vec<Continuation> {
        if self.is_puzzle() {
            return Vec::new();
        }
        let orientation = self.orientation();
        let mut probe = self.board.clone();
        (0..BOARD_CELLS)
            .filter_map(|cell| self.continuation_with(Coord::from_cell(cell), orientation, &mut probe))
            .collect()
    }

    // -------------------------------------------------------------------------
    // Moves
    // -------------------------------------------------------------------------

    fn check_playable(&self, coord: Coord) -> Result<(), LibraryError> {
        if !coord.on_board() {
            return Err(LibraryError::InvalidMove {
                coord,
                reason: "off the board",
            });
        }
        if self.board.stone(coord) != Stone::Empty {
            return Err(LibraryError::InvalidMove {
                coord,
                reason: "cell is occupied",
            });
        }
        Ok(())
    }

    /// Node the live board reaches by playing `coord`, created if the tree
    /// has none.
    fn resolve_step(&mut self, coord: Coord) -> Result<NodeId, LibraryError> {
        let orientation = self.orientation();
        let mut probe = self.board.clone();
        if let Some(found) = self.continuation_with(coord, orientation, &mut probe) {
            return Ok(found.node);
        }
        let recorded = orientation.unwrap_or(Symmetry::Identity).apply(coord);
        let hash = probe.probe_hash(coord);
        let (node, created) = self.library.get_or_create_child(self.current, recorded)?;
        if created || self.library.stored_hash(node).is_none() {
            self.library.register_position(node, hash)?;
        }
        Ok(node)
    }

    fn advance(&mut self, coord: Coord) -> Result<NodeId, LibraryError> {
        let node = self.resolve_step(coord)?;
        self.board.play(coord);
        self.moves.push(coord);
        self.current = node;
        Ok(node)
    }

    /// Play `coord` for the side to move and clear the redo stack.
    ///
    /// Follows a recorded continuation when one exists, otherwise records a
    /// new child of the current node. In puzzle mode only the board moves
    /// and the current node is returned unchanged.
    pub fn play(&mut self, coord: Coord) -> Result<NodeId, LibraryError> {
        self.check_playable(coord)?;
        let node = if self.is_puzzle() {
            self.board.play(coord);
            self.moves.push(coord);
            self.current
        } else {
            self.advance(coord)?
        };
        self.redo.clear();
        Ok(node)
    }

    /// Take back up to `steps` moves. Returns how many were taken back.
    pub fn undo(&mut self, steps: usize) -> usize {
        let mut undone = 0;
        while undone < steps {
            let Some(coord) = self.moves.pop() else {
                break;
            };
            self.board.undo();
            self.redo.push(coord);
            undone += 1;
            if self.is_puzzle() {
                continue;
            }
            // A transposition hit may hang under a different position.
            self.current = match self.library.parent(self.current) {
                Some(parent) if self.matches_board(parent) => parent,
                _ => self
                    .library
                    .first_position(self.board.canonical_hash())
                    .unwrap_or(NodeId::ROOT),
            };
        }
        undone
    }

    /// Replay up to `steps` taken-back moves. Returns how many were replayed.
    pub fn redo(&mut self, steps: usize) -> Result<usize, LibraryError> {
        let mut redone = 0;
        while redone < steps {
            let Some(&coord) = self.redo.last() else {
                break;
            };
            if self.is_puzzle() {
                self.board.play(coord);
                self.moves.push(coord);
            } else {
                self.advance(coord)?;
            }
            self.redo.pop();
            redone += 1;
        }
        Ok(redone)
    }

    /// Restart from the empty board and play `line`, stopping at the first
    /// off-board or occupied coordinate. Returns how many moves were played.
    ///
    /// Leaves puzzle mode without restoring the parked line.
    pub fn play_line(&mut self, line: &[Coord]) -> Result<usize, LibraryError> {
        self.reset_navigation();
        let mut played = 0;
        for &coord in line {
            if self.check_playable(coord).is_err() {
                tracing::debug!(%coord, played, "move list stops at unplayable coordinate");
                break;
            }
            self.advance(coord)?;
            played += 1;
        }
        Ok(played)
    }

    // -------------------------------------------------------------------------
    // Annotations
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.library.comment(self.current)
    }

    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.library.text(self.current)
    }

    fn set_current(&mut self, kind: AnnotationKind, text: &str) -> Result<bool, LibraryError> {
        if self.current.is_root() {
            return Ok(false);
        }
        self.library.set_annotation(self.current, kind, text)?;
        Ok(true)
    }

    /// Set the current node's comment. The root is read-only: returns
    /// `false` there and stores nothing.
    pub fn set_comment(&mut self, text: &str) -> Result<bool, LibraryError> {
        self.set_current(AnnotationKind::Comment, text)
    }

    /// Set the current node's board label. Read-only at the root.
    pub fn set_text(&mut self, text: &str) -> Result<bool, LibraryError> {
        self.set_current(AnnotationKind::Text, text)
    }

    /// Label the continuation at the empty cell `coord`, recording the
    /// move first if the tree does not have it. Refused in puzzle mode.
    pub fn set_text_at(&mut self, coord: Coord, text: &str) -> Result<NodeId, LibraryError> {
        self.check_playable(coord)?;
        if self.is_puzzle() {
            return Err(LibraryError::InvalidMove {
                coord,
                reason: "puzzle mode is on",
            });
        }
        let node = self.resolve_step(coord)?;
        self.library.set_annotation(node, AnnotationKind::Text, text)?;
        Ok(node)
    }

    // -------------------------------------------------------------------------
    // Tree edits & files
    // -------------------------------------------------------------------------

    /// Delete the current branch and step back one move. Returns the number
    /// of nodes detached; zero at the root.
    ///
    /// In puzzle mode this only takes back the last scratch move.
    pub fn delete_current(&mut self) -> Result<u32, LibraryError> {
        if self.is_puzzle() {
            self.undo(1);
            return Ok(0);
        }
        if self.current.is_root() || self.library.parent(self.current).is_none() {
            return Ok(0);
        }
        let detached = self.library.delete_subtree(self.current)?;
        self.undo(1);
        Ok(detached)
    }

    /// Drop the whole tree and start over.
    pub fn new_board(&mut self) {
        self.library.reset();
        self.reset_navigation();
    }

    /// Replace the open library with the contents of `bytes`.
    ///
    /// A fatal error leaves the session exactly as it was. On success or a
    /// soft stop the loaded tree is kept and navigation returns to the root.
    pub fn load(
        &mut self,
        format: LibraryFormat,
        bytes: &[u8],
        options: &ReadOptions,
        progress: &mut dyn ProgressObserver,
    ) -> Result<LoadReport, LibraryError> {
        let (library, report) = read_library(&self.library, format, bytes, options, progress)?;
        self.library = library;
        self.reset_navigation();
        Ok(report)
    }

    /// Serialize the open library.
    pub fn save(&self, format: LibraryFormat, options: &WriteOptions) -> Result<Vec<u8>, LibraryError> {
        write_library(&self.library, format, options)
    }
}
