//! # Board State
//!
//! Mutable 15×15 grid plus one hash accumulator per orientation.
//!
//! `play` and `undo` XOR the same eight keys, so any sequence of plays
//! followed by the same number of undos restores the grid and all eight
//! accumulators exactly. Off-board coordinates and passes are recorded in
//! the history and flip the side to move without touching the grid.

use crate::primitives::{BOARD_CELLS, SYMMETRY_COUNT};
use crate::symmetry::{Symmetry, SymmetryKeys};
use crate::{Coord, Stone};
use std::sync::Arc;

/// One entry of the play history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Played {
    coord: Coord,
    player: Stone,
}

/// Grid, side to move and per-orientation hashes.
#[derive(Debug, Clone)]
pub struct BoardState {
    grid: [Stone; BOARD_CELLS],
    hashes: [u64; SYMMETRY_COUNT],
    history: Vec<Played>,
    to_move: Stone,
    keys: Arc<SymmetryKeys>,
}

impl BoardState {
    /// Empty board, black to move.
    #[must_use]
    pub fn new(keys: Arc<SymmetryKeys>) -> Self {
        Self {
            grid: [Stone::Empty; BOARD_CELLS],
            hashes: [0; SYMMETRY_COUNT],
            history: Vec::new(),
            to_move: Stone::Black,
            keys,
        }
    }

    /// Back to the empty board.
    pub fn clear(&mut self) {
        self.grid = [Stone::Empty; BOARD_CELLS];
        self.hashes = [0; SYMMETRY_COUNT];
        self.history.clear();
        self.to_move = Stone::Black;
    }

    /// Key table shared with the owning library.
    #[must_use]
    pub fn keys(&self) -> &Arc<SymmetryKeys> {
        &self.keys
    }

    /// Row-major grid.
    #[must_use]
    pub fn grid(&self) -> &[Stone; BOARD_CELLS] {
        &self.grid
    }

    /// Stone at `coord`; `Empty` off the board.
    #[must_use]
    pub fn stone(&self, coord: Coord) -> Stone {
        coord.cell().map_or(Stone::Empty, |cell| self.grid[cell])
    }

    /// Whether `coord` is on the board and empty.
    #[must_use]
    pub fn is_empty_cell(&self, coord: Coord) -> bool {
        coord.on_board() && self.stone(coord) == Stone::Empty
    }

    /// Side to move.
    #[must_use]
    pub fn to_move(&self) -> Stone {
        self.to_move
    }

    /// Number of plies played, passes included.
    #[must_use]
    pub fn ply(&self) -> usize {
        self.history.len()
    }

    /// The accumulator of every orientation.
    #[must_use]
    pub fn hashes(&self) -> &[u64; SYMMETRY_COUNT] {
        &self.hashes
    }

    /// Minimum of the eight accumulators.
    #[must_use]
    pub fn canonical_hash(&self) -> u64 {
        self.hashes.iter().copied().min().unwrap_or(0)
    }

    fn toggle(&mut self, cell: usize, player: Stone) {
        for t in Symmetry::ALL {
            self.hashes[t.index()] ^= self.keys.key(t.apply_cell(cell), player);
        }
    }

    /// Place a stone for the side to move.
    ///
    /// No legality check: an occupied cell is overwritten. Callers that need
    /// validation check [`is_empty_cell`](Self::is_empty_cell) first.
    pub fn play(&mut self, coord: Coord) {
        let player = self.to_move;
        if let Some(cell) = coord.cell() {
            self.grid[cell] = player;
            self.toggle(cell, player);
        }
        self.history.push(Played { coord, player });
        self.to_move = player.opponent();
    }

    /// Take back the last play. Returns the coordinate, or `None` on an
    /// empty history.
    pub fn undo(&mut self) -> Option<Coord> {
        let last = self.history.pop()?;
        if let Some(cell) = last.coord.cell() {
            self.grid[cell] = Stone::Empty;
            self.toggle(cell, last.player);
        }
        self.to_move = last.player;
        Some(last.coord)
    }

    /// Canonical hash the position would have after playing `coord`.
    pub fn probe_hash(&mut self, coord: Coord) -> u64 {
        self.play(coord);
        let hash = self.canonical_hash();
        self.undo();
        hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> BoardState {
        BoardState::new(Arc::new(SymmetryKeys::from_seed(1)))
    }

    #[test]
    fn play_then_undo_restores_everything() {
        let mut b = board();
        let before = b.hashes().to_owned();
        b.play(Coord::new(7, 7));
        b.play(Coord::new(8, 8));
        assert_eq!(b.stone(Coord::new(7, 7)), Stone::Black);
        assert_eq!(b.stone(Coord::new(8, 8)), Stone::White);
        b.undo();
        b.undo();
        assert_eq!(b.hashes(), &before);
        assert!(b.grid().iter().all(|s| *s == Stone::Empty));
        assert_eq!(b.to_move(), Stone::Black);
    }

    #[test]
    fn pass_flips_player_only() {
        let mut b = board();
        b.play(Coord::PASS);
        assert_eq!(b.to_move(), Stone::White);
        assert_eq!(b.canonical_hash(), 0);
        assert_eq!(b.undo(), Some(Coord::PASS));
        assert_eq!(b.to_move(), Stone::Black);
    }

    #[test]
    fn undo_on_empty_history_is_noop() {
        let mut b = board();
        assert_eq!(b.undo(), None);
        assert_eq!(b.ply(), 0);
    }

    #[test]
    fn rotated_sequences_share_canonical_hash() {
        let line = [Coord::new(7, 7), Coord::new(8, 6), Coord::new(9, 9)];
        let mut a = board();
        let mut b = board();
        for c in line {
            a.play(c);
            b.play(Symmetry::MirrorColumns.apply(c));
        }
        assert_eq!(a.canonical_hash(), b.canonical_hash());
    }

    #[test]
    fn probe_hash_leaves_board_untouched() {
        let mut b = board();
        b.play(Coord::new(7, 7));
        let before = b.hashes().to_owned();
        let probed = b.probe_hash(Coord::new(6, 6));
        assert_ne!(probed, b.canonical_hash());
        assert_eq!(b.hashes(), &before);
        assert_eq!(b.ply(), 1);
    }
}
