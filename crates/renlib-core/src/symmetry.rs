//! # Symmetry Engine
//!
//! The eight orientations of the square board about its center and the
//! random key table used to hash positions in every orientation at once.
//!
//! A stone at `(x, y)` contributes, to the accumulator of orientation `t`,
//! the key of `(t(x, y), player)`. Two positions that are rotations or
//! reflections of each other therefore own the same multiset of eight
//! accumulators, and the minimum of the eight (the canonical hash) is equal.

use crate::primitives::{BOARD_CELLS, BOARD_CENTER, BOARD_SIZE, SYMMETRY_COUNT};
use crate::{Coord, Stone};
use rand::{RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

// =============================================================================
// TRANSFORMS
// =============================================================================

/// One element of the dihedral group of the board.
///
/// The discriminant is the orientation index used by the hash accumulators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Symmetry {
    /// `(x, y)`
    Identity = 0,
    /// `(y, 14 - x)`
    Rotate90 = 1,
    /// `(14 - x, 14 - y)`
    Rotate180 = 2,
    /// `(14 - y, x)`
    Rotate270 = 3,
    /// `(x, 14 - y)`
    MirrorRows = 4,
    /// `(y, x)`
    Transpose = 5,
    /// `(14 - x, y)`
    MirrorColumns = 6,
    /// `(14 - y, 14 - x)`
    AntiTranspose = 7,
}

impl Symmetry {
    /// All orientations in accumulator order.
    pub const ALL: [Symmetry; SYMMETRY_COUNT] = [
        Symmetry::Identity,
        Symmetry::Rotate90,
        Symmetry::Rotate180,
        Symmetry::Rotate270,
        Symmetry::MirrorRows,
        Symmetry::Transpose,
        Symmetry::MirrorColumns,
        Symmetry::AntiTranspose,
    ];

    /// Accumulator index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The transform undoing this one.
    #[must_use]
    pub const fn inverse(self) -> Symmetry {
        match self {
            Symmetry::Rotate90 => Symmetry::Rotate270,
            Symmetry::Rotate270 => Symmetry::Rotate90,
            other => other,
        }
    }

    /// Transform raw coordinates about the board center.
    #[inline]
    #[must_use]
    pub const fn apply_xy(self, x: i32, y: i32) -> (i32, i32) {
        let dx = x - BOARD_CENTER;
        let dy = y - BOARD_CENTER;
        match self {
            Symmetry::Identity => (x, y),
            Symmetry::Rotate90 => (BOARD_CENTER + dy, BOARD_CENTER - dx),
            Symmetry::Rotate180 => (BOARD_CENTER - dx, BOARD_CENTER - dy),
            Symmetry::Rotate270 => (BOARD_CENTER - dy, BOARD_CENTER + dx),
            Symmetry::MirrorRows => (x, BOARD_CENTER - dy),
            Symmetry::Transpose => (BOARD_CENTER + dy, BOARD_CENTER + dx),
            Symmetry::MirrorColumns => (BOARD_CENTER - dx, y),
            Symmetry::AntiTranspose => (BOARD_CENTER - dy, BOARD_CENTER - dx),
        }
    }

    /// Transform a coordinate. Passes stay passes.
    #[must_use]
    pub const fn apply(self, coord: Coord) -> Coord {
        if coord.is_pass() {
            return Coord::PASS;
        }
        let (x, y) = self.apply_xy(coord.x as i32, coord.y as i32);
        Coord::new(x as i8, y as i8)
    }

    /// Transform an on-board cell index.
    #[inline]
    #[must_use]
    pub const fn apply_cell(self, cell: usize) -> usize {
        let (x, y) = self.apply_xy((cell % BOARD_SIZE) as i32, (cell / BOARD_SIZE) as i32);
        y as usize * BOARD_SIZE + x as usize
    }
}

/// Orientations under which `visual` coincides with `target`.
///
/// `visual[c] == target[t(c)]` must hold for every cell `c`. Used to map a
/// displayed, possibly rotated board onto continuations recorded in another
/// orientation.
#[must_use]
pub fn match_transforms(
    visual: &[Stone; BOARD_CELLS],
    target: &[Stone; BOARD_CELLS],
) -> Vec<Symmetry> {
    Symmetry::ALL
        .into_iter()
        .filter(|t| (0..BOARD_CELLS).all(|cell| visual[cell] == target[t.apply_cell(cell)]))
        .collect()
}

// =============================================================================
// KEY TABLE
// =============================================================================

/// Entries per cell in the key table (one per `Stone` code).
const KEYS_PER_CELL: usize = 3;

/// Random 64-bit keys for every `(cell, player)` pair.
///
/// Index layout is `cell * 3 + stone.code()`. Keys come from a seedable
/// generator so tests can reproduce hashes exactly.
#[derive(Clone)]
pub struct SymmetryKeys {
    seed: u64,
    keys: Box<[u64]>,
}

impl std::fmt::Debug for SymmetryKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymmetryKeys").field("seed", &self.seed).finish()
    }
}

impl SymmetryKeys {
    /// Deterministic table for `seed`.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let keys = (0..BOARD_CELLS * KEYS_PER_CELL)
            .map(|_| rng.next_u64())
            .collect();
        Self { seed, keys }
    }

    /// Table seeded from the thread-local generator, for production use.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::from_seed(rand::random::<u64>())
    }

    /// Seed the table was generated from.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Key of `stone` on `cell`.
    #[inline]
    #[must_use]
    pub fn key(&self, cell: usize, stone: Stone) -> u64 {
        self.keys
            .get(cell * KEYS_PER_CELL + stone.code())
            .copied()
            .unwrap_or(0)
    }
}
