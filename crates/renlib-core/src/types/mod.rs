//! # Core Type Definitions
//!
//! This module contains the small value types shared by every layer:
//! - Node identifiers (`NodeId`)
//! - Board coordinates and stones (`Coord`, `Stone`)
//! - Annotation kinds (`AnnotationKind`)
//! - Error types (`LibraryError`)
//!
//! ## Sentinels
//!
//! The file formats use `-1` for "no move" and "no link". Inside the crate a
//! missing link is an `Option<NodeId>`; only coordinates keep the raw `-1`
//! because both binary grammars round-trip it bit for bit.

use crate::primitives::BOARD_SIZE;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// NODE IDENTIFIERS
// =============================================================================

/// Index of a node in the arena.
///
/// Ids are handed out in increasing order and never reused within a session.
/// Id 0 is the permanent synthetic root and never carries a real move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    /// The synthetic root (empty board).
    pub const ROOT: NodeId = NodeId(0);

    /// Raw index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }

    /// Whether this is the synthetic root.
    #[inline]
    #[must_use]
    pub const fn is_root(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// COORDINATES
// =============================================================================

/// A move coordinate as stored in the tree.
///
/// `x` is the column, `y` the row counted from the top. Either component
/// negative means "no move" (the root) or a pass. Values outside the board
/// are kept verbatim so legacy files round-trip unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub x: i8,
    pub y: i8,
}

impl Coord {
    /// No move / pass.
    pub const PASS: Coord = Coord { x: -1, y: -1 };

    /// Create a coordinate.
    #[inline]
    #[must_use]
    pub const fn new(x: i8, y: i8) -> Self {
        Self { x, y }
    }

    /// Whether this is the no-move / pass sentinel.
    #[inline]
    #[must_use]
    pub const fn is_pass(self) -> bool {
        self.x < 0 || self.y < 0
    }

    /// Whether the coordinate names an intersection of the board.
    #[inline]
    #[must_use]
    pub const fn on_board(self) -> bool {
        self.x >= 0 && self.y >= 0 && (self.x as usize) < BOARD_SIZE && (self.y as usize) < BOARD_SIZE
    }

    /// Whether replaying this coordinate is meaningful (a pass or a stone).
    #[inline]
    #[must_use]
    pub const fn is_playable(self) -> bool {
        self.is_pass() || self.on_board()
    }

    /// Row-major cell index, if on the board.
    #[inline]
    #[must_use]
    pub const fn cell(self) -> Option<usize> {
        if self.on_board() {
            Some(self.y as usize * BOARD_SIZE + self.x as usize)
        } else {
            None
        }
    }

    /// Coordinate of a row-major cell index.
    #[inline]
    #[must_use]
    pub const fn from_cell(cell: usize) -> Self {
        Self {
            x: (cell % BOARD_SIZE) as i8,
            y: (cell / BOARD_SIZE) as i8,
        }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::notation::to_notation(*self))
    }
}

// =============================================================================
// STONES
// =============================================================================

/// Content of an intersection, and the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Stone {
    #[default]
    Empty = 0,
    Black = 1,
    White = 2,
}

impl Stone {
    /// The other player. `Empty` stays `Empty`.
    #[inline]
    #[must_use]
    pub const fn opponent(self) -> Stone {
        match self {
            Stone::Black => Stone::White,
            Stone::White => Stone::Black,
            Stone::Empty => Stone::Empty,
        }
    }

    /// Numeric code used by the hash key table (0, 1, 2).
    #[inline]
    #[must_use]
    pub const fn code(self) -> usize {
        self as usize
    }
}

// =============================================================================
// ANNOTATIONS
// =============================================================================

/// The two per-node annotation slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnnotationKind {
    /// Free-form comment shown under the board.
    Comment,
    /// Short board label drawn on the intersection of the move.
    Text,
}

impl AnnotationKind {
    /// Both kinds, in table order.
    pub const ALL: [AnnotationKind; 2] = [AnnotationKind::Comment, AnnotationKind::Text];
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the engine and the codecs.
///
/// `CapacityExceeded`, `UnexpectedEnd` and `Cancelled` are soft stops when
/// raised during a tolerant load: the partial tree is kept and the error is
/// reported in the [`LoadReport`](crate::LoadReport). Everything else aborts
/// the load.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LibraryError {
    /// The arena reached its node cap.
    #[error("Node limit reached: {cap} nodes")]
    CapacityExceeded { cap: u32 },

    /// Input ended in the middle of a node or record.
    #[error("Unexpected end of input at byte {offset}")]
    UnexpectedEnd { offset: usize },

    /// The LZ4 frame wrapping a flat-record file could not be decoded.
    #[error("LZ4 decompression failed: {0}")]
    DecompressionFailure(String),

    /// The LZ4 frame encoder failed.
    #[error("LZ4 compression failed: {0}")]
    CompressionFailure(String),

    /// A flat record is internally inconsistent.
    #[error("Malformed record {record}: {reason}")]
    MalformedRecord { record: u32, reason: String },

    /// The requested legacy text encoding is not known.
    #[error("Unknown text encoding: {0}")]
    UnknownEncoding(String),

    /// A move cannot be played on the current board.
    #[error("Invalid move {coord}: {reason}")]
    InvalidMove { coord: Coord, reason: &'static str },

    /// The requested node does not exist.
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// The progress observer asked the load to stop.
    #[error("Load cancelled")]
    Cancelled,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),

    /// A configuration value is out of range.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl LibraryError {
    /// Whether a tolerant load keeps its partial result on this error.
    #[must_use]
    pub fn is_soft_stop(&self) -> bool {
        matches!(
            self,
            Self::CapacityExceeded { .. } | Self::UnexpectedEnd { .. } | Self::Cancelled
        )
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_sentinel_is_not_on_board() {
        assert!(Coord::PASS.is_pass());
        assert!(!Coord::PASS.on_board());
        assert!(Coord::PASS.is_playable());
    }

    #[test]
    fn coord_cell_roundtrip() {
        let c = Coord::new(3, 11);
        let cell = c.cell().expect("on board");
        assert_eq!(cell, 11 * 15 + 3);
        assert_eq!(Coord::from_cell(cell), c);
    }

    #[test]
    fn out_of_range_row_is_not_playable() {
        let c = Coord::new(3, 15);
        assert!(!c.is_pass());
        assert!(!c.on_board());
        assert!(!c.is_playable());
        assert_eq!(c.cell(), None);
    }

    #[test]
    fn stone_opponent() {
        assert_eq!(Stone::Black.opponent(), Stone::White);
        assert_eq!(Stone::White.opponent(), Stone::Black);
        assert_eq!(Stone::Empty.opponent(), Stone::Empty);
    }

    #[test]
    fn soft_stop_classification() {
        assert!(LibraryError::CapacityExceeded { cap: 10 }.is_soft_stop());
        assert!(LibraryError::UnexpectedEnd { offset: 3 }.is_soft_stop());
        assert!(LibraryError::Cancelled.is_soft_stop());
        assert!(!LibraryError::DecompressionFailure("x".into()).is_soft_stop());
        assert!(
            !LibraryError::MalformedRecord {
                record: 1,
                reason: "odd".into()
            }
            .is_soft_stop()
        );
    }
}
