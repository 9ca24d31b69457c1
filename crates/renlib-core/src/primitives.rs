//! # Innate Primitives
//!
//! Hardcoded constants shared by the arena, the hashing layer and the codecs.
//!
//! Board geometry and the binary grammars are fixed by the file formats and
//! never change at runtime. Sizing knobs that callers may tune live in
//! [`LibraryConfig`](crate::LibraryConfig); the values here are their defaults.

// =============================================================================
// BOARD GEOMETRY
// =============================================================================

/// Number of intersections along each side of the board.
pub const BOARD_SIZE: usize = 15;

/// Total number of intersections.
pub const BOARD_CELLS: usize = BOARD_SIZE * BOARD_SIZE;

/// Center intersection, the fixed point of every symmetry transform.
pub const BOARD_CENTER: i32 = 7;

/// Number of board orientations (dihedral group of the square).
pub const SYMMETRY_COUNT: usize = 8;

// =============================================================================
// NODE ARENA
// =============================================================================

/// log2 of the number of nodes per arena chunk.
///
/// Index → slot lookup is `(id >> CHUNK_BITS, id & CHUNK_MASK)`.
pub const CHUNK_BITS: u32 = 16;

/// Nodes per arena chunk.
pub const CHUNK_SIZE: usize = 1 << CHUNK_BITS;

/// Mask selecting the slot inside a chunk.
pub const CHUNK_MASK: u32 = (1 << CHUNK_BITS) - 1;

/// Default cap on live nodes (root included).
///
/// Protects against unbounded memory growth from crafted or huge inputs.
pub const DEFAULT_MAX_NODES: u32 = 3_000_000;

// =============================================================================
// INDEX SIZING
// =============================================================================

/// Default log2 of the transposition bucket count.
pub const DEFAULT_HASH_TABLE_BITS: u32 = 20;

/// Default log2 of the initial annotation slot table size (per kind).
pub const DEFAULT_ANNOTATION_TABLE_BITS: u32 = 16;

/// Initial byte capacity of the annotation string pool.
pub const STRING_POOL_INITIAL_BYTES: usize = 64 * 1024;

/// Longest annotation stored, in UTF-8 bytes (u16 length prefix).
pub const MAX_ANNOTATION_BYTES: usize = u16::MAX as usize;

// =============================================================================
// LINK-TREE FORMAT
// =============================================================================

/// Size of the zero header preceding the node stream.
pub const LINK_TREE_HEADER_LEN: usize = 20;

/// Node carries a text annotation (and two reserved bytes).
pub const MASK_TEXT: u8 = 0x01;
/// Legacy "no move" marker, ignored on read.
pub const MASK_NOMOVE: u8 = 0x02;
/// Legacy "start position" marker, ignored on read.
pub const MASK_START: u8 = 0x04;
/// Node carries a comment.
pub const MASK_COMMENT: u8 = 0x08;
/// Legacy tag marker, ignored on read.
pub const MASK_TAG: u8 = 0x10;
/// Node has no children.
pub const MASK_NOCHILD: u8 = 0x40;
/// Another node follows at the same level.
pub const MASK_SIBLING: u8 = 0x80;

/// Default progress cadence for LinkTree reads (stack iterations).
pub const DEFAULT_LINK_TREE_PROGRESS_INTERVAL: u32 = 5000;

// =============================================================================
// FLAT-RECORD FORMAT
// =============================================================================

/// LZ4 frame magic number, little-endian at offset 0.
pub const LZ4_FRAME_MAGIC: u32 = 0x184D_2204;

/// Largest decompressed payload accepted from an LZ4 frame.
///
/// Checked while inflating, so a small crafted frame cannot claim
/// unbounded memory.
pub const MAX_DECOMPRESSED_BYTES: usize = 1024 * 1024 * 1024;

/// Rule id written into every record key.
pub const FLAT_RECORD_RULE: u8 = 1;

/// Coordinate byte meaning "absent / off-board".
pub const FLAT_RECORD_ABSENT: u8 = 255;

/// Fixed part of a record value: label, score, reserved.
pub const FLAT_RECORD_VALUE_HEADER: usize = 5;

/// Score magnitude of a proven win or loss.
pub const VALUE_MATE: i32 = 30000;

/// Scores beyond this magnitude encode a forced result.
pub const VALUE_MATE_THRESHOLD: i32 = 29500;

/// Scale of the logistic score → win-rate mapping.
pub const WIN_RATE_SCALE: f64 = 250.0;

/// Prefix marking a board-text label in record free text.
pub const BOARD_TEXT_MARKER: &str = "@BTXT@";

/// Terminates the board-text label in record free text.
pub const BOARD_TEXT_END: char = '\u{8}';

/// Substring identifying stray charset metadata in a comment.
pub const CHARSET_MARKER: &str = "charset=";

/// Default progress cadence for FlatRecord reads (records).
pub const DEFAULT_FLAT_RECORD_PROGRESS_INTERVAL: u32 = 2000;
