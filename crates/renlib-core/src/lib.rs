//! # renlib-core
//!
//! The move-tree engine beneath a 15×15 opening-library editor.
//!
//! A library is one rooted tree of moves. Each node may carry a comment and a
//! short board label, and every node is indexed by a symmetry-canonical
//! position hash, so a position reached by any move order or in any of the
//! eight board orientations is recognised as the same position.
//!
//! ## Layers
//!
//! - `arena`, `strings`, `transposition`: the three single-writer stores
//! - `symmetry`, `board`: orientation transforms and incremental hashing
//! - `library`: the tree façade owning all stores
//! - `formats`: LinkTree (`.lib`) and FlatRecord (`.db`) codecs
//! - `session`: editor navigation over a library
//! - `notation`: text forms of moves
//!
//! ## Architectural Constraints
//!
//! - Pure Rust: no async, no network, no file I/O
//! - Single-threaded: callers share a library behind one lock if at all
//! - Iterative tree walks only, so depth never grows the call stack

// =============================================================================
// MODULES
// =============================================================================

pub mod arena;
pub mod board;
pub mod config;
pub mod formats;
pub mod library;
pub mod notation;
pub mod primitives;
pub mod session;
pub mod strings;
pub mod symmetry;
pub mod transposition;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{AnnotationKind, Coord, LibraryError, NodeId, Stone};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use arena::NodeArena;
pub use board::BoardState;
pub use config::LibraryConfig;
pub use library::{Children, Library};
pub use session::{Continuation, ContinuationKind, Session};
pub use strings::StringPool;
pub use symmetry::{Symmetry, SymmetryKeys, match_transforms};
pub use transposition::TranspositionIndex;

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{
    LibraryFormat, LoadProgress, LoadReport, ProgressObserver, ReadOptions, TextEncoding,
    WriteOptions, read_library, write_library,
};

#[cfg(feature = "crypto-hash")]
pub use formats::library_digest;
