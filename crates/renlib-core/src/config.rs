//! # Library Configuration
//!
//! Sizing knobs for a [`Library`](crate::Library). The app layer fills this
//! from a TOML file; tests build it directly.

use crate::primitives::{
    DEFAULT_ANNOTATION_TABLE_BITS, DEFAULT_FLAT_RECORD_PROGRESS_INTERVAL,
    DEFAULT_HASH_TABLE_BITS, DEFAULT_LINK_TREE_PROGRESS_INTERVAL, DEFAULT_MAX_NODES,
};
use crate::LibraryError;
use serde::{Deserialize, Serialize};

/// Largest accepted bucket-count exponent for the transposition index.
const MAX_HASH_TABLE_BITS: u32 = 28;

/// Largest accepted initial slot-table exponent for annotations.
const MAX_ANNOTATION_TABLE_BITS: u32 = 26;

/// Tunable sizes and cadences of one library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Cap on live nodes, root included.
    pub max_nodes: u32,
    /// Transposition buckets = 2^bits.
    pub hash_table_bits: u32,
    /// Initial annotation slots per kind = 2^bits (the table grows).
    pub annotation_table_bits: u32,
    /// Progress callback cadence of LinkTree reads, in stack iterations.
    pub link_tree_progress_interval: u32,
    /// Progress callback cadence of FlatRecord reads, in records.
    pub flat_record_progress_interval: u32,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            max_nodes: DEFAULT_MAX_NODES,
            hash_table_bits: DEFAULT_HASH_TABLE_BITS,
            annotation_table_bits: DEFAULT_ANNOTATION_TABLE_BITS,
            link_tree_progress_interval: DEFAULT_LINK_TREE_PROGRESS_INTERVAL,
            flat_record_progress_interval: DEFAULT_FLAT_RECORD_PROGRESS_INTERVAL,
        }
    }
}

impl LibraryConfig {
    /// Default sizes with a different node cap.
    #[must_use]
    pub fn with_max_nodes(max_nodes: u32) -> Self {
        Self {
            max_nodes,
            ..Self::default()
        }
    }

    /// Small tables for tests and short-lived scratch libraries.
    #[must_use]
    pub fn compact() -> Self {
        Self {
            hash_table_bits: 12,
            annotation_table_bits: 8,
            ..Self::default()
        }
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<(), LibraryError> {
        if self.max_nodes == 0 {
            return Err(LibraryError::ConfigError(
                "max_nodes must be at least 1 (the root)".to_string(),
            ));
        }
        if self.max_nodes == u32::MAX {
            return Err(LibraryError::ConfigError(
                "max_nodes must be below u32::MAX".to_string(),
            ));
        }
        if self.hash_table_bits == 0 || self.hash_table_bits > MAX_HASH_TABLE_BITS {
            return Err(LibraryError::ConfigError(format!(
                "hash_table_bits must be in 1..={}",
                MAX_HASH_TABLE_BITS
            )));
        }
        if self.annotation_table_bits == 0 || self.annotation_table_bits > MAX_ANNOTATION_TABLE_BITS
        {
            return Err(LibraryError::ConfigError(format!(
                "annotation_table_bits must be in 1..={}",
                MAX_ANNOTATION_TABLE_BITS
            )));
        }
        if self.link_tree_progress_interval == 0 || self.flat_record_progress_interval == 0 {
            return Err(LibraryError::ConfigError(
                "progress intervals must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
