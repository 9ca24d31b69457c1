//! # Library Formats
//!
//! The two legacy binary containers and the plumbing they share.
//!
//! - [`link_tree`]: depth-first node stream with child/sibling flags (`.lib`)
//! - [`flat_record`]: per-position records with an optional LZ4 frame (`.db`)
//!
//! Codecs are pure transformations between byte slices and a [`Library`].
//! File I/O belongs to the app layer. Every read builds into a fresh library
//! derived from a template, so an `Err` never leaves a half-loaded tree
//! behind; soft stops return the partial tree with the reason in the report.

pub mod flat_record;
pub mod link_tree;
pub mod text;

use crate::{Library, LibraryError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::ControlFlow;
use std::path::Path;

pub use text::TextEncoding;

// =============================================================================
// FORMAT SELECTION
// =============================================================================

/// Container format of a library file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LibraryFormat {
    /// Depth-first link-tree stream (`.lib`).
    LinkTree,
    /// Record-oriented database (`.db`).
    FlatRecord,
}

impl LibraryFormat {
    /// Pick the format from a file extension: `.db` is a flat-record file,
    /// anything else is read as a link tree.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("db") => Self::FlatRecord,
            _ => Self::LinkTree,
        }
    }

    /// Conventional file extension, without the dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::LinkTree => "lib",
            Self::FlatRecord => "db",
        }
    }
}

impl fmt::Display for LibraryFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LinkTree => f.write_str("link-tree"),
            Self::FlatRecord => f.write_str("flat-record"),
        }
    }
}

// =============================================================================
// OPTIONS & REPORTS
// =============================================================================

/// How to interpret an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Byte encoding of embedded strings.
    pub encoding: TextEncoding,
    /// Keep the partial tree when the input ends early.
    pub tolerant: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            encoding: TextEncoding::UTF_8,
            tolerant: true,
        }
    }
}

/// How to produce an output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    /// Byte encoding of embedded strings.
    pub encoding: TextEncoding,
    /// Wrap flat-record output in an LZ4 frame. Ignored for link trees.
    pub compress: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            encoding: TextEncoding::UTF_8,
            compress: false,
        }
    }
}

/// Outcome of a load that produced a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub format: LibraryFormat,
    /// Live nodes after the load, root included.
    pub nodes: u32,
    /// Flat records consumed (link-tree loads count nodes read instead).
    pub records: u32,
    /// Whether the input was LZ4-framed.
    pub compressed: bool,
    /// Soft stop that cut the load short, if any.
    pub stopped: Option<LibraryError>,
}

impl LoadReport {
    /// Whether the whole input was consumed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.stopped.is_none()
    }
}

// =============================================================================
// PROGRESS
// =============================================================================

/// Snapshot handed to a [`ProgressObserver`] during a long read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadProgress {
    pub format: LibraryFormat,
    /// Nodes allocated so far.
    pub nodes: u32,
    /// Records (flat) or nodes (link tree) consumed so far.
    pub processed: u32,
    /// Declared record count, when the format has one.
    pub total: Option<u32>,
}

/// Callback invoked at a bounded cadence while reading.
///
/// Returning `Break` stops the load as a soft stop
/// ([`LibraryError::Cancelled`]); the tree read so far is kept.
pub trait ProgressObserver {
    fn on_progress(&mut self, progress: &LoadProgress) -> ControlFlow<()>;
}

impl ProgressObserver for () {
    fn on_progress(&mut self, _progress: &LoadProgress) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

impl<F> ProgressObserver for F
where
    F: FnMut(&LoadProgress) -> ControlFlow<()>,
{
    fn on_progress(&mut self, progress: &LoadProgress) -> ControlFlow<()> {
        self(progress)
    }
}

// =============================================================================
// ENTRY POINTS
// =============================================================================

/// Read `bytes` in `format` into a fresh library shaped like `template`.
pub fn read_library(
    template: &Library,
    format: LibraryFormat,
    bytes: &[u8],
    options: &ReadOptions,
    progress: &mut dyn ProgressObserver,
) -> Result<(Library, LoadReport), LibraryError> {
    tracing::info!(%format, bytes = bytes.len(), encoding = options.encoding.name(), "loading library");
    let (library, report) = match format {
        LibraryFormat::LinkTree => link_tree::read(template, bytes, options, progress)?,
        LibraryFormat::FlatRecord => flat_record::read(template, bytes, options, progress)?,
    };
    match &report.stopped {
        None => tracing::info!(%format, nodes = report.nodes, records = report.records, "library loaded"),
        Some(reason) => tracing::warn!(
            %format,
            nodes = report.nodes,
            records = report.records,
            %reason,
            "library load stopped early; keeping partial tree"
        ),
    }
    Ok((library, report))
}

/// Serialize `library` in `format`.
pub fn write_library(
    library: &Library,
    format: LibraryFormat,
    options: &WriteOptions,
) -> Result<Vec<u8>, LibraryError> {
    let bytes = match format {
        LibraryFormat::LinkTree => link_tree::write(library, options),
        LibraryFormat::FlatRecord => flat_record::write(library, options)?,
    };
    tracing::info!(%format, nodes = library.node_count(), bytes = bytes.len(), "library written");
    Ok(bytes)
}

/// BLAKE3 digest of the UTF-8 LinkTree export, as 64 hex characters.
///
/// Two libraries holding the same tree and annotations digest equally
/// whichever container they were loaded from.
///
/// Only available with the `crypto-hash` feature enabled.
#[cfg(feature = "crypto-hash")]
#[must_use]
pub fn library_digest(library: &Library) -> String {
    let data = link_tree::write(library, &WriteOptions::default());
    blake3::hash(&data).to_hex().to_string()
}

// =============================================================================
// BYTE CURSOR
// =============================================================================

/// Forward-only little-endian reader over a byte slice.
#[derive(Debug)]
pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn end(&self) -> LibraryError {
        LibraryError::UnexpectedEnd { offset: self.pos }
    }

    pub(crate) fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], LibraryError> {
        let end = self.pos.checked_add(len).ok_or_else(|| self.end())?;
        let slice = self.data.get(self.pos..end).ok_or_else(|| self.end())?;
        self.pos = end;
        Ok(slice)
    }

    pub(crate) fn skip(&mut self, len: usize) -> Result<(), LibraryError> {
        self.read_bytes(len).map(|_| ())
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, LibraryError> {
        let byte = *self.data.get(self.pos).ok_or_else(|| self.end())?;
        self.pos += 1;
        Ok(byte)
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, LibraryError> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, LibraryError> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Bytes up to the next `terminator` (or the end of input), consuming
    /// the terminator when present. Returns the bytes and the count consumed.
    pub(crate) fn read_until(&mut self, terminator: u8) -> (&'a [u8], usize) {
        let rest = self.data.get(self.pos..).unwrap_or_default();
        let len = rest.iter().position(|&b| b == terminator).unwrap_or(rest.len());
        let consumed = (len + 1).min(rest.len());
        self.pos += consumed;
        (&rest[..len], consumed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_extension() {
        assert_eq!(LibraryFormat::from_path(Path::new("a/b.db")), LibraryFormat::FlatRecord);
        assert_eq!(LibraryFormat::from_path(Path::new("x.DB")), LibraryFormat::FlatRecord);
        assert_eq!(LibraryFormat::from_path(Path::new("x.lib")), LibraryFormat::LinkTree);
        assert_eq!(LibraryFormat::from_path(Path::new("noext")), LibraryFormat::LinkTree);
        assert_eq!(LibraryFormat::FlatRecord.extension(), "db");
    }

    #[test]
    fn reader_reports_offset_at_end() {
        let mut reader = ByteReader::new(&[1, 2, 3]);
        assert_eq!(reader.read_u16(), Ok(0x0201));
        assert_eq!(reader.read_u16(), Err(LibraryError::UnexpectedEnd { offset: 2 }));
        assert_eq!(reader.read_u8(), Ok(3));
        assert!(reader.is_at_end());
    }

    #[test]
    fn read_until_consumes_terminator() {
        let mut reader = ByteReader::new(b"ab\0cd");
        assert_eq!(reader.read_until(0), (&b"ab"[..], 3));
        assert_eq!(reader.position(), 3);
        assert_eq!(reader.read_until(0), (&b"cd"[..], 2));
        assert!(reader.is_at_end());
    }

    #[test]
    fn closures_observe_progress() {
        let mut seen = 0;
        let mut observer = |p: &LoadProgress| {
            seen = p.processed;
            ControlFlow::Break(())
        };
        let progress = LoadProgress {
            format: LibraryFormat::LinkTree,
            nodes: 1,
            processed: 7,
            total: None,
        };
        assert_eq!(observer.on_progress(&progress), ControlFlow::Break(()));
        assert_eq!(seen, 7);
    }
}
