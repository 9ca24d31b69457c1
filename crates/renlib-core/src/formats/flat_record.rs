//! # Flat-Record Codec
//!
//! Record-oriented `.db` files, optionally wrapped in an LZ4 frame.
//!
//! ```text
//! [count: u32 LE]
//! repeat count times:
//!   [key_len: u16 LE] [key: key_len bytes]   (key_len == 0: no key)
//!   [value_len: u16 LE] [value: value_len bytes]
//! key   = [rule] [width] [height] (black x,y)* (white x,y)*
//! value = [label: u8] [score: i16 LE] [reserved: u16] [free text]
//! ```
//!
//! Each record names one position by its stones, sorted row-major inside
//! each color. Move order is not stored: replay alternates black and white
//! through the sorted lists, which reaches the same position. The first
//! record written is a metadata record declaring the text encoding.

use super::{
    ByteReader, LibraryFormat, LoadProgress, LoadReport, ProgressObserver, ReadOptions,
    TextEncoding, WriteOptions,
};
use crate::primitives::{
    BOARD_SIZE, BOARD_TEXT_END, BOARD_TEXT_MARKER, CHARSET_MARKER, FLAT_RECORD_ABSENT,
    FLAT_RECORD_RULE, FLAT_RECORD_VALUE_HEADER, LZ4_FRAME_MAGIC, MAX_DECOMPRESSED_BYTES,
    VALUE_MATE, VALUE_MATE_THRESHOLD, WIN_RATE_SCALE,
};
use crate::{AnnotationKind, Coord, Library, LibraryError, NodeId};
use lz4_flex::frame::{FrameDecoder, FrameEncoder};
use std::io::{Read, Write};
use std::ops::ControlFlow;

/// Fixed part of a key: rule, width, height.
const KEY_HEADER: usize = 3;

// =============================================================================
// SCORE & FREE TEXT
// =============================================================================

/// Short display token for a record's label and score.
///
/// - `|score| > 29500`: forced result, `W<steps>` for negative scores and
///   `L<steps>` otherwise, `steps = 30000 - |score| + 1`
/// - label 1 / 2: `W` / `L`
/// - any other non-zero score: floor of the logistic win percentage
///   `100 / (1 + e^(score / 250))`, with 100 shown as `W` and 0 as `L`
/// - otherwise empty
#[must_use]
#[allow(clippy::float_arithmetic)]
pub fn score_token(label: u8, score: i16) -> String {
    let magnitude = i32::from(score).abs();
    if magnitude > VALUE_MATE_THRESHOLD {
        let steps = VALUE_MATE - magnitude + 1;
        return if score < 0 {
            format!("W{}", steps)
        } else {
            format!("L{}", steps)
        };
    }
    match label {
        1 => "W".to_string(),
        2 => "L".to_string(),
        _ if score == 0 => String::new(),
        _ => {
            let win_rate = 1.0 / (1.0 + (f64::from(score) / WIN_RATE_SCALE).exp());
            match (win_rate * 100.0).floor() as i32 {
                100 => "W".to_string(),
                0 => "L".to_string(),
                percent => percent.to_string(),
            }
        }
    }
}

fn non_empty(s: &str) -> Option<&str> {
    (!s.is_empty()).then_some(s)
}

/// Split record free text into `(board text, comment)`.
///
/// Text opening with `@BTXT@` carries a board label up to the first
/// backspace: the first line of that block longer than two characters,
/// minus its first two characters. Everything after the backspace is the
/// comment. A comment containing `charset=` is metadata and is dropped.
#[must_use]
pub fn split_board_text(full: &str) -> (Option<&str>, Option<&str>) {
    let (label, comment) = match full.strip_prefix(BOARD_TEXT_MARKER) {
        Some(rest) => {
            let (block, comment) = match rest.find(BOARD_TEXT_END) {
                Some(end) => (&rest[..end], &rest[end + BOARD_TEXT_END.len_utf8()..]),
                None => (rest, ""),
            };
            let label = block
                .split('\n')
                .find(|line| line.chars().count() > 2)
                .and_then(|line| line.char_indices().nth(2).map(|(i, _)| &line[i..]));
            (label, comment)
        }
        None => (None, full),
    };
    let comment = if comment.contains(CHARSET_MARKER) {
        None
    } else {
        non_empty(comment)
    };
    (label.and_then(non_empty), comment)
}

/// Inverse of [`split_board_text`].
#[must_use]
pub fn compose_board_text(text: Option<&str>, comment: Option<&str>) -> String {
    let mut out = String::new();
    if let Some(text) = text.and_then(non_empty) {
        out.push_str(BOARD_TEXT_MARKER);
        out.push_str("\n  ");
        out.push_str(text);
        out.push('\n');
        out.push(BOARD_TEXT_END);
    }
    if let Some(comment) = comment {
        out.push_str(comment);
    }
    out
}

// =============================================================================
// LZ4 FRAME
// =============================================================================

/// Whether `bytes` opens with the LZ4 frame magic.
#[must_use]
pub fn is_lz4_frame(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && bytes[..4] == LZ4_FRAME_MAGIC.to_le_bytes()
}

fn decompress(bytes: &[u8]) -> Result<Vec<u8>, LibraryError> {
    let mut out = Vec::new();
    FrameDecoder::new(bytes)
        .take(MAX_DECOMPRESSED_BYTES as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|e| LibraryError::DecompressionFailure(e.to_string()))?;
    if out.len() > MAX_DECOMPRESSED_BYTES {
        return Err(LibraryError::DecompressionFailure(format!(
            "decompressed payload exceeds {} bytes",
            MAX_DECOMPRESSED_BYTES
        )));
    }
    Ok(out)
}

fn compress(bytes: &[u8]) -> Result<Vec<u8>, LibraryError> {
    let mut encoder = FrameEncoder::new(Vec::with_capacity(bytes.len() / 2));
    encoder
        .write_all(bytes)
        .map_err(|e| LibraryError::CompressionFailure(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| LibraryError::CompressionFailure(e.to_string()))
}

// =============================================================================
// READER
// =============================================================================

fn malformed(record: u32, reason: impl Into<String>) -> LibraryError {
    LibraryError::MalformedRecord {
        record,
        reason: reason.into(),
    }
}

/// Coordinate pairs of one color, cut at the first absent entry.
fn color_stones(pairs: &[u8]) -> Vec<Coord> {
    pairs
        .chunks_exact(2)
        .take_while(|p| p[0] != FLAT_RECORD_ABSENT && p[1] != FLAT_RECORD_ABSENT)
        .map(|p| Coord::new(p[0] as i8, p[1] as i8))
        .collect()
}

/// Replay order of a key's stones: black, white, black, ... until the side
/// to move has nothing left.
fn replay_order(stones: &[u8]) -> Vec<Coord> {
    let count = stones.len() / 2;
    let (black_pairs, white_pairs) = stones.split_at(count.div_ceil(2) * 2);
    let blacks = color_stones(black_pairs);
    let whites = color_stones(white_pairs);

    let mut path = Vec::with_capacity(blacks.len() + whites.len());
    let mut black = blacks.into_iter();
    let mut white = whites.into_iter();
    loop {
        match black.next() {
            Some(c) => path.push(c),
            None => break,
        }
        match white.next() {
            Some(c) => path.push(c),
            None => break,
        }
    }
    path
}

struct RecordReader<'a, 'p> {
    library: &'a mut Library,
    reader: ByteReader<'a>,
    encoding: TextEncoding,
    progress: &'p mut dyn ProgressObserver,
    declared: u32,
    records: u32,
}

impl RecordReader<'_, '_> {
    fn report_progress(&mut self) -> Result<(), LibraryError> {
        let snapshot = LoadProgress {
            format: LibraryFormat::FlatRecord,
            nodes: self.library.node_count(),
            processed: self.records,
            total: Some(self.declared),
        };
        match self.progress.on_progress(&snapshot) {
            ControlFlow::Continue(()) => Ok(()),
            ControlFlow::Break(()) => Err(LibraryError::Cancelled),
        }
    }

    fn run(&mut self) -> Result<(), LibraryError> {
        self.declared = self.reader.read_u32()?;
        let interval = self.library.config().flat_record_progress_interval.max(1);
        for index in 0..self.declared {
            if (index + 1) % interval == 0 {
                self.report_progress()?;
            }
            self.read_record(index)?;
            self.records += 1;
        }
        if !self.reader.is_at_end() {
            tracing::debug!(
                offset = self.reader.position(),
                "trailing bytes after the last declared record"
            );
        }
        Ok(())
    }

    fn read_record(&mut self, index: u32) -> Result<(), LibraryError> {
        let key_len = usize::from(self.reader.read_u16()?);
        if key_len == 0 {
            let value_len = usize::from(self.reader.read_u16()?);
            return self.reader.skip(value_len);
        }
        if key_len < KEY_HEADER {
            return Err(malformed(index, format!("key of {} bytes has no header", key_len)));
        }
        if (key_len - KEY_HEADER) % 2 != 0 {
            return Err(malformed(index, "odd number of coordinate bytes"));
        }

        let key = self.reader.read_bytes(key_len)?;
        let value_len = usize::from(self.reader.read_u16()?);
        let value = self.reader.read_bytes(value_len)?;

        let (width, height) = (key[1], key[2]);
        let stones = &key[KEY_HEADER..];
        if !stones.is_empty() && (usize::from(width) != BOARD_SIZE || usize::from(height) != BOARD_SIZE) {
            tracing::debug!(record = index, width, height, "skipping record for another board size");
            return Ok(());
        }
        if let Some(bad) = stones
            .iter()
            .find(|&&b| b != FLAT_RECORD_ABSENT && usize::from(b) >= BOARD_SIZE)
        {
            return Err(malformed(index, format!("coordinate byte {} is off the board", bad)));
        }

        let mut board = self.library.new_board();
        let mut node = NodeId::ROOT;
        for coord in replay_order(stones) {
            board.play(coord);
            let (child, created) = self.library.get_or_create_child(node, coord)?;
            if created {
                self.library.register_position(child, board.canonical_hash())?;
            }
            node = child;
        }

        if value.len() >= FLAT_RECORD_VALUE_HEADER {
            self.apply_value(index, node, value)?;
        }
        Ok(())
    }

    fn apply_value(&mut self, index: u32, node: NodeId, value: &[u8]) -> Result<(), LibraryError> {
        let label = value[0];
        let score = i16::from_le_bytes([value[1], value[2]]);
        let free = self.encoding.decode(&value[FLAT_RECORD_VALUE_HEADER..]);
        if free.contains(CHARSET_MARKER) {
            tracing::debug!(record = index, declaration = %free, "charset declaration");
        }

        let (board_text, comment) = split_board_text(&free);
        if let Some(comment) = comment {
            self.library
                .set_annotation(node, AnnotationKind::Comment, comment)?;
        }
        let token = score_token(label, score);
        if let Some(text) = board_text.or(non_empty(&token)) {
            self.library.set_annotation(node, AnnotationKind::Text, text)?;
        }
        Ok(())
    }
}

/// Decode a flat-record file into a fresh library shaped like `template`.
///
/// An LZ4-framed input is inflated first; a broken frame fails before any
/// tree is built. Hitting the node cap, a cancel from `progress` and (when
/// `options.tolerant`) a truncated input keep the partial tree.
pub fn read(
    template: &Library,
    bytes: &[u8],
    options: &ReadOptions,
    progress: &mut dyn ProgressObserver,
) -> Result<(Library, LoadReport), LibraryError> {
    let compressed = is_lz4_frame(bytes);
    let inflated;
    let payload = if compressed {
        inflated = decompress(bytes)?;
        tracing::debug!(compressed = bytes.len(), inflated = inflated.len(), "inflated LZ4 frame");
        inflated.as_slice()
    } else {
        bytes
    };

    let mut library = template.empty_like();
    let (outcome, records) = {
        let mut records = RecordReader {
            library: &mut library,
            reader: ByteReader::new(payload),
            encoding: options.encoding,
            progress,
            declared: 0,
            records: 0,
        };
        (records.run(), records.records)
    };

    let stopped = match outcome {
        Ok(()) => None,
        Err(err @ LibraryError::UnexpectedEnd { .. }) if options.tolerant => Some(err),
        Err(err @ (LibraryError::CapacityExceeded { .. } | LibraryError::Cancelled)) => Some(err),
        Err(err) => return Err(err),
    };

    let report = LoadReport {
        format: LibraryFormat::FlatRecord,
        nodes: library.node_count(),
        records,
        compressed,
        stopped,
    };
    Ok((library, report))
}

// =============================================================================
// WRITER
// =============================================================================

/// Longest free text that still fits the u16 value length.
const MAX_FREE_TEXT: usize = u16::MAX as usize - FLAT_RECORD_VALUE_HEADER;

fn push_value(out: &mut Vec<u8>, free: &[u8]) {
    // Oversized text is cut; the field cannot describe more.
    let free = &free[..free.len().min(MAX_FREE_TEXT)];
    out.extend_from_slice(&((FLAT_RECORD_VALUE_HEADER + free.len()) as u16).to_le_bytes());
    out.extend_from_slice(&[0u8; FLAT_RECORD_VALUE_HEADER]);
    out.extend_from_slice(free);
}

fn write_metadata(out: &mut Vec<u8>, encoding: TextEncoding) {
    out.extend_from_slice(&(KEY_HEADER as u16).to_le_bytes());
    out.extend_from_slice(&[0u8; KEY_HEADER]);
    let declaration = format!("{}\"{}\"", CHARSET_MARKER, encoding.name());
    push_value(out, declaration.as_bytes());
}

fn sorted_by_cell(mut stones: Vec<Coord>) -> Vec<Coord> {
    stones.sort_by_key(|c| i32::from(c.y) * BOARD_SIZE as i32 + i32::from(c.x));
    stones
}

fn write_record(
    out: &mut Vec<u8>,
    record: u32,
    path: &[Coord],
    free: &[u8],
) -> Result<(), LibraryError> {
    let key_len = u16::try_from(KEY_HEADER + path.len() * 2)
        .map_err(|_| malformed(record, "move path too long for a record key"))?;
    let blacks = sorted_by_cell(path.iter().step_by(2).copied().collect());
    let whites = sorted_by_cell(path.iter().skip(1).step_by(2).copied().collect());

    out.extend_from_slice(&key_len.to_le_bytes());
    out.extend_from_slice(&[FLAT_RECORD_RULE, BOARD_SIZE as u8, BOARD_SIZE as u8]);
    for stone in blacks.iter().chain(&whites) {
        out.extend_from_slice(&[stone.x as u8, stone.y as u8]);
    }
    push_value(out, free);
    Ok(())
}

/// Serialize every non-root node as one record keyed by its position.
pub fn write(library: &Library, options: &WriteOptions) -> Result<Vec<u8>, LibraryError> {
    let mut out = Vec::with_capacity(4 + library.node_count() as usize * 16);
    out.extend_from_slice(&0u32.to_le_bytes());
    write_metadata(&mut out, options.encoding);
    let mut count = 1u32;

    // Each entry carries the path length of its parent.
    let mut path: Vec<Coord> = Vec::new();
    let mut stack: Vec<(NodeId, usize)> = library
        .first_child(NodeId::ROOT)
        .map(|first| (first, 0))
        .into_iter()
        .collect();

    while let Some((node, depth)) = stack.pop() {
        path.truncate(depth);
        let coord = library.coord(node);
        if coord.on_board() {
            path.push(coord);
        }
        if !path.is_empty() {
            let free = compose_board_text(library.text(node), library.comment(node));
            write_record(&mut out, count, &path, &options.encoding.encode(&free))?;
            count += 1;
        }
        if let Some(sibling) = library.next_sibling(node) {
            stack.push((sibling, depth));
        }
        if let Some(child) = library.first_child(node) {
            stack.push((child, path.len()));
        }
    }

    out[..4].copy_from_slice(&count.to_le_bytes());
    tracing::debug!(records = count, compress = options.compress, "flat records written");

    if options.compress {
        compress(&out)
    } else {
        Ok(out)
    }
}
