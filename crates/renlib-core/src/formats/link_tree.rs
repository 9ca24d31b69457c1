//! # Link-Tree Codec
//!
//! Depth-first node stream used by `.lib` files.
//!
//! Layout: a 20-byte zero header, then one record per node in pre-order
//! (every node's whole subtree precedes its next sibling):
//!
//! ```text
//! [move: u8] [flags: u8] ([0u8; 2] if TEXT) (comment\0 [pad]) (text\0 [pad])
//! ```
//!
//! `move` is `0` for "no move", else `(x + 1) | (y << 4)`. `NOCHILD` is set
//! iff the node has no children and `SIBLING` iff another node follows at
//! the same level; tree shape is implied by those two bits alone. Strings
//! are NUL-terminated in the caller's encoding and padded to an even length.
//!
//! Both directions walk the tree with an explicit stack so neither depth
//! nor width of the tree touches the native call stack.

use super::{ByteReader, LibraryFormat, LoadProgress, LoadReport, ProgressObserver, ReadOptions, TextEncoding, WriteOptions};
use crate::primitives::{LINK_TREE_HEADER_LEN, MASK_COMMENT, MASK_NOCHILD, MASK_SIBLING, MASK_TEXT};
use crate::{AnnotationKind, Coord, Library, LibraryError, NodeId};
use std::ops::ControlFlow;

// =============================================================================
// MOVE BYTE
// =============================================================================

/// Decode a move byte. `0` is the no-move sentinel.
#[must_use]
pub fn decode_move(byte: u8) -> Coord {
    if byte == 0 {
        return Coord::PASS;
    }
    Coord::new((byte & 0x0F) as i8 - 1, (byte >> 4) as i8)
}

/// Encode a coordinate as a move byte.
#[must_use]
pub fn encode_move(coord: Coord) -> u8 {
    if coord.x < 0 && coord.y < 0 {
        return 0;
    }
    ((coord.x + 1) as u8 & 0x0F) | ((coord.y as u8 & 0x0F) << 4)
}

// =============================================================================
// WRITER
// =============================================================================

fn write_string(out: &mut Vec<u8>, encoding: TextEncoding, text: &str) {
    let encoded = encoding.encode(text);
    let len = encoded.iter().position(|&b| b == 0).unwrap_or(encoded.len());
    out.extend_from_slice(&encoded[..len]);
    out.push(0);
    if (len + 1) % 2 != 0 {
        out.push(0);
    }
}

/// Serialize the tree below the root.
///
/// The root itself is implicit; its first child opens the stream. A leading
/// no-move node with children reads back as a container placeholder, so a
/// tree starting with a pass gets a real container in front of it.
#[must_use]
pub fn write(library: &Library, options: &WriteOptions) -> Vec<u8> {
    let mut out = vec![0u8; LINK_TREE_HEADER_LEN];
    out.reserve(library.node_count() as usize * 2);

    let Some(first) = library.first_child(NodeId::ROOT) else {
        return out;
    };
    if encode_move(library.coord(first)) == 0 && library.first_child(first).is_some() {
        out.extend_from_slice(&[0, 0]);
    }

    let mut stack = vec![first];
    while let Some(node) = stack.pop() {
        let child = library.first_child(node);
        let sibling = library.next_sibling(node);
        let comment = library.comment(node);
        let text = library.text(node);

        let mut flags = 0u8;
        if child.is_none() {
            flags |= MASK_NOCHILD;
        }
        if sibling.is_some() {
            flags |= MASK_SIBLING;
        }
        if comment.is_some() {
            flags |= MASK_COMMENT;
        }
        if text.is_some() {
            flags |= MASK_TEXT;
        }

        out.push(encode_move(library.coord(node)));
        out.push(flags);
        if text.is_some() {
            out.extend_from_slice(&[0, 0]);
        }
        if let Some(comment) = comment {
            write_string(&mut out, options.encoding, comment);
        }
        if let Some(text) = text {
            write_string(&mut out, options.encoding, text);
        }

        // Child pops first, so the subtree precedes the sibling.
        if let Some(sibling) = sibling {
            stack.push(sibling);
        }
        if let Some(child) = child {
            stack.push(child);
        }
    }
    out
}

// =============================================================================
// READER
// =============================================================================

/// A decoded node and the shape bits that steer the walk.
#[derive(Debug, Clone, Copy)]
struct NodeHeader {
    node: NodeId,
    has_child: bool,
    has_sibling: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    /// Play the move, register the position, then descend.
    Enter,
    /// Take the move back, then continue with the sibling.
    Leave,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    header: NodeHeader,
    stage: Stage,
}

impl Frame {
    fn enter(header: NodeHeader) -> Self {
        Self {
            header,
            stage: Stage::Enter,
        }
    }
}

fn read_string(reader: &mut ByteReader<'_>, encoding: TextEncoding) -> Result<String, LibraryError> {
    let (bytes, _) = reader.read_until(0);
    let text = encoding.decode(bytes);
    if (bytes.len() + 1) % 2 != 0 && !reader.is_at_end() {
        reader.skip(1)?;
    }
    Ok(text)
}

struct TreeReader<'a, 'p> {
    library: &'a mut Library,
    reader: ByteReader<'a>,
    encoding: TextEncoding,
    progress: &'p mut dyn ProgressObserver,
    decoded: u32,
}

impl TreeReader<'_, '_> {
    fn read_node(&mut self) -> Result<NodeHeader, LibraryError> {
        let cap = self.library.config().max_nodes;
        if self.library.node_count() >= cap {
            return Err(LibraryError::CapacityExceeded { cap });
        }

        let coord = decode_move(self.reader.read_u8()?);
        let flags = self.reader.read_u8()?;
        if flags & MASK_TEXT != 0 {
            self.reader.skip(2)?;
        }
        let comment = if flags & MASK_COMMENT != 0 {
            Some(read_string(&mut self.reader, self.encoding)?)
        } else {
            None
        };
        let text = if flags & MASK_TEXT != 0 {
            Some(read_string(&mut self.reader, self.encoding)?)
        } else {
            None
        };

        let node = self.library.allocate_node(coord)?;
        if let Some(comment) = comment {
            self.library.set_annotation(node, AnnotationKind::Comment, &comment)?;
        }
        if let Some(text) = text {
            self.library.set_annotation(node, AnnotationKind::Text, &text)?;
        }
        self.decoded += 1;

        Ok(NodeHeader {
            node,
            has_child: flags & MASK_NOCHILD == 0,
            has_sibling: flags & MASK_SIBLING != 0,
        })
    }

    fn report_progress(&mut self) -> Result<(), LibraryError> {
        let snapshot = LoadProgress {
            format: LibraryFormat::LinkTree,
            nodes: self.library.node_count(),
            processed: self.decoded,
            total: None,
        };
        match self.progress.on_progress(&snapshot) {
            ControlFlow::Continue(()) => Ok(()),
            ControlFlow::Break(()) => Err(LibraryError::Cancelled),
        }
    }

    fn run(&mut self) -> Result<(), LibraryError> {
        self.reader.skip(LINK_TREE_HEADER_LEN)?;
        if self.reader.is_at_end() {
            return Ok(());
        }

        let mut first = self.read_node()?;
        if self.library.coord(first.node).is_pass() && first.has_child {
            // Container node wrapping the real tree; drop it.
            self.library.discard_last(first.node);
            first = self.read_node()?;
        }
        self.library.link_first_child(NodeId::ROOT, first.node);

        let interval = self.library.config().link_tree_progress_interval.max(1);
        let mut board = self.library.new_board();
        let mut stack = vec![Frame::enter(first)];
        let mut iterations = 0u32;

        while let Some(&frame) = stack.last() {
            iterations = iterations.wrapping_add(1);
            if iterations % interval == 0 {
                self.report_progress()?;
            }

            let node = frame.header.node;
            let coord = self.library.coord(node);
            match frame.stage {
                Stage::Enter => {
                    if let Some(top) = stack.last_mut() {
                        top.stage = Stage::Leave;
                    }
                    if coord.is_playable() {
                        board.play(coord);
                        self.library
                            .register_position(node, board.canonical_hash())?;
                    }
                    if frame.header.has_child {
                        let child = self.read_node()?;
                        self.library.link_first_child(node, child.node);
                        stack.push(Frame::enter(child));
                    }
                }
                Stage::Leave => {
                    stack.pop();
                    if coord.is_playable() {
                        board.undo();
                    }
                    if frame.header.has_sibling {
                        let sibling = self.read_node()?;
                        self.library.link_next_sibling(node, sibling.node);
                        stack.push(Frame::enter(sibling));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Decode a link-tree stream into a fresh library shaped like `template`.
///
/// Hitting the node cap, a cancel from `progress` and (when
/// `options.tolerant`) a truncated input keep the partial tree and are
/// reported in [`LoadReport::stopped`].
pub fn read(
    template: &Library,
    bytes: &[u8],
    options: &ReadOptions,
    progress: &mut dyn ProgressObserver,
) -> Result<(Library, LoadReport), LibraryError> {
    let mut library = template.empty_like();
    let (outcome, decoded) = {
        let mut tree = TreeReader {
            library: &mut library,
            reader: ByteReader::new(bytes),
            encoding: options.encoding,
            progress,
            decoded: 0,
        };
        (tree.run(), tree.decoded)
    };

    let stopped = match outcome {
        Ok(()) => None,
        Err(err @ LibraryError::UnexpectedEnd { .. }) if options.tolerant => Some(err),
        Err(err @ (LibraryError::CapacityExceeded { .. } | LibraryError::Cancelled)) => Some(err),
        Err(err) => return Err(err),
    };

    let report = LoadReport {
        format: LibraryFormat::LinkTree,
        nodes: library.node_count(),
        records: decoded,
        compressed: false,
        stopped,
    };
    Ok((library, report))
}
