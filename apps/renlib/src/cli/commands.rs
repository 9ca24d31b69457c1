//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::config::AppConfig;
use renlib_core::notation::{parse_move_list, parse_sgf_moves, to_notation};
use renlib_core::primitives::BOARD_SIZE;
use renlib_core::{
    Continuation, Coord, LibraryError, LibraryFormat, LoadProgress, LoadReport, NodeId,
    ReadOptions, Session, Stone, TextEncoding, WriteOptions, library_digest,
};
use std::ops::ControlFlow;
use std::fs::File;
use std::io::Read;
use std::path::Path;

// =============================================================================
// LIBRARY FILES
// =============================================================================

/// Largest library file read (512 MB).
///
/// Compressed FlatRecord files are additionally bounded while inflating.
const MAX_LIBRARY_FILE_SIZE: u64 = 512 * 1024 * 1024;

/// A library file read into memory, with the container its name implies.
struct LibraryFile {
    format: LibraryFormat,
    bytes: Vec<u8>,
}

impl LibraryFile {
    fn read(path: &Path) -> Result<Self, LibraryError> {
        let format = LibraryFormat::from_path(path);
        let mut file = File::open(path).map_err(|e| {
            LibraryError::IoError(format!("Cannot open library '{}': {}", path.display(), e))
        })?;
        let metadata = file
            .metadata()
            .map_err(|e| LibraryError::IoError(format!("Cannot stat '{}': {}", path.display(), e)))?;

        if !metadata.is_file() {
            return Err(LibraryError::IoError(format!(
                "'{}' is not a {} file",
                path.display(),
                format
            )));
        }
        if metadata.len() > MAX_LIBRARY_FILE_SIZE {
            return Err(LibraryError::IoError(format!(
                "{} library '{}' is {} bytes, over the {} byte limit",
                format,
                path.display(),
                metadata.len(),
                MAX_LIBRARY_FILE_SIZE
            )));
        }

        let mut bytes = Vec::with_capacity(usize::try_from(metadata.len()).unwrap_or_default());
        file.read_to_end(&mut bytes).map_err(|e| {
            LibraryError::IoError(format!("Cannot read library '{}': {}", path.display(), e))
        })?;
        Ok(Self { format, bytes })
    }
}

/// Container `convert` writes to `output`, checked before any work is done.
fn output_format(output: &Path) -> Result<LibraryFormat, LibraryError> {
    if output.is_dir() {
        return Err(LibraryError::IoError(format!(
            "'{}' is a directory; name the .lib or .db file to write",
            output.display()
        )));
    }
    let parent = output.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(parent) = parent.filter(|p| !p.is_dir()) {
        return Err(LibraryError::IoError(format!(
            "No directory '{}' to write into",
            parent.display()
        )));
    }
    Ok(LibraryFormat::from_path(output))
}

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

// =============================================================================
// LOADING
// =============================================================================

/// A session holding the library read from `path`.
pub fn load_session(
    config: &AppConfig,
    path: &Path,
) -> Result<(Session, LoadReport), LibraryError> {
    let file = LibraryFile::read(path)?;
    let options = ReadOptions {
        encoding: config.text_encoding()?,
        ..ReadOptions::default()
    };
    let mut session = Session::new(config.library.clone(), config.symmetry_keys())?;
    let mut progress = |p: &LoadProgress| {
        tracing::debug!(
            format = %p.format,
            nodes = p.nodes,
            processed = p.processed,
            total = ?p.total,
            "loading"
        );
        ControlFlow::Continue(())
    };
    let report = session.load(file.format, &file.bytes, &options, &mut progress)?;
    Ok((session, report))
}

/// Human-readable advisory for a load that stopped early.
fn advisory(report: &LoadReport) -> Option<String> {
    report.stopped.as_ref().map(|reason| match reason {
        LibraryError::CapacityExceeded { cap } => format!(
            "library too large: stopped at the node cap of {} (raise --max-nodes to read more)",
            cap
        ),
        LibraryError::UnexpectedEnd { offset } => {
            format!("file ends unexpectedly at byte {}; kept the part read so far", offset)
        }
        other => format!("load stopped early: {}", other),
    })
}

// =============================================================================
// INFO COMMAND
// =============================================================================

/// Load a library and report what was read.
pub fn cmd_info(config: &AppConfig, file: &Path, json_mode: bool) -> Result<(), LibraryError> {
    let (session, report) = load_session(config, file)?;
    let library = session.library();
    let first_moves = library.children(NodeId::ROOT).count();
    let advisory = advisory(&report);

    if json_mode {
        let output = serde_json::json!({
            "file": file.to_string_lossy(),
            "format": report.format,
            "nodes": report.nodes,
            "records": report.records,
            "compressed": report.compressed,
            "complete": report.is_complete(),
            "advisory": advisory,
            "first_moves": first_moves,
            "annotation_bytes": library.annotation_bytes(),
            "root_comment": library.comment(NodeId::ROOT),
            "root_text": library.text(NodeId::ROOT),
        });
        print_json(&output);
        return Ok(());
    }

    println!("Library Info");
    println!("============");
    println!("File:        {}", file.display());
    println!("Format:      {}", report.format);
    println!("Nodes:       {}", report.nodes);
    println!("Records:     {}", report.records);
    println!("Compressed:  {}", if report.compressed { "lz4" } else { "no" });
    println!("First moves: {}", first_moves);
    println!("Annotations: {} bytes", library.annotation_bytes());
    if let Some(comment) = library.comment(NodeId::ROOT) {
        println!("Root comment: {}", comment);
    }
    if let Some(text) = library.text(NodeId::ROOT) {
        println!("Root text:    {}", text);
    }
    if let Some(advisory) = advisory {
        println!();
        println!("Warning: {}", advisory);
    }

    Ok(())
}

// =============================================================================
// SHOW COMMAND
// =============================================================================

/// Line to walk, as typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineInput {
    Empty,
    Notation(String),
    Sgf(String),
}

impl LineInput {
    pub fn from_args(moves: Option<&str>, sgf: Option<&str>) -> Self {
        match (moves, sgf) {
            (Some(moves), _) => Self::Notation(moves.to_string()),
            (None, Some(sgf)) => Self::Sgf(sgf.to_string()),
            (None, None) => Self::Empty,
        }
    }

    pub fn coords(&self) -> Vec<Coord> {
        match self {
            Self::Empty => Vec::new(),
            Self::Notation(text) => parse_move_list(text),
            Self::Sgf(text) => parse_sgf_moves(text),
        }
    }
}

/// Text diagram of the live board.
///
/// Black is `X`, white `O`. An empty cell offering a continuation shows
/// the first character of its label, or `+` when it has none.
pub fn render_board(session: &Session) -> String {
    let mut marks = vec![None; BOARD_SIZE * BOARD_SIZE];
    for continuation in session.continuations() {
        if let Some(cell) = continuation.coord.cell() {
            let mark = continuation
                .text
                .as_deref()
                .and_then(|t| t.chars().next())
                .unwrap_or('+');
            marks[cell] = Some(mark);
        }
    }

    let grid = session.grid();
    let mut out = String::from("    ");
    for x in 0..BOARD_SIZE {
        out.push(char::from(b'a' + x as u8));
        out.push(' ');
    }
    out.push('\n');
    for y in 0..BOARD_SIZE {
        out.push_str(&format!("{:>2}  ", BOARD_SIZE - y));
        for x in 0..BOARD_SIZE {
            let cell = y * BOARD_SIZE + x;
            let symbol = match grid[cell] {
                Stone::Black => 'X',
                Stone::White => 'O',
                Stone::Empty => marks[cell].unwrap_or('.'),
            };
            out.push(symbol);
            out.push(' ');
        }
        out.push('\n');
    }
    out
}

fn continuation_json(continuation: &Continuation) -> serde_json::Value {
    serde_json::json!({
        "move": to_notation(continuation.coord),
        "node": continuation.node.0,
        "kind": continuation.kind,
        "text": continuation.text,
    })
}

/// Walk a line and print the board with its continuations.
pub fn cmd_show(
    config: &AppConfig,
    file: &Path,
    line: &LineInput,
    json_mode: bool,
) -> Result<(), LibraryError> {
    let (mut session, report) = load_session(config, file)?;
    if let Some(advisory) = advisory(&report) {
        tracing::warn!("{}", advisory);
    }

    let coords = line.coords();
    let played = session.play_line(&coords)?;
    if played < coords.len() {
        tracing::warn!(
            played,
            requested = coords.len(),
            "line stops at an occupied or off-board move"
        );
    }
    let continuations = session.continuations();
    let to_move = match session.to_move() {
        Stone::White => "white",
        _ => "black",
    };

    if json_mode {
        let output = serde_json::json!({
            "moves": session.line_notation(),
            "played": played,
            "node": session.current_node().0,
            "to_move": to_move,
            "comment": session.comment(),
            "text": session.text(),
            "continuations": continuations.iter().map(continuation_json).collect::<Vec<_>>(),
            "sgf": session.line_sgf(),
        });
        print_json(&output);
        return Ok(());
    }

    print!("{}", render_board(&session));
    println!();
    println!("Line:    {}", session.line_notation());
    println!("To move: {}", to_move);
    if let Some(comment) = session.comment() {
        println!("Comment: {}", comment);
    }
    if let Some(text) = session.text() {
        println!("Text:    {}", text);
    }
    if continuations.is_empty() {
        println!("No recorded continuations");
    } else {
        println!("Continuations:");
        for continuation in &continuations {
            println!(
                "  {:<4} {:<10} {}",
                to_notation(continuation.coord),
                format!("{:?}", continuation.kind),
                continuation.text.as_deref().unwrap_or("")
            );
        }
    }
    println!("SGF:     {}", session.line_sgf());

    Ok(())
}

// =============================================================================
// CONVERT COMMAND
// =============================================================================

/// Rewrite a library in the container implied by `output`'s extension.
pub fn cmd_convert(
    config: &AppConfig,
    input: &Path,
    output: &Path,
    to_encoding: Option<&str>,
    compress: bool,
    json_mode: bool,
) -> Result<(), LibraryError> {
    let format = output_format(output)?;
    let (session, report) = load_session(config, input)?;
    if let Some(advisory) = advisory(&report) {
        tracing::warn!("{}; converting the partial tree", advisory);
    }

    let encoding = match to_encoding {
        Some(label) => TextEncoding::for_label(label)?,
        None => config.text_encoding()?,
    };
    if compress && format == LibraryFormat::LinkTree {
        tracing::warn!("LinkTree output is never compressed; ignoring --compress");
    }
    let options = WriteOptions { encoding, compress };
    let bytes = session.save(format, &options)?;

    std::fs::write(output, &bytes).map_err(|e| {
        LibraryError::IoError(format!("Cannot write library '{}': {}", output.display(), e))
    })?;

    if json_mode {
        let output = serde_json::json!({
            "input": input.to_string_lossy(),
            "output": output.to_string_lossy(),
            "from": report.format,
            "to": format,
            "encoding": encoding.name(),
            "compressed": compress && format == LibraryFormat::FlatRecord,
            "nodes": session.library().node_count(),
            "bytes": bytes.len(),
            "complete": report.is_complete(),
        });
        print_json(&output);
        return Ok(());
    }

    println!(
        "Converted {} ({}) -> {} ({}, {})",
        input.display(),
        report.format,
        output.display(),
        format,
        encoding
    );
    println!("  Nodes: {}", session.library().node_count());
    println!("  Bytes: {}", bytes.len());

    Ok(())
}

// =============================================================================
// HASH COMMAND
// =============================================================================

/// Print the BLAKE3 digest of a library.
pub fn cmd_hash(config: &AppConfig, file: &Path, json_mode: bool) -> Result<(), LibraryError> {
    let (session, report) = load_session(config, file)?;
    let digest = library_digest(session.library());

    if json_mode {
        let output = serde_json::json!({
            "file": file.to_string_lossy(),
            "algorithm": "blake3",
            "hash": digest,
            "nodes": report.nodes,
            "complete": report.is_complete(),
        });
        print_json(&output);
        return Ok(());
    }

    println!("BLAKE3: {}", digest);
    if !report.is_complete() {
        println!("(partial tree: {})", advisory(&report).unwrap_or_default());
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn line_input_prefers_notation() {
        let line = LineInput::from_args(Some("h8"), Some(";B[aa]"));
        assert_eq!(line.coords(), vec![Coord::new(7, 7)]);
        assert_eq!(LineInput::from_args(None, None).coords(), Vec::<Coord>::new());
        assert_eq!(
            LineInput::Sgf("(;B[hh];W[ig])".to_string()).coords(),
            vec![Coord::new(7, 7), Coord::new(8, 6)]
        );
    }

    #[test]
    fn board_marks_stones_and_continuations() {
        let keys = std::sync::Arc::new(renlib_core::SymmetryKeys::from_seed(1));
        let mut session = Session::new(renlib_core::LibraryConfig::compact(), keys).unwrap();
        session.play(Coord::new(7, 7)).unwrap();
        session.set_text_at(Coord::new(8, 6), "A").unwrap();

        let board = render_board(&session);
        let lines: Vec<&str> = board.lines().collect();
        assert_eq!(lines.len(), BOARD_SIZE + 1);
        assert!(lines[0].starts_with("    a b c"));
        // Row 8 from the bottom holds the center stone.
        assert_eq!(lines[8].chars().nth(4 + 7 * 2), Some('X'));
        assert_eq!(lines[7].chars().nth(4 + 8 * 2), Some('A'));
    }

    #[test]
    fn advisory_names_the_cap() {
        let report = LoadReport {
            format: LibraryFormat::LinkTree,
            nodes: 5,
            records: 4,
            compressed: false,
            stopped: Some(LibraryError::CapacityExceeded { cap: 5 }),
        };
        assert!(advisory(&report).unwrap().contains("node cap of 5"));
    }

    #[test]
    fn output_format_follows_extension() {
        assert_eq!(output_format(Path::new("out.lib")).unwrap(), LibraryFormat::LinkTree);
        assert_eq!(output_format(Path::new("out.DB")).unwrap(), LibraryFormat::FlatRecord);
    }

    #[test]
    fn output_format_needs_a_file_in_an_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            output_format(dir.path()),
            Err(LibraryError::IoError(_))
        ));
        assert!(matches!(
            output_format(&dir.path().join("missing").join("out.db")),
            Err(LibraryError::IoError(_))
        ));
    }

    #[test]
    fn library_file_rejects_directories() {
        let dir = tempfile::tempdir().unwrap();
        let result = LibraryFile::read(dir.path());
        assert!(matches!(result, Err(LibraryError::IoError(msg)) if msg.contains("link-tree")));
    }
}
