//! # Property-Based Tests
//!
//! Invariants of hashing, the codecs and the tree that must hold for any
//! move sequence.

use proptest::collection::vec;
use proptest::prelude::*;
use renlib_core::{
    AnnotationKind, BoardState, Coord, Library, LibraryConfig, LibraryFormat, NodeId,
    ReadOptions, Symmetry, SymmetryKeys, WriteOptions, read_library, write_library,
};
use std::collections::BTreeSet;
use std::sync::Arc;

fn keys() -> Arc<SymmetryKeys> {
    Arc::new(SymmetryKeys::from_seed(0x5EED))
}

fn library() -> Library {
    Library::new(LibraryConfig::compact(), keys()).expect("library")
}

fn on_board() -> impl Strategy<Value = Coord> {
    (0i8..15, 0i8..15).prop_map(|(x, y)| Coord::new(x, y))
}

/// Distinct on-board coordinates, in the order generated.
fn distinct_line(max: usize) -> impl Strategy<Value = Vec<Coord>> {
    vec(on_board(), 0..max).prop_map(|coords| {
        let mut seen = BTreeSet::new();
        coords.into_iter().filter(|c| seen.insert(*c)).collect()
    })
}

/// Like [`distinct_line`], with passes mixed in.
fn line_with_passes(max: usize) -> impl Strategy<Value = Vec<Coord>> {
    vec(prop_oneof![6 => on_board(), 1 => Just(Coord::PASS)], 0..max).prop_map(|coords| {
        let mut seen = BTreeSet::new();
        coords
            .into_iter()
            .filter(|c| c.is_pass() || seen.insert(*c))
            .collect()
    })
}

/// Insert `lines` into `library`, each from the root.
fn grow(library: &mut Library, lines: &[Vec<Coord>]) {
    for line in lines {
        let mut board = library.new_board();
        let mut node = NodeId::ROOT;
        for &coord in line {
            board.play(coord);
            let (child, created) = library.get_or_create_child(node, coord).expect("child");
            if created {
                library
                    .register_position(child, board.canonical_hash())
                    .expect("register");
            }
            node = child;
        }
    }
}

/// Every root-to-node path with its annotations, sorted.
fn shape(library: &Library) -> Vec<(Vec<Coord>, Option<String>, Option<String>)> {
    let mut out = Vec::new();
    let mut stack = vec![NodeId::ROOT];
    while let Some(node) = stack.pop() {
        if !node.is_root() {
            out.push((
                library.path(node),
                library.comment(node).map(str::to_owned),
                library.text(node).map(str::to_owned),
            ));
        }
        stack.extend(library.children(node));
    }
    out.sort();
    out
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Playing then undoing restores the grid and all eight hashes.
    #[test]
    fn undo_restores_board_exactly(line in distinct_line(40)) {
        let mut board = BoardState::new(keys());
        let grid = *board.grid();
        let hashes = *board.hashes();

        for &coord in &line {
            board.play(coord);
        }
        for _ in &line {
            board.undo();
        }

        prop_assert_eq!(board.grid(), &grid);
        prop_assert_eq!(board.hashes(), &hashes);
        prop_assert_eq!(board.ply(), 0);
    }

    /// The canonical hash ignores the orientation the line was played in.
    #[test]
    fn canonical_hash_is_orientation_invariant(
        line in distinct_line(30),
        t in 0usize..8,
    ) {
        let symmetry = Symmetry::ALL[t];
        let mut plain = BoardState::new(keys());
        let mut turned = BoardState::new(keys());
        for &coord in &line {
            plain.play(coord);
            turned.play(symmetry.apply(coord));
        }
        prop_assert_eq!(plain.canonical_hash(), turned.canonical_hash());
    }

    /// A transform followed by its inverse is the identity.
    #[test]
    fn inverse_undoes_transform(coord in on_board(), t in 0usize..8) {
        let symmetry = Symmetry::ALL[t];
        prop_assert_eq!(symmetry.inverse().apply(symmetry.apply(coord)), coord);
    }

    /// LinkTree keeps the move-labelled shape and every annotation.
    #[test]
    fn link_tree_preserves_shape(
        lines in vec(distinct_line(8), 1..6),
        notes in vec("[a-z ]{1,12}", 0..6),
    ) {
        let mut original = library();
        grow(&mut original, &lines);
        let nodes: Vec<NodeId> = (1..original.node_count()).map(NodeId).collect();
        for (node, note) in nodes.iter().zip(&notes) {
            original.set_annotation(*node, AnnotationKind::Comment, note).expect("comment");
        }

        let bytes = write_library(&original, LibraryFormat::LinkTree, &WriteOptions::default())
            .expect("write");
        let (loaded, report) = read_library(
            &original,
            LibraryFormat::LinkTree,
            &bytes,
            &ReadOptions::default(),
            &mut (),
        )
        .expect("read");

        prop_assert!(report.is_complete());
        prop_assert_eq!(loaded.node_count(), original.node_count());
        prop_assert_eq!(shape(&loaded), shape(&original));
    }

    /// Passes anywhere in a line, the first move included, survive a round trip.
    #[test]
    fn link_tree_keeps_passes(lines in vec(line_with_passes(8), 1..6)) {
        let mut original = library();
        grow(&mut original, &lines);

        let bytes = write_library(&original, LibraryFormat::LinkTree, &WriteOptions::default())
            .expect("write");
        let (loaded, report) = read_library(
            &original,
            LibraryFormat::LinkTree,
            &bytes,
            &ReadOptions::default(),
            &mut (),
        )
        .expect("read");

        prop_assert!(report.is_complete());
        prop_assert_eq!(loaded.node_count(), original.node_count());
        prop_assert_eq!(shape(&loaded), shape(&original));
    }

    /// A capped read keeps at most `cap` nodes, each linked to an earlier one.
    #[test]
    fn capped_read_stays_consistent(
        lines in vec(distinct_line(8), 1..6),
        cap in 1u32..20,
    ) {
        let mut original = library();
        grow(&mut original, &lines);
        let bytes = write_library(&original, LibraryFormat::LinkTree, &WriteOptions::default())
            .expect("write");
        let template = Library::new(
            LibraryConfig { max_nodes: cap, ..LibraryConfig::compact() },
            keys(),
        )
        .expect("template");
        let (loaded, report) = read_library(
            &template,
            LibraryFormat::LinkTree,
            &bytes,
            &ReadOptions::default(),
            &mut (),
        )
        .expect("capped read");

        prop_assert!(loaded.node_count() <= cap);
        prop_assert_eq!(report.is_complete(), original.node_count() <= cap);
        for id in 1..loaded.node_count() {
            let parent = loaded.parent(NodeId(id));
            prop_assert!(parent.is_some_and(|p| p.0 < id));
        }
    }

    /// Every decoded node is findable through its own position hash.
    #[test]
    fn decoded_nodes_are_indexed(lines in vec(distinct_line(8), 1..5)) {
        let mut original = library();
        grow(&mut original, &lines);
        let bytes = write_library(&original, LibraryFormat::LinkTree, &WriteOptions::default())
            .expect("write");
        let (loaded, _) = read_library(
            &original,
            LibraryFormat::LinkTree,
            &bytes,
            &ReadOptions::default(),
            &mut (),
        )
        .expect("read");

        for id in 1..loaded.node_count() {
            let node = NodeId(id);
            let hash = loaded.stored_hash(node);
            prop_assert!(hash.is_some());
            if let Some(hash) = hash {
                prop_assert!(loaded.positions(hash).contains(&node));
            }
        }
    }

    /// FlatRecord keeps the position of every node.
    #[test]
    fn flat_record_keeps_every_position(
        lines in vec(distinct_line(6), 1..5),
        compress in any::<bool>(),
    ) {
        let mut original = library();
        grow(&mut original, &lines);
        let options = WriteOptions { compress, ..WriteOptions::default() };
        let bytes = write_library(&original, LibraryFormat::FlatRecord, &options).expect("write");
        let (loaded, report) = read_library(
            &original,
            LibraryFormat::FlatRecord,
            &bytes,
            &ReadOptions::default(),
            &mut (),
        )
        .expect("read");

        prop_assert!(report.is_complete());
        prop_assert_eq!(report.compressed, compress);
        for id in 1..original.node_count() {
            if let Some(hash) = original.stored_hash(NodeId(id)) {
                prop_assert!(loaded.has_position(hash));
            }
        }
    }

    /// Deleting a subtree removes every node of it from the index.
    #[test]
    fn delete_subtree_unindexes_descendants(lines in vec(distinct_line(6), 1..5)) {
        let mut lib = library();
        grow(&mut lib, &lines);
        let Some(first) = lib.first_child(NodeId::ROOT) else {
            return Ok(());
        };

        let mut doomed = Vec::new();
        let mut stack = vec![first];
        while let Some(node) = stack.pop() {
            doomed.push((node, lib.stored_hash(node)));
            stack.extend(lib.children(node));
        }

        let detached = lib.delete_subtree(first).expect("delete");
        prop_assert_eq!(detached as usize, doomed.len());
        prop_assert!(lib.find_child(NodeId::ROOT, lib.coord(first)).is_none());
        for (node, hash) in doomed {
            if let Some(hash) = hash {
                prop_assert!(!lib.positions(hash).contains(&node));
            }
        }
    }
}
