//! # Library Benchmarks
//!
//! Performance benchmarks for tree building, position lookup and the codecs.
//!
//! Run with: `cargo bench -p renlib-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use renlib_core::{
    Coord, Library, LibraryConfig, LibraryFormat, NodeId, ReadOptions, SymmetryKeys,
    WriteOptions, read_library, write_library,
};
use std::hint::black_box;
use std::sync::Arc;

fn keys() -> Arc<SymmetryKeys> {
    Arc::new(SymmetryKeys::from_seed(7))
}

/// Build a library of `lines` lines, each eight moves deep, sharing prefixes.
fn create_library(lines: usize) -> Library {
    let mut library = Library::new(LibraryConfig::default(), keys()).expect("library");
    for line in 0..lines {
        let mut board = library.new_board();
        let mut node = NodeId::ROOT;
        for ply in 0..8usize {
            // Mixes the line index into each ply so lines diverge at varying depths.
            let cell = (line.wrapping_mul(31) >> (ply * 2)).wrapping_add(ply * 17) % 225;
            let coord = Coord::from_cell(cell);
            if !board.is_empty_cell(coord) {
                break;
            }
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
    library
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_tree_building(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_building");

    for size in [100, 1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| black_box(create_library(size)));
        });
    }

    group.finish();
}

fn bench_position_probe(c: &mut Criterion) {
    let library = create_library(10000);
    let mut board = library.new_board();
    board.play(Coord::new(7, 7));

    c.bench_function("probe_225_cells", |b| {
        b.iter(|| {
            let mut hits = 0usize;
            for cell in 0..225 {
                let coord = Coord::from_cell(cell);
                if board.is_empty_cell(coord) && library.has_position(board.probe_hash(coord)) {
                    hits += 1;
                }
            }
            black_box(hits)
        });
    });
}

fn bench_link_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("link_tree");

    for size in [1000, 10000].iter() {
        let library = create_library(*size);
        let bytes = write_library(&library, LibraryFormat::LinkTree, &WriteOptions::default())
            .expect("write");

        group.bench_with_input(BenchmarkId::new("write", size), &library, |b, library| {
            b.iter(|| {
                black_box(write_library(library, LibraryFormat::LinkTree, &WriteOptions::default()))
            });
        });
        group.bench_with_input(BenchmarkId::new("read", size), &bytes, |b, bytes| {
            b.iter(|| {
                black_box(read_library(
                    &library,
                    LibraryFormat::LinkTree,
                    bytes,
                    &ReadOptions::default(),
                    &mut (),
                ))
            });
        });
    }

    group.finish();
}

fn bench_flat_record(c: &mut Criterion) {
    let mut group = c.benchmark_group("flat_record");
    let library = create_library(10000);

    for compress in [false, true] {
        let options = WriteOptions {
            compress,
            ..WriteOptions::default()
        };
        let bytes = write_library(&library, LibraryFormat::FlatRecord, &options).expect("write");
        let label = if compress { "lz4" } else { "raw" };

        group.bench_with_input(BenchmarkId::new("read", label), &bytes, |b, bytes| {
            b.iter(|| {
                black_box(read_library(
                    &library,
                    LibraryFormat::FlatRecord,
                    bytes,
                    &ReadOptions::default(),
                    &mut (),
                ))
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_tree_building,
    bench_position_probe,
    bench_link_tree,
    bench_flat_record
);

criterion_main!(benches);
