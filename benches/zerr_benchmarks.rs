//! # Zerr Performance Benchmarks
//!
//! Benchmarks for the queue engine and playlist persistence.
//!
//! ## Running Benchmarks
//!
//! ```bash
//! cargo bench
//! cargo bench queue
//! cargo bench playlist
//! ```

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::hint::black_box;
use tempfile::TempDir;
use zerr::catalog::Catalog;
use zerr::playlist::PlaylistStore;
use zerr::sources::TrackSource;
use zerr::{QueueEngine, Track};

fn create_test_tracks(count: usize) -> Vec<Track> {
    (0..count)
        .map(|i| {
            Track::new(
                format!("https://youtu.be/track{i}"),
                format!("Song {i}"),
                format!("Artist {}", i % 50),
            )
        })
        .collect()
}

fn benchmark_queue_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue");

    for size in [10, 100, 1000] {
        let tracks = create_test_tracks(size);

        group.bench_with_input(BenchmarkId::new("shuffle", size), &tracks, |b, tracks| {
            let mut rng = StdRng::seed_from_u64(7);
            b.iter_batched(
                || {
                    let mut engine = QueueEngine::new();
                    engine.enqueue_many(tracks.iter().cloned());
                    engine
                },
                |mut engine| {
                    engine.shuffle(&mut rng);
                    black_box(engine)
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_with_input(BenchmarkId::new("drain_looping", size), &tracks, |b, tracks| {
            b.iter_batched(
                || {
                    let mut engine = QueueEngine::new();
                    engine.set_loop(true);
                    engine.enqueue_many(tracks.iter().cloned());
                    engine
                },
                |mut engine| {
                    for _ in 0..tracks.len() {
                        engine.advance();
                        engine.finish_current();
                    }
                    black_box(engine)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.bench_function("snapshot_1000", |b| {
        let mut engine = QueueEngine::new();
        engine.enqueue_many(create_test_tracks(1000));
        b.iter(|| black_box(engine.snapshot_queue()))
    });

    group.finish();
}

fn benchmark_playlist_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("playlist");
    let dir = TempDir::new().expect("Failed to create temp directory");
    let mut store =
        PlaylistStore::open(dir.path().join("playlists.json")).expect("Failed to open store");
    let tracks = create_test_tracks(200);

    for i in 0..20 {
        store
            .save(&format!("list{i}"), &tracks)
            .expect("Failed to seed store");
    }

    group.bench_function("save_200_tracks", |b| {
        b.iter(|| store.save("bench", black_box(&tracks)).expect("save failed"))
    });

    group.bench_function("load", |b| {
        b.iter(|| black_box(store.load("list3").expect("load failed")))
    });

    group.finish();
}

fn benchmark_catalog_lookup(c: &mut Criterion) {
    let catalog = Catalog {
        tracks: create_test_tracks(5000)
            .into_iter()
            .map(|t| zerr::catalog::CatalogEntry {
                url: t.url,
                title: t.title,
                artist: t.artist,
                album: None,
                year: None,
                genres: Vec::new(),
                lyrics: None,
            })
            .collect(),
        ..Catalog::default()
    };

    c.bench_function("catalog_search_5000", |b| {
        b.iter(|| black_box(catalog.resolve("song 4999 artist 49")))
    });
}

criterion_group!(
    benches,
    benchmark_queue_operations,
    benchmark_playlist_store,
    benchmark_catalog_lookup
);

criterion_main!(benches);
