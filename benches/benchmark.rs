use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;
use rand_distr::{Distribution, Normal};
use tempfile::TempDir;

use vekta_rag::{FlatIndex, Number, RetrievalPipeline};

const DIMENSIONS: usize = 4096;
const NUM_ELEMENTS: usize = 100; // Number of documents to ingest
const NUM_QUERIES: usize = 10; // Number of queries to perform

fn configure_criterion() -> Criterion {
    Criterion::default()
        .sample_size(10)
        .measurement_time(std::time::Duration::from_secs(20))
        .warm_up_time(std::time::Duration::from_secs(3))
        .configure_from_args()
}

fn random_vectors(count: usize, seed: u64) -> Vec<Vec<Number>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, 1.0).unwrap();
    (0..count)
        .map(|_| normal.sample_iter(&mut rng).take(DIMENSIONS).collect())
        .collect()
}

fn ingest_documents(c: &mut Criterion) {
    let vectors = random_vectors(NUM_ELEMENTS, 42);

    c.bench_function(&format!("ingest {} documents", NUM_ELEMENTS), |b| {
        b.iter(|| {
            let dir = TempDir::new().unwrap();
            let pipeline =
                RetrievalPipeline::open_at(dir.path().join("bench.snapshot"), DIMENSIONS).unwrap();
            for (i, vector) in vectors.iter().enumerate() {
                pipeline.ingest(format!("document {}", i), vector).unwrap();
            }
        })
    });
}

fn query_documents(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let pipeline =
        RetrievalPipeline::open_at(dir.path().join("bench.snapshot"), DIMENSIONS).unwrap();
    for (i, vector) in random_vectors(NUM_ELEMENTS, 42).iter().enumerate() {
        pipeline.ingest(format!("document {}", i), vector).unwrap();
    }
    let queries = random_vectors(NUM_QUERIES, 7);

    c.bench_function(&format!("query {} times", NUM_QUERIES), |b| {
        b.iter(|| {
            for query in &queries {
                pipeline.query(query).unwrap();
            }
        })
    });
}

fn scan_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("flat index scan");
    let query = random_vectors(1, 7).remove(0);

    for size in [100usize, 1_000, 5_000] {
        let mut index = FlatIndex::new(DIMENSIONS);
        for vector in random_vectors(size, size as u64) {
            index.insert(&vector).unwrap();
        }
        group.bench_with_input(BenchmarkId::from_parameter(size), &index, |b, index| {
            b.iter(|| index.search_nearest(&query, 1).unwrap())
        });
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = configure_criterion();
    targets = ingest_documents, query_documents, scan_sizes
}
criterion_main!(benches);
