//! Commitment benchmarks
//!
//! Usage:
//!   cargo bench -p statevec-vcs              # all benchmarks
//!   cargo bench -p statevec-vcs -- commit    # commit only
//!   cargo bench -p statevec-vcs -- 2^16      # one size only

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ff::Field;
use statevec_vcs::{Fr, HomomorphicVcs, KeyMaterial, VectorCommitment};

const DEPTHS: [u8; 3] = [10, 14, 16];

fn generate_random_vector(size: usize) -> Vec<Fr> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| Fr::random(&mut rng)).collect()
}

fn bench_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("commit");
    group.sample_size(10);

    for depth in DEPTHS {
        let vcs = HomomorphicVcs::new(KeyMaterial::generate(16, depth, &[1u8; 32]).unwrap(), 4);
        let v = generate_random_vector(1 << depth);

        group.bench_function(BenchmarkId::new("linear", format!("2^{}", depth)), |b| {
            b.iter(|| black_box(vcs.commit(black_box(&v), depth).unwrap()));
        });
    }

    group.finish();
}

fn bench_open_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("open_all");
    group.sample_size(10);

    for depth in DEPTHS {
        let mut vcs = HomomorphicVcs::new(KeyMaterial::generate(16, depth, &[1u8; 32]).unwrap(), 4);
        let v = generate_random_vector(1 << depth);

        group.bench_function(BenchmarkId::new("tree", format!("2^{}", depth)), |b| {
            b.iter(|| vcs.open_all(black_box(&v)).unwrap());
        });
    }

    group.finish();
}

fn bench_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("update");

    let depth = 16;
    let mut vcs = HomomorphicVcs::new(KeyMaterial::generate(16, depth, &[1u8; 32]).unwrap(), 64);
    vcs.open_all(&generate_random_vector(1 << depth)).unwrap();

    let indices: Vec<u64> = (0..64u64).map(|i| (i * 1021) % (1 << depth)).collect();
    let deltas = generate_random_vector(indices.len());

    group.bench_function(BenchmarkId::new("proof_tree_bulk", "64"), |b| {
        b.iter(|| black_box(vcs.update_proof_tree_bulk(&indices, &deltas).unwrap()));
    });

    group.finish();
}

criterion_group!(benches, bench_commit, bench_open_all, bench_update);
criterion_main!(benches);
