//! Benchmarks for point lookup, seek, and range queries.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rangefilter::{FilterConfig, RangeFilter, SuffixKind};

const NUM_KEYS: usize = 100_000;

fn sorted_keys(seed: u64) -> Vec<([u8; 8], u64)> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut keys: Vec<u64> = (0..NUM_KEYS).map(|_| rng.gen()).collect();
    keys.sort_unstable();
    keys.dedup();
    keys.iter()
        .enumerate()
        .map(|(i, &k)| (k.to_be_bytes(), i as u64))
        .collect()
}

fn build_filter(keys: &[([u8; 8], u64)]) -> RangeFilter<'static, u64> {
    let config = FilterConfig::default()
        .with_suffix_kind(SuffixKind::Mixed)
        .with_hash_suffix_bits(4)
        .with_real_suffix_bits(4);
    RangeFilter::new(keys, &config).unwrap()
}

fn bench_build(c: &mut Criterion) {
    let keys = sorted_keys(1);
    c.bench_function("build_100k", |b| {
        b.iter(|| build_filter(black_box(&keys)));
    });
}

fn bench_point_lookup(c: &mut Criterion) {
    let keys = sorted_keys(2);
    let filter = build_filter(&keys);

    let mut group = c.benchmark_group("point_lookup");
    group.bench_function("hit", |b| {
        let mut i = 0;
        b.iter(|| {
            i = (i + 7919) % keys.len();
            black_box(filter.lookup_point(&keys[i].0))
        });
    });
    group.bench_function("miss", |b| {
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        b.iter(|| {
            let probe: u64 = rng.gen();
            black_box(filter.lookup_point(&probe.to_be_bytes()))
        });
    });
    group.finish();
}

fn bench_seek(c: &mut Criterion) {
    let keys = sorted_keys(3);
    let filter = build_filter(&keys);

    c.bench_function("seek_ge", |b| {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        b.iter(|| {
            let probe: u64 = rng.gen();
            let iter = filter.seek_ge(&probe.to_be_bytes(), true);
            black_box(iter.valid())
        });
    });
}

fn bench_range(c: &mut Criterion) {
    let keys = sorted_keys(4);
    let filter = build_filter(&keys);

    c.bench_function("lookup_range_narrow", |b| {
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        b.iter(|| {
            let lo: u64 = rng.gen();
            let hi = lo.saturating_add(1 << 40);
            black_box(filter.lookup_range(
                &lo.to_be_bytes(),
                true,
                &hi.to_be_bytes(),
                false,
            ))
        });
    });
}

criterion_group!(
    benches,
    bench_build,
    bench_point_lookup,
    bench_seek,
    bench_range
);
criterion_main!(benches);
