#[macro_use]
extern crate criterion;

use criterion::Criterion;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use sourmash_sig::encodings::HashFunctions;
use sourmash_sig::sketch::minhash::KmerMinHash;

fn random_dna(len: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..len).map(|_| b"ACGT"[rng.gen_range(0..4)]).collect()
}

fn add_sequence(c: &mut Criterion) {
    let seq = random_dna(100_000);

    let mut group = c.benchmark_group("add_sequence");
    group.sample_size(10);

    group.bench_function("num=500 k=21", |b| {
        b.iter(|| {
            let mut mh =
                KmerMinHash::new(0, 21, HashFunctions::murmur64_DNA, 42, false, 500).unwrap();
            mh.add_sequence(&seq, false).unwrap();
        });
    });

    group.bench_function("scaled=100 k=31 abund", |b| {
        b.iter(|| {
            let mut mh =
                KmerMinHash::new(100, 31, HashFunctions::murmur64_DNA, 42, true, 0).unwrap();
            mh.add_sequence(&seq, false).unwrap();
        });
    });

    group.bench_function("protein k=30", |b| {
        b.iter(|| {
            let mut mh =
                KmerMinHash::new(10, 30, HashFunctions::murmur64_protein, 42, false, 0).unwrap();
            mh.add_sequence(&seq[..20_000], false).unwrap();
        });
    });
}

fn intersection(c: &mut Criterion) {
    let mut mh1 = KmerMinHash::with_max_hash(1_000_000, 21, HashFunctions::murmur64_DNA, 42, false);
    let mut mh2 = KmerMinHash::with_max_hash(1_000_000, 21, HashFunctions::murmur64_DNA, 42, false);

    for i in 0..=1_000_000 {
        if i % 2 == 0 {
            mh1.add_hash(i);
        }
        if i % 45 == 0 {
            mh2.add_hash(i);
        }
    }

    let mut group = c.benchmark_group("minhash");
    group.sample_size(10);

    group.bench_function("large intersection", |b| {
        b.iter(|| {
            mh1.intersection(&mh2, false).unwrap();
        });
    });

    group.bench_function("large intersection_size", |b| {
        b.iter(|| {
            mh1.intersection_size(&mh2, false).unwrap();
        });
    });

    group.bench_function("large containment", |b| {
        b.iter(|| {
            mh2.contained_by(&mh1, false).unwrap();
        });
    });

    group.bench_function("large merge", |b| {
        b.iter(|| {
            let mut merged = mh1.clone();
            merged.merge(&mh2).unwrap();
        });
    });
}

criterion_group!(minhash, add_sequence, intersection);
criterion_main!(minhash);
