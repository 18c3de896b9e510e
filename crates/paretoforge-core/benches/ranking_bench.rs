use criterion::{criterion_group, criterion_main, Criterion};
use fastrand::Rng;
use paretoforge_core::codec::GenomeCodec;
use paretoforge_core::core_types::{Candidate, Origin};
use paretoforge_core::optimizer::Mutation;
use paretoforge_core::pareto::{rank, ParetoPopulation};
use paretoforge_core::schema::Schema;
use paretoforge_core::seeds::builtin_baseline;
use std::hint::black_box;
use std::sync::Arc;

fn population(size: usize, objectives: usize) -> Vec<Candidate> {
    let mut rng = Rng::with_seed(1234);
    (0..size)
        .map(|i| {
            let mut c = Candidate::proposed(format!("bench-{}", i), Origin::Seed, 0);
            c.objectives = (0..objectives).map(|_| rng.f64()).collect();
            c.feasible = rng.f64() > 0.1;
            c
        })
        .collect()
}

fn criterion_benchmark(c: &mut Criterion) {
    let merged = population(200, 3);
    c.bench_function("rank (200 candidates, 3 objectives)", |b| {
        b.iter(|| rank(black_box(&merged)))
    });

    let ranked = ParetoPopulation::new(merged.clone());
    c.bench_function("select_survivors (200 -> 100)", |b| {
        b.iter(|| ranked.select_survivors(black_box(100)))
    });

    let codec = GenomeCodec::new(Arc::new(Schema::default()));
    let mutation = Mutation::new(codec, 0.6, 1.4, 0);
    let baseline = builtin_baseline();
    let mut rng = Rng::with_seed(7);
    c.bench_function("mutate (18 blocks)", |b| {
        b.iter(|| mutation.mutate(black_box(&baseline), &mut rng))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
