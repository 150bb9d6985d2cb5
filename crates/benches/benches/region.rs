use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use lpviz_api::feasible_region;
use lpviz_benches::random_plane_problem;
use rand::{rngs::SmallRng, SeedableRng};

fn region_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("feasible_region");
    let mut rng = SmallRng::seed_from_u64(7);
    for m in [3, 10, 30] {
        group.bench_function(BenchmarkId::from_parameter(m), |b| {
            b.iter_batched(
                || random_plane_problem(m, &mut rng),
                |problem| feasible_region(&problem, None),
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, region_benchmark);
criterion_main!(benches);
