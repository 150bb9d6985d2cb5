use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use lpviz_api::{PivotRule, Solver};
use lpviz_benches::random_lp;
use lpviz_core::options::SolveOptions;
use rand::{rngs::SmallRng, SeedableRng};

fn solve_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("dense_simplex_solve");
    let mut rng = SmallRng::seed_from_u64(42);
    for &(n, m) in &[(10, 15), (50, 75), (120, 160)] {
        for rule in [PivotRule::Dantzig, PivotRule::Bland] {
            let options = SolveOptions {
                pivot_rule: rule,
                ..SolveOptions::default()
            };
            group.bench_with_input(
                BenchmarkId::new(format!("{rule:?}"), format!("n={n}_m={m}")),
                &options,
                |b, options| {
                    b.iter_batched(
                        || random_lp(n, m, &mut rng),
                        |problem| Solver::new().options(options.clone()).solve(&problem),
                        BatchSize::SmallInput,
                    );
                },
            );
        }
    }
    group.finish();
}

criterion_group!(benches, solve_benchmark);
criterion_main!(benches);
