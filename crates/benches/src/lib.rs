//! Problem generators shared by the benchmarks.

use lpviz_api::ProblemBuilder;
use lpviz_core::math::Scalar;
use lpviz_core::problem::{Problem, Relation};
use rand::{rngs::SmallRng, Rng};

/// A feasible, bounded LP: positive packing rows plus one covering row.
pub fn random_lp(n: usize, m: usize, rng: &mut SmallRng) -> Problem {
    let cost = (0..n)
        .map(|_| rng.gen::<Scalar>() * 10.0 - 2.0)
        .collect::<Vec<_>>();
    let mut builder = ProblemBuilder::new().maximize(cost);
    for _ in 0..m {
        let row = (0..n)
            .map(|_| rng.gen::<Scalar>() + 0.1)
            .collect::<Vec<_>>();
        builder = builder.le(row, rng.gen::<Scalar>() * 100.0 + 10.0);
    }
    builder
        .ge(vec![1.0; n], 1.0)
        .build()
        .expect("generated problem is well formed")
}

/// Two variables and `m` mixed rows; some draws are unbounded or empty.
pub fn random_plane_problem(m: usize, rng: &mut SmallRng) -> Problem {
    let mut builder = ProblemBuilder::new().maximize(vec![1.0, 1.0]);
    for _ in 0..m {
        let row = vec![rng.gen::<Scalar>() * 4.0 - 1.0, rng.gen::<Scalar>() * 4.0 - 1.0];
        let relation = if rng.gen_bool(0.8) {
            Relation::Le
        } else {
            Relation::Ge
        };
        builder = builder.constraint(row, relation, rng.gen::<Scalar>() * 50.0);
    }
    builder.build().expect("generated problem is well formed")
}
