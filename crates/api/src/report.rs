use lpviz_core::math::{scaled_tolerance, Scalar, TOLERANCE};
use lpviz_core::problem::{Problem, Relation};
use lpviz_core::solution::Solution;
use serde::{Deserialize, Serialize};

/// How much of one constraint an optimal point uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintActivity {
    pub index: usize,
    pub relation: Relation,
    pub lhs: Scalar,
    pub bound: Scalar,
    /// Distance to the bound on the feasible side; never negative for a
    /// feasible point beyond rounding.
    pub slack: Scalar,
    pub binding: bool,
}

impl ConstraintActivity {
    /// `lhs / bound` as a percentage, when the bound is non-zero.
    pub fn usage_percent(&self) -> Option<Scalar> {
        (self.bound != 0.0).then(|| self.lhs / self.bound * 100.0)
    }
}

/// Per-constraint usage at the optimum. Empty unless `solution` is optimal
/// and its point matches the problem's variable count.
pub fn constraint_activity(problem: &Problem, solution: &Solution) -> Vec<ConstraintActivity> {
    let values = match (solution.is_optimal(), solution.values.as_deref()) {
        (true, Some(values)) if values.len() == problem.nvars() => values,
        _ => return Vec::new(),
    };
    problem
        .constraints
        .iter()
        .enumerate()
        .map(|(index, constraint)| {
            let lhs = constraint.lhs(values);
            let bound = constraint.bound;
            let slack = match constraint.relation {
                Relation::Le => bound - lhs,
                Relation::Ge => lhs - bound,
                Relation::Eq => (lhs - bound).abs(),
            };
            let tolerance = scaled_tolerance(TOLERANCE, lhs.abs().max(bound.abs()));
            ConstraintActivity {
                index,
                relation: constraint.relation,
                lhs,
                bound,
                slack,
                binding: slack.abs() <= tolerance,
            }
        })
        .collect()
}
