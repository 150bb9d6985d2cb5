use crate::math::Scalar;
use crate::stats::SolveStats;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    Optimal,
    Infeasible,
    Unbounded,
    NumericalFailure,
}

impl SolveStatus {
    pub fn describe(self) -> &'static str {
        match self {
            SolveStatus::Optimal => "optimal solution found",
            SolveStatus::Infeasible => "no point satisfies every constraint",
            SolveStatus::Unbounded => "objective can be improved without limit",
            SolveStatus::NumericalFailure => "solver failed to reach a conclusion",
        }
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SolveStatus::Optimal => "optimal",
            SolveStatus::Infeasible => "infeasible",
            SolveStatus::Unbounded => "unbounded",
            SolveStatus::NumericalFailure => "numerical failure",
        };
        f.write_str(name)
    }
}

/// Outcome of one solve. Built once by the orchestrator and handed to the caller.
///
/// `objective_value` and `values` are present exactly when `status` is
/// [`SolveStatus::Optimal`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub status: SolveStatus,
    pub objective_value: Option<Scalar>,
    pub values: Option<Vec<Scalar>>,
    pub iterations: Option<usize>,
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<SolveStats>,
}

impl Solution {
    pub fn optimal(objective_value: Scalar, values: Vec<Scalar>) -> Self {
        Self {
            status: SolveStatus::Optimal,
            objective_value: Some(objective_value),
            values: Some(values),
            iterations: None,
            message: None,
            stats: None,
        }
    }

    pub fn infeasible() -> Self {
        Self::without_point(SolveStatus::Infeasible)
    }

    pub fn unbounded() -> Self {
        Self::without_point(SolveStatus::Unbounded)
    }

    pub fn numerical_failure(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::without_point(SolveStatus::NumericalFailure)
        }
    }

    fn without_point(status: SolveStatus) -> Self {
        Self {
            status,
            objective_value: None,
            values: None,
            iterations: None,
            message: None,
            stats: None,
        }
    }

    pub fn with_iterations(mut self, iterations: Option<usize>) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_message(mut self, message: Option<String>) -> Self {
        self.message = message;
        self
    }

    pub fn with_stats(mut self, stats: Option<SolveStats>) -> Self {
        self.stats = stats;
        self
    }

    pub fn is_optimal(&self) -> bool {
        self.status == SolveStatus::Optimal
    }

    /// The optimum as a plane point, for two-variable problems.
    pub fn point2(&self) -> Option<[Scalar; 2]> {
        match (self.status, self.values.as_deref()) {
            (SolveStatus::Optimal, Some(&[x, y])) => Some([x, y]),
            _ => None,
        }
    }
}
