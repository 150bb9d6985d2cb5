use crate::canonical::CanonicalForm;
use crate::math::Scalar;
use crate::options::SolveOptions;
use crate::stats::SolveStats;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    Optimal,
    Infeasible,
    Unbounded,
    /// The engine stopped without a verdict.
    Failed,
}

/// Raw answer of an engine, still in minimisation orientation.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOutput {
    pub status: EngineStatus,
    pub x: Option<Vec<Scalar>>,
    pub objective_value: Option<Scalar>,
    pub iterations: Option<usize>,
    pub message: Option<String>,
    pub stats: Option<SolveStats>,
}

impl EngineOutput {
    pub fn with_status(status: EngineStatus) -> Self {
        Self {
            status,
            x: None,
            objective_value: None,
            iterations: None,
            message: None,
            stats: None,
        }
    }

    pub fn optimal(x: Vec<Scalar>, objective_value: Scalar) -> Self {
        Self {
            x: Some(x),
            objective_value: Some(objective_value),
            ..Self::with_status(EngineStatus::Optimal)
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("iteration limit of {0} reached")]
    IterationLimit(usize),
    #[error("time limit of {0:?} exceeded")]
    TimeLimit(Duration),
    #[error("dimension mismatch: {0}")]
    Dimension(String),
    #[error("numerical trouble: {0}")]
    Numerical(String),
}

/// LP solver capability.
///
/// Solves `min cost·x` subject to the `a_le`/`b_le` and `a_eq`/`b_eq` blocks of
/// `form` with every variable non-negative.
pub trait LinearEngine: Send + Sync {
    fn name(&self) -> &'static str;

    fn solve_linear(
        &self,
        form: &CanonicalForm,
        options: &SolveOptions,
    ) -> Result<EngineOutput, EngineError>;
}
