use crate::math::{Scalar, TOLERANCE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PivotRule {
    /// Most negative reduced cost; switches to Bland's rule on long degenerate streaks.
    #[default]
    Dantzig,
    /// Lowest eligible index. Never cycles.
    Bland,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SolveOptions {
    pub tolerance: Scalar,
    pub max_iterations: usize,
    /// Wall-clock budget for the whole solve. `None` waits for the engine.
    pub max_time: Option<Duration>,
    pub pivot_rule: PivotRule,
}

impl SolveOptions {
    pub fn with_tolerance(tolerance: Scalar) -> Self {
        Self {
            tolerance,
            ..Self::default()
        }
    }
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            tolerance: TOLERANCE,
            max_iterations: 10_000,
            max_time: None,
            pivot_rule: PivotRule::Dantzig,
        }
    }
}
