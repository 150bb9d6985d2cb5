use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Counters reported by an engine for a single solve.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolveStats {
    pub phase_one_pivots: usize,
    pub phase_two_pivots: usize,
    pub degenerate_pivots: usize,
    pub solve_time: Duration,
}

impl SolveStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pivots(&self) -> usize {
        self.phase_one_pivots + self.phase_two_pivots
    }
}
