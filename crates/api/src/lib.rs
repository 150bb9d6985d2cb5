#![forbid(unsafe_code)]

pub mod catalog;
pub mod report;

use lpviz_algos::DenseSimplex;
use lpviz_core::canonical::CanonicalForm;
use lpviz_core::math::{dot, Scalar, Timer};
use lpviz_core::options::SolveOptions;
use lpviz_core::problem::{Constraint, Objective, Problem, Relation, Sense, ValidationError};
use lpviz_core::traits::{EngineError, EngineOutput, EngineStatus, LinearEngine};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

pub use lpviz_algos::region::{feasible_region, FeasibleRegion, GeometryError, Point, RegionShape};
pub use lpviz_core::options::PivotRule;
pub use lpviz_core::solution::{Solution, SolveStatus};
pub use lpviz_core::stats::SolveStats;

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("problem validation failed: {0}")]
    InvalidProblem(#[from] ValidationError),
    #[error("objective missing")]
    MissingObjective,
}

#[derive(Debug, Clone, Default)]
pub struct ProblemBuilder {
    objective: Option<Objective>,
    constraints: Vec<Constraint>,
}

impl ProblemBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn maximize(self, coefficients: Vec<Scalar>) -> Self {
        self.objective(coefficients, Sense::Maximize)
    }

    pub fn minimize(self, coefficients: Vec<Scalar>) -> Self {
        self.objective(coefficients, Sense::Minimize)
    }

    pub fn objective(mut self, coefficients: Vec<Scalar>, sense: Sense) -> Self {
        self.objective = Some(Objective {
            coefficients,
            sense,
        });
        self
    }

    pub fn constraint(mut self, coefficients: Vec<Scalar>, relation: Relation, bound: Scalar) -> Self {
        self.constraints
            .push(Constraint::new(coefficients, relation, bound));
        self
    }

    pub fn le(self, coefficients: Vec<Scalar>, bound: Scalar) -> Self {
        self.constraint(coefficients, Relation::Le, bound)
    }

    pub fn ge(self, coefficients: Vec<Scalar>, bound: Scalar) -> Self {
        self.constraint(coefficients, Relation::Ge, bound)
    }

    pub fn eq(self, coefficients: Vec<Scalar>, bound: Scalar) -> Self {
        self.constraint(coefficients, Relation::Eq, bound)
    }

    /// The variable count is taken from the objective length.
    pub fn build(self) -> Result<Problem, SolverError> {
        let objective = self.objective.ok_or(SolverError::MissingObjective)?;
        let problem = Problem::new(objective.coefficients.len(), objective, self.constraints);
        problem.validate()?;
        Ok(problem)
    }
}

/// Drives a [`LinearEngine`] and turns its raw answer into a [`Solution`].
pub struct Solver<E: LinearEngine = DenseSimplex> {
    engine: Arc<E>,
    options: SolveOptions,
}

impl Solver<DenseSimplex> {
    pub fn new() -> Self {
        Self::with_engine(DenseSimplex::new())
    }
}

impl Default for Solver<DenseSimplex> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Solver<E>
where
    E: LinearEngine + 'static,
{
    pub fn with_engine(engine: E) -> Self {
        Self {
            engine: Arc::new(engine),
            options: SolveOptions::default(),
        }
    }

    pub fn options(mut self, options: SolveOptions) -> Self {
        self.options = options;
        self
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    /// Solves `problem`.
    ///
    /// The canonical form built on entry is the only thing the engine sees, so
    /// later edits to `problem` never reach a running solve. Every outcome,
    /// including engine errors, panics and timeouts, is reported as a status.
    /// A problem that fails [`Problem::validate`] yields `NumericalFailure`
    /// without reaching the engine.
    pub fn solve(&self, problem: &Problem) -> Solution {
        let timer = Timer::start();
        if let Err(err) = problem.validate() {
            warn!(%err, "refusing to solve a malformed problem");
            return Solution::numerical_failure(format!("problem validation failed: {err}"));
        }
        let form = CanonicalForm::from_problem(problem);
        debug!(
            engine = self.engine.name(),
            vars = form.nvars(),
            rows = form.nrows(),
            "canonical form built"
        );
        let result = match self.options.max_time {
            Some(limit) => self.run_with_deadline(form.clone(), limit),
            None => self.run(&form),
        };
        let solution = interpret(&form, result);
        info!(
            engine = self.engine.name(),
            status = %solution.status,
            objective = ?solution.objective_value,
            iterations = ?solution.iterations,
            elapsed = ?timer.elapsed(),
            "solve finished"
        );
        solution
    }

    fn run(&self, form: &CanonicalForm) -> Result<EngineOutput, EngineError> {
        panic::catch_unwind(AssertUnwindSafe(|| {
            self.engine.solve_linear(form, &self.options)
        }))
        .unwrap_or_else(|payload| Err(EngineError::Numerical(panic_message(payload))))
    }

    fn run_with_deadline(
        &self,
        form: CanonicalForm,
        limit: Duration,
    ) -> Result<EngineOutput, EngineError> {
        let (sender, receiver) = mpsc::channel();
        let engine = Arc::clone(&self.engine);
        let options = self.options.clone();
        let spawned = thread::Builder::new()
            .name("lpviz-engine".into())
            .spawn(move || {
                // The receiver is gone once the deadline has passed.
                let _ = sender.send(engine.solve_linear(&form, &options));
            });
        if let Err(err) = spawned {
            return Err(EngineError::Numerical(format!(
                "failed to start engine thread: {err}"
            )));
        }
        match receiver.recv_timeout(limit) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(EngineError::TimeLimit(limit)),
            Err(RecvTimeoutError::Disconnected) => {
                Err(EngineError::Numerical("engine thread panicked".into()))
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".into());
    format!("engine panicked: {detail}")
}

/// Maps a raw engine result onto a [`Solution`] in the source problem's sense.
pub fn interpret(form: &CanonicalForm, result: Result<EngineOutput, EngineError>) -> Solution {
    let output = match result {
        Ok(output) => output,
        Err(err) => {
            warn!(%err, "engine failed");
            return Solution::numerical_failure(err.to_string());
        }
    };
    let EngineOutput {
        status,
        x,
        objective_value,
        iterations,
        message,
        stats,
    } = output;
    let solution = match status {
        EngineStatus::Optimal => match x {
            Some(x) if x.len() == form.nvars() => {
                let raw = objective_value.unwrap_or_else(|| dot(&form.cost, &x));
                debug!(raw, negated = form.negated_objective, "restoring objective sense");
                Solution::optimal(form.restore_objective(raw), x).with_message(message)
            }
            Some(x) => {
                warn!(found = x.len(), expected = form.nvars(), "engine returned wrong length");
                Solution::numerical_failure(format!(
                    "engine returned {} values for {} variables",
                    x.len(),
                    form.nvars()
                ))
            }
            None => {
                warn!("engine reported an optimum without a point");
                Solution::numerical_failure("engine reported an optimum without a solution vector")
            }
        },
        EngineStatus::Infeasible => Solution::infeasible().with_message(message),
        EngineStatus::Unbounded => Solution::unbounded().with_message(message),
        EngineStatus::Failed => {
            warn!(?message, "engine stopped without a verdict");
            Solution::numerical_failure(
                message.unwrap_or_else(|| "engine stopped without a verdict".into()),
            )
        }
    };
    solution.with_iterations(iterations).with_stats(stats)
}

pub fn solve(problem: &Problem, options: SolveOptions) -> Solution {
    Solver::new().options(options).solve(problem)
}
