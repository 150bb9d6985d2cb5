use lpviz_core::canonical::CanonicalForm;
use lpviz_core::math::{dot, norm_inf, scaled_tolerance, Scalar, Timer};
use lpviz_core::options::{PivotRule, SolveOptions};
use lpviz_core::stats::SolveStats;
use lpviz_core::traits::{EngineError, EngineOutput, EngineStatus, LinearEngine};
use tracing::{debug, trace};

/// Degenerate pivots in a row before Dantzig pricing hands over to Bland's rule.
const DEGENERATE_STREAK_LIMIT: usize = 50;

/// Two-phase dense tableau simplex.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenseSimplex;

impl DenseSimplex {
    pub fn new() -> Self {
        Self
    }
}

impl LinearEngine for DenseSimplex {
    fn name(&self) -> &'static str {
        "dense-simplex"
    }

    fn solve_linear(
        &self,
        form: &CanonicalForm,
        options: &SolveOptions,
    ) -> Result<EngineOutput, EngineError> {
        check_shapes(form)?;
        let timer = Timer::start();
        let mut tableau = Tableau::new(form);
        let mut run = Run {
            options,
            timer: &timer,
            stats: SolveStats::new(),
            iterations: 0,
        };
        debug!(
            rows = tableau.nrows,
            vars = tableau.nvars,
            slacks = tableau.nslack,
            artificials = tableau.nartificial,
            "simplex tableau built"
        );

        if tableau.nartificial > 0 {
            let residual = run.phase_one(&mut tableau)?;
            let threshold = scaled_tolerance(
                options.tolerance,
                norm_inf(&form.b_le).max(norm_inf(&form.b_eq)),
            );
            if residual > threshold {
                debug!(residual, "phase one left artificials positive");
                run.stats.solve_time = timer.elapsed();
                return Ok(run.finish(
                    EngineOutput::with_status(EngineStatus::Infeasible).with_message(format!(
                        "phase one ended with artificial sum {residual:.3e}"
                    )),
                ));
            }
            run.drive_out_artificials(&mut tableau);
        }

        let status = run.phase_two(&mut tableau, &form.cost)?;
        run.stats.solve_time = timer.elapsed();
        let output = match status {
            Phase::Optimal => {
                let x = tableau.primal(options.tolerance);
                let objective = dot(&form.cost, &x);
                debug!(objective, pivots = run.iterations, "simplex optimal");
                EngineOutput::optimal(x, objective)
            }
            Phase::Unbounded(column) => {
                debug!(column, "simplex found an unbounded ray");
                EngineOutput::with_status(EngineStatus::Unbounded)
                    .with_message(format!("column {column} has no blocking row"))
            }
        };
        Ok(run.finish(output))
    }
}

fn check_shapes(form: &CanonicalForm) -> Result<(), EngineError> {
    let n = form.nvars();
    for (name, matrix, rhs) in [
        ("a_le", &form.a_le, &form.b_le),
        ("a_eq", &form.a_eq, &form.b_eq),
    ] {
        if matrix.ncols != n {
            return Err(EngineError::Dimension(format!(
                "{name} has {} columns, cost has {n}",
                matrix.ncols
            )));
        }
        if matrix.nrows != rhs.len() || matrix.data.len() != matrix.nrows * matrix.ncols {
            return Err(EngineError::Dimension(format!(
                "{name} has {} rows, rhs has {}",
                matrix.nrows,
                rhs.len()
            )));
        }
    }
    Ok(())
}

enum Phase {
    Optimal,
    Unbounded(usize),
}

/// Row-major tableau. Columns are laid out as originals, slacks, artificials, rhs.
struct Tableau {
    nrows: usize,
    width: usize,
    nvars: usize,
    nslack: usize,
    nartificial: usize,
    data: Vec<Scalar>,
    basis: Vec<usize>,
    /// Reduced costs; the rhs entry holds the negated objective.
    reduced: Vec<Scalar>,
}

impl Tableau {
    fn new(form: &CanonicalForm) -> Self {
        let nvars = form.nvars();
        let nslack = form.a_le.nrows;
        let nartificial =
            form.b_le.iter().filter(|b| **b < 0.0).count() + form.a_eq.nrows;
        let nrows = form.nrows();
        let width = nvars + nslack + nartificial + 1;
        let rhs_col = width - 1;
        let mut data = vec![0.0; nrows * width];
        let mut basis = vec![0; nrows];
        let mut artificial = nvars + nslack;

        for (i, (row, &b)) in form.a_le.rows().zip(form.b_le.iter()).enumerate() {
            let target = &mut data[i * width..(i + 1) * width];
            let sign = if b < 0.0 { -1.0 } else { 1.0 };
            for (dst, &a) in target.iter_mut().zip(row) {
                *dst = sign * a;
            }
            target[nvars + i] = sign;
            target[rhs_col] = sign * b;
            if sign > 0.0 {
                basis[i] = nvars + i;
            } else {
                target[artificial] = 1.0;
                basis[i] = artificial;
                artificial += 1;
            }
        }
        for (k, (row, &b)) in form.a_eq.rows().zip(form.b_eq.iter()).enumerate() {
            let i = nslack + k;
            let target = &mut data[i * width..(i + 1) * width];
            let sign = if b < 0.0 { -1.0 } else { 1.0 };
            for (dst, &a) in target.iter_mut().zip(row) {
                *dst = sign * a;
            }
            target[rhs_col] = sign * b;
            target[artificial] = 1.0;
            basis[i] = artificial;
            artificial += 1;
        }

        Self {
            nrows,
            width,
            nvars,
            nslack,
            nartificial,
            data,
            basis,
            reduced: vec![0.0; width],
        }
    }

    fn artificial_start(&self) -> usize {
        self.nvars + self.nslack
    }

    fn rhs_col(&self) -> usize {
        self.width - 1
    }

    fn at(&self, row: usize, col: usize) -> Scalar {
        self.data[row * self.width + col]
    }

    fn rhs(&self, row: usize) -> Scalar {
        self.at(row, self.rhs_col())
    }

    /// Prices out the basis for the column costs in `cost` (missing entries are zero).
    fn set_objective(&mut self, cost: impl Fn(usize) -> Scalar) {
        for (j, r) in self.reduced.iter_mut().enumerate() {
            *r = if j + 1 < self.width { cost(j) } else { 0.0 };
        }
        for i in 0..self.nrows {
            let cb = cost(self.basis[i]);
            if cb == 0.0 {
                continue;
            }
            let row = &self.data[i * self.width..(i + 1) * self.width];
            for (r, &a) in self.reduced.iter_mut().zip(row) {
                *r -= cb * a;
            }
        }
    }

    fn objective(&self) -> Scalar {
        -self.reduced[self.rhs_col()]
    }

    fn entering(&self, limit: usize, rule: PivotRule, tolerance: Scalar) -> Option<usize> {
        let mut candidates = self.reduced[..limit]
            .iter()
            .enumerate()
            .filter(|(_, r)| **r < -tolerance);
        match rule {
            PivotRule::Bland => candidates.next().map(|(j, _)| j),
            PivotRule::Dantzig => candidates
                .fold(None, |best: Option<(usize, Scalar)>, (j, &r)| match best {
                    Some((_, best_r)) if best_r <= r => best,
                    _ => Some((j, r)),
                })
                .map(|(j, _)| j),
        }
    }

    /// Minimum-ratio row; ties go to the lowest basic index.
    fn leaving(&self, col: usize, tolerance: Scalar) -> Option<(usize, Scalar)> {
        let mut best: Option<(usize, Scalar)> = None;
        for i in 0..self.nrows {
            let a = self.at(i, col);
            if a <= tolerance {
                continue;
            }
            let ratio = self.rhs(i) / a;
            best = match best {
                None => Some((i, ratio)),
                Some((row, current)) => {
                    let tie = (ratio - current).abs() <= scaled_tolerance(tolerance, current);
                    if (tie && self.basis[i] < self.basis[row]) || (!tie && ratio < current) {
                        Some((i, ratio))
                    } else {
                        Some((row, current))
                    }
                }
            };
        }
        best
    }

    fn pivot(&mut self, row: usize, col: usize) {
        let width = self.width;
        let pivot = self.at(row, col);
        for value in &mut self.data[row * width..(row + 1) * width] {
            *value /= pivot;
        }
        let pivot_row = self.data[row * width..(row + 1) * width].to_vec();
        for (i, chunk) in self.data.chunks_exact_mut(width).enumerate() {
            let factor = chunk[col];
            if i == row || factor == 0.0 {
                continue;
            }
            for (value, &p) in chunk.iter_mut().zip(&pivot_row) {
                *value -= factor * p;
            }
        }
        let factor = self.reduced[col];
        if factor != 0.0 {
            for (value, &p) in self.reduced.iter_mut().zip(&pivot_row) {
                *value -= factor * p;
            }
        }
        self.basis[row] = col;
    }

    fn primal(&self, tolerance: Scalar) -> Vec<Scalar> {
        let mut x = vec![0.0; self.nvars];
        for (i, &basic) in self.basis.iter().enumerate() {
            if basic < self.nvars {
                let value = self.rhs(i);
                x[basic] = if value.abs() <= tolerance { 0.0 } else { value };
            }
        }
        x
    }
}

struct Run<'a> {
    options: &'a SolveOptions,
    timer: &'a Timer,
    stats: SolveStats,
    iterations: usize,
}

impl Run<'_> {
    /// Minimises the artificial sum and returns its final value.
    fn phase_one(&mut self, tableau: &mut Tableau) -> Result<Scalar, EngineError> {
        let start = tableau.artificial_start();
        tableau.set_objective(|j| if j >= start { 1.0 } else { 0.0 });
        let limit = tableau.width - 1;
        let before = self.iterations;
        match self.iterate(tableau, limit)? {
            Phase::Optimal => {}
            Phase::Unbounded(column) => {
                return Err(EngineError::Numerical(format!(
                    "phase one objective unbounded along column {column}"
                )))
            }
        }
        self.stats.phase_one_pivots += self.iterations - before;
        debug!(
            pivots = self.iterations - before,
            residual = tableau.objective(),
            "phase one finished"
        );
        Ok(tableau.objective())
    }

    /// Pivots zero-level artificials out of the basis where a structural column allows it.
    fn drive_out_artificials(&mut self, tableau: &mut Tableau) {
        let start = tableau.artificial_start();
        for row in 0..tableau.nrows {
            if tableau.basis[row] < start {
                continue;
            }
            let replacement =
                (0..start).find(|&j| tableau.at(row, j).abs() > self.options.tolerance);
            match replacement {
                Some(col) => {
                    trace!(row, col, "driving artificial out of basis");
                    tableau.pivot(row, col);
                    self.iterations += 1;
                    self.stats.phase_one_pivots += 1;
                }
                None => trace!(row, "redundant row keeps its artificial"),
            }
        }
    }

    fn phase_two(&mut self, tableau: &mut Tableau, cost: &[Scalar]) -> Result<Phase, EngineError> {
        tableau.set_objective(|j| cost.get(j).copied().unwrap_or(0.0));
        let limit = tableau.artificial_start();
        let before = self.iterations;
        let phase = self.iterate(tableau, limit)?;
        self.stats.phase_two_pivots += self.iterations - before;
        Ok(phase)
    }

    fn iterate(&mut self, tableau: &mut Tableau, limit: usize) -> Result<Phase, EngineError> {
        let tolerance = self.options.tolerance;
        let mut streak = 0;
        loop {
            let rule = match self.options.pivot_rule {
                PivotRule::Dantzig if streak >= DEGENERATE_STREAK_LIMIT => PivotRule::Bland,
                rule => rule,
            };
            let Some(col) = tableau.entering(limit, rule, tolerance) else {
                return Ok(Phase::Optimal);
            };
            let Some((row, ratio)) = tableau.leaving(col, tolerance) else {
                return Ok(Phase::Unbounded(col));
            };
            if self.iterations >= self.options.max_iterations {
                return Err(EngineError::IterationLimit(self.options.max_iterations));
            }
            if let Some(limit) = self.options.max_time {
                if self.timer.exceeded(Some(limit)) {
                    return Err(EngineError::TimeLimit(limit));
                }
            }
            if ratio.abs() <= tolerance {
                streak += 1;
                self.stats.degenerate_pivots += 1;
            } else {
                streak = 0;
            }
            trace!(row, col, ratio, ?rule, "pivot");
            tableau.pivot(row, col);
            self.iterations += 1;
        }
    }

    fn finish(&self, mut output: EngineOutput) -> EngineOutput {
        output.iterations = Some(self.iterations);
        output.stats = Some(self.stats.clone());
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use lpviz_core::problem::{Constraint, Objective, Problem, Relation, Sense};

    fn solve(problem: &Problem, options: &SolveOptions) -> EngineOutput {
        let form = CanonicalForm::from_problem(problem);
        DenseSimplex::new().solve_linear(&form, options).expect("engine")
    }

    fn problem(sense: Sense, c: Vec<Scalar>, rows: Vec<(Vec<Scalar>, Relation, Scalar)>) -> Problem {
        Problem::new(
            c.len(),
            Objective {
                coefficients: c,
                sense,
            },
            rows.into_iter()
                .map(|(a, rel, b)| Constraint::new(a, rel, b))
                .collect(),
        )
    }

    #[test]
    fn simple_maximisation() {
        let p = problem(
            Sense::Maximize,
            vec![3.0, 2.0],
            vec![
                (vec![1.0, 1.0], Relation::Le, 4.0),
                (vec![1.0, 0.0], Relation::Le, 3.0),
                (vec![0.0, 1.0], Relation::Le, 3.0),
            ],
        );
        let out = solve(&p, &SolveOptions::default());
        assert_eq!(out.status, EngineStatus::Optimal);
        let x = out.x.unwrap();
        assert_abs_diff_eq!(x[0], 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(x[1], 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(out.objective_value.unwrap(), -11.0, epsilon = 1e-9);
    }

    #[test]
    fn minimisation_with_ge_rows_uses_phase_one() {
        let p = problem(
            Sense::Minimize,
            vec![2.0, 3.0],
            vec![
                (vec![1.0, 1.0], Relation::Ge, 4.0),
                (vec![1.0, 0.0], Relation::Le, 3.0),
                (vec![0.0, 1.0], Relation::Le, 3.0),
            ],
        );
        let out = solve(&p, &SolveOptions::default());
        assert_eq!(out.status, EngineStatus::Optimal);
        let x = out.x.unwrap();
        assert_abs_diff_eq!(x[0], 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(x[1], 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(out.objective_value.unwrap(), 9.0, epsilon = 1e-9);
        assert!(out.stats.unwrap().phase_one_pivots > 0);
    }

    #[test]
    fn equality_rows() {
        let p = problem(
            Sense::Minimize,
            vec![1.0, 2.0],
            vec![(vec![1.0, 1.0], Relation::Eq, 5.0)],
        );
        let out = solve(&p, &SolveOptions::default());
        assert_eq!(out.status, EngineStatus::Optimal);
        assert_eq!(out.x.unwrap(), vec![5.0, 0.0]);
        assert_abs_diff_eq!(out.objective_value.unwrap(), 5.0, epsilon = 1e-9);
    }

    #[test]
    fn redundant_equalities_do_not_break_phase_two() {
        let p = problem(
            Sense::Maximize,
            vec![1.0, 1.0],
            vec![
                (vec![1.0, 1.0], Relation::Eq, 2.0),
                (vec![2.0, 2.0], Relation::Eq, 4.0),
                (vec![1.0, 0.0], Relation::Le, 1.5),
            ],
        );
        let out = solve(&p, &SolveOptions::default());
        assert_eq!(out.status, EngineStatus::Optimal);
        assert_abs_diff_eq!(out.objective_value.unwrap(), -2.0, epsilon = 1e-9);
    }

    #[test]
    fn detects_infeasibility() {
        let p = problem(
            Sense::Minimize,
            vec![1.0],
            vec![
                (vec![1.0], Relation::Ge, 5.0),
                (vec![1.0], Relation::Le, 3.0),
            ],
        );
        let out = solve(&p, &SolveOptions::default());
        assert_eq!(out.status, EngineStatus::Infeasible);
        assert!(out.x.is_none());
        assert!(out.message.is_some());
    }

    #[test]
    fn zero_row_with_negative_bound_is_infeasible() {
        let p = problem(
            Sense::Minimize,
            vec![1.0, 1.0],
            vec![(vec![0.0, 0.0], Relation::Le, -5.0)],
        );
        let out = solve(&p, &SolveOptions::default());
        assert_eq!(out.status, EngineStatus::Infeasible);
    }

    #[test]
    fn detects_unboundedness() {
        let p = problem(
            Sense::Maximize,
            vec![1.0, 1.0],
            vec![(vec![1.0, -1.0], Relation::Le, 1.0)],
        );
        let out = solve(&p, &SolveOptions::default());
        assert_eq!(out.status, EngineStatus::Unbounded);
    }

    #[test]
    fn no_rows_minimises_to_origin() {
        let p = problem(Sense::Minimize, vec![1.0, 4.0], Vec::new());
        let out = solve(&p, &SolveOptions::default());
        assert_eq!(out.status, EngineStatus::Optimal);
        assert_eq!(out.x.unwrap(), vec![0.0, 0.0]);
        assert_eq!(out.iterations, Some(0));
    }

    #[test]
    fn bland_rule_reaches_same_optimum() {
        let p = problem(
            Sense::Maximize,
            vec![3.0, 2.0],
            vec![
                (vec![2.0, 1.0], Relation::Le, 100.0),
                (vec![1.0, 1.0], Relation::Le, 80.0),
                (vec![1.0, 0.0], Relation::Le, 40.0),
            ],
        );
        let options = SolveOptions {
            pivot_rule: PivotRule::Bland,
            ..SolveOptions::default()
        };
        let out = solve(&p, &options);
        let x = out.x.unwrap();
        assert_abs_diff_eq!(x[0], 20.0, epsilon = 1e-9);
        assert_abs_diff_eq!(x[1], 60.0, epsilon = 1e-9);
    }

    #[test]
    fn iteration_limit_is_an_error() {
        let p = problem(
            Sense::Maximize,
            vec![3.0, 2.0],
            vec![
                (vec![2.0, 1.0], Relation::Le, 100.0),
                (vec![1.0, 1.0], Relation::Le, 80.0),
            ],
        );
        let options = SolveOptions {
            max_iterations: 0,
            ..SolveOptions::default()
        };
        let form = CanonicalForm::from_problem(&p);
        let err = DenseSimplex::new().solve_linear(&form, &options).unwrap_err();
        assert_eq!(err, EngineError::IterationLimit(0));
    }

    #[test]
    fn rejects_inconsistent_shapes() {
        let p = problem(
            Sense::Minimize,
            vec![1.0, 1.0],
            vec![(vec![1.0, 1.0], Relation::Le, 1.0)],
        );
        let mut form = CanonicalForm::from_problem(&p);
        form.b_le.push(2.0);
        let err = DenseSimplex::new()
            .solve_linear(&form, &SolveOptions::default())
            .unwrap_err();
        assert!(matches!(err, EngineError::Dimension(_)));
    }
}
