use crate::math::Scalar;
use crate::problem::{Problem, Relation, Sense};
use serde::{Deserialize, Serialize};

/// Row-major dense matrix with a fixed column count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseMatrix {
    pub nrows: usize,
    pub ncols: usize,
    pub data: Vec<Scalar>,
}

impl DenseMatrix {
    pub fn empty(ncols: usize) -> Self {
        Self {
            nrows: 0,
            ncols,
            data: Vec::new(),
        }
    }

    /// # Panics
    ///
    /// If `row` does not have exactly `ncols` entries.
    pub fn push_row(&mut self, row: impl IntoIterator<Item = Scalar>) {
        let before = self.data.len();
        self.data.extend(row);
        assert_eq!(
            self.data.len() - before,
            self.ncols,
            "row length does not match column count"
        );
        self.nrows += 1;
    }

    pub fn row(&self, index: usize) -> &[Scalar] {
        let start = index * self.ncols;
        &self.data[start..start + self.ncols]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Scalar]> + '_ {
        (0..self.nrows).map(move |i| self.row(i))
    }

    pub fn is_empty(&self) -> bool {
        self.nrows == 0
    }
}

/// Minimisation-oriented form handed to a [`crate::LinearEngine`]:
/// `min cost·x  s.t.  a_le·x <= b_le,  a_eq·x = b_eq,  x >= 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalForm {
    pub cost: Vec<Scalar>,
    pub a_le: DenseMatrix,
    pub b_le: Vec<Scalar>,
    /// Constraint index in the source problem for each `a_le` row.
    pub le_origin: Vec<usize>,
    pub a_eq: DenseMatrix,
    pub b_eq: Vec<Scalar>,
    pub eq_origin: Vec<usize>,
    /// Set when the source objective was maximised and `cost` holds `-c`.
    pub negated_objective: bool,
}

impl CanonicalForm {
    /// Shapes are trusted; run [`Problem::validate`] first.
    ///
    /// Unsatisfiable rows such as `0·x <= -5` are passed through untouched.
    ///
    /// # Panics
    ///
    /// If a constraint row's length differs from `num_variables`.
    pub fn from_problem(problem: &Problem) -> Self {
        let n = problem.num_variables;
        let negated_objective = problem.objective.sense == Sense::Maximize;
        let cost = if negated_objective {
            problem.objective.coefficients.iter().map(|c| -c).collect()
        } else {
            problem.objective.coefficients.clone()
        };

        let mut form = Self {
            cost,
            a_le: DenseMatrix::empty(n),
            b_le: Vec::new(),
            le_origin: Vec::new(),
            a_eq: DenseMatrix::empty(n),
            b_eq: Vec::new(),
            eq_origin: Vec::new(),
            negated_objective,
        };

        for (index, constraint) in problem.constraints.iter().enumerate() {
            let coefficients = constraint.coefficients.iter().copied();
            match constraint.relation {
                Relation::Le => {
                    form.a_le.push_row(coefficients);
                    form.b_le.push(constraint.bound);
                    form.le_origin.push(index);
                }
                Relation::Ge => {
                    form.a_le.push_row(coefficients.map(|c| -c));
                    form.b_le.push(-constraint.bound);
                    form.le_origin.push(index);
                }
                Relation::Eq => {
                    form.a_eq.push_row(coefficients);
                    form.b_eq.push(constraint.bound);
                    form.eq_origin.push(index);
                }
            }
        }
        form
    }

    pub fn nvars(&self) -> usize {
        self.cost.len()
    }

    pub fn nrows(&self) -> usize {
        self.a_le.nrows + self.a_eq.nrows
    }

    /// Maps a minimised objective value back to the source problem's sense.
    pub fn restore_objective(&self, raw: Scalar) -> Scalar {
        if self.negated_objective {
            -raw
        } else {
            raw
        }
    }
}
