use crate::math::{dot, Scalar};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationKind {
    #[error("problem must have at least one variable")]
    NoVariables,
    #[error("expected {expected} entries, found {found}")]
    LengthMismatch { expected: usize, found: usize },
    #[error("value is not finite")]
    NonFinite,
    #[error("unrecognised relation {0:?} (expected <=, >= or =)")]
    UnknownRelation(String),
    #[error("unrecognised objective type {0:?} (expected maximize or minimize)")]
    UnknownSense(String),
    #[error("field is missing")]
    Missing,
    #[error("cannot parse {0:?} as a number")]
    Unparseable(String),
}

/// A malformed problem: what is wrong, in which field, and at which position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}{}: {kind}", .index.map(|i| format!("[{i}]")).unwrap_or_default())]
pub struct ValidationError {
    pub kind: ValidationKind,
    pub field: String,
    pub index: Option<usize>,
}

impl ValidationError {
    pub fn new(kind: ValidationKind, field: impl Into<String>) -> Self {
        Self {
            kind,
            field: field.into(),
            index: None,
        }
    }

    pub fn at(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }
}

pub type ProblemResult<T> = Result<T, ValidationError>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Sense {
    Maximize,
    Minimize,
}

impl Sense {
    pub fn as_str(self) -> &'static str {
        match self {
            Sense::Maximize => "maximize",
            Sense::Minimize => "minimize",
        }
    }
}

impl fmt::Display for Sense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sense {
    type Err = ValidationKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "maximize" | "maximise" | "max" => Ok(Sense::Maximize),
            "minimize" | "minimise" | "min" => Ok(Sense::Minimize),
            _ => Err(ValidationKind::UnknownSense(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Relation {
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "=")]
    Eq,
}

impl Relation {
    pub fn symbol(self) -> &'static str {
        match self {
            Relation::Le => "<=",
            Relation::Ge => ">=",
            Relation::Eq => "=",
        }
    }

    /// Whether `lhs` against `bound` satisfies the relation within `tolerance`.
    pub fn holds(self, lhs: Scalar, bound: Scalar, tolerance: Scalar) -> bool {
        match self {
            Relation::Le => lhs <= bound + tolerance,
            Relation::Ge => lhs >= bound - tolerance,
            Relation::Eq => (lhs - bound).abs() <= tolerance,
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Relation {
    type Err = ValidationKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "<=" | "=<" | "≤" => Ok(Relation::Le),
            ">=" | "=>" | "≥" => Ok(Relation::Ge),
            "=" | "==" => Ok(Relation::Eq),
            other => Err(ValidationKind::UnknownRelation(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Objective {
    pub coefficients: Vec<Scalar>,
    pub sense: Sense,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Constraint {
    pub coefficients: Vec<Scalar>,
    pub relation: Relation,
    pub bound: Scalar,
}

impl Constraint {
    pub fn new(coefficients: Vec<Scalar>, relation: Relation, bound: Scalar) -> Self {
        Self {
            coefficients,
            relation,
            bound,
        }
    }

    pub fn lhs(&self, x: &[Scalar]) -> Scalar {
        dot(&self.coefficients, x)
    }

    pub fn is_satisfied(&self, x: &[Scalar], tolerance: Scalar) -> bool {
        self.relation.holds(self.lhs(x), self.bound, tolerance)
    }
}

/// A linear program over non-negative variables.
///
/// Non-negativity is implicit and never stored as a constraint row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Problem {
    pub num_variables: usize,
    pub objective: Objective,
    pub constraints: Vec<Constraint>,
}

impl Problem {
    pub fn new(num_variables: usize, objective: Objective, constraints: Vec<Constraint>) -> Self {
        Self {
            num_variables,
            objective,
            constraints,
        }
    }

    pub fn nvars(&self) -> usize {
        self.num_variables
    }

    pub fn nconstraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn sense(&self) -> Sense {
        self.objective.sense
    }

    pub fn objective_value(&self, x: &[Scalar]) -> Scalar {
        dot(&self.objective.coefficients, x)
    }

    pub fn validate(&self) -> ProblemResult<()> {
        let n = self.num_variables;
        if n == 0 {
            return Err(ValidationError::new(
                ValidationKind::NoVariables,
                "num_variables",
            ));
        }
        let objective = &self.objective.coefficients;
        if objective.len() != n {
            return Err(ValidationError::new(
                ValidationKind::LengthMismatch {
                    expected: n,
                    found: objective.len(),
                },
                "objective_coeffs",
            ));
        }
        if let Some(pos) = objective.iter().position(|c| !c.is_finite()) {
            return Err(ValidationError::new(ValidationKind::NonFinite, "objective_coeffs").at(pos));
        }
        for (i, constraint) in self.constraints.iter().enumerate() {
            if constraint.coefficients.len() != n {
                return Err(ValidationError::new(
                    ValidationKind::LengthMismatch {
                        expected: n,
                        found: constraint.coefficients.len(),
                    },
                    "constraints",
                )
                .at(i));
            }
            if let Some(pos) = constraint.coefficients.iter().position(|c| !c.is_finite()) {
                return Err(ValidationError::new(
                    ValidationKind::NonFinite,
                    format!("constraints[{i}].coeffs"),
                )
                .at(pos));
            }
            if !constraint.bound.is_finite() {
                return Err(ValidationError::new(
                    ValidationKind::NonFinite,
                    format!("constraints[{i}].bound"),
                ));
            }
        }
        Ok(())
    }
}

fn write_linear(f: &mut fmt::Formatter<'_>, coefficients: &[Scalar]) -> fmt::Result {
    let mut first = true;
    for (j, &c) in coefficients.iter().enumerate() {
        if c == 0.0 {
            continue;
        }
        let magnitude = c.abs();
        if first {
            if c < 0.0 {
                f.write_str("-")?;
            }
        } else {
            f.write_str(if c < 0.0 { " - " } else { " + " })?;
        }
        if magnitude != 1.0 {
            write!(f, "{magnitude} ")?;
        }
        write!(f, "x{}", j + 1)?;
        first = false;
    }
    if first {
        f.write_str("0")?;
    }
    Ok(())
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.objective.sense)?;
        write_linear(f, &self.objective.coefficients)?;
        f.write_str("\nsubject to")?;
        for constraint in &self.constraints {
            f.write_str("\n  ")?;
            write_linear(f, &constraint.coefficients)?;
            write!(f, " {} {}", constraint.relation, constraint.bound)?;
        }
        let vars: Vec<String> = (1..=self.num_variables).map(|j| format!("x{j}")).collect();
        write!(f, "\n  {} >= 0", vars.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn production() -> Problem {
        Problem::new(
            2,
            Objective {
                coefficients: vec![3.0, 2.0],
                sense: Sense::Maximize,
            },
            vec![
                Constraint::new(vec![2.0, 1.0], Relation::Le, 100.0),
                Constraint::new(vec![1.0, 1.0], Relation::Le, 80.0),
                Constraint::new(vec![1.0, 0.0], Relation::Le, 40.0),
            ],
        )
    }

    #[test]
    fn well_formed_problem_validates() {
        assert!(production().validate().is_ok());
    }

    #[test]
    fn zero_constraints_is_legal() {
        let mut problem = production();
        problem.constraints.clear();
        assert!(problem.validate().is_ok());
    }

    #[test]
    fn rejects_zero_variables() {
        let problem = Problem::new(
            0,
            Objective {
                coefficients: Vec::new(),
                sense: Sense::Minimize,
            },
            Vec::new(),
        );
        let err = problem.validate().unwrap_err();
        assert_eq!(err.kind, ValidationKind::NoVariables);
        assert_eq!(err.field, "num_variables");
    }

    #[test]
    fn reports_objective_length() {
        let mut problem = production();
        problem.objective.coefficients.push(1.0);
        let err = problem.validate().unwrap_err();
        assert_eq!(
            err.kind,
            ValidationKind::LengthMismatch {
                expected: 2,
                found: 3
            }
        );
        assert_eq!(err.field, "objective_coeffs");
    }

    #[test]
    fn reports_constraint_index() {
        let mut problem = production();
        problem.constraints[2].coefficients = vec![1.0];
        let err = problem.validate().unwrap_err();
        assert_eq!(err.field, "constraints");
        assert_eq!(err.index, Some(2));
        assert_eq!(err.to_string(), "constraints[2]: expected 2 entries, found 1");
    }

    #[test]
    fn rejects_non_finite_bound() {
        let mut problem = production();
        problem.constraints[1].bound = Scalar::INFINITY;
        let err = problem.validate().unwrap_err();
        assert_eq!(err.kind, ValidationKind::NonFinite);
        assert_eq!(err.field, "constraints[1].bound");
    }

    #[test]
    fn rejects_nan_coefficient() {
        let mut problem = production();
        problem.constraints[0].coefficients[1] = Scalar::NAN;
        let err = problem.validate().unwrap_err();
        assert_eq!(err.field, "constraints[0].coeffs");
        assert_eq!(err.index, Some(1));
    }

    #[test]
    fn parses_relations_and_senses() {
        assert_eq!("<=".parse::<Relation>(), Ok(Relation::Le));
        assert_eq!(" >= ".parse::<Relation>(), Ok(Relation::Ge));
        assert_eq!("==".parse::<Relation>(), Ok(Relation::Eq));
        assert_eq!(
            "<".parse::<Relation>(),
            Err(ValidationKind::UnknownRelation("<".into()))
        );
        assert_eq!("MAX".parse::<Sense>(), Ok(Sense::Maximize));
        assert_eq!("minimize".parse::<Sense>(), Ok(Sense::Minimize));
        assert!("optimise".parse::<Sense>().is_err());
    }

    #[test]
    fn evaluates_constraints() {
        let problem = production();
        let x = [20.0, 60.0];
        assert_eq!(problem.objective_value(&x), 180.0);
        assert!(problem.constraints.iter().all(|c| c.is_satisfied(&x, 1e-9)));
        assert!(!problem.constraints[2].is_satisfied(&[41.0, 0.0], 1e-9));
    }

    #[test]
    fn displays_readable_model() {
        let mut problem = production();
        problem.constraints[2] = Constraint::new(vec![1.0, -0.5], Relation::Ge, -3.0);
        let text = problem.to_string();
        assert!(text.starts_with("maximize 3 x1 + 2 x2\nsubject to"));
        assert!(text.contains("x1 - 0.5 x2 >= -3"));
        assert!(text.ends_with("x1, x2 >= 0"));
    }
}
