#![forbid(unsafe_code)]

//! The on-disk problem format and file helpers.
//!
//! Problems are stored as JSON with every coefficient written as a numeric
//! string:
//!
//! ```json
//! {
//!   "num_variables": 2,
//!   "num_constraints": 1,
//!   "objective_type": "maximize",
//!   "objective_coeffs": ["3", "2"],
//!   "constraints": [{ "coeffs": ["2", "1"], "type": "<=", "bound": "100" }]
//! }
//! ```
//!
//! Plain JSON numbers are accepted wherever a numeric string is expected.

use anyhow::{anyhow, Context, Result};
use lpviz_algos::region::FeasibleRegion;
use lpviz_core::math::Scalar;
use lpviz_core::problem::{
    Constraint, Objective, Problem, Relation, Sense, ValidationError, ValidationKind,
};
use lpviz_core::solution::Solution;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid problem: {0}")]
    Invalid(#[from] ValidationError),
}

/// A coefficient as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberField {
    Text(String),
    Number(Scalar),
}

impl NumberField {
    pub fn parse(&self) -> Result<Scalar, ValidationKind> {
        match self {
            NumberField::Number(value) => Ok(*value),
            NumberField::Text(text) => text
                .trim()
                .parse::<Scalar>()
                .map_err(|_| ValidationKind::Unparseable(text.clone())),
        }
    }
}

impl From<Scalar> for NumberField {
    /// `f64`'s `Display` is the shortest text that parses back to the same value.
    fn from(value: Scalar) -> Self {
        NumberField::Text(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintRecord {
    pub coeffs: Option<Vec<NumberField>>,
    #[serde(rename = "type")]
    pub relation: Option<String>,
    pub bound: Option<NumberField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemFile {
    pub num_variables: Option<usize>,
    /// Checked against `constraints` when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_constraints: Option<usize>,
    pub objective_type: Option<String>,
    pub objective_coeffs: Option<Vec<NumberField>>,
    pub constraints: Option<Vec<ConstraintRecord>>,
}

fn required<T>(value: Option<T>, field: impl Into<String>) -> Result<T, ValidationError> {
    value.ok_or_else(|| ValidationError::new(ValidationKind::Missing, field))
}

fn parse_numbers(fields: &[NumberField], field: &str) -> Result<Vec<Scalar>, ValidationError> {
    fields
        .iter()
        .enumerate()
        .map(|(i, value)| {
            value
                .parse()
                .map_err(|kind| ValidationError::new(kind, field).at(i))
        })
        .collect()
}

impl ProblemFile {
    pub fn from_problem(problem: &Problem) -> Self {
        let numbers = |values: &[Scalar]| -> Vec<NumberField> {
            values.iter().copied().map(NumberField::from).collect()
        };
        Self {
            num_variables: Some(problem.num_variables),
            num_constraints: Some(problem.nconstraints()),
            objective_type: Some(problem.sense().as_str().to_string()),
            objective_coeffs: Some(numbers(&problem.objective.coefficients)),
            constraints: Some(
                problem
                    .constraints
                    .iter()
                    .map(|c| ConstraintRecord {
                        coeffs: Some(numbers(&c.coefficients)),
                        relation: Some(c.relation.symbol().to_string()),
                        bound: Some(c.bound.into()),
                    })
                    .collect(),
            ),
        }
    }

    /// Parses every field and returns a validated [`Problem`].
    pub fn into_problem(self) -> Result<Problem, ValidationError> {
        let num_variables = required(self.num_variables, "num_variables")?;
        let sense: Sense = required(self.objective_type, "objective_type")?
            .parse()
            .map_err(|kind| ValidationError::new(kind, "objective_type"))?;
        let coefficients = parse_numbers(
            &required(self.objective_coeffs, "objective_coeffs")?,
            "objective_coeffs",
        )?;
        let records = required(self.constraints, "constraints")?;
        if let Some(expected) = self.num_constraints {
            if expected != records.len() {
                return Err(ValidationError::new(
                    ValidationKind::LengthMismatch {
                        expected,
                        found: records.len(),
                    },
                    "constraints",
                ));
            }
        }
        let constraints = records
            .into_iter()
            .enumerate()
            .map(|(i, record)| record.into_constraint(i))
            .collect::<Result<Vec<_>, _>>()?;
        let problem = Problem::new(
            num_variables,
            Objective {
                coefficients,
                sense,
            },
            constraints,
        );
        problem.validate()?;
        Ok(problem)
    }
}

impl ConstraintRecord {
    fn into_constraint(self, index: usize) -> Result<Constraint, ValidationError> {
        let field = |name: &str| format!("constraints[{index}].{name}");
        let coefficients = parse_numbers(
            &required(self.coeffs, field("coeffs"))?,
            &field("coeffs"),
        )?;
        let relation: Relation = required(self.relation, field("type"))?
            .parse()
            .map_err(|kind| ValidationError::new(kind, field("type")))?;
        let bound = required(self.bound, field("bound"))?
            .parse()
            .map_err(|kind| ValidationError::new(kind, field("bound")))?;
        Ok(Constraint::new(coefficients, relation, bound))
    }
}

pub fn parse_problem(text: &str) -> Result<Problem, FormatError> {
    let file: ProblemFile = serde_json::from_str(text)?;
    Ok(file.into_problem()?)
}

pub fn problem_to_json(problem: &Problem) -> Result<String, FormatError> {
    Ok(serde_json::to_string_pretty(&ProblemFile::from_problem(problem))?)
}

/// `lp_problem_{n}vars_{m}cons.json`
pub fn default_file_name(problem: &Problem) -> String {
    format!(
        "lp_problem_{}vars_{}cons.json",
        problem.num_variables,
        problem.nconstraints()
    )
}

pub fn read_problem<P: AsRef<Path>>(path: P) -> Result<Problem> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("failed to open {:?}", path))?;
    let mut reader = BufReader::new(file);
    let mut contents = String::new();
    reader
        .read_to_string(&mut contents)
        .with_context(|| format!("failed to read {:?}", path))?;
    debug!(path = %path.display(), bytes = contents.len(), "read problem file");

    parse_problem(&contents).or_else(|err| {
        if serde_json::from_str::<Solution>(&contents).is_ok() {
            Err(anyhow!(
                "{:?} contains a solution, but a problem file was expected",
                path
            ))
        } else {
            Err(err).with_context(|| format!("failed to load problem from {:?}", path))
        }
    })
}

fn write_json<P, T>(path: P, value: &T, what: &str) -> Result<()>
where
    P: AsRef<Path>,
    T: Serialize + ?Sized,
{
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create parent directory {:?}", parent))?;
        }
    }

    let file = File::create(path).with_context(|| format!("failed to create {:?}", path))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)
        .with_context(|| format!("failed to serialise {what}"))?;
    writer
        .write_all(b"\n")
        .and_then(|_| writer.flush())
        .with_context(|| format!("failed to write {what} into {:?}", path))?;
    debug!(path = %path.display(), what, "wrote file");
    Ok(())
}

pub fn write_problem<P: AsRef<Path>>(path: P, problem: &Problem) -> Result<()> {
    write_json(path, &ProblemFile::from_problem(problem), "problem")
}

pub fn write_solution<P: AsRef<Path>>(path: P, solution: &Solution) -> Result<()> {
    write_json(path, solution, "solution")
}

pub fn write_region<P: AsRef<Path>>(path: P, region: &FeasibleRegion) -> Result<()> {
    write_json(path, region, "region")
}
