//! Worked problems shipped with lpviz.

use lpviz_core::math::Scalar;
use lpviz_core::problem::{Constraint, Objective, Problem, Relation, Sense};

#[derive(Debug, Clone, PartialEq)]
pub struct Example {
    pub name: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub problem: Problem,
}

type Row<'a> = (&'a [Scalar], Relation, Scalar);

fn example(
    name: &'static str,
    title: &'static str,
    description: &'static str,
    sense: Sense,
    objective: &[Scalar],
    rows: &[Row<'_>],
) -> Example {
    let constraints = rows
        .iter()
        .map(|(coefficients, relation, bound)| {
            Constraint::new(coefficients.to_vec(), *relation, *bound)
        })
        .collect();
    let objective = Objective {
        coefficients: objective.to_vec(),
        sense,
    };
    Example {
        name,
        title,
        description,
        problem: Problem::new(objective.coefficients.len(), objective, constraints),
    }
}

pub fn production() -> Example {
    example(
        "production",
        "Production planning",
        "Two products earn 3 and 2 per unit. Material: 2x1 + x2 <= 100. \
         Labour: x1 + x2 <= 80. Machine time: x1 <= 40. Maximise profit.",
        Sense::Maximize,
        &[3.0, 2.0],
        &[
            (&[2.0, 1.0], Relation::Le, 100.0),
            (&[1.0, 1.0], Relation::Le, 80.0),
            (&[1.0, 0.0], Relation::Le, 40.0),
        ],
    )
}

pub fn diet() -> Example {
    example(
        "diet",
        "Diet",
        "Meat costs 0.50 and vegetables 0.30 per unit. Protein: 2x1 + x2 >= 10. \
         Vitamins: x1 + 3x2 >= 12. Minimise cost.",
        Sense::Minimize,
        &[0.5, 0.3],
        &[
            (&[2.0, 1.0], Relation::Ge, 10.0),
            (&[1.0, 3.0], Relation::Ge, 12.0),
        ],
    )
}

pub fn transportation() -> Example {
    example(
        "transportation",
        "Transportation",
        "Three routes cost 2, 3 and 1 per unit. Demand: x1 + x2 + x3 >= 100. \
         Supply: 2x1 + x2 + 3x3 <= 200. Minimise shipping cost.",
        Sense::Minimize,
        &[2.0, 3.0, 1.0],
        &[
            (&[1.0, 1.0, 1.0], Relation::Ge, 100.0),
            (&[2.0, 1.0, 3.0], Relation::Le, 200.0),
        ],
    )
}

pub fn investment() -> Example {
    example(
        "investment",
        "Investment portfolio",
        "Bonds return 8% and stocks 12%. Budget: x1 + x2 <= 10000. \
         At least 3000 in bonds, at most 5000 in stocks. Maximise return.",
        Sense::Maximize,
        &[0.08, 0.12],
        &[
            (&[1.0, 1.0], Relation::Le, 10_000.0),
            (&[1.0, 0.0], Relation::Ge, 3_000.0),
            (&[0.0, 1.0], Relation::Le, 5_000.0),
        ],
    )
}

pub fn all() -> Vec<Example> {
    vec![production(), diet(), transportation(), investment()]
}

/// Looks an example up by name, ignoring case.
pub fn find(name: &str) -> Option<Example> {
    all()
        .into_iter()
        .find(|example| example.name.eq_ignore_ascii_case(name.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_example_validates() {
        for example in all() {
            assert!(example.problem.validate().is_ok(), "{}", example.name);
        }
    }

    #[test]
    fn find_ignores_case() {
        assert_eq!(find("Diet").map(|e| e.name), Some("diet"));
        assert_eq!(find(" transportation ").map(|e| e.problem.nvars()), Some(3));
        assert!(find("knapsack").is_none());
    }
}
