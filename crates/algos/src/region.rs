//! Feasible-region geometry for two-variable problems.
//!
//! Produces plain data for a renderer: the ordered polygon outline, each
//! constraint line clipped to a viewport, and the optimum marker.
//! Identical inputs always give bit-identical output.

use itertools::Itertools;
use lpviz_core::math::{scaled_tolerance, Scalar, TOLERANCE};
use lpviz_core::problem::{Constraint, Problem, Relation, ValidationError};
use lpviz_core::solution::Solution;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Smallest viewport side length.
pub const MIN_EXTENT: Scalar = 10.0;
/// Viewport side relative to the largest bound, intercept or vertex coordinate.
pub const EXTENT_MARGIN: Scalar = 1.5;

#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("feasible-region plots need exactly 2 variables, problem has {0}")]
    UnsupportedDimension(usize),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: Scalar,
    pub y: Scalar,
}

impl Point {
    pub fn new(x: Scalar, y: Scalar) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> Scalar {
        (self.x - other.x).hypot(self.y - other.y)
    }

    fn magnitude(self) -> Scalar {
        self.x.abs().max(self.y.abs())
    }
}

impl From<[Scalar; 2]> for Point {
    fn from([x, y]: [Scalar; 2]) -> Self {
        Self { x, y }
    }
}

/// Where a boundary line comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    Constraint(usize),
    NonNegativeX,
    NonNegativeY,
    ViewportRight,
    ViewportTop,
}

/// `normal · (x, y) <relation> bound`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HalfPlane {
    pub normal: [Scalar; 2],
    pub bound: Scalar,
    pub relation: Relation,
    pub origin: Boundary,
}

impl HalfPlane {
    fn from_constraint(index: usize, constraint: &Constraint) -> Self {
        Self {
            normal: [constraint.coefficients[0], constraint.coefficients[1]],
            bound: constraint.bound,
            relation: constraint.relation,
            origin: Boundary::Constraint(index),
        }
    }

    /// Index of the problem row this line comes from, if any.
    pub fn constraint(&self) -> Option<usize> {
        match self.origin {
            Boundary::Constraint(index) => Some(index),
            _ => None,
        }
    }

    fn norm(&self) -> Scalar {
        self.normal[0].hypot(self.normal[1])
    }

    fn value(&self, p: Point) -> Scalar {
        self.normal[0] * p.x + self.normal[1] * p.y
    }

    pub fn contains(&self, p: Point, tolerance: Scalar) -> bool {
        let magnitude = self
            .bound
            .abs()
            .max(self.normal[0].abs().max(self.normal[1].abs()) * p.magnitude());
        self.relation.holds(
            self.value(p),
            self.bound,
            scaled_tolerance(tolerance, magnitude),
        )
    }

    /// Crossing point of the two boundary lines, unless they are (nearly) parallel.
    pub fn intersect(&self, other: &HalfPlane, tolerance: Scalar) -> Option<Point> {
        let [a1, a2] = self.normal;
        let [b1, b2] = other.normal;
        let det = a1 * b2 - a2 * b1;
        let scale = self.norm() * other.norm();
        if scale == 0.0 || det.abs() <= tolerance * scale {
            return None;
        }
        let (c1, c2) = (self.bound, other.bound);
        Some(Point::new(
            (c1 * b2 - a2 * c2) / det,
            (a1 * c2 - c1 * b1) / det,
        ))
    }
}

/// The square `[0, extent]²` used for clipping and drawing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub extent: Scalar,
}

impl Viewport {
    /// Sized from every finite bound, axis intercept and the given points.
    pub fn fit(problem: &Problem, points: &[Point]) -> Self {
        let data = problem.constraints.iter().flat_map(|c| {
            let intercepts = c
                .coefficients
                .iter()
                .filter(|a| a.abs() > TOLERANCE)
                .map(move |a| (c.bound / a).abs());
            std::iter::once(c.bound.abs()).chain(intercepts)
        });
        let largest = data
            .chain(points.iter().map(|p| p.magnitude()))
            .filter(|v| v.is_finite())
            .fold(0.0, Scalar::max);
        Self {
            extent: MIN_EXTENT.max((EXTENT_MARGIN * largest).min(Scalar::MAX)),
        }
    }

    fn half_planes(&self) -> [HalfPlane; 2] {
        [
            HalfPlane {
                normal: [1.0, 0.0],
                bound: self.extent,
                relation: Relation::Le,
                origin: Boundary::ViewportRight,
            },
            HalfPlane {
                normal: [0.0, 1.0],
                bound: self.extent,
                relation: Relation::Le,
                origin: Boundary::ViewportTop,
            },
        ]
    }

    /// Liang–Barsky clip of the full boundary line of `plane`.
    pub fn clip(&self, plane: &HalfPlane) -> Option<(Point, Point)> {
        let norm = plane.norm();
        if norm <= TOLERANCE {
            return None;
        }
        let unit = [plane.normal[0] / norm, plane.normal[1] / norm];
        let offset = plane.bound / norm;
        let origin = [unit[0] * offset, unit[1] * offset];
        let direction = [-unit[1], unit[0]];
        let (mut t_min, mut t_max) = (Scalar::NEG_INFINITY, Scalar::INFINITY);
        for axis in 0..2 {
            let (p, d) = (origin[axis], direction[axis]);
            if d.abs() <= TOLERANCE {
                let slack = scaled_tolerance(TOLERANCE, self.extent);
                if p < -slack || p > self.extent + slack {
                    return None;
                }
                continue;
            }
            let (t0, t1) = ((0.0 - p) / d, (self.extent - p) / d);
            t_min = t_min.max(t0.min(t1));
            t_max = t_max.min(t0.max(t1));
        }
        if t_min > t_max {
            return None;
        }
        let at = |t: Scalar| Point::new(origin[0] + t * direction[0], origin[1] + t * direction[1]);
        Some((at(t_min), at(t_max)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundarySegment {
    pub constraint: usize,
    pub start: Point,
    pub end: Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionShape {
    /// At least three vertices come from the constraint lines alone. The
    /// region itself may still be unbounded.
    Polygon,
    /// The region is unbounded; the polygon is cut off at the viewport.
    Clipped,
    /// A point or a segment.
    Degenerate,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeasibleRegion {
    pub vertices: Vec<Point>,
    pub segments: Vec<BoundarySegment>,
    pub optimum: Option<Point>,
    pub viewport: Viewport,
    pub shape: RegionShape,
}

/// Every constraint plus `x >= 0` and `y >= 0`.
pub fn boundary_planes(problem: &Problem) -> Vec<HalfPlane> {
    let mut planes: Vec<HalfPlane> = problem
        .constraints
        .iter()
        .enumerate()
        .map(|(i, c)| HalfPlane::from_constraint(i, c))
        .collect();
    planes.push(HalfPlane {
        normal: [1.0, 0.0],
        bound: 0.0,
        relation: Relation::Ge,
        origin: Boundary::NonNegativeX,
    });
    planes.push(HalfPlane {
        normal: [0.0, 1.0],
        bound: 0.0,
        relation: Relation::Ge,
        origin: Boundary::NonNegativeY,
    });
    planes
}

/// Pairwise intersections that satisfy every half-plane, deduplicated in discovery order.
pub fn feasible_vertices(planes: &[HalfPlane], tolerance: Scalar) -> Vec<Point> {
    let mut kept: Vec<Point> = Vec::new();
    for (a, b) in planes.iter().tuple_combinations() {
        let Some(p) = a.intersect(b, tolerance) else {
            continue;
        };
        if !planes.iter().all(|h| h.contains(p, tolerance)) {
            continue;
        }
        let duplicate = kept
            .iter()
            .any(|q| p.distance(*q) <= scaled_tolerance(tolerance, p.magnitude()));
        if !duplicate {
            kept.push(p);
        }
    }
    kept
}

/// Sorts by angle around the centroid, nearer points first on equal angles.
pub fn order_around_centroid(points: &mut [Point]) {
    if points.is_empty() {
        return;
    }
    let n = points.len() as Scalar;
    let cx = points.iter().map(|p| p.x / n).sum::<Scalar>();
    let cy = points.iter().map(|p| p.y / n).sum::<Scalar>();
    points.sort_by_cached_key(|p| {
        let (dx, dy) = (p.x - cx, p.y - cy);
        (OrderedFloat(dy.atan2(dx)), OrderedFloat(dx.hypot(dy)))
    });
}

fn twice_area(points: &[Point]) -> Scalar {
    points
        .iter()
        .circular_tuple_windows()
        .map(|(p, q)| p.x * q.y - q.x * p.y)
        .sum()
}

/// Ordered outline of the points, or their extreme endpoints when they span no area.
fn outline(mut points: Vec<Point>, tolerance: Scalar) -> (Vec<Point>, bool) {
    if points.len() < 3 {
        return (points, false);
    }
    order_around_centroid(&mut points);
    // Area is measured on coordinates shrunk into the unit square.
    let span = points.iter().map(|p| p.magnitude()).fold(1.0, Scalar::max);
    let unit: Vec<Point> = points
        .iter()
        .map(|p| Point::new(p.x / span, p.y / span))
        .collect();
    if twice_area(&unit).abs() > tolerance {
        return (points, true);
    }
    let ends = points
        .iter()
        .tuple_combinations()
        .max_by_key(|(p, q)| OrderedFloat(p.distance(**q)))
        .map(|(p, q)| vec![*p, *q])
        .unwrap_or_default();
    (ends, false)
}

pub fn feasible_region(
    problem: &Problem,
    solution: Option<&Solution>,
) -> Result<FeasibleRegion, GeometryError> {
    problem.validate()?;
    if problem.num_variables != 2 {
        return Err(GeometryError::UnsupportedDimension(problem.num_variables));
    }

    let mut planes = boundary_planes(problem);
    let found = feasible_vertices(&planes, TOLERANCE);
    let viewport = Viewport::fit(problem, &found);
    let (mut vertices, mut polygon) = outline(found, TOLERANCE);
    let mut clipped = false;
    if !polygon {
        debug!(
            points = vertices.len(),
            extent = viewport.extent,
            "region open or degenerate, clipping to viewport"
        );
        planes.extend(viewport.half_planes());
        (vertices, polygon) = outline(feasible_vertices(&planes, TOLERANCE), TOLERANCE);
        clipped = true;
    }
    let shape = match (polygon, clipped, vertices.is_empty()) {
        (true, false, _) => RegionShape::Polygon,
        (true, true, _) => RegionShape::Clipped,
        (false, _, true) => RegionShape::Empty,
        (false, _, false) => RegionShape::Degenerate,
    };

    let segments = planes
        .iter()
        .filter_map(|plane| {
            let constraint = plane.constraint()?;
            let (start, end) = viewport.clip(plane)?;
            Some(BoundarySegment {
                constraint,
                start,
                end,
            })
        })
        .collect();

    let optimum = solution.and_then(Solution::point2).map(Point::from);
    debug!(vertices = vertices.len(), ?shape, "feasible region computed");
    Ok(FeasibleRegion {
        vertices,
        segments,
        optimum,
        viewport,
        shape,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use lpviz_core::problem::{Objective, Sense};

    fn plane(a: Scalar, b: Scalar, relation: Relation, bound: Scalar) -> HalfPlane {
        HalfPlane {
            normal: [a, b],
            bound,
            relation,
            origin: Boundary::Constraint(0),
        }
    }

    #[test]
    fn parallel_lines_do_not_intersect() {
        let a = plane(1.0, 1.0, Relation::Le, 1.0);
        let b = plane(2.0, 2.0, Relation::Ge, 10.0);
        assert_eq!(a.intersect(&b, TOLERANCE), None);
        let zero = plane(0.0, 0.0, Relation::Le, -5.0);
        assert_eq!(a.intersect(&zero, TOLERANCE), None);
    }

    #[test]
    fn only_problem_rows_carry_a_constraint_index() {
        let problem = Problem::new(
            2,
            Objective {
                coefficients: vec![1.0, 1.0],
                sense: Sense::Maximize,
            },
            vec![
                Constraint::new(vec![1.0, 2.0], Relation::Le, 4.0),
                Constraint::new(vec![3.0, 1.0], Relation::Ge, 1.0),
            ],
        );
        let tags: Vec<Option<usize>> = boundary_planes(&problem)
            .iter()
            .chain(Viewport { extent: 10.0 }.half_planes().iter())
            .map(HalfPlane::constraint)
            .collect();
        assert_eq!(tags, vec![Some(0), Some(1), None, None, None, None]);
    }

    #[test]
    fn crossing_lines_intersect() {
        let a = plane(2.0, 1.0, Relation::Le, 100.0);
        let b = plane(1.0, 1.0, Relation::Le, 80.0);
        let p = a.intersect(&b, TOLERANCE).unwrap();
        assert_abs_diff_eq!(p.x, 20.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p.y, 60.0, epsilon = 1e-12);
    }

    #[test]
    fn equality_half_plane_is_a_line() {
        let eq = plane(1.0, 1.0, Relation::Eq, 4.0);
        assert!(eq.contains(Point::new(1.0, 3.0), TOLERANCE));
        assert!(!eq.contains(Point::new(1.0, 2.0), TOLERANCE));
    }

    #[test]
    fn ordering_is_counter_clockwise_from_lower_left() {
        let mut points = vec![
            Point::new(10.0, 10.0),
            Point::new(0.0, 0.0),
            Point::new(0.0, 10.0),
            Point::new(10.0, 0.0),
        ];
        order_around_centroid(&mut points);
        assert_eq!(
            points,
            vec![
                Point::new(0.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(10.0, 10.0),
                Point::new(0.0, 10.0),
            ]
        );
    }

    #[test]
    fn collinear_points_reduce_to_endpoints() {
        let points = vec![
            Point::new(0.0, 4.0),
            Point::new(2.0, 2.0),
            Point::new(4.0, 0.0),
        ];
        let (ends, polygon) = outline(points, TOLERANCE);
        assert!(!polygon);
        assert_eq!(ends, vec![Point::new(4.0, 0.0), Point::new(0.0, 4.0)]);
    }

    #[test]
    fn viewport_grows_with_data() {
        let problem = Problem::new(
            2,
            Objective {
                coefficients: vec![1.0, 1.0],
                sense: Sense::Maximize,
            },
            vec![Constraint::new(vec![0.5, 4.0], Relation::Le, 20.0)],
        );
        assert_eq!(Viewport::fit(&problem, &[]).extent, 60.0);
        let far = [Point::new(100.0, 3.0)];
        assert_eq!(Viewport::fit(&problem, &far).extent, 150.0);
    }

    #[test]
    fn small_problems_use_minimum_viewport() {
        let problem = Problem::new(
            2,
            Objective {
                coefficients: vec![1.0, 0.0],
                sense: Sense::Maximize,
            },
            Vec::new(),
        );
        assert_eq!(Viewport::fit(&problem, &[]).extent, MIN_EXTENT);
    }

    #[test]
    fn clips_lines_to_viewport() {
        let viewport = Viewport { extent: 10.0 };
        let (start, end) = viewport.clip(&plane(1.0, 1.0, Relation::Le, 4.0)).unwrap();
        let mut ends = [start, end];
        ends.sort_by_key(|p| OrderedFloat(p.x));
        assert_abs_diff_eq!(ends[0].x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(ends[0].y, 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(ends[1].x, 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(ends[1].y, 0.0, epsilon = 1e-12);

        let (start, end) = viewport.clip(&plane(1.0, 0.0, Relation::Le, 3.0)).unwrap();
        assert_abs_diff_eq!(start.x, 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(end.x, 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!((start.y - end.y).abs(), 10.0, epsilon = 1e-12);

        assert_eq!(viewport.clip(&plane(1.0, 1.0, Relation::Le, 25.0)), None);
        assert_eq!(viewport.clip(&plane(0.0, 1.0, Relation::Ge, -2.0)), None);
        assert_eq!(viewport.clip(&plane(0.0, 0.0, Relation::Le, 1.0)), None);
    }

    #[test]
    fn rejects_other_dimensions() {
        let problem = Problem::new(
            3,
            Objective {
                coefficients: vec![1.0, 1.0, 1.0],
                sense: Sense::Minimize,
            },
            Vec::new(),
        );
        assert!(matches!(
            feasible_region(&problem, None),
            Err(GeometryError::UnsupportedDimension(3))
        ));
    }

    #[test]
    fn rejects_malformed_problem() {
        let problem = Problem::new(
            2,
            Objective {
                coefficients: vec![1.0],
                sense: Sense::Minimize,
            },
            Vec::new(),
        );
        assert!(matches!(
            feasible_region(&problem, None),
            Err(GeometryError::Invalid(_))
        ));
    }
}
