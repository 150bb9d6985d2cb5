#![forbid(unsafe_code)]

pub mod region;
pub mod simplex;

pub use region::{feasible_region, FeasibleRegion, GeometryError, Point, RegionShape};
pub use simplex::DenseSimplex;
