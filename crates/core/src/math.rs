use num_traits::{Float as NumFloat, FromPrimitive};
use std::ops::{AddAssign, MulAssign, SubAssign};
use std::time::{Duration, Instant};

pub trait RealNumber:
    NumFloat + FromPrimitive + Send + Sync + AddAssign + SubAssign + MulAssign + 'static
{
}

impl<T> RealNumber for T where
    T: NumFloat + FromPrimitive + Send + Sync + AddAssign + SubAssign + MulAssign + 'static
{
}

pub type Scalar = f64;

/// Shared numeric tolerance.
///
/// The engine receives it as the default [`crate::SolveOptions::tolerance`] and the
/// feasible-region geometry uses it for parallel, duplicate and half-plane tests,
/// so algebraic and geometric feasibility agree.
pub const TOLERANCE: Scalar = 1e-9;

/// Tolerance relative to the magnitude of the values being compared.
pub fn scaled_tolerance<T: RealNumber>(tolerance: T, magnitude: T) -> T {
    tolerance * T::one().max(magnitude.abs())
}

pub fn dot<T: RealNumber>(lhs: &[T], rhs: &[T]) -> T {
    assert_eq!(lhs.len(), rhs.len(), "dot product dimension mismatch");
    lhs.iter()
        .zip(rhs.iter())
        .fold(T::zero(), |acc, (a, b)| acc + (*a) * (*b))
}

pub fn norm_inf<T: RealNumber>(data: &[T]) -> T {
    data.iter()
        .copied()
        .map(|v| v.abs())
        .fold(T::zero(), |acc, value| acc.max(value))
}

#[derive(Debug, Clone)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn exceeded(&self, limit: Option<Duration>) -> bool {
        limit.map(|limit| self.elapsed() > limit).unwrap_or(false)
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::start()
    }
}

#[cfg(test)]
mod tests {
    use super::{dot, norm_inf, scaled_tolerance, Scalar, Timer, TOLERANCE};
    use std::time::Duration;

    #[test]
    fn test_dot_norms() {
        let v = [3.0 as Scalar, 4.0];
        assert!((dot(&v, &v) - 25.0).abs() < 1e-9);
        assert!((norm_inf(&v) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn tolerance_scales_with_magnitude() {
        assert_eq!(scaled_tolerance(TOLERANCE, 0.25), TOLERANCE);
        assert_eq!(scaled_tolerance(TOLERANCE, -1000.0), TOLERANCE * 1000.0);
    }

    #[test]
    fn timer_without_limit_never_expires() {
        let timer = Timer::start();
        assert!(!timer.exceeded(None));
        assert!(!timer.exceeded(Some(Duration::from_secs(3600))));
    }
}
