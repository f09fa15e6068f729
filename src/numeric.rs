//! Convenience wrappers around methods from the approx crate. Provides
//! utility functions for working with floating point precision.

use approx::AbsDiffEq;

/// Targeted accuracy instantiated over `f64`
pub const ACC: f64 = 10e-11;

/// Compares if two floats are close via `approx::abs_diff_eq` using a maximum
/// absolute difference (epsilon) of `acc`.
#[must_use]
pub fn almost_eq(a: f64, b: f64, acc: f64) -> bool {
    if a.is_infinite() && b.is_infinite() {
        return a == b;
    }
    a.abs_diff_eq(&b, acc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_almost_eq;

    #[test]
    fn almost_eq_within_tolerance() {
        let a = 1.0;
        let b = 1.0 + 0.5e-11;
        assert!(almost_eq(a, b, ACC));
    }

    #[test]
    fn almost_eq_outside_tolerance() {
        let a = 1.0;
        let b = 1.0 + 2e-10;
        assert!(!almost_eq(a, b, ACC));
    }

    #[test]
    fn almost_eq_infinities() {
        assert!(almost_eq(f64::INFINITY, f64::INFINITY, ACC));
        assert!(!almost_eq(f64::INFINITY, f64::NEG_INFINITY, ACC));
    }

    #[test]
    fn assert_almost_eq_macro_passes() {
        assert_almost_eq!(3.14159265, 3.14159264, 1e-7);
    }
}
