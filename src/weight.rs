// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::fmt::Debug;
use std::ops::{Add, Sub};

/// Numeric type usable as an edge weight by the [astar](crate::astar) engine.
///
/// Weights must be totally ordered in practice (no NaNs) and support addition
/// and subtraction. Reduced weights computed by the engine may be transiently
/// negative, which is why unsigned integers are not supported.
///
/// `EPSILON` is the smallest difference the engine treats as an improvement.
/// Integer weights use zero; floating-point weights use a small tolerance
/// to avoid endless relaxations caused by rounding noise.
pub trait AStarWeight: Copy + PartialOrd + Debug + Add<Output = Self> + Sub<Output = Self> {
    const ZERO: Self;
    const EPSILON: Self;

    /// Stands for "unreachable".
    const MAX: Self;
}

impl AStarWeight for f32 {
    const ZERO: Self = 0.0;
    const EPSILON: Self = 1e-4;
    const MAX: Self = f32::INFINITY;
}

impl AStarWeight for f64 {
    const ZERO: Self = 0.0;
    const EPSILON: Self = 1e-6;
    const MAX: Self = f64::INFINITY;
}

impl AStarWeight for i32 {
    const ZERO: Self = 0;
    const EPSILON: Self = 0;
    const MAX: Self = i32::MAX;
}

impl AStarWeight for i64 {
    const ZERO: Self = 0;
    const EPSILON: Self = 0;
    const MAX: Self = i64::MAX;
}

/// Returns the greater of two weights, preferring `a` if they are not comparable.
#[inline]
pub fn max_weight<W: AStarWeight>(a: W, b: W) -> W {
    if b > a {
        b
    } else {
        a
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_weight_picks_greater() {
        assert_eq!(max_weight(1.5_f64, 2.5), 2.5);
        assert_eq!(max_weight(-3_i64, 0), 0);
        assert_eq!(max_weight(-1e-9_f64, f64::ZERO), 0.0);
    }

    #[test]
    fn max_is_unreachable() {
        let inf = <f64 as AStarWeight>::MAX;
        assert!(inf - <f64 as AStarWeight>::EPSILON >= inf);
        assert!(inf + 1.0 >= inf);
        assert_eq!(
            <i64 as AStarWeight>::MAX - <i64 as AStarWeight>::EPSILON,
            i64::MAX
        );
    }
}
