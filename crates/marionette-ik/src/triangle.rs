//! Closed-form triangle decomposition.
//!
//! Foundation of every two-bone analytic solve: given the two bone lengths
//! and the straight-line distance to the target, locate the bend joint by
//! its altitude above the target line and the altitude foot's distance along
//! it.

use marionette_core::transform::EPSILON;

/// Result of [`solve`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleSolution {
    /// Altitude from the apex (the bend joint) onto the target side.
    pub height: f32,
    /// Distance from the `a`-side end of the target side to the altitude
    /// foot.
    pub foot: f32,
    /// False when the triangle is degenerate and the linear fallback was
    /// used; callers treat this as "the chain is fully stretched".
    pub reachable: bool,
}

/// Solve a triangle with side lengths `a` and `b` against an opposite side
/// of length `s`.
///
/// When `a + b < s` (the target is out of reach) or the squared altitude
/// comes out negative numerically, the apex collapses onto the target side
/// at the length-proportional point `s·a/(a+b)` with zero altitude.
pub fn solve(a: f32, b: f32, s: f32) -> TriangleSolution {
    let sum = a + b;
    if sum <= EPSILON {
        return TriangleSolution {
            height: 0.0,
            foot: 0.0,
            reachable: false,
        };
    }
    let fallback = TriangleSolution {
        height: 0.0,
        foot: s * (a / sum),
        reachable: false,
    };
    if sum < s || s <= EPSILON {
        return fallback;
    }

    let aa = a * a;
    let bb = b * b;
    let ss = s * s;
    let hh = (2.0 * (aa * bb + aa * ss + bb * ss) - (aa * aa + bb * bb + ss * ss)) / (4.0 * ss);
    if hh < 0.0 {
        return fallback;
    }

    TriangleSolution {
        height: hh.sqrt(),
        foot: (aa - hh).max(0.0).sqrt(),
        reachable: true,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
