//! 3D curves and arc-length discretization.

use crate::geometry::{Point3, add, distance, distance_to_segment, scale};
use std::f64::consts::TAU;
use std::fmt::Debug;

/// Number of chords used by the default arc-length integration.
const LENGTH_SAMPLES: usize = 256;
/// Hard cap on the number of segments produced by [`discretize`].
pub const MAX_SEGMENTS: usize = 100_000;

/// Parametric 3D curve.
pub trait Curve3d: Send + Sync + Debug {
    /// Point at parameter `t`.
    fn value(&self, t: f64) -> Point3;

    /// Arc length between two parameters (sign ignored).
    fn length_between(&self, t0: f64, t1: f64) -> f64 {
        let mut len = 0.0;
        let mut prev = self.value(t0);
        for i in 1..=LENGTH_SAMPLES {
            let p = self.value(t0 + (t1 - t0) * i as f64 / LENGTH_SAMPLES as f64);
            len += distance(prev, p);
            prev = p;
        }
        len
    }

    /// Parameter at arc length `s` from `t0`, moving towards `t1`.
    fn parameter_at_length(&self, t0: f64, t1: f64, s: f64) -> f64 {
        let (mut lo, mut hi) = (0.0f64, 1.0f64);
        for _ in 0..60 {
            let mid = 0.5 * (lo + hi);
            if self.length_between(t0, t0 + (t1 - t0) * mid) < s {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        t0 + (t1 - t0) * 0.5 * (lo + hi)
    }

    /// Whether the curve is a straight segment (chords have zero error).
    fn is_straight(&self) -> bool {
        false
    }
}

/// Straight line `origin + t * direction`, `direction` of unit length.
#[derive(Clone, Debug)]
pub struct Line {
    origin: Point3,
    direction: Point3,
}

impl Line {
    /// Line through `a` and `b`, parametrised by arc length from `a`.
    pub fn through(a: Point3, b: Point3) -> Option<(Self, f64)> {
        let len = distance(a, b);
        if len <= f64::EPSILON {
            return None;
        }
        let direction = scale(crate::geometry::sub(b, a), 1.0 / len);
        Some((Line { origin: a, direction }, len))
    }
}

impl Curve3d for Line {
    fn value(&self, t: f64) -> Point3 {
        add(self.origin, scale(self.direction, t))
    }
    fn length_between(&self, t0: f64, t1: f64) -> f64 {
        (t1 - t0).abs()
    }
    fn parameter_at_length(&self, t0: f64, t1: f64, s: f64) -> f64 {
        t0 + s * (t1 - t0).signum()
    }
    fn is_straight(&self) -> bool {
        true
    }
}

/// Circle of `radius` around `center` in the plane spanned by the orthonormal
/// `x_axis`/`y_axis`; `t` is the angle in radians.
#[derive(Clone, Debug)]
pub struct Circle {
    center: Point3,
    x_axis: Point3,
    y_axis: Point3,
    radius: f64,
}

impl Circle {
    pub fn new(center: Point3, x_axis: Point3, y_axis: Point3, radius: f64) -> Self {
        Circle {
            center,
            x_axis,
            y_axis,
            radius,
        }
    }

    pub fn full_range() -> (f64, f64) {
        (0.0, TAU)
    }
}

impl Curve3d for Circle {
    fn value(&self, t: f64) -> Point3 {
        let (s, c) = t.sin_cos();
        add(
            self.center,
            add(
                scale(self.x_axis, self.radius * c),
                scale(self.y_axis, self.radius * s),
            ),
        )
    }
    fn length_between(&self, t0: f64, t1: f64) -> f64 {
        self.radius * (t1 - t0).abs()
    }
    fn parameter_at_length(&self, t0: f64, t1: f64, s: f64) -> f64 {
        t0 + (s / self.radius) * (t1 - t0).signum()
    }
}

/// Parameters splitting `range` into `n` segments of equal arc length.
pub fn uniform_abscissa(curve: &dyn Curve3d, range: (f64, f64), n: usize) -> Vec<f64> {
    let (t0, t1) = range;
    let n = n.max(1);
    let total = curve.length_between(t0, t1);
    let mut params = Vec::with_capacity(n + 1);
    params.push(t0);
    for k in 1..n {
        params.push(curve.parameter_at_length(t0, t1, total * k as f64 / n as f64));
    }
    params.push(t1);
    params
}

/// Largest distance between the curve and the chord over `[ta, tb]`.
pub fn chord_error(curve: &dyn Curve3d, ta: f64, tb: f64) -> f64 {
    if curve.is_straight() {
        return 0.0;
    }
    let a = curve.value(ta);
    let b = curve.value(tb);
    (1..8)
        .map(|i| {
            let t = ta + (tb - ta) * i as f64 / 8.0;
            distance_to_segment(curve.value(t), a, b)
        })
        .fold(0.0, f64::max)
}

/// Equal-length discretization of `range`.
///
/// The segment count is `floor(A / length)` (at least 1, or 1 when the length
/// is disabled). With `deflection > 0` it is raised until every chord lies
/// within the tolerance, which is `deflection * A` when `relative` is set.
pub fn discretize(
    curve: &dyn Curve3d,
    range: (f64, f64),
    length: f64,
    deflection: f64,
    relative: bool,
) -> Vec<f64> {
    let total = curve.length_between(range.0, range.1);
    let mut n = if length > 0.0 {
        ((total / length).floor() as usize).clamp(1, MAX_SEGMENTS)
    } else {
        1
    };
    if deflection > 0.0 {
        let tol = if relative { deflection * total } else { deflection };
        loop {
            let params = uniform_abscissa(curve, range, n);
            let worst = params
                .windows(2)
                .map(|w| chord_error(curve, w[0], w[1]))
                .fold(0.0, f64::max);
            if worst <= tol || n >= MAX_SEGMENTS {
                return params;
            }
            n = (n + (n / 8).max(1)).min(MAX_SEGMENTS);
        }
    }
    uniform_abscissa(curve, range, n)
}
