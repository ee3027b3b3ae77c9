//! Small fixed-size vector helpers shared by the CAD kernel and the meshers.
//!
//! Points and vectors are plain `[f64; 3]` / `[f64; 2]` arrays; everything here
//! is `#[inline]` arithmetic without allocation.

pub mod quality;

/// A point or vector in model space.
pub type Point3 = [f64; 3];
/// A point in a surface parameter plane.
pub type Point2 = [f64; 2];

#[inline]
pub fn add(a: Point3, b: Point3) -> Point3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

#[inline]
pub fn sub(a: Point3, b: Point3) -> Point3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
pub fn scale(a: Point3, s: f64) -> Point3 {
    [a[0] * s, a[1] * s, a[2] * s]
}

#[inline]
pub fn dot(a: Point3, b: Point3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
pub fn cross(a: Point3, b: Point3) -> Point3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[inline]
pub fn norm(a: Point3) -> f64 {
    dot(a, a).sqrt()
}

#[inline]
pub fn distance(a: Point3, b: Point3) -> f64 {
    norm(sub(a, b))
}

#[inline]
pub fn distance2(a: Point3, b: Point3) -> f64 {
    let d = sub(a, b);
    dot(d, d)
}

/// Linear interpolation `a + t (b - a)`.
#[inline]
pub fn lerp(a: Point3, b: Point3, t: f64) -> Point3 {
    add(a, scale(sub(b, a), t))
}

/// Unit vector along `a`, or `None` for a (near) zero vector.
pub fn normalize(a: Point3) -> Option<Point3> {
    let n = norm(a);
    (n > f64::EPSILON).then(|| scale(a, 1.0 / n))
}

/// Distance from `p` to the infinite line through `a` and `b`.
pub fn distance_to_line(p: Point3, a: Point3, b: Point3) -> f64 {
    let ab = sub(b, a);
    let len = norm(ab);
    if len <= f64::EPSILON {
        return distance(p, a);
    }
    norm(cross(ab, sub(p, a))) / len
}

/// Distance from `p` to the segment `[a, b]`.
pub fn distance_to_segment(p: Point3, a: Point3, b: Point3) -> f64 {
    let ab = sub(b, a);
    let len2 = dot(ab, ab);
    if len2 <= f64::EPSILON * f64::EPSILON {
        return distance(p, a);
    }
    let t = (dot(sub(p, a), ab) / len2).clamp(0.0, 1.0);
    distance(p, lerp(a, b, t))
}

#[inline]
pub fn distance2d(a: Point2, b: Point2) -> f64 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn basic_ops() {
        let a = [1.0, 0.0, 0.0];
        let b = [0.0, 1.0, 0.0];
        assert_eq!(cross(a, b), [0.0, 0.0, 1.0]);
        assert_eq!(dot(a, b), 0.0);
        assert_relative_eq!(distance(a, b), 2f64.sqrt());
        assert_eq!(lerp(a, b, 0.5), [0.5, 0.5, 0.0]);
        assert!(normalize([0.0; 3]).is_none());
    }

    #[test]
    fn line_distance() {
        let d = distance_to_line([0.5, 1.0, 0.0], [0.0; 3], [1.0, 0.0, 0.0]);
        assert_relative_eq!(d, 1.0);
        assert_relative_eq!(distance_to_line([2.0, 0.0, 0.0], [0.0; 3], [0.0; 3]), 2.0);
        assert_relative_eq!(
            distance_to_segment([2.0, 1.0, 0.0], [0.0; 3], [1.0, 0.0, 0.0]),
            2f64.sqrt()
        );
    }
}
