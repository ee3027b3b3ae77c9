//! Element quality metrics for generated triangles and tetrahedra.
//!
//! # Vertex ordering
//! - **Triangle**: `[v0, v1, v2]`, counter-clockwise when seen from the side of
//!   the reference normal passed to [`triangle_quality`].
//! - **Tetrahedron**: `[v0, v1, v2, v3]`; the signed volume is positive when
//!   `v3` lies on the side of `(v1 - v0) x (v2 - v0)`.

use super::{Point3, cross, dot, norm, sub};
use crate::mesh_error::BoraError;
use std::f64::consts::PI;

const EPS: f64 = 1e-14;

/// Basic quality metrics for a single element.
#[derive(Clone, Copy, Debug)]
pub struct ElementQuality {
    /// Ratio of the longest edge length to the shortest edge length.
    pub aspect_ratio: f64,
    /// Minimum corner angle (degrees) across all faces.
    pub min_angle_deg: f64,
    /// Signed area (triangle, along the reference normal) or signed volume
    /// (tetrahedron). Zero indicates degenerate geometry.
    pub signed_measure: f64,
}

const TRI_EDGES: [(usize, usize); 3] = [(0, 1), (1, 2), (2, 0)];
const TET_EDGES: [(usize, usize); 6] = [(0, 1), (1, 2), (2, 0), (0, 3), (1, 3), (2, 3)];
const TET_FACES: [[usize; 3]; 4] = [[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]];

/// Quality of a triangle; the sign of the area follows `reference_normal`.
pub fn triangle_quality(vertices: [Point3; 3], reference_normal: Point3) -> ElementQuality {
    let n = cross(sub(vertices[1], vertices[0]), sub(vertices[2], vertices[0]));
    ElementQuality {
        aspect_ratio: aspect_ratio(&vertices, &TRI_EDGES),
        min_angle_deg: face_min_angle(&vertices, &[0, 1, 2]),
        signed_measure: 0.5 * norm(n) * dot(n, reference_normal).signum(),
    }
}

/// Quality of a tetrahedron.
pub fn tetrahedron_quality(vertices: [Point3; 4]) -> ElementQuality {
    let min_angle_deg = TET_FACES
        .iter()
        .map(|f| face_min_angle(&vertices, f))
        .fold(f64::INFINITY, f64::min);
    ElementQuality {
        aspect_ratio: aspect_ratio(&vertices, &TET_EDGES),
        min_angle_deg,
        signed_measure: signed_volume(vertices),
    }
}

/// Signed volume of a tetrahedron.
pub fn signed_volume(v: [Point3; 4]) -> f64 {
    let ab = sub(v[1], v[0]);
    let ac = sub(v[2], v[0]);
    let ad = sub(v[3], v[0]);
    dot(ab, cross(ac, ad)) / 6.0
}

/// Reject degenerate elements (zero measure, zero-length edge).
pub fn validate_element(quality: &ElementQuality) -> Result<(), BoraError> {
    if !quality.signed_measure.is_finite() || quality.signed_measure.abs() <= EPS {
        return Err(BoraError::Geometry(format!(
            "degenerate element: measure = {}",
            quality.signed_measure
        )));
    }
    if !quality.aspect_ratio.is_finite() {
        return Err(BoraError::Geometry("zero-length edge detected".into()));
    }
    Ok(())
}

fn aspect_ratio(vertices: &[Point3], edges: &[(usize, usize)]) -> f64 {
    let mut min_len = f64::INFINITY;
    let mut max_len = 0.0f64;
    for &(a, b) in edges {
        let len = norm(sub(vertices[a], vertices[b]));
        min_len = min_len.min(len);
        max_len = max_len.max(len);
    }
    if min_len <= EPS {
        f64::INFINITY
    } else {
        max_len / min_len
    }
}

fn face_min_angle(vertices: &[Point3], face: &[usize]) -> f64 {
    let n = face.len();
    let mut min_angle = f64::INFINITY;
    for i in 0..n {
        let prev = vertices[face[(i + n - 1) % n]];
        let curr = vertices[face[i]];
        let next = vertices[face[(i + 1) % n]];
        min_angle = min_angle.min(angle_deg(sub(prev, curr), sub(next, curr)));
    }
    min_angle
}

fn angle_deg(a: Point3, b: Point3) -> f64 {
    let denom = norm(a) * norm(b);
    if denom <= EPS {
        return 0.0;
    }
    let cos = (dot(a, b) / denom).clamp(-1.0, 1.0);
    cos.acos() * 180.0 / PI
}
