//! Parametric surfaces carried by faces.

use crate::geometry::{Point2, Point3, add, cross, dot, normalize, scale, sub};
use std::fmt::Debug;

/// Parametric surface `S(u, v)`.
pub trait Surface: Send + Sync + Debug {
    /// Point at `(u, v)`.
    fn value(&self, uv: Point2) -> Point3;

    /// Parameters of the orthogonal projection of `p`.
    fn parameters(&self, p: Point3) -> Point2;

    /// First fundamental form `[[E, F], [F, G]]` at `(u, v)`.
    fn metric(&self, uv: Point2) -> [[f64; 2]; 2] {
        let h = 1e-6;
        let p = self.value(uv);
        let su = scale(sub(self.value([uv[0] + h, uv[1]]), p), 1.0 / h);
        let sv = scale(sub(self.value([uv[0], uv[1] + h]), p), 1.0 / h);
        [[dot(su, su), dot(su, sv)], [dot(su, sv), dot(sv, sv)]]
    }

    /// Unit normal `Su x Sv` at `(u, v)`.
    fn normal(&self, uv: Point2) -> Point3;

    /// Closest point on the surface.
    fn project(&self, p: Point3) -> Point3 {
        self.value(self.parameters(p))
    }
}

/// Plane through `origin` spanned by the orthonormal `u_axis`, `v_axis`.
#[derive(Clone, Debug)]
pub struct Plane {
    origin: Point3,
    u_axis: Point3,
    v_axis: Point3,
}

impl Plane {
    /// Plane from an origin and two (not necessarily orthonormal) directions;
    /// `v_dir` is orthogonalised against `u_dir`. `None` if they are parallel.
    pub fn new(origin: Point3, u_dir: Point3, v_dir: Point3) -> Option<Self> {
        let u_axis = normalize(u_dir)?;
        let v_axis = normalize(sub(v_dir, scale(u_axis, dot(v_dir, u_axis))))?;
        Some(Plane {
            origin,
            u_axis,
            v_axis,
        })
    }

    pub fn origin(&self) -> Point3 {
        self.origin
    }
}

impl Surface for Plane {
    fn value(&self, uv: Point2) -> Point3 {
        add(
            self.origin,
            add(scale(self.u_axis, uv[0]), scale(self.v_axis, uv[1])),
        )
    }

    fn parameters(&self, p: Point3) -> Point2 {
        let d = sub(p, self.origin);
        [dot(d, self.u_axis), dot(d, self.v_axis)]
    }

    fn metric(&self, _uv: Point2) -> [[f64; 2]; 2] {
        [[1.0, 0.0], [0.0, 1.0]]
    }

    fn normal(&self, _uv: Point2) -> Point3 {
        cross(self.u_axis, self.v_axis)
    }
}
