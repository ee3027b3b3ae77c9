//! Shape handles of the built-in B-rep kernel.
//!
//! A [`Shape`] is a cheap handle: a shared topological payload plus the
//! orientation of this particular use. Two handles are *the same* shape when
//! they share the payload, whatever their orientations; this is the identity
//! the topology graph deduplicates on.

use super::curve::Curve3d;
use super::surface::Surface;
use crate::geometry::Point3;
use crate::topology::orientation::Orientation;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shape types, ordered from the top of the hierarchy to the bottom.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ShapeKind {
    Compound,
    CompSolid,
    Solid,
    Shell,
    Face,
    Wire,
    Edge,
    Vertex,
}

impl ShapeKind {
    /// All kinds, top-down; the order in which the topology graph numbers cells.
    pub const TOP_DOWN: [ShapeKind; 8] = [
        ShapeKind::Compound,
        ShapeKind::CompSolid,
        ShapeKind::Solid,
        ShapeKind::Shell,
        ShapeKind::Face,
        ShapeKind::Wire,
        ShapeKind::Edge,
        ShapeKind::Vertex,
    ];

    /// Kinds that carry discretizations, in meshing order.
    pub const MESHED_BOTTOM_UP: [ShapeKind; 4] = [
        ShapeKind::Vertex,
        ShapeKind::Edge,
        ShapeKind::Face,
        ShapeKind::Solid,
    ];

    /// Topological dimension of meshable kinds.
    pub fn dimension(self) -> Option<u8> {
        match self {
            ShapeKind::Vertex => Some(0),
            ShapeKind::Edge => Some(1),
            ShapeKind::Face => Some(2),
            ShapeKind::Solid => Some(3),
            _ => None,
        }
    }

    pub fn is_meshed(self) -> bool {
        self.dimension().is_some()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ShapeKind::Compound => "COMPOUND",
            ShapeKind::CompSolid => "COMPSOLID",
            ShapeKind::Solid => "SOLID",
            ShapeKind::Shell => "SHELL",
            ShapeKind::Face => "FACE",
            ShapeKind::Wire => "WIRE",
            ShapeKind::Edge => "EDGE",
            ShapeKind::Vertex => "VERTEX",
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable identity of a topological payload.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ShapeKey(u64);

impl ShapeKey {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ShapeKey(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// Parametrised edge support: an optional 3D curve on `[first, last]`.
#[derive(Clone, Debug)]
pub struct EdgeGeometry {
    pub curve: Option<Arc<dyn Curve3d>>,
    pub range: (f64, f64),
    pub degenerate: bool,
}

#[derive(Clone, Debug)]
pub(crate) enum Geometry {
    None,
    Point(Point3),
    Edge(EdgeGeometry),
    Surface(Arc<dyn Surface>),
}

#[derive(Debug)]
struct TShape {
    key: ShapeKey,
    kind: ShapeKind,
    children: Vec<Shape>,
    geometry: Geometry,
}

/// An oriented use of a topological payload.
#[derive(Clone)]
pub struct Shape {
    tshape: Arc<TShape>,
    orientation: Orientation,
}

impl Shape {
    pub(crate) fn new(kind: ShapeKind, children: Vec<Shape>, geometry: Geometry) -> Self {
        Shape {
            tshape: Arc::new(TShape {
                key: ShapeKey::next(),
                kind,
                children,
                geometry,
            }),
            orientation: Orientation::Forward,
        }
    }

    #[inline]
    pub fn kind(&self) -> ShapeKind {
        self.tshape.kind
    }

    #[inline]
    pub fn key(&self) -> ShapeKey {
        self.tshape.key
    }

    #[inline]
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Same payload, orientation ignored.
    #[inline]
    pub fn is_same(&self, other: &Shape) -> bool {
        Arc::ptr_eq(&self.tshape, &other.tshape)
    }

    /// Same payload and same orientation.
    #[inline]
    pub fn is_equal(&self, other: &Shape) -> bool {
        self.is_same(other) && self.orientation == other.orientation
    }

    pub fn reversed(&self) -> Shape {
        self.oriented(self.orientation.reversed())
    }

    pub fn oriented(&self, orientation: Orientation) -> Shape {
        Shape {
            tshape: Arc::clone(&self.tshape),
            orientation,
        }
    }

    /// Direct sub-shapes, with orientation composed with this use.
    pub fn children(&self) -> impl Iterator<Item = Shape> + '_ {
        self.tshape
            .children
            .iter()
            .map(move |c| c.oriented(self.orientation.then(c.orientation)))
    }

    pub fn num_children(&self) -> usize {
        self.tshape.children.len()
    }

    /// Point of a vertex.
    pub fn point(&self) -> Option<Point3> {
        match &self.tshape.geometry {
            Geometry::Point(p) => Some(*p),
            _ => None,
        }
    }

    /// Curve support of an edge.
    pub fn edge_geometry(&self) -> Option<&EdgeGeometry> {
        match &self.tshape.geometry {
            Geometry::Edge(g) => Some(g),
            _ => None,
        }
    }

    /// Surface support of a face.
    pub fn surface(&self) -> Option<&Arc<dyn Surface>> {
        match &self.tshape.geometry {
            Geometry::Surface(s) => Some(s),
            _ => None,
        }
    }

    /// First and last vertex of an edge, in the edge's forward parametrisation.
    pub fn edge_vertices(&self) -> Option<(Shape, Shape)> {
        if self.kind() != ShapeKind::Edge || self.tshape.children.len() != 2 {
            return None;
        }
        let c = &self.tshape.children;
        Some((c[0].clone(), c[1].clone()))
    }

    /// An edge whose two vertices are the same shape.
    pub fn is_closed_edge(&self) -> bool {
        self.edge_vertices()
            .map(|(a, b)| a.is_same(&b))
            .unwrap_or(false)
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}#{}{}",
            self.kind(),
            self.key().get(),
            self.orientation
        )
    }
}
