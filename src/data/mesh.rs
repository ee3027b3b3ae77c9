//! Mesh results stored on discretizations.
//!
//! Node tags make shared nodes explicit: a node sitting on a CAD vertex is
//! tagged with the vertex cell, a node inside an edge with the edge
//! discretization and its position along it. Consumers merge nodes by tag,
//! never by coordinates.

use crate::cad::ShapeKind;
use crate::data::discretization::DiscretizationId;
use crate::geometry::{Point2, Point3};
use crate::topology::cell::CellId;

/// Identity of a mesh node across discretizations.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum NodeTag {
    /// The node is the mesh of a CAD vertex.
    Vertex(CellId),
    /// `index`-th node (in forward order) of an edge discretization.
    Edge { edge: DiscretizationId, index: u32 },
    /// Interior node owned by the mesh it appears in.
    Interior,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EdgeNode {
    pub param: f64,
    pub xyz: Point3,
    pub tag: NodeTag,
}

/// Polyline along an edge, in the edge's forward parametrisation.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct EdgeMesh {
    pub nodes: Vec<EdgeNode>,
    /// Set for edges without a 3D curve; their nodes all sit on one vertex.
    pub degenerate: bool,
}

impl EdgeMesh {
    pub fn segment_count(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }

    pub fn params(&self) -> Vec<f64> {
        self.nodes.iter().map(|n| n.param).collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceNode {
    pub xyz: Point3,
    pub uv: Point2,
    pub tag: NodeTag,
}

/// Triangulation of a face. Triangles are counter-clockwise in the
/// parameter plane, i.e. around the surface's natural normal.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct SurfaceMesh {
    pub nodes: Vec<SurfaceNode>,
    pub triangles: Vec<[usize; 3]>,
}

impl SurfaceMesh {
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Triangles as coordinate triples.
    pub fn triangle_points(&self) -> impl Iterator<Item = [Point3; 3]> + '_ {
        self.triangles
            .iter()
            .map(|t| [self.nodes[t[0]].xyz, self.nodes[t[1]].xyz, self.nodes[t[2]].xyz])
    }

    /// Nodes lying on edges or vertices.
    pub fn boundary_nodes(&self) -> impl Iterator<Item = &SurfaceNode> {
        self.nodes.iter().filter(|n| n.tag != NodeTag::Interior)
    }
}

/// Tetrahedral mesh of a solid.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct VolumeMesh {
    pub nodes: Vec<Point3>,
    pub tetrahedra: Vec<[usize; 4]>,
}

/// Closed triangulated boundary of a solid, nodes merged by tag, triangles
/// oriented outwards.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct BoundaryMesh {
    pub nodes: Vec<Point3>,
    pub triangles: Vec<[usize; 3]>,
}

/// Result of meshing one discretization.
#[derive(Clone, Debug, PartialEq)]
pub enum Mesh {
    Vertex(Point3),
    Edge(EdgeMesh),
    Face(SurfaceMesh),
    Solid(VolumeMesh),
}

impl Mesh {
    pub fn kind(&self) -> ShapeKind {
        match self {
            Mesh::Vertex(_) => ShapeKind::Vertex,
            Mesh::Edge(_) => ShapeKind::Edge,
            Mesh::Face(_) => ShapeKind::Face,
            Mesh::Solid(_) => ShapeKind::Solid,
        }
    }

    pub fn as_vertex(&self) -> Option<Point3> {
        match self {
            Mesh::Vertex(p) => Some(*p),
            _ => None,
        }
    }

    pub fn as_edge(&self) -> Option<&EdgeMesh> {
        match self {
            Mesh::Edge(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_face(&self) -> Option<&SurfaceMesh> {
        match self {
            Mesh::Face(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_solid(&self) -> Option<&VolumeMesh> {
        match self {
            Mesh::Solid(m) => Some(m),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors() {
        let m = Mesh::Edge(EdgeMesh {
            nodes: vec![
                EdgeNode {
                    param: 0.0,
                    xyz: [0.0; 3],
                    tag: NodeTag::Interior,
                };
                3
            ],
            degenerate: false,
        });
        assert_eq!(m.kind(), ShapeKind::Edge);
        assert_eq!(m.as_edge().unwrap().segment_count(), 2);
        assert!(m.as_face().is_none());
        assert_eq!(EdgeMesh::default().segment_count(), 0);
        assert_eq!(Mesh::Vertex([1.0, 2.0, 3.0]).as_vertex(), Some([1.0, 2.0, 3.0]));
    }
}
