//! Meshing algorithms, one per (cell kind, element) pair.
//!
//! | cell kind | element | algorithm |
//! |---|---|---|
//! | VERTEX | V1 | [`Vertex0d`] |
//! | EDGE | E2 | [`UniformLengthDeflection1d`] |
//! | FACE | T3 | [`Basic2d`] |
//! | SOLID | T4 | [`TetGen`] or [`Netgen`] |
//!
//! Every other pair (notably FACE + Q4) has no algorithm.

pub mod edge;
pub mod external;
pub mod face;
pub mod triangulation;
pub mod vertex;
pub mod volume;

pub use edge::UniformLengthDeflection1d;
pub use external::{CancelToken, Tool, ToolOutcome, ToolRegistry, ToolRun, run_tool};
pub use face::Basic2d;
pub use triangulation::Triangulation;
pub use vertex::Vertex0d;
pub use volume::{Netgen, TetGen};

use crate::cad::ShapeKind;
use crate::config::{MesherConfig, VolumeMesher};
use crate::data::discretization::Discretization;
use crate::data::hypothesis::ElementKind;
use crate::data::mesh::Mesh;
use crate::io::MeshStore;
use crate::mesh_error::BoraError;
use crate::topology::graph::TopologyGraph;
use crate::topology::orientation::Orientation;
use std::fmt;

/// Everything an algorithm may read while meshing one discretization.
pub struct AlgoContext<'a> {
    pub graph: &'a TopologyGraph,
    pub config: &'a MesherConfig,
    pub tools: &'a ToolRegistry,
    pub store: &'a dyn MeshStore,
    pub cancel: &'a CancelToken,
}

/// Common contract of the meshing algorithms.
pub trait MeshAlgorithm {
    fn name(&self) -> &'static str;

    /// Whether the algorithm can run (external tools present).
    fn is_available(&self, _tools: &ToolRegistry) -> bool {
        true
    }

    /// Orientation in which the produced mesh relates to the cell.
    fn orientation(&self, o: Orientation) -> Orientation {
        o
    }

    /// Mesh `disc`. Boundary discretizations for `disc.first_submesh()` must
    /// already be meshed.
    fn compute(&self, ctx: &AlgoContext<'_>, disc: &Discretization) -> Result<Mesh, BoraError>;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Algorithm {
    Vertex0d(Vertex0d),
    UniformLengthDeflection1d(UniformLengthDeflection1d),
    Basic2d(Basic2d),
    TetGen(TetGen),
    Netgen(Netgen),
}

impl Algorithm {
    /// Algorithm for `element` on a cell of `kind`, or `None`.
    pub fn select(kind: ShapeKind, element: ElementKind, config: &MesherConfig) -> Option<Self> {
        match (kind, element) {
            (ShapeKind::Vertex, ElementKind::V1) => Some(Algorithm::Vertex0d(Vertex0d)),
            (ShapeKind::Edge, ElementKind::E2) => {
                Some(Algorithm::UniformLengthDeflection1d(UniformLengthDeflection1d))
            }
            (ShapeKind::Face, ElementKind::T3) => Some(Algorithm::Basic2d(Basic2d)),
            (ShapeKind::Solid, ElementKind::T4) => Some(match config.volume_mesher {
                VolumeMesher::TetGen => Algorithm::TetGen(TetGen),
                VolumeMesher::Netgen => Algorithm::Netgen(Netgen),
            }),
            _ => None,
        }
    }

    fn inner(&self) -> &dyn MeshAlgorithm {
        match self {
            Algorithm::Vertex0d(a) => a,
            Algorithm::UniformLengthDeflection1d(a) => a,
            Algorithm::Basic2d(a) => a,
            Algorithm::TetGen(a) => a,
            Algorithm::Netgen(a) => a,
        }
    }
}

impl MeshAlgorithm for Algorithm {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn is_available(&self, tools: &ToolRegistry) -> bool {
        self.inner().is_available(tools)
    }

    fn orientation(&self, o: Orientation) -> Orientation {
        self.inner().orientation(o)
    }

    fn compute(&self, ctx: &AlgoContext<'_>, disc: &Discretization) -> Result<Mesh, BoraError> {
        self.inner().compute(ctx, disc)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_table() {
        let c = MesherConfig::default();
        let pick = |k, e| Algorithm::select(k, e, &c).map(|a| a.name());
        assert_eq!(pick(ShapeKind::Vertex, ElementKind::V1), Some("Vertex0d"));
        assert_eq!(
            pick(ShapeKind::Edge, ElementKind::E2),
            Some("UniformLengthDeflection1d")
        );
        assert_eq!(pick(ShapeKind::Face, ElementKind::T3), Some("Basic2d"));
        assert_eq!(pick(ShapeKind::Face, ElementKind::Q4), None);
        assert_eq!(pick(ShapeKind::Solid, ElementKind::T4), Some("TetGen"));
        assert_eq!(pick(ShapeKind::Edge, ElementKind::T3), None);
        let netgen = MesherConfig {
            volume_mesher: VolumeMesher::Netgen,
            ..Default::default()
        };
        assert_eq!(
            Algorithm::select(ShapeKind::Solid, ElementKind::T4, &netgen),
            Some(Algorithm::Netgen(Netgen))
        );
    }

    #[test]
    fn orientation_is_identity() {
        let a = Algorithm::Basic2d(Basic2d);
        assert_eq!(a.orientation(Orientation::Reversed), Orientation::Reversed);
        assert!(a.is_available(&ToolRegistry::new(&MesherConfig::default())));
    }
}
