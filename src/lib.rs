#![cfg_attr(docsrs, feature(doc_cfg))]
//! # bora-mesh
//!
//! bora-mesh discretizes boundary-representation CAD models into finite
//! element meshes under user-supplied sizing policies. Several independent
//! meshing domains (submeshes) share one topology graph and one cache of
//! discretizations, so a face shared by two submeshes that agree on its
//! hypothesis is meshed once.
//!
//! ## Pipeline
//! 1. [`model::Model::new`] builds the deduplicated [`topology::TopologyGraph`]
//!    of a [`cad::Shape`].
//! 2. Constraints (a [`data::Hypothesis`] on a cell) are added to submeshes.
//! 3. [`model::Model::compute_constraints`] derives the effective hypothesis
//!    of every reachable vertex, edge, face and solid, and groups submeshes
//!    by hypothesis into [`data::Discretization`]s.
//! 4. [`model::Model::compute`] meshes the discretizations bottom-up:
//!    vertices, edges (uniform length and deflection), faces (constrained
//!    Delaunay insertion) and solids (TetGen or Netgen subprocesses).
//!
//! ## Features
//! - `rayon`: mesh the units of one level in parallel when
//!   [`config::MesherConfig::parallel`] is set.
//! - `check-invariants`: validate the topology graph after construction in
//!   release builds too.
//!
//! ## Logging
//! The crate logs through the `log` facade and installs no logger.

pub mod algs;
pub mod cad;
pub mod config;
pub mod data;
pub mod debug_invariants;
pub mod geometry;
pub mod io;
pub mod mesh_error;
pub mod model;
pub mod topology;

pub use debug_invariants::DebugInvariants;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::{Algorithm, CancelToken, MeshAlgorithm, ToolRegistry};
    pub use crate::cad::{
        BoxBuilder, Shape, ShapeExplorer, ShapeKind, make_box, make_compound, make_glued_boxes,
        make_polygon_face,
    };
    pub use crate::config::{MesherConfig, VolumeMesher};
    pub use crate::data::{
        Constraint, Discretization, DiscretizationId, DiscretizationState, ElementKind,
        Hypothesis, Mesh, NodeTag, SubmeshId,
    };
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::io::{DirectoryStore, MemoryStore, MeshStore};
    pub use crate::mesh_error::BoraError;
    pub use crate::model::{ComputeReport, Model};
    pub use crate::topology::{CellId, InvalidateCache, Orientation, TopologyGraph};
}
