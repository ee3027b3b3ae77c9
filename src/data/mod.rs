//! Constraint model and mesh results.
//!
//! - [`hypothesis`]: element kind and sizing criteria
//! - [`constraint`]: a hypothesis bound to a cell
//! - [`submesh`]: an independent set of constraints
//! - [`discretization`]: compute-once meshing units shared across submeshes
//! - [`mesh`]: vertex, edge, face and solid mesh payloads

pub mod constraint;
pub mod discretization;
pub mod hypothesis;
pub mod mesh;
pub mod submesh;

pub use constraint::Constraint;
pub use discretization::{Discretization, DiscretizationId, DiscretizationState};
pub use hypothesis::{ElementKind, Hypothesis};
pub use mesh::{
    BoundaryMesh, EdgeMesh, EdgeNode, Mesh, NodeTag, SurfaceMesh, SurfaceNode, VolumeMesh,
};
pub use submesh::{Submesh, SubmeshId};
