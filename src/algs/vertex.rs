//! 0D meshing: a vertex is its own mesh.

use super::{AlgoContext, MeshAlgorithm};
use crate::data::discretization::Discretization;
use crate::data::mesh::Mesh;
use crate::mesh_error::BoraError;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Vertex0d;

impl MeshAlgorithm for Vertex0d {
    fn name(&self) -> &'static str {
        "Vertex0d"
    }

    fn compute(&self, ctx: &AlgoContext<'_>, disc: &Discretization) -> Result<Mesh, BoraError> {
        let cell = ctx.graph.get_by_id(disc.cell())?;
        let p = cell.shape().point().ok_or_else(|| {
            BoraError::Geometry(format!("vertex {} has no point", disc.cell()))
        })?;
        Ok(Mesh::Vertex(p))
    }
}
