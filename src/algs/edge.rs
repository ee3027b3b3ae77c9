//! 1D meshing: equal-length segments, refined until the deflection holds.

use super::{AlgoContext, MeshAlgorithm};
use crate::cad::curve::{discretize, uniform_abscissa};
use crate::cad::{Shape, ShapeKind};
use crate::data::discretization::Discretization;
use crate::data::mesh::{EdgeMesh, EdgeNode, Mesh, NodeTag};
use crate::geometry::{Point3, distance2, lerp};
use crate::mesh_error::BoraError;
use crate::topology::cell::CellId;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct UniformLengthDeflection1d;

/// Keep only parameters that move strictly away from the first one.
fn monotonic(params: Vec<f64>) -> Vec<f64> {
    let increasing = match (params.first(), params.last()) {
        (Some(a), Some(b)) => a <= b,
        _ => true,
    };
    let mut out: Vec<f64> = Vec::with_capacity(params.len());
    for t in params {
        match out.last() {
            Some(&prev) if (increasing && t <= prev) || (!increasing && t >= prev) => {
                log::debug!("dropping non-monotonic parameter {t} after {prev}");
            }
            _ => out.push(t),
        }
    }
    out
}

impl UniformLengthDeflection1d {
    fn end_vertex(
        ctx: &AlgoContext<'_>,
        edge: CellId,
        vertex: &Shape,
        disc: &Discretization,
    ) -> Result<(CellId, Point3), BoraError> {
        let id = ctx.graph.cell_of(vertex).ok_or_else(|| {
            BoraError::Geometry(format!("vertex {vertex:?} of edge {edge} is not in the model"))
        })?;
        let p = ctx
            .graph
            .get_discretization_submesh(id, disc.first_submesh())
            .and_then(Discretization::mesh)
            .and_then(Mesh::as_vertex)
            .ok_or(BoraError::IncompleteBoundary {
                cell: edge,
                boundary: id,
            })?;
        Ok((id, p))
    }
}

impl MeshAlgorithm for UniformLengthDeflection1d {
    fn name(&self) -> &'static str {
        "UniformLengthDeflection1d"
    }

    fn compute(&self, ctx: &AlgoContext<'_>, disc: &Discretization) -> Result<Mesh, BoraError> {
        let edge = disc.cell();
        let cell = ctx.graph.get_by_id(edge)?;
        if cell.kind() != ShapeKind::Edge {
            return Err(BoraError::InvariantViolation(format!(
                "edge algorithm applied to {} {edge}",
                cell.kind()
            )));
        }
        let shape = cell.shape();
        let geometry = shape
            .edge_geometry()
            .ok_or_else(|| BoraError::Geometry(format!("edge {edge} has no geometry")))?;
        let (first, last) = shape
            .edge_vertices()
            .ok_or_else(|| BoraError::Geometry(format!("edge {edge} has no vertices")))?;
        let (v0, p0) = Self::end_vertex(ctx, edge, &first, disc)?;
        let (v1, p1) = Self::end_vertex(ctx, edge, &last, disc)?;
        let hyp = disc.hypothesis();
        let length = hyp.length();
        let deflection = hyp.deflection();
        let range = geometry.range;

        let (params, degenerate) = match &geometry.curve {
            None if geometry.degenerate => (vec![range.0, range.1], true),
            None => {
                return Err(BoraError::Geometry(format!(
                    "edge {edge} has no 3D curve and is not degenerate"
                )));
            }
            Some(curve) => {
                let closed = v0 == v1;
                let mut params = discretize(
                    curve.as_ref(),
                    range,
                    length,
                    deflection,
                    hyp.is_relative_deflection(),
                );
                if params.len() <= 2 && !closed {
                    let mid = curve.value(0.5 * (range.0 + range.1));
                    let d1 = distance2(mid, lerp(p0, p1, 0.5));
                    let d2 = distance2(p0, p1);
                    if d1 > 0.01 * d2 && (deflection <= 0.0 || d1 > 1e-6 * length * length) {
                        params = uniform_abscissa(curve.as_ref(), range, 2);
                    }
                } else if params.len() <= 3 && closed {
                    params = uniform_abscissa(curve.as_ref(), range, 3);
                }
                (monotonic(params), false)
            }
        };

        let n = params.len();
        let nodes = params
            .iter()
            .enumerate()
            .map(|(i, &param)| {
                let (xyz, tag) = if i == 0 {
                    (p0, NodeTag::Vertex(v0))
                } else if i + 1 == n {
                    (p1, NodeTag::Vertex(v1))
                } else if degenerate {
                    (p0, NodeTag::Vertex(v0))
                } else {
                    let xyz = geometry.curve.as_ref().map_or(p0, |c| c.value(param));
                    let index = u32::try_from(i).map_err(|_| {
                        BoraError::Geometry(format!("edge {edge} has too many nodes"))
                    })?;
                    (
                        xyz,
                        NodeTag::Edge {
                            edge: disc.id(),
                            index,
                        },
                    )
                };
                Ok(EdgeNode { param, xyz, tag })
            })
            .collect::<Result<Vec<_>, BoraError>>()?;
        let mesh = EdgeMesh { nodes, degenerate };
        log::debug!(
            "edge {edge}: {} segments{}",
            mesh.segment_count(),
            if degenerate { " (degenerate)" } else { "" }
        );
        ctx.store.write_edge(disc, &mesh)?;
        Ok(Mesh::Edge(mesh))
    }
}
