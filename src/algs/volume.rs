//! 3D meshing by external tetrahedral meshers.
//!
//! The solid's closed boundary is read back from the store, written in the
//! tool's input format into a scratch directory unique to the task, and the
//! tool's output is parsed into a [`VolumeMesh`].
//!
//! - TetGen: `tetgen -a<vol>pYNEFg solid.poly`, output `solid.1.mesh`
//!   (Medit). The volume bound is that of a regular tetrahedron of edge `L`.
//! - Netgen: `netgen -batchmode -geofile=solid.stl -meshfile=solid.vol
//!   -maxh=<L>`, output Netgen `.vol`.

use super::external::{Tool, ToolOutcome, run_tool};
use super::{AlgoContext, MeshAlgorithm};
use crate::data::discretization::Discretization;
use crate::data::mesh::{BoundaryMesh, Mesh, VolumeMesh};
use crate::geometry::quality::tetrahedron_quality;
use crate::io::{MeditReader, NetgenVolReader, PolyWriter, StlWriter, SurfaceWriter, VolumeMeshReader};
use crate::mesh_error::BoraError;
use crate::topology::cell::CellId;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tempfile::TempDir;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TetGen;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Netgen;

/// Volume of a regular tetrahedron with edge `length`.
pub fn tetgen_volume_bound(length: f64) -> f64 {
    length.powi(3) / (6.0 * std::f64::consts::SQRT_2)
}

fn hand_off(tool: Tool, e: impl std::fmt::Display) -> BoraError {
    BoraError::ExternalTool {
        tool: tool.name().into(),
        reason: format!("file hand-off failed: {e}"),
    }
}

fn scratch_dir(ctx: &AlgoContext<'_>, tool: Tool, solid: CellId) -> Result<TempDir, BoraError> {
    let mut builder = tempfile::Builder::new();
    let prefix = format!("bora-{}-{solid}-", tool.name());
    builder.prefix(&prefix);
    match &ctx.config.temp_root {
        Some(root) => builder.tempdir_in(root),
        None => builder.tempdir(),
    }
    .map_err(|e| hand_off(tool, e))
}

fn write_input<W: SurfaceWriter>(
    tool: Tool,
    writer: &W,
    boundary: &BoundaryMesh,
    path: &Path,
) -> Result<(), BoraError> {
    let file = File::create(path).map_err(|e| hand_off(tool, e))?;
    writer
        .write(boundary, BufWriter::new(file))
        .map_err(|e| hand_off(tool, e))
}

fn read_output<R: VolumeMeshReader>(tool: Tool, reader: &R, path: &Path) -> Result<VolumeMesh, BoraError> {
    let file = File::open(path).map_err(|e| hand_off(tool, e))?;
    reader.read(BufReader::new(file))
}

/// Shared driver: boundary read-back, scratch directory, tool run, outcome
/// mapping, parse, persistence.
#[allow(clippy::too_many_arguments)]
fn run_volume_mesher<W, R>(
    ctx: &AlgoContext<'_>,
    disc: &Discretization,
    tool: Tool,
    writer: &W,
    input: &str,
    args: Vec<String>,
    reader: &R,
    output: &str,
) -> Result<Mesh, BoraError>
where
    W: SurfaceWriter,
    R: VolumeMeshReader,
{
    let solid = disc.cell();
    let boundary = ctx.store.read_all_faces(ctx.graph, solid, disc.first_submesh())?;
    if boundary.triangles.is_empty() {
        return Err(BoraError::ExternalTool {
            tool: tool.name().into(),
            reason: format!("solid {solid} has an empty boundary"),
        });
    }
    let dir = scratch_dir(ctx, tool, solid)?;
    write_input(tool, writer, &boundary, &dir.path().join(input))?;
    log::debug!(
        "solid {solid}: {} boundary triangles handed to {} in {}",
        boundary.triangles.len(),
        tool.name(),
        dir.path().display()
    );

    let run = run_tool(
        ctx.tools.path(tool),
        &args,
        Some(dir.path()),
        ctx.config.timeout(),
        ctx.cancel,
    );
    match run.outcome {
        ToolOutcome::Success => {}
        ToolOutcome::Cancelled => return Err(BoraError::Cancelled { cell: solid }),
        ToolOutcome::NotFound => {
            return Err(BoraError::AlgorithmUnavailable {
                cell: solid,
                reason: format!("{} {}", tool.name(), run.reason()),
            });
        }
        _ => {
            return Err(BoraError::ExternalTool {
                tool: tool.name().into(),
                reason: run.reason(),
            });
        }
    }
    let mesh = read_output(tool, reader, &dir.path().join(output))?;
    if mesh.tetrahedra.is_empty() {
        return Err(BoraError::ExternalTool {
            tool: tool.name().into(),
            reason: format!("no tetrahedra in {output}"),
        });
    }
    let worst = mesh
        .tetrahedra
        .iter()
        .map(|t| tetrahedron_quality(t.map(|i| mesh.nodes[i])).aspect_ratio)
        .fold(0.0, f64::max);
    log::debug!(
        "solid {solid}: {} nodes, {} tetrahedra, worst aspect ratio {worst:.3}",
        mesh.nodes.len(),
        mesh.tetrahedra.len()
    );
    ctx.store.write_solid(disc, &mesh)?;
    Ok(Mesh::Solid(mesh))
}

impl MeshAlgorithm for TetGen {
    fn name(&self) -> &'static str {
        "TetGen"
    }

    fn is_available(&self, tools: &super::ToolRegistry) -> bool {
        tools.is_available(Tool::TetGen)
    }

    fn compute(&self, ctx: &AlgoContext<'_>, disc: &Discretization) -> Result<Mesh, BoraError> {
        let hyp = disc.hypothesis();
        let mut switches = String::from("-");
        if hyp.has_length() {
            switches.push_str(&format!("a{}", tetgen_volume_bound(hyp.length())));
        }
        switches.push_str("pYNEFg");
        run_volume_mesher(
            ctx,
            disc,
            Tool::TetGen,
            &PolyWriter,
            "solid.poly",
            vec![switches, "solid.poly".into()],
            &MeditReader,
            "solid.1.mesh",
        )
    }
}

impl MeshAlgorithm for Netgen {
    fn name(&self) -> &'static str {
        "Netgen"
    }

    fn is_available(&self, tools: &super::ToolRegistry) -> bool {
        tools.is_available(Tool::Netgen)
    }

    fn compute(&self, ctx: &AlgoContext<'_>, disc: &Discretization) -> Result<Mesh, BoraError> {
        let hyp = disc.hypothesis();
        let mut args = vec![
            "-batchmode".to_string(),
            "-geofile=solid.stl".to_string(),
            "-meshfile=solid.vol".to_string(),
        ];
        if hyp.has_length() {
            args.push(format!("-maxh={}", hyp.length()));
        }
        run_volume_mesher(
            ctx,
            disc,
            Tool::Netgen,
            &StlWriter::default(),
            "solid.stl",
            args,
            &NetgenVolReader,
            "solid.vol",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn volume_bound_of_unit_edge() {
        assert_relative_eq!(tetgen_volume_bound(1.0), 0.117_851_130_197_757_92, epsilon = 1e-15);
        assert_relative_eq!(tetgen_volume_bound(2.0), 8.0 * tetgen_volume_bound(1.0));
    }
}
