//! Neutral surface writers for the volume meshers: TetGen `.poly` and ASCII
//! STL.

use crate::data::mesh::BoundaryMesh;
use crate::geometry::{cross, normalize, sub};
use crate::io::SurfaceWriter;
use crate::mesh_error::BoraError;
use std::io::Write;

/// TetGen piecewise linear complex: node list, one triangle per facet, no
/// holes, no regions. Indices are 1-based.
#[derive(Debug, Default, Clone)]
pub struct PolyWriter;

impl SurfaceWriter for PolyWriter {
    fn write<W: Write>(&self, mesh: &BoundaryMesh, mut writer: W) -> Result<(), BoraError> {
        writeln!(writer, "# Part 1 - node list")?;
        writeln!(writer, "{} 3 0 0", mesh.nodes.len())?;
        for (i, p) in mesh.nodes.iter().enumerate() {
            writeln!(writer, "{} {:.17e} {:.17e} {:.17e}", i + 1, p[0], p[1], p[2])?;
        }
        writeln!(writer, "# Part 2 - facet list")?;
        writeln!(writer, "{} 0", mesh.triangles.len())?;
        for t in &mesh.triangles {
            writeln!(writer, "1")?;
            writeln!(writer, "3 {} {} {}", t[0] + 1, t[1] + 1, t[2] + 1)?;
        }
        writeln!(writer, "# Part 3 - hole list")?;
        writeln!(writer, "0")?;
        writeln!(writer, "# Part 4 - region list")?;
        writeln!(writer, "0")?;
        writer.flush()?;
        Ok(())
    }
}

/// ASCII STL with per-facet normals.
#[derive(Debug, Clone)]
pub struct StlWriter {
    pub name: String,
}

impl Default for StlWriter {
    fn default() -> Self {
        StlWriter {
            name: "bora".into(),
        }
    }
}

impl SurfaceWriter for StlWriter {
    fn write<W: Write>(&self, mesh: &BoundaryMesh, mut writer: W) -> Result<(), BoraError> {
        writeln!(writer, "solid {}", self.name)?;
        for t in &mesh.triangles {
            let [a, b, c] = [mesh.nodes[t[0]], mesh.nodes[t[1]], mesh.nodes[t[2]]];
            let n = normalize(cross(sub(b, a), sub(c, a))).unwrap_or([0.0; 3]);
            writeln!(writer, "  facet normal {:e} {:e} {:e}", n[0], n[1], n[2])?;
            writeln!(writer, "    outer loop")?;
            for p in [a, b, c] {
                writeln!(writer, "      vertex {:.17e} {:.17e} {:.17e}", p[0], p[1], p[2])?;
            }
            writeln!(writer, "    endloop")?;
            writeln!(writer, "  endfacet")?;
        }
        writeln!(writer, "endsolid {}", self.name)?;
        writer.flush()?;
        Ok(())
    }
}
