//! Mesh I/O: tool hand-off formats and persistence.
//!
//! - [`poly`]: TetGen `.poly` and ASCII STL writers for a solid's boundary
//! - [`medit`]: Medit `.mesh` reader (TetGen output)
//! - [`netgen`]: Netgen `.vol` reader
//! - [`store`]: the [`store::MeshStore`] trait, in-memory and directory stores

pub mod medit;
pub mod netgen;
pub mod poly;
pub mod store;

use crate::data::mesh::{BoundaryMesh, VolumeMesh};
use crate::mesh_error::BoraError;
use std::io::{Read, Write};

pub use medit::MeditReader;
pub use netgen::NetgenVolReader;
pub use poly::{PolyWriter, StlWriter};
pub use store::{DirectoryStore, MemoryStore, MeshStore, StoredMesh, assemble_boundary};

/// Readers of tetrahedral meshes produced by external tools.
pub trait VolumeMeshReader {
    /// Parse a volume mesh from a reader.
    fn read<R: Read>(&self, reader: R) -> Result<VolumeMesh, BoraError>;
}

/// Writers of closed triangulated surfaces handed to external tools.
pub trait SurfaceWriter {
    /// Serialize `mesh` to a writer.
    fn write<W: Write>(&self, mesh: &BoundaryMesh, writer: W) -> Result<(), BoraError>;
}
