//! Persistence of computed meshes.
//!
//! Algorithms write each finished edge, face and solid mesh through a
//! [`MeshStore`]; the volume meshers read the closed boundary of a solid back
//! through [`MeshStore::read_all_faces`].

use crate::cad::ShapeKind;
use crate::data::discretization::{Discretization, DiscretizationId};
use crate::data::mesh::{
    BoundaryMesh, EdgeMesh, EdgeNode, Mesh, NodeTag, SurfaceMesh, SurfaceNode, VolumeMesh,
};
use crate::data::submesh::SubmeshId;
use crate::mesh_error::BoraError;
use crate::topology::cell::CellId;
use crate::topology::graph::TopologyGraph;
use bytes::{Buf, BufMut, BytesMut};
use dashmap::DashMap;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Sink (and source) of computed meshes.
pub trait MeshStore: Send + Sync {
    fn write_edge(&self, disc: &Discretization, mesh: &EdgeMesh) -> Result<(), BoraError>;
    fn write_face(&self, disc: &Discretization, mesh: &SurfaceMesh) -> Result<(), BoraError>;
    fn write_solid(&self, disc: &Discretization, mesh: &VolumeMesh) -> Result<(), BoraError>;

    /// Closed boundary of `solid` as meshed for `submesh`.
    ///
    /// # Errors
    /// `IncompleteBoundary` if a face of the solid has no mesh for `submesh`.
    fn read_all_faces(
        &self,
        graph: &TopologyGraph,
        solid: CellId,
        submesh: SubmeshId,
    ) -> Result<BoundaryMesh, BoraError> {
        assemble_boundary(graph, solid, submesh)
    }
}

/// Merge the face meshes of `solid` into one outward-oriented surface.
///
/// Nodes are shared by tag; a face used reversed by the solid contributes its
/// triangles flipped.
pub fn assemble_boundary(
    graph: &TopologyGraph,
    solid: CellId,
    submesh: SubmeshId,
) -> Result<BoundaryMesh, BoraError> {
    let mut out = BoundaryMesh::default();
    let mut by_tag: HashMap<NodeTag, usize> = HashMap::new();
    for (face, orientation) in graph.shapes_explorer(solid, ShapeKind::Face)? {
        let mesh = graph
            .get_discretization_submesh(face, submesh)
            .and_then(|d| d.mesh())
            .and_then(Mesh::as_face)
            .ok_or(BoraError::IncompleteBoundary {
                cell: solid,
                boundary: face,
            })?;
        let local: Vec<usize> = mesh
            .nodes
            .iter()
            .map(|n| match n.tag {
                NodeTag::Interior => {
                    out.nodes.push(n.xyz);
                    out.nodes.len() - 1
                }
                tag => *by_tag.entry(tag).or_insert_with(|| {
                    out.nodes.push(n.xyz);
                    out.nodes.len() - 1
                }),
            })
            .collect();
        for t in &mesh.triangles {
            let [a, b, c] = [local[t[0]], local[t[1]], local[t[2]]];
            out.triangles.push(if orientation.is_reversed() {
                [a, c, b]
            } else {
                [a, b, c]
            });
        }
    }
    Ok(out)
}

/// Stored copy of one mesh.
#[derive(Clone, Debug, PartialEq)]
pub enum StoredMesh {
    Edge(EdgeMesh),
    Face(SurfaceMesh),
    Solid(VolumeMesh),
}

/// Keeps copies of written meshes in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    meshes: DashMap<DiscretizationId, StoredMesh>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the mesh stored for `id`.
    pub fn get(&self, id: DiscretizationId) -> Option<StoredMesh> {
        self.meshes.get(&id).map(|m| m.clone())
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

impl MeshStore for MemoryStore {
    fn write_edge(&self, disc: &Discretization, mesh: &EdgeMesh) -> Result<(), BoraError> {
        self.meshes.insert(disc.id(), StoredMesh::Edge(mesh.clone()));
        Ok(())
    }
    fn write_face(&self, disc: &Discretization, mesh: &SurfaceMesh) -> Result<(), BoraError> {
        self.meshes.insert(disc.id(), StoredMesh::Face(mesh.clone()));
        Ok(())
    }
    fn write_solid(&self, disc: &Discretization, mesh: &VolumeMesh) -> Result<(), BoraError> {
        self.meshes.insert(disc.id(), StoredMesh::Solid(mesh.clone()));
        Ok(())
    }
}

const MAGIC: &[u8; 4] = b"BMSH";
const VERSION: u8 = 1;

/// Writes one little-endian binary file per mesh under `1d/`, `2d/` and
/// `3d/`. Node tags are not persisted; [`DirectoryStore::load`] returns
/// interior-tagged nodes.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Create the directory layout under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, BoraError> {
        let root = root.into();
        for sub in ["1d", "2d", "3d"] {
            fs::create_dir_all(root.join(sub))?;
        }
        Ok(DirectoryStore { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding the mesh of `id` for a cell of `kind`.
    pub fn path_of(&self, kind: ShapeKind, id: DiscretizationId) -> Option<PathBuf> {
        let dir = match kind {
            ShapeKind::Edge => "1d",
            ShapeKind::Face => "2d",
            ShapeKind::Solid => "3d",
            _ => return None,
        };
        Some(
            self.root
                .join(dir)
                .join(format!("c{}_{}.bin", id.cell, id.group)),
        )
    }

    fn header(buf: &mut BytesMut, kind: u8, id: DiscretizationId) {
        buf.put_slice(MAGIC);
        buf.put_u8(VERSION);
        buf.put_u8(kind);
        buf.put_u32_le(id.cell.get());
        buf.put_u32_le(id.group);
    }

    fn put_point(buf: &mut BytesMut, p: &[f64]) {
        for &c in p {
            buf.put_f64_le(c);
        }
    }

    fn put_len(buf: &mut BytesMut, n: usize) -> Result<(), BoraError> {
        let n = u32::try_from(n).map_err(|_| BoraError::Io(format!("{n} records exceed u32")))?;
        buf.put_u32_le(n);
        Ok(())
    }

    fn save(&self, kind: ShapeKind, id: DiscretizationId, buf: BytesMut) -> Result<(), BoraError> {
        let path = self
            .path_of(kind, id)
            .ok_or_else(|| BoraError::Io(format!("no storage for {kind}")))?;
        fs::write(&path, &buf)?;
        log::debug!("stored {} bytes to {}", buf.len(), path.display());
        Ok(())
    }

    /// Read back a mesh file written by this store.
    pub fn load(path: &Path) -> Result<Mesh, BoraError> {
        let data = fs::read(path)?;
        let mut buf = &data[..];
        let need = |buf: &&[u8], n: usize| -> Result<(), BoraError> {
            if buf.remaining() < n {
                Err(BoraError::Parse(format!("{} is truncated", path.display())))
            } else {
                Ok(())
            }
        };
        need(&buf, 14)?;
        if &buf[..4] != MAGIC {
            return Err(BoraError::Parse(format!("{} is not a mesh file", path.display())));
        }
        buf.advance(4);
        let version = buf.get_u8();
        if version != VERSION {
            return Err(BoraError::Parse(format!("unsupported version {version}")));
        }
        let kind = buf.get_u8();
        buf.advance(8);
        need(&buf, 4)?;
        let n = buf.get_u32_le() as usize;
        match kind {
            1 => {
                need(&buf, n * 32)?;
                let nodes = (0..n)
                    .map(|_| EdgeNode {
                        param: buf.get_f64_le(),
                        xyz: [buf.get_f64_le(), buf.get_f64_le(), buf.get_f64_le()],
                        tag: NodeTag::Interior,
                    })
                    .collect();
                Ok(Mesh::Edge(EdgeMesh {
                    nodes,
                    degenerate: false,
                }))
            }
            2 => {
                need(&buf, n * 40 + 4)?;
                let nodes = (0..n)
                    .map(|_| SurfaceNode {
                        xyz: [buf.get_f64_le(), buf.get_f64_le(), buf.get_f64_le()],
                        uv: [buf.get_f64_le(), buf.get_f64_le()],
                        tag: NodeTag::Interior,
                    })
                    .collect();
                let m = buf.get_u32_le() as usize;
                need(&buf, m * 12)?;
                let triangles = (0..m)
                    .map(|_| {
                        [
                            buf.get_u32_le() as usize,
                            buf.get_u32_le() as usize,
                            buf.get_u32_le() as usize,
                        ]
                    })
                    .collect();
                Ok(Mesh::Face(SurfaceMesh { nodes, triangles }))
            }
            3 => {
                need(&buf, n * 24 + 4)?;
                let nodes = (0..n)
                    .map(|_| [buf.get_f64_le(), buf.get_f64_le(), buf.get_f64_le()])
                    .collect();
                let m = buf.get_u32_le() as usize;
                need(&buf, m * 16)?;
                let tetrahedra = (0..m)
                    .map(|_| {
                        [
                            buf.get_u32_le() as usize,
                            buf.get_u32_le() as usize,
                            buf.get_u32_le() as usize,
                            buf.get_u32_le() as usize,
                        ]
                    })
                    .collect();
                Ok(Mesh::Solid(VolumeMesh { nodes, tetrahedra }))
            }
            other => Err(BoraError::Parse(format!("unknown mesh kind {other}"))),
        }
    }
}

impl MeshStore for DirectoryStore {
    fn write_edge(&self, disc: &Discretization, mesh: &EdgeMesh) -> Result<(), BoraError> {
        let mut buf = BytesMut::with_capacity(18 + mesh.nodes.len() * 32);
        Self::header(&mut buf, 1, disc.id());
        Self::put_len(&mut buf, mesh.nodes.len())?;
        for n in &mesh.nodes {
            buf.put_f64_le(n.param);
            Self::put_point(&mut buf, &n.xyz);
        }
        self.save(ShapeKind::Edge, disc.id(), buf)
    }

    fn write_face(&self, disc: &Discretization, mesh: &SurfaceMesh) -> Result<(), BoraError> {
        let mut buf = BytesMut::with_capacity(22 + mesh.nodes.len() * 40 + mesh.triangles.len() * 12);
        Self::header(&mut buf, 2, disc.id());
        Self::put_len(&mut buf, mesh.nodes.len())?;
        for n in &mesh.nodes {
            Self::put_point(&mut buf, &n.xyz);
            Self::put_point(&mut buf, &n.uv);
        }
        Self::put_len(&mut buf, mesh.triangles.len())?;
        for t in &mesh.triangles {
            for &i in t {
                Self::put_len(&mut buf, i)?;
            }
        }
        self.save(ShapeKind::Face, disc.id(), buf)
    }

    fn write_solid(&self, disc: &Discretization, mesh: &VolumeMesh) -> Result<(), BoraError> {
        let mut buf = BytesMut::with_capacity(22 + mesh.nodes.len() * 24 + mesh.tetrahedra.len() * 16);
        Self::header(&mut buf, 3, disc.id());
        Self::put_len(&mut buf, mesh.nodes.len())?;
        for p in &mesh.nodes {
            Self::put_point(&mut buf, p);
        }
        Self::put_len(&mut buf, mesh.tetrahedra.len())?;
        for t in &mesh.tetrahedra {
            for &i in t {
                Self::put_len(&mut buf, i)?;
            }
        }
        self.save(ShapeKind::Solid, disc.id(), buf)
    }
}
