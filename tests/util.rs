#![allow(dead_code)]
use bora_mesh::prelude::*;
use std::path::{Path, PathBuf};

pub fn hyp(element: &str, length: f64) -> Hypothesis {
    Hypothesis::new(element, length).unwrap()
}

pub fn constraint(cell: CellId, element: &str, length: f64) -> Constraint {
    Constraint::new(cell, hyp(element, length))
}

/// Segment count of the edge mesh of `edge` for `submesh`.
pub fn segments(model: &Model, edge: CellId, submesh: SubmeshId) -> usize {
    model
        .get_discretization_submesh(edge, submesh)
        .and_then(|d| d.mesh())
        .and_then(Mesh::as_edge)
        .unwrap_or_else(|| panic!("edge {edge} has no mesh for {submesh}"))
        .segment_count()
}

pub fn face_mesh(model: &Model, face: CellId, submesh: SubmeshId) -> &bora_mesh::data::SurfaceMesh {
    model
        .get_discretization_submesh(face, submesh)
        .and_then(|d| d.mesh())
        .and_then(Mesh::as_face)
        .unwrap_or_else(|| panic!("face {face} has no mesh for {submesh}"))
}

/// Faces used by two shells.
pub fn shared_faces(model: &Model) -> Vec<CellId> {
    model
        .graph()
        .cells()
        .filter(|c| c.kind() == ShapeKind::Face && c.parents().len() == 2)
        .map(|c| c.id())
        .collect()
}

/// Write an executable shell script standing in for an external mesher.
#[cfg(unix)]
pub fn fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

pub const ONE_TET_MEDIT: &str = "MeshVersionFormatted 1
Dimension 3
Vertices
4
0 0 0 1
1 0 0 1
0 1 0 1
0 0 1 1
Tetrahedra
1
1 2 3 4 1
End";

pub const ONE_TET_VOL: &str = "mesh3d
dimension
3
volumeelements
1
1 4 1 2 3 4
points
4
0 0 0
1 0 0
0 1 0
0 0 1
endmesh";
