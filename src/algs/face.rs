//! 2D meshing of a face in its parameter plane.
//!
//! 1. The boundary polygon is read from the edge discretizations of the
//!    face's wires, each edge traversed in the direction the wire uses it.
//! 2. A constrained Delaunay triangulation is seeded with the boundary
//!    nodes and the face's interior vertices; the outside is removed.
//! 3. Nodes are inserted in stages of decreasing target size `f * L`. Each
//!    round proposes points splitting every long edge plus the centroid of
//!    every triangle, and keeps a candidate only if no node lies within
//!    `min_distance_ratio * f * L` of its surface image. A stage ends when a
//!    round inserts nothing.
//! 4. Lawson flips restore the Delaunay property, an absolute deflection is
//!    enforced by centroid insertion, and triangles collapsed in 3D are
//!    removed.

use super::triangulation::{SUPER_VERTICES, Triangulation};
use super::{AlgoContext, MeshAlgorithm};
use crate::cad::{ShapeKind, Surface};
use crate::data::discretization::Discretization;
use crate::data::mesh::{Mesh, NodeTag, SurfaceMesh, SurfaceNode};
use crate::geometry::quality::triangle_quality;
use crate::geometry::{
    Point2, Point3, cross, distance, distance_to_segment, dot, normalize, sub,
};
use crate::mesh_error::BoraError;
use crate::topology::cell::CellId;
use crate::topology::orientation::Orientation;
use std::collections::HashMap;
use std::f64::consts::SQRT_2;
use std::sync::Arc;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Basic2d;

#[derive(Clone, Debug)]
struct BoundaryNode {
    xyz: Point3,
    uv: Point2,
    tag: NodeTag,
}

/// Uniform hash grid answering "is any point within `r` of p" for `r` no
/// larger than the cell size.
struct PointGrid {
    cell: f64,
    bins: HashMap<[i64; 3], Vec<Point3>>,
}

impl PointGrid {
    fn new(cell: f64) -> Self {
        PointGrid {
            cell,
            bins: HashMap::new(),
        }
    }

    fn bin(&self, p: Point3) -> [i64; 3] {
        p.map(|x| (x / self.cell).floor() as i64)
    }

    fn add(&mut self, p: Point3) {
        let b = self.bin(p);
        self.bins.entry(b).or_default().push(p);
    }

    fn any_within(&self, p: Point3, r: f64) -> bool {
        let [i, j, k] = self.bin(p);
        let r2 = r * r;
        for di in -1..=1 {
            for dj in -1..=1 {
                for dk in -1..=1 {
                    if let Some(points) = self.bins.get(&[i + di, j + dj, k + dk]) {
                        if points.iter().any(|q| crate::geometry::distance2(p, *q) <= r2) {
                            return true;
                        }
                    }
                }
            }
        }
        false
    }
}

/// Working state: the triangulation plus the 3D image and tag of each point.
struct FaceMesher<'a> {
    face: CellId,
    surface: &'a dyn Surface,
    tr: Triangulation,
    xyz: Vec<Point3>,
    tags: Vec<NodeTag>,
}

impl FaceMesher<'_> {
    fn fail(&self, reason: impl Into<String>) -> BoraError {
        BoraError::Triangulation {
            cell: self.face,
            reason: reason.into(),
        }
    }

    /// Insert `uv`; `Ok(None)` when the point already exists or falls
    /// outside the domain.
    fn insert(&mut self, uv: Point2, xyz: Point3, tag: NodeTag) -> Option<usize> {
        let before = self.tr.points().len();
        let i = self.tr.insert(uv)?;
        if i < before {
            return None;
        }
        self.xyz.push(xyz);
        self.tags.push(tag);
        Some(i)
    }

    fn seed(&mut self, loops: &[Vec<BoundaryNode>], interior: &[BoundaryNode]) -> Result<(), BoraError> {
        let mut rings = Vec::with_capacity(loops.len());
        for ring in loops {
            if ring.len() < 3 {
                return Err(self.fail(format!("boundary loop with {} nodes", ring.len())));
            }
            let mut ids = Vec::with_capacity(ring.len());
            for node in ring {
                let id = self.insert(node.uv, node.xyz, node.tag).ok_or_else(|| {
                    self.fail(format!("boundary node {:?} at {:?} is duplicated", node.tag, node.uv))
                })?;
                ids.push(id);
            }
            rings.push(ids);
        }
        for ids in &rings {
            for (k, &a) in ids.iter().enumerate() {
                let b = ids[(k + 1) % ids.len()];
                self.tr.insert_segment(a, b).map_err(|r| self.fail(r))?;
            }
        }
        for v in interior {
            if self.insert(v.uv, v.xyz, v.tag).is_none() {
                return Err(self.fail(format!("interior vertex {:?} is outside the face", v.tag)));
            }
        }
        self.tr.remove_exterior();
        if self.tr.triangles().is_empty() {
            return Err(self.fail("empty domain"));
        }
        Ok(())
    }

    fn candidates(&self, h: f64) -> Vec<Point2> {
        let mut out = Vec::new();
        for (a, b) in self.tr.edges() {
            if self.tr.is_constrained(a, b) {
                continue;
            }
            let l = distance(self.xyz[a], self.xyz[b]) / h;
            if l < SQRT_2 {
                continue;
            }
            let lcrit = if l <= 4.0 { 1.0 } else { l / 4.0 };
            let n = ((l / lcrit).round() as usize).max(2);
            let (pa, pb) = (self.tr.point(a), self.tr.point(b));
            for k in 1..n {
                let t = k as f64 / n as f64;
                out.push([pa[0] + (pb[0] - pa[0]) * t, pa[1] + (pb[1] - pa[1]) * t]);
            }
        }
        for [a, b, c] in self.tr.triangles() {
            let [pa, pb, pc] = [a, b, c].map(|k| self.tr.point(k));
            out.push([(pa[0] + pb[0] + pc[0]) / 3.0, (pa[1] + pb[1] + pc[1]) / 3.0]);
        }
        out
    }

    /// One refinement stage at target size `h`. Returns the number of nodes
    /// inserted.
    fn refine_stage(&mut self, h: f64, min_ratio: f64, max_rounds: usize) -> usize {
        let radius = min_ratio * h;
        let mut grid = PointGrid::new(radius);
        for &p in &self.xyz[SUPER_VERTICES..] {
            grid.add(p);
        }
        let mut total = 0;
        for round in 0..max_rounds {
            let mut accepted = Vec::new();
            for uv in self.candidates(h) {
                let p = self.surface.value(uv);
                if !grid.any_within(p, radius) {
                    grid.add(p);
                    accepted.push((uv, p));
                }
            }
            let inserted = accepted
                .into_iter()
                .filter(|&(uv, p)| self.insert(uv, p, NodeTag::Interior).is_some())
                .count();
            log::debug!("face {}: h={h} round {round} inserted {inserted}", self.face);
            if inserted == 0 {
                break;
            }
            total += inserted;
        }
        total
    }

    /// Insert centroids of triangles whose surface image deviates from the
    /// triangle plane by more than `tolerance`.
    fn enforce_deflection(&mut self, tolerance: f64, max_rounds: usize) {
        for _ in 0..max_rounds {
            let mut targets = Vec::new();
            for [a, b, c] in self.tr.triangles() {
                let [pa, pb, pc] = [a, b, c].map(|k| self.tr.point(k));
                let uv = [(pa[0] + pb[0] + pc[0]) / 3.0, (pa[1] + pb[1] + pc[1]) / 3.0];
                let on_surface = self.surface.value(uv);
                let [xa, xb, xc] = [a, b, c].map(|k| self.xyz[k]);
                let Some(n) = normalize(cross(sub(xb, xa), sub(xc, xa))) else {
                    continue;
                };
                if dot(sub(on_surface, xa), n).abs() > tolerance {
                    targets.push((uv, on_surface));
                }
            }
            let inserted = targets
                .into_iter()
                .filter(|&(uv, p)| self.insert(uv, p, NodeTag::Interior).is_some())
                .count();
            if inserted == 0 {
                break;
            }
        }
    }

    /// Collapse triangle edges shorter than `tol` in 3D, drop the triangles
    /// they degenerate, and compact the node list.
    fn finish(self, tol: f64, boundary_count: usize) -> Result<SurfaceMesh, BoraError> {
        let n = self.xyz.len();
        let mut target: Vec<usize> = (0..n).collect();
        let find = |t: &Vec<usize>, mut i: usize| {
            while t[i] != i {
                i = t[i];
            }
            i
        };
        let triangles = self.tr.triangles();
        for t in &triangles {
            for k in 0..3 {
                let (a, b) = (find(&target, t[k]), find(&target, t[(k + 1) % 3]));
                if a != b && distance(self.xyz[a], self.xyz[b]) <= tol {
                    // keep the tagged node
                    let (keep, gone) = if self.tags[b] == NodeTag::Interior { (a, b) } else { (b, a) };
                    target[gone] = keep;
                }
            }
        }
        let mut index = vec![usize::MAX; n];
        let mut mesh = SurfaceMesh::default();
        let mut collapsed = 0;
        for t in &triangles {
            let r = t.map(|i| find(&target, i));
            if r[0] == r[1] || r[1] == r[2] || r[0] == r[2] {
                collapsed += 1;
                continue;
            }
            let mut out = [0usize; 3];
            for (slot, &i) in out.iter_mut().zip(r.iter()) {
                if index[i] == usize::MAX {
                    index[i] = mesh.nodes.len();
                    mesh.nodes.push(SurfaceNode {
                        xyz: self.xyz[i],
                        uv: self.tr.point(i),
                        tag: self.tags[i],
                    });
                }
                *slot = index[i];
            }
            mesh.triangles.push(out);
        }
        if collapsed > 0 {
            log::debug!("face {}: removed {collapsed} degenerate triangles", self.face);
        }
        let used_boundary = mesh.boundary_nodes().count();
        if collapsed == 0 && used_boundary < boundary_count {
            return Err(BoraError::Triangulation {
                cell: self.face,
                reason: format!("{used_boundary} of {boundary_count} boundary nodes used"),
            });
        }
        Ok(mesh)
    }
}

impl Basic2d {
    /// Boundary loops of `face`, one per wire, for the submesh of `disc`.
    fn boundary_loops(
        ctx: &AlgoContext<'_>,
        face: CellId,
        disc: &Discretization,
        surface: &dyn Surface,
    ) -> Result<Vec<Vec<BoundaryNode>>, BoraError> {
        let submesh = disc.first_submesh();
        let graph = ctx.graph;
        let mut loops = Vec::new();
        for &(wire, wo) in graph.get_by_id(face)?.children() {
            if graph.get_by_id(wire)?.kind() != ShapeKind::Wire {
                continue;
            }
            let mut ring: Vec<BoundaryNode> = Vec::new();
            for &(edge, eo) in graph.get_by_id(wire)?.children() {
                let mesh = graph
                    .get_discretization_submesh(edge, submesh)
                    .and_then(Discretization::mesh)
                    .and_then(Mesh::as_edge)
                    .ok_or(BoraError::IncompleteBoundary {
                        cell: face,
                        boundary: edge,
                    })?;
                if mesh.degenerate {
                    continue;
                }
                let mut nodes: Vec<_> = mesh.nodes.iter().map(|n| (n.xyz, n.tag)).collect();
                if wo.then(eo) == Orientation::Reversed {
                    nodes.reverse();
                }
                nodes.pop();
                ring.extend(nodes.into_iter().map(|(xyz, tag)| BoundaryNode {
                    xyz,
                    uv: surface.parameters(xyz),
                    tag,
                }));
            }
            loops.push(ring);
        }
        Ok(loops)
    }

    /// Merge nodes closer than `min_len` to the last kept node when the
    /// dropped node stays within `eps` of the new chord. Vertex nodes are kept.
    fn elide_short_segments(ring: Vec<BoundaryNode>, min_len: f64, eps: f64) -> Vec<BoundaryNode> {
        let n = ring.len();
        let mut keep = vec![true; n];
        let mut last = 0;
        for i in 1..n {
            let next = &ring[(i + 1) % n];
            let node = &ring[i];
            let short = distance(ring[last].xyz, node.xyz) < min_len;
            if short
                && !matches!(node.tag, NodeTag::Vertex(_))
                && distance_to_segment(node.xyz, ring[last].xyz, next.xyz) <= eps
            {
                keep[i] = false;
            } else {
                last = i;
            }
        }
        let out: Vec<_> = ring
            .into_iter()
            .zip(keep)
            .filter_map(|(node, k)| k.then_some(node))
            .collect();
        if out.len() < n {
            log::debug!("elided {} short boundary segments", n - out.len());
        }
        out
    }

    fn interior_vertices(
        ctx: &AlgoContext<'_>,
        face: CellId,
        disc: &Discretization,
        surface: &dyn Surface,
    ) -> Result<Vec<BoundaryNode>, BoraError> {
        let mut out = Vec::new();
        for &(v, _) in ctx.graph.get_by_id(face)?.children() {
            if ctx.graph.get_by_id(v)?.kind() != ShapeKind::Vertex {
                continue;
            }
            let xyz = ctx
                .graph
                .get_discretization_submesh(v, disc.first_submesh())
                .and_then(Discretization::mesh)
                .and_then(Mesh::as_vertex)
                .ok_or(BoraError::IncompleteBoundary {
                    cell: face,
                    boundary: v,
                })?;
            out.push(BoundaryNode {
                xyz,
                uv: surface.parameters(xyz),
                tag: NodeTag::Vertex(v),
            });
        }
        Ok(out)
    }
}

impl MeshAlgorithm for Basic2d {
    fn name(&self) -> &'static str {
        "Basic2d"
    }

    fn compute(&self, ctx: &AlgoContext<'_>, disc: &Discretization) -> Result<Mesh, BoraError> {
        let face = disc.cell();
        let cell = ctx.graph.get_by_id(face)?;
        let surface: Arc<dyn Surface> = cell
            .shape()
            .surface()
            .cloned()
            .ok_or_else(|| BoraError::Geometry(format!("face {face} has no surface")))?;
        let hyp = disc.hypothesis();
        let length = if hyp.has_length() { hyp.length() } else { f64::INFINITY };
        let config = ctx.config;

        let mut loops = Self::boundary_loops(ctx, face, disc, surface.as_ref())?;
        if config.short_segment_ratio > 0.0 && length.is_finite() {
            let eps = match (hyp.has_deflection(), hyp.is_relative_deflection()) {
                (true, false) => hyp.deflection(),
                (true, true) => hyp.deflection() * length,
                (false, _) => 1e-6 * length,
            };
            loops = loops
                .into_iter()
                .map(|r| Self::elide_short_segments(r, config.short_segment_ratio * length, eps))
                .collect();
        }
        let interior = Self::interior_vertices(ctx, face, disc, surface.as_ref())?;

        let (mut lo, mut hi) = ([f64::MAX; 2], [f64::MIN; 2]);
        for node in loops.iter().flatten().chain(interior.iter()) {
            for k in 0..2 {
                lo[k] = lo[k].min(node.uv[k]);
                hi[k] = hi[k].max(node.uv[k]);
            }
        }
        if lo[0] > hi[0] {
            return Err(BoraError::Triangulation {
                cell: face,
                reason: "face has no boundary nodes".into(),
            });
        }
        let boundary_count = loops.iter().map(Vec::len).sum::<usize>() + interior.len();
        let mut mesher = FaceMesher {
            face,
            surface: surface.as_ref(),
            tr: Triangulation::new(lo, hi),
            xyz: vec![[0.0; 3]; SUPER_VERTICES],
            tags: vec![NodeTag::Interior; SUPER_VERTICES],
        };
        mesher.seed(&loops, &interior)?;

        if length.is_finite() {
            for &f in &config.refine_stages {
                let added = mesher.refine_stage(
                    f * length,
                    config.min_distance_ratio,
                    config.max_refine_rounds,
                );
                log::debug!("face {face}: stage {f} added {added} nodes");
            }
        }
        mesher.tr.make_delaunay();
        if hyp.has_deflection() && !hyp.is_relative_deflection() {
            mesher.enforce_deflection(hyp.deflection(), config.max_refine_rounds);
            mesher.tr.make_delaunay();
        }
        mesher
            .tr
            .check_consistency()
            .map_err(|r| BoraError::Triangulation { cell: face, reason: r })?;

        let scale = (hi[0] - lo[0]).max(hi[1] - lo[1]).max(f64::MIN_POSITIVE);
        let mesh = mesher.finish(1e-12 * scale, boundary_count)?;
        for (k, pts) in mesh.triangle_points().enumerate() {
            let t = mesh.triangles[k];
            let uv = [mesh.nodes[t[0]].uv, mesh.nodes[t[1]].uv, mesh.nodes[t[2]].uv];
            let centroid = [(uv[0][0] + uv[1][0] + uv[2][0]) / 3.0, (uv[0][1] + uv[1][1] + uv[2][1]) / 3.0];
            let q = triangle_quality(pts, surface.normal(centroid));
            if q.signed_measure <= 0.0 {
                return Err(BoraError::Triangulation {
                    cell: face,
                    reason: format!("triangle {k} is inverted on the surface"),
                });
            }
        }
        log::debug!(
            "face {face}: {} nodes, {} triangles",
            mesh.nodes.len(),
            mesh.triangle_count()
        );
        ctx.store.write_face(disc, &mesh)?;
        Ok(Mesh::Face(mesh))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(x: f64, y: f64, tag: NodeTag) -> BoundaryNode {
        BoundaryNode {
            xyz: [x, y, 0.0],
            uv: [x, y],
            tag,
        }
    }

    #[test]
    fn grid_radius_query() {
        let mut g = PointGrid::new(0.5);
        g.add([0.0, 0.0, 0.0]);
        assert!(g.any_within([0.3, 0.3, 0.0], 0.5));
        assert!(!g.any_within([0.4, 0.4, 0.0], 0.5));
        assert!(!g.any_within([-2.0, 0.0, 0.0], 0.5));
    }

    #[test]
    fn elision_keeps_vertices_and_far_nodes() {
        let v = |k| NodeTag::Vertex(CellId::new(k).unwrap());
        let ring = vec![
            node(0.0, 0.0, v(1)),
            node(0.01, 0.0, NodeTag::Interior),
            node(0.5, 0.0, NodeTag::Interior),
            node(1.0, 0.0, v(2)),
            node(1.0, 1.0, v(3)),
        ];
        let out = Basic2d::elide_short_segments(ring, 0.05, 1e-9);
        let xs: Vec<f64> = out.iter().map(|n| n.xyz[0]).collect();
        assert_eq!(xs, vec![0.0, 0.5, 1.0, 1.0]);
    }
}
