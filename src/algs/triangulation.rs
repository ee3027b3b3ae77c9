//! Constrained Delaunay triangulation in a parameter plane.
//!
//! Points are inserted with Bowyer–Watson: the cavity of triangles whose
//! circumcircle contains the new point is replaced by a fan, and a cavity
//! never grows across a constrained edge. Boundary segments are recovered by
//! edge flips, the exterior is removed by a parity flood fill, and Lawson flips
//! restore the Delaunay property on unconstrained edges. All orientation and
//! in-circle tests use the exact predicates of the `robust` crate.
//!
//! The first three points are the vertices of an enclosing super-triangle;
//! they never belong to the final mesh.

use crate::geometry::Point2;
use robust::{Coord, incircle, orient2d};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

/// Number of super-triangle vertices at the start of the point list.
pub const SUPER_VERTICES: usize = 3;

#[derive(Clone, Debug)]
struct Tri {
    /// Counter-clockwise vertices.
    v: [usize; 3],
    /// `n[i]` is the neighbour across the edge opposite `v[i]`.
    n: [Option<usize>; 3],
    alive: bool,
}

impl Tri {
    fn edge(&self, i: usize) -> (usize, usize) {
        (self.v[(i + 1) % 3], self.v[(i + 2) % 3])
    }
}

#[inline]
fn key(a: usize, b: usize) -> (usize, usize) {
    if a < b { (a, b) } else { (b, a) }
}

#[inline]
fn coord(p: Point2) -> Coord<f64> {
    Coord { x: p[0], y: p[1] }
}

/// Positive when `a, b, c` turn counter-clockwise.
#[inline]
pub fn orient(a: Point2, b: Point2, c: Point2) -> f64 {
    orient2d(coord(a), coord(b), coord(c))
}

/// Positive when `d` lies inside the circle through the counter-clockwise
/// `a, b, c`.
#[inline]
pub fn in_circle(a: Point2, b: Point2, c: Point2, d: Point2) -> f64 {
    incircle(coord(a), coord(b), coord(c), coord(d))
}

/// Constrained Delaunay triangulation with neighbour links.
#[derive(Clone, Debug)]
pub struct Triangulation {
    points: Vec<Point2>,
    tris: Vec<Tri>,
    constrained: HashSet<(usize, usize)>,
    hint: usize,
}

impl Triangulation {
    /// Empty triangulation whose super-triangle encloses `[lo, hi]`.
    pub fn new(lo: Point2, hi: Point2) -> Self {
        let cx = 0.5 * (lo[0] + hi[0]);
        let cy = 0.5 * (lo[1] + hi[1]);
        let r = (hi[0] - lo[0]).max(hi[1] - lo[1]) * 10.0 + 1.0;
        Triangulation {
            points: vec![[cx - 2.0 * r, cy - r], [cx + 2.0 * r, cy - r], [cx, cy + 2.0 * r]],
            tris: vec![Tri {
                v: [0, 1, 2],
                n: [None; 3],
                alive: true,
            }],
            constrained: HashSet::new(),
            hint: 0,
        }
    }

    pub fn points(&self) -> &[Point2] {
        &self.points
    }

    pub fn point(&self, i: usize) -> Point2 {
        self.points[i]
    }

    pub fn is_constrained(&self, a: usize, b: usize) -> bool {
        self.constrained.contains(&key(a, b))
    }

    /// Live triangles, counter-clockwise, in storage order.
    pub fn triangles(&self) -> Vec<[usize; 3]> {
        self.tris.iter().filter(|t| t.alive).map(|t| t.v).collect()
    }

    /// Live triangles that do not touch the super-triangle.
    pub fn inner_triangles(&self) -> Vec<[usize; 3]> {
        self.tris
            .iter()
            .filter(|t| t.alive && t.v.iter().all(|&v| v >= SUPER_VERTICES))
            .map(|t| t.v)
            .collect()
    }

    /// Distinct edges of the live triangles, in storage order.
    pub fn edges(&self) -> Vec<(usize, usize)> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for t in self.tris.iter().filter(|t| t.alive) {
            for i in 0..3 {
                let (a, b) = t.edge(i);
                if seen.insert(key(a, b)) {
                    out.push((a, b));
                }
            }
        }
        out
    }

    fn contains(&self, t: usize, p: Point2) -> bool {
        let tri = &self.tris[t];
        (0..3).all(|i| {
            let (a, b) = tri.edge(i);
            orient(self.points[a], self.points[b], p) >= 0.0
        })
    }

    /// Live triangle containing `p` (boundary included).
    fn locate(&self, p: Point2) -> Option<usize> {
        let start = if self.tris.get(self.hint).is_some_and(|t| t.alive) {
            Some(self.hint)
        } else {
            self.tris.iter().position(|t| t.alive)
        };
        if let Some(mut t) = start {
            'walk: for _ in 0..self.tris.len() {
                let tri = &self.tris[t];
                for i in 0..3 {
                    let (a, b) = tri.edge(i);
                    if orient(self.points[a], self.points[b], p) < 0.0 {
                        match tri.n[i] {
                            Some(nb) => {
                                t = nb;
                                continue 'walk;
                            }
                            None => break 'walk,
                        }
                    }
                }
                return Some(t);
            }
        }
        (0..self.tris.len()).find(|&t| self.tris[t].alive && self.contains(t, p))
    }

    /// Insert `p`. Returns its index, the index of an identical existing point,
    /// or `None` when `p` is outside the triangulation or would create a
    /// degenerate triangle (e.g. on a constrained edge).
    pub fn insert(&mut self, p: Point2) -> Option<usize> {
        let t0 = self.locate(p)?;
        if let Some(&v) = self.tris[t0].v.iter().find(|&&v| self.points[v] == p) {
            return Some(v);
        }

        let mut cavity = BTreeSet::from([t0]);
        let mut stack = vec![t0];
        while let Some(t) = stack.pop() {
            for i in 0..3 {
                let Some(nb) = self.tris[t].n[i] else { continue };
                if cavity.contains(&nb) {
                    continue;
                }
                let (a, b) = self.tris[t].edge(i);
                if self.is_constrained(a, b) {
                    continue;
                }
                let [x, y, z] = self.tris[nb].v.map(|k| self.points[k]);
                if in_circle(x, y, z, p) > 0.0 {
                    cavity.insert(nb);
                    stack.push(nb);
                }
            }
        }

        let mut boundary = Vec::new();
        for &t in &cavity {
            for i in 0..3 {
                let nb = self.tris[t].n[i];
                if nb.is_none_or(|nb| !cavity.contains(&nb)) {
                    let (a, b) = self.tris[t].edge(i);
                    boundary.push((a, b, nb));
                }
            }
        }
        if boundary
            .iter()
            .any(|&(a, b, _)| orient(self.points[a], self.points[b], p) <= 0.0)
        {
            return None;
        }

        let pi = self.points.len();
        self.points.push(p);
        for &t in &cavity {
            self.tris[t].alive = false;
        }
        let mut first = HashMap::new();
        let mut second = HashMap::new();
        let mut created = Vec::with_capacity(boundary.len());
        for &(a, b, nb) in &boundary {
            let ti = self.tris.len();
            self.tris.push(Tri {
                v: [a, b, pi],
                n: [None, None, nb],
                alive: true,
            });
            created.push(ti);
            first.insert(a, ti);
            second.insert(b, ti);
            if let Some(nb) = nb {
                self.relink(nb, b, a, ti);
            }
        }
        for &ti in &created {
            let [a, b, _] = self.tris[ti].v;
            self.tris[ti].n[0] = first.get(&b).copied();
            self.tris[ti].n[1] = second.get(&a).copied();
        }
        self.hint = created[0];
        Some(pi)
    }

    /// In `t`, point the edge `a -> b` at `to`.
    fn relink(&mut self, t: usize, a: usize, b: usize, to: usize) {
        let tri = &mut self.tris[t];
        for j in 0..3 {
            if tri.v[(j + 1) % 3] == a && tri.v[(j + 2) % 3] == b {
                tri.n[j] = Some(to);
            }
        }
    }

    fn replace_neighbor(&mut self, t: Option<usize>, old: usize, new: usize) {
        if let Some(t) = t {
            for n in &mut self.tris[t].n {
                if *n == Some(old) {
                    *n = Some(new);
                }
            }
        }
    }

    /// Flip the edge opposite `v[i1]` of `t1` if the quadrilateral is strictly
    /// convex and the edge is not constrained.
    fn try_flip(&mut self, t1: usize, i1: usize) -> bool {
        let Some(t2) = self.tris[t1].n[i1] else {
            return false;
        };
        let Some(i2) = (0..3).find(|&j| self.tris[t2].n[j] == Some(t1)) else {
            return false;
        };
        let w1 = self.tris[t1].v[i1];
        let u = self.tris[t1].v[(i1 + 1) % 3];
        let v = self.tris[t1].v[(i1 + 2) % 3];
        let w2 = self.tris[t2].v[i2];
        if self.is_constrained(u, v) {
            return false;
        }
        let [pw1, pu, pv, pw2] = [w1, u, v, w2].map(|k| self.points[k]);
        if orient(pw1, pu, pw2) <= 0.0 || orient(pw2, pv, pw1) <= 0.0 {
            return false;
        }
        let a = self.tris[t1].n[(i1 + 1) % 3];
        let b = self.tris[t1].n[(i1 + 2) % 3];
        let c = self.tris[t2].n[(i2 + 1) % 3];
        let d = self.tris[t2].n[(i2 + 2) % 3];
        self.tris[t1].v = [w1, u, w2];
        self.tris[t1].n = [c, Some(t2), b];
        self.tris[t2].v = [w2, v, w1];
        self.tris[t2].n = [a, Some(t1), d];
        self.replace_neighbor(c, t2, t1);
        self.replace_neighbor(a, t1, t2);
        true
    }

    fn has_edge(&self, a: usize, b: usize) -> bool {
        self.tris.iter().any(|t| {
            t.alive && (0..3).any(|i| key(t.edge(i).0, t.edge(i).1) == key(a, b))
        })
    }

    /// Live (triangle, edge) pairs whose edge properly crosses segment `ab`.
    fn crossing_edges(&self, a: usize, b: usize) -> Vec<(usize, usize)> {
        let (pa, pb) = (self.points[a], self.points[b]);
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for (t, tri) in self.tris.iter().enumerate().filter(|(_, t)| t.alive) {
            for i in 0..3 {
                let (u, v) = tri.edge(i);
                if u == a || u == b || v == a || v == b || !seen.insert(key(u, v)) {
                    continue;
                }
                let (pu, pv) = (self.points[u], self.points[v]);
                if orient(pa, pb, pu) * orient(pa, pb, pv) < 0.0
                    && orient(pu, pv, pa) * orient(pu, pv, pb) < 0.0
                {
                    out.push((t, i));
                }
            }
        }
        out
    }

    /// Make `ab` an edge of the triangulation and mark it constrained.
    ///
    /// Fails when another constraint crosses the segment, a vertex lies on it,
    /// or flips cannot make progress.
    pub fn insert_segment(&mut self, a: usize, b: usize) -> Result<(), String> {
        if a == b {
            return Err(format!("zero-length segment at vertex {a}"));
        }
        let limit = 16 + 4 * self.tris.len();
        for _ in 0..limit {
            if self.has_edge(a, b) {
                self.constrained.insert(key(a, b));
                return Ok(());
            }
            let crossing = self.crossing_edges(a, b);
            if crossing.is_empty() {
                return Err(format!("segment {a}-{b} passes through a vertex"));
            }
            let mut progress = false;
            for (t, i) in crossing {
                let (u, v) = self.tris[t].edge(i);
                if self.is_constrained(u, v) {
                    return Err(format!("segment {a}-{b} crosses constraint {u}-{v}"));
                }
                // earlier flips in this sweep may have moved the edge
                if self.tris[t].alive && self.tris[t].edge(i) == (u, v) && self.try_flip(t, i) {
                    progress = true;
                }
            }
            if !progress {
                break;
            }
        }
        Err(format!("cannot recover segment {a}-{b}"))
    }

    /// Remove every triangle outside the constrained boundary; holes count as
    /// outside. Returns the number of triangles removed.
    pub fn remove_exterior(&mut self) -> usize {
        let mut depth: Vec<Option<usize>> = vec![None; self.tris.len()];
        let mut queue = VecDeque::new();
        for (t, tri) in self.tris.iter().enumerate() {
            if tri.alive && (tri.v.iter().any(|&v| v < SUPER_VERTICES) || tri.n.contains(&None)) {
                depth[t] = Some(0);
                queue.push_back(t);
            }
        }
        while let Some(t) = queue.pop_front() {
            let Some(d) = depth[t] else { continue };
            for i in 0..3 {
                let Some(nb) = self.tris[t].n[i] else { continue };
                let (a, b) = self.tris[t].edge(i);
                let nd = if self.is_constrained(a, b) { d + 1 } else { d };
                if depth[nb].is_none_or(|old| nd < old) {
                    depth[nb] = Some(nd);
                    if nd == d {
                        queue.push_front(nb);
                    } else {
                        queue.push_back(nb);
                    }
                }
            }
        }
        let mut removed = 0;
        for t in 0..self.tris.len() {
            if self.tris[t].alive && depth[t].is_none_or(|d| d % 2 == 0) {
                self.tris[t].alive = false;
                removed += 1;
            }
        }
        for t in 0..self.tris.len() {
            if !self.tris[t].alive {
                continue;
            }
            for i in 0..3 {
                if self.tris[t].n[i].is_some_and(|nb| !self.tris[nb].alive) {
                    self.tris[t].n[i] = None;
                }
            }
        }
        removed
    }

    /// Flip unconstrained edges until every one is locally Delaunay. Returns
    /// the number of flips.
    pub fn make_delaunay(&mut self) -> usize {
        let mut flips = 0;
        let limit = 8 * self.tris.len() + 16;
        loop {
            let mut changed = false;
            for t in 0..self.tris.len() {
                if !self.tris[t].alive {
                    continue;
                }
                for i in 0..3 {
                    let Some(nb) = self.tris[t].n[i] else { continue };
                    let (a, b) = self.tris[t].edge(i);
                    if self.is_constrained(a, b) {
                        continue;
                    }
                    let Some(j) = (0..3).find(|&j| self.tris[nb].n[j] == Some(t)) else {
                        continue;
                    };
                    let [x, y, z] = self.tris[t].v.map(|k| self.points[k]);
                    let w = self.points[self.tris[nb].v[j]];
                    if in_circle(x, y, z, w) > 0.0 && self.try_flip(t, i) {
                        flips += 1;
                        changed = true;
                        break;
                    }
                }
            }
            if !changed || flips > limit {
                return flips;
            }
        }
    }

    /// Whether every unconstrained interior edge is locally Delaunay.
    pub fn is_delaunay(&self) -> bool {
        self.tris.iter().enumerate().filter(|(_, t)| t.alive).all(|(t, tri)| {
            (0..3).all(|i| {
                let Some(nb) = tri.n[i] else { return true };
                let (a, b) = tri.edge(i);
                if self.is_constrained(a, b) {
                    return true;
                }
                let Some(j) = (0..3).find(|&j| self.tris[nb].n[j] == Some(t)) else {
                    return false;
                };
                let [x, y, z] = tri.v.map(|k| self.points[k]);
                in_circle(x, y, z, self.points[self.tris[nb].v[j]]) <= 0.0
            })
        })
    }

    /// Check neighbour symmetry and counter-clockwise orientation.
    pub fn check_consistency(&self) -> Result<(), String> {
        for (t, tri) in self.tris.iter().enumerate().filter(|(_, t)| t.alive) {
            let [a, b, c] = tri.v.map(|k| self.points[k]);
            if orient(a, b, c) <= 0.0 {
                return Err(format!("triangle {t} {:?} is not counter-clockwise", tri.v));
            }
            for i in 0..3 {
                let Some(nb) = tri.n[i] else { continue };
                let other = &self.tris[nb];
                let (u, v) = tri.edge(i);
                let mirrored = (0..3).any(|j| other.n[j] == Some(t) && other.edge(j) == (v, u));
                if !other.alive || !mirrored {
                    return Err(format!("triangle {t} edge {u}-{v} has a broken link to {nb}"));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn square(n: usize) -> (Triangulation, Vec<usize>) {
        let mut tr = Triangulation::new([0.0, 0.0], [1.0, 1.0]);
        let mut loop_pts = Vec::new();
        for k in 0..n {
            loop_pts.push([k as f64 / n as f64, 0.0]);
        }
        for k in 0..n {
            loop_pts.push([1.0, k as f64 / n as f64]);
        }
        for k in 0..n {
            loop_pts.push([1.0 - k as f64 / n as f64, 1.0]);
        }
        for k in 0..n {
            loop_pts.push([0.0, 1.0 - k as f64 / n as f64]);
        }
        let ids: Vec<usize> = loop_pts.iter().map(|&p| tr.insert(p).unwrap()).collect();
        for i in 0..ids.len() {
            tr.insert_segment(ids[i], ids[(i + 1) % ids.len()]).unwrap();
        }
        (tr, ids)
    }

    #[test]
    fn unit_square_two_triangles() {
        let (mut tr, _) = square(1);
        tr.check_consistency().unwrap();
        tr.remove_exterior();
        assert_eq!(tr.triangles().len(), 2);
        tr.check_consistency().unwrap();
    }

    #[test]
    fn euler_count_after_interior_insertions() {
        let (mut tr, ids) = square(4);
        tr.remove_exterior();
        for p in [[0.3, 0.3], [0.6, 0.4], [0.5, 0.8]] {
            tr.insert(p).unwrap();
        }
        // T = 2 I + B - 2
        assert_eq!(tr.triangles().len(), 2 * 3 + ids.len() - 2);
        assert!(tr.is_delaunay());
        tr.check_consistency().unwrap();
        assert_eq!(tr.insert([2.0, 2.0]), None);
        assert_eq!(tr.insert([0.3, 0.3]), Some(ids.len() + SUPER_VERTICES));
    }

    #[test]
    fn points_on_constraints_are_rejected() {
        let (mut tr, _) = square(2);
        tr.remove_exterior();
        assert_eq!(tr.insert([0.25, 0.0]), None);
    }

    #[test]
    fn concave_l_shape_keeps_the_notch_empty() {
        let pts = [
            [0.0, 0.0],
            [2.0, 0.0],
            [2.0, 1.0],
            [1.0, 1.0],
            [1.0, 2.0],
            [0.0, 2.0],
        ];
        let mut tr = Triangulation::new([0.0, 0.0], [2.0, 2.0]);
        let ids: Vec<usize> = pts.iter().map(|&p| tr.insert(p).unwrap()).collect();
        for i in 0..ids.len() {
            tr.insert_segment(ids[i], ids[(i + 1) % ids.len()]).unwrap();
        }
        tr.remove_exterior();
        let area: f64 = tr
            .triangles()
            .iter()
            .map(|t| 0.5 * orient(tr.point(t[0]), tr.point(t[1]), tr.point(t[2])))
            .sum();
        assert!((area - 3.0).abs() < 1e-12);
        assert_eq!(tr.triangles().len(), 4);
    }

    #[test]
    fn hole_is_removed() {
        let outer = [[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 4.0]];
        let hole = [[1.0, 1.0], [1.0, 3.0], [3.0, 3.0], [3.0, 1.0]];
        let mut tr = Triangulation::new([0.0, 0.0], [4.0, 4.0]);
        for ring in [&outer, &hole] {
            let ids: Vec<usize> = ring.iter().map(|&p| tr.insert(p).unwrap()).collect();
            for i in 0..ids.len() {
                tr.insert_segment(ids[i], ids[(i + 1) % ids.len()]).unwrap();
            }
        }
        tr.remove_exterior();
        let area: f64 = tr
            .triangles()
            .iter()
            .map(|t| 0.5 * orient(tr.point(t[0]), tr.point(t[1]), tr.point(t[2])))
            .sum();
        assert!((area - 12.0).abs() < 1e-12);
    }

    #[test]
    fn segment_recovery_by_flips() {
        // a thin diamond whose long diagonal is not Delaunay
        let mut tr = Triangulation::new([-1.0, -1.0], [1.0, 1.0]);
        let a = tr.insert([-1.0, 0.0]).unwrap();
        let b = tr.insert([1.0, 0.0]).unwrap();
        tr.insert([0.0, 0.2]).unwrap();
        tr.insert([0.0, -0.2]).unwrap();
        tr.insert_segment(a, b).unwrap();
        assert!(tr.is_constrained(a, b));
        tr.check_consistency().unwrap();
        tr.make_delaunay();
        assert!(tr.has_edge(a, b));
    }

    proptest! {
        #[test]
        fn random_points_stay_consistent(pts in prop::collection::vec((0.01f64..0.99, 0.01f64..0.99), 1..60)) {
            let (mut tr, ids) = square(3);
            tr.remove_exterior();
            let mut inserted = HashSet::new();
            for (x, y) in pts {
                if let Some(i) = tr.insert([x, y]) {
                    inserted.insert(i);
                }
            }
            prop_assert!(tr.check_consistency().is_ok());
            prop_assert!(tr.is_delaunay());
            prop_assert_eq!(tr.triangles().len(), 2 * inserted.len() + ids.len() - 2);
        }
    }
}
