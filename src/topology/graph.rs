//! `TopologyGraph`: the deduplicated DAG of a CAD model's shapes.
//!
//! The graph is built once by walking the shape hierarchy one kind at a time,
//! from compounds down to vertices. A shape met for the first time becomes a
//! new cell with the next id; meeting it again through another parent only adds
//! a link. Ids are therefore contiguous per kind and the arena index of a cell
//! is `id - 1`.
//!
//! After construction the topology and ids never change. Discretizations are
//! the only mutable payload of a cell.

use crate::cad::{Shape, ShapeExplorer, ShapeKey, ShapeKind};
use crate::data::discretization::Discretization;
use crate::data::submesh::SubmeshId;
use crate::debug_invariants::DebugInvariants;
use crate::mesh_error::BoraError;
use crate::topology::cache::InvalidateCache;
use crate::topology::cell::{CellId, TopologyCell};
use crate::topology::orientation::Orientation;
use itertools::Itertools;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::Write as _;

#[derive(Debug)]
pub struct TopologyGraph {
    cells: Vec<TopologyCell>,
    by_shape: HashMap<ShapeKey, CellId>,
    root: CellId,
}

impl TopologyGraph {
    /// Build the graph of `root` and everything below it.
    ///
    /// # Errors
    /// `Geometry` if a shape links to a child the explorer cannot reach
    /// (malformed hierarchy).
    pub fn build(root: &Shape) -> Result<Self, BoraError> {
        let mut cells: Vec<TopologyCell> = Vec::new();
        let mut by_shape = HashMap::new();
        for kind in ShapeKind::TOP_DOWN {
            for s in ShapeExplorer::new(root, kind) {
                if by_shape.contains_key(&s.key()) {
                    continue;
                }
                let raw = u32::try_from(cells.len() + 1)
                    .map_err(|_| BoraError::Geometry("too many shapes".into()))?;
                let id = CellId::new(raw)?;
                by_shape.insert(s.key(), id);
                cells.push(TopologyCell::new(id, &s));
            }
        }

        for idx in 0..cells.len() {
            let parent = cells[idx].id;
            let shape = cells[idx].shape.clone();
            for child in shape.children() {
                let cid = *by_shape.get(&child.key()).ok_or_else(|| {
                    BoraError::Geometry(format!("{child:?} is unreachable from the root"))
                })?;
                cells[idx].children.push((cid, child.orientation()));
                let c = &mut cells[cid.index()];
                if !c.parents.contains(&parent) {
                    c.parents.push(parent);
                }
            }
        }

        let root = *by_shape
            .get(&root.key())
            .ok_or_else(|| BoraError::Geometry("empty model".into()))?;
        let graph = TopologyGraph {
            cells,
            by_shape,
            root,
        };
        log::debug!(
            "topology graph: {} cells ({} faces, {} edges, {} vertices)",
            graph.len(),
            graph.cells_of_kind(ShapeKind::Face).len(),
            graph.cells_of_kind(ShapeKind::Edge).len(),
            graph.cells_of_kind(ShapeKind::Vertex).len()
        );
        crate::debug_invariants!(graph.validate_invariants(), "TopologyGraph::build");
        Ok(graph)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn root(&self) -> CellId {
        self.root
    }

    pub fn root_cell(&self) -> &TopologyCell {
        &self.cells[self.root.index()]
    }

    /// Cell by id, in constant time.
    pub fn get_by_id(&self, id: CellId) -> Result<&TopologyCell, BoraError> {
        self.cells.get(id.index()).ok_or(BoraError::UnknownCell(id))
    }

    pub(crate) fn get_mut(&mut self, id: CellId) -> Result<&mut TopologyCell, BoraError> {
        self.cells.get_mut(id.index()).ok_or(BoraError::UnknownCell(id))
    }

    /// Cell representing `shape` (any orientation).
    pub fn cell_of(&self, shape: &Shape) -> Option<CellId> {
        self.by_shape.get(&shape.key()).copied()
    }

    /// All cells, by increasing id.
    pub fn cells(&self) -> impl Iterator<Item = &TopologyCell> {
        self.cells.iter()
    }

    /// Every distinct cell of `kind`, by increasing id.
    pub fn cells_of_kind(&self, kind: ShapeKind) -> Vec<CellId> {
        self.cells
            .iter()
            .filter(|c| c.kind() == kind)
            .map(|c| c.id)
            .collect()
    }

    /// Descendants of `cell` of `kind` with the orientation accumulated from
    /// `cell`. A shared cell appears once per distinct orientation.
    pub fn shapes_explorer(
        &self,
        cell: CellId,
        kind: ShapeKind,
    ) -> Result<Vec<(CellId, Orientation)>, BoraError> {
        self.get_by_id(cell)?;
        let mut out = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![(cell, Orientation::Forward)];
        while let Some((c, o)) = stack.pop() {
            if !visited.insert((c, o)) {
                continue;
            }
            let node = &self.cells[c.index()];
            if node.kind() == kind {
                out.push((c, o));
                continue;
            }
            if node.kind() > kind {
                continue;
            }
            for &(child, co) in node.children.iter().rev() {
                stack.push((child, o.then(co)));
            }
        }
        Ok(out)
    }

    /// Distinct descendants of `cell` of `kind`, each once, in discovery order.
    pub fn unique_shapes_explorer(
        &self,
        cell: CellId,
        kind: ShapeKind,
    ) -> Result<Vec<CellId>, BoraError> {
        let mut seen = HashSet::new();
        Ok(self
            .shapes_explorer(cell, kind)?
            .into_iter()
            .filter_map(|(c, _)| seen.insert(c).then_some(c))
            .collect())
    }

    /// `cell` followed by every distinct cell below it, depth first.
    pub fn closure(&self, cell: CellId) -> Result<Vec<CellId>, BoraError> {
        self.get_by_id(cell)?;
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut stack = vec![cell];
        while let Some(c) = stack.pop() {
            if !seen.insert(c) {
                continue;
            }
            out.push(c);
            for &(child, _) in self.cells[c.index()].children.iter().rev() {
                stack.push(child);
            }
        }
        Ok(out)
    }

    /// Every distinct cell above `cell`, nearest first.
    pub fn ancestors(&self, cell: CellId) -> Result<Vec<CellId>, BoraError> {
        self.get_by_id(cell)?;
        let mut seen = HashSet::from([cell]);
        let mut out = Vec::new();
        let mut queue = VecDeque::from([cell]);
        while let Some(c) = queue.pop_front() {
            for &p in &self.cells[c.index()].parents {
                if seen.insert(p) {
                    out.push(p);
                    queue.push_back(p);
                }
            }
        }
        Ok(out)
    }

    /// The discretization of `cell` serving `submesh`, if any.
    pub fn get_discretization_submesh(
        &self,
        cell: CellId,
        submesh: SubmeshId,
    ) -> Option<&Discretization> {
        self.cells.get(cell.index())?.discretization_for(submesh)
    }

    /// Every discretization in the graph, cells by increasing id.
    pub fn discretizations(&self) -> impl Iterator<Item = &Discretization> {
        self.cells.iter().flat_map(|c| c.discretizations.iter())
    }

    /// Drop every discretization (phase 1 rebuilds them).
    pub(crate) fn clear_discretizations(&mut self) {
        for c in &mut self.cells {
            c.discretizations.clear();
        }
    }

    /// Text dump: one line per cell with its parents and oriented children.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for c in &self.cells {
            let _ = write!(out, "{} {} {:?}", c.kind(), c.id, c.shape);
            if !c.parents.is_empty() {
                let _ = write!(out, " parents=[{}]", c.parents.iter().join(","));
            }
            if !c.children.is_empty() {
                let children = c.children.iter().map(|(id, o)| format!("{o}{id}"));
                let _ = write!(out, " children=[{}]", children.format(","));
            }
            out.push('\n');
        }
        out
    }
}

impl InvalidateCache for TopologyGraph {
    fn invalidate_cache(&mut self) {
        for c in &mut self.cells {
            c.discretizations.as_mut_slice().invalidate_cache();
        }
    }
}

impl DebugInvariants for TopologyGraph {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "TopologyGraph");
    }

    fn validate_invariants(&self) -> Result<(), BoraError> {
        if self.by_shape.len() != self.cells.len() {
            return Err(BoraError::InvariantViolation(format!(
                "{} shapes for {} cells",
                self.by_shape.len(),
                self.cells.len()
            )));
        }
        let mut prev_kind = ShapeKind::Compound;
        for (i, c) in self.cells.iter().enumerate() {
            if c.id.index() != i {
                return Err(BoraError::InvariantViolation(format!(
                    "cell {} stored at slot {i}",
                    c.id
                )));
            }
            if self.by_shape.get(&c.shape.key()) != Some(&c.id) {
                return Err(BoraError::InvariantViolation(format!(
                    "cell {} is not the representative of its shape",
                    c.id
                )));
            }
            if c.kind() < prev_kind {
                return Err(BoraError::InvariantViolation(format!(
                    "ids are not contiguous per kind at cell {}",
                    c.id
                )));
            }
            prev_kind = c.kind();
            for &(child, _) in &c.children {
                let ch = self.get_by_id(child)?;
                if child <= c.id {
                    return Err(BoraError::InvariantViolation(format!(
                        "link {} -> {child} goes upwards",
                        c.id
                    )));
                }
                if !ch.parents.contains(&c.id) {
                    return Err(BoraError::InvariantViolation(format!(
                        "cell {child} misses parent {}",
                        c.id
                    )));
                }
            }
            for &p in &c.parents {
                if !self.get_by_id(p)?.children.iter().any(|&(ch, _)| ch == c.id) {
                    return Err(BoraError::InvariantViolation(format!(
                        "cell {p} misses child {}",
                        c.id
                    )));
                }
            }
        }
        Ok(())
    }
}
