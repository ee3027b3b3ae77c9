//! `Model`: topology, submeshes and the two-phase meshing pipeline.
//!
//! Phase 1 ([`Model::compute_constraints`]) turns the constraints of every
//! submesh into discretizations: each meshed cell reachable from a constraint
//! gets one effective hypothesis per submesh, and submeshes that agree on it
//! share one discretization.
//!
//! Phase 2 ([`Model::compute`]) meshes pending discretizations level by level,
//! vertices first and solids last, so that every algorithm finds its
//! boundary already meshed.

use crate::algs::{AlgoContext, Algorithm, CancelToken, MeshAlgorithm, ToolRegistry};
use crate::cad::{Shape, ShapeKind};
use crate::config::MesherConfig;
use crate::data::constraint::Constraint;
use crate::data::discretization::{Discretization, DiscretizationId};
use crate::data::hypothesis::Hypothesis;
use crate::data::submesh::{Submesh, SubmeshId};
use crate::io::{MemoryStore, MeshStore};
use crate::mesh_error::BoraError;
use crate::topology::cache::InvalidateCache;
use crate::topology::cell::CellId;
use crate::topology::graph::TopologyGraph;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Write as _;
use std::sync::Arc;

/// One discretization meshed by a `compute` call.
#[derive(Clone, Debug, PartialEq)]
pub struct ComputedUnit {
    pub id: DiscretizationId,
    pub kind: ShapeKind,
    pub algorithm: &'static str,
}

/// Outcome of [`Model::compute`]: meshed units in execution order and the
/// recoverable failures left behind.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ComputeReport {
    pub computed: Vec<ComputedUnit>,
    pub failures: Vec<(DiscretizationId, BoraError)>,
    pub cancelled: bool,
}

impl ComputeReport {
    /// Every discretization is meshed.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }

    /// Failure recorded for `id` in this run, if any.
    pub fn failure(&self, id: DiscretizationId) -> Option<&BoraError> {
        self.failures.iter().find(|(d, _)| *d == id).map(|(_, e)| e)
    }
}

enum UnitOutcome {
    Meshed(&'static str),
    Failed(BoraError),
    Cancelled,
}

/// A CAD shape with its topology graph, submeshes and discretizations.
///
/// Topology and cell ids are fixed at construction; constraints and meshes
/// are the mutable state.
pub struct Model {
    graph: TopologyGraph,
    submeshes: Vec<Submesh>,
    config: MesherConfig,
    tools: ToolRegistry,
    store: Arc<dyn MeshStore>,
    cancel: CancelToken,
    dirty: bool,
}

impl Model {
    /// Build the topology of `shape`.
    ///
    /// # Errors
    /// `Configuration` for an invalid `config`, `Geometry` for a malformed
    /// shape hierarchy.
    pub fn new(
        shape: &Shape,
        config: MesherConfig,
        store: Arc<dyn MeshStore>,
    ) -> Result<Self, BoraError> {
        config.validate()?;
        let graph = TopologyGraph::build(shape)?;
        log::info!("model: {} topology cells", graph.len());
        Ok(Model {
            graph,
            submeshes: Vec::new(),
            tools: ToolRegistry::new(&config),
            config,
            store,
            cancel: CancelToken::new(),
            dirty: false,
        })
    }

    /// Model with the default configuration and an in-memory store.
    pub fn with_defaults(shape: &Shape) -> Result<Self, BoraError> {
        Self::new(shape, MesherConfig::default(), Arc::new(MemoryStore::new()))
    }

    /// Topology graph of the meshed shape.
    pub fn graph(&self) -> &TopologyGraph {
        &self.graph
    }

    /// Configuration the model was built with.
    pub fn config(&self) -> &MesherConfig {
        &self.config
    }

    /// External mesher registry, checked lazily.
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Store receiving face and solid meshes.
    pub fn store(&self) -> &Arc<dyn MeshStore> {
        &self.store
    }

    /// Cell representing `shape`.
    pub fn cell_of(&self, shape: &Shape) -> Option<CellId> {
        self.graph.cell_of(shape)
    }

    /// Token that stops running external tools and the remaining levels of
    /// the current `compute`. A cancel request is consumed by the `compute`
    /// it stops; interrupted units stay pending and the next `compute`
    /// resumes them.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Create an empty submesh.
    pub fn new_submesh(&mut self) -> SubmeshId {
        let id = SubmeshId(self.submeshes.len() as u32);
        self.submeshes.push(Submesh::new(id));
        id
    }

    /// Submeshes in creation order.
    pub fn submeshes(&self) -> &[Submesh] {
        &self.submeshes
    }

    /// Submesh `id`, or `UnknownSubmesh`.
    pub fn submesh(&self, id: SubmeshId) -> Result<&Submesh, BoraError> {
        self.submeshes
            .get(id.get() as usize)
            .ok_or(BoraError::UnknownSubmesh(id))
    }

    /// Add `constraint` to `submesh`. Returns `false` if it was already there.
    ///
    /// # Errors
    /// `UnknownSubmesh`, `UnknownCell`, or `Configuration` when the element
    /// has a higher dimension than the constrained cell.
    pub fn add_constraint(
        &mut self,
        submesh: SubmeshId,
        constraint: Constraint,
    ) -> Result<bool, BoraError> {
        self.submesh(submesh)?;
        let kind = self.graph.get_by_id(constraint.cell())?.kind();
        let element = constraint.hypothesis().element();
        if let Some(dim) = kind.dimension() {
            if element.dimension() > dim {
                return Err(BoraError::Configuration(format!(
                    "{element} cannot discretize {kind} {}",
                    constraint.cell()
                )));
            }
        }
        log::debug!("{submesh}: add {constraint}");
        let added = self.submeshes[submesh.get() as usize].add(constraint);
        self.dirty |= added;
        Ok(added)
    }

    /// Remove `constraint` from `submesh`. Returns `false` if it was absent.
    pub fn remove_constraint(
        &mut self,
        submesh: SubmeshId,
        constraint: &Constraint,
    ) -> Result<bool, BoraError> {
        self.submesh(submesh)?;
        let removed = self.submeshes[submesh.get() as usize].remove(constraint);
        self.dirty |= removed;
        Ok(removed)
    }

    /// Effective constraint of `submesh` on `cell`, or `None` when no
    /// constraint reaches the cell.
    fn effective(&self, submesh: &Submesh, cell: CellId) -> Result<Option<Constraint>, BoraError> {
        let kind = self.graph.get_by_id(cell)?.kind();
        let direct: Vec<&Constraint> = submesh
            .constraints_on(cell)
            .filter(|c| c.hypothesis().inherited(kind).is_some())
            .collect();
        match direct.as_slice() {
            [only] => return Ok(Some((*only).clone())),
            [a, b, ..] => {
                return Err(BoraError::Configuration(format!(
                    "{}: conflicting constraints on {kind} {cell}: {a} and {b}",
                    submesh.id()
                )));
            }
            [] => {}
        }
        let mut found: Option<(Constraint, Hypothesis)> = None;
        for ancestor in self.graph.ancestors(cell)? {
            for c in submesh.constraints_on(ancestor) {
                let Some(h) = c.hypothesis().inherited(kind) else {
                    continue;
                };
                found = Some(match found {
                    None => (c.clone(), h),
                    Some((first, acc)) => (first, acc.combine(&h)?),
                });
            }
        }
        Ok(found.map(|(first, h)| first.derived(cell, h)))
    }

    /// Phase 1: rebuild every discretization from the constraints.
    ///
    /// Submeshes share a discretization of a cell when they agree on its
    /// effective hypothesis and on the discretizations of every meshed cell
    /// below it.
    ///
    /// # Errors
    /// `Configuration` for conflicting constraints.
    pub fn compute_constraints(&mut self) -> Result<(), BoraError> {
        let mut per_cell: BTreeMap<CellId, Vec<(SubmeshId, Constraint)>> = BTreeMap::new();
        for submesh in &self.submeshes {
            let mut reached = BTreeSet::new();
            for c in submesh.constraints() {
                reached.extend(self.graph.closure(c.cell())?);
            }
            for cell in reached {
                if !self.graph.get_by_id(cell)?.kind().is_meshed() {
                    continue;
                }
                if let Some(c) = self.effective(submesh, cell)? {
                    per_cell.entry(cell).or_default().push((submesh.id(), c));
                }
            }
        }

        self.graph.clear_discretizations();
        // group of the discretization serving each (cell, submesh)
        let mut groups: HashMap<(CellId, SubmeshId), u32> = HashMap::new();
        let mut total = 0;
        // descendants carry larger ids, so their groups are settled first
        for (cell, entries) in per_cell.into_iter().rev() {
            let kind = self.graph.get_by_id(cell)?.kind();
            let boundary = self.meshed_boundary(cell, kind)?;
            let mut classes: Vec<(Constraint, Vec<Option<u32>>, Vec<SubmeshId>)> = Vec::new();
            for (submesh, c) in entries {
                let key: Vec<Option<u32>> = boundary
                    .iter()
                    .map(|&b| groups.get(&(b, submesh)).copied())
                    .collect();
                match classes
                    .iter_mut()
                    .find(|(r, k, _)| r.hypothesis() == c.hypothesis() && *k == key)
                {
                    Some((_, _, subs)) => subs.push(submesh),
                    None => classes.push((c, key, vec![submesh])),
                }
            }
            if classes.len() > 1 {
                log::debug!("{kind} {cell}: {} discretizations", classes.len());
            }
            let node = self.graph.get_mut(cell)?;
            for (group, (constraint, _, subs)) in classes.into_iter().enumerate() {
                let id = DiscretizationId {
                    cell,
                    group: group as u32,
                };
                for &s in &subs {
                    groups.insert((cell, s), id.group);
                }
                node.discretizations_mut()
                    .push(Discretization::new(id, kind, constraint, subs));
                total += 1;
            }
        }
        self.dirty = false;
        log::info!(
            "constraints: {total} discretizations over {} submeshes",
            self.submeshes.len()
        );
        Ok(())
    }

    /// Meshed cells below `cell`, each once, lowest dimension first.
    fn meshed_boundary(&self, cell: CellId, kind: ShapeKind) -> Result<Vec<CellId>, BoraError> {
        let mut out = Vec::new();
        for lower in ShapeKind::MESHED_BOTTOM_UP.into_iter().filter(|&k| k > kind) {
            out.extend(self.graph.unique_shapes_explorer(cell, lower)?);
        }
        Ok(out)
    }

    /// The discretization with `id`, if phase 1 created it.
    pub fn discretization(&self, id: DiscretizationId) -> Option<&Discretization> {
        self.graph
            .get_by_id(id.cell)
            .ok()?
            .discretizations()
            .get(id.group as usize)
    }

    fn context(&self) -> AlgoContext<'_> {
        AlgoContext {
            graph: &self.graph,
            config: &self.config,
            tools: &self.tools,
            store: self.store.as_ref(),
            cancel: &self.cancel,
        }
    }

    /// Mesh one discretization through its latch. Recoverable failures are
    /// returned as an outcome, fatal ones as `Err`.
    fn run_unit(ctx: &AlgoContext<'_>, disc: &Discretization) -> Result<UnitOutcome, BoraError> {
        if ctx.cancel.is_cancelled() {
            return Ok(UnitOutcome::Cancelled);
        }
        let element = disc.hypothesis().element();
        let algorithm = Algorithm::select(disc.kind(), element, ctx.config);
        let name = algorithm.map_or("none", |a| a.name());
        let result = disc.compute_once(|| {
            let algorithm = algorithm.ok_or_else(|| BoraError::AlgorithmUnavailable {
                cell: disc.cell(),
                reason: format!("no algorithm for {element} on {}", disc.kind()),
            })?;
            if !algorithm.is_available(ctx.tools) {
                return Err(BoraError::AlgorithmUnavailable {
                    cell: disc.cell(),
                    reason: format!("{algorithm} is not installed"),
                });
            }
            log::debug!("{algorithm}: {disc}");
            algorithm.compute(ctx, disc)
        });
        match result {
            Ok(_) => Ok(UnitOutcome::Meshed(name)),
            Err(BoraError::Cancelled { .. }) => Ok(UnitOutcome::Cancelled),
            Err(e) if e.is_recoverable() => {
                log::warn!("{} failed: {e}", disc.id());
                Ok(UnitOutcome::Failed(e))
            }
            Err(e) => Err(e),
        }
    }

    #[cfg(feature = "rayon")]
    fn run_level(
        &self,
        pending: &[&Discretization],
    ) -> Vec<Result<UnitOutcome, BoraError>> {
        let ctx = self.context();
        if self.config.parallel {
            use rayon::prelude::*;
            pending.par_iter().map(|d| Self::run_unit(&ctx, d)).collect()
        } else {
            pending.iter().map(|d| Self::run_unit(&ctx, d)).collect()
        }
    }

    #[cfg(not(feature = "rayon"))]
    fn run_level(
        &self,
        pending: &[&Discretization],
    ) -> Vec<Result<UnitOutcome, BoraError>> {
        let ctx = self.context();
        pending.iter().map(|d| Self::run_unit(&ctx, d)).collect()
    }

    /// Phase 2: mesh every pending discretization, level by level.
    ///
    /// Runs phase 1 first if constraints changed. Discretizations that failed
    /// earlier are reported again without a retry; invalidate them to retry.
    ///
    /// # Errors
    /// Unrecoverable errors (`Geometry`, `InvariantViolation`,
    /// `Configuration`) abort the call.
    pub fn compute(&mut self) -> Result<ComputeReport, BoraError> {
        if self.dirty {
            self.compute_constraints()?;
        }
        let mut report = ComputeReport::default();
        for kind in ShapeKind::MESHED_BOTTOM_UP {
            if self.cancel.is_cancelled() {
                log::warn!("compute cancelled before the {kind} level");
                report.cancelled = true;
                break;
            }
            let mut pending = Vec::new();
            for disc in self.graph.discretizations().filter(|d| d.kind() == kind) {
                if disc.is_meshed() {
                    continue;
                }
                match disc.failure() {
                    Some(e) => report.failures.push((disc.id(), e)),
                    None => pending.push(disc),
                }
            }
            if pending.is_empty() {
                continue;
            }
            log::info!("meshing {} {kind} discretizations", pending.len());
            let outcomes = self.run_level(&pending);
            for (disc, outcome) in pending.iter().zip(outcomes) {
                match outcome? {
                    UnitOutcome::Meshed(algorithm) => report.computed.push(ComputedUnit {
                        id: disc.id(),
                        kind,
                        algorithm,
                    }),
                    UnitOutcome::Failed(e) => report.failures.push((disc.id(), e)),
                    UnitOutcome::Cancelled => report.cancelled = true,
                }
            }
        }
        if report.cancelled {
            self.cancel.reset();
        }
        log::info!(
            "compute: {} meshed, {} failed",
            report.computed.len(),
            report.failures.len()
        );
        Ok(report)
    }

    /// Mesh one discretization again after a failure.
    ///
    /// # Errors
    /// `InvariantViolation` if it is meshed (call [`Model::invalidate_discretization`]
    /// first), `UnknownCell` if it does not exist, or the unit's own failure.
    pub fn recompute(&mut self, id: DiscretizationId) -> Result<(), BoraError> {
        let disc = self
            .discretization(id)
            .ok_or(BoraError::UnknownCell(id.cell))?;
        if disc.is_meshed() {
            return Err(BoraError::InvariantViolation(format!(
                "discretization {id} is already meshed"
            )));
        }
        self.invalidate_discretization(id)?;
        let ctx = self.context();
        let disc = self
            .discretization(id)
            .ok_or(BoraError::UnknownCell(id.cell))?;
        match Self::run_unit(&ctx, disc)? {
            UnitOutcome::Meshed(_) => Ok(()),
            UnitOutcome::Failed(e) => Err(e),
            UnitOutcome::Cancelled => {
                self.cancel.reset();
                Err(BoraError::Cancelled { cell: id.cell })
            }
        }
    }

    /// Forget the mesh and failure of one discretization.
    pub fn invalidate_discretization(&mut self, id: DiscretizationId) -> Result<(), BoraError> {
        let cell = self.graph.get_mut(id.cell)?;
        let disc = cell
            .discretizations_mut()
            .get_mut(id.group as usize)
            .ok_or(BoraError::UnknownCell(id.cell))?;
        disc.invalidate();
        Ok(())
    }

    /// Forget every mesh and failure; the next `compute` starts over.
    pub fn invalidate(&mut self) {
        self.graph.invalidate_cache();
    }

    /// Discretizations used by `submesh`, cells by increasing id.
    pub fn submesh_discretizations(
        &self,
        submesh: SubmeshId,
    ) -> Result<Vec<&Discretization>, BoraError> {
        self.submesh(submesh)?;
        Ok(self
            .graph
            .discretizations()
            .filter(|d| d.contains(submesh))
            .collect())
    }

    /// The discretization of `cell` used by `submesh`.
    pub fn get_discretization_submesh(
        &self,
        cell: CellId,
        submesh: SubmeshId,
    ) -> Option<&Discretization> {
        self.graph.get_discretization_submesh(cell, submesh)
    }

    /// Distinct effective hypotheses, in discretization order.
    pub fn all_hypotheses(&self) -> Vec<Hypothesis> {
        let mut out: Vec<Hypothesis> = Vec::new();
        for d in self.graph.discretizations() {
            if !out.contains(d.hypothesis()) {
                out.push(d.hypothesis().clone());
            }
        }
        out
    }

    /// Text dump of each submesh's constraints.
    pub fn describe_constraints(&self) -> String {
        let mut out = String::new();
        for s in &self.submeshes {
            let _ = writeln!(out, "submesh {}:", s.id());
            for c in s.constraints() {
                let kind = self
                    .graph
                    .get_by_id(c.cell())
                    .map(|cell| cell.kind().as_str())
                    .unwrap_or("?");
                let _ = writeln!(out, "  {kind} {c}");
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cad::{make_box, make_polygon_face};
    use crate::data::discretization::DiscretizationState;

    fn hyp(e: &str, l: f64) -> Hypothesis {
        Hypothesis::new(e, l).unwrap()
    }

    #[test]
    fn dimension_check_on_add() {
        let face = make_polygon_face(&[[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]).unwrap();
        let mut m = Model::with_defaults(&face).unwrap();
        let s = m.new_submesh();
        let root = m.graph().root();
        assert!(matches!(
            m.add_constraint(s, Constraint::new(root, hyp("T4", 1.0))),
            Err(BoraError::Configuration(_))
        ));
        assert!(m.add_constraint(s, Constraint::new(root, hyp("T3", 1.0))).unwrap());
        assert!(!m.add_constraint(s, Constraint::new(root, hyp("T3", 1.0))).unwrap());
        assert!(matches!(
            m.add_constraint(SubmeshId(7), Constraint::new(root, hyp("T3", 1.0))),
            Err(BoraError::UnknownSubmesh(_))
        ));
    }

    #[test]
    fn edge_constraint_on_face_leaves_face_alone() {
        let face = make_polygon_face(&[[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]).unwrap();
        let mut m = Model::with_defaults(&face).unwrap();
        let s = m.new_submesh();
        m.add_constraint(s, Constraint::new(m.graph().root(), hyp("E2", 0.5)))
            .unwrap();
        m.compute_constraints().unwrap();
        let kinds: BTreeSet<ShapeKind> = m.graph().discretizations().map(|d| d.kind()).collect();
        assert_eq!(kinds, BTreeSet::from([ShapeKind::Edge, ShapeKind::Vertex]));
    }

    #[test]
    fn conflicting_direct_constraints() {
        let cube = make_box([0.0; 3], [1.0; 3]).unwrap();
        let mut m = Model::with_defaults(&cube).unwrap();
        let s = m.new_submesh();
        let root = m.graph().root();
        m.add_constraint(s, Constraint::new(root, hyp("T4", 0.5))).unwrap();
        m.add_constraint(s, Constraint::new(root, hyp("T4", 0.25))).unwrap();
        assert!(matches!(m.compute_constraints(), Err(BoraError::Configuration(_))));
    }

    #[test]
    fn quadrangles_are_unavailable_but_edges_are_meshed() {
        let face =
            make_polygon_face(&[[0.0; 3], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]]).unwrap();
        let mut m = Model::with_defaults(&face).unwrap();
        let s = m.new_submesh();
        let root = m.graph().root();
        m.add_constraint(s, Constraint::new(root, hyp("Q4", 0.25))).unwrap();
        let report = m.compute().unwrap();
        assert!(!report.is_complete());
        let d = m.get_discretization_submesh(root, s).unwrap();
        assert!(matches!(
            d.state(),
            DiscretizationState::Failed(BoraError::AlgorithmUnavailable { .. })
        ));
        assert_eq!(report.failures.len(), 1);
        let edges = m.graph().cells_of_kind(ShapeKind::Edge);
        assert!(edges
            .iter()
            .all(|&e| m.get_discretization_submesh(e, s).unwrap().is_meshed()));
        // failures are reported again, not retried
        let again = m.compute().unwrap();
        assert!(again.computed.is_empty());
        assert_eq!(again.failures.len(), 1);
    }

    #[test]
    fn recompute_guard() {
        let face = make_polygon_face(&[[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]).unwrap();
        let mut m = Model::with_defaults(&face).unwrap();
        let s = m.new_submesh();
        let root = m.graph().root();
        m.add_constraint(s, Constraint::new(root, hyp("T3", 0.5))).unwrap();
        assert!(m.compute().unwrap().is_complete());
        let id = m.get_discretization_submesh(root, s).unwrap().id();
        assert!(matches!(m.recompute(id), Err(BoraError::InvariantViolation(_))));
        m.invalidate_discretization(id).unwrap();
        m.recompute(id).unwrap();
        assert!(m.discretization(id).unwrap().is_meshed());
    }

    #[test]
    fn describe_and_hypotheses() {
        let face = make_polygon_face(&[[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]).unwrap();
        let mut m = Model::with_defaults(&face).unwrap();
        let s = m.new_submesh();
        let root = m.graph().root();
        m.add_constraint(s, Constraint::new(root, hyp("T3", 0.5)).with_group("skin"))
            .unwrap();
        m.compute_constraints().unwrap();
        let text = m.describe_constraints();
        assert!(text.starts_with("submesh S0:\n"));
        assert!(text.contains("FACE cell 1 [T3 length=0.5] group=skin"));
        let elements: Vec<String> = m.all_hypotheses().iter().map(|h| h.element().to_string()).collect();
        assert_eq!(elements, vec!["T3", "E2", "V1"]);
        assert_eq!(m.submesh_discretizations(s).unwrap().len(), 1 + 3 + 3);
    }
}
