//! One computable meshing unit: a cell under one effective hypothesis, shared
//! by every submesh that agrees on that hypothesis.
//!
//! The mesh sits behind a compute-once latch. Concurrent requesters of the
//! same unit block until the first one finishes and then observe its result,
//! success or failure.

use crate::cad::ShapeKind;
use crate::data::constraint::Constraint;
use crate::data::hypothesis::Hypothesis;
use crate::data::mesh::Mesh;
use crate::data::submesh::SubmeshId;
use crate::mesh_error::BoraError;
use crate::topology::cache::InvalidateCache;
use crate::topology::cell::CellId;
use itertools::Itertools;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::fmt;

/// Composite key: owning cell and position among its discretizations.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct DiscretizationId {
    pub cell: CellId,
    pub group: u32,
}

impl fmt::Display for DiscretizationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.cell, self.group)
    }
}

/// Derived state of a discretization.
#[derive(Clone, Debug, PartialEq)]
pub enum DiscretizationState {
    Pending,
    Meshed,
    Failed(BoraError),
}

/// One meshing unit: a cell under one effective hypothesis, shared by the
/// submeshes that agree on it and on the discretizations below the cell.
#[derive(Debug)]
pub struct Discretization {
    id: DiscretizationId,
    kind: ShapeKind,
    constraint: Constraint,
    submeshes: Vec<SubmeshId>,
    mesh: OnceCell<Mesh>,
    failure: Mutex<Option<BoraError>>,
}

impl Discretization {
    /// `constraint` carries the effective hypothesis; `submeshes` are sorted
    /// and deduplicated.
    pub(crate) fn new(
        id: DiscretizationId,
        kind: ShapeKind,
        constraint: Constraint,
        mut submeshes: Vec<SubmeshId>,
    ) -> Self {
        submeshes.sort();
        submeshes.dedup();
        Discretization {
            id,
            kind,
            constraint,
            submeshes,
            mesh: OnceCell::new(),
            failure: Mutex::new(None),
        }
    }

    #[inline]
    pub fn id(&self) -> DiscretizationId {
        self.id
    }

    #[inline]
    pub fn cell(&self) -> CellId {
        self.id.cell
    }

    #[inline]
    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    pub fn constraint(&self) -> &Constraint {
        &self.constraint
    }

    /// Effective hypothesis shared by every submesh of this discretization.
    pub fn hypothesis(&self) -> &Hypothesis {
        self.constraint.hypothesis()
    }

    /// Submeshes using this discretization, sorted.
    pub fn submeshes(&self) -> &[SubmeshId] {
        &self.submeshes
    }

    /// Submesh whose boundary discretizations feed the algorithm.
    pub fn first_submesh(&self) -> SubmeshId {
        // never empty: phase 1 creates a discretization per non-empty class
        self.submeshes[0]
    }

    /// Whether `submesh` uses this discretization.
    pub fn contains(&self, submesh: SubmeshId) -> bool {
        self.submeshes.binary_search(&submesh).is_ok()
    }

    /// Every submesh of `other` also uses this discretization.
    pub fn contained(&self, other: &Discretization) -> bool {
        other.submeshes.iter().all(|s| self.contains(*s))
    }

    /// No submesh uses both discretizations.
    pub fn empty_intersection(&self, other: &Discretization) -> bool {
        !other.submeshes.iter().any(|s| self.contains(*s))
    }

    /// Latched mesh, once computed.
    pub fn mesh(&self) -> Option<&Mesh> {
        self.mesh.get()
    }

    pub fn is_meshed(&self) -> bool {
        self.mesh.get().is_some()
    }

    /// Recorded failure, until invalidated.
    pub fn failure(&self) -> Option<BoraError> {
        self.failure.lock().clone()
    }

    /// Meshed or failed.
    pub fn is_computed(&self) -> bool {
        self.is_meshed() || self.failure.lock().is_some()
    }

    pub fn state(&self) -> DiscretizationState {
        if self.is_meshed() {
            DiscretizationState::Meshed
        } else if let Some(e) = self.failure() {
            DiscretizationState::Failed(e)
        } else {
            DiscretizationState::Pending
        }
    }

    /// Run `compute` unless a result is already latched. Exactly one caller
    /// runs it; concurrent callers wait and observe the same outcome. A
    /// failure is recorded and returned to every later caller, except a
    /// cancellation, which leaves the discretization pending.
    pub(crate) fn compute_once<F>(&self, compute: F) -> Result<&Mesh, BoraError>
    where
        F: FnOnce() -> Result<Mesh, BoraError>,
    {
        self.mesh.get_or_try_init(|| {
            if let Some(e) = self.failure.lock().clone() {
                return Err(e);
            }
            compute().inspect_err(|e| {
                if !matches!(e, BoraError::Cancelled { .. }) {
                    *self.failure.lock() = Some(e.clone());
                }
            })
        })
    }

    /// Attach a mesh computed elsewhere.
    ///
    /// # Errors
    /// `InvariantViolation` if the discretization is already meshed.
    pub fn set_mesh(&self, mesh: Mesh) -> Result<(), BoraError> {
        if mesh.kind() != self.kind {
            return Err(BoraError::InvariantViolation(format!(
                "{} mesh set on {} discretization {}",
                mesh.kind(),
                self.kind,
                self.id
            )));
        }
        self.mesh.set(mesh).map_err(|_| {
            BoraError::InvariantViolation(format!("discretization {} is already meshed", self.id))
        })
    }

    /// Forget the mesh and any recorded failure.
    pub fn invalidate(&mut self) {
        self.mesh.take();
        *self.failure.get_mut() = None;
    }
}

impl InvalidateCache for Discretization {
    fn invalidate_cache(&mut self) {
        self.invalidate();
    }
}

impl fmt::Display for Discretization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "discretization {} {} [{}] submeshes={{{}}}",
            self.id,
            self.kind,
            self.hypothesis(),
            self.submeshes.iter().join(",")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn disc(subs: &[u32]) -> Discretization {
        let cell = CellId::new(5).unwrap();
        Discretization::new(
            DiscretizationId { cell, group: 0 },
            ShapeKind::Vertex,
            Constraint::new(cell, Hypothesis::new("V1", 1.0).unwrap()),
            subs.iter().map(|&s| SubmeshId(s)).collect(),
        )
    }

    #[test]
    fn submesh_set_operations() {
        let a = disc(&[2, 0, 2]);
        assert_eq!(a.submeshes(), &[SubmeshId(0), SubmeshId(2)]);
        assert_eq!(a.first_submesh(), SubmeshId(0));
        let b = disc(&[2]);
        let c = disc(&[1]);
        assert!(a.contained(&b));
        assert!(!b.contained(&a));
        assert!(a.empty_intersection(&c));
        assert!(!a.empty_intersection(&b));
    }

    #[test]
    fn compute_once_latches_success() {
        let d = disc(&[0]);
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            d.compute_once(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Mesh::Vertex([1.0, 0.0, 0.0]))
            })
            .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(d.state(), DiscretizationState::Meshed);
        assert!(matches!(
            d.set_mesh(Mesh::Vertex([0.0; 3])),
            Err(BoraError::InvariantViolation(_))
        ));
    }

    #[test]
    fn compute_once_latches_failure_until_invalidated() {
        let mut d = disc(&[0]);
        let err = BoraError::Io("boom".into());
        assert_eq!(d.compute_once(|| Err(err.clone())).unwrap_err(), err);
        // the failure is replayed without running the closure again
        assert_eq!(
            d.compute_once(|| Ok(Mesh::Vertex([0.0; 3]))).unwrap_err(),
            err
        );
        assert_eq!(d.state(), DiscretizationState::Failed(err));
        assert!(d.is_computed());
        d.invalidate();
        assert_eq!(d.state(), DiscretizationState::Pending);
        d.compute_once(|| Ok(Mesh::Vertex([0.0; 3]))).unwrap();
        assert!(d.is_meshed());
    }

    #[test]
    fn cancellation_is_not_latched() {
        let d = disc(&[0]);
        let cancelled = BoraError::Cancelled { cell: d.cell() };
        assert_eq!(d.compute_once(|| Err(cancelled.clone())).unwrap_err(), cancelled);
        assert_eq!(d.state(), DiscretizationState::Pending);
        d.compute_once(|| Ok(Mesh::Vertex([0.0; 3]))).unwrap();
        assert!(d.is_meshed());
    }

    #[test]
    fn concurrent_requesters_share_one_compute() {
        let d = Arc::new(disc(&[0]));
        let calls = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let d = Arc::clone(&d);
                let calls = Arc::clone(&calls);
                std::thread::spawn(move || {
                    d.compute_once(|| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        std::thread::sleep(std::time::Duration::from_millis(20));
                        Ok(Mesh::Vertex([2.0; 3]))
                    })
                    .map(|m| m.clone())
                })
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap().unwrap(), Mesh::Vertex([2.0; 3]));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn kind_mismatch_is_rejected() {
        let d = disc(&[0]);
        assert!(d.set_mesh(Mesh::Face(Default::default())).is_err());
        assert!(!d.is_meshed());
    }
}
