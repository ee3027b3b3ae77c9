//! `CellId` and `TopologyCell`: nodes of the topology graph.
//!
//! Every distinct CAD shape of a model maps to exactly one `TopologyCell`.
//! `CellId` wraps a `NonZeroU32` so 0 stays reserved as a sentinel and the id
//! doubles as a 1-based arena index.

use crate::cad::{Shape, ShapeKind};
use crate::data::discretization::Discretization;
use crate::data::submesh::SubmeshId;
use crate::mesh_error::BoraError;
use crate::topology::orientation::Orientation;
use std::{fmt, num::NonZeroU32};

/// Strong handle of a topology cell.
///
/// # Memory layout
/// `repr(transparent)` over `NonZeroU32`; `Option<CellId>` is 4 bytes.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct CellId(NonZeroU32);

impl CellId {
    /// Creates a `CellId` from a raw value.
    ///
    /// # Errors
    /// Returns `InvariantViolation` if `raw == 0`.
    #[inline]
    pub fn new(raw: u32) -> Result<Self, BoraError> {
        NonZeroU32::new(raw)
            .map(CellId)
            .ok_or_else(|| BoraError::InvariantViolation("CellId must be non-zero".into()))
    }

    #[inline]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// Position in the graph arena.
    #[inline]
    pub(crate) fn index(self) -> usize {
        (self.get() - 1) as usize
    }
}

impl fmt::Debug for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CellId").field(&self.get()).finish()
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// A node of the topology graph.
///
/// The shape is stored in forward orientation; `orientation` records the use
/// through which the cell was first discovered. Reversed uses appear only on
/// the parent→child links in `children`.
#[derive(Debug)]
pub struct TopologyCell {
    pub(crate) id: CellId,
    pub(crate) shape: Shape,
    pub(crate) orientation: Orientation,
    pub(crate) parents: Vec<CellId>,
    pub(crate) children: Vec<(CellId, Orientation)>,
    pub(crate) discretizations: Vec<Discretization>,
}

impl TopologyCell {
    pub(crate) fn new(id: CellId, shape: &Shape) -> Self {
        TopologyCell {
            id,
            shape: shape.oriented(Orientation::Forward),
            orientation: shape.orientation(),
            parents: Vec::new(),
            children: Vec::new(),
            discretizations: Vec::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> CellId {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> ShapeKind {
        self.shape.kind()
    }

    /// Shape in forward orientation.
    #[inline]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    #[inline]
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Distinct parents, in discovery order.
    pub fn parents(&self) -> &[CellId] {
        &self.parents
    }

    /// Oriented uses of sub-cells, in B-rep order (a closed edge lists its
    /// vertex twice).
    pub fn children(&self) -> &[(CellId, Orientation)] {
        &self.children
    }

    pub fn discretizations(&self) -> &[Discretization] {
        &self.discretizations
    }

    pub(crate) fn discretizations_mut(&mut self) -> &mut Vec<Discretization> {
        &mut self.discretizations
    }

    /// The discretization on this cell that serves `submesh`.
    pub fn discretization_for(&self, submesh: SubmeshId) -> Option<&Discretization> {
        self.discretizations.iter().find(|d| d.contains(submesh))
    }
}


#[cfg(test)]
mod serde_tests {
    use super::*;
    #[test]
    fn json_roundtrip() {
        let c = CellId::new(123).unwrap();
        let s = serde_json::to_string(&c).unwrap();
        assert_eq!(s, "123");
        let back: CellId = serde_json::from_str(&s).unwrap();
        assert_eq!(back, c);
        assert!(serde_json::from_str::<CellId>("0").is_err());
    }
}
