//! A named set of constraints forming one independent meshing domain.

use crate::data::constraint::Constraint;
use crate::topology::cell::CellId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a submesh in its model.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubmeshId(pub(crate) u32);

impl SubmeshId {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SubmeshId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.0)
    }
}

/// Ordered set of constraints.
#[derive(Clone, Debug)]
pub struct Submesh {
    id: SubmeshId,
    constraints: Vec<Constraint>,
}

impl Submesh {
    pub(crate) fn new(id: SubmeshId) -> Self {
        Submesh {
            id,
            constraints: Vec::new(),
        }
    }

    pub fn id(&self) -> SubmeshId {
        self.id
    }

    /// Add a constraint; returns `false` if an identical one is already there.
    pub fn add(&mut self, constraint: Constraint) -> bool {
        if self.constraints.contains(&constraint) {
            return false;
        }
        self.constraints.push(constraint);
        true
    }

    /// Remove a constraint; returns `false` if it was not present.
    pub fn remove(&mut self, constraint: &Constraint) -> bool {
        let before = self.constraints.len();
        self.constraints.retain(|c| c != constraint);
        before != self.constraints.len()
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Constraints placed directly on `cell`.
    pub fn constraints_on(&self, cell: CellId) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter().filter(move |c| c.cell() == cell)
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::hypothesis::Hypothesis;

    #[test]
    fn set_semantics() {
        let mut s = Submesh::new(SubmeshId(0));
        let c = Constraint::new(CellId::new(1).unwrap(), Hypothesis::new("T4", 1.0).unwrap());
        assert!(s.add(c.clone()));
        assert!(!s.add(c.clone()));
        assert_eq!(s.constraints().len(), 1);
        assert_eq!(s.constraints_on(CellId::new(1).unwrap()).count(), 1);
        assert_eq!(s.constraints_on(CellId::new(2).unwrap()).count(), 0);
        assert!(s.remove(&c));
        assert!(!s.remove(&c));
        assert!(s.is_empty());
        assert_eq!(s.id().to_string(), "S0");
    }
}
