//! A hypothesis bound to one topology cell.

use crate::data::hypothesis::Hypothesis;
use crate::topology::cell::CellId;
use std::fmt;

/// Immutable (cell, hypothesis) pair with an optional group name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Constraint {
    cell: CellId,
    hypothesis: Hypothesis,
    group: Option<String>,
}

impl Constraint {
    pub fn new(cell: CellId, hypothesis: Hypothesis) -> Self {
        Constraint {
            cell,
            hypothesis,
            group: None,
        }
    }

    /// Same constraint with a group name, used when exporting meshes.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    #[inline]
    pub fn cell(&self) -> CellId {
        self.cell
    }

    #[inline]
    pub fn hypothesis(&self) -> &Hypothesis {
        &self.hypothesis
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// Copy of this constraint carrying another hypothesis, e.g. the effective
    /// one computed for a descendant cell.
    pub(crate) fn derived(&self, cell: CellId, hypothesis: Hypothesis) -> Self {
        Constraint {
            cell,
            hypothesis,
            group: self.group.clone(),
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell {} [{}]", self.cell, self.hypothesis)?;
        if let Some(g) = &self.group {
            write!(f, " group={g}")?;
        }
        Ok(())
    }
}
