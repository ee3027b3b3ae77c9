//! BoraError: unified error type for bora-mesh public APIs
//!
//! Errors fall in two families. Recoverable ones are attached to a single
//! (cell, hypothesis-group) unit and the pipeline keeps going; fatal ones abort
//! the current call. See [`BoraError::is_recoverable`].

use crate::topology::cell::CellId;
use crate::data::submesh::SubmeshId;
use thiserror::Error;

/// Unified error type for bora-mesh operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BoraError {
    /// Malformed hypothesis or constraint values, or an invalid configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// The CAD model is inconsistent (e.g. an edge without a 3D curve that is
    /// not flagged degenerate).
    #[error("Geometry error: {0}")]
    Geometry(String),
    /// No algorithm is registered for a cell, or its external tool is missing.
    #[error("Algorithm unavailable for {cell}: {reason}")]
    AlgorithmUnavailable { cell: CellId, reason: String },
    /// An external mesher exited with a failure, timed out, or the file
    /// hand-off failed.
    #[error("External tool `{tool}` failed: {reason}")]
    ExternalTool { tool: String, reason: String },
    /// Meshing of a cell was interrupted through the model's cancel token.
    /// The discretization stays pending.
    #[error("Meshing of {cell} was cancelled")]
    Cancelled { cell: CellId },
    /// A cell could not be meshed because a boundary cell (a face of a
    /// solid, an edge of a face) has no mesh.
    #[error("Incomplete boundary for {cell}: {boundary} has no mesh")]
    IncompleteBoundary { cell: CellId, boundary: CellId },
    /// The built-in face kernel could not produce a valid triangulation.
    #[error("Triangulation failed on {cell}: {reason}")]
    Triangulation { cell: CellId, reason: String },
    /// Programming-contract violation, e.g. recomputing a meshed discretization.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
    /// The topology graph has no cell with this id.
    #[error("Unknown cell {0}")]
    UnknownCell(CellId),
    /// The model has no submesh with this id.
    #[error("Unknown submesh {0}")]
    UnknownSubmesh(SubmeshId),
    /// I/O error during persistence or tool hand-off.
    #[error("I/O error: {0}")]
    Io(String),
    /// A mesh file produced by an external tool could not be parsed.
    #[error("Mesh parse error: {0}")]
    Parse(String),
}

impl BoraError {
    /// Whether this failure stays local to one discretization unit.
    ///
    /// Callers treat a missing mesh as the expected outcome of a recoverable
    /// failure, and an `Err` from `Model::compute` as unrecoverable.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BoraError::AlgorithmUnavailable { .. }
                | BoraError::ExternalTool { .. }
                | BoraError::Cancelled { .. }
                | BoraError::IncompleteBoundary { .. }
                | BoraError::Triangulation { .. }
                | BoraError::Io(_)
                | BoraError::Parse(_)
        )
    }
}

impl From<std::io::Error> for BoraError {
    fn from(e: std::io::Error) -> Self {
        BoraError::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        let cell = CellId::new(3).unwrap();
        assert!(BoraError::IncompleteBoundary { cell, boundary: cell }.is_recoverable());
        assert!(BoraError::Io("disk full".into()).is_recoverable());
        assert!(BoraError::Cancelled { cell }.is_recoverable());
        assert!(!BoraError::Geometry("no curve".into()).is_recoverable());
        assert!(!BoraError::InvariantViolation("twice".into()).is_recoverable());
        assert!(!BoraError::Configuration("bad".into()).is_recoverable());
    }

    #[test]
    fn io_conversion_keeps_message() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "tetgen.poly");
        let e: BoraError = io.into();
        assert!(matches!(e, BoraError::Io(ref m) if m.contains("tetgen.poly")));
    }
}
