//! Topology of a CAD model as a deduplicated DAG.
//!
//! - [`cell`]: `CellId` handles and `TopologyCell` arena nodes
//! - [`graph`]: construction and traversal (`shapes_explorer`, ancestors, ...)
//! - [`orientation`]: forward/reversed uses and their composition
//! - [`cache`]: invalidation of computed discretizations

pub mod cache;
pub mod cell;
pub mod graph;
pub mod orientation;

pub use cache::InvalidateCache;
pub use cell::{CellId, TopologyCell};
pub use graph::TopologyGraph;
pub use orientation::{Orientation, OrientationGroup};
