//! Built-in analytic B-rep kernel.
//!
//! The meshing pipeline only needs shape identity, a type-indexed explorer and
//! curve/surface evaluation; this module provides them for lines, circles and
//! planes, enough to build boxes, polygons, disks and junction models.

pub mod builder;
pub mod curve;
pub mod explorer;
pub mod shape;
pub mod surface;

pub use builder::{
    BoxBuilder, make_box, make_circle, make_compound, make_degenerate_edge, make_disk, make_edge,
    make_face, make_glued_boxes, make_junction, make_line, make_polygon_face,
    make_polygon_face_on, make_shell, make_solid, make_vertex, make_wire,
};
pub use curve::{Circle, Curve3d, Line};
pub use explorer::ShapeExplorer;
pub use shape::{EdgeGeometry, Shape, ShapeKey, ShapeKind};
pub use surface::{Plane, Surface};
