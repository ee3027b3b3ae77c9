//! Constructors for vertices, edges, wires, faces, shells, solids and
//! compounds, plus ready-made models (boxes, glued boxes, polygons, disks).

use super::curve::{Circle, Curve3d, Line};
use super::shape::{EdgeGeometry, Geometry, Shape, ShapeKey, ShapeKind};
use super::surface::{Plane, Surface};
use crate::geometry::{Point3, cross, distance, normalize, sub};
use crate::mesh_error::BoraError;
use std::collections::HashMap;
use std::sync::Arc;

const COINCIDENT: f64 = 1e-12;

pub fn make_vertex(p: Point3) -> Shape {
    Shape::new(ShapeKind::Vertex, vec![], Geometry::Point(p))
}

/// Edge on an arbitrary support. `first`/`last` may be the same vertex.
pub fn make_edge(first: &Shape, last: &Shape, geometry: EdgeGeometry) -> Result<Shape, BoraError> {
    if first.kind() != ShapeKind::Vertex || last.kind() != ShapeKind::Vertex {
        return Err(BoraError::Geometry("edge bounds must be vertices".into()));
    }
    Ok(Shape::new(
        ShapeKind::Edge,
        vec![first.clone(), last.clone()],
        Geometry::Edge(geometry),
    ))
}

/// Straight edge between two distinct vertices.
pub fn make_line(first: &Shape, last: &Shape) -> Result<Shape, BoraError> {
    let (a, b) = (vertex_point(first)?, vertex_point(last)?);
    let (line, len) = Line::through(a, b)
        .ok_or_else(|| BoraError::Geometry(format!("coincident line ends at {a:?}")))?;
    make_edge(
        first,
        last,
        EdgeGeometry {
            curve: Some(Arc::new(line)),
            range: (0.0, len),
            degenerate: false,
        },
    )
}

/// Full circle through `start`, closed on that vertex.
pub fn make_circle(start: &Shape, center: Point3, normal: Point3) -> Result<Shape, BoraError> {
    let p = vertex_point(start)?;
    let radial = sub(p, center);
    let radius = distance(p, center);
    let x_axis = normalize(radial)
        .ok_or_else(|| BoraError::Geometry("circle start lies on its center".into()))?;
    let n = normalize(normal).ok_or_else(|| BoraError::Geometry("null circle normal".into()))?;
    let y_axis = normalize(cross(n, x_axis))
        .ok_or_else(|| BoraError::Geometry("circle normal lies in its plane".into()))?;
    let curve: Arc<dyn Curve3d> = Arc::new(Circle::new(center, x_axis, y_axis, radius));
    make_edge(
        start,
        start,
        EdgeGeometry {
            curve: Some(curve),
            range: Circle::full_range(),
            degenerate: false,
        },
    )
}

/// Degenerate edge collapsed on one vertex (no 3D curve).
pub fn make_degenerate_edge(vertex: &Shape, range: (f64, f64)) -> Result<Shape, BoraError> {
    make_edge(
        vertex,
        vertex,
        EdgeGeometry {
            curve: None,
            range,
            degenerate: true,
        },
    )
}

/// Closed chain of oriented edges.
pub fn make_wire(edges: Vec<Shape>) -> Result<Shape, BoraError> {
    if edges.iter().any(|e| e.kind() != ShapeKind::Edge) {
        return Err(BoraError::Geometry("wire members must be edges".into()));
    }
    Ok(Shape::new(ShapeKind::Wire, edges, Geometry::None))
}

/// Face bounded by `wires` (outer first, holes after) with optional interior
/// vertices.
pub fn make_face(
    surface: Arc<dyn Surface>,
    wires: Vec<Shape>,
    interior_vertices: Vec<Shape>,
) -> Result<Shape, BoraError> {
    if wires.is_empty() || wires.iter().any(|w| w.kind() != ShapeKind::Wire) {
        return Err(BoraError::Geometry("face needs at least one wire".into()));
    }
    let mut children = wires;
    children.extend(interior_vertices);
    Ok(Shape::new(ShapeKind::Face, children, Geometry::Surface(surface)))
}

pub fn make_shell(faces: Vec<Shape>) -> Shape {
    Shape::new(ShapeKind::Shell, faces, Geometry::None)
}

pub fn make_solid(shells: Vec<Shape>) -> Shape {
    Shape::new(ShapeKind::Solid, shells, Geometry::None)
}

pub fn make_compound(shapes: Vec<Shape>) -> Shape {
    Shape::new(ShapeKind::Compound, shapes, Geometry::None)
}

/// Planar face bounded by the closed polygon `points` (counter-clockwise
/// around the face normal).
pub fn make_polygon_face(points: &[Point3]) -> Result<Shape, BoraError> {
    let vertices: Vec<Shape> = points.iter().map(|&p| make_vertex(p)).collect();
    make_polygon_face_on(&vertices)
}

/// Planar polygon face on existing vertices, so it can share them.
pub fn make_polygon_face_on(vertices: &[Shape]) -> Result<Shape, BoraError> {
    if vertices.len() < 3 {
        return Err(BoraError::Geometry("polygon needs three vertices".into()));
    }
    let pts = vertices
        .iter()
        .map(vertex_point)
        .collect::<Result<Vec<_>, _>>()?;
    let plane = Plane::new(pts[0], sub(pts[1], pts[0]), sub(pts[pts.len() - 1], pts[0]))
        .ok_or_else(|| BoraError::Geometry("degenerate polygon".into()))?;
    let edges = (0..vertices.len())
        .map(|i| make_line(&vertices[i], &vertices[(i + 1) % vertices.len()]))
        .collect::<Result<Vec<_>, _>>()?;
    make_face(Arc::new(plane), vec![make_wire(edges)?], vec![])
}

/// Planar disk bounded by a single closed circle.
pub fn make_disk(center: Point3, normal: Point3, radius: f64) -> Result<Shape, BoraError> {
    let n = normalize(normal).ok_or_else(|| BoraError::Geometry("null disk normal".into()))?;
    let seed = if n[0].abs() < 0.9 { [1.0, 0.0, 0.0] } else { [0.0, 1.0, 0.0] };
    let x_axis = normalize(cross(cross(n, seed), n))
        .ok_or_else(|| BoraError::Geometry("disk frame".into()))?;
    let start = make_vertex(crate::geometry::add(center, crate::geometry::scale(x_axis, radius)));
    let circle = make_circle(&start, center, n)?;
    let plane = Plane::new(center, x_axis, cross(n, x_axis))
        .ok_or_else(|| BoraError::Geometry("disk frame".into()))?;
    make_face(Arc::new(plane), vec![make_wire(vec![circle])?], vec![])
}

/// Unit square face in `z = 0` and a unit beam edge along `+z` sharing the
/// origin vertex, gathered in a compound.
pub fn make_junction() -> Result<Shape, BoraError> {
    let corners = [
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [1.0, 1.0, 0.0],
        [0.0, 1.0, 0.0],
    ];
    let vertices: Vec<Shape> = corners.iter().map(|&p| make_vertex(p)).collect();
    let face = make_polygon_face_on(&vertices)?;
    let top = make_vertex([0.0, 0.0, 1.0]);
    let beam = make_line(&vertices[0], &top)?;
    Ok(make_compound(vec![face, beam]))
}

fn vertex_point(v: &Shape) -> Result<Point3, BoraError> {
    v.point()
        .ok_or_else(|| BoraError::Geometry(format!("{v:?} is not a vertex")))
}

/// Builds axis-aligned boxes that share vertices, edges and faces with the
/// boxes built before them. A face already present is reused reversed.
#[derive(Default)]
pub struct BoxBuilder {
    vertices: HashMap<[u64; 3], Shape>,
    edges: HashMap<(ShapeKey, ShapeKey), Shape>,
    faces: HashMap<Vec<ShapeKey>, Shape>,
}

impl BoxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Solid box `[min, max]`. Faces come in the order x-, x+, y-, y+, z-, z+,
    /// each outward-oriented.
    pub fn add_box(&mut self, min: Point3, max: Point3) -> Result<Shape, BoraError> {
        if (0..3).any(|i| max[i] - min[i] <= COINCIDENT) {
            return Err(BoraError::Geometry(format!("empty box {min:?}..{max:?}")));
        }
        let mut faces = Vec::with_capacity(6);
        for a in 0..3 {
            for positive in [false, true] {
                faces.push(self.box_face(min, max, a, positive)?);
            }
        }
        Ok(make_solid(vec![make_shell(faces)]))
    }

    fn vertex(&mut self, p: Point3) -> Shape {
        let key = p.map(|c| (c + 0.0).to_bits());
        self.vertices
            .entry(key)
            .or_insert_with(|| make_vertex(p))
            .clone()
    }

    fn edge(&mut self, a: &Shape, b: &Shape) -> Result<Shape, BoraError> {
        let key = if a.key() <= b.key() {
            (a.key(), b.key())
        } else {
            (b.key(), a.key())
        };
        if let Some(e) = self.edges.get(&key) {
            let forward = e
                .edge_vertices()
                .map(|(first, _)| first.is_same(a))
                .unwrap_or(true);
            return Ok(if forward { e.clone() } else { e.reversed() });
        }
        let e = make_line(a, b)?;
        self.edges.insert(key, e.clone());
        Ok(e)
    }

    fn box_face(&mut self, min: Point3, max: Point3, a: usize, positive: bool) -> Result<Shape, BoraError> {
        let b = (a + 1) % 3;
        let c = (a + 2) % 3;
        let mut loop_bc = vec![(0, 0), (1, 0), (1, 1), (0, 1)];
        if !positive {
            loop_bc.reverse();
        }
        let corner = |ib: usize, ic: usize| {
            let mut p = min;
            p[a] = if positive { max[a] } else { min[a] };
            p[b] = if ib == 1 { max[b] } else { min[b] };
            p[c] = if ic == 1 { max[c] } else { min[c] };
            p
        };
        let vs: Vec<Shape> = loop_bc.iter().map(|&(ib, ic)| self.vertex(corner(ib, ic))).collect();

        let mut face_key: Vec<ShapeKey> = vs.iter().map(|v| v.key()).collect();
        face_key.sort();
        if let Some(f) = self.faces.get(&face_key) {
            return Ok(f.reversed());
        }

        let edges = (0..4)
            .map(|i| self.edge(&vs[i], &vs[(i + 1) % 4]))
            .collect::<Result<Vec<_>, _>>()?;
        let mut e_b = [0.0; 3];
        e_b[b] = 1.0;
        let mut e_c = [0.0; 3];
        e_c[c] = 1.0;
        let origin = corner(0, 0);
        let plane = if positive {
            Plane::new(origin, e_b, e_c)
        } else {
            Plane::new(origin, e_c, e_b)
        }
        .ok_or_else(|| BoraError::Geometry("box face frame".into()))?;
        let face = make_face(Arc::new(plane), vec![make_wire(edges)?], vec![])?;
        self.faces.insert(face_key, face.clone());
        Ok(face)
    }
}

/// Single box solid.
pub fn make_box(min: Point3, max: Point3) -> Result<Shape, BoraError> {
    BoxBuilder::new().add_box(min, max)
}

/// Two unit cubes glued along `x = 1`, in a compound; the common face is a
/// single shape used with opposite orientations.
pub fn make_glued_boxes() -> Result<Shape, BoraError> {
    let mut builder = BoxBuilder::new();
    let left = builder.add_box([0.0, 0.0, 0.0], [1.0, 1.0, 1.0])?;
    let right = builder.add_box([1.0, 0.0, 0.0], [2.0, 1.0, 1.0])?;
    Ok(make_compound(vec![left, right]))
}
