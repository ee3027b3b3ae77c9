mod util;
use bora_mesh::prelude::*;
use util::*;

fn square() -> Shape {
    make_polygon_face(&[
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [1.0, 1.0, 0.0],
        [0.0, 1.0, 0.0],
    ])
    .unwrap()
}

#[test]
fn equal_hypotheses_share_one_discretization() {
    let mut m = Model::with_defaults(&square()).unwrap();
    let face = m.graph().root();
    let a = m.new_submesh();
    let b = m.new_submesh();
    m.add_constraint(a, constraint(face, "T3", 0.25)).unwrap();
    m.add_constraint(b, constraint(face, "T3", 0.25).with_group("other"))
        .unwrap();
    m.compute_constraints().unwrap();

    let cell = m.graph().get_by_id(face).unwrap();
    assert_eq!(cell.discretizations().len(), 1);
    let d = &cell.discretizations()[0];
    assert_eq!(d.submeshes(), &[a, b]);
    assert!(std::ptr::eq(
        m.get_discretization_submesh(face, a).unwrap(),
        m.get_discretization_submesh(face, b).unwrap()
    ));
    // every descendant is shared too
    for dd in m.graph().discretizations() {
        assert!(dd.contains(a) && dd.contains(b), "{dd}");
    }

    let report = m.compute().unwrap();
    assert!(report.is_complete());
    let faces = report
        .computed
        .iter()
        .filter(|u| u.kind == ShapeKind::Face)
        .count();
    assert_eq!(faces, 1);
}

#[test]
fn different_lengths_stay_isolated() {
    let mut m = Model::with_defaults(&square()).unwrap();
    let face = m.graph().root();
    let a = m.new_submesh();
    let b = m.new_submesh();
    m.add_constraint(a, constraint(face, "T3", 0.5)).unwrap();
    m.add_constraint(b, constraint(face, "T3", 0.2)).unwrap();
    assert!(m.compute().unwrap().is_complete());

    assert_eq!(m.graph().get_by_id(face).unwrap().discretizations().len(), 2);
    let da = m.get_discretization_submesh(face, a).unwrap();
    let db = m.get_discretization_submesh(face, b).unwrap();
    assert!(da.empty_intersection(db));
    assert!((da.hypothesis().length() - 0.5).abs() < 1e-6);
    assert!((db.hypothesis().length() - 0.2).abs() < 1e-6);

    for e in m.graph().cells_of_kind(ShapeKind::Edge) {
        assert_eq!(segments(&m, e, a), 2);
        assert_eq!(segments(&m, e, b), 5);
    }
    assert!(face_mesh(&m, face, a).triangle_count() < face_mesh(&m, face, b).triangle_count());
    // V1 hypotheses keep the length, so the vertices split as well
    for v in m.graph().cells_of_kind(ShapeKind::Vertex) {
        assert_eq!(m.graph().get_by_id(v).unwrap().discretizations().len(), 2);
    }
}

#[test]
fn refined_boundary_edge_splits_the_face() {
    let mut m = Model::with_defaults(&square()).unwrap();
    let face = m.graph().root();
    let edge = m.graph().cells_of_kind(ShapeKind::Edge)[0];
    let a = m.new_submesh();
    let b = m.new_submesh();
    m.add_constraint(a, constraint(face, "T3", 0.5)).unwrap();
    m.add_constraint(b, constraint(face, "T3", 0.5)).unwrap();
    m.add_constraint(b, constraint(edge, "E2", 0.1)).unwrap();
    assert!(m.compute().unwrap().is_complete());

    // same face hypothesis, different boundary: two face discretizations
    assert_eq!(m.graph().get_by_id(face).unwrap().discretizations().len(), 2);
    assert_eq!(segments(&m, edge, a), 2);
    assert_eq!(segments(&m, edge, b), 10);

    // the refined edge's vertices split, and with them every edge touching
    // them; the opposite edge stays shared
    let ends = m.graph().unique_shapes_explorer(edge, ShapeKind::Vertex).unwrap();
    for v in m.graph().cells_of_kind(ShapeKind::Vertex) {
        let want = if ends.contains(&v) { 2 } else { 1 };
        assert_eq!(m.graph().get_by_id(v).unwrap().discretizations().len(), want, "vertex {v}");
    }
    for e in m.graph().cells_of_kind(ShapeKind::Edge).into_iter().skip(1) {
        let touches = m
            .graph()
            .unique_shapes_explorer(e, ShapeKind::Vertex)
            .unwrap()
            .iter()
            .any(|v| ends.contains(v));
        let want = if touches { 2 } else { 1 };
        assert_eq!(m.graph().get_by_id(e).unwrap().discretizations().len(), want, "edge {e}");
    }

    // each face mesh conforms to its own submesh's edge mesh
    for (s, inner) in [(a, 1), (b, 9)] {
        let edge_disc = m.get_discretization_submesh(edge, s).unwrap().id();
        let on_edge = face_mesh(&m, face, s)
            .nodes
            .iter()
            .filter(|n| matches!(n.tag, NodeTag::Edge { edge, .. } if edge == edge_disc))
            .count();
        assert_eq!(on_edge, inner, "{s}");
    }
}

#[test]
fn glued_cubes_shared_face_under_two_submeshes() {
    let shape = make_glued_boxes().unwrap();
    let mut m = Model::with_defaults(&shape).unwrap();
    let solids = m.graph().cells_of_kind(ShapeKind::Solid);
    assert_eq!(solids.len(), 2);
    let shared = shared_faces(&m);
    assert_eq!(shared.len(), 1);

    let left = m.new_submesh();
    let right = m.new_submesh();
    m.add_constraint(left, constraint(solids[0], "T4", 0.5)).unwrap();
    m.add_constraint(right, constraint(solids[1], "T4", 0.25)).unwrap();
    m.compute_constraints().unwrap();

    let face = m.graph().get_by_id(shared[0]).unwrap();
    assert_eq!(face.discretizations().len(), 2);
    for e in m.graph().unique_shapes_explorer(shared[0], ShapeKind::Edge).unwrap() {
        let discs = m.graph().get_by_id(e).unwrap().discretizations();
        assert_eq!(discs.len(), 2, "edge {e}");
        let l = m.get_discretization_submesh(e, left).unwrap().hypothesis();
        let r = m.get_discretization_submesh(e, right).unwrap().hypothesis();
        assert_eq!(l.element(), ElementKind::E2);
        assert!((l.length() - 0.5).abs() < 1e-6);
        assert!((r.length() - 0.25).abs() < 1e-6);
    }
    // edges away from the common face belong to one submesh only
    let total_edges = m.graph().cells_of_kind(ShapeKind::Edge);
    assert_eq!(total_edges.len(), 20);
    let single = total_edges
        .iter()
        .filter(|&&e| m.graph().get_by_id(e).unwrap().discretizations().len() == 1)
        .count();
    assert_eq!(single, 16);
}

#[test]
fn glued_cubes_surface_meshes_per_submesh() {
    let shape = make_glued_boxes().unwrap();
    let mut m = Model::with_defaults(&shape).unwrap();
    let shared = shared_faces(&m)[0];
    let a = m.new_submesh();
    let b = m.new_submesh();
    m.add_constraint(a, constraint(shared, "T3", 0.5)).unwrap();
    m.add_constraint(b, constraint(shared, "T3", 0.25)).unwrap();
    assert!(m.compute().unwrap().is_complete());
    for e in m.graph().unique_shapes_explorer(shared, ShapeKind::Edge).unwrap() {
        assert_eq!(segments(&m, e, a), 2);
        assert_eq!(segments(&m, e, b), 4);
    }
    assert_eq!(face_mesh(&m, shared, a).boundary_nodes().count(), 8);
    assert_eq!(face_mesh(&m, shared, b).boundary_nodes().count(), 16);
}

#[test]
fn removing_a_constraint_rebuilds_discretizations() {
    let mut m = Model::with_defaults(&square()).unwrap();
    let face = m.graph().root();
    let a = m.new_submesh();
    let c = constraint(face, "T3", 0.5);
    m.add_constraint(a, c.clone()).unwrap();
    m.compute().unwrap();
    assert!(m.graph().discretizations().count() > 0);
    assert!(m.remove_constraint(a, &c).unwrap());
    let report = m.compute().unwrap();
    assert!(report.computed.is_empty());
    assert_eq!(m.graph().discretizations().count(), 0);
}
