mod util;
use bora_mesh::prelude::*;
use util::*;

fn counts(m: &Model) -> Vec<(DiscretizationId, usize, usize)> {
    m.graph()
        .discretizations()
        .map(|d| match d.mesh() {
            Some(Mesh::Vertex(_)) => (d.id(), 1, 0),
            Some(Mesh::Edge(e)) => (d.id(), e.nodes.len(), e.segment_count()),
            Some(Mesh::Face(f)) => (d.id(), f.nodes.len(), f.triangle_count()),
            Some(Mesh::Solid(s)) => (d.id(), s.nodes.len(), s.tetrahedra.len()),
            None => (d.id(), 0, 0),
        })
        .collect()
}

fn meshed_cube() -> (Model, SubmeshId) {
    let cube = make_box([0.0; 3], [1.0; 3]).unwrap();
    let mut m = Model::with_defaults(&cube).unwrap();
    let s = m.new_submesh();
    for face in m.graph().cells_of_kind(ShapeKind::Face) {
        m.add_constraint(s, constraint(face, "T3", 0.2)).unwrap();
    }
    (m, s)
}

#[test]
fn recomputing_is_deterministic() {
    let (mut a, _) = meshed_cube();
    let (mut b, _) = meshed_cube();
    assert!(a.compute().unwrap().is_complete());
    assert!(b.compute().unwrap().is_complete());
    let first = counts(&a);
    assert_eq!(first, counts(&b));

    a.invalidate();
    assert!(a.graph().discretizations().all(|d| !d.is_meshed()));
    assert!(a.compute().unwrap().is_complete());
    assert_eq!(first, counts(&a));
    for (da, db) in a.graph().discretizations().zip(b.graph().discretizations()) {
        assert_eq!(da.mesh(), db.mesh(), "{}", da.id());
    }
}

#[test]
fn levels_run_bottom_up() {
    let (mut m, s) = meshed_cube();
    let report = m.compute().unwrap();
    let levels: Vec<usize> = report
        .computed
        .iter()
        .map(|u| match u.kind {
            ShapeKind::Vertex => 0,
            ShapeKind::Edge => 1,
            ShapeKind::Face => 2,
            _ => 3,
        })
        .collect();
    assert!(levels.windows(2).all(|w| w[0] <= w[1]), "{levels:?}");
    assert_eq!(report.computed.len(), 8 + 12 + 6);
    assert!(report
        .computed
        .iter()
        .filter(|u| u.kind == ShapeKind::Face)
        .all(|u| u.algorithm == "Basic2d"));

    // every face found its edges meshed for the same submesh
    for face in m.graph().cells_of_kind(ShapeKind::Face) {
        for e in m.graph().unique_shapes_explorer(face, ShapeKind::Edge).unwrap() {
            assert!(m.get_discretization_submesh(e, s).unwrap().is_meshed());
        }
    }
    // a second compute has nothing left to do
    assert!(m.compute().unwrap().computed.is_empty());
}

#[test]
fn cancelled_before_start_meshes_nothing() {
    let (mut m, _) = meshed_cube();
    m.cancel_token().cancel();
    let report = m.compute().unwrap();
    assert!(report.cancelled);
    assert!(!report.is_complete());
    assert!(report.computed.is_empty());
    assert!(report.failures.is_empty());
    // the request was consumed; the next compute runs everything
    assert!(!m.cancel_token().is_cancelled());
    let report = m.compute().unwrap();
    assert!(report.is_complete());
    assert_eq!(report.computed.len(), 8 + 12 + 6);
}

#[test]
fn constraints_change_marks_model_dirty() {
    let (mut m, s) = meshed_cube();
    m.compute().unwrap();
    let solid = m.graph().cells_of_kind(ShapeKind::Solid)[0];
    // an edge-only hypothesis on the solid reaches edges, not faces
    let extra = Constraint::new(solid, hyp("E2", 0.1));
    assert!(m.add_constraint(s, extra).unwrap());
    m.compute_constraints().unwrap();
    let edge = m.graph().cells_of_kind(ShapeKind::Edge)[0];
    // the direct face constraints still win on the faces
    let face = m.graph().cells_of_kind(ShapeKind::Face)[0];
    assert_eq!(m.get_discretization_submesh(face, s).unwrap().hypothesis().length(), 0.2);
    // edges combine both inherited lengths
    assert_eq!(m.get_discretization_submesh(edge, s).unwrap().hypothesis().length(), 0.1);
    assert!(m.compute().unwrap().is_complete());
    assert_eq!(segments(&m, edge, s), 10);
}

#[test]
fn unrecoverable_errors_abort() {
    let cube = make_box([0.0; 3], [1.0; 3]).unwrap();
    let mut m = Model::with_defaults(&cube).unwrap();
    let s = m.new_submesh();
    let face = m.graph().cells_of_kind(ShapeKind::Face)[0];
    m.add_constraint(s, constraint(face, "T3", 0.5)).unwrap();
    m.add_constraint(s, constraint(face, "T3", 0.4)).unwrap();
    assert!(matches!(m.compute(), Err(BoraError::Configuration(_))));
    assert!(matches!(
        m.recompute(DiscretizationId {
            cell: face,
            group: 9
        }),
        Err(BoraError::UnknownCell(_))
    ));
}
