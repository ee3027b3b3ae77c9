#![cfg(unix)]
mod util;
use bora_mesh::algs::Tool;
use bora_mesh::algs::volume::tetgen_volume_bound;
use bora_mesh::io::StoredMesh;
use bora_mesh::prelude::*;
use serial_test::serial;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use util::*;

fn tetgen_script(log: &Path) -> String {
    format!(
        r#"if [ "$1" = "-version" ]; then echo "TetGen fake 1.6"; exit 0; fi
test -s solid.poly || {{ echo "missing solid.poly" >&2; exit 2; }}
echo "$@" > "{log}/args"
cp solid.poly "{log}/input.poly"
cat > solid.1.mesh <<'EOF'
{ONE_TET_MEDIT}
EOF"#,
        log = log.display()
    )
}

fn netgen_script(log: &Path) -> String {
    format!(
        r#"if [ "$#" -eq 1 ]; then echo "NETGEN fake 6.2" >&2; exit 0; fi
test -s solid.stl || {{ echo "missing solid.stl" >&2; exit 2; }}
echo "$@" > "{log}/args"
cat > solid.vol <<'EOF'
{ONE_TET_VOL}
EOF"#,
        log = log.display()
    )
}

struct Setup {
    _bin: TempDir,
    log: TempDir,
    scratch: TempDir,
    store: Arc<MemoryStore>,
    model: Model,
    submesh: SubmeshId,
    solid: CellId,
}

fn setup(mesher: VolumeMesher, script: Option<&str>, timeout_ms: u64) -> Setup {
    let bin = TempDir::new().unwrap();
    let log = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let body = match (script, mesher) {
        (Some(s), _) => s.to_string(),
        (None, VolumeMesher::TetGen) => tetgen_script(log.path()),
        (None, VolumeMesher::Netgen) => netgen_script(log.path()),
    };
    let tool = fake_tool(bin.path(), "mesher", &body);
    let config = MesherConfig {
        tetgen: tool.clone(),
        netgen: tool,
        volume_mesher: mesher,
        tool_timeout: timeout_ms,
        temp_root: Some(scratch.path().to_path_buf()),
        ..Default::default()
    };
    let store = Arc::new(MemoryStore::new());
    let cube = make_box([0.0; 3], [1.0; 3]).unwrap();
    let mut model = Model::new(&cube, config, store.clone()).unwrap();
    let submesh = model.new_submesh();
    let solid = model.graph().root();
    model
        .add_constraint(submesh, constraint(solid, "T4", 0.5))
        .unwrap();
    Setup {
        _bin: bin,
        log,
        scratch,
        store,
        model,
        submesh,
        solid,
    }
}

fn scratch_is_clean(s: &Setup) -> bool {
    std::fs::read_dir(s.scratch.path()).unwrap().next().is_none()
}

#[test]
#[serial]
fn tetgen_round_trip() {
    let mut s = setup(VolumeMesher::TetGen, None, 10_000);
    assert!(s.model.tools().banner(Tool::TetGen).unwrap().contains("TetGen fake"));
    let report = s.model.compute().unwrap();
    assert!(report.is_complete(), "{:?}", report.failures);
    let last = report.computed.last().unwrap();
    assert_eq!((last.kind, last.algorithm), (ShapeKind::Solid, "TetGen"));

    let args = std::fs::read_to_string(s.log.path().join("args")).unwrap();
    let expected = format!("-a{}pYNEFg solid.poly", tetgen_volume_bound(0.5));
    assert_eq!(args.trim(), expected);
    let poly = std::fs::read_to_string(s.log.path().join("input.poly")).unwrap();
    assert!(!poly.is_empty());

    let disc = s.model.get_discretization_submesh(s.solid, s.submesh).unwrap();
    let mesh = disc.mesh().and_then(Mesh::as_solid).unwrap();
    assert_eq!(mesh.tetrahedra, vec![[0, 1, 2, 3]]);
    assert!(matches!(s.store.get(disc.id()), Some(StoredMesh::Solid(_))));
    assert!(scratch_is_clean(&s));
}

#[test]
#[serial]
fn netgen_round_trip() {
    let mut s = setup(VolumeMesher::Netgen, None, 10_000);
    let report = s.model.compute().unwrap();
    assert!(report.is_complete(), "{:?}", report.failures);
    let args = std::fs::read_to_string(s.log.path().join("args")).unwrap();
    assert_eq!(
        args.trim(),
        "-batchmode -geofile=solid.stl -meshfile=solid.vol -maxh=0.5"
    );
    let disc = s.model.get_discretization_submesh(s.solid, s.submesh).unwrap();
    assert_eq!(disc.mesh().and_then(Mesh::as_solid).unwrap().nodes.len(), 4);
    assert!(scratch_is_clean(&s));
}

#[test]
#[serial]
fn missing_tool_is_unavailable() {
    let mut s = setup(VolumeMesher::TetGen, Some("exit 0"), 10_000);
    let mut config = s.model.config().clone();
    config.tetgen = "/nonexistent/bora-tetgen".into();
    let cube = make_box([0.0; 3], [1.0; 3]).unwrap();
    s.model = Model::new(&cube, config, s.store.clone()).unwrap();
    let sub = s.model.new_submesh();
    let solid = s.model.graph().root();
    s.model.add_constraint(sub, constraint(solid, "T4", 0.5)).unwrap();
    let report = s.model.compute().unwrap();
    assert_eq!(report.failures.len(), 1);
    let (id, err) = &report.failures[0];
    assert_eq!(id.cell, solid);
    assert!(matches!(err, BoraError::AlgorithmUnavailable { .. }));
    // every face still meshed
    for f in s.model.graph().cells_of_kind(ShapeKind::Face) {
        assert!(s.model.get_discretization_submesh(f, sub).unwrap().is_meshed());
    }
}

#[test]
#[serial]
fn failing_tool_reports_stderr() {
    let script = r#"if [ "$1" = "-version" ]; then exit 0; fi
echo "self-intersecting facets" >&2
exit 3"#;
    let mut s = setup(VolumeMesher::TetGen, Some(script), 10_000);
    let report = s.model.compute().unwrap();
    let disc = s.model.get_discretization_submesh(s.solid, s.submesh).unwrap();
    match report.failure(disc.id()) {
        Some(BoraError::ExternalTool { tool, reason }) => {
            assert_eq!(tool, "tetgen");
            assert_eq!(reason, "exit status 3: self-intersecting facets");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(!disc.is_meshed());
    assert!(scratch_is_clean(&s));
}

#[test]
#[serial]
fn hung_tool_times_out() {
    let script = r#"if [ "$1" = "-version" ]; then exit 0; fi
sleep 30"#;
    let mut s = setup(VolumeMesher::TetGen, Some(script), 200);
    let start = std::time::Instant::now();
    let report = s.model.compute().unwrap();
    assert!(start.elapsed() < std::time::Duration::from_secs(10));
    let disc = s.model.get_discretization_submesh(s.solid, s.submesh).unwrap();
    assert!(matches!(
        report.failure(disc.id()),
        Some(BoraError::ExternalTool { reason, .. }) if reason.starts_with("timed out")
    ));
}

#[test]
#[serial]
fn tool_without_output_fails() {
    let script = r#"if [ "$1" = "-version" ]; then exit 0; fi
exit 0"#;
    let mut s = setup(VolumeMesher::TetGen, Some(script), 10_000);
    let report = s.model.compute().unwrap();
    let disc = s.model.get_discretization_submesh(s.solid, s.submesh).unwrap();
    assert!(matches!(
        report.failure(disc.id()),
        Some(BoraError::ExternalTool { .. })
    ));
}

#[test]
#[serial]
fn unmeshed_face_leaves_solid_incomplete() {
    let mut s = setup(VolumeMesher::TetGen, None, 10_000);
    let face = s.model.graph().cells_of_kind(ShapeKind::Face)[2];
    s.model
        .add_constraint(s.submesh, constraint(face, "Q4", 0.5))
        .unwrap();
    let report = s.model.compute().unwrap();
    assert_eq!(report.failures.len(), 2);
    let face_disc = s.model.get_discretization_submesh(face, s.submesh).unwrap();
    assert!(matches!(
        report.failure(face_disc.id()),
        Some(BoraError::AlgorithmUnavailable { .. })
    ));
    let solid_disc = s.model.get_discretization_submesh(s.solid, s.submesh).unwrap();
    assert_eq!(
        report.failure(solid_disc.id()),
        Some(&BoraError::IncompleteBoundary {
            cell: s.solid,
            boundary: face
        })
    );
    assert!(!s.log.path().join("args").exists());
}

#[test]
#[serial]
fn cancelled_solid_resumes_alone() {
    let log = TempDir::new().unwrap();
    let go = log.path().join("go");
    let script = format!(
        "if [ \"$1\" = \"-version\" ]; then exit 0; fi\n\
         if [ ! -f \"{go}\" ]; then sleep 30; fi\n{}",
        tetgen_script(log.path()),
        go = go.display()
    );
    let mut s = setup(VolumeMesher::TetGen, Some(&script), 20_000);

    let token = s.model.cancel_token();
    let h = std::thread::spawn(move || {
        std::thread::sleep(std::time::Duration::from_millis(300));
        token.cancel();
    });
    let start = std::time::Instant::now();
    let report = s.model.compute().unwrap();
    h.join().unwrap();
    assert!(start.elapsed() < std::time::Duration::from_secs(10));
    assert!(report.cancelled);
    assert!(report.failures.is_empty(), "{:?}", report.failures);
    assert_eq!(report.computed.len(), 8 + 12 + 6);
    let disc = s.model.get_discretization_submesh(s.solid, s.submesh).unwrap();
    assert_eq!(disc.state(), DiscretizationState::Pending);
    assert!(scratch_is_clean(&s));

    // only the interrupted solid runs again
    std::fs::write(&go, "").unwrap();
    let report = s.model.compute().unwrap();
    assert!(report.is_complete(), "{:?}", report.failures);
    assert_eq!(report.computed.len(), 1);
    assert_eq!(report.computed[0].id.cell, s.solid);
}
