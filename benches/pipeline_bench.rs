use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use bora_mesh::algs::Triangulation;
use bora_mesh::prelude::*;

fn cube_model(length: f64) -> Model {
    let cube = make_box([0.0; 3], [1.0; 3]).expect("box");
    let mut m = Model::with_defaults(&cube).expect("model");
    let s = m.new_submesh();
    for face in m.graph().cells_of_kind(ShapeKind::Face) {
        let h = Hypothesis::new("T3", length).expect("hypothesis");
        m.add_constraint(s, Constraint::new(face, h)).expect("constraint");
    }
    m
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.sample_size(10);

    for &length in &[0.2f64, 0.1] {
        group.bench_with_input(
            BenchmarkId::new("cube_surface", length),
            &length,
            |b, &l| {
                let mut m = cube_model(l);
                m.compute_constraints().expect("constraints");
                b.iter(|| {
                    m.invalidate();
                    let report = m.compute().expect("compute");
                    black_box(report.computed.len());
                });
            },
        );
    }

    group.bench_function("constraints_glued_boxes", |b| {
        let shape = make_glued_boxes().expect("glued boxes");
        let mut m = Model::with_defaults(&shape).expect("model");
        let solids = m.graph().cells_of_kind(ShapeKind::Solid);
        for (i, solid) in solids.into_iter().enumerate() {
            let s = m.new_submesh();
            let h = Hypothesis::new("T4", 0.5 / (i + 1) as f64).expect("hypothesis");
            m.add_constraint(s, Constraint::new(solid, h)).expect("constraint");
        }
        b.iter(|| {
            m.compute_constraints().expect("constraints");
            black_box(m.graph().discretizations().count());
        });
    });

    group.finish();
}

fn bench_triangulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("triangulation");
    for &n in &[16usize, 64] {
        group.bench_with_input(BenchmarkId::new("grid_insert", n), &n, |b, &n| {
            b.iter(|| {
                let mut tr = Triangulation::new([-1.0, -1.0], [n as f64 + 1.0, n as f64 + 1.0]);
                for i in 0..n {
                    for j in 0..n {
                        // jitter keeps the points off co-circular configurations
                        let x = i as f64 + 0.01 * ((i * 7 + j * 3) % 5) as f64;
                        let y = j as f64 + 0.01 * ((i * 5 + j * 11) % 7) as f64;
                        black_box(tr.insert([x, y]));
                    }
                }
                black_box(tr.triangles().len());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_pipeline, bench_triangulation);
criterion_main!(benches);
