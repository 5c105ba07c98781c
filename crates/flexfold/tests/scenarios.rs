//! End-to-end bends of a 120 x 20 x 0.1 mm test strip.
//!
//! Every scenario checks the rendered geometry against the closed-form shape
//! of the bend rather than stored reference meshes.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, SQRT_2, TAU};

use approx::assert_abs_diff_eq;
use flexfold::{
    AxisBend, BendDirection, DeformationEngine, DeformedResult, DirectionalBend, EngineConfig,
    EngineState, EngineWarning, Linear, NullProgress, Project, SliceAssignment, Spiral,
    SpiralParams, TransformMeta, Transformation,
};
use flexfold_math::{apply_affine, Bounds2, Point2, Point3, Transform};
use flexfold_mesh::{strip, LayerMesh, TriangleMesh};

const THICKNESS: f64 = 0.1;
const EPS: f64 = 1e-9;

fn teststrip(resolution: f64) -> TriangleMesh {
    strip(120.0, 20.0, THICKNESS, resolution).unwrap()
}

fn substrate(mel_trans: f64) -> LayerMesh {
    LayerMesh::new(0, "substrate", teststrip(2.0), 2.0).with_mel(2.0, mel_trans, 2.0)
}

/// Assign and render, returning the flat pieces alongside the result.
fn run(engine: &mut DeformationEngine) -> (SliceAssignment, DeformedResult) {
    engine.assign(&mut NullProgress).unwrap();
    let flat = engine.assignment().clone();
    engine.render(&mut NullProgress).unwrap();
    assert_eq!(engine.state(), EngineState::Rendered);
    (flat, engine.result().unwrap())
}

/// Index of a transformation by name.
fn index_of(engine: &DeformationEngine, name: &str) -> usize {
    engine
        .transformations()
        .iter()
        .position(|t| t.name() == name)
        .unwrap()
}

/// Pairs of (flat, rendered) vertices of every piece of `tr`.
///
/// Refinement only appends vertices, so the flat vertices are a prefix of
/// the rendered ones.
fn correspondences(
    flat: &SliceAssignment,
    engine: &DeformationEngine,
    tr: usize,
) -> Vec<(Point3, Point3)> {
    let rendered = engine.assignment().pieces(tr);
    assert_eq!(flat.pieces(tr).len(), rendered.len());
    flat.pieces(tr)
        .iter()
        .zip(rendered)
        .flat_map(|(f, r)| {
            assert!(r.mesh.num_vertices() >= f.mesh.num_vertices());
            f.mesh
                .vertices
                .iter()
                .copied()
                .zip(r.mesh.vertices.iter().copied())
                .collect::<Vec<_>>()
        })
        .collect()
}

fn rendered_vertices(engine: &DeformationEngine, tr: usize) -> Vec<Point3> {
    engine
        .assignment()
        .pieces(tr)
        .iter()
        .flat_map(|p| p.mesh.vertices.iter().copied())
        .collect()
}

fn max_z(mesh: &TriangleMesh) -> f64 {
    mesh.bounds().map_or(f64::NEG_INFINITY, |b| b.max.z)
}

#[test]
fn s1_axis_bend_wraps_onto_a_quarter_circle() {
    let mut engine = DeformationEngine::default();
    engine.add_layer(substrate(0.5)).unwrap();
    let bend = AxisBend::new(
        TransformMeta::new("fold"),
        Bounds2::new(0.0, -10.0, 20.0, 10.0),
        BendDirection::PosX,
        FRAC_PI_2,
    )
    .unwrap();
    engine.add_transformation(bend).unwrap();
    assert_eq!(engine.transformations().len(), 2);

    let (flat, result) = run(&mut engine);
    assert!(engine.warnings().is_empty());
    let r = 20.0 / FRAC_PI_2;
    let fold = index_of(&engine, "fold");
    let residual = index_of(&engine, "fold-Res");

    // Behind the hinge nothing moves.
    let fixed = &result.layers[0].fixed;
    assert!(!fixed.is_empty());
    for v in &fixed.vertices {
        assert!(v.x <= 1e-6);
        assert!(v.z >= -EPS && v.z <= THICKNESS + EPS);
    }

    // Inside the rectangle every point sits on the arc around (0, r) at
    // its distance from the neutral top.
    for (p, q) in correspondences(&flat, &engine, fold) {
        let theta = p.x.clamp(0.0, 20.0) / r;
        assert_abs_diff_eq!(q.x, (r - p.z) * theta.sin(), epsilon = EPS);
        assert_abs_diff_eq!(q.y, p.y, epsilon = EPS);
        assert_abs_diff_eq!(q.z, p.z * theta.cos() + r * (1.0 - theta.cos()), epsilon = EPS);
    }
    for q in rendered_vertices(&engine, fold) {
        let d = (q.x * q.x + (q.z - r) * (q.z - r)).sqrt();
        assert!(d >= r - THICKNESS - 1e-6 && d <= r + 1e-6, "off the arc: {q:?}");
        assert!(q.x >= -1e-6);
    }
    let flat_tris: usize = flat.pieces(fold).iter().map(|p| p.mesh.num_triangles()).sum();
    let bent_tris: usize = engine
        .assignment()
        .pieces(fold)
        .iter()
        .map(|p| p.mesh.num_triangles())
        .sum();
    assert!(bent_tris > flat_tris);

    // Past the far edge the strip stands upright.
    for (p, q) in correspondences(&flat, &engine, residual) {
        assert_abs_diff_eq!(q.x, r - p.z, epsilon = EPS);
        assert_abs_diff_eq!(q.y, p.y, epsilon = EPS);
        assert_abs_diff_eq!(q.z, r + p.x - 20.0, epsilon = EPS);
    }
    assert_abs_diff_eq!(max_z(&result.mesh), r + 40.0, epsilon = 1e-6);
}

#[test]
fn s2_directional_bend_follows_a_skewed_baseline() {
    let mut engine = DeformationEngine::default();
    engine.add_layer(substrate(1.0)).unwrap();
    let bend = DirectionalBend::new(
        TransformMeta::new("skew"),
        vec![
            Point2::new(-20.0, 10.0),
            Point2::new(0.0, -10.0),
            Point2::new(60.0, -10.0),
            Point2::new(60.0, 10.0),
        ],
        FRAC_PI_2,
    )
    .unwrap();
    let length = bend.length();
    assert_abs_diff_eq!(length, 60.0 / SQRT_2, epsilon = 1e-12);
    assert_abs_diff_eq!(bend.z_angle(), FRAC_PI_4, epsilon = 1e-12);
    engine.add_transformation(bend).unwrap();

    let (flat, result) = run(&mut engine);
    let r = length / FRAC_PI_2;
    let skew = index_of(&engine, "skew");

    // The polygon reaches the strip's end, so nothing is left for the
    // residual.
    assert!(engine.assignment().pieces(skew + 1).is_empty());
    for v in &result.layers[0].fixed.vertices {
        assert!(v.x + v.y <= -10.0 + 1e-6);
        assert!(v.z <= THICKNESS + EPS);
    }

    for (p, q) in correspondences(&flat, &engine, skew) {
        let s = (p.x + p.y + 10.0) / SQRT_2;
        let along = |v: &Point3| (v.x - v.y) / SQRT_2;
        assert_abs_diff_eq!(along(&q), along(&p), epsilon = EPS);
        let expected_z = if s <= length {
            let theta = s / r;
            p.z * theta.cos() + r * (1.0 - theta.cos())
        } else {
            r + s - length
        };
        assert_abs_diff_eq!(q.z, expected_z, epsilon = EPS);
    }

    let top = r + (80.0 - 60.0) / SQRT_2;
    assert_abs_diff_eq!(max_z(&result.mesh), top, epsilon = 1e-6);
}

#[test]
fn s3_linear_tilts_the_whole_strip() {
    let mut engine = DeformationEngine::default();
    engine.add_layer(substrate(2.0)).unwrap();
    let tilt = Linear::new(
        TransformMeta::new("tilt"),
        Bounds2::new(-60.0, -10.0, 60.0, 10.0),
        Transform::rotation_y(-30f64.to_radians()),
    )
    .unwrap();
    engine.add_transformation(tilt).unwrap();
    assert_eq!(engine.transformations().len(), 1);

    let (flat, result) = run(&mut engine);

    // The scope covers the whole substrate.
    assert!(result.layers[0].fixed.is_empty());
    assert_eq!(
        engine.warnings(),
        &[EngineWarning::EmptyFixedMesh {
            transformation: "tilt".into(),
            layer: "substrate".into(),
        }]
    );

    let (s, c) = 30f64.to_radians().sin_cos();
    let pairs = correspondences(&flat, &engine, 0);
    assert!(!pairs.is_empty());
    for (p, q) in pairs {
        assert_abs_diff_eq!(q.x, p.x * c - p.z * s, epsilon = EPS);
        assert_abs_diff_eq!(q.y, p.y, epsilon = EPS);
        assert_abs_diff_eq!(q.z, p.x * s + p.z * c, epsilon = EPS);
    }
    assert_abs_diff_eq!(max_z(&result.mesh), 60.0 * s + THICKNESS * c, epsilon = 1e-9);
}

#[test]
fn s4_spiral_winds_once_and_returns_to_the_hinge() {
    let mut engine = DeformationEngine::default();
    engine.add_layer(substrate(1.0)).unwrap();
    let params = SpiralParams {
        length: Some(70.0),
        turns: Some(1.0),
        ..Default::default()
    };
    let spiral = Spiral::new(
        TransformMeta::new("coil"),
        [Point2::new(-40.0, 10.0), Point2::new(-20.0, -10.0)],
        BendDirection::PosX.angle(),
        params,
    )
    .unwrap();
    let bend = spiral.bend().clone();
    assert_abs_diff_eq!(bend.angle(), TAU, epsilon = 1e-12);
    engine.add_transformation(spiral).unwrap();

    let (flat, _) = run(&mut engine);
    let length = bend.length();
    assert_abs_diff_eq!(length, 70.0 / SQRT_2, epsilon = 1e-9);
    let r = length / TAU;
    let pivot = bend.pivot();
    let coil = index_of(&engine, "coil");
    let residual = index_of(&engine, "coil-Res");
    assert!(matches!(
        engine.transformations()[residual],
        Transformation::Residual(_)
    ));

    // Local frame: u runs along the winding direction from the baseline,
    // w along the baseline.
    let u = |v: &Point3| ((v.x - pivot.x) + (v.y - pivot.y)) / SQRT_2;
    let w = |v: &Point3| (-(v.x - pivot.x) + (v.y - pivot.y)) / SQRT_2;

    let mut on_far_edge = 0;
    for (p, q) in correspondences(&flat, &engine, coil) {
        let s = u(&p);
        assert!(s >= -1e-6 && s <= length + 1e-6);
        assert_abs_diff_eq!(w(&q), w(&p), epsilon = EPS);
        let d = (u(&q).powi(2) + (q.z - r).powi(2)).sqrt();
        assert_abs_diff_eq!(d, r - p.z, epsilon = 1e-9);
        if (s - length).abs() < 1e-6 {
            on_far_edge += 1;
            assert_abs_diff_eq!(u(&q), 0.0, epsilon = 1e-6);
            assert_abs_diff_eq!(q.z, p.z, epsilon = 1e-6);
        }
    }
    assert!(on_far_edge > 0);

    // The rest of the strip is carried back by one sheet length.
    let pairs = correspondences(&flat, &engine, residual);
    assert!(!pairs.is_empty());
    for (p, q) in pairs {
        assert_abs_diff_eq!(u(&q), u(&p) - length, epsilon = EPS);
        assert_abs_diff_eq!(w(&q), w(&p), epsilon = EPS);
        assert_abs_diff_eq!(q.z, p.z, epsilon = EPS);
    }
}

#[test]
fn s5_stacked_layers_stay_together() {
    let copper_thickness = 0.035;
    let mel_trans = 1.0;
    let mut copper = strip(120.0, 20.0, copper_thickness, 4.0).unwrap();
    for v in &mut copper.vertices {
        v.z += THICKNESS;
    }

    let mut engine = DeformationEngine::default();
    engine
        .add_layer(LayerMesh::new(0, "substrate", teststrip(4.0), 4.0).with_mel(4.0, mel_trans, 4.0))
        .unwrap();
    engine
        .add_layer(LayerMesh::new(1, "copper", copper, 4.0).with_mel(4.0, mel_trans, 4.0))
        .unwrap();
    let bend = AxisBend::new(
        TransformMeta::new("fold"),
        Bounds2::new(0.0, -10.0, 20.0, 10.0),
        BendDirection::PosX,
        FRAC_PI_2,
    )
    .unwrap();
    engine.add_transformation(bend).unwrap();

    let (flat, result) = run(&mut engine);
    assert_eq!(result.layers.len(), 2);
    let substrate = &result.layers[0];
    let copper = &result.layers[1];

    // The copper splits the same way the substrate does.
    assert!(!copper.fixed.is_empty());
    let names: Vec<&str> = copper.pieces.iter().map(|p| p.transformation.as_str()).collect();
    assert_eq!(names, vec!["fold", "fold-Res"]);
    for v in &copper.fixed.vertices {
        assert!(v.x <= 1e-6);
    }

    // Pair every flat copper vertex with the substrate top vertex at the
    // same (x, y), then compare where both ended up.
    let layer_pairs = |tr: usize, layer: usize| -> Vec<(Point3, Point3)> {
        let f = flat.for_layer(tr, layer).next().unwrap();
        let r = engine.assignment().for_layer(tr, layer).next().unwrap();
        f.mesh
            .vertices
            .iter()
            .copied()
            .zip(r.mesh.vertices.iter().copied())
            .collect()
    };
    for name in ["fold", "fold-Res"] {
        let tr = index_of(&engine, name);
        let under = layer_pairs(tr, 0);
        let over = layer_pairs(tr, 1);
        assert!(!over.is_empty());
        for (pc, qc) in over {
            let (ps, qs) = under
                .iter()
                .filter(|(ps, _)| (ps.x - pc.x).abs() < 1e-9 && (ps.y - pc.y).abs() < 1e-9)
                .max_by(|a, b| a.0.z.total_cmp(&b.0.z))
                .unwrap_or_else(|| panic!("no substrate vertex under {pc:?}"));
            let gap = (qc - qs).norm();
            assert_abs_diff_eq!(gap, (pc.z - ps.z).abs(), epsilon = 1e-9);
            assert!(gap <= mel_trans, "{name}: copper {pc:?} is {gap} off the substrate");
        }
    }
    let fused = substrate.mesh.num_triangles() + copper.mesh.num_triangles();
    assert_eq!(result.mesh.num_triangles(), fused);
}

#[test]
fn project_document_reproduces_the_axis_bend() {
    let doc = r#"{
        "mel": 2.0, "mel_trans": 0.5, "mel_residual": 2.0,
        "layers": [{ "name": "substrate", "file": "substrate.stl" }],
        "transformations": [
            { "type": "ZBend", "name": "fold", "dir": "POSX",
              "xmin": 0, "xmax": 20, "ymin": -10, "ymax": 10, "angle": 90 }
        ]
    }"#;
    let project = Project::from_json_str(doc).unwrap();
    let mut engine = project.build_engine(vec![teststrip(2.0)]).unwrap();
    let (_, result) = run(&mut engine);

    let r = 20.0 / FRAC_PI_2;
    assert_abs_diff_eq!(max_z(&result.mesh), r + 40.0, epsilon = 1e-6);
}

#[test]
fn only_baselayer_skips_upper_layers() {
    let config = EngineConfig {
        only_baselayer: true,
        ..Default::default()
    };
    let mut engine = DeformationEngine::new(config);
    engine.add_layer(substrate(1.0)).unwrap();
    engine
        .add_layer(LayerMesh::new(1, "copper", teststrip(2.0), 2.0))
        .unwrap();
    let bend = AxisBend::new(
        TransformMeta::new("fold"),
        Bounds2::new(0.0, -10.0, 20.0, 10.0),
        BendDirection::PosX,
        FRAC_PI_2,
    )
    .unwrap();
    engine.add_transformation(bend).unwrap();

    let (_, result) = run(&mut engine);
    assert_eq!(result.layers.len(), 1);
    assert_eq!(result.layers[0].name, "substrate");
    assert!(!engine.layers()[1].mesh.is_empty());
}

#[test]
fn assign_before_render_returns_flat_pieces() {
    let mut engine = DeformationEngine::default();
    engine.add_layer(substrate(1.0)).unwrap();
    let point = Point3::new(10.0, 0.0, THICKNESS);
    let bend = AxisBend::new(
        TransformMeta::new("fold"),
        Bounds2::new(0.0, -10.0, 20.0, 10.0),
        BendDirection::PosX,
        FRAC_PI_2,
    )
    .unwrap();
    let expected = apply_affine(&bend.matrix_at(&point), &point);
    assert!(expected.z > THICKNESS);
    engine.add_transformation(bend).unwrap();
    engine.assign(&mut NullProgress).unwrap();

    let result = engine.result().unwrap();
    assert_abs_diff_eq!(max_z(&result.mesh), THICKNESS, epsilon = EPS);
}
