mod common;

use approx::assert_relative_eq;
use common::{drifting_progression, progression_json, Workspace, TWO_TUBES};
use nalgebra::{Point3, Vector3};
use regtuner::{
    transform_point_set, windowed_iterations, RigidParameters, Trace, TubeGeometry, TunerError,
};

fn drifting_trace(ws: &Workspace) -> Trace {
    let path = ws.write("progression.json", &drifting_progression());
    Trace::load(&path).unwrap()
}

#[test]
fn test_iteration_count_and_parameters() {
    let ws = Workspace::new();
    let trace = drifting_trace(&ws);

    assert_eq!(trace.iteration_count(), 4);
    assert_eq!(*trace.fixed_parameters(), Point3::new(10.0, 0.0, 0.0));

    for iteration in 0..=trace.iteration_count() {
        assert!(trace.parameters_at(iteration).is_ok());
    }
    assert_eq!(
        trace.parameters_at(2).unwrap().to_array(),
        [0.0, 0.0, 0.2, 2.0, 0.0, 0.0]
    );
    assert_eq!(
        trace.parameters_at(5),
        Err(TunerError::IndexOutOfRange {
            iteration: 5,
            iteration_count: 4
        })
    );
}

#[test]
fn test_identity_parameters_keep_points() {
    let ws = Workspace::new();
    let trace = drifting_trace(&ws);
    let points = vec![Point3::new(1.0, 2.0, 3.0), Point3::new(-4.0, 0.5, 9.0)];

    let moved = transform_point_set(&trace, 0, &points, trace.fixed_parameters()).unwrap();
    assert_eq!(moved, points);
}

#[test]
fn test_pure_translation_ignores_center() {
    let params = RigidParameters::new(Vector3::zeros(), Vector3::new(1.0, -2.0, 0.5));
    let p = Point3::new(3.0, 3.0, 3.0);

    let a = params.apply(&p, &Point3::origin());
    let b = params.apply(&p, &Point3::new(100.0, -50.0, 7.0));
    assert_relative_eq!(a, b, epsilon = 1e-12);
    assert_relative_eq!(a, Point3::new(4.0, 1.0, 3.5), epsilon = 1e-12);
}

#[test]
fn test_rotation_order_matters() {
    let half_pi = std::f64::consts::FRAC_PI_2;
    let p = Point3::new(0.0, 1.0, 0.0);
    let xy = RigidParameters::new(Vector3::new(half_pi, half_pi, 0.0), Vector3::zeros());

    // X first: (0,1,0) -> (0,0,1), then Y: (0,0,1) -> (1,0,0)
    assert_relative_eq!(
        xy.apply(&p, &Point3::origin()),
        Point3::new(1.0, 0.0, 0.0),
        epsilon = 1e-12
    );

    // moving the X angle onto Z changes where the point lands
    let yz = RigidParameters::new(Vector3::new(0.0, half_pi, half_pi), Vector3::zeros());
    let swapped = yz.apply(&p, &Point3::origin());
    assert_relative_eq!(swapped, Point3::new(-1.0, 0.0, 0.0), epsilon = 1e-12);
    assert!((swapped - xy.apply(&p, &Point3::origin())).norm() > 1.0);

    // generic angles too
    let q = Point3::new(0.3, -1.2, 2.5);
    let a = RigidParameters::new(Vector3::new(0.4, 0.7, 0.0), Vector3::zeros());
    let b = RigidParameters::new(Vector3::new(0.0, 0.7, 0.4), Vector3::zeros());
    assert!((a.apply(&q, &Point3::origin()) - b.apply(&q, &Point3::origin())).norm() > 1e-3);

    // Y first would leave (0,1,0) in place before X sends it to (0,0,1)
    let y_then_x = (regtuner::transform::axis_rotation(half_pi, regtuner::transform::Axis::X)
        * regtuner::transform::axis_rotation(half_pi, regtuner::transform::Axis::Y))
        * p;
    assert_relative_eq!(y_then_x, Point3::new(0.0, 0.0, 1.0), epsilon = 1e-12);
}

#[test]
fn test_rotation_about_center_keeps_center() {
    let ws = Workspace::new();
    let trace = drifting_trace(&ws);
    let center = *trace.fixed_parameters();

    // iteration 3: rotation about Z then a translation of 3 along X
    let moved = transform_point_set(&trace, 3, &[center], &center).unwrap();
    assert_relative_eq!(moved[0], Point3::new(13.0, 0.0, 0.0), epsilon = 1e-12);
}

#[test]
fn test_tubes_follow_the_trace() {
    let ws = Workspace::new();
    let trace = drifting_trace(&ws);
    let tubes = TubeGeometry::from_tre(&ws.write("vessels.tre", TWO_TUBES)).unwrap();

    let params = trace.parameters_at(4).unwrap();
    let moved = tubes.transformed(&params, trace.fixed_parameters());
    let expected =
        transform_point_set(&trace, 4, tubes.points(), trace.fixed_parameters()).unwrap();

    assert_eq!(moved.points(), expected.as_slice());
    assert_eq!(moved.tubes(), tubes.tubes());
    assert_eq!(tubes.points()[1], Point3::new(10.0, 0.0, 0.0));
}

#[test]
fn test_windows() {
    assert_eq!(
        windowed_iterations(5, 4, 12).collect::<Vec<_>>(),
        vec![5, 4, 3, 2]
    );
    assert_eq!(windowed_iterations(2, 4, 12).collect::<Vec<_>>(), vec![2, 1, 0]);
    assert_eq!(windowed_iterations(12, 4, 10).collect::<Vec<_>>(), vec![10, 9]);
    assert_eq!(windowed_iterations(3, 0, 10).count(), 0);
}

#[test]
fn test_empty_progression() {
    let ws = Workspace::new();
    let path = ws.write("progression.json", &progression_json([0.0; 3], &[]));

    assert_eq!(
        Trace::load(&path),
        Err(TunerError::TraceEmpty(path.to_string()))
    );
}

#[test]
fn test_wrong_parameter_count() {
    let ws = Workspace::new();
    let path = ws.write(
        "progression.json",
        r#"{ "FixedParameters": [0, 0, 0],
             "OptimizationParameterProgression": [
                { "Iteration": 0, "Parameters": [0, 0, 0, 0, 0, 0], "CostFunctionValue": 2.0 },
                { "Iteration": 1, "Parameters": [0, 0, 0, 0, 0], "CostFunctionValue": 1.0 } ] }"#,
    );

    match Trace::load(&path) {
        Err(TunerError::TraceFormat { path: p, reason }) => {
            assert_eq!(p, path.as_str());
            assert_eq!(reason, "record 1: Parameters has 5 values, expected 6");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_missing_file() {
    let ws = Workspace::new();
    assert!(matches!(
        Trace::load(&ws.path("nowhere.json")),
        Err(TunerError::TraceFormat { .. })
    ));
}
