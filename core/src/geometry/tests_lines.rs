use super::{
    are_parallel, closest_points_between_lines, project_point_on_line, ApproxEq, GeometryError, Line3, Point3, Vector3,
};

#[test]
fn test_parallel_lines_offset() {
    let a = Line3::new(Point3::origin(), Point3::new(1.0, 0.0, 0.0));
    let offset = Vector3::new(0.0, 1.0, 0.0);
    let b = Line3::new(a.start + offset, a.end + offset);

    for eps in [0.0, 1e-12, 1e-6, 1e-2, 0.5] {
        let approach = closest_points_between_lines(&a, &b, eps).expect("parallel branch");
        assert_eq!(approach.t_a, 0.0);
        assert!(approach.distance.approx_eq(&1.0), "eps={} distance={}", eps, approach.distance);
    }
}

#[test]
fn test_parallel_lines_skewed_direction() {
    // Non axis-aligned direction, normalized dot may miss 1.0 by rounding
    let dir = Vector3::new(1.0, 2.0, 3.0);
    let a = Line3::new(Point3::new(0.3, -0.7, 2.0), Point3::new(0.3, -0.7, 2.0) + dir);
    let offset = dir.cross(&Vector3::x()).normalize();
    let b = Line3::new(a.start + offset, a.end + offset);

    let approach = closest_points_between_lines(&a, &b, 0.0).expect("parallel branch");
    assert_eq!(approach.t_a, 0.0);
    assert!(approach.distance.approx_eq(&1.0));
}

#[test]
fn test_parallel_projection_is_clamped() {
    let a = Line3::new(Point3::origin(), Point3::new(1.0, 0.0, 0.0));
    let b = Line3::new(Point3::new(5.0, 1.0, 0.0), Point3::new(6.0, 1.0, 0.0));

    let approach = closest_points_between_lines(&a, &b, 1e-6).unwrap();
    assert_eq!(approach.t_a, 0.0);
    // Unclamped projection would be -5
    assert_eq!(approach.t_b, 0.0);
    assert!(approach.distance.approx_eq(&26.0_f64.sqrt()));
}

#[test]
fn test_skew_lines() {
    // X axis and a line parallel to Y through z = 2
    let a = Line3::new(Point3::new(-1.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0));
    let b = Line3::new(Point3::new(3.0, -1.0, 2.0), Point3::new(3.0, 1.0, 2.0));

    let approach = closest_points_between_lines(&a, &b, 1e-6).unwrap();
    assert!(a.at(approach.t_a).approx_eq(&Point3::new(3.0, 0.0, 0.0)));
    assert!(b.at(approach.t_b).approx_eq(&Point3::new(3.0, 0.0, 2.0)));
    assert!(approach.distance.approx_eq(&2.0));
}

#[test]
fn test_intersecting_lines() {
    let a = Line3::new(Point3::origin(), Point3::new(2.0, 2.0, 0.0));
    let b = Line3::new(Point3::new(0.0, 2.0, 0.0), Point3::new(2.0, 0.0, 0.0));

    let approach = closest_points_between_lines(&a, &b, 1e-6).unwrap();
    assert!(approach.t_a.approx_eq(&0.5));
    assert!(approach.t_b.approx_eq(&0.5));
    assert!(approach.distance.approx_eq(&0.0));
}

#[test]
fn test_nearly_parallel_singular_system() {
    // Angle small enough to slip past a zero tolerance but leave the
    // determinant below the singular threshold.
    let a = Line3::new(Point3::origin(), Point3::new(1.0, 0.0, 0.0));
    let b = Line3::new(Point3::new(0.0, 1.0, 0.0), Point3::new(1.0, 1.0 + 1e-6, 0.0));

    let result = closest_points_between_lines(&a, &b, 0.0);
    assert!(matches!(result, Err(GeometryError::DegenerateGeometry(_))));

    // A looser tolerance classifies the same pair as parallel
    assert!(closest_points_between_lines(&a, &b, 1e-9).is_ok());
}

#[test]
fn test_zero_length_lines_take_parallel_branch() {
    let a = Line3::new(Point3::origin(), Point3::origin());
    let b = Line3::new(Point3::new(0.0, 3.0, 0.0), Point3::new(0.0, 3.0, 0.0));

    let approach = closest_points_between_lines(&a, &b, 1e-6).unwrap();
    assert_eq!(approach.t_a, 0.0);
    assert_eq!(approach.t_b, 0.0);
    assert!(approach.distance.approx_eq(&3.0));
}

#[test]
fn test_are_parallel_symmetry() {
    let dirs = [
        Vector3::x(),
        Vector3::new(1.0, 1e-4, 0.0),
        Vector3::new(-2.0, 0.0, 0.0),
        Vector3::new(0.3, -0.4, 12.0),
        Vector3::new(1e-9, 0.0, 0.0),
        Vector3::zeros(),
        Vector3::new(1.0, 2.0, 3.0),
    ];
    for eps in [0.0, 1e-9, 1e-6, 1e-2] {
        for a in &dirs {
            for b in &dirs {
                assert_eq!(are_parallel(a, b, eps), are_parallel(b, a, eps), "a={:?} b={:?} eps={}", a, b, eps);
            }
        }
    }
}

#[test]
fn test_closest_points_rejects_non_finite_lines() {
    let good = Line3::new(Point3::origin(), Point3::new(0.0, 1.0, 0.0));
    let bad = [
        Line3::new(Point3::new(f64::NAN, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)),
        Line3::new(Point3::origin(), Point3::new(1.0, f64::NAN, 0.0)),
        Line3::new(Point3::origin(), Point3::new(f64::INFINITY, 0.0, 0.0)),
        Line3::new(Point3::new(0.0, 0.0, f64::NEG_INFINITY), Point3::origin()),
    ];
    for line in &bad {
        assert!(line.is_degenerate(), "{:?}", line);
        for eps in [0.0, 1e-6] {
            let expected = Err(GeometryError::DegenerateGeometry("non-finite line coordinates"));
            assert_eq!(closest_points_between_lines(line, &good, eps), expected);
            assert_eq!(closest_points_between_lines(&good, line, eps), expected);
        }
    }
}

#[test]
fn test_project_onto_non_finite_line() {
    let query = Point3::new(1.0, 2.0, 3.0);
    for end in [
        Point3::new(f64::NAN, 0.0, 0.0),
        Point3::new(0.0, f64::INFINITY, 0.0),
    ] {
        assert!(matches!(
            project_point_on_line(&query, &Point3::origin(), &end),
            Err(GeometryError::DegenerateGeometry(_))
        ));
    }

    // A non-finite query on a good line is passed through, not rejected
    let proj = project_point_on_line(
        &Point3::new(f64::NAN, 0.0, 0.0),
        &Point3::origin(),
        &Point3::new(1.0, 0.0, 0.0),
    )
    .unwrap();
    assert!(proj.x.is_nan());
}

#[test]
fn test_are_parallel_non_finite_directions() {
    let nan = Vector3::new(f64::NAN, 0.0, 0.0);
    let inf = Vector3::new(0.0, f64::INFINITY, 0.0);
    for eps in [0.0, 1e-6] {
        for other in [Vector3::x(), Vector3::new(0.3, -0.4, 12.0), nan, inf] {
            assert!(are_parallel(&nan, &other, eps));
            assert!(are_parallel(&other, &nan, eps));
            assert!(are_parallel(&inf, &other, eps));
            assert!(are_parallel(&other, &inf, eps));
        }
    }
}

#[test]
fn test_closest_point_on_segment() {
    let seg = Line3::new(Point3::origin(), Point3::new(10.0, 0.0, 0.0));

    let inside = seg.closest_point_on_segment(&Point3::new(4.0, 3.0, 0.0));
    assert!(inside.approx_eq(&Point3::new(4.0, 0.0, 0.0)));

    let before = seg.closest_point_on_segment(&Point3::new(-5.0, 1.0, 0.0));
    assert_eq!(before, seg.start);

    let after = seg.closest_point_on_segment(&Point3::new(12.0, -1.0, 2.0));
    assert!(after.approx_eq(&seg.end));

    let point = Line3::new(Point3::new(1.0, 1.0, 1.0), Point3::new(1.0, 1.0, 1.0));
    assert_eq!(point.closest_point_on_segment(&Point3::new(5.0, 5.0, 5.0)), point.start);
}
