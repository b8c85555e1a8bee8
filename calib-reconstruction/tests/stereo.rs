use approx::assert_relative_eq;
use calib_core::{
    nalgebra::{Matrix3, Matrix3x4, Point2, Point3, Rotation3, Vector3},
    project_point, projection_matrix, CalibError, Pose,
};
use calib_reconstruction::{
    epipolar_cost_matrix, get_3d_position, get_3d_position_pair, get_3d_position_with_residual,
    reconstruct_3d_points, Munkres, ReconstructionSettings, Reconstructor,
};
use eight_point::{fundamental_matrix_from_poses, FundamentalMatrix};
use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

struct Stereo {
    first: Matrix3x4<f64>,
    second: Matrix3x4<f64>,
    fundamental: FundamentalMatrix<f64>,
}

fn stereo() -> Stereo {
    let k = Matrix3::new(700.0, 0.0, 320.0, 0.0, 700.0, 240.0, 0.0, 0.0, 1.0);
    let first = Pose::identity();
    let second = Pose::from_parts(
        Vector3::new(-0.4, 0.02, 0.01),
        Rotation3::from_euler_angles(0.01, -0.03, 0.02),
    );
    Stereo {
        first: projection_matrix(&k, &first),
        second: projection_matrix(&k, &second),
        fundamental: fundamental_matrix_from_poses(&first, &second, &k, &k).unwrap(),
    }
}

fn random_points(rng: &mut impl Rng, count: usize) -> Vec<Point3<f64>> {
    (0..count)
        .map(|_| {
            Point3::new(
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(3.0..5.0),
            )
        })
        .collect()
}

fn project(projection: &Matrix3x4<f64>, points: &[Point3<f64>]) -> Vec<Point2<f64>> {
    points
        .iter()
        .map(|p| project_point(projection, p).unwrap())
        .collect()
}

#[test]
fn shuffled_correspondences_are_recovered() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
    let rig = stereo();
    let truth = random_points(&mut rng, 12);
    let first_points = project(&rig.first, &truth);
    let mut second_points = project(&rig.second, &truth);
    second_points.shuffle(&mut rng);

    let points = reconstruct_3d_points(
        &first_points,
        &second_points,
        &rig.first,
        &rig.second,
        &rig.fundamental,
    )
    .unwrap();
    assert_eq!(points.len(), truth.len());
    for (point, truth) in points.iter().zip(&truth) {
        assert_relative_eq!(*point, *truth, epsilon = 1e-6);
    }
}

#[test]
fn result_is_bounded_by_smaller_set() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
    let rig = stereo();
    let truth = random_points(&mut rng, 12);
    let first_points = project(&rig.first, &truth);
    let mut seen_twice = truth[..7].to_vec();
    seen_twice.shuffle(&mut rng);
    let second_points = project(&rig.second, &seen_twice);

    let points = reconstruct_3d_points(
        &first_points,
        &second_points,
        &rig.first,
        &rig.second,
        &rig.fundamental,
    )
    .unwrap();
    assert_eq!(points.len(), 7);
    for point in &points {
        assert!(truth[..7].iter().any(|t| (t - point).norm() < 1e-6));
    }

    // The other way around, every second view point finds its partner.
    let points = reconstruct_3d_points(
        &second_points,
        &first_points,
        &rig.second,
        &rig.first,
        &FundamentalMatrix(rig.fundamental.0.transpose()),
    )
    .unwrap();
    assert_eq!(points.len(), 7);
}

#[test]
fn gate_drops_unrelated_pairs() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(2);
    let rig = stereo();
    let truth = random_points(&mut rng, 8);
    let first_points = project(&rig.first, &truth);
    let mut second_points = project(&rig.second, &truth);
    // Lines are close to horizontal, so this moves the point off its epipolar line.
    second_points[3] = Point2::new(second_points[3].x, second_points[3].y + 8.0);

    let ungated = reconstruct_3d_points(
        &first_points,
        &second_points,
        &rig.first,
        &rig.second,
        &rig.fundamental,
    )
    .unwrap();
    assert_eq!(ungated.len(), 8);

    let gated = Reconstructor::new(ReconstructionSettings {
        max_epipolar_distance: Some(1.0),
        ..ReconstructionSettings::default()
    })
    .reconstruct(
        &first_points,
        &second_points,
        &rig.first,
        &rig.second,
        &rig.fundamental,
    )
    .unwrap();
    // The displaced point may be traded with a neighbor, then both of those pairs go.
    assert!(gated.len() == 7 || gated.len() == 6);
    for point in &gated {
        assert!(truth.iter().any(|t| (t - point).norm() < 1e-6));
    }
}

#[test]
fn empty_sets_reconstruct_nothing() {
    let rig = stereo();
    let first_points = project(&rig.first, &[Point3::new(0.0, 0.0, 4.0)]);
    let points =
        reconstruct_3d_points(&first_points, &[], &rig.first, &rig.second, &rig.fundamental)
            .unwrap();
    assert!(points.is_empty());
}

#[test]
fn cost_matrix_minimum_is_the_true_matching() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
    let rig = stereo();
    let truth = random_points(&mut rng, 6);
    let first_points = project(&rig.first, &truth);
    let second_points = project(&rig.second, &truth);
    let costs = epipolar_cost_matrix(&first_points, &second_points, &rig.fundamental);
    assert_eq!(costs.shape(), (6, 6));
    let assignment = Munkres::new(costs).solve();
    assert_eq!(assignment.row_match_list(), &[0, 1, 2, 3, 4, 5]);
}

#[test]
fn multi_view_position() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(4);
    let rig = stereo();
    let third = projection_matrix(
        &Matrix3::new(650.0, 0.0, 300.0, 0.0, 650.0, 250.0, 0.0, 0.0, 1.0),
        &Pose::from_parts(
            Vector3::new(0.3, -0.3, 0.1),
            Rotation3::from_euler_angles(0.05, 0.05, 0.0),
        ),
    );
    let projections = [rig.first, rig.second, third];
    for truth in random_points(&mut rng, 20) {
        let observations = project(&projections[0], &[truth])
            .into_iter()
            .chain(project(&projections[1], &[truth]))
            .chain(project(&projections[2], &[truth]))
            .collect::<Vec<_>>();
        let linear = get_3d_position(&projections, &observations, false).unwrap();
        assert_relative_eq!(linear, truth, epsilon = 1e-6);

        let (refined, residual) =
            get_3d_position_with_residual(&projections, &observations, true).unwrap();
        assert_relative_eq!(refined, truth, epsilon = 1e-6);
        assert!(residual.unwrap() < 1e-4);

        let pair =
            get_3d_position_pair(&rig.first, &rig.second, &observations[0], &observations[1])
                .unwrap();
        assert_relative_eq!(pair, truth, epsilon = 1e-6);
    }
}

#[test]
fn one_view_is_not_enough() {
    let rig = stereo();
    let observations = project(&rig.first, &[Point3::new(0.0, 0.0, 4.0)]);
    let error = get_3d_position(&[rig.first], &observations, true).unwrap_err();
    assert!(matches!(error, CalibError::NotEnoughData { .. }));

    let error = get_3d_position(&[rig.first, rig.second], &observations, false).unwrap_err();
    assert!(matches!(error, CalibError::LengthMismatch { .. }));
}

#[test]
fn single_precision_position() {
    let rig = stereo();
    let projections = [rig.first.map(|x| x as f32), rig.second.map(|x| x as f32)];
    let truth = Point3::new(0.2f32, -0.1, 4.0);
    let observations: Vec<Point2<f32>> = projections
        .iter()
        .map(|p| project_point(p, &truth).unwrap())
        .collect();
    let point = get_3d_position(&projections, &observations, true).unwrap();
    assert!((point - truth).norm() < 1e-3);
}
