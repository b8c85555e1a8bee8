use approx::assert_relative_eq;
use calib_consensus::Ransac;
use calib_core::{
    nalgebra::{Point3, Rotation3, Vector3},
    CalibError, Pose,
};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use tool_tip::{
    estimate_position_3d_6d, estimate_tool_tip, estimate_tool_tip_with, tool_tip_ransac_parameters,
    ToolTip,
};

const INLIER_THRESHOLD: f64 = 1e-3;

fn truth() -> ToolTip {
    ToolTip {
        world_point: Point3::new(0.12, -0.4, 0.9),
        local_offset: Point3::new(0.0, 0.02, -0.15),
    }
}

fn random_rotation(rng: &mut impl Rng) -> Rotation3<f64> {
    Rotation3::new(Vector3::new(
        rng.gen_range(-0.8..0.8),
        rng.gen_range(-0.8..0.8),
        rng.gen_range(-0.8..0.8),
    ))
}

/// A marker pose that puts the tip exactly on the pivot.
fn pivot_pose(tip: &ToolTip, rotation: Rotation3<f64>) -> Pose {
    let translation = tip.world_point.coords - rotation * tip.local_offset.coords;
    Pose::from_parts(translation, rotation)
}

/// A pose whose tip misses the pivot by 5 to 50 centimeters.
fn slipped_pose(rng: &mut impl Rng, tip: &ToolTip) -> Pose {
    let pose = pivot_pose(tip, random_rotation(rng));
    let direction = Vector3::new(
        rng.gen_range(-1.0..1.0),
        rng.gen_range(-1.0..1.0),
        rng.gen_range(-1.0..1.0),
    )
    .normalize();
    let slip = direction * rng.gen_range(0.05..0.5);
    Pose::from_parts(pose.translation() + slip, *pose.rotation())
}

/// Eight good poses hidden among twelve slipped ones.
fn recording(seed: u64) -> Vec<Pose> {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let tip = truth();
    let mut poses: Vec<Pose> = (0..20)
        .map(|i| {
            if i % 5 < 2 {
                pivot_pose(&tip, random_rotation(&mut rng))
            } else {
                slipped_pose(&mut rng, &tip)
            }
        })
        .collect();
    poses.rotate_left(3);
    poses
}

fn world_error(tip: &ToolTip) -> f64 {
    (tip.world_point - truth().world_point).norm()
}

#[test]
fn exact_poses_are_solved() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
    let poses: Vec<Pose> = (0..6)
        .map(|_| pivot_pose(&truth(), random_rotation(&mut rng)))
        .collect();
    let tip = estimate_position_3d_6d(&poses).unwrap();
    assert_relative_eq!(tip.world_point, truth().world_point, epsilon = 1e-9);
    assert_relative_eq!(tip.local_offset, truth().local_offset, epsilon = 1e-9);
}

#[test]
fn two_poses_are_rank_deficient() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
    let poses = [
        pivot_pose(&truth(), random_rotation(&mut rng)),
        pivot_pose(&truth(), random_rotation(&mut rng)),
    ];
    assert_eq!(
        estimate_position_3d_6d(&poses),
        Err(CalibError::RankDeficient("tool tip estimation"))
    );
}

#[test]
fn same_orientation_is_rank_deficient() {
    let rotation = Rotation3::from_euler_angles(0.1, 0.2, 0.3);
    let poses: Vec<Pose> = (0..5)
        .map(|i| Pose::from_parts(Vector3::new(i as f64, 0.0, 0.0), rotation))
        .collect();
    assert_eq!(
        estimate_position_3d_6d(&poses),
        Err(CalibError::RankDeficient("tool tip estimation"))
    );
}

#[test]
fn robust_beats_least_squares() {
    let _ = pretty_env_logger::try_init();
    let poses = recording(2);
    let result = estimate_tool_tip(&poses, tool_tip_ransac_parameters(INLIER_THRESHOLD, 6, 500))
        .unwrap();
    let robust = result.model.expect("no consensus");
    assert_eq!(result.inlier_count(), 8);
    assert!(result
        .inliers
        .iter()
        .all(|&ix| (ix + 3) % 20 % 5 < 2));

    let naive = estimate_position_3d_6d(&poses).unwrap();
    assert!(world_error(&robust) < world_error(&naive));
    assert!(world_error(&robust) < INLIER_THRESHOLD);
}

#[test]
fn same_seed_same_tip() {
    let poses = recording(3);
    let parameters = tool_tip_ransac_parameters(INLIER_THRESHOLD, 6, 200).seed(42);
    let first = estimate_tool_tip(&poses, parameters).unwrap();
    let second = estimate_tool_tip_with(
        &poses,
        Ransac::new(parameters, Xoshiro256PlusPlus::seed_from_u64(42)),
    )
    .unwrap();
    assert_eq!(first, second);
    assert!(first.model.is_some());
}

#[test]
fn no_consensus_reports_no_tip() {
    let poses = recording(4);
    let result = estimate_tool_tip(&poses, tool_tip_ransac_parameters(INLIER_THRESHOLD, 9, 200))
        .unwrap();
    assert!(result.model.is_none());
    assert_eq!(result.inlier_count(), 0);
}
