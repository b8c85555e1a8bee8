//! Tool tip calibration.
//!
//! A tracked probe is pivoted around its tip while the tracker records the pose of the
//! marker attached to it. The tip stays at one point in the world and at one point in the
//! marker frame, so every recorded marker-to-world pose satisfies
//!
//! ```text
//! world_point = pose * local_offset
//! ```
//!
//! Stacking `R_i * local_offset - world_point = -t_i` for every pose gives a linear least
//! squares problem in the six unknowns, solved by [`estimate_position_3d_6d`]. Recordings
//! usually contain poses where the tip slipped, so [`estimate_tool_tip`] runs the same solve
//! inside RANSAC and scores each pose by the distance between the two tip estimates.

use calib_consensus::{
    ModelEstimator, ModelEvaluator, Ransac, RansacParameters, RansacResult, Termination,
};
use calib_core::{
    nalgebra::{DMatrix, DVector, Matrix3, Point3, Vector6},
    sample_consensus::{Estimator, Model},
    CalibError, Pose, Result,
};
use log::*;
use rand::RngCore;

const OPERATION: &str = "tool tip estimation";

/// A calibrated tool tip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolTip {
    /// The pivot point in world coordinates.
    pub world_point: Point3<f64>,
    /// The tip in the coordinates of the tracked marker.
    pub local_offset: Point3<f64>,
}

impl ToolTip {
    /// Unpacks `(world_point, local_offset)`.
    pub fn from_vector(vector: &Vector6<f64>) -> Self {
        Self {
            world_point: Point3::new(vector[0], vector[1], vector[2]),
            local_offset: Point3::new(vector[3], vector[4], vector[5]),
        }
    }

    /// Packs the tip as `(world_point, local_offset)`.
    pub fn to_vector(&self) -> Vector6<f64> {
        let (w, l) = (self.world_point, self.local_offset);
        Vector6::new(w.x, w.y, w.z, l.x, l.y, l.z)
    }

    /// Where the tip is in the world according to a marker pose.
    pub fn tip_in_world(&self, pose: &Pose) -> Point3<f64> {
        pose.transform(&self.local_offset)
    }

    /// Distance between the pivot point and the tip as seen from `pose`.
    pub fn residual(&self, pose: &Pose) -> f64 {
        (self.world_point - self.tip_in_world(pose)).norm()
    }
}

impl Model<Pose> for ToolTip {
    fn residual(&self, data: &Pose) -> f64 {
        ToolTip::residual(self, data)
    }
}

/// Solves the tool tip least squares problem.
///
/// Two poses never determine the tip: the pivot direction stays free. Three poses with
/// distinct rotation axes do, which is why [`ModelEstimator::MIN_SAMPLES`] is three.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolTipEstimator {
    pub rank_tolerance: f64,
    pub epsilon: f64,
    pub max_iterations: usize,
}

impl ToolTipEstimator {
    pub fn new() -> Self {
        Default::default()
    }

    /// Set the smallest accepted ratio between the smallest and largest singular value of
    /// the stacked system. Below it the system counts as rank deficient.
    ///
    /// Default is `1e-6`.
    #[must_use]
    pub fn rank_tolerance(self, rank_tolerance: f64) -> Self {
        Self {
            rank_tolerance,
            ..self
        }
    }

    #[must_use]
    pub fn epsilon(self, epsilon: f64) -> Self {
        Self { epsilon, ..self }
    }

    #[must_use]
    pub fn max_iterations(self, max_iterations: usize) -> Self {
        Self {
            max_iterations,
            ..self
        }
    }

    /// Fits a tool tip to all `poses`.
    pub fn solve(&self, poses: &[Pose]) -> Result<ToolTip> {
        CalibError::require(OPERATION, 2, poses.len())?;

        let mut a = DMatrix::zeros(3 * poses.len(), 6);
        let mut b = DVector::zeros(3 * poses.len());
        for (i, pose) in poses.iter().enumerate() {
            a.fixed_slice_mut::<3, 3>(3 * i, 0)
                .copy_from(pose.rotation().matrix());
            a.fixed_slice_mut::<3, 3>(3 * i, 3)
                .copy_from(&-Matrix3::<f64>::identity());
            b.fixed_rows_mut::<3>(3 * i).copy_from(&-pose.translation());
        }

        let svd = a
            .try_svd(true, true, self.epsilon, self.max_iterations)
            .ok_or(CalibError::SvdFailed(OPERATION))?;
        let largest = svd.singular_values.max();
        let smallest = svd.singular_values.min();
        if smallest <= self.rank_tolerance * largest {
            debug!(
                "tool tip system is rank deficient: singular values {} to {}",
                smallest, largest
            );
            return Err(CalibError::RankDeficient(OPERATION));
        }
        let x = svd
            .solve(&b, 0.0)
            .map_err(|_| CalibError::SvdFailed(OPERATION))?;

        Ok(ToolTip {
            local_offset: Point3::new(x[0], x[1], x[2]),
            world_point: Point3::new(x[3], x[4], x[5]),
        })
    }
}

impl Default for ToolTipEstimator {
    fn default() -> Self {
        Self {
            rank_tolerance: 1e-6,
            epsilon: 1e-12,
            max_iterations: 1000,
        }
    }
}

impl ModelEstimator<Pose> for ToolTipEstimator {
    type Model = ToolTip;
    const MIN_SAMPLES: usize = 3;

    fn estimate(&self, data: &[Pose]) -> Option<ToolTip> {
        self.solve(data)
            .map_err(|e| trace!("rejected sample: {}", e))
            .ok()
    }
}

impl Estimator<Pose> for ToolTipEstimator {
    type Model = ToolTip;
    type ModelIter = Option<ToolTip>;
    const MIN_SAMPLES: usize = 3;

    fn estimate<I>(&self, data: I) -> Self::ModelIter
    where
        I: Iterator<Item = Pose> + Clone,
    {
        let data: Vec<Pose> = data.collect();
        ModelEstimator::estimate(self, &data)
    }
}

/// Scores a pose by [`ToolTip::residual`].
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ToolTipEvaluator;

impl ModelEvaluator<ToolTip, Pose> for ToolTipEvaluator {
    fn evaluate(&self, model: &ToolTip, datum: &Pose) -> f64 {
        model.residual(datum)
    }
}

/// Fits a tool tip to all poses without outlier rejection.
pub fn estimate_position_3d_6d(poses: &[Pose]) -> Result<ToolTip> {
    ToolTipEstimator::new().solve(poses)
}

/// The RANSAC parameters for tool tip calibration.
///
/// Samples are three poses and every iteration runs, keeping the tip with the most inliers.
/// `inlier_threshold` is a distance in world units.
pub fn tool_tip_ransac_parameters(
    inlier_threshold: f64,
    min_inliers: usize,
    max_iterations: usize,
) -> RansacParameters {
    RansacParameters::new(inlier_threshold, 3, min_inliers, max_iterations)
        .termination(Termination::Exhaustive)
}

/// Robustly calibrates a tool tip from poses containing outliers.
///
/// Fewer than two poses is an error. The result has no model if no tip reached
/// `parameters.min_inliers` inliers.
pub fn estimate_tool_tip(
    poses: &[Pose],
    parameters: RansacParameters,
) -> Result<RansacResult<ToolTip>> {
    estimate_tool_tip_with(poses, Ransac::seeded(parameters))
}

/// Same as [`estimate_tool_tip`] with a caller supplied engine.
pub fn estimate_tool_tip_with<R: RngCore>(
    poses: &[Pose],
    mut ransac: Ransac<R>,
) -> Result<RansacResult<ToolTip>> {
    CalibError::require(OPERATION, 2, poses.len())?;
    let result = ransac.run(&ToolTipEstimator::new(), &ToolTipEvaluator, poses);
    match &result.model {
        Some(tip) => info!(
            "tool tip at {:?} (offset {:?}) with {} of {} inlier poses",
            tip.world_point,
            tip.local_offset,
            result.inlier_count(),
            poses.len()
        ),
        None => warn!("no tool tip consensus among {} poses", poses.len()),
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use calib_core::nalgebra::{Rotation3, Vector3};

    #[test]
    fn vector_layout() {
        let tip = ToolTip {
            world_point: Point3::new(1.0, 2.0, 3.0),
            local_offset: Point3::new(4.0, 5.0, 6.0),
        };
        assert_eq!(
            tip.to_vector(),
            Vector6::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0)
        );
        assert_eq!(ToolTip::from_vector(&tip.to_vector()), tip);
    }

    #[test]
    fn residual_is_tip_distance() {
        let tip = ToolTip {
            world_point: Point3::new(0.0, 0.0, 1.0),
            local_offset: Point3::new(0.0, 0.0, 0.5),
        };
        let pose = Pose::from_parts(Vector3::new(0.0, 0.0, 0.5), Rotation3::identity());
        assert_eq!(tip.residual(&pose), 0.0);
        let moved = Pose::from_parts(Vector3::new(3.0, 4.0, 0.5), Rotation3::identity());
        assert!((tip.residual(&moved) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn too_few_poses() {
        assert_eq!(
            estimate_position_3d_6d(&[Pose::identity()]),
            Err(CalibError::NotEnoughData {
                operation: "tool tip estimation",
                required: 2,
                actual: 1,
            })
        );
    }

    #[test]
    fn robust_estimation_needs_two_poses() {
        let parameters = tool_tip_ransac_parameters(1e-3, 1, 10);
        for poses in [&[][..], &[Pose::identity()][..]] {
            assert_eq!(
                estimate_tool_tip(poses, parameters),
                Err(CalibError::NotEnoughData {
                    operation: "tool tip estimation",
                    required: 2,
                    actual: poses.len(),
                })
            );
        }
        // Two poses pass the check but cannot fill a three pose sample.
        let two = [Pose::identity(), Pose::identity()];
        let result = estimate_tool_tip(&two, parameters).unwrap();
        assert!(result.model.is_none());
    }
}
