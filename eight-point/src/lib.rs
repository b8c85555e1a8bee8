//! Fundamental matrix estimation for two views.
//!
//! [`EightPoint`] is the normalized eight-point algorithm. It is exposed as a plain solver,
//! as a [`calib_consensus::ModelEstimator`] (paired with [`FundamentalEvaluator`]) for
//! robust estimation through [`estimate_fundamental`], and as a
//! [`sample_consensus::Estimator`](calib_core::sample_consensus::Estimator) for the rest of
//! the rust-cv ecosystem.
//!
//! [`essential`] relates fundamental matrices to camera poses.

pub mod essential;

pub use essential::{
    fundamental_matrix_from_poses, pose_from_fundamental_matrix, EssentialMatrix,
};

use calib_consensus::{
    ModelEstimator, ModelEvaluator, Ransac, RansacParameters, RansacResult, Termination,
};
use calib_core::{
    enforce_rank_two,
    nalgebra::{self, DMatrix, Matrix3, Point2, RealField, Vector3},
    null_space,
    sample_consensus::{Estimator, Model},
    CalibError, Normalization2, PointPair, Result,
};
use derive_more::{AsMut, AsRef, From, Into};
use log::*;
use rand::RngCore;

const OPERATION: &str = "fundamental matrix estimation";

/// A fundamental matrix `F`, which relates corresponding image points `x` and `x'` of two
/// cameras by the epipolar constraint
///
/// ```text
/// transpose(x') * F * x = 0
/// ```
///
/// where `x` and `x'` are homogeneous pixel coordinates. `F * x` is the epipolar line of `x`
/// in the second image: every point of the second image that can correspond to `x` lies on it.
#[derive(Debug, Clone, Copy, PartialEq, AsMut, AsRef, From, Into)]
pub struct FundamentalMatrix<T: RealField + Copy>(pub Matrix3<T>);

impl<T: RealField + Copy> FundamentalMatrix<T> {
    /// The line `l` in the second image with `l · (x', 1) = 0` for every `x'` matching `from`.
    pub fn epipolar_line(&self, from: &Point2<T>) -> Vector3<T> {
        self.0 * from.to_homogeneous()
    }

    /// The algebraic epipolar error `transpose(x') * F * x`.
    pub fn epipolar_constraint(&self, from: &Point2<T>, to: &Point2<T>) -> T {
        to.to_homogeneous().dot(&self.epipolar_line(from))
    }

    /// The squared distance of `to` from the epipolar line of `from`.
    ///
    /// Infinite (or NaN) when the epipolar line is degenerate, which can only happen
    /// for the epipole itself.
    pub fn epipolar_distance(&self, from: &Point2<T>, to: &Point2<T>) -> T {
        self.epipolar_distance_homogeneous(&from.to_homogeneous(), &to.to_homogeneous())
    }

    /// Same as [`FundamentalMatrix::epipolar_distance`] for homogeneous image points.
    pub fn epipolar_distance_homogeneous(&self, from: &Vector3<T>, to: &Vector3<T>) -> T {
        let line = self.0 * from;
        let term = line.dot(to) / to.z;
        term * term / (line.x * line.x + line.y * line.y)
    }

    /// Scales the matrix to unit Frobenius norm.
    pub fn normalize(self) -> Option<Self> {
        let norm = self.0.norm();
        if norm > T::zero() {
            Some(Self(self.0 / norm))
        } else {
            None
        }
    }
}

impl Model<PointPair<f64>> for FundamentalMatrix<f64> {
    fn residual(&self, data: &PointPair<f64>) -> f64 {
        self.epipolar_distance(&data.0, &data.1)
    }
}

/// Performs the normalized
/// [eight-point algorithm](https://en.wikipedia.org/wiki/Eight-point_algorithm)
/// by Richard Hartley.
///
/// The two point sets are conditioned separately, the stacked epipolar constraints are
/// solved for their null space, the rank two constraint is imposed by zeroing the smallest
/// singular value, and the conditioning is undone. The output has unit Frobenius norm.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EightPoint {
    pub epsilon: f64,
    pub max_iterations: usize,
}

impl EightPoint {
    pub fn new() -> Self {
        Default::default()
    }

    /// Set the epsilon used in the singular value decompositions.
    ///
    /// Default is `1e-12`.
    #[must_use]
    pub fn epsilon(self, epsilon: f64) -> Self {
        Self { epsilon, ..self }
    }

    /// Set the maximum number of iterations of the singular value decompositions.
    ///
    /// Default is `1000`.
    #[must_use]
    pub fn max_iterations(self, max_iterations: usize) -> Self {
        Self {
            max_iterations,
            ..self
        }
    }

    /// Estimates `F` from `from_points[i] <-> to_points[i]`, using every `step_size`th pair.
    ///
    /// A `step_size` of `0` is treated as `1`. At least eight distinct pairs must remain;
    /// repeated pairs add no constraint and are counted once.
    pub fn from_points<T: RealField + Copy>(
        &self,
        from_points: &[Point2<T>],
        to_points: &[Point2<T>],
        step_size: usize,
    ) -> Result<FundamentalMatrix<T>> {
        CalibError::require_same_len(OPERATION, from_points.len(), to_points.len())?;
        let step = step_size.max(1);
        let from: Vec<Point2<T>> = from_points.iter().step_by(step).copied().collect();
        let to: Vec<Point2<T>> = to_points.iter().step_by(step).copied().collect();
        CalibError::require(OPERATION, 8, distinct_pairs(&from, &to))?;

        let from_normalization = Normalization2::new(&from)
            .ok_or(CalibError::Degenerate("first view points coincide"))?;
        let to_normalization = Normalization2::new(&to)
            .ok_or(CalibError::Degenerate("second view points coincide"))?;

        let mut a = DMatrix::zeros(from.len(), 9);
        for (i, (x, x_)) in from.iter().zip(&to).enumerate() {
            let x = from_normalization.apply(x);
            let x_ = to_normalization.apply(x_);
            a.row_mut(i).copy_from_slice(&[
                x_.x * x.x,
                x_.x * x.y,
                x_.x,
                x_.y * x.x,
                x_.y * x.y,
                x_.y,
                x.x,
                x.y,
                T::one(),
            ]);
        }

        let epsilon = nalgebra::convert(self.epsilon);
        let f = null_space(a, epsilon, self.max_iterations, OPERATION)?;
        let f = Matrix3::from_row_slice(f.as_slice());
        let f = enforce_rank_two(&f, epsilon, self.max_iterations)
            .ok_or(CalibError::SvdFailed(OPERATION))?;
        let f = to_normalization.matrix().transpose() * f * from_normalization.matrix();

        FundamentalMatrix(f)
            .normalize()
            .ok_or(CalibError::Degenerate("fundamental matrix vanished"))
    }

    /// Same as [`EightPoint::from_points`] over all pairs.
    pub fn from_pairs<T: RealField + Copy>(
        &self,
        pairs: &[PointPair<T>],
    ) -> Result<FundamentalMatrix<T>> {
        let (from, to) = PointPair::unzip(pairs);
        self.from_points(&from, &to, 1)
    }
}

impl Default for EightPoint {
    fn default() -> Self {
        Self {
            epsilon: 1e-12,
            max_iterations: 1000,
        }
    }
}

fn distinct_pairs<T: RealField + Copy>(from: &[Point2<T>], to: &[Point2<T>]) -> usize {
    (0..from.len())
        .filter(|&i| !(0..i).any(|j| from[j] == from[i] && to[j] == to[i]))
        .count()
}

/// Estimates `F` with a default [`EightPoint`].
pub fn get_fundamental_matrix<T: RealField + Copy>(
    from_points: &[Point2<T>],
    to_points: &[Point2<T>],
    step_size: usize,
) -> Result<FundamentalMatrix<T>> {
    EightPoint::new().from_points(from_points, to_points, step_size)
}

impl ModelEstimator<PointPair<f64>> for EightPoint {
    type Model = FundamentalMatrix<f64>;
    const MIN_SAMPLES: usize = 8;

    fn estimate(&self, data: &[PointPair<f64>]) -> Option<FundamentalMatrix<f64>> {
        self.from_pairs(data)
            .map_err(|e| trace!("rejected sample: {}", e))
            .ok()
    }
}

impl Estimator<PointPair<f64>> for EightPoint {
    type Model = FundamentalMatrix<f64>;
    type ModelIter = Option<FundamentalMatrix<f64>>;
    const MIN_SAMPLES: usize = 8;

    fn estimate<I>(&self, data: I) -> Self::ModelIter
    where
        I: Iterator<Item = PointPair<f64>> + Clone,
    {
        let data: Vec<PointPair<f64>> = data.collect();
        ModelEstimator::estimate(self, &data)
    }
}

/// Scores a pair by [`FundamentalMatrix::epipolar_distance`].
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct FundamentalEvaluator;

impl ModelEvaluator<FundamentalMatrix<f64>, PointPair<f64>> for FundamentalEvaluator {
    fn evaluate(&self, model: &FundamentalMatrix<f64>, datum: &PointPair<f64>) -> f64 {
        model.epipolar_distance(&datum.0, &datum.1)
    }
}

/// The RANSAC parameters for robust fundamental matrix estimation.
///
/// Samples are the minimal eight pairs and the run stops at the first model with
/// `min_inliers` inliers.
pub fn fundamental_ransac_parameters(
    inlier_threshold: f64,
    min_inliers: usize,
    max_iterations: usize,
) -> RansacParameters {
    RansacParameters::new(inlier_threshold, 8, min_inliers, max_iterations)
        .termination(Termination::FirstConsensus)
}

/// Robustly estimates `F` from point pairs containing outliers.
///
/// `parameters.inlier_threshold` is a squared pixel distance. Fewer than eight pairs is an
/// error; the result has no model if no matrix reached `parameters.min_inliers` inliers.
pub fn estimate_fundamental(
    pairs: &[PointPair<f64>],
    parameters: RansacParameters,
) -> Result<RansacResult<FundamentalMatrix<f64>>> {
    estimate_fundamental_with(pairs, Ransac::seeded(parameters))
}

/// Same as [`estimate_fundamental`] with a caller supplied engine.
pub fn estimate_fundamental_with<R: RngCore>(
    pairs: &[PointPair<f64>],
    mut ransac: Ransac<R>,
) -> Result<RansacResult<FundamentalMatrix<f64>>> {
    CalibError::require(OPERATION, 8, pairs.len())?;
    let result = ransac.run(&EightPoint::new(), &FundamentalEvaluator, pairs);
    match &result.model {
        Some(_) => info!(
            "fundamental matrix with {} of {} inlier pairs",
            result.inlier_count(),
            pairs.len()
        ),
        None => warn!("no fundamental matrix consensus among {} pairs", pairs.len()),
    }
    Ok(result)
}
