//! # Reconstruction
//!
//! Recovers 3d points from their observations in calibrated cameras.
//!
//! A single point observed by several cameras is triangulated linearly and can then be
//! polished by minimizing its reprojection error (see [`Reconstructor::position`]). Two
//! unordered point sets seen by a stereo pair are first put into correspondence by solving
//! the assignment problem over their epipolar distances with [`Munkres`], then every
//! matched pair is triangulated (see [`Reconstructor::reconstruct`]).

mod munkres;
mod settings;

pub use munkres::*;
pub use settings::*;

use calib_core::{
    nalgebra::{self, DMatrix, Matrix3x4, Point2, Point3, RealField},
    Result,
};
use calib_geom::LinearTriangulator;
use calib_optimize::refine_point;
use eight_point::FundamentalMatrix;
use log::*;
use num_traits::Float;

/// Reconstructs 3d points with a fixed set of [`ReconstructionSettings`].
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Reconstructor {
    settings: ReconstructionSettings,
}

impl Reconstructor {
    pub fn new(settings: ReconstructionSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ReconstructionSettings {
        &self.settings
    }

    fn triangulator(&self) -> LinearTriangulator {
        LinearTriangulator::new()
            .epsilon(self.settings.epsilon)
            .max_iterations(self.settings.max_iterations)
    }

    /// The 3d point observed at `points[i]` by the camera with projection `projections[i]`.
    ///
    /// When `refine` is set, the linear solution is refined by minimizing the reprojection
    /// error in every camera.
    pub fn position<T>(
        &self,
        projections: &[Matrix3x4<T>],
        points: &[Point2<T>],
        refine: bool,
    ) -> Result<Point3<T>>
    where
        T: RealField + Float + Copy,
    {
        self.position_with_residual(projections, points, refine)
            .map(|(point, _)| point)
    }

    /// Same as [`Reconstructor::position`], but also returns the reprojection residual norm
    /// when the point was refined.
    pub fn position_with_residual<T>(
        &self,
        projections: &[Matrix3x4<T>],
        points: &[Point2<T>],
        refine: bool,
    ) -> Result<(Point3<T>, Option<T>)>
    where
        T: RealField + Float + Copy,
    {
        let linear = self.triangulator().triangulate(projections, points)?;
        if !refine {
            return Ok((linear, None));
        }
        let refinement = refine_point(projections, points, linear, self.settings.termination)?;
        trace!(
            "refined point {:?} to {:?} with residual {:?}",
            linear,
            refinement.point,
            refinement.residual
        );
        Ok((refinement.point, Some(refinement.residual)))
    }

    /// The 3d point observed at `first_point` by `first` and at `second_point` by `second`.
    pub fn position_pair<T: RealField + Copy>(
        &self,
        first: &Matrix3x4<T>,
        second: &Matrix3x4<T>,
        first_point: &Point2<T>,
        second_point: &Point2<T>,
    ) -> Result<Point3<T>> {
        self.triangulator()
            .triangulate_pair(first, second, first_point, second_point)
    }

    /// Triangulates the points of two views without known correspondences.
    ///
    /// Points are matched by minimizing the total epipolar distance under `fundamental`,
    /// which maps points of the first view to epipolar lines of the second. The result holds
    /// one point per matched pair, ordered by the index of the point in `first_points`, and
    /// is never longer than the smaller of the two sets. Pairs whose epipolar distance
    /// exceeds [`ReconstructionSettings::max_epipolar_distance`] are left out.
    pub fn reconstruct<T: RealField + Copy>(
        &self,
        first_points: &[Point2<T>],
        second_points: &[Point2<T>],
        first: &Matrix3x4<T>,
        second: &Matrix3x4<T>,
        fundamental: &FundamentalMatrix<T>,
    ) -> Result<Vec<Point3<T>>> {
        let costs = epipolar_cost_matrix(first_points, second_points, fundamental);
        let assignment = Munkres::new(costs).solve();
        debug!(
            "matched {} of {} x {} points",
            assignment.len(),
            first_points.len(),
            second_points.len()
        );
        let gate: Option<T> = self.settings.max_epipolar_distance.map(nalgebra::convert);

        let triangulator = self.triangulator();
        let mut points = Vec::with_capacity(assignment.len());
        for (row, column) in assignment.pairs() {
            let (x, x_) = (&first_points[row], &second_points[column]);
            if let Some(gate) = gate {
                let distance = fundamental.epipolar_distance(x, x_);
                if !distance.is_finite() || distance > gate {
                    warn!(
                        "dropping pair ({}, {}) with epipolar distance {:?}",
                        row, column, distance
                    );
                    continue;
                }
            }
            points.push(triangulator.triangulate_pair(first, second, x, x_)?);
        }
        Ok(points)
    }
}

/// The squared epipolar distance of every point pair.
///
/// Entry `(i, j)` is the distance of `second_points[j]` from the epipolar line of
/// `first_points[i]`.
pub fn epipolar_cost_matrix<T: RealField + Copy>(
    first_points: &[Point2<T>],
    second_points: &[Point2<T>],
    fundamental: &FundamentalMatrix<T>,
) -> DMatrix<T> {
    DMatrix::from_fn(first_points.len(), second_points.len(), |i, j| {
        fundamental.epipolar_distance(&first_points[i], &second_points[j])
    })
}

/// Reconstructs a point with default settings, see [`Reconstructor::position`].
pub fn get_3d_position<T>(
    projections: &[Matrix3x4<T>],
    points: &[Point2<T>],
    refine: bool,
) -> Result<Point3<T>>
where
    T: RealField + Float + Copy,
{
    Reconstructor::default().position(projections, points, refine)
}

/// Reconstructs a point with default settings, see [`Reconstructor::position_with_residual`].
pub fn get_3d_position_with_residual<T>(
    projections: &[Matrix3x4<T>],
    points: &[Point2<T>],
    refine: bool,
) -> Result<(Point3<T>, Option<T>)>
where
    T: RealField + Float + Copy,
{
    Reconstructor::default().position_with_residual(projections, points, refine)
}

/// Reconstructs a point from two views with default settings.
pub fn get_3d_position_pair<T: RealField + Copy>(
    first: &Matrix3x4<T>,
    second: &Matrix3x4<T>,
    first_point: &Point2<T>,
    second_point: &Point2<T>,
) -> Result<Point3<T>> {
    Reconstructor::default().position_pair(first, second, first_point, second_point)
}

/// Matches and triangulates two point sets with default settings, see
/// [`Reconstructor::reconstruct`].
pub fn reconstruct_3d_points<T: RealField + Copy>(
    first_points: &[Point2<T>],
    second_points: &[Point2<T>],
    first: &Matrix3x4<T>,
    second: &Matrix3x4<T>,
    fundamental: &FundamentalMatrix<T>,
) -> Result<Vec<Point3<T>>> {
    Reconstructor::default().reconstruct(first_points, second_points, first, second, fundamental)
}
