use crate::Termination;
use calib_core::{
    nalgebra::{
        self, dimension::Dynamic, DMatrix, DVector, Matrix3x4, Point2, Point3, RealField,
        VecStorage, U1,
    },
    CalibError, Result,
};
use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt};
use log::*;
use num_traits::Float;

const OPERATION: &str = "point refinement";

/// Reprojection error of one 3d point observed by several cameras.
///
/// The parameters are the three coordinates of the point. Every camera contributes two
/// residuals, the horizontal and vertical pixel offset between its observation and the
/// reprojected point.
#[derive(Clone, Debug)]
pub struct SinglePointMultiProjection<'a, T: RealField + Copy> {
    pub point: Point3<T>,
    projections: &'a [Matrix3x4<T>],
    observations: &'a [Point2<T>],
}

impl<'a, T: RealField + Copy> SinglePointMultiProjection<'a, T> {
    /// Fails if the inputs differ in length or there are fewer than two cameras.
    pub fn new(
        projections: &'a [Matrix3x4<T>],
        observations: &'a [Point2<T>],
        point: Point3<T>,
    ) -> Result<Self> {
        CalibError::require_same_len(OPERATION, projections.len(), observations.len())?;
        CalibError::require(OPERATION, 2, projections.len())?;
        Ok(Self {
            point,
            projections,
            observations,
        })
    }

    /// The residual vector, or `None` if the point projects to infinity in some camera.
    pub fn reprojection_residuals(&self) -> Option<DVector<T>> {
        let x = self.point.to_homogeneous();
        let mut residuals = DVector::zeros(2 * self.projections.len());
        for (ix, (projection, observed)) in
            self.projections.iter().zip(self.observations).enumerate()
        {
            let reprojected = Point2::from_homogeneous(projection * x)?;
            residuals[2 * ix] = reprojected.x - observed.x;
            residuals[2 * ix + 1] = reprojected.y - observed.y;
        }
        Some(residuals)
    }

    /// The Euclidean norm of [`SinglePointMultiProjection::reprojection_residuals`].
    pub fn residual_norm(&self) -> Option<T> {
        self.reprojection_residuals().map(|r| r.norm())
    }
}

impl<'a, T> LeastSquaresProblem<T, Dynamic, Dynamic> for SinglePointMultiProjection<'a, T>
where
    T: RealField + Float + Copy,
{
    type ResidualStorage = VecStorage<T, Dynamic, U1>;
    type JacobianStorage = VecStorage<T, Dynamic, Dynamic>;
    type ParameterStorage = VecStorage<T, Dynamic, U1>;

    fn set_params(&mut self, x: &DVector<T>) {
        self.point = Point3::new(x[0], x[1], x[2]);
    }

    fn params(&self) -> DVector<T> {
        DVector::from_column_slice(self.point.coords.as_slice())
    }

    fn residuals(&self) -> Option<DVector<T>> {
        self.reprojection_residuals()
    }

    fn jacobian(&self) -> Option<DMatrix<T>> {
        let x = self.point.to_homogeneous();
        let mut jacobian = DMatrix::zeros(2 * self.projections.len(), 3);
        for (ix, projection) in self.projections.iter().enumerate() {
            let p = projection * x;
            if p.z == T::zero() {
                return None;
            }
            // d(p_i / p_z) = (P_i - (p_i / p_z) P_z) / p_z over the first three columns.
            let depth_row = projection.fixed_slice::<1, 3>(2, 0);
            for axis in 0..2 {
                let row = (projection.fixed_slice::<1, 3>(axis, 0) - depth_row * (p[axis] / p.z))
                    / p.z;
                jacobian.row_mut(2 * ix + axis).copy_from(&row);
            }
        }
        Some(jacobian)
    }
}

/// A refined point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Refinement<T: RealField + Copy> {
    pub point: Point3<T>,
    /// Norm of the final reprojection residual vector, in pixels.
    pub residual: T,
    /// Residual evaluations spent by the solver.
    pub evaluations: usize,
}

/// Refines `initial` by minimizing its reprojection error in all cameras.
///
/// The solver never makes things worse: if it fails or ends with a larger error, the
/// initial point is returned with its own residual.
pub fn refine_point<T>(
    projections: &[Matrix3x4<T>],
    observations: &[Point2<T>],
    initial: Point3<T>,
    termination: Termination,
) -> Result<Refinement<T>>
where
    T: RealField + Float + Copy,
{
    let problem = SinglePointMultiProjection::new(projections, observations, initial)?;
    let initial_residual = problem
        .residual_norm()
        .ok_or(CalibError::Degenerate("initial point projects to infinity"))?;

    let tolerance: T = nalgebra::convert(termination.tolerance);
    let (problem, report) = LevenbergMarquardt::new()
        .with_patience(termination.max_iterations.max(1))
        .with_ftol(tolerance)
        .with_xtol(tolerance)
        .minimize(problem);
    if !report.termination.was_successful() {
        warn!(
            "point refinement stopped after {} evaluations: {:?}",
            report.number_of_evaluations, report.termination
        );
    } else {
        debug!(
            "point refinement converged after {} evaluations: {:?}",
            report.number_of_evaluations, report.termination
        );
    }

    let refined = problem
        .residual_norm()
        .filter(|residual| Float::is_finite(*residual) && *residual <= initial_residual);
    Ok(match refined {
        Some(residual) => Refinement {
            point: problem.point,
            residual,
            evaluations: report.number_of_evaluations,
        },
        None => Refinement {
            point: initial,
            residual: initial_residual,
            evaluations: report.number_of_evaluations,
        },
    })
}
