use calib_core::{
    homogeneous_depth,
    nalgebra::{self, DMatrix, Matrix3x4, Point2, Point3, RealField, Vector4},
    null_space, CalibError, Result,
};
use log::*;

const OPERATION: &str = "triangulation";

/// Triangulates a point by solving the stacked cross product constraints of its
/// observations with a singular value decomposition.
///
/// Referred to as the homogeneous linear (DLT) method by Hartley and Zisserman. Each camera
/// contributes the three rows of `[x]× P`, only two of which are independent, and the point
/// is the right singular vector of the smallest singular value. The method minimizes an
/// algebraic error rather than the reprojection error, so it is usually followed by
/// nonlinear refinement when accuracy matters.
///
/// ```
/// use calib_core::nalgebra::{Matrix3x4, Point2, Point3, Vector4};
/// use calib_geom::LinearTriangulator;
///
/// let a = Matrix3x4::new(1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0);
/// let b = Matrix3x4::new(1.0, 0.0, 0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0);
/// let point = Point3::new(0.3, 0.1, 2.0);
/// let observe = |p: &Matrix3x4<f64>| Point2::from_homogeneous(p * point.to_homogeneous()).unwrap();
/// let triangulated = LinearTriangulator::new()
///     .triangulate(&[a, b], &[observe(&a), observe(&b)])
///     .unwrap();
/// assert!((triangulated - point).norm() < 1e-9);
/// ```
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
pub struct LinearTriangulator {
    epsilon: f64,
    max_iterations: usize,
}

impl LinearTriangulator {
    /// Creates a `LinearTriangulator` with default values.
    ///
    /// Same as calling [`Default::default`].
    pub fn new() -> Self {
        Default::default()
    }

    /// Set the epsilon used in the singular value decomposition.
    ///
    /// Default is `1e-12`.
    #[must_use]
    pub fn epsilon(self, epsilon: f64) -> Self {
        Self { epsilon, ..self }
    }

    /// Set the maximum number of iterations for the singular value decomposition.
    ///
    /// Default is `1000`.
    #[must_use]
    pub fn max_iterations(self, max_iterations: usize) -> Self {
        Self {
            max_iterations,
            ..self
        }
    }

    /// Triangulates one point from its observations in two or more cameras.
    ///
    /// `projections[i]` observes the point at `points[i]`.
    pub fn triangulate<T: RealField + Copy>(
        &self,
        projections: &[Matrix3x4<T>],
        points: &[Point2<T>],
    ) -> Result<Point3<T>> {
        self.triangulate_homogeneous(projections, points)
            .and_then(dehomogenize)
    }

    /// Same as [`LinearTriangulator::triangulate`], but returns the homogeneous solution.
    ///
    /// The solution has unit norm and is oriented so that it has nonnegative depth
    /// under every camera.
    pub fn triangulate_homogeneous<T: RealField + Copy>(
        &self,
        projections: &[Matrix3x4<T>],
        points: &[Point2<T>],
    ) -> Result<Vector4<T>> {
        CalibError::require_same_len(OPERATION, projections.len(), points.len())?;
        CalibError::require(OPERATION, 2, projections.len())?;

        let mut a = DMatrix::zeros(3 * projections.len(), 4);
        for (i, (projection, point)) in projections.iter().zip(points).enumerate() {
            let rows = point.to_homogeneous().cross_matrix() * projection;
            a.fixed_slice_mut::<3, 4>(3 * i, 0).copy_from(&rows);
        }
        self.solve(a, projections)
    }

    /// Triangulates from exactly two views with the reduced 4x4 system.
    pub fn triangulate_pair<T: RealField + Copy>(
        &self,
        first: &Matrix3x4<T>,
        second: &Matrix3x4<T>,
        first_point: &Point2<T>,
        second_point: &Point2<T>,
    ) -> Result<Point3<T>> {
        let mut a = DMatrix::zeros(4, 4);
        for (view, (projection, point)) in [(first, first_point), (second, second_point)]
            .into_iter()
            .enumerate()
        {
            a.row_mut(2 * view)
                .copy_from(&(projection.row(2) * point.x - projection.row(0)));
            a.row_mut(2 * view + 1)
                .copy_from(&(projection.row(2) * point.y - projection.row(1)));
        }
        self.solve(a, &[*first, *second]).and_then(dehomogenize)
    }

    fn solve<T: RealField + Copy>(
        &self,
        a: DMatrix<T>,
        projections: &[Matrix3x4<T>],
    ) -> Result<Vector4<T>> {
        let x = null_space(
            a,
            nalgebra::convert(self.epsilon),
            self.max_iterations,
            OPERATION,
        )?;
        Ok(orient(projections, Vector4::new(x[0], x[1], x[2], x[3])))
    }
}

impl Default for LinearTriangulator {
    fn default() -> Self {
        Self {
            epsilon: 1e-12,
            max_iterations: 1000,
        }
    }
}

/// Negates the homogeneous solution if it lies behind any camera.
///
/// Negation flips the depth under every camera at once, so one check is enough.
fn orient<T: RealField + Copy>(projections: &[Matrix3x4<T>], x: Vector4<T>) -> Vector4<T> {
    if projections
        .iter()
        .any(|projection| homogeneous_depth(projection, &x) < T::zero())
    {
        -x
    } else {
        x
    }
}

fn dehomogenize<T: RealField + Copy>(x: Vector4<T>) -> Result<Point3<T>> {
    Point3::from_homogeneous(x)
        .filter(|point| point.coords.iter().all(|c| c.is_finite()))
        .ok_or_else(|| {
            debug!("triangulated point is at infinity: {:?}", x);
            CalibError::Degenerate("triangulated point is at infinity")
        })
}

/// Triangulates with a default [`LinearTriangulator`].
pub fn triangulate<T: RealField + Copy>(
    projections: &[Matrix3x4<T>],
    points: &[Point2<T>],
) -> Result<Point3<T>> {
    LinearTriangulator::new().triangulate(projections, points)
}

/// Triangulates from two views with a default [`LinearTriangulator`].
pub fn triangulate_pair<T: RealField + Copy>(
    first: &Matrix3x4<T>,
    second: &Matrix3x4<T>,
    first_point: &Point2<T>,
    second_point: &Point2<T>,
) -> Result<Point3<T>> {
    LinearTriangulator::new().triangulate_pair(first, second, first_point, second_point)
}
