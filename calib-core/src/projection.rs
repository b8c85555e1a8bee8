use crate::Pose;
use nalgebra::{Matrix3, Matrix3x4, Point2, Point3, RealField, Vector3, Vector4};

/// Builds the projection matrix `K [R | t]` of a camera with intrinsics `k` and the
/// world-to-camera pose `pose`.
pub fn projection_matrix(k: &Matrix3<f64>, pose: &Pose) -> Matrix3x4<f64> {
    k * pose.matrix3x4()
}

/// A point representation that can be projected through a 3x4 projection matrix.
///
/// * [`Point2`] is a point on the world plane `z = 0`
/// * [`Point3`] is an ordinary 3d point
/// * [`Vector4`] is a homogeneous 3d point, which need not have a unit last coordinate
pub trait Projectable<T: RealField + Copy> {
    /// The homogeneous image point `P X`.
    fn project_homogeneous(&self, projection: &Matrix3x4<T>) -> Vector3<T>;
}

impl<T: RealField + Copy> Projectable<T> for Point2<T> {
    fn project_homogeneous(&self, projection: &Matrix3x4<T>) -> Vector3<T> {
        projection * Vector4::new(self.x, self.y, T::zero(), T::one())
    }
}

impl<T: RealField + Copy> Projectable<T> for Point3<T> {
    fn project_homogeneous(&self, projection: &Matrix3x4<T>) -> Vector3<T> {
        projection * self.to_homogeneous()
    }
}

impl<T: RealField + Copy> Projectable<T> for Vector4<T> {
    fn project_homogeneous(&self, projection: &Matrix3x4<T>) -> Vector3<T> {
        projection * self
    }
}

/// Projects a point into the image.
///
/// Returns `None` if the point projects to infinity (it lies on the principal plane).
pub fn project_point<T, P>(projection: &Matrix3x4<T>, point: &P) -> Option<Point2<T>>
where
    T: RealField + Copy,
    P: Projectable<T>,
{
    Point2::from_homogeneous(point.project_homogeneous(projection))
}

/// Projects every point in `points`, keeping the input order.
pub fn project_points<T, P>(projection: &Matrix3x4<T>, points: &[P]) -> Vec<Option<Point2<T>>>
where
    T: RealField + Copy,
    P: Projectable<T>,
{
    points
        .iter()
        .map(|point| project_point(projection, point))
        .collect()
}

/// Maps a 2d point through a 3x3 homography.
pub fn apply_homography<T: RealField + Copy>(
    homography: &Matrix3<T>,
    point: &Point2<T>,
) -> Option<Point2<T>> {
    Point2::from_homogeneous(homography * point.to_homogeneous())
}

/// The depth of a point under a projection: the third row of `P` applied to `(X, 1)`.
///
/// For projections of the form `K [R | t]` with `K[2,2] > 0`, the point is in front of the
/// camera exactly when this is positive.
pub fn depth<T: RealField + Copy>(projection: &Matrix3x4<T>, point: &Point3<T>) -> T {
    homogeneous_depth(projection, &point.to_homogeneous())
}

/// Same as [`depth`], for a homogeneous point that has not been normalized.
pub fn homogeneous_depth<T: RealField + Copy>(projection: &Matrix3x4<T>, point: &Vector4<T>) -> T {
    projection.row(2).transpose().dot(point)
}
