use core::ops::Mul;
use derive_more::{AsMut, AsRef, From, Into};
use nalgebra::{IsometryMatrix3, Matrix3x4, Matrix4, Point3, Rotation3, Vector3};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// A rigid transformation (rotation followed by translation) in 3d.
///
/// The pose maps points into the frame it describes:
///
/// * for a camera it is the world-to-camera transform (the camera extrinsics)
/// * for a tracked marker it is the marker-to-world transform reported by the tracker
///
/// A pose is an immutable value. Compose poses with `*`, where `(a * b).transform(p)` is
/// `a.transform(b.transform(p))`.
#[derive(Debug, Clone, Copy, PartialEq, AsMut, AsRef, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Pose(pub IsometryMatrix3<f64>);

impl Pose {
    /// Create the pose from rotation and translation.
    pub fn from_parts(translation: Vector3<f64>, rotation: Rotation3<f64>) -> Self {
        Self(IsometryMatrix3::from_parts(translation.into(), rotation))
    }

    /// Creates a pose with no change in position or orientation.
    pub fn identity() -> Self {
        Self(IsometryMatrix3::identity())
    }

    pub fn rotation(&self) -> &Rotation3<f64> {
        &self.0.rotation
    }

    pub fn translation(&self) -> Vector3<f64> {
        self.0.translation.vector
    }

    /// Takes the inverse of the pose.
    #[must_use]
    pub fn inverse(&self) -> Self {
        Self(self.0.inverse())
    }

    /// Applies the pose to a point.
    pub fn transform(&self, point: &Point3<f64>) -> Point3<f64> {
        self.0.transform_point(point)
    }

    /// Applies the pose to a point given as a plain vector of coordinates.
    pub fn transform_vector(&self, point: &Vector3<f64>) -> Vector3<f64> {
        self.0.transform_vector(point) + self.0.translation.vector
    }

    /// Retrieve the homogeneous matrix.
    pub fn homogeneous(&self) -> Matrix4<f64> {
        self.0.to_homogeneous()
    }

    /// Retrieve the pose as the `[R | t]` matrix.
    pub fn matrix3x4(&self) -> Matrix3x4<f64> {
        let rot = self.0.rotation.matrix();
        let trans = self.0.translation.vector;
        Matrix3x4::from_columns(&[rot.column(0), rot.column(1), rot.column(2), trans.column(0)])
    }

    /// The relative pose that takes points from the frame of `self` into the frame of `other`.
    ///
    /// For two world-to-camera poses this is the camera-to-camera pose from the first camera
    /// into the second.
    #[must_use]
    pub fn relative_to(&self, other: &Pose) -> Self {
        Self(other.0 * self.0.inverse())
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl Mul for Pose {
    type Output = Pose;

    fn mul(self, rhs: Pose) -> Pose {
        Pose(self.0 * rhs.0)
    }
}

impl Mul<Point3<f64>> for Pose {
    type Output = Point3<f64>;

    fn mul(self, rhs: Point3<f64>) -> Point3<f64> {
        self.transform(&rhs)
    }
}
