use crate::FundamentalMatrix;
use calib_core::{
    depth,
    nalgebra::{Matrix3, Matrix3x4, Point2, Rotation3, Vector3},
    CalibError, Pose, Result, SortedSvd3,
};
use calib_geom::LinearTriangulator;
use derive_more::{AsMut, AsRef, From, Into};
use log::*;

/// This stores an essential matrix, which is satisfied by the following constraint:
///
/// transpose(x') * E * x = 0
///
/// Where `x'` and `x` are homogeneous normalized image coordinates, that is pixel
/// coordinates with the camera intrinsics removed (`K^-1 * x`).
///
/// For two cameras whose relative pose maps points of the first camera frame into the second
/// as `X' = R X + t`, the essential matrix is `[t]× R`. It is the fundamental matrix of the
/// same camera pair with the intrinsics factored out: `E = transpose(K2) * F * K1`.
#[derive(Debug, Clone, Copy, PartialEq, AsMut, AsRef, From, Into)]
pub struct EssentialMatrix(pub Matrix3<f64>);

impl EssentialMatrix {
    /// The essential matrix of a relative pose from the first camera frame to the second.
    pub fn from_pose(relative: &Pose) -> Self {
        Self(relative.translation().cross_matrix() * relative.rotation().matrix())
    }

    /// Removes the intrinsics from a fundamental matrix.
    pub fn from_fundamental(
        fundamental: &FundamentalMatrix<f64>,
        k1: &Matrix3<f64>,
        k2: &Matrix3<f64>,
    ) -> Self {
        Self(k2.transpose() * fundamental.0 * k1)
    }

    /// Applies the intrinsics, producing a fundamental matrix with unit Frobenius norm.
    pub fn to_fundamental(
        &self,
        k1: &Matrix3<f64>,
        k2: &Matrix3<f64>,
    ) -> Result<FundamentalMatrix<f64>> {
        let k1_inv = k1
            .try_inverse()
            .ok_or(CalibError::Degenerate("first camera intrinsics are singular"))?;
        let k2_inv = k2
            .try_inverse()
            .ok_or(CalibError::Degenerate("second camera intrinsics are singular"))?;
        FundamentalMatrix(k2_inv.transpose() * self.0 * k1_inv)
            .normalize()
            .ok_or(CalibError::Degenerate("cameras share an optical center"))
    }

    /// Returns two possible rotations for the essential matrix along with a translation
    /// bearing of arbitrary sign.
    ///
    /// `epsilon` is the threshold by which the singular value decomposition is considered
    /// complete. `max_iterations` caps the iterations of the decomposition.
    pub fn possible_rotations_unscaled_translation(
        &self,
        epsilon: f64,
        max_iterations: usize,
    ) -> Option<(Rotation3<f64>, Rotation3<f64>, Vector3<f64>)> {
        // `W` from https://en.wikipedia.org/wiki/Essential_matrix#Finding_one_solution.
        let w = Matrix3::new(0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0);
        let wt = w.transpose();

        let SortedSvd3 { mut u, mut v_t, .. } = SortedSvd3::new(self.0, epsilon, max_iterations)?;
        // Last column of U and last row of Vt are undetermined since d = (a a 0), so their
        // sign can be chosen to make both proper rotations.
        if u.determinant() < 0.0 {
            u.column_mut(2).neg_mut();
        }
        if v_t.determinant() < 0.0 {
            v_t.row_mut(2).neg_mut();
        }

        Some((
            Rotation3::from_matrix_unchecked(u * w * v_t),
            Rotation3::from_matrix_unchecked(u * wt * v_t),
            u.column(2).into_owned(),
        ))
    }

    /// The four relative poses consistent with the essential matrix.
    ///
    /// Translations have unit length. Exactly one of them places triangulated points in
    /// front of both cameras.
    pub fn possible_poses(&self, epsilon: f64, max_iterations: usize) -> Option<[Pose; 4]> {
        self.possible_rotations_unscaled_translation(epsilon, max_iterations)
            .map(|(rot_a, rot_b, t)| {
                [
                    Pose::from_parts(t, rot_a),
                    Pose::from_parts(t, rot_b),
                    Pose::from_parts(-t, rot_a),
                    Pose::from_parts(-t, rot_b),
                ]
            })
    }
}

/// The fundamental matrix between two cameras with world-to-camera poses `cam1` and `cam2`
/// and intrinsics `k1` and `k2`.
///
/// Points `x` of the first image and `x'` of the second satisfy `transpose(x') * F * x = 0`.
pub fn fundamental_matrix_from_poses(
    cam1: &Pose,
    cam2: &Pose,
    k1: &Matrix3<f64>,
    k2: &Matrix3<f64>,
) -> Result<FundamentalMatrix<f64>> {
    EssentialMatrix::from_pose(&cam1.relative_to(cam2)).to_fundamental(k1, k2)
}

/// Recovers the pose of the second camera relative to the first from a fundamental matrix.
///
/// `x` and `x_` are one corresponding pair of the two images. Of the four poses the essential
/// matrix admits, the one that triangulates this pair in front of both cameras is returned.
/// The translation has unit length since the scale of the scene cannot be observed.
pub fn pose_from_fundamental_matrix(
    fundamental: &FundamentalMatrix<f64>,
    x: &Point2<f64>,
    x_: &Point2<f64>,
    k1: &Matrix3<f64>,
    k2: &Matrix3<f64>,
) -> Result<Pose> {
    let essential = EssentialMatrix::from_fundamental(fundamental, k1, k2);
    let candidates = essential
        .possible_poses(1e-12, 1000)
        .ok_or(CalibError::SvdFailed("essential matrix decomposition"))?;

    let first = k1 * Matrix3x4::identity();
    let triangulator = LinearTriangulator::new();
    for candidate in candidates {
        let second = k2 * candidate.matrix3x4();
        let point = match triangulator.triangulate_pair(&first, &second, x, x_) {
            Ok(point) => point,
            Err(e) => {
                trace!("skipping candidate pose: {}", e);
                continue;
            }
        };
        if depth(&first, &point) > 0.0 && depth(&second, &point) > 0.0 {
            debug!("chose relative pose {:?}", candidate);
            return Ok(candidate);
        }
    }
    Err(CalibError::Degenerate(
        "no relative pose places the point in front of both cameras",
    ))
}
