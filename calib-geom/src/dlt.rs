use calib_core::{
    nalgebra::{self, DMatrix, Matrix3, Matrix3x4, Point2, Point3, RealField, Rotation3, Vector3},
    null_space, CalibError, Normalization2, Normalization3, Result,
};
use log::*;

const OPERATION: &str = "projection estimation";

/// Estimates a 3x4 projection matrix from at least six 3d points and their images.
///
/// Both point sets are conditioned first (see [`Normalization2`]). Each correspondence
/// contributes two rows of the direct linear transform; the solution is the smallest right
/// singular vector, reshaped and transformed back. The result has unit Frobenius norm and is
/// only defined up to sign.
pub fn projection_dlt<T: RealField + Copy>(
    from_points: &[Point3<T>],
    to_points: &[Point2<T>],
) -> Result<Matrix3x4<T>> {
    CalibError::require_same_len(OPERATION, from_points.len(), to_points.len())?;
    CalibError::require(OPERATION, 6, from_points.len())?;

    let from_normalization = Normalization3::new(from_points)
        .ok_or(CalibError::Degenerate("3d points coincide"))?;
    let to_normalization =
        Normalization2::new(to_points).ok_or(CalibError::Degenerate("image points coincide"))?;

    let mut a = DMatrix::zeros(2 * from_points.len(), 12);
    for (i, (from, to)) in from_points.iter().zip(to_points).enumerate() {
        let x = from_normalization.apply(from).to_homogeneous().transpose();
        let to = to_normalization.apply(to);
        let mut upper = a.row_mut(2 * i);
        upper.fixed_columns_mut::<4>(4).copy_from(&(-x));
        upper.fixed_columns_mut::<4>(8).copy_from(&(x * to.y));
        let mut lower = a.row_mut(2 * i + 1);
        lower.fixed_columns_mut::<4>(0).copy_from(&x);
        lower.fixed_columns_mut::<4>(8).copy_from(&(x * -to.x));
    }

    let p = null_space(a, nalgebra::convert(1e-12), 1000, OPERATION)?;
    let conditioned = Matrix3x4::from_row_slice(p.as_slice());
    let projection =
        to_normalization.inverse_matrix() * conditioned * from_normalization.matrix();
    let norm = projection.norm();
    if norm > T::zero() {
        Ok(projection / norm)
    } else {
        Err(CalibError::Degenerate("projection vanished"))
    }
}

/// A projection split into the factors of `P = s K [R | t]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionDecomposition<T: RealField + Copy> {
    /// Upper triangular with a positive diagonal and `K[2,2] = 1`.
    pub intrinsics: Matrix3<T>,
    pub rotation: Rotation3<T>,
    pub translation: Vector3<T>,
}

/// Splits a projection matrix into intrinsics, rotation and translation.
///
/// The left 3x3 block is factored with an RQ decomposition, obtained from a QR
/// decomposition of its row-reversed transpose. The overall scale (including sign) of the
/// projection is not recoverable and is dropped, so `projection` need not be normalized.
pub fn decompose_projection<T: RealField + Copy>(
    projection: &Matrix3x4<T>,
) -> Result<ProjectionDecomposition<T>> {
    let mut projection = *projection;
    let block: Matrix3<T> = projection.fixed_columns::<3>(0).into_owned();
    if block.determinant() < T::zero() {
        projection = -projection;
    }
    let block: Matrix3<T> = projection.fixed_columns::<3>(0).into_owned();
    let p4: Vector3<T> = projection.column(3).into_owned();

    let flip = Matrix3::new(
        T::zero(),
        T::zero(),
        T::one(),
        T::zero(),
        T::one(),
        T::zero(),
        T::one(),
        T::zero(),
        T::zero(),
    );
    let qr = (flip * block).transpose().qr();
    let mut k = flip * qr.r().transpose() * flip;
    let mut r = flip * qr.q().transpose();

    for i in 0..3 {
        if k[(i, i)] < T::zero() {
            k.column_mut(i).neg_mut();
            r.row_mut(i).neg_mut();
        }
    }
    trace!("decomposed projection into K = {:?} and R = {:?}", k, r);

    let translation = k
        .solve_upper_triangular(&p4)
        .ok_or(CalibError::Degenerate("projection has singular intrinsics"))?;
    let scale = k[(2, 2)];
    if scale <= T::zero() {
        return Err(CalibError::Degenerate("projection has singular intrinsics"));
    }

    Ok(ProjectionDecomposition {
        intrinsics: k / scale,
        rotation: Rotation3::from_matrix_unchecked(r),
        translation,
    })
}
