use crate::{CalibError, Result};
use core::cmp::Ordering;
use nalgebra::{DMatrix, DVector, Matrix3, RealField, Vector3};

/// Index of the smallest value, ignoring values that do not compare (NaN).
pub fn smallest_index<'a, T>(values: impl IntoIterator<Item = &'a T>) -> Option<usize>
where
    T: RealField + Copy + 'a,
{
    values
        .into_iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(Ordering::Equal))
        .map(|(ix, _)| ix)
}

/// Solves the homogeneous system `A x = 0` in the least squares sense.
///
/// The result is the unit right singular vector of `a` belonging to its smallest singular
/// value. Systems with fewer rows than columns are padded with zero rows, which leaves the
/// null space unchanged but lets the decomposition produce a full set of right singular
/// vectors.
pub fn null_space<T: RealField + Copy>(
    a: DMatrix<T>,
    epsilon: T,
    max_iterations: usize,
    operation: &'static str,
) -> Result<DVector<T>> {
    let columns = a.ncols();
    let a = if a.nrows() < columns {
        a.resize_vertically(columns, T::zero())
    } else {
        a
    };
    let svd = a
        .try_svd(false, true, epsilon, max_iterations)
        .ok_or(CalibError::SvdFailed(operation))?;
    let v_t = svd.v_t.ok_or(CalibError::SvdFailed(operation))?;
    let ix = smallest_index(svd.singular_values.iter()).ok_or(CalibError::SvdFailed(operation))?;
    Ok(v_t.row(ix).transpose())
}

/// A 3x3 singular value decomposition with singular values in decreasing order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SortedSvd3<T: RealField + Copy> {
    pub u: Matrix3<T>,
    pub singular_values: Vector3<T>,
    pub v_t: Matrix3<T>,
}

impl<T: RealField + Copy> SortedSvd3<T> {
    /// Decomposes `matrix` and sorts the singular triplets by decreasing singular value.
    pub fn new(matrix: Matrix3<T>, epsilon: T, max_iterations: usize) -> Option<Self> {
        let svd = matrix.try_svd(true, true, epsilon, max_iterations)?;
        let (u, v_t, singular_values) = (svd.u?, svd.v_t?, svd.singular_values);
        let mut sources = [0, 1, 2];
        sources.sort_unstable_by(|&a, &b| {
            singular_values[b]
                .partial_cmp(&singular_values[a])
                .unwrap_or(Ordering::Equal)
        });
        let mut sorted = Self {
            u: Matrix3::zeros(),
            singular_values: Vector3::zeros(),
            v_t: Matrix3::zeros(),
        };
        for (dest, &source) in sources.iter().enumerate() {
            sorted.singular_values[dest] = singular_values[source];
            sorted.u.column_mut(dest).copy_from(&u.column(source));
            sorted.v_t.row_mut(dest).copy_from(&v_t.row(source));
        }
        Some(sorted)
    }

    /// Multiplies the decomposition back together with replaced singular values.
    pub fn recompose_with(&self, singular_values: Vector3<T>) -> Matrix3<T> {
        self.u * Matrix3::from_diagonal(&singular_values) * self.v_t
    }
}

/// Returns the closest rank-2 matrix to `matrix` in the Frobenius norm.
///
/// The smallest singular value is replaced with zero and the decomposition is recomposed.
pub fn enforce_rank_two<T: RealField + Copy>(
    matrix: &Matrix3<T>,
    epsilon: T,
    max_iterations: usize,
) -> Option<Matrix3<T>> {
    let svd = SortedSvd3::new(*matrix, epsilon, max_iterations)?;
    let s = svd.singular_values;
    Some(svd.recompose_with(Vector3::new(s[0], s[1], T::zero())))
}
