use nalgebra::{Point2, Scalar};

/// A correspondence between a point in a first image and a point in a second image.
///
/// The first element is the point `x` in the first view, the second element is the point
/// `x'` in the second view, so a fundamental matrix `F` for the pair satisfies
/// `x'ᵀ F x ≈ 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointPair<T: Scalar>(pub Point2<T>, pub Point2<T>);

impl<T: Scalar + Copy> PointPair<T> {
    /// Zips two equally long point lists into correspondences.
    ///
    /// Extra points in the longer list are ignored.
    pub fn zip(from: &[Point2<T>], to: &[Point2<T>]) -> Vec<Self> {
        from.iter()
            .zip(to)
            .map(|(&a, &b)| PointPair(a, b))
            .collect()
    }

    /// Splits correspondences back into the two point lists.
    pub fn unzip(pairs: &[Self]) -> (Vec<Point2<T>>, Vec<Point2<T>>) {
        pairs.iter().map(|&PointPair(a, b)| (a, b)).unzip()
    }
}
