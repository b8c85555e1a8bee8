use nalgebra::{Matrix3, Matrix4, Point2, Point3, RealField, SVector, Vector2, Vector3};

/// The isotropic conditioning transform of a 2d point set.
///
/// Translates the centroid to the origin and scales the points so that their mean distance
/// from the origin is one. Linear estimators run on conditioned points and transform the
/// result back, which keeps their systems well conditioned for pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization2<T: RealField + Copy> {
    pub centroid: Vector2<T>,
    pub scale: T,
}

impl<T: RealField + Copy> Normalization2<T> {
    /// Returns `None` for an empty point set or one whose points all coincide.
    pub fn new(points: &[Point2<T>]) -> Option<Self> {
        let (centroid, scale) = conditioning(points.iter().map(|p| p.coords))?;
        Some(Self { centroid, scale })
    }

    pub fn apply(&self, point: &Point2<T>) -> Point2<T> {
        Point2::from((point.coords - self.centroid) * self.scale)
    }

    /// The transform as a homogeneous matrix.
    pub fn matrix(&self) -> Matrix3<T> {
        let s = self.scale;
        let c = self.centroid;
        Matrix3::new(
            s,
            T::zero(),
            -s * c.x,
            T::zero(),
            s,
            -s * c.y,
            T::zero(),
            T::zero(),
            T::one(),
        )
    }

    /// The inverse transform as a homogeneous matrix.
    pub fn inverse_matrix(&self) -> Matrix3<T> {
        let r = T::one() / self.scale;
        let c = self.centroid;
        Matrix3::new(
            r,
            T::zero(),
            c.x,
            T::zero(),
            r,
            c.y,
            T::zero(),
            T::zero(),
            T::one(),
        )
    }
}

/// The 3d counterpart of [`Normalization2`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization3<T: RealField + Copy> {
    pub centroid: Vector3<T>,
    pub scale: T,
}

impl<T: RealField + Copy> Normalization3<T> {
    pub fn new(points: &[Point3<T>]) -> Option<Self> {
        let (centroid, scale) = conditioning(points.iter().map(|p| p.coords))?;
        Some(Self { centroid, scale })
    }

    pub fn apply(&self, point: &Point3<T>) -> Point3<T> {
        Point3::from((point.coords - self.centroid) * self.scale)
    }

    pub fn matrix(&self) -> Matrix4<T> {
        let mut m = Matrix4::identity() * self.scale;
        m[(3, 3)] = T::one();
        m.fixed_slice_mut::<3, 1>(0, 3)
            .copy_from(&(-self.centroid * self.scale));
        m
    }
}

fn conditioning<T, const D: usize>(
    points: impl Iterator<Item = SVector<T, D>> + Clone,
) -> Option<(SVector<T, D>, T)>
where
    T: RealField + Copy,
{
    let count = points.clone().count();
    if count == 0 {
        return None;
    }
    let n: T = nalgebra::convert(count as f64);
    let centroid = points.clone().fold(SVector::<T, D>::zeros(), |acc, p| acc + p) / n;
    let mean_distance = points
        .map(|p| (p - centroid).norm())
        .fold(T::zero(), |acc, d| acc + d)
        / n;
    // Also rejects NaN.
    if mean_distance > T::zero() {
        Some((centroid, T::one() / mean_distance))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn conditioned_points_have_unit_mean_distance() {
        let points = [
            Point2::new(100.0, 200.0),
            Point2::new(140.0, 210.0),
            Point2::new(90.0, 260.0),
            Point2::new(300.0, 180.0),
        ];
        let normalization = Normalization2::new(&points).unwrap();
        let conditioned: Vec<_> = points.iter().map(|p| normalization.apply(p)).collect();
        let centroid = conditioned
            .iter()
            .fold(Vector2::zeros(), |acc, p| acc + p.coords)
            / 4.0;
        let mean = conditioned.iter().map(|p| p.coords.norm()).sum::<f64>() / 4.0;
        assert_relative_eq!(centroid, Vector2::zeros(), epsilon = 1e-12);
        assert_relative_eq!(mean, 1.0, epsilon = 1e-12);

        let through_matrix = normalization.matrix() * points[2].to_homogeneous();
        assert_relative_eq!(through_matrix.xy(), conditioned[2].coords, epsilon = 1e-12);
        assert_relative_eq!(
            normalization.inverse_matrix() * normalization.matrix(),
            Matrix3::identity(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn coincident_points_have_no_conditioning() {
        let points = [Point3::new(1.0, 2.0, 3.0); 5];
        assert!(Normalization3::new(&points).is_none());
        assert!(Normalization2::<f64>::new(&[]).is_none());
    }

    #[test]
    fn matrix_matches_apply_in_3d() {
        let points = [
            Point3::new(1.0, 2.0, 3.0),
            Point3::new(-4.0, 0.5, 2.0),
            Point3::new(0.0, 7.0, -1.0),
        ];
        let normalization = Normalization3::new(&points).unwrap();
        let h = normalization.matrix() * points[1].to_homogeneous();
        assert_relative_eq!(h.xyz(), normalization.apply(&points[1]).coords, epsilon = 1e-12);
        assert_relative_eq!(h.w, 1.0);
    }
}
