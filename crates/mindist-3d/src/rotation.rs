use glam::{DMat3, DQuat, DVec3};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::linalg::skew;

/// Below this angle the closed-form expressions switch to their Taylor expansions.
const SMALL_ANGLE: f64 = 1e-6;

/// Error types for rotation construction.
#[derive(Debug, Error, PartialEq)]
pub enum RotationError {
    /// The rotation axis has (near) zero length.
    #[error("Cannot compute a rotation from a zero axis")]
    ZeroAxis,

    /// The coordinate slice does not hold exactly three components.
    #[error("Rotation vector needs 3 components, got {0}")]
    InvalidLength(usize),
}

/// A 3D rotation in angle-axis form.
///
/// The direction of the vector is the rotation axis and its magnitude the rotation angle in
/// radians. The zero vector is the identity rotation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RotationVector([f64; 3]);

impl RotationVector {
    /// The identity rotation.
    pub const IDENTITY: Self = Self([0.0; 3]);

    /// Create a rotation vector from its three components.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self([x, y, z])
    }

    /// Create a rotation vector from an axis and an angle.
    ///
    /// The axis does not need to be normalized.
    ///
    /// # Errors
    ///
    /// Returns [`RotationError::ZeroAxis`] if the axis has near zero length.
    pub fn from_axis_angle(axis: &[f64; 3], angle: f64) -> Result<Self, RotationError> {
        let axis = DVec3::from_array(*axis);
        let magnitude = axis.length();
        if magnitude < 1e-10 {
            return Err(RotationError::ZeroAxis);
        }
        Ok(Self::from_vec3(axis * (angle / magnitude)))
    }

    fn from_vec3(v: DVec3) -> Self {
        Self(v.to_array())
    }

    /// Get the components of the rotation vector.
    #[inline]
    pub fn as_array(&self) -> [f64; 3] {
        self.0
    }

    /// Get the rotation vector as a glam vector.
    #[inline]
    pub fn as_vec3(&self) -> DVec3 {
        DVec3::from_array(self.0)
    }

    /// The rotation angle in radians.
    pub fn angle(&self) -> f64 {
        self.as_vec3().length()
    }

    /// Compute the rotation matrix with the Rodrigues formula.
    ///
    /// Small angles use the second order expansion `I + [v]x + [v]x^2 / 2`, which tends to the
    /// identity as the angle goes to zero.
    pub fn to_matrix(&self) -> DMat3 {
        let v = self.as_vec3();
        let angle = v.length();

        if angle < SMALL_ANGLE {
            let k = skew(v);
            return DMat3::IDENTITY + k + k * k * 0.5;
        }

        let x = v.x / angle;
        let y = v.y / angle;
        let z = v.z / angle;

        let c = angle.cos();
        let s = angle.sin();
        let t = 1.0 - c;

        let m00 = c + x * x * t;
        let m11 = c + y * y * t;
        let m22 = c + z * z * t;

        let tmp1 = x * y * t;
        let tmp2 = z * s;

        let m10 = tmp1 + tmp2;
        let m01 = tmp1 - tmp2;

        let tmp3 = x * z * t;
        let tmp4 = y * s;

        let m20 = tmp3 - tmp4;
        let m02 = tmp3 + tmp4;

        let tmp5 = y * z * t;
        let tmp6 = x * s;

        let m12 = tmp5 - tmp6;
        let m21 = tmp5 + tmp6;

        // glam matrices are column major
        DMat3::from_cols(
            DVec3::new(m00, m10, m20),
            DVec3::new(m01, m11, m21),
            DVec3::new(m02, m12, m22),
        )
    }

    /// Recover the rotation vector from a rotation matrix.
    pub fn from_matrix(matrix: &DMat3) -> Self {
        Self::from_quat(DQuat::from_mat3(matrix))
    }

    /// Recover the rotation vector from a (not necessarily normalized) quaternion.
    ///
    /// The result has an angle in `[0, pi]`.
    pub fn from_quat(quat: DQuat) -> Self {
        let q = quat.normalize();
        // q and -q encode the same rotation, pick the short way round
        let q = if q.w < 0.0 { -q } else { q };
        let xyz = DVec3::new(q.x, q.y, q.z);
        let s = xyz.length();
        if s < SMALL_ANGLE * 0.5 {
            return Self::from_vec3(xyz * 2.0);
        }
        let angle = 2.0 * s.atan2(q.w);
        Self::from_vec3(xyz * (angle / s))
    }

    /// Convert the rotation vector to a unit quaternion.
    pub fn to_quat(&self) -> DQuat {
        let v = self.as_vec3();
        let angle = v.length();
        if angle < SMALL_ANGLE {
            return DQuat::from_xyzw(v.x * 0.5, v.y * 0.5, v.z * 0.5, 1.0).normalize();
        }
        DQuat::from_axis_angle(v / angle, angle)
    }

    /// Return the equivalent rotation vector with an angle in `[0, pi]`.
    pub fn canonical(&self) -> Self {
        Self::from_quat(self.to_quat())
    }

    /// Return the inverse rotation.
    pub fn inverse(&self) -> Self {
        Self([-self.0[0], -self.0[1], -self.0[2]])
    }

    /// Compose two rotations: the result applies `other` first and then `self`.
    pub fn compose(&self, other: &RotationVector) -> Self {
        Self::from_quat(self.to_quat() * other.to_quat())
    }

    /// Angle in radians of the relative rotation between `self` and `other`.
    pub fn geodesic_angle(&self, other: &RotationVector) -> f64 {
        self.inverse().compose(other).angle()
    }

    /// Partial derivatives of the rotation matrix with respect to each vector component.
    ///
    /// Uses the closed form of Gallego and Yezzi,
    /// `dR/dv_k = (v_k [v]x + [v x (I - R) e_k]x) R / |v|^2`, and the expansion
    /// `[e_k]x + ([e_k]x [v]x + [v]x [e_k]x) / 2` near the identity.
    pub fn derivatives(&self) -> [DMat3; 3] {
        let v = self.as_vec3();
        let angle_sq = v.length_squared();
        let basis = [DVec3::X, DVec3::Y, DVec3::Z];

        if angle_sq.sqrt() < SMALL_ANGLE {
            let kv = skew(v);
            return basis.map(|e| {
                let ke = skew(e);
                ke + (ke * kv + kv * ke) * 0.5
            });
        }

        let rotation = self.to_matrix();
        let kv = skew(v);
        let i_minus_r = DMat3::IDENTITY - rotation;
        let mut derivatives = [DMat3::ZERO; 3];
        for (k, (d, e)) in derivatives.iter_mut().zip(basis.iter()).enumerate() {
            let w = v.cross(i_minus_r * *e);
            *d = (kv * v[k] + skew(w)) * rotation * (1.0 / angle_sq);
        }
        derivatives
    }

    /// Draw a rotation uniformly distributed over all 3D orientations.
    ///
    /// Samples a uniform unit quaternion with the subgroup algorithm of Shoemake.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let r1: f64 = rng.random();
        let r2: f64 = rng.random();
        let r3: f64 = rng.random();

        let two_pi = 2.0 * std::f64::consts::PI;
        let w = (1.0 - r1).sqrt() * (two_pi * r2).sin();
        let x = (1.0 - r1).sqrt() * (two_pi * r2).cos();
        let y = r1.sqrt() * (two_pi * r3).sin();
        let z = r1.sqrt() * (two_pi * r3).cos();

        Self::from_quat(DQuat::from_xyzw(x, y, z, w))
    }

    /// Draw a rotation about a uniformly random axis by an angle uniform in `[0, max_angle]`.
    pub fn random_perturbation<R: Rng + ?Sized>(max_angle: f64, rng: &mut R) -> Self {
        let cos_theta: f64 = 2.0 * rng.random::<f64>() - 1.0;
        let phi = 2.0 * std::f64::consts::PI * rng.random::<f64>();
        let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
        let axis = DVec3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta);
        let angle = max_angle * rng.random::<f64>();
        Self::from_vec3(axis * angle)
    }
}

impl From<[f64; 3]> for RotationVector {
    fn from(v: [f64; 3]) -> Self {
        Self(v)
    }
}

impl From<RotationVector> for [f64; 3] {
    fn from(v: RotationVector) -> Self {
        v.0
    }
}

impl TryFrom<&[f64]> for RotationVector {
    type Error = RotationError;

    fn try_from(coords: &[f64]) -> Result<Self, Self::Error> {
        match coords {
            [x, y, z] => Ok(Self([*x, *y, *z])),
            _ => Err(RotationError::InvalidLength(coords.len())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use rand::{rngs::StdRng, SeedableRng};
    use std::f64::consts::{FRAC_PI_2, PI};

    fn assert_mat_eq(a: &DMat3, b: &DMat3, epsilon: f64) {
        for (x, y) in a.to_cols_array().iter().zip(b.to_cols_array().iter()) {
            assert_abs_diff_eq!(x, y, epsilon = epsilon);
        }
    }

    #[test]
    fn test_to_matrix_quarter_turn() -> Result<(), Box<dyn std::error::Error>> {
        let rotation = RotationVector::from_axis_angle(&[1.0, 0.0, 0.0], FRAC_PI_2)?;
        let expected = DMat3::from_cols(
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(0.0, 0.0, 1.0),
            DVec3::new(0.0, -1.0, 0.0),
        );
        assert_mat_eq(&rotation.to_matrix(), &expected, 1e-12);
        assert_mat_eq(
            &rotation.to_matrix(),
            &DMat3::from_axis_angle(DVec3::X, FRAC_PI_2),
            1e-12,
        );
        Ok(())
    }

    #[test]
    fn test_to_matrix_identity_limit() {
        assert_eq!(RotationVector::IDENTITY.to_matrix(), DMat3::IDENTITY);

        let tiny = RotationVector::new(1e-9, -2e-9, 5e-10);
        assert_mat_eq(&tiny.to_matrix(), &DMat3::IDENTITY, 1e-8);
        assert!(tiny.to_matrix().is_finite());
    }

    #[test]
    fn test_to_matrix_orthonormal() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let m = RotationVector::random(&mut rng).to_matrix();
            assert_mat_eq(&(m.transpose() * m), &DMat3::IDENTITY, 1e-12);
            assert_relative_eq!(m.determinant(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_from_axis_angle_zero_axis() {
        let res = RotationVector::from_axis_angle(&[0.0, 0.0, 0.0], 1.0);
        assert_eq!(res, Err(RotationError::ZeroAxis));
    }

    #[test]
    fn test_matrix_roundtrip() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let v = RotationVector::random(&mut rng);
            let back = RotationVector::from_matrix(&v.to_matrix());
            assert_mat_eq(&back.to_matrix(), &v.to_matrix(), 1e-9);
            assert!(back.angle() <= PI + 1e-12);
        }
    }

    #[test]
    fn test_canonical() {
        let v = RotationVector::new(0.0, 0.0, 1.5 * PI);
        let c = v.canonical();
        assert_relative_eq!(c.as_array()[2], -0.5 * PI, epsilon = 1e-12);
        assert_mat_eq(&c.to_matrix(), &v.to_matrix(), 1e-12);
    }

    #[test]
    fn test_compose() {
        let a = RotationVector::new(0.0, 0.0, 0.3);
        let b = RotationVector::new(0.4, -0.1, 0.2);
        let composed = a.compose(&b);
        assert_mat_eq(
            &composed.to_matrix(),
            &(a.to_matrix() * b.to_matrix()),
            1e-12,
        );
        assert_abs_diff_eq!(a.compose(&a.inverse()).angle(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_geodesic_angle() {
        let a = RotationVector::new(0.0, 0.0, 0.25);
        let b = RotationVector::new(0.0, 0.0, -0.5);
        assert_relative_eq!(a.geodesic_angle(&b), 0.75, epsilon = 1e-12);
        assert_abs_diff_eq!(a.geodesic_angle(&a), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_derivatives_match_finite_differences() {
        let h = 1e-6;
        for v in [
            RotationVector::new(0.3, -0.7, 1.1),
            RotationVector::new(2.5, 0.4, -0.3),
            RotationVector::new(1e-8, 0.0, -2e-8),
            RotationVector::IDENTITY,
        ] {
            let derivatives = v.derivatives();
            for (k, d) in derivatives.iter().enumerate() {
                let mut plus = v.as_array();
                let mut minus = v.as_array();
                plus[k] += h;
                minus[k] -= h;
                let numeric = (RotationVector::from(plus).to_matrix()
                    - RotationVector::from(minus).to_matrix())
                    * (0.5 / h);
                assert_mat_eq(d, &numeric, 1e-6);
            }
        }
    }

    #[test]
    fn test_random_is_deterministic_for_seed() {
        let mut rng1 = StdRng::seed_from_u64(42);
        let mut rng2 = StdRng::seed_from_u64(42);
        for _ in 0..10 {
            assert_eq!(
                RotationVector::random(&mut rng1),
                RotationVector::random(&mut rng2)
            );
        }
    }

    #[test]
    fn test_random_perturbation_bounded() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..100 {
            let v = RotationVector::random_perturbation(0.3, &mut rng);
            assert!(v.angle() <= 0.3 + 1e-12);
        }
    }

    #[test]
    fn test_try_from_slice() {
        let coords = vec![0.1, 0.2, 0.3];
        let v = RotationVector::try_from(coords.as_slice());
        assert_eq!(v, Ok(RotationVector::new(0.1, 0.2, 0.3)));
        let short = vec![0.1, 0.2];
        assert_eq!(
            RotationVector::try_from(short.as_slice()),
            Err(RotationError::InvalidLength(2))
        );
    }
}
