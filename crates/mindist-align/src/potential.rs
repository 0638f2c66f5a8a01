//! Overlap energy between a fixed reference set and a rotated moving set.
//!
//! For a rotation `R(v)` the energy is
//!
//! ```text
//! E(v) = -1/N * sum_i sum_j exp(-|x_i - R(v) y_j|^2 / (2 sigma^2))
//! ```
//!
//! where `x` are the reference points and `y` the moving points. Every reference point interacts
//! with every moving point, so the energy does not depend on the labeling of either set and
//! no assignment is needed to evaluate it.

use glam::DVec3;
use mindist_3d::{pointset::PointSet, rotation::RotationVector};
use mindist_optim::Objective;

use crate::AlignError;

/// Smooth, permutation invariant alignment energy as a function of rotation.
#[derive(Debug, Clone)]
pub struct AlignmentPotential {
    reference: Vec<DVec3>,
    moving: Vec<DVec3>,
    sigma: f64,
    // 1 / (2 sigma^2)
    inv_two_sigma_sq: f64,
    global_minimum: f64,
}

impl AlignmentPotential {
    /// Build the potential for two point sets of equal size and a kernel width `sigma`.
    ///
    /// # Errors
    ///
    /// * [`AlignError::InvalidConfiguration`] if `sigma` is not strictly positive.
    /// * [`AlignError::InvalidInput`] if the sets are empty or of different sizes.
    pub fn new(reference: &PointSet, moving: &PointSet, sigma: f64) -> Result<Self, AlignError> {
        if !sigma.is_finite() || sigma <= 0.0 {
            return Err(AlignError::InvalidConfiguration(format!(
                "smoothing width must be positive, got {sigma}"
            )));
        }
        if reference.len() != moving.len() {
            return Err(AlignError::InvalidInput(format!(
                "point sets differ in size: {} != {}",
                reference.len(),
                moving.len()
            )));
        }
        if reference.is_empty() {
            return Err(AlignError::InvalidInput("point sets are empty".to_string()));
        }

        let to_vec3 = |set: &PointSet| {
            set.points()
                .iter()
                .map(|p| DVec3::from_array(*p))
                .collect::<Vec<_>>()
        };
        let reference = to_vec3(reference);
        let moving = to_vec3(moving);
        let inv_two_sigma_sq = 1.0 / (2.0 * sigma * sigma);

        let global_minimum = Self::overlap(&reference, &reference, inv_two_sigma_sq);

        Ok(Self {
            reference,
            moving,
            sigma,
            inv_two_sigma_sq,
            global_minimum,
        })
    }

    fn overlap(reference: &[DVec3], moving: &[DVec3], inv_two_sigma_sq: f64) -> f64 {
        let mut sum = 0.0;
        for x in reference.iter() {
            for y in moving.iter() {
                sum += (-(*x - *y).length_squared() * inv_two_sigma_sq).exp();
            }
        }
        -sum / reference.len() as f64
    }

    /// The kernel width.
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Number of points in each set.
    pub fn num_points(&self) -> usize {
        self.reference.len()
    }

    /// Energy reached when the moving set coincides with the reference set.
    ///
    /// This is the energy of the reference set against itself, used as the target of the early
    /// stop test.
    pub fn global_minimum(&self) -> f64 {
        self.global_minimum
    }

    /// Energy of the moving set rotated by `rotation`.
    pub fn energy(&self, rotation: &RotationVector) -> f64 {
        let r = rotation.to_matrix();
        let rotated = self.moving.iter().map(|y| r * *y).collect::<Vec<_>>();
        Self::overlap(&self.reference, &rotated, self.inv_two_sigma_sq)
    }

    /// Energy and gradient with respect to the rotation vector components.
    pub fn energy_gradient(&self, rotation: &RotationVector) -> (f64, [f64; 3]) {
        let r = rotation.to_matrix();
        let [d0, d1, d2] = rotation.derivatives();

        // rotated moving points and their derivatives along each component
        let rotated = self
            .moving
            .iter()
            .map(|y| (r * *y, [d0 * *y, d1 * *y, d2 * *y]))
            .collect::<Vec<_>>();

        let mut sum = 0.0;
        let mut gradient = [0.0; 3];
        for x in self.reference.iter() {
            for (ry, dry) in rotated.iter() {
                let diff = *x - *ry;
                let kernel = (-diff.length_squared() * self.inv_two_sigma_sq).exp();
                sum += kernel;
                // d|x - Ry|^2 / dv_k = -2 (x - Ry) . (dR_k y)
                for (g, d) in gradient.iter_mut().zip(dry.iter()) {
                    *g += kernel * diff.dot(*d);
                }
            }
        }

        let n = self.reference.len() as f64;
        let scale = -2.0 * self.inv_two_sigma_sq / n;
        (-sum / n, gradient.map(|g| g * scale))
    }
}

impl Objective for AlignmentPotential {
    fn value_gradient(&self, x: &[f64]) -> (f64, Vec<f64>) {
        let rotation = RotationVector::from([x[0], x[1], x[2]]);
        let (energy, gradient) = self.energy_gradient(&rotation);
        (energy, gradient.to_vec())
    }
}
