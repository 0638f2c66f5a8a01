use serde::{Deserialize, Serialize};

use crate::AlignError;

/// Parameters of the stochastic alignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignConfig {
    /// Total number of basin hopping steps.
    pub outer_iterations: usize,
    /// Number of basin hopping steps between two early stop checks.
    pub batch_size: usize,
    /// Number of lowest energy rotations re-checked with the exact assignment.
    pub pool_capacity: usize,
    /// Width of the Gaussian overlap kernel.
    pub smoothing_width: f64,
    /// Gradient norm at which a local minimization is converged.
    pub local_tolerance: f64,
    /// Iteration budget of a single local minimization.
    pub max_local_iterations: usize,
    /// Stop once the best energy is this close to the theoretical minimum. Zero never stops early.
    pub early_stop_tolerance: f64,
    /// Metropolis temperature, in units of the normalized overlap energy.
    pub temperature: f64,
    /// Seed of the random source. `None` draws a seed from the operating system.
    pub random_seed: Option<u64>,
    /// Largest perturbation angle of a step. `None` draws uniformly random rotations.
    pub max_step_angle: Option<f64>,
    /// Rotations closer than this angle (radians) count as the same archived minimum.
    pub duplicate_angle_tolerance: f64,
    /// True distances closer than this are ties, resolved towards the smaller rotation.
    pub distance_tie_tolerance: f64,
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            outer_iterations: 100,
            batch_size: 1,
            pool_capacity: 20,
            smoothing_width: 0.2,
            local_tolerance: 1e-6,
            max_local_iterations: 500,
            early_stop_tolerance: 1e-6,
            temperature: 0.1,
            random_seed: None,
            max_step_angle: None,
            duplicate_angle_tolerance: 1e-3,
            distance_tie_tolerance: 1e-6,
        }
    }
}

impl AlignConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the total number of basin hopping steps.
    pub fn with_outer_iterations(mut self, iterations: usize) -> Self {
        self.outer_iterations = iterations;
        self
    }

    /// Set the number of steps between early stop checks.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the candidate pool capacity.
    pub fn with_pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = capacity;
        self
    }

    /// Set the Gaussian kernel width.
    pub fn with_smoothing_width(mut self, sigma: f64) -> Self {
        self.smoothing_width = sigma;
        self
    }

    /// Set the local minimization gradient tolerance.
    pub fn with_local_tolerance(mut self, tol: f64) -> Self {
        self.local_tolerance = tol;
        self
    }

    /// Set the local minimization iteration budget.
    pub fn with_max_local_iterations(mut self, max_iters: usize) -> Self {
        self.max_local_iterations = max_iters;
        self
    }

    /// Set the early stop tolerance.
    pub fn with_early_stop_tolerance(mut self, tol: f64) -> Self {
        self.early_stop_tolerance = tol;
        self
    }

    /// Set the Metropolis temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the random seed.
    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    /// Bound the perturbation angle of each step.
    pub fn with_max_step_angle(mut self, angle: f64) -> Self {
        self.max_step_angle = Some(angle);
        self
    }

    /// Set the angular tolerance under which archived rotations are merged.
    pub fn with_duplicate_angle_tolerance(mut self, angle: f64) -> Self {
        self.duplicate_angle_tolerance = angle;
        self
    }

    /// Set the tolerance under which two true distances are considered equal.
    pub fn with_distance_tie_tolerance(mut self, tol: f64) -> Self {
        self.distance_tie_tolerance = tol;
        self
    }

    /// Check that every value is in range.
    ///
    /// The smoothing width is validated when the potential is built.
    pub fn validate(&self) -> Result<(), AlignError> {
        if self.batch_size == 0 {
            return Err(AlignError::InvalidConfiguration(
                "batch size must be positive".to_string(),
            ));
        }
        if self.pool_capacity == 0 {
            return Err(AlignError::InvalidConfiguration(
                "pool capacity must be positive".to_string(),
            ));
        }
        if self.local_tolerance.is_nan() || self.local_tolerance <= 0.0 {
            return Err(AlignError::InvalidConfiguration(format!(
                "local tolerance must be positive, got {}",
                self.local_tolerance
            )));
        }
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return Err(AlignError::InvalidConfiguration(format!(
                "temperature must be finite and non-negative, got {}",
                self.temperature
            )));
        }
        if self.early_stop_tolerance.is_nan() || self.early_stop_tolerance < 0.0 {
            return Err(AlignError::InvalidConfiguration(format!(
                "early stop tolerance must be non-negative, got {}",
                self.early_stop_tolerance
            )));
        }
        if let Some(angle) = self.max_step_angle {
            if angle.is_nan() || angle <= 0.0 {
                return Err(AlignError::InvalidConfiguration(format!(
                    "max step angle must be positive, got {angle}"
                )));
            }
        }
        let negative = |tol: f64| tol.is_nan() || tol < 0.0;
        if negative(self.duplicate_angle_tolerance) || negative(self.distance_tie_tolerance) {
            return Err(AlignError::InvalidConfiguration(
                "tolerances must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}
