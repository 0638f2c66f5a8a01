//! Basin hopping over rotations.
//!
//! Each step perturbs the current chain rotation, quenches the trial with a local minimizer,
//! records the quenched minimum and accepts or rejects it with the Metropolis criterion. The
//! driver runs for a fixed number of steps; deciding when to stop searching is left to the
//! caller.

use mindist_3d::rotation::RotationVector;
use rand::Rng;

use crate::minimizer::{LocalMinimizer, Objective};

/// Proposes a trial rotation from the current chain rotation.
pub trait StepProposer {
    /// Return a new trial rotation.
    fn propose<R: Rng + ?Sized>(&self, current: &RotationVector, rng: &mut R) -> RotationVector;
}

/// Sink receiving every quenched minimum, accepted or not.
pub trait Recorder {
    /// Record a quenched minimum.
    fn record(&mut self, energy: f64, rotation: &RotationVector);
}

/// Composes the current rotation with a rotation drawn uniformly over all orientations.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformRotationStep;

impl StepProposer for UniformRotationStep {
    fn propose<R: Rng + ?Sized>(&self, current: &RotationVector, rng: &mut R) -> RotationVector {
        RotationVector::random(rng).compose(current)
    }
}

/// Composes the current rotation with a rotation of random axis and bounded angle.
#[derive(Debug, Clone, Copy)]
pub struct BoundedRotationStep {
    /// Largest perturbation angle in radians.
    pub max_angle: f64,
}

impl StepProposer for BoundedRotationStep {
    fn propose<R: Rng + ?Sized>(&self, current: &RotationVector, rng: &mut R) -> RotationVector {
        RotationVector::random_perturbation(self.max_angle, rng).compose(current)
    }
}

/// Working state of the Markov chain: the current rotation and its energy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignmentState {
    /// Current chain rotation.
    pub rotation: RotationVector,
    /// Energy at the current chain rotation.
    pub energy: f64,
}

impl AlignmentState {
    /// Create a new chain state.
    pub fn new(rotation: RotationVector, energy: f64) -> Self {
        Self { rotation, energy }
    }
}

/// Outcome of one basin hopping step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    /// Energy of the quenched trial rotation.
    pub energy: f64,
    /// Whether the chain moved to the trial rotation.
    pub accepted: bool,
    /// Whether the local minimization reached its tolerance.
    pub converged: bool,
}

/// Basin hopping driver.
///
/// Holds only its configuration, the chain state is owned by the caller.
#[derive(Debug, Clone)]
pub struct BasinHopping<'a, M: LocalMinimizer> {
    minimizer: &'a M,
    temperature: f64,
}

impl<'a, M: LocalMinimizer> BasinHopping<'a, M> {
    /// Create a new driver.
    ///
    /// A temperature of zero accepts only steps that do not increase the energy.
    pub fn new(minimizer: &'a M, temperature: f64) -> Self {
        Self {
            minimizer,
            temperature,
        }
    }

    /// The acceptance temperature.
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Metropolis acceptance test.
    fn accept<R: Rng + ?Sized>(&self, current: f64, trial: f64, rng: &mut R) -> bool {
        if trial <= current {
            return true;
        }
        if self.temperature <= 0.0 {
            return false;
        }
        let probability = (-(trial - current) / self.temperature).exp();
        rng.random::<f64>() < probability
    }

    /// Run `num_steps` basin hopping steps starting from `state`.
    ///
    /// # Arguments
    ///
    /// * `state` - The chain state, updated in place.
    /// * `num_steps` - Number of steps to perform.
    /// * `objective` - Energy and gradient as a function of the rotation vector.
    /// * `proposer` - Generates trial rotations.
    /// * `recorder` - Receives every quenched minimum.
    /// * `rng` - Source of randomness for proposals and acceptance.
    ///
    /// # Returns
    ///
    /// The outcome of every step, in order.
    pub fn run<O, P, S, R>(
        &self,
        state: &mut AlignmentState,
        num_steps: usize,
        objective: &O,
        proposer: &P,
        recorder: &mut S,
        rng: &mut R,
    ) -> Vec<StepOutcome>
    where
        O: Objective + ?Sized,
        P: StepProposer + ?Sized,
        S: Recorder + ?Sized,
        R: Rng + ?Sized,
    {
        let mut outcomes = Vec::with_capacity(num_steps);

        for step in 0..num_steps {
            let trial = proposer.propose(&state.rotation, rng);

            let quench = self.minimizer.minimize(&trial.as_array(), objective);
            if !quench.success {
                log::debug!(
                    "step {}: quench stopped after {} iterations with gradient norm {:e}",
                    step,
                    quench.iterations,
                    quench.gradient_norm
                );
            }

            let rotation = match RotationVector::try_from(quench.x.as_slice()) {
                Ok(rotation) => rotation.canonical(),
                Err(e) => {
                    log::warn!("step {step}: discarding quench result: {e}");
                    continue;
                }
            };

            recorder.record(quench.value, &rotation);

            let accepted = self.accept(state.energy, quench.value, rng);
            if accepted {
                state.rotation = rotation;
                state.energy = quench.value;
            }

            log::debug!(
                "step {}: E = {:.8}, accepted = {}, chain E = {:.8}",
                step,
                quench.value,
                accepted,
                state.energy
            );

            outcomes.push(StepOutcome {
                energy: quench.value,
                accepted,
                converged: quench.success,
            });
        }

        outcomes
    }
}
