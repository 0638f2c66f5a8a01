use mindist_3d::{pointset::PointSet, rotation::RotationVector};
use mindist_optim::{
    AlignmentState, Assignment, AssignmentSolver, BasinHopping, BoundedRotationStep,
    CandidatePool, Hungarian, Lbfgs, LbfgsParams, LocalMinimizer, StepProposer,
    UniformRotationStep,
};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::ops::assign_rotated;
use crate::potential::AlignmentPotential;
use crate::{AlignConfig, AlignError};

/// Result of the stochastic alignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentResult {
    /// Smallest Euclidean distance found between the aligned sets.
    pub true_distance: f64,
    /// The reference set, translated to its centroid.
    pub aligned_reference: PointSet,
    /// The moving set, centered, rotated and relabeled to match `aligned_reference`.
    pub aligned_moving: PointSet,
    /// Rotation applied to the centered moving set.
    pub rotation: RotationVector,
    /// `permutation[i]` is the moving label matched to reference label `i`.
    pub permutation: Vec<usize>,
    /// Centroid removed from the reference set.
    pub reference_centroid: [f64; 3],
    /// Centroid removed from the moving set.
    pub moving_centroid: [f64; 3],
    /// Quenched energy of every basin hopping step.
    pub trace: Vec<f64>,
    /// Whether each basin hopping step was accepted.
    pub accepted: Vec<bool>,
    /// Number of basin hopping steps performed.
    pub num_steps: usize,
    /// Whether the search stopped at the theoretical minimum energy.
    pub isomer_found: bool,
}

/// Minimum distance alignment under translation, rotation and relabeling.
///
/// The rotation is searched with basin hopping on a smooth overlap energy; the labeling of the
/// best archived rotations is then resolved exactly with an assignment solver.
///
/// All randomness comes from a generator seeded once at construction, so two freshly built
/// aligners with the same seed give identical results on identical inputs. Later calls on the
/// same aligner continue the random stream and generally explore different rotations.
pub struct StochasticAligner<M = Lbfgs, A = Hungarian> {
    config: AlignConfig,
    minimizer: M,
    solver: A,
    rng: StdRng,
}

impl StochasticAligner {
    /// Create an aligner using L-BFGS quenches and the Hungarian algorithm.
    ///
    /// # Errors
    ///
    /// Returns [`AlignError::InvalidConfiguration`] if the configuration is out of range.
    pub fn new(config: AlignConfig) -> Result<Self, AlignError> {
        let minimizer = Lbfgs::new(
            LbfgsParams::default()
                .with_tolerance(config.local_tolerance)
                .with_max_iterations(config.max_local_iterations),
        );
        Self::with_solvers(config, minimizer, Hungarian)
    }
}

impl<M: LocalMinimizer, A: AssignmentSolver> StochasticAligner<M, A> {
    /// Create an aligner with a custom local minimizer and assignment solver.
    pub fn with_solvers(config: AlignConfig, minimizer: M, solver: A) -> Result<Self, AlignError> {
        config.validate()?;
        let rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Self {
            config,
            minimizer,
            solver,
            rng,
        })
    }

    /// The aligner configuration.
    pub fn config(&self) -> &AlignConfig {
        &self.config
    }

    /// Align `moving` onto `reference`.
    ///
    /// # Arguments
    ///
    /// * `reference` - The fixed point set.
    /// * `moving` - The point set to translate, rotate and relabel.
    ///
    /// # Returns
    ///
    /// The smallest distance found together with the aligned geometry.
    ///
    /// # Errors
    ///
    /// * [`AlignError::InvalidInput`] if the sets are empty or differ in size.
    /// * [`AlignError::InvalidConfiguration`] if the smoothing width is not positive.
    pub fn align(
        &mut self,
        reference: &PointSet,
        moving: &PointSet,
    ) -> Result<AlignmentResult, AlignError> {
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

        let reference_centroid = reference.centroid();
        let moving_centroid = moving.centroid();
        let reference = reference.centered();
        let moving = moving.centered();

        let potential =
            AlignmentPotential::new(&reference, &moving, self.config.smoothing_width)?;
        let global_minimum = potential.global_minimum();
        log::debug!("global minimum energy: {global_minimum:.8}");

        let identity = RotationVector::IDENTITY;
        let initial = assign_rotated(&reference, &moving, &identity, &self.solver)?;
        log::debug!(
            "initial energy: {:.8}, distance: {:.8}",
            potential.energy(&identity),
            initial.distance
        );

        // seed the chain with a quench from the identity
        let quench = self.minimizer.minimize(&identity.as_array(), &potential);
        if !quench.success {
            log::warn!(
                "seed quench did not converge in {} iterations, gradient norm {:e}",
                quench.iterations,
                quench.gradient_norm
            );
        }
        let seed = RotationVector::try_from(quench.x.as_slice())
            .map(|r| r.canonical())
            .unwrap_or(identity);
        let mut state = AlignmentState::new(seed, quench.value);
        log::info!(
            "quenched seed energy: {:.8}, distance: {:.8}, evaluations: {}",
            quench.value,
            assign_rotated(&reference, &moving, &seed, &self.solver)?.distance,
            quench.num_evaluations
        );

        let mut pool = CandidatePool::new(self.config.pool_capacity)
            .with_duplicate_angle(self.config.duplicate_angle_tolerance);
        pool.insert(quench.value, seed);

        let max_step_angle = self.config.max_step_angle;
        let search = match max_step_angle {
            Some(max_angle) => self.search(
                &potential,
                &BoundedRotationStep { max_angle },
                &mut state,
                &mut pool,
            ),
            None => self.search(&potential, &UniformRotationStep, &mut state, &mut pool),
        };

        // the energy is only a proxy: re-check every archived rotation exactly
        let mut evaluated = Vec::with_capacity(pool.len());
        for candidate in pool.all() {
            let assignment =
                assign_rotated(&reference, &moving, candidate.rotation(), &self.solver)?;
            log::debug!(
                "candidate energy: {:.8}, distance: {:.8}",
                candidate.energy(),
                assignment.distance
            );
            evaluated.push((assignment, *candidate.rotation()));
        }

        let (assignment, rotation) = select_best(
            (initial, identity),
            evaluated,
            self.config.distance_tie_tolerance,
        );
        let aligned_moving = moving
            .rotated(&rotation.to_matrix())
            .permuted(&assignment.permutation);
        log::info!(
            "minimum distance {:.8} after {} steps",
            assignment.distance,
            search.num_steps
        );

        Ok(AlignmentResult {
            true_distance: assignment.distance,
            aligned_reference: reference,
            aligned_moving,
            rotation,
            permutation: assignment.permutation,
            reference_centroid,
            moving_centroid,
            trace: search.trace,
            accepted: search.accepted,
            num_steps: search.num_steps,
            isomer_found: search.isomer_found,
        })
    }

    /// Run basin hopping in batches until the budget is spent or the minimum is reached.
    fn search<P: StepProposer>(
        &mut self,
        potential: &AlignmentPotential,
        proposer: &P,
        state: &mut AlignmentState,
        pool: &mut CandidatePool,
    ) -> SearchSummary {
        let config = &self.config;
        let driver = BasinHopping::new(&self.minimizer, config.temperature);
        let global_minimum = potential.global_minimum();

        let mut summary = SearchSummary::default();
        if reached_minimum(pool, global_minimum, config.early_stop_tolerance) {
            log::info!("isomer found by the seed quench");
            summary.isomer_found = true;
            return summary;
        }

        while summary.num_steps < config.outer_iterations {
            let batch = config
                .batch_size
                .min(config.outer_iterations - summary.num_steps);
            let outcomes = driver.run(state, batch, potential, proposer, pool, &mut self.rng);

            summary.num_steps += batch;
            for outcome in outcomes {
                summary.trace.push(outcome.energy);
                summary.accepted.push(outcome.accepted);
            }

            if reached_minimum(pool, global_minimum, config.early_stop_tolerance) {
                log::info!("isomer found after {} steps", summary.num_steps);
                summary.isomer_found = true;
                break;
            }
        }
        summary
    }
}

/// Whether the best archived energy is within `tolerance` of the global minimum.
fn reached_minimum(pool: &CandidatePool, global_minimum: f64, tolerance: f64) -> bool {
    pool.best()
        .is_some_and(|best| (best.energy() - global_minimum).abs() < tolerance)
}

/// Pick the exactly evaluated rotation with the smallest distance.
///
/// Every distance within `tie_tolerance` of the minimum over `incumbent` and `candidates` is a
/// tie. Among ties the smallest rotation angle wins, then the first evaluated, starting with
/// `incumbent`.
fn select_best(
    incumbent: (Assignment, RotationVector),
    candidates: Vec<(Assignment, RotationVector)>,
    tie_tolerance: f64,
) -> (Assignment, RotationVector) {
    let min_distance = candidates
        .iter()
        .map(|(assignment, _)| assignment.distance)
        .fold(incumbent.0.distance, f64::min);

    let mut best = incumbent;
    let mut best_is_tie = best.0.distance <= min_distance + tie_tolerance;
    for (assignment, rotation) in candidates {
        if assignment.distance > min_distance + tie_tolerance {
            continue;
        }
        if !best_is_tie || rotation.angle() < best.1.angle() {
            best = (assignment, rotation);
            best_is_tie = true;
        }
    }
    best
}

#[derive(Debug, Default)]
struct SearchSummary {
    trace: Vec<f64>,
    accepted: Vec<bool>,
    num_steps: usize,
    isomer_found: bool,
}
