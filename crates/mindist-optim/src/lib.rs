#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Optimal assignment between two equally sized label sets.
pub mod assignment;

/// Basin hopping global search over rotations.
pub mod basin_hopping;

/// Gradient-based local minimization.
pub mod minimizer;

/// Bounded archive of the best visited rotations.
pub mod pool;

pub use assignment::{Assignment, AssignmentError, AssignmentSolver, Hungarian};
pub use basin_hopping::{
    AlignmentState, BasinHopping, BoundedRotationStep, Recorder, StepOutcome, StepProposer,
    UniformRotationStep,
};
pub use minimizer::{Lbfgs, LbfgsParams, LocalMinimizer, MinimizerResult, Objective};
pub use pool::{Candidate, CandidatePool};
