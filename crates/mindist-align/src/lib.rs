#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

mod aligner;
pub use aligner::*;

mod config;
pub use config::AlignConfig;

mod error;
pub use error::AlignError;

/// Helpers shared by the exact distance evaluation.
pub mod ops;

/// Smooth permutation invariant overlap energy.
pub mod potential;
pub use potential::AlignmentPotential;
