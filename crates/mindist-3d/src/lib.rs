#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Linear algebra utilities.
pub mod linalg;

/// Labeled point sets.
pub mod pointset;

/// Angle-axis rotation parametrization.
pub mod rotation;
