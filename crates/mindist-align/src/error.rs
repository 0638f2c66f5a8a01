use mindist_optim::AssignmentError;

/// Error types for the alignment engine.
#[derive(Debug, thiserror::Error)]
pub enum AlignError {
    /// The two point sets cannot be compared.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The exact assignment failed.
    #[error(transparent)]
    Assignment(#[from] AssignmentError),
}
