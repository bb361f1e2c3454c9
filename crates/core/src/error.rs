use thiserror::Error;

pub type BanditResult<T> = Result<T, BanditError>;

#[derive(Error, Debug)]
pub enum BanditError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Singular matrix: {0}")]
    SingularMatrix(String),

    #[error("Numeric degeneracy: {0}")]
    NumericDegeneracy(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl BanditError {
    /// Shape mismatch between a supplied vector/matrix and the agent's dimensions.
    pub fn dimension_mismatch(what: &str, expected: usize, actual: usize) -> Self {
        BanditError::InvalidArgument(format!(
            "{what}: expected dimension {expected}, got {actual}"
        ))
    }
}
