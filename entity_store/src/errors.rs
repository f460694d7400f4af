use crate::validation::ValidationError;
use hook_system::HookError;
use thiserror::Error;
use type_mapping::TypeMappingError;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Query '{0}' is not registered")]
    UnknownQuery(String),

    #[error("Unknown result transform type '{0}'")]
    UnknownTransform(String),

    #[error("Query '{0}' cannot declare both a transform and a transform type")]
    ConflictingTransform(String),

    #[error("Query '{0}' has no statement generator")]
    MissingGenerator(String),

    #[error("Missing query parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Column/value mismatch: {columns} columns but {values} values")]
    ValueMismatch { columns: usize, values: usize },

    #[error("Query '{query}' expected at most one row, got {actual}")]
    UnexpectedRowCount { query: String, actual: usize },

    #[error("Expected {expected} result, got {actual}")]
    UnexpectedOutput {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Mapping error: {0}")]
    Mapping(#[from] TypeMappingError),

    #[error("No connection attached for table '{0}'")]
    NotConnected(String),

    #[error("Database error: {0}")]
    Database(anyhow::Error),

    /// Raised by a hook; carried unchanged
    #[error(transparent)]
    Hook(anyhow::Error),

    #[error("Transform error: {0}")]
    Transform(anyhow::Error),
}

impl From<HookError> for StoreError {
    fn from(err: HookError) -> Self {
        StoreError::InvalidArgument(err.to_string())
    }
}
