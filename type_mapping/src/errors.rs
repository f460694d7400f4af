//! Error types for value mapping

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TypeMappingError {
    #[error("Entity must serialize to an object with named fields, got {0}")]
    NotAnObject(&'static str),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Map keys must serialize to strings, numbers or booleans")]
    NonStringKey,

    #[error("Serialization error: {0}")]
    Custom(String),
}
