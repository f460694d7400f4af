//! Error types for the Persisthaus crate
//!
//! This module contains all error types that can be returned by Persisthaus operations.

use config::ConfigError;
use entity_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersisthausError {
    #[error("Database connection error: {0}")]
    DatabaseConnection(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Entity config not found: {0}")]
    ConfigNotFound(String),

    #[error("Entity config already registered: {0}")]
    ConfigAlreadyRegistered(String),

    #[error("Entity config for '{0}' holds a different entity type")]
    EntityTypeMismatch(String),

    #[error("Failed to close shared executor: {0}")]
    Shutdown(StoreError),
}
