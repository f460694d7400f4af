//! Convenience re-exports for common Persisthaus usage
//!
//! This prelude module re-exports the most commonly used items from the Persisthaus ecosystem,
//! making it easier to import everything you need with a single use statement.
//!
//! # Example
//!
//! ```rust
//! use persisthaus::prelude::*;
//!
//! // Now you have access to all the common Persisthaus types and traits
//! ```

// Core Persisthaus components
pub use crate::core::Persisthaus;
pub use crate::errors::PersisthausError;
pub use crate::repository::{ColumnSelection, Lookup, Persistable, Persisted, Repository};

// Re-export centralized config
pub use config::{AppConfig, DatabaseConfig};

// Re-export commonly used entity-store types for convenience
pub use entity_store::prelude::*;

// Re-export entity_store module for macro-generated code
pub use entity_store;

// Re-export entity derive for model creation
pub use entity_derive::{entity, Entity};

// Common external dependencies
pub use anyhow;
pub use async_trait;
pub use serde;
pub use sqlx;
pub use tokio;

// Commonly used value types
pub use chrono::{DateTime, Utc};
pub use uuid::Uuid;
