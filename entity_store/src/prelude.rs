//! Convenience re-exports for common entity-store usage

// Configuration and execution
pub use crate::entity_config::{EntityConfig, EntityConfigBuilder};
pub use crate::params::{Operation, OperationKind, QueryParameters};
pub use crate::query::{Query, QuerySpec};
pub use crate::registry::QueryRegistry;
pub use crate::transform::{QueryOutput, TransformRegistry, BOOLEAN, MULTIPLE, SINGULAR};

// Executor contract
pub use crate::executor::{DbResponse, Executor, Statement};
pub use crate::postgres::PgExecutor;

// Entity traits
pub use crate::schema::{EntitySchema, Model};

// Error types
pub use crate::errors::StoreError;

// Hooks and values
pub use hook_system::{HookFuture, HookPhase};
pub use type_mapping::{Row, SqlValue};

// Common external dependencies that are frequently used
pub use async_trait::async_trait;
pub use serde::{Deserialize, Serialize};
