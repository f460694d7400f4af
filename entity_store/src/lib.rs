//! Entity Store - Query execution engine for Persisthaus
//!
//! This crate turns declarative query descriptions into parameterized database
//! calls. Each entity type gets an [`EntityConfig`] holding its table metadata,
//! a [`QueryRegistry`] of named queries and the attached [`Executor`]. Running a
//! query goes through its before-hooks, the statement generator, the executor,
//! the result transform and its after-hooks.

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod defaults;
pub mod entity_config;
pub mod errors;
pub mod executor;
pub mod params;
pub mod postgres;
pub mod prelude;
pub mod query;
pub mod registry;
pub mod schema;
pub mod transform;
pub mod validation;

#[cfg(test)]
mod testing;

pub use entity_config::{EntityConfig, EntityConfigBuilder, ErrorNormalizer, RowMapper};
pub use errors::StoreError;
pub use executor::{DbResponse, Executor, Statement};
pub use params::{Operation, OperationKind, QueryParameters, QueryParametersBuilder};
pub use postgres::PgExecutor;
pub use query::{Generator, Query, QuerySpec};
pub use registry::QueryRegistry;
pub use schema::{EntitySchema, Model};
pub use transform::{QueryOutput, Transform, TransformRegistry, BOOLEAN, MULTIPLE, SINGULAR};
pub use validation::{QueryName, ValidatedFieldName, ValidatedTableName, ValidationError};

pub use hook_system::{HookChain, HookPhase};
pub use type_mapping::{Row, SqlValue};
