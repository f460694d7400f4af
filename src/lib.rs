//! # Persisthaus
//!
//! A declarative persistence layer for PostgreSQL: describe an entity's table
//! once and get save, fetch, update and delete as named queries with
//! before/after hooks and typed results.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use persisthaus::prelude::*;
//!
//! #[entity]
//! #[table(name = "users")]
//! pub struct User {
//!     #[primary_key]
//!     pub id: i64,
//!
//!     #[identifier]
//!     pub email: String,
//!
//!     pub name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::new(
//!         "localhost".to_string(), 5432, "persisthaus".to_string(),
//!         "postgres".to_string(), "password".to_string(),
//!         1, 5, 30, 600, 3600,
//!     );
//!
//!     let mut persisthaus = Persisthaus::new(config).await?;
//!     let users = persisthaus.register(EntityConfig::<User>::from_schema()?)?;
//!
//!     users.conf().add_hook_sync(HookPhase::Before, "save", |params| {
//!         if let Some(user) = params.ent_mut() {
//!             user.email = user.email.to_lowercase();
//!         }
//!         Ok(())
//!     })?;
//!
//!     let user = User {
//!         id: 1,
//!         email: "John@Example.com".to_string(),
//!         name: "John Doe".to_string(),
//!     };
//!     users.save(&user).await?;
//!
//!     let found = users.fetch(Lookup::by("email", "john@example.com")).await?;
//!     println!("Fetched user: {:?}", found);
//!
//!     persisthaus.shutdown().await?;
//!     Ok(())
//! }
//! ```

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
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

pub mod core;
pub mod errors;
pub mod prelude;
pub mod repository;

// Re-export the main public types for convenience
pub use core::Persisthaus;
pub use errors::PersisthausError;
pub use repository::{ColumnSelection, Lookup, Persistable, Persisted, Repository};

// Re-export centralized config
pub use config::{AppConfig, DatabaseConfig};

// Re-export internal crates used by macros and public API
// These MUST be public for the generated macro code to work correctly
pub use entity_derive;
pub use entity_store;
pub use hook_system;
pub use type_mapping;

// Re-export external dependencies used in public API
pub use async_trait;
pub use sqlx;
