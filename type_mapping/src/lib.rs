//! Unified value mapping between Rust entities and relational rows
//! This crate provides the scalar model shared by statements, responses and entities

pub mod errors;
pub mod serialize;
pub mod types;

pub use errors::TypeMappingError;
pub use serialize::{from_row, to_row};
pub use types::{Row, SqlValue};
