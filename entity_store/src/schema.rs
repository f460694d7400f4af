//! Entity traits
//!
//! [`Model`] is the bound every persisted type satisfies. [`EntitySchema`] carries
//! table metadata and is normally produced by `#[derive(Entity)]`.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Value type that can be stored as one row
pub trait Model: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

impl<T> Model for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

/// Static table metadata for an entity type
///
/// ```ignore
/// #[derive(Debug, Clone, Serialize, Deserialize, Entity)]
/// #[table(name = "users")]
/// pub struct User {
///     #[primary_key]
///     pub id: i64,
///     #[identifier]
///     pub email: String,
///     pub name: String,
/// }
/// ```
pub trait EntitySchema {
    fn table_name() -> &'static str;

    /// Column that univocally identifies one row
    fn primary_key() -> &'static str;

    /// Columns usable to address exactly one row, primary key included
    fn identifiers() -> &'static [&'static str];

    /// Persisted columns in declaration order
    fn columns() -> &'static [&'static str];
}
