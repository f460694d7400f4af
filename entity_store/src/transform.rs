//! Result transforms
//!
//! A transform turns the raw response carried by [`QueryParameters`] into the
//! value handed back to the caller. Queries pick one by name at construction.

use crate::errors::StoreError;
use crate::params::QueryParameters;
use crate::schema::Model;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use type_mapping::SqlValue;

/// Transform from a completed parameter set to a caller-facing value
pub type Transform<E> =
    Arc<dyn Fn(&QueryParameters<E>) -> Result<QueryOutput<E>, StoreError> + Send + Sync>;

pub const SINGULAR: &str = "singular";
pub const MULTIPLE: &str = "multiple";
pub const BOOLEAN: &str = "boolean";

/// Value returned by a query run
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput<E> {
    /// No row matched
    Empty,
    Entity(E),
    Entities(Vec<E>),
    Boolean(bool),
    Scalar(SqlValue),
}

impl<E> QueryOutput<E> {
    fn variant(&self) -> &'static str {
        match self {
            QueryOutput::Empty => "empty",
            QueryOutput::Entity(_) => "entity",
            QueryOutput::Entities(_) => "entities",
            QueryOutput::Boolean(_) => "boolean",
            QueryOutput::Scalar(_) => "scalar",
        }
    }

    pub fn into_bool(self) -> Result<bool, StoreError> {
        match self {
            QueryOutput::Boolean(b) => Ok(b),
            other => Err(StoreError::UnexpectedOutput {
                expected: "boolean",
                actual: other.variant(),
            }),
        }
    }

    pub fn into_entity(self) -> Result<Option<E>, StoreError> {
        match self {
            QueryOutput::Empty => Ok(None),
            QueryOutput::Entity(entity) => Ok(Some(entity)),
            other => Err(StoreError::UnexpectedOutput {
                expected: "entity",
                actual: other.variant(),
            }),
        }
    }

    pub fn into_entities(self) -> Result<Vec<E>, StoreError> {
        match self {
            QueryOutput::Empty => Ok(Vec::new()),
            QueryOutput::Entities(entities) => Ok(entities),
            other => Err(StoreError::UnexpectedOutput {
                expected: "entities",
                actual: other.variant(),
            }),
        }
    }

    pub fn into_scalar(self) -> Result<SqlValue, StoreError> {
        match self {
            QueryOutput::Empty => Ok(SqlValue::Null),
            QueryOutput::Scalar(value) => Ok(value),
            other => Err(StoreError::UnexpectedOutput {
                expected: "scalar",
                actual: other.variant(),
            }),
        }
    }
}

/// Zero rows yield `Empty`; any other count maps the first row
pub fn singular<E: Model>(params: &QueryParameters<E>) -> Result<QueryOutput<E>, StoreError> {
    match params.response()?.rows.first() {
        Some(row) => Ok(QueryOutput::Entity(params.conf().map_row(row)?)),
        None => Ok(QueryOutput::Empty),
    }
}

/// Every row mapped, in response order
pub fn multiple<E: Model>(params: &QueryParameters<E>) -> Result<QueryOutput<E>, StoreError> {
    let conf = params.conf();
    let entities = params
        .response()?
        .rows
        .iter()
        .map(|row| conf.map_row(row))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(QueryOutput::Entities(entities))
}

/// True when at least one row was affected or returned
pub fn boolean<E: Model>(params: &QueryParameters<E>) -> Result<QueryOutput<E>, StoreError> {
    Ok(QueryOutput::Boolean(params.response()?.row_count > 0))
}

/// Transform used when a query declares neither a transform nor a type
///
/// Unlike [`singular`], more than one row is an error: the query was expected to
/// address a unique row.
pub fn single_row<E: Model>(params: &QueryParameters<E>) -> Result<QueryOutput<E>, StoreError> {
    let rows = &params.response()?.rows;

    match rows.as_slice() {
        [] => Ok(QueryOutput::Empty),
        [row] => Ok(QueryOutput::Entity(params.conf().map_row(row)?)),
        _ => Err(StoreError::UnexpectedRowCount {
            query: params.query_name().unwrap_or_default().to_string(),
            actual: rows.len(),
        }),
    }
}

/// Named transforms available to queries
pub struct TransformRegistry<E> {
    transforms: RwLock<HashMap<String, Transform<E>>>,
}

impl<E> std::fmt::Debug for TransformRegistry<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<String> = self
            .transforms
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();

        f.debug_struct("TransformRegistry")
            .field("names", &names)
            .finish()
    }
}

impl<E: Model> TransformRegistry<E> {
    /// Registry holding `singular`, `multiple` and `boolean`
    pub fn new() -> Self {
        let mut transforms: HashMap<String, Transform<E>> = HashMap::new();
        transforms.insert(SINGULAR.to_string(), Arc::new(singular::<E>));
        transforms.insert(MULTIPLE.to_string(), Arc::new(multiple::<E>));
        transforms.insert(BOOLEAN.to_string(), Arc::new(boolean::<E>));

        Self {
            transforms: RwLock::new(transforms),
        }
    }

    /// Register a transform; an existing name is overwritten
    pub fn register<F>(&self, name: &str, transform: F) -> Result<(), StoreError>
    where
        F: Fn(&QueryParameters<E>) -> Result<QueryOutput<E>, StoreError> + Send + Sync + 'static,
    {
        if name.trim().is_empty() {
            return Err(StoreError::InvalidArgument(
                "Transform name cannot be blank".to_string(),
            ));
        }

        self.transforms
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), Arc::new(transform));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Transform<E>> {
        self.transforms
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn has(&self, name: &str) -> bool {
        self.transforms
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }
}

impl<E: Model> Default for TransformRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}
