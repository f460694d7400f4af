//! Query parameters
//!
//! [`QueryParameters`] is the one channel through which hooks, statement
//! generators and transforms observe an operation. Fields left unset are derived
//! from the entity and its config on first access and then stay fixed for the
//! lifetime of the instance. Explicit overrides, including explicit "nothing",
//! are never re-derived.

use crate::entity_config::EntityConfig;
use crate::errors::StoreError;
use crate::executor::DbResponse;
use crate::query::Query;
use crate::schema::Model;
use crate::transform::QueryOutput;
use std::fmt;
use std::sync::{Arc, OnceLock};
use type_mapping::{Row, SqlValue};

/// Which built-in operation produced a parameter set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Save,
    Fetch,
    FetchAll,
    Update,
    Delete,
}

impl OperationKind {
    /// Name of the registered query serving this operation
    pub fn query_name(&self) -> &'static str {
        match self {
            OperationKind::Save => "save",
            OperationKind::Fetch => "fetch",
            OperationKind::FetchAll => "fetch_all",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
        }
    }
}

/// Typed input of a built-in operation
///
/// `key: None` addresses the row through the primary key.
#[derive(Debug, Clone)]
pub enum Operation<E> {
    Save(E),
    Fetch { key: Option<String>, value: SqlValue },
    FetchAll,
    Update { entity: E, columns: Option<Vec<String>> },
    Delete(E),
    DeleteBy { key: Option<String>, value: SqlValue },
}

impl<E: Model> Operation<E> {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Save(_) => OperationKind::Save,
            Operation::Fetch { .. } => OperationKind::Fetch,
            Operation::FetchAll => OperationKind::FetchAll,
            Operation::Update { .. } => OperationKind::Update,
            Operation::Delete(_) | Operation::DeleteBy { .. } => OperationKind::Delete,
        }
    }

    pub fn into_parameters(self, conf: &Arc<EntityConfig<E>>) -> QueryParameters<E> {
        let builder = QueryParameters::builder(conf).kind(self.kind());

        let builder = match self {
            Operation::Save(entity) | Operation::Delete(entity) => builder.ent(entity),
            Operation::Fetch { key, value } | Operation::DeleteBy { key, value } => match key {
                Some(key) => builder.key(key).kval(value),
                None => builder.kval(value),
            },
            Operation::FetchAll => builder,
            Operation::Update { entity, columns } => match columns {
                Some(columns) => builder.ent(entity).columns(columns),
                None => builder.ent(entity),
            },
        };

        builder.build()
    }
}

/// Parameter bag passed through the hook chain and into statement generation
pub struct QueryParameters<E> {
    conf: Arc<EntityConfig<E>>,
    kind: Option<OperationKind>,
    ent: Option<E>,
    entities: Vec<E>,
    key: Option<Option<String>>,
    kval: Option<SqlValue>,
    columns: Option<Vec<String>>,
    values: Option<Vec<SqlValue>>,
    record: OnceLock<Row>,
    derived_values: OnceLock<Vec<SqlValue>>,
    /// Query currently executing with these parameters
    pub query: Option<Arc<Query<E>>>,
    /// Raw database response
    pub res: Option<DbResponse>,
    /// Transformed result returned to the caller
    pub ret: Option<QueryOutput<E>>,
}

impl<E> fmt::Debug for QueryParameters<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryParameters")
            .field("kind", &self.kind)
            .field("has_ent", &self.ent.is_some())
            .field("entities", &self.entities.len())
            .field("key", &self.key)
            .field("kval", &self.kval)
            .field("columns", &self.columns)
            .field("values", &self.values)
            .field("has_res", &self.res.is_some())
            .field("has_ret", &self.ret.is_some())
            .finish()
    }
}

impl<E: Model> QueryParameters<E> {
    pub fn new(conf: &Arc<EntityConfig<E>>) -> Self {
        Self::builder(conf).build()
    }

    pub fn builder(conf: &Arc<EntityConfig<E>>) -> QueryParametersBuilder<E> {
        QueryParametersBuilder {
            conf: Arc::clone(conf),
            kind: None,
            ent: None,
            entities: Vec::new(),
            key: None,
            kval: None,
            columns: None,
            values: None,
        }
    }

    pub fn conf(&self) -> &Arc<EntityConfig<E>> {
        &self.conf
    }

    pub fn kind(&self) -> Option<OperationKind> {
        self.kind
    }

    pub fn ent(&self) -> Option<&E> {
        self.ent.as_ref()
    }

    pub fn entities(&self) -> &[E] {
        &self.entities
    }

    /// Identifier column; defaults to the primary key
    pub fn key(&self) -> Option<&str> {
        match &self.key {
            Some(explicit) => explicit.as_deref(),
            None => Some(self.conf.primary_key()),
        }
    }

    /// Value of the identifier column; defaults to the entity's value for `key`
    pub fn kval(&self) -> Result<Option<&SqlValue>, StoreError> {
        if let Some(kval) = &self.kval {
            return Ok(Some(kval));
        }

        match self.key() {
            Some(key) => self.field(key),
            None => Ok(None),
        }
    }

    /// Columns an operation writes; defaults to every persisted column
    pub fn columns(&self) -> &[String] {
        match &self.columns {
            Some(columns) => columns,
            None => self.conf.columns(),
        }
    }

    /// Values aligned with [`columns`](Self::columns)
    pub fn values(&self) -> Result<&[SqlValue], StoreError> {
        if let Some(values) = &self.values {
            return Ok(values);
        }
        if let Some(values) = self.derived_values.get() {
            return Ok(values);
        }

        let row = self.record()?.ok_or(StoreError::MissingParameter("ent"))?;
        let values = self
            .columns()
            .iter()
            .map(|column| row.get(column).cloned().unwrap_or(SqlValue::Null))
            .collect();

        Ok(self.derived_values.get_or_init(|| values))
    }

    /// Columns and values, checked for positional alignment
    pub fn column_values(&self) -> Result<(&[String], &[SqlValue]), StoreError> {
        let columns = self.columns();
        if columns.is_empty() {
            return Err(StoreError::InvalidArgument(
                "Column list cannot be empty".to_string(),
            ));
        }
        let values = self.values()?;

        if columns.len() != values.len() {
            return Err(StoreError::ValueMismatch {
                columns: columns.len(),
                values: values.len(),
            });
        }

        Ok((columns, values))
    }

    /// The entity serialized into a row
    pub fn record(&self) -> Result<Option<&Row>, StoreError> {
        let Some(ent) = self.ent.as_ref() else {
            return Ok(None);
        };
        if let Some(row) = self.record.get() {
            return Ok(Some(row));
        }

        let row = type_mapping::to_row(ent)?;
        Ok(Some(self.record.get_or_init(|| row)))
    }

    /// The entity's value for one column
    pub fn field(&self, column: &str) -> Result<Option<&SqlValue>, StoreError> {
        Ok(self.record()?.and_then(|row| row.get(column)))
    }

    pub fn query_name(&self) -> Option<&str> {
        self.query.as_ref().map(|query| query.name())
    }

    /// Raw response; present once the statement has executed
    pub fn response(&self) -> Result<&DbResponse, StoreError> {
        self.res.as_ref().ok_or(StoreError::MissingParameter("res"))
    }

    /// Mutable access to the entity; derived values are recomputed afterwards
    pub fn ent_mut(&mut self) -> Option<&mut E> {
        self.invalidate();
        self.ent.as_mut()
    }

    pub fn set_ent(&mut self, ent: Option<E>) {
        self.invalidate();
        self.ent = ent;
    }

    pub fn set_key(&mut self, key: Option<String>) {
        self.key = Some(key);
    }

    pub fn set_kval(&mut self, kval: SqlValue) {
        self.kval = Some(kval);
    }

    pub fn set_columns(&mut self, columns: Vec<String>) {
        self.derived_values.take();
        self.columns = Some(columns);
    }

    pub fn set_values(&mut self, values: Vec<SqlValue>) {
        self.values = Some(values);
    }

    fn invalidate(&mut self) {
        self.record.take();
        self.derived_values.take();
    }
}

/// Builder for [`QueryParameters`]
pub struct QueryParametersBuilder<E> {
    conf: Arc<EntityConfig<E>>,
    kind: Option<OperationKind>,
    ent: Option<Option<E>>,
    entities: Vec<E>,
    key: Option<Option<String>>,
    kval: Option<SqlValue>,
    columns: Option<Vec<String>>,
    values: Option<Vec<SqlValue>>,
}

impl<E: Model> QueryParametersBuilder<E> {
    pub fn kind(mut self, kind: OperationKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn ent(mut self, ent: E) -> Self {
        self.ent = Some(Some(ent));
        self
    }

    /// Explicitly no entity, even when `entities` is given
    pub fn without_ent(mut self) -> Self {
        self.ent = Some(None);
        self
    }

    pub fn entities(mut self, entities: impl IntoIterator<Item = E>) -> Self {
        self.entities = entities.into_iter().collect();
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(Some(key.into()));
        self
    }

    /// Explicitly no identifier column; the primary key is not substituted
    pub fn without_key(mut self) -> Self {
        self.key = Some(None);
        self
    }

    pub fn kval(mut self, kval: impl Into<SqlValue>) -> Self {
        self.kval = Some(kval.into());
        self
    }

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn values<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        self.values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn build(self) -> QueryParameters<E> {
        let ent = match self.ent {
            Some(explicit) => explicit,
            None => self.entities.first().cloned(),
        };

        QueryParameters {
            conf: self.conf,
            kind: self.kind,
            ent,
            entities: self.entities,
            key: self.key,
            kval: self.kval,
            columns: self.columns,
            values: self.values,
            record: OnceLock::new(),
            derived_values: OnceLock::new(),
            query: None,
            res: None,
            ret: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{abc_config, user_config, Abc, User};

    #[test]
    fn test_columns_and_values_follow_config_order() {
        let conf = abc_config();
        let params = QueryParameters::builder(&conf)
            .ent(Abc { a: 1, b: 2, c: 3 })
            .build();

        assert_eq!(params.columns(), ["a", "b", "c"]);
        assert_eq!(
            params.values().unwrap(),
            [SqlValue::BigInt(1), SqlValue::BigInt(2), SqlValue::BigInt(3)]
        );
    }

    #[test]
    fn test_values_follow_explicit_columns() {
        let conf = abc_config();
        let params = QueryParameters::builder(&conf)
            .ent(Abc { a: 1, b: 2, c: 3 })
            .columns(["a"])
            .build();

        assert_eq!(params.columns(), ["a"]);
        assert_eq!(params.values().unwrap(), [SqlValue::BigInt(1)]);
    }

    #[test]
    fn test_explicit_missing_key_is_preserved() {
        let conf = user_config();
        let params = QueryParameters::builder(&conf)
            .without_key()
            .kval("x")
            .build();

        assert_eq!(params.key(), None);
        assert_eq!(params.kval().unwrap(), Some(&SqlValue::Text("x".to_string())));
    }

    #[test]
    fn test_key_defaults_to_primary_key() {
        let conf = user_config();
        let params = QueryParameters::builder(&conf)
            .ent(User::new(7, "x"))
            .build();

        assert_eq!(params.key(), Some("id"));
        assert_eq!(params.kval().unwrap(), Some(&SqlValue::BigInt(7)));
    }

    #[test]
    fn test_explicit_null_kval_is_not_rederived() {
        let conf = user_config();
        let params = QueryParameters::builder(&conf)
            .ent(User::new(7, "x"))
            .kval(SqlValue::Null)
            .build();

        assert_eq!(params.kval().unwrap(), Some(&SqlValue::Null));
    }

    #[test]
    fn test_ent_defaults_to_first_entity() {
        let conf = user_config();
        let params = QueryParameters::builder(&conf)
            .entities(vec![User::new(1, "first"), User::new(2, "second")])
            .build();

        assert_eq!(params.ent().map(|u| u.id), Some(1));
        assert_eq!(params.entities().len(), 2);

        let params = QueryParameters::builder(&conf)
            .entities(vec![User::new(1, "first")])
            .without_ent()
            .build();

        assert!(params.ent().is_none());
        assert_eq!(params.kval().unwrap(), None);
    }

    #[test]
    fn test_values_without_entity_fail() {
        let conf = user_config();
        let params = QueryParameters::new(&conf);

        assert!(matches!(
            params.values(),
            Err(StoreError::MissingParameter("ent"))
        ));
    }

    #[test]
    fn test_derivation_is_stable() {
        let conf = user_config();
        let params = QueryParameters::builder(&conf)
            .ent(User::new(3, "x"))
            .build();

        let first = params.values().unwrap().as_ptr();
        let second = params.values().unwrap().as_ptr();
        assert_eq!(first, second);
    }

    #[test]
    fn test_ent_mut_refreshes_derived_values() {
        let conf = user_config();
        let mut params = QueryParameters::builder(&conf)
            .ent(User::new(3, "before"))
            .build();

        assert_eq!(
            params.values().unwrap()[1],
            SqlValue::Text("before".to_string())
        );

        if let Some(user) = params.ent_mut() {
            user.name = "after".to_string();
        }

        assert_eq!(
            params.values().unwrap()[1],
            SqlValue::Text("after".to_string())
        );
    }

    #[test]
    fn test_misaligned_values_are_rejected() {
        let conf = user_config();
        let params = QueryParameters::builder(&conf)
            .columns(["id", "name"])
            .values([1])
            .build();

        assert!(matches!(
            params.column_values(),
            Err(StoreError::ValueMismatch {
                columns: 2,
                values: 1
            })
        ));
    }

    #[test]
    fn test_operation_into_parameters() {
        let conf = user_config();

        let params = Operation::Fetch {
            key: Some("email".to_string()),
            value: SqlValue::from("x@example.com"),
        }
        .into_parameters(&conf);
        assert_eq!(params.kind(), Some(OperationKind::Fetch));
        assert_eq!(params.key(), Some("email"));

        let params = Operation::Update {
            entity: User::new(1, "x"),
            columns: Some(vec!["name".to_string()]),
        }
        .into_parameters(&conf);
        assert_eq!(params.kind(), Some(OperationKind::Update));
        assert_eq!(params.columns(), ["name"]);

        let params = Operation::DeleteBy {
            key: None,
            value: SqlValue::from(4),
        }
        .into_parameters(&conf);
        assert_eq!(params.kind(), Some(OperationKind::Delete));
        assert_eq!(params.key(), Some("id"));
    }
}
