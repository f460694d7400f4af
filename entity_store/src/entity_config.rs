//! Per-entity configuration
//!
//! An [`EntityConfig`] owns everything needed to persist one entity type: table
//! metadata, the query registry, the row mapper, the error normalizer and the
//! attached executor. It is built once and shared through `Arc`; queries, hooks
//! and the connection may change afterwards through interior mutability.

use crate::defaults::default_queries;
use crate::errors::StoreError;
use crate::executor::Executor;
use crate::params::{Operation, QueryParameters};
use crate::postgres::PgExecutor;
use crate::query::QuerySpec;
use crate::registry::QueryRegistry;
use crate::schema::{EntitySchema, Model};
use crate::transform::{QueryOutput, Transform};
use crate::validation::{ValidatedFieldName, ValidatedTableName};
use crate::debug_log;
use config::DatabaseConfig;
use hook_system::{HookFuture, HookPhase};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use type_mapping::Row;

/// Maps one response row to an entity
pub type RowMapper<E> = Arc<dyn Fn(&Row) -> Result<E, StoreError> + Send + Sync>;

/// Rewrites executor failures before they reach the caller
pub type ErrorNormalizer = Arc<dyn Fn(anyhow::Error) -> anyhow::Error + Send + Sync>;

const DEFAULT_PRIMARY_KEY: &str = "id";

pub struct EntityConfig<E> {
    table: ValidatedTableName,
    primary_key: String,
    identifiers: Vec<String>,
    columns: Vec<String>,
    queries: QueryRegistry<E>,
    connection: RwLock<Option<Arc<dyn Executor>>>,
    row_mapper: Option<RowMapper<E>>,
    error_normalizer: Option<ErrorNormalizer>,
}

impl<E> fmt::Debug for EntityConfig<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let connected = self
            .connection
            .read()
            .map(|conn| conn.is_some())
            .unwrap_or_else(|poisoned| poisoned.into_inner().is_some());

        f.debug_struct("EntityConfig")
            .field("table", &self.table)
            .field("primary_key", &self.primary_key)
            .field("identifiers", &self.identifiers)
            .field("columns", &self.columns)
            .field("queries", &self.queries)
            .field("connected", &connected)
            .finish()
    }
}

impl<E: Model> EntityConfig<E> {
    pub fn builder(table: impl Into<String>) -> EntityConfigBuilder<E> {
        EntityConfigBuilder {
            table: table.into(),
            primary_key: None,
            identifiers: Vec::new(),
            columns: Vec::new(),
            queries: Vec::new(),
            transforms: Vec::new(),
            row_mapper: None,
            error_normalizer: None,
            default_queries: true,
        }
    }

    /// Builder prefilled from derived table metadata
    pub fn schema_builder() -> EntityConfigBuilder<E>
    where
        E: EntitySchema,
    {
        Self::builder(E::table_name())
            .primary_key(E::primary_key())
            .identifiers(E::identifiers().iter().copied())
            .columns(E::columns().iter().copied())
    }

    /// Config built from derived table metadata with the default query set
    pub fn from_schema() -> Result<Arc<Self>, StoreError>
    where
        E: EntitySchema,
    {
        Self::schema_builder().build()
    }

    pub fn table(&self) -> &str {
        self.table.as_str()
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Identifier columns, primary key first
    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    /// Persisted columns in declared order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn is_identifier(&self, column: &str) -> bool {
        self.identifiers.iter().any(|id| id == column)
    }

    pub fn queries(&self) -> &QueryRegistry<E> {
        &self.queries
    }

    /// Map a response row through the configured mapper, or deserialize it
    pub fn map_row(&self, row: &Row) -> Result<E, StoreError> {
        match &self.row_mapper {
            Some(mapper) => mapper(row),
            None => Ok(type_mapping::from_row(row)?),
        }
    }

    pub fn normalize_error(&self, err: anyhow::Error) -> anyhow::Error {
        match &self.error_normalizer {
            Some(normalizer) => normalizer(err),
            None => err,
        }
    }

    // Connection management

    /// Attach an executor, replacing any executor already attached
    pub fn setup(&self, executor: Arc<dyn Executor>) {
        let previous = self
            .connection
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(executor);

        if previous.is_some() {
            debug_log!("[{}] replaced attached executor", self.table);
        }
    }

    /// Open a PostgreSQL pool and attach it
    pub async fn connect(&self, config: &DatabaseConfig) -> Result<(), StoreError> {
        let executor = PgExecutor::connect(config)
            .await
            .map_err(|e| StoreError::Database(self.normalize_error(e.into())))?;

        self.setup(Arc::new(executor));
        Ok(())
    }

    /// Attached executor
    pub fn executor(&self) -> Result<Arc<dyn Executor>, StoreError> {
        self.connection
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| StoreError::NotConnected(self.table().to_string()))
    }

    pub fn is_connected(&self) -> bool {
        self.connection
            .read()
            .map(|conn| conn.is_some())
            .unwrap_or_else(|poisoned| poisoned.into_inner().is_some())
    }

    /// Drop the attached executor without closing it
    ///
    /// For executors shared with other configs; returns whether one was attached.
    pub fn detach(&self) -> bool {
        let detached = self
            .connection
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some();

        if detached {
            debug_log!("[{}] executor detached", self.table);
        }
        detached
    }

    /// Detach and close the executor
    ///
    /// Never fails: a close error is logged and handed back as a value. Calling
    /// it without an attached executor does nothing.
    pub async fn cleanup(&self) -> Option<StoreError> {
        let executor = self
            .connection
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()?;

        match executor.close().await {
            Ok(()) => {
                debug_log!("[{}] connection closed", self.table);
                None
            }
            Err(e) => {
                tracing::warn!("Failed to close connection for '{}': {}", self.table, e);
                Some(StoreError::Database(self.normalize_error(e)))
            }
        }
    }

    // Hook management

    /// Attach an async hook to the named query
    pub fn add_hook<F>(&self, when: HookPhase, trigger: &str, hook: F) -> Result<(), StoreError>
    where
        F: for<'a> Fn(&'a mut QueryParameters<E>) -> HookFuture<'a> + Send + Sync + 'static,
    {
        let query = self.queries.require(trigger)?;
        query.hooks().add(Some(when), hook);
        Ok(())
    }

    /// Attach a synchronous hook to the named query
    pub fn add_hook_sync<F>(&self, when: HookPhase, trigger: &str, hook: F) -> Result<(), StoreError>
    where
        F: Fn(&mut QueryParameters<E>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let query = self.queries.require(trigger)?;
        query.hooks().add_sync(Some(when), hook);
        Ok(())
    }

    /// Clear hooks of one query, or of every query when `trigger` is `None`
    pub fn flush_hooks(&self, when: Option<HookPhase>, trigger: Option<&str>) -> Result<(), StoreError> {
        match trigger {
            Some(name) => self.queries.require(name)?.hooks().flush(when),
            None => {
                for query in self.queries.queries() {
                    query.hooks().flush(when);
                }
            }
        }
        Ok(())
    }

    // Execution

    /// Run a registered query by name
    pub async fn run(
        &self,
        name: &str,
        params: &mut QueryParameters<E>,
    ) -> Result<QueryOutput<E>, StoreError> {
        let query = self.queries.require(name)?;
        query.run(params).await
    }

    /// Run the query serving a built-in operation
    pub async fn execute(self: &Arc<Self>, operation: Operation<E>) -> Result<QueryOutput<E>, StoreError> {
        let name = operation.kind().query_name();
        let mut params = operation.into_parameters(self);
        self.run(name, &mut params).await
    }
}

/// Builder for [`EntityConfig`]
pub struct EntityConfigBuilder<E> {
    table: String,
    primary_key: Option<String>,
    identifiers: Vec<String>,
    columns: Vec<String>,
    queries: Vec<QuerySpec<E>>,
    transforms: Vec<(String, Transform<E>)>,
    row_mapper: Option<RowMapper<E>>,
    error_normalizer: Option<ErrorNormalizer>,
    default_queries: bool,
}

impl<E: Model> EntityConfigBuilder<E> {
    /// Primary key column; defaults to `id`
    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = Some(column.into());
        self
    }

    pub fn identifiers<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.identifiers = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Additional query; a name shared with a default query replaces it
    pub fn query(mut self, spec: QuerySpec<E>) -> Self {
        self.queries.push(spec);
        self
    }

    /// Named transform available to `QuerySpec::kind`
    pub fn transform<F>(mut self, name: impl Into<String>, transform: F) -> Self
    where
        F: Fn(&QueryParameters<E>) -> Result<QueryOutput<E>, StoreError> + Send + Sync + 'static,
    {
        self.transforms.push((name.into(), Arc::new(transform)));
        self
    }

    pub fn row_mapper<F>(mut self, mapper: F) -> Self
    where
        F: Fn(&Row) -> Result<E, StoreError> + Send + Sync + 'static,
    {
        self.row_mapper = Some(Arc::new(mapper));
        self
    }

    pub fn error_normalizer<F>(mut self, normalizer: F) -> Self
    where
        F: Fn(anyhow::Error) -> anyhow::Error + Send + Sync + 'static,
    {
        self.error_normalizer = Some(Arc::new(normalizer));
        self
    }

    /// Skip registering save/fetch/fetch_all/update/delete
    pub fn without_default_queries(mut self) -> Self {
        self.default_queries = false;
        self
    }

    /// Validate metadata and normalize it so that
    /// primary key ⊆ identifiers ⊆ columns
    pub fn build(self) -> Result<Arc<EntityConfig<E>>, StoreError> {
        let table = ValidatedTableName::new(&self.table)?;
        let primary_key = ValidatedFieldName::new(
            self.primary_key.as_deref().unwrap_or(DEFAULT_PRIMARY_KEY),
        )?
        .into_string();

        let mut identifiers = vec![primary_key.clone()];
        for column in validated_columns(&self.identifiers, "identifier")? {
            if !identifiers.contains(&column) {
                identifiers.push(column);
            }
        }

        let mut columns = validated_columns(&self.columns, "column")?;
        for identifier in &identifiers {
            if !columns.contains(identifier) {
                columns.push(identifier.clone());
            }
        }

        let queries = QueryRegistry::new();
        for (name, transform) in self.transforms {
            queries
                .transforms()
                .register(&name, move |params| transform(params))?;
        }
        if self.default_queries {
            for spec in default_queries() {
                queries.create(spec)?;
            }
        }
        for spec in self.queries {
            queries.create(spec)?;
        }

        debug_log!(
            "[{}] configured: pk={}, identifiers={:?}, columns={:?}, queries={:?}",
            table,
            primary_key,
            identifiers,
            columns,
            queries.names()
        );

        Ok(Arc::new(EntityConfig {
            table,
            primary_key,
            identifiers,
            columns,
            queries,
            connection: RwLock::new(None),
            row_mapper: self.row_mapper,
            error_normalizer: self.error_normalizer,
        }))
    }
}

/// Validate each name and reject duplicates, keeping order
fn validated_columns(names: &[String], role: &str) -> Result<Vec<String>, StoreError> {
    let mut validated: Vec<String> = Vec::with_capacity(names.len());

    for name in names {
        let column = ValidatedFieldName::new(name)?.into_string();
        if validated.contains(&column) {
            return Err(StoreError::InvalidConfig(format!(
                "duplicate {} '{}'",
                role, column
            )));
        }
        validated.push(column);
    }

    Ok(validated)
}
