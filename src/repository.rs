//! Entity-facing persistence API
//!
//! [`Repository`] exposes the built-in operations of one [`EntityConfig`].
//! [`Persisted`] pairs an entity reference with its config so the entity itself
//! can be saved, updated or deleted through the [`Persistable`] trait.
//!
//! ```rust,ignore
//! let users = Repository::new(EntityConfig::<User>::from_schema()?);
//!
//! users.save(&alice).await?;
//! users.wrap(&alice).update("name".into()).await?;
//! let found = users.fetch(Lookup::by("email", "alice@example.com")).await?;
//! ```

use async_trait::async_trait;
use entity_store::{
    EntityConfig, Model, Operation, QueryOutput, QueryParameters, QueryParametersBuilder,
    SqlValue, StoreError,
};
use std::sync::Arc;

use crate::errors::PersisthausError;

/// Columns written by an update
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ColumnSelection {
    /// Every persisted column
    #[default]
    All,
    Single(String),
    Many(Vec<String>),
}

impl From<&str> for ColumnSelection {
    fn from(column: &str) -> Self {
        ColumnSelection::Single(column.to_string())
    }
}

impl From<String> for ColumnSelection {
    fn from(column: String) -> Self {
        ColumnSelection::Single(column)
    }
}

impl From<Vec<String>> for ColumnSelection {
    fn from(columns: Vec<String>) -> Self {
        ColumnSelection::Many(columns)
    }
}

impl From<&[&str]> for ColumnSelection {
    fn from(columns: &[&str]) -> Self {
        ColumnSelection::Many(columns.iter().map(|c| c.to_string()).collect())
    }
}

impl ColumnSelection {
    /// Column list for the update, checked against the config's persisted columns
    fn resolve<E: Model>(self, conf: &EntityConfig<E>) -> Result<Option<Vec<String>>, StoreError> {
        let columns = match self {
            ColumnSelection::All => return Ok(None),
            ColumnSelection::Single(column) => vec![column],
            ColumnSelection::Many(columns) => columns,
        };

        if columns.is_empty() {
            return Err(StoreError::InvalidArgument(
                "Column selection cannot be empty".to_string(),
            ));
        }
        if let Some(unknown) = columns.iter().find(|c| !conf.columns().contains(*c)) {
            return Err(StoreError::InvalidArgument(format!(
                "'{}' is not a persisted column of '{}'",
                unknown,
                conf.table()
            )));
        }

        Ok(Some(columns))
    }
}

/// How fetch and delete address a single row
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    PrimaryKey(SqlValue),
    /// Any identifier column
    By(String, SqlValue),
}

impl Lookup {
    pub fn primary_key(value: impl Into<SqlValue>) -> Self {
        Lookup::PrimaryKey(value.into())
    }

    pub fn by(column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Lookup::By(column.into(), value.into())
    }

    fn resolve<E: Model>(
        self,
        conf: &EntityConfig<E>,
    ) -> Result<(Option<String>, SqlValue), StoreError> {
        match self {
            Lookup::PrimaryKey(value) => Ok((None, value)),
            Lookup::By(column, value) => {
                if !conf.is_identifier(&column) {
                    return Err(StoreError::InvalidArgument(format!(
                        "'{}' is not an identifier column of '{}'",
                        column,
                        conf.table()
                    )));
                }
                Ok((Some(column), value))
            }
        }
    }
}

/// Persistence capability of a single entity value
#[async_trait]
pub trait Persistable {
    /// Insert the entity; true when a row was written
    async fn save(&self) -> Result<bool, PersisthausError>;

    /// Update the selected columns of the row addressed by the primary key
    async fn update(&self, columns: ColumnSelection) -> Result<bool, PersisthausError>;

    /// Delete the row addressed by the primary key
    async fn delete(&self) -> Result<bool, PersisthausError>;
}

/// An entity reference bound to its config
#[derive(Debug)]
pub struct Persisted<'a, E> {
    entity: &'a E,
    conf: &'a Arc<EntityConfig<E>>,
}

impl<'a, E: Model> Persisted<'a, E> {
    pub fn new(entity: &'a E, conf: &'a Arc<EntityConfig<E>>) -> Self {
        Self { entity, conf }
    }

    pub fn entity(&self) -> &E {
        self.entity
    }
}

#[async_trait]
impl<'a, E: Model> Persistable for Persisted<'a, E> {
    async fn save(&self) -> Result<bool, PersisthausError> {
        let output = self.conf.execute(Operation::Save(self.entity.clone())).await?;
        Ok(output.into_bool()?)
    }

    async fn update(&self, columns: ColumnSelection) -> Result<bool, PersisthausError> {
        let columns = columns.resolve(self.conf)?;
        let output = self
            .conf
            .execute(Operation::Update {
                entity: self.entity.clone(),
                columns,
            })
            .await?;
        Ok(output.into_bool()?)
    }

    async fn delete(&self) -> Result<bool, PersisthausError> {
        let output = self.conf.execute(Operation::Delete(self.entity.clone())).await?;
        Ok(output.into_bool()?)
    }
}

/// Built-in operations for one entity type
#[derive(Debug)]
pub struct Repository<E> {
    conf: Arc<EntityConfig<E>>,
}

impl<E> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            conf: Arc::clone(&self.conf),
        }
    }
}

impl<E: Model> Repository<E> {
    pub fn new(conf: Arc<EntityConfig<E>>) -> Self {
        Self { conf }
    }

    pub fn conf(&self) -> &Arc<EntityConfig<E>> {
        &self.conf
    }

    /// Bind an entity to this repository's config
    pub fn wrap<'a>(&'a self, entity: &'a E) -> Persisted<'a, E> {
        Persisted::new(entity, &self.conf)
    }

    pub async fn save(&self, entity: &E) -> Result<bool, PersisthausError> {
        self.wrap(entity).save().await
    }

    pub async fn update(
        &self,
        entity: &E,
        columns: impl Into<ColumnSelection>,
    ) -> Result<bool, PersisthausError> {
        self.wrap(entity).update(columns.into()).await
    }

    pub async fn delete(&self, entity: &E) -> Result<bool, PersisthausError> {
        self.wrap(entity).delete().await
    }

    /// Fetch the row addressed by `lookup`
    pub async fn fetch(&self, lookup: Lookup) -> Result<Option<E>, PersisthausError> {
        let (key, value) = lookup.resolve(&self.conf)?;
        let output = self.conf.execute(Operation::Fetch { key, value }).await?;
        Ok(output.into_entity()?)
    }

    pub async fn fetch_all(&self) -> Result<Vec<E>, PersisthausError> {
        let output = self.conf.execute(Operation::FetchAll).await?;
        Ok(output.into_entities()?)
    }

    /// Delete the row addressed by `lookup`
    pub async fn delete_by(&self, lookup: Lookup) -> Result<bool, PersisthausError> {
        let (key, value) = lookup.resolve(&self.conf)?;
        let output = self.conf.execute(Operation::DeleteBy { key, value }).await?;
        Ok(output.into_bool()?)
    }

    /// Parameter builder for a custom query run
    pub fn params(&self) -> QueryParametersBuilder<E> {
        QueryParameters::builder(&self.conf)
    }

    /// Run any registered query by name
    pub async fn run(
        &self,
        name: &str,
        mut params: QueryParameters<E>,
    ) -> Result<QueryOutput<E>, PersisthausError> {
        Ok(self.conf.run(name, &mut params).await?)
    }
}
