//! Core Persisthaus functionality
//!
//! This module contains the main Persisthaus struct, which owns the shared
//! executor and keeps every registered entity config by table name.

use entity_store::{EntityConfig, Executor, Model, PgExecutor, Statement, StoreError};
use sqlx::PgPool;
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::debug_log;
use crate::errors::PersisthausError;
use crate::repository::Repository;
use config::{AppConfig, DatabaseConfig};

/// Type-erased view of a registered entity config
trait Attached: Send + Sync {
    fn as_any(&self) -> &(dyn Any + Send + Sync);

    /// Release the shared executor; it stays open for other configs
    fn detach(&self) -> bool;
}

impl<E: Model> Attached for Arc<EntityConfig<E>> {
    fn as_any(&self) -> &(dyn Any + Send + Sync) {
        self
    }

    fn detach(&self) -> bool {
        EntityConfig::detach(self)
    }
}

/// Main Persisthaus coordinator that manages the shared connection and entity configs
pub struct Persisthaus {
    executor: Arc<dyn Executor>,
    pool: Option<PgPool>,
    configs: BTreeMap<String, Box<dyn Attached>>,
}

impl std::fmt::Debug for Persisthaus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Persisthaus")
            .field("pooled", &self.pool.is_some())
            .field("tables", &self.tables())
            .finish()
    }
}

impl Persisthaus {
    /// Create new Persisthaus with a PostgreSQL pool
    pub async fn new(config: DatabaseConfig) -> Result<Self, PersisthausError> {
        config.validate()?;
        let executor = PgExecutor::connect(&config).await?;
        let pool = executor.pool().clone();

        debug_log!(
            "Connected to {}:{}/{} (pool {}..{})",
            config.host,
            config.port,
            config.database,
            config.min_connections,
            config.max_connections
        );

        Ok(Self {
            executor: Arc::new(executor),
            pool: Some(pool),
            configs: BTreeMap::new(),
        })
    }

    /// Create new Persisthaus from `PERSISTHAUS_CONFIG` or `./persisthaus.toml`
    pub async fn from_env() -> Result<Self, PersisthausError> {
        let app_config = AppConfig::load()?;
        Self::new(app_config.database).await
    }

    /// Create new Persisthaus around an existing executor
    pub fn with_executor(executor: Arc<dyn Executor>) -> Self {
        Self {
            executor,
            pool: None,
            configs: BTreeMap::new(),
        }
    }

    /// Get database pool reference, when backed by PostgreSQL
    pub fn pool(&self) -> Option<&PgPool> {
        self.pool.as_ref()
    }

    pub fn executor(&self) -> &Arc<dyn Executor> {
        &self.executor
    }

    /// Attach the shared executor to a config and keep it under its table name
    pub fn register<E: Model>(
        &mut self,
        config: Arc<EntityConfig<E>>,
    ) -> Result<Repository<E>, PersisthausError> {
        let table = config.table().to_string();
        if self.configs.contains_key(&table) {
            return Err(PersisthausError::ConfigAlreadyRegistered(table));
        }

        config.setup(Arc::clone(&self.executor));
        self.configs.insert(table.clone(), Box::new(Arc::clone(&config)));

        debug_log!("Registered entity config '{}'", table);
        Ok(Repository::new(config))
    }

    /// Get a registered config by table name
    pub fn config<E: Model>(&self, table: &str) -> Result<Arc<EntityConfig<E>>, PersisthausError> {
        let attached = self
            .configs
            .get(table)
            .ok_or_else(|| PersisthausError::ConfigNotFound(table.to_string()))?;

        attached
            .as_any()
            .downcast_ref::<Arc<EntityConfig<E>>>()
            .cloned()
            .ok_or_else(|| PersisthausError::EntityTypeMismatch(table.to_string()))
    }

    /// Repository over a registered config
    pub fn repository<E: Model>(&self, table: &str) -> Result<Repository<E>, PersisthausError> {
        self.config(table).map(Repository::new)
    }

    /// List all registered table names
    pub fn tables(&self) -> Vec<&str> {
        self.configs.keys().map(String::as_str).collect()
    }

    /// Detach a config; the shared executor stays open for the others
    pub fn unregister(&mut self, table: &str) -> Result<(), PersisthausError> {
        let attached = self
            .configs
            .remove(table)
            .ok_or_else(|| PersisthausError::ConfigNotFound(table.to_string()))?;

        attached.detach();
        debug_log!("Unregistered entity config '{}'", table);
        Ok(())
    }

    /// Check database connection health
    pub async fn health_check(&self) -> Result<(), PersisthausError> {
        self.executor
            .query(&Statement::new("SELECT 1", Vec::new()))
            .await
            .map_err(StoreError::Database)?;
        Ok(())
    }

    /// Detach every registered config, then close the shared executor once
    pub async fn shutdown(&mut self) -> Result<(), PersisthausError> {
        for (_, attached) in std::mem::take(&mut self.configs) {
            attached.detach();
        }

        if let Err(e) = self.executor.close().await {
            tracing::warn!("Failed to close shared executor: {}", e);
            return Err(PersisthausError::Shutdown(StoreError::Database(e)));
        }

        Ok(())
    }
}
