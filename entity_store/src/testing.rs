//! Shared fixtures for unit tests

use crate::entity_config::EntityConfig;
use crate::executor::{DbResponse, Executor, Statement};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use type_mapping::{Row, SqlValue};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
}

impl User {
    pub fn new(id: i64, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            email: format!("{}@example.com", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Abc {
    pub a: i64,
    pub b: i64,
    pub c: i64,
}

pub fn user_config() -> Arc<EntityConfig<User>> {
    EntityConfig::builder("users")
        .primary_key("id")
        .identifiers(["email"])
        .columns(["id", "name", "email"])
        .build()
        .unwrap()
}

pub fn user_config_with_normalizer<F>(normalizer: F) -> Arc<EntityConfig<User>>
where
    F: Fn(anyhow::Error) -> anyhow::Error + Send + Sync + 'static,
{
    EntityConfig::builder("users")
        .identifiers(["email"])
        .columns(["id", "name", "email"])
        .error_normalizer(normalizer)
        .build()
        .unwrap()
}

pub fn abc_config() -> Arc<EntityConfig<Abc>> {
    EntityConfig::builder("abc")
        .primary_key("a")
        .columns(["a", "b", "c"])
        .build()
        .unwrap()
}

pub fn user_row(id: i64, name: &str) -> Row {
    let user = User::new(id, name);
    let mut row = Row::new();
    row.insert("id".to_string(), SqlValue::BigInt(user.id));
    row.insert("name".to_string(), SqlValue::Text(user.name));
    row.insert("email".to_string(), SqlValue::Text(user.email));
    row
}

/// Executor stub that records statements and replays queued responses
///
/// With nothing queued, a statement yields an empty response.
#[derive(Default)]
pub struct RecordingExecutor {
    statements: Mutex<Vec<Statement>>,
    responses: Mutex<VecDeque<Result<DbResponse, String>>>,
    close_error: Mutex<Option<String>>,
    close_calls: AtomicUsize,
}

impl RecordingExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond_with_rows(&self, rows: Vec<Row>) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(DbResponse::from_rows(rows)));
    }

    pub fn respond_with_affected(&self, count: u64) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(DbResponse::affected(count)));
    }

    pub fn fail_with(&self, message: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
    }

    pub fn fail_close_with(&self, message: &str) {
        *self.close_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn statements(&self) -> Vec<Statement> {
        self.statements.lock().unwrap().clone()
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Executor for RecordingExecutor {
    async fn query(&self, statement: &Statement) -> anyhow::Result<DbResponse> {
        self.statements.lock().unwrap().push(statement.clone());

        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Ok(DbResponse::default()),
        }
    }

    async fn close(&self) -> anyhow::Result<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        match self.close_error.lock().unwrap().clone() {
            Some(message) => Err(anyhow::anyhow!(message)),
            None => Ok(()),
        }
    }
}
