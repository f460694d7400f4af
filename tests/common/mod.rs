//! Shared stub executor for integration tests

use persisthaus::prelude::*;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Records statements and replays queued responses; nothing queued yields an
/// empty response
#[derive(Default)]
pub struct StubExecutor {
    statements: Mutex<Vec<Statement>>,
    responses: Mutex<VecDeque<Result<DbResponse, String>>>,
    closes: AtomicUsize,
}

#[allow(dead_code)]
impl StubExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn rows(&self, rows: Vec<Row>) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(DbResponse::from_rows(rows)));
    }

    pub fn affected(&self, count: u64) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(DbResponse::affected(count)));
    }

    pub fn fail(&self, message: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
    }

    pub fn statements(&self) -> Vec<Statement> {
        self.statements.lock().unwrap().clone()
    }

    pub fn last(&self) -> Statement {
        self.statements.lock().unwrap().last().cloned().unwrap()
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Executor for StubExecutor {
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
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn row(pairs: &[(&str, SqlValue)]) -> Row {
    pairs
        .iter()
        .map(|(column, value)| (column.to_string(), value.clone()))
        .collect()
}
