//! Executor contract
//!
//! The store never talks to a database directly; it hands a parameterized
//! [`Statement`] to an [`Executor`] and receives a [`DbResponse`].

use async_trait::async_trait;
use std::fmt;
use type_mapping::{Row, SqlValue};

/// Parameterized statement with positional `$1, $2, ...` placeholders
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub text: String,
    pub values: Vec<SqlValue>,
}

impl Statement {
    pub fn new(text: impl Into<String>, values: Vec<SqlValue>) -> Self {
        Self {
            text: text.into(),
            values,
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -- {} value(s)", self.text, self.values.len())
    }
}

/// Raw response of an executed statement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DbResponse {
    pub rows: Vec<Row>,
    pub row_count: u64,
}

impl DbResponse {
    pub fn new(rows: Vec<Row>, row_count: u64) -> Self {
        Self { rows, row_count }
    }

    /// Response for a statement that returned rows
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let row_count = rows.len() as u64;
        Self { rows, row_count }
    }

    /// Response for a statement that only affected rows
    pub fn affected(row_count: u64) -> Self {
        Self {
            rows: Vec::new(),
            row_count,
        }
    }
}

/// Build `$start, $start+1, ...` placeholders for `count` values
pub fn placeholders(start: usize, count: usize) -> Vec<String> {
    (start..start + count).map(|i| format!("${}", i)).collect()
}

/// Async executor for parameterized statements
///
/// Timeouts and retries, if any, belong to the implementation.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn query(&self, statement: &Statement) -> anyhow::Result<DbResponse>;

    /// Release underlying resources
    async fn close(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders(1, 3), vec!["$1", "$2", "$3"]);
        assert_eq!(placeholders(4, 1), vec!["$4"]);
        assert!(placeholders(1, 0).is_empty());
    }

    #[test]
    fn test_response_constructors() {
        let response = DbResponse::from_rows(vec![Row::new(), Row::new()]);
        assert_eq!(response.row_count, 2);

        let response = DbResponse::affected(5);
        assert!(response.rows.is_empty());
        assert_eq!(response.row_count, 5);
    }
}
