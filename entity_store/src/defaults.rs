//! Default query set
//!
//! | name        | statement                                          | transform  |
//! |-------------|----------------------------------------------------|------------|
//! | `save`      | `INSERT INTO t (cols) VALUES ($1, ...)`            | `boolean`  |
//! | `fetch`     | `SELECT * FROM t WHERE key = $1`                   | `singular` |
//! | `fetch_all` | `SELECT * FROM t`                                  | `multiple` |
//! | `update`    | `UPDATE t SET col = $1, ... WHERE pk = $n`         | `boolean`  |
//! | `delete`    | `DELETE FROM t WHERE key = $1`                     | `boolean`  |

use crate::errors::StoreError;
use crate::executor::{placeholders, Statement};
use crate::params::QueryParameters;
use crate::query::QuerySpec;
use crate::schema::Model;
use crate::transform::{BOOLEAN, MULTIPLE, SINGULAR};
use type_mapping::SqlValue;

pub fn save_statement<E: Model>(params: &QueryParameters<E>) -> Result<Statement, StoreError> {
    let (columns, values) = params.column_values()?;

    Ok(Statement::new(
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            params.conf().table(),
            columns.join(", "),
            placeholders(1, values.len()).join(", ")
        ),
        values.to_vec(),
    ))
}

pub fn fetch_statement<E: Model>(params: &QueryParameters<E>) -> Result<Statement, StoreError> {
    let (key, kval) = key_and_value(params)?;

    Ok(Statement::new(
        format!("SELECT * FROM {} WHERE {} = $1", params.conf().table(), key),
        vec![kval],
    ))
}

pub fn fetch_all_statement<E: Model>(params: &QueryParameters<E>) -> Result<Statement, StoreError> {
    Ok(Statement::new(
        format!("SELECT * FROM {}", params.conf().table()),
        Vec::new(),
    ))
}

pub fn update_statement<E: Model>(params: &QueryParameters<E>) -> Result<Statement, StoreError> {
    let (columns, values) = params.column_values()?;
    let primary_key = params.conf().primary_key();
    let primary_value = params
        .field(primary_key)?
        .cloned()
        .unwrap_or(SqlValue::Null);

    let assignments: Vec<String> = columns
        .iter()
        .zip(placeholders(1, columns.len()))
        .map(|(column, placeholder)| format!("{} = {}", column, placeholder))
        .collect();

    let mut bound = values.to_vec();
    bound.push(primary_value);

    Ok(Statement::new(
        format!(
            "UPDATE {} SET {} WHERE {} = ${}",
            params.conf().table(),
            assignments.join(", "),
            primary_key,
            bound.len()
        ),
        bound,
    ))
}

pub fn delete_statement<E: Model>(params: &QueryParameters<E>) -> Result<Statement, StoreError> {
    let (key, kval) = key_and_value(params)?;

    Ok(Statement::new(
        format!("DELETE FROM {} WHERE {} = $1", params.conf().table(), key),
        vec![kval],
    ))
}

/// Identifier column and its value; a missing value binds as NULL
fn key_and_value<E: Model>(params: &QueryParameters<E>) -> Result<(&str, SqlValue), StoreError> {
    let key = params.key().ok_or(StoreError::MissingParameter("key"))?;
    if !params.conf().is_identifier(key) {
        return Err(StoreError::InvalidArgument(format!(
            "'{}' is not an identifier column of '{}'",
            key,
            params.conf().table()
        )));
    }

    let kval = params.kval()?.cloned().unwrap_or(SqlValue::Null);
    Ok((key, kval))
}

/// Specs for the default query set, in registration order
pub fn default_queries<E: Model>() -> Vec<QuerySpec<E>> {
    vec![
        QuerySpec::new("save").generate(save_statement::<E>).kind(BOOLEAN),
        QuerySpec::new("fetch").generate(fetch_statement::<E>).kind(SINGULAR),
        QuerySpec::new("fetch_all")
            .generate(fetch_all_statement::<E>)
            .kind(MULTIPLE),
        QuerySpec::new("update").generate(update_statement::<E>).kind(BOOLEAN),
        QuerySpec::new("delete").generate(delete_statement::<E>).kind(BOOLEAN),
    ]
}
