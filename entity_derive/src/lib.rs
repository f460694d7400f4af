//! Procedural macros for entity table metadata
//!
//! This crate provides the `Entity` derive and the `#[entity]` attribute macro,
//! which describe how a struct maps onto a table: its name, primary key,
//! identifier columns and persisted columns.

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod entity_macro;
mod parsing;
mod schema_generation;

use entity_macro::entity_attribute;
use parsing::{parse_field_attributes, parse_table_attributes};
use schema_generation::generate_entity_schema_impl;

/// Derive macro for the EntitySchema trait
///
/// Every named field is a persisted column unless marked `#[skip]`. Exactly one
/// field carries `#[primary_key]`; `#[identifier]` marks further columns that
/// address a single row.
///
/// ```rust,ignore
/// #[derive(Debug, Clone, serde::Serialize, serde::Deserialize, Entity)]
/// #[table(name = "customers")]
/// pub struct Customer {
///     #[primary_key]
///     pub id: i64,
///
///     #[identifier]
///     pub email: String,
///
///     pub first_name: String,
///
///     #[skip]
///     #[serde(skip)]
///     pub session: Option<String>,
/// }
/// ```
#[proc_macro_derive(Entity, attributes(table, primary_key, identifier, skip))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let name = &input.ident;

    // Parse table attributes - handle errors properly
    let table_info = match parse_table_attributes(&input.attrs) {
        Ok(attrs) => attrs,
        Err(e) => return e.to_compile_error().into(),
    };

    // Parse field attributes - handle errors properly
    let field_info = match parse_field_attributes(&input.data) {
        Ok(info) => info,
        Err(e) => return e.to_compile_error().into(),
    };

    generate_entity_schema_impl(name, &input.generics, &table_info, &field_info).into()
}

/// Convenience attribute macro that adds all necessary derives for an entity
///
/// ```rust,ignore
/// use entity_derive::entity;
///
/// #[entity]
/// #[table(name = "users")]
/// pub struct User {
///     #[primary_key]
///     pub id: i64,
///     pub name: String,
/// }
/// ```
#[proc_macro_attribute]
pub fn entity(attr: TokenStream, item: TokenStream) -> TokenStream {
    entity_attribute(attr, item)
}
