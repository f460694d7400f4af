//! Parsing utilities for table and field attributes
//!
//! This module handles the parsing of `#[table]`, `#[primary_key]`,
//! `#[identifier]` and `#[skip]` attributes and validation of table and
//! column names.

use syn::{Attribute, Data, Error, Fields, LitStr, Result};

/// Validate table name and return syn::Error for better proc macro error handling
pub fn validate_table_name_syn(name: &str, span: proc_macro2::Span) -> Result<()> {
    validate_identifier(name)
        .map_err(|e| Error::new(span, format!("Invalid table name '{}': {}", name, e)))
}

/// Validate field name and return syn::Error for better proc macro error handling
pub fn validate_field_name_syn(name: &str, span: proc_macro2::Span) -> Result<()> {
    validate_identifier(name)
        .map_err(|e| Error::new(span, format!("Invalid field name '{}': {}", name, e)))
}

/// Validation logic that mirrors entity_store::validation
/// This ensures compile-time validation matches runtime validation
fn validate_identifier(name: &str) -> std::result::Result<(), String> {
    // Check if empty
    if name.is_empty() {
        return Err("Name cannot be empty".to_string());
    }

    // Check length (PostgreSQL limit)
    if name.len() > 63 {
        return Err(format!(
            "Name '{}' is too long: {} characters (max 63)",
            name,
            name.len()
        ));
    }

    // Check first character (must be letter or underscore)
    let first_char = name
        .chars()
        .next()
        .ok_or_else(|| "Name cannot be empty".to_string())?;
    if !first_char.is_ascii_alphabetic() && first_char != '_' {
        return Err(format!(
            "Name '{}' must start with a letter or underscore",
            name
        ));
    }

    // Check all characters (alphanumeric or underscore only)
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(format!("Name '{}' contains invalid characters: only alphanumeric characters and underscores are allowed", name));
    }

    if is_reserved_keyword(name) {
        return Err(format!("Name '{}' is a reserved SQL keyword", name));
    }

    Ok(())
}

/// Same list as entity_store::validation::ValidatedTableName
fn is_reserved_keyword(name: &str) -> bool {
    const RESERVED_KEYWORDS: &[&str] = &[
        // SQL Standard keywords
        "SELECT", "INSERT", "UPDATE", "DELETE", "FROM", "WHERE", "JOIN", "INNER", "LEFT",
        "RIGHT", "FULL", "OUTER", "ON", "AS", "AND", "OR", "NOT", "NULL", "TRUE", "FALSE",
        "CASE", "WHEN", "THEN", "ELSE", "END", "IF", "EXISTS", "IN", "LIKE", "BETWEEN",
        "ORDER", "BY", "GROUP", "HAVING", "LIMIT", "OFFSET", "UNION", "ALL", "DISTINCT",
        "CREATE", "DROP", "ALTER", "TABLE", "INDEX", "VIEW", "DATABASE", "SCHEMA",
        "PRIMARY", "FOREIGN", "REFERENCES", "UNIQUE", "CHECK", "DEFAULT", "CONSTRAINT",
        "COLUMN", "INTO", "VALUES", "SET", "TO",
        // PostgreSQL specific keywords
        "RETURNING", "CONFLICT", "EXCLUDED", "ANALYSE", "ANALYZE", "ARRAY", "ASYMMETRIC",
        "BOTH", "CAST", "COLLATE", "CURRENT_DATE", "CURRENT_TIME", "CURRENT_TIMESTAMP",
        "CURRENT_USER", "DEFERRABLE", "DO", "FETCH", "FOR", "GRANT", "INITIALLY",
        "LATERAL", "LEADING", "LOCALTIME", "LOCALTIMESTAMP", "ONLY", "PLACING",
        "SESSION_USER", "SOME", "SYMMETRIC", "TRAILING", "USER", "USING", "VARIADIC",
        "WINDOW", "WITH",
    ];

    RESERVED_KEYWORDS.contains(&name.to_ascii_uppercase().as_str())
}

#[derive(Debug)]
pub struct TableInfo {
    pub name: String,
}

#[derive(Debug)]
pub struct FieldInfo {
    pub primary_key: String,
    /// Identifier columns, primary key first
    pub identifiers: Vec<String>,
    /// Persisted columns in declaration order
    pub columns: Vec<String>,
}

pub fn parse_table_attributes(attrs: &[Attribute]) -> Result<TableInfo> {
    let mut table_name: Option<LitStr> = None;

    for attr in attrs {
        if attr.path().is_ident("table") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    table_name = Some(meta.value()?.parse()?);
                    Ok(())
                } else {
                    Err(meta.error("unsupported table attribute, expected `name`"))
                }
            })?;
        }
    }

    let table_name = table_name.ok_or_else(|| {
        Error::new(
            proc_macro2::Span::call_site(),
            "table attribute is required: add #[table(name = \"table_name\")] to your struct",
        )
    })?;

    // Validate table name at compile time with proper error handling
    validate_table_name_syn(&table_name.value(), table_name.span())?;

    Ok(TableInfo {
        name: table_name.value(),
    })
}

pub fn parse_field_attributes(data: &Data) -> Result<FieldInfo> {
    let Data::Struct(data_struct) = data else {
        return Err(Error::new(
            proc_macro2::Span::call_site(),
            "Entity can only be derived for structs with named fields",
        ));
    };
    let Fields::Named(fields_named) = &data_struct.fields else {
        return Err(Error::new(
            proc_macro2::Span::call_site(),
            "Entity can only be derived for structs with named fields",
        ));
    };

    let mut primary_key = None;
    let mut identifiers = Vec::new();
    let mut columns = Vec::new();

    for field in &fields_named.named {
        let field_name = field
            .ident
            .as_ref()
            .ok_or_else(|| Error::new_spanned(field, "Field must have a name"))?;
        let field_name_str = field_name.to_string();

        let is_skipped = has_attribute(&field.attrs, "skip");
        let is_primary = has_attribute(&field.attrs, "primary_key");
        let is_identifier = has_attribute(&field.attrs, "identifier");

        if is_skipped {
            if is_primary || is_identifier {
                return Err(Error::new_spanned(
                    field_name,
                    "a #[skip] field cannot be a primary key or identifier",
                ));
            }
            continue;
        }

        // Validate field name at compile time with proper error handling
        validate_field_name_syn(&field_name_str, field_name.span())?;

        if is_primary {
            if primary_key.is_some() {
                return Err(Error::new_spanned(
                    field_name,
                    "only one field can be marked #[primary_key]",
                ));
            }
            primary_key = Some(field_name_str.clone());
        } else if is_identifier {
            identifiers.push(field_name_str.clone());
        }

        columns.push(field_name_str);
    }

    let primary_key = primary_key.ok_or_else(|| {
        Error::new(
            proc_macro2::Span::call_site(),
            "Entity requires exactly one field marked #[primary_key]",
        )
    })?;
    identifiers.insert(0, primary_key.clone());

    Ok(FieldInfo {
        primary_key,
        identifiers,
        columns,
    })
}

pub fn has_attribute(attrs: &[Attribute], name: &str) -> bool {
    attrs.iter().any(|attr| attr.path().is_ident(name))
}
