//! Serialization utilities
//!
//! This module converts entities into rows and rows back into entities
//! using serde as the bridge.
//!
//! [`to_row`] drives its own serializer so each field keeps the type it was
//! declared with: `i64` stays `BigInt`, `Uuid` arrives as raw bytes and becomes
//! `Uuid`, and only values serialized through `collect_str` (chrono timestamps)
//! are parsed as timestamps. Plain strings are always `Text`. Nested sequences,
//! maps and structs become `Json`.

use crate::errors::TypeMappingError;
use crate::types::{Row, SqlValue};
use serde::de::DeserializeOwned;
use serde::ser::{self, Impossible, Serialize};
use serde_json::{Map, Value};
use std::fmt::Display;
use uuid::Uuid;

/// Serialize an entity into column/value pairs
pub fn to_row<T: Serialize + ?Sized>(data: &T) -> Result<Row, TypeMappingError> {
    data.serialize(RowSerializer)
}

/// Rebuild an entity from a row
pub fn from_row<T: DeserializeOwned>(row: &Row) -> Result<T, TypeMappingError> {
    let object: Map<String, Value> = row
        .iter()
        .map(|(column, value)| (column.clone(), value.to_json()))
        .collect();

    Ok(serde_json::from_value(Value::Object(object))?)
}

impl ser::Error for TypeMappingError {
    fn custom<T: Display>(msg: T) -> Self {
        TypeMappingError::Custom(msg.to_string())
    }
}

macro_rules! reject {
    ($kind:literal => $($method:ident($ty:ty)),* $(,)?) => {
        $(
            fn $method(self, _: $ty) -> Result<Row, TypeMappingError> {
                Err(TypeMappingError::NotAnObject($kind))
            }
        )*
    };
}

/// Accepts only structs and maps; every field goes through [`ValueSerializer`]
struct RowSerializer;

impl ser::Serializer for RowSerializer {
    type Ok = Row;
    type Error = TypeMappingError;
    type SerializeSeq = Impossible<Row, TypeMappingError>;
    type SerializeTuple = Impossible<Row, TypeMappingError>;
    type SerializeTupleStruct = Impossible<Row, TypeMappingError>;
    type SerializeTupleVariant = Impossible<Row, TypeMappingError>;
    type SerializeMap = RowBuilder;
    type SerializeStruct = RowBuilder;
    type SerializeStructVariant = Impossible<Row, TypeMappingError>;

    reject!("scalar" =>
        serialize_bool(bool),
        serialize_i8(i8),
        serialize_i16(i16),
        serialize_i32(i32),
        serialize_i64(i64),
        serialize_u8(u8),
        serialize_u16(u16),
        serialize_u32(u32),
        serialize_u64(u64),
        serialize_f32(f32),
        serialize_f64(f64),
        serialize_char(char),
        serialize_str(&str),
        serialize_bytes(&[u8]),
    );

    reject!("null" => serialize_unit_struct(&'static str));

    fn serialize_none(self) -> Result<Row, TypeMappingError> {
        Err(TypeMappingError::NotAnObject("null"))
    }

    fn serialize_some<T>(self, value: &T) -> Result<Row, TypeMappingError>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Row, TypeMappingError> {
        Err(TypeMappingError::NotAnObject("null"))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
    ) -> Result<Row, TypeMappingError> {
        Err(TypeMappingError::NotAnObject("enum"))
    }

    fn serialize_newtype_struct<T>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Row, TypeMappingError>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<Row, TypeMappingError>
    where
        T: ?Sized + Serialize,
    {
        Err(TypeMappingError::NotAnObject("enum"))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, TypeMappingError> {
        Err(TypeMappingError::NotAnObject("array"))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, TypeMappingError> {
        Err(TypeMappingError::NotAnObject("array"))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, TypeMappingError> {
        Err(TypeMappingError::NotAnObject("array"))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, TypeMappingError> {
        Err(TypeMappingError::NotAnObject("enum"))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, TypeMappingError> {
        Ok(RowBuilder::default())
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, TypeMappingError> {
        Ok(RowBuilder::default())
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, TypeMappingError> {
        Err(TypeMappingError::NotAnObject("enum"))
    }
}

#[derive(Default)]
struct RowBuilder {
    row: Row,
    key: Option<String>,
}

impl ser::SerializeStruct for RowBuilder {
    type Ok = Row;
    type Error = TypeMappingError;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<(), TypeMappingError>
    where
        T: ?Sized + Serialize,
    {
        self.row
            .insert(key.to_string(), value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Row, TypeMappingError> {
        Ok(self.row)
    }
}

impl ser::SerializeMap for RowBuilder {
    type Ok = Row;
    type Error = TypeMappingError;

    fn serialize_key<T>(&mut self, key: &T) -> Result<(), TypeMappingError>
    where
        T: ?Sized + Serialize,
    {
        self.key = Some(key_string(key)?);
        Ok(())
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<(), TypeMappingError>
    where
        T: ?Sized + Serialize,
    {
        let key = self
            .key
            .take()
            .ok_or_else(|| <TypeMappingError as ser::Error>::custom("map value before key"))?;
        self.row.insert(key, value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Row, TypeMappingError> {
        Ok(self.row)
    }
}

/// Maps one field onto the scalar matching its Rust type
struct ValueSerializer;

impl ser::Serializer for ValueSerializer {
    type Ok = SqlValue;
    type Error = TypeMappingError;
    type SerializeSeq = JsonArray;
    type SerializeTuple = JsonArray;
    type SerializeTupleStruct = JsonArray;
    type SerializeTupleVariant = JsonArray;
    type SerializeMap = JsonObject;
    type SerializeStruct = JsonObject;
    type SerializeStructVariant = JsonObject;

    // Uuid serializes to its 16 raw bytes instead of a string
    fn is_human_readable(&self) -> bool {
        false
    }

    fn serialize_bool(self, v: bool) -> Result<SqlValue, TypeMappingError> {
        Ok(SqlValue::Boolean(v))
    }

    fn serialize_i8(self, v: i8) -> Result<SqlValue, TypeMappingError> {
        Ok(SqlValue::SmallInt(i16::from(v)))
    }

    fn serialize_i16(self, v: i16) -> Result<SqlValue, TypeMappingError> {
        Ok(SqlValue::SmallInt(v))
    }

    fn serialize_i32(self, v: i32) -> Result<SqlValue, TypeMappingError> {
        Ok(SqlValue::Integer(v))
    }

    fn serialize_i64(self, v: i64) -> Result<SqlValue, TypeMappingError> {
        Ok(SqlValue::BigInt(v))
    }

    fn serialize_i128(self, v: i128) -> Result<SqlValue, TypeMappingError> {
        Ok(i64::try_from(v)
            .map(SqlValue::BigInt)
            .unwrap_or_else(|_| SqlValue::Decimal(v.to_string())))
    }

    fn serialize_u8(self, v: u8) -> Result<SqlValue, TypeMappingError> {
        Ok(SqlValue::SmallInt(i16::from(v)))
    }

    fn serialize_u16(self, v: u16) -> Result<SqlValue, TypeMappingError> {
        Ok(SqlValue::Integer(i32::from(v)))
    }

    fn serialize_u32(self, v: u32) -> Result<SqlValue, TypeMappingError> {
        Ok(SqlValue::BigInt(i64::from(v)))
    }

    fn serialize_u64(self, v: u64) -> Result<SqlValue, TypeMappingError> {
        Ok(i64::try_from(v)
            .map(SqlValue::BigInt)
            .unwrap_or_else(|_| SqlValue::Decimal(v.to_string())))
    }

    fn serialize_u128(self, v: u128) -> Result<SqlValue, TypeMappingError> {
        Ok(i64::try_from(v)
            .map(SqlValue::BigInt)
            .unwrap_or_else(|_| SqlValue::Decimal(v.to_string())))
    }

    fn serialize_f32(self, v: f32) -> Result<SqlValue, TypeMappingError> {
        Ok(SqlValue::Float(f64::from(v)))
    }

    fn serialize_f64(self, v: f64) -> Result<SqlValue, TypeMappingError> {
        Ok(SqlValue::Float(v))
    }

    fn serialize_char(self, v: char) -> Result<SqlValue, TypeMappingError> {
        Ok(SqlValue::Text(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<SqlValue, TypeMappingError> {
        Ok(SqlValue::Text(v.to_string()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<SqlValue, TypeMappingError> {
        Ok(Uuid::from_slice(v)
            .map(SqlValue::Uuid)
            .unwrap_or_else(|_| SqlValue::Json(Value::from(v.to_vec()))))
    }

    fn serialize_none(self) -> Result<SqlValue, TypeMappingError> {
        Ok(SqlValue::Null)
    }

    fn serialize_some<T>(self, value: &T) -> Result<SqlValue, TypeMappingError>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<SqlValue, TypeMappingError> {
        Ok(SqlValue::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<SqlValue, TypeMappingError> {
        Ok(SqlValue::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<SqlValue, TypeMappingError> {
        Ok(SqlValue::Text(variant.to_string()))
    }

    fn serialize_newtype_struct<T>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<SqlValue, TypeMappingError>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<SqlValue, TypeMappingError>
    where
        T: ?Sized + Serialize,
    {
        Ok(SqlValue::Json(tagged(
            Some(variant),
            serde_json::to_value(value)?,
        )))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<JsonArray, TypeMappingError> {
        Ok(JsonArray::new(None, len.unwrap_or(0)))
    }

    fn serialize_tuple(self, len: usize) -> Result<JsonArray, TypeMappingError> {
        Ok(JsonArray::new(None, len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<JsonArray, TypeMappingError> {
        Ok(JsonArray::new(None, len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<JsonArray, TypeMappingError> {
        Ok(JsonArray::new(Some(variant), len))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<JsonObject, TypeMappingError> {
        Ok(JsonObject::new(None))
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<JsonObject, TypeMappingError> {
        Ok(JsonObject::new(None))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<JsonObject, TypeMappingError> {
        Ok(JsonObject::new(Some(variant)))
    }

    // chrono timestamps come through here; plain strings use serialize_str
    fn collect_str<T>(self, value: &T) -> Result<SqlValue, TypeMappingError>
    where
        T: ?Sized + Display,
    {
        let text = value.to_string();
        Ok(match chrono::DateTime::parse_from_rfc3339(&text) {
            Ok(ts) => SqlValue::Timestamp(ts.with_timezone(&chrono::Utc)),
            Err(_) => SqlValue::Text(text),
        })
    }
}

/// Externally tagged enum shape, matching serde_json
fn tagged(variant: Option<&'static str>, value: Value) -> Value {
    match variant {
        Some(variant) => {
            let mut object = Map::new();
            object.insert(variant.to_string(), value);
            Value::Object(object)
        }
        None => value,
    }
}

fn key_string<T: ?Sized + Serialize>(key: &T) -> Result<String, TypeMappingError> {
    match serde_json::to_value(key)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(TypeMappingError::NonStringKey),
    }
}

struct JsonArray {
    variant: Option<&'static str>,
    items: Vec<Value>,
}

impl JsonArray {
    fn new(variant: Option<&'static str>, len: usize) -> Self {
        Self {
            variant,
            items: Vec::with_capacity(len),
        }
    }

    fn push<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), TypeMappingError> {
        self.items.push(serde_json::to_value(value)?);
        Ok(())
    }

    fn finish(self) -> Result<SqlValue, TypeMappingError> {
        Ok(SqlValue::Json(tagged(self.variant, Value::Array(self.items))))
    }
}

impl ser::SerializeSeq for JsonArray {
    type Ok = SqlValue;
    type Error = TypeMappingError;

    fn serialize_element<T>(&mut self, value: &T) -> Result<(), TypeMappingError>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<SqlValue, TypeMappingError> {
        self.finish()
    }
}

impl ser::SerializeTuple for JsonArray {
    type Ok = SqlValue;
    type Error = TypeMappingError;

    fn serialize_element<T>(&mut self, value: &T) -> Result<(), TypeMappingError>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<SqlValue, TypeMappingError> {
        self.finish()
    }
}

impl ser::SerializeTupleStruct for JsonArray {
    type Ok = SqlValue;
    type Error = TypeMappingError;

    fn serialize_field<T>(&mut self, value: &T) -> Result<(), TypeMappingError>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<SqlValue, TypeMappingError> {
        self.finish()
    }
}

impl ser::SerializeTupleVariant for JsonArray {
    type Ok = SqlValue;
    type Error = TypeMappingError;

    fn serialize_field<T>(&mut self, value: &T) -> Result<(), TypeMappingError>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<SqlValue, TypeMappingError> {
        self.finish()
    }
}

struct JsonObject {
    variant: Option<&'static str>,
    fields: Map<String, Value>,
    key: Option<String>,
}

impl JsonObject {
    fn new(variant: Option<&'static str>) -> Self {
        Self {
            variant,
            fields: Map::new(),
            key: None,
        }
    }

    fn insert<T: ?Sized + Serialize>(
        &mut self,
        key: String,
        value: &T,
    ) -> Result<(), TypeMappingError> {
        self.fields.insert(key, serde_json::to_value(value)?);
        Ok(())
    }

    fn finish(self) -> Result<SqlValue, TypeMappingError> {
        Ok(SqlValue::Json(tagged(self.variant, Value::Object(self.fields))))
    }
}

impl ser::SerializeMap for JsonObject {
    type Ok = SqlValue;
    type Error = TypeMappingError;

    fn serialize_key<T>(&mut self, key: &T) -> Result<(), TypeMappingError>
    where
        T: ?Sized + Serialize,
    {
        self.key = Some(key_string(key)?);
        Ok(())
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<(), TypeMappingError>
    where
        T: ?Sized + Serialize,
    {
        let key = self
            .key
            .take()
            .ok_or_else(|| <TypeMappingError as ser::Error>::custom("map value before key"))?;
        self.insert(key, value)
    }

    fn end(self) -> Result<SqlValue, TypeMappingError> {
        self.finish()
    }
}

impl ser::SerializeStruct for JsonObject {
    type Ok = SqlValue;
    type Error = TypeMappingError;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<(), TypeMappingError>
    where
        T: ?Sized + Serialize,
    {
        self.insert(key.to_string(), value)
    }

    fn end(self) -> Result<SqlValue, TypeMappingError> {
        self.finish()
    }
}

impl ser::SerializeStructVariant for JsonObject {
    type Ok = SqlValue;
    type Error = TypeMappingError;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<(), TypeMappingError>
    where
        T: ?Sized + Serialize,
    {
        self.insert(key.to_string(), value)
    }

    fn end(self) -> Result<SqlValue, TypeMappingError> {
        self.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use std::collections::BTreeMap;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Account {
        id: i64,
        name: String,
        nickname: Option<String>,
        balance: f64,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Ticket {
        id: Uuid,
        owner: Option<Uuid>,
        note: String,
        opened_at: DateTime<Utc>,
        priority: i32,
        tags: Vec<String>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    enum Status {
        Open,
        Closed,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Flagged {
        status: Status,
        level: u8,
    }

    fn ticket() -> Ticket {
        Ticket {
            id: Uuid::nil(),
            owner: Some(Uuid::from_u128(7)),
            note: "2024-01-01T00:00:00Z".to_string(),
            opened_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
            priority: 2,
            tags: vec!["a".to_string()],
        }
    }

    #[test]
    fn test_to_row_extracts_fields() {
        let account = Account {
            id: 1,
            name: "x".to_string(),
            nickname: None,
            balance: 2.5,
        };

        let row = to_row(&account).unwrap();
        assert_eq!(row.get("id"), Some(&SqlValue::BigInt(1)));
        assert_eq!(row.get("name"), Some(&SqlValue::Text("x".to_string())));
        assert_eq!(row.get("nickname"), Some(&SqlValue::Null));
        assert_eq!(row.get("balance"), Some(&SqlValue::Float(2.5)));
    }

    #[test]
    fn test_uuid_fields_stay_uuid() {
        let row = to_row(&ticket()).unwrap();
        assert_eq!(row.get("id"), Some(&SqlValue::Uuid(Uuid::nil())));
        assert_eq!(row.get("owner"), Some(&SqlValue::Uuid(Uuid::from_u128(7))));
    }

    #[test]
    fn test_timestamp_shaped_strings_stay_text() {
        let row = to_row(&ticket()).unwrap();
        assert_eq!(
            row.get("note"),
            Some(&SqlValue::Text("2024-01-01T00:00:00Z".to_string()))
        );
        assert_eq!(
            row.get("opened_at"),
            Some(&SqlValue::Timestamp(
                Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
            ))
        );
    }

    #[test]
    fn test_integer_widths_are_kept() {
        let row = to_row(&ticket()).unwrap();
        assert_eq!(row.get("priority"), Some(&SqlValue::Integer(2)));

        let row = to_row(&Flagged {
            status: Status::Closed,
            level: 3,
        })
        .unwrap();
        assert_eq!(row.get("level"), Some(&SqlValue::SmallInt(3)));
        assert_eq!(row.get("status"), Some(&SqlValue::Text("Closed".to_string())));
    }

    #[test]
    fn test_nested_values_become_json() {
        let row = to_row(&ticket()).unwrap();
        assert_eq!(row.get("tags"), Some(&SqlValue::Json(json!(["a"]))));

        let mut map = BTreeMap::new();
        map.insert("meta", BTreeMap::from([("k", 1)]));
        let row = to_row(&map).unwrap();
        assert_eq!(row.get("meta"), Some(&SqlValue::Json(json!({"k": 1}))));
    }

    #[test]
    fn test_row_round_trip_preserves_typed_fields() {
        let original = ticket();
        let rebuilt: Ticket = from_row(&to_row(&original).unwrap()).unwrap();
        assert_eq!(rebuilt, original);

        let flagged = Flagged {
            status: Status::Open,
            level: 1,
        };
        let rebuilt: Flagged = from_row(&to_row(&flagged).unwrap()).unwrap();
        assert_eq!(rebuilt, flagged);
    }

    #[test]
    fn test_from_row_rebuilds_entity() {
        let mut row = Row::new();
        row.insert("id".to_string(), SqlValue::BigInt(9));
        row.insert("name".to_string(), SqlValue::Text("y".to_string()));
        row.insert("nickname".to_string(), SqlValue::Null);
        row.insert("balance".to_string(), SqlValue::Float(0.0));

        let account: Account = from_row(&row).unwrap();
        assert_eq!(account.id, 9);
        assert_eq!(account.name, "y");
        assert_eq!(account.nickname, None);
    }

    #[test]
    fn test_to_row_rejects_non_objects() {
        assert!(matches!(
            to_row(&42),
            Err(TypeMappingError::NotAnObject("scalar"))
        ));
        assert!(matches!(
            to_row(&vec![1, 2]),
            Err(TypeMappingError::NotAnObject("array"))
        ));
        assert!(matches!(
            to_row(&None::<Account>),
            Err(TypeMappingError::NotAnObject("null"))
        ));
        assert!(matches!(
            to_row(&Status::Open),
            Err(TypeMappingError::NotAnObject("enum"))
        ));
    }

    #[test]
    fn test_from_row_reports_missing_fields() {
        let row = Row::new();
        let result: Result<Account, _> = from_row(&row);
        assert!(matches!(result, Err(TypeMappingError::Serialization(_))));
    }
}
