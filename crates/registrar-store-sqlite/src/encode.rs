//! Conversion between JSON record values and SQLite column values.
//!
//! Scalars map onto their native SQLite storage classes. Booleans are stored
//! as 0/1; nested arrays and objects as compact JSON text. UUIDs are stored as
//! hyphenated lowercase strings.

use rusqlite::types::{Value as SqlValue, ValueRef};
use serde_json::{Number, Value};
use uuid::Uuid;

use registrar_core::entity::{Entity, Record};

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

// ─── Values ──────────────────────────────────────────────────────────────────

pub fn encode_value(value: &Value) -> Result<SqlValue> {
  Ok(match value {
    Value::Null => SqlValue::Null,
    Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
    Value::Number(n) => match n.as_i64() {
      Some(i) => SqlValue::Integer(i),
      None => SqlValue::Real(n.as_f64().unwrap_or_default()),
    },
    Value::String(s) => SqlValue::Text(s.clone()),
    nested @ (Value::Array(_) | Value::Object(_)) => {
      SqlValue::Text(serde_json::to_string(nested)?)
    }
  })
}

pub fn decode_value(value: ValueRef<'_>) -> Value {
  match value {
    ValueRef::Null => Value::Null,
    ValueRef::Integer(i) => Value::from(i),
    ValueRef::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
    ValueRef::Text(t) | ValueRef::Blob(t) => {
      Value::String(String::from_utf8_lossy(t).into_owned())
    }
  }
}

// ─── Rows ────────────────────────────────────────────────────────────────────

/// Read the projected `columns` of `row` back into a record.
pub fn decode_row(row: &rusqlite::Row<'_>, columns: &[String]) -> rusqlite::Result<Record> {
  let mut record = Record::new();
  for (i, column) in columns.iter().enumerate() {
    record.insert(column.clone(), decode_value(row.get_ref(i)?));
  }
  Ok(record)
}

/// Check every name in `columns` against the entity's declared columns and
/// return owned copies suitable for moving into a connection closure.
pub fn checked_columns<'a>(
  entity: Entity,
  columns: impl IntoIterator<Item = &'a str>,
) -> Result<Vec<String>> {
  columns
    .into_iter()
    .map(|c| {
      if entity.has_column(c) {
        Ok(c.to_owned())
      } else {
        Err(Error::UnknownColumn { table: entity.table(), column: c.to_owned() })
      }
    })
    .collect()
}
