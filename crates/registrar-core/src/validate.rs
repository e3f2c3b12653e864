//! Field-level checks shared by every rule set.

use serde_json::Value;

use crate::{
  entity::Record,
  error::{Rejection, RejectionKind},
};

/// Reject with `MissingFields` if any of `fields` is absent, null, or blank
/// once rendered as text. The rejection lists every missing field and
/// targets the first.
pub fn required(data: &Record, fields: &[&str]) -> Result<(), Rejection> {
  let missing: Vec<String> = fields
    .iter()
    .filter(|f| is_blank(data.get(**f)))
    .map(|f| (*f).to_owned())
    .collect();

  if missing.is_empty() {
    return Ok(());
  }

  Err(Rejection {
    target: Some(missing[0].clone()),
    missing: missing.clone(),
    ..Rejection::new(
      RejectionKind::MissingFields,
      format!("Missing required fields: {}", missing.join(", ")),
    )
    .with_code("MISSING_FIELDS")
  })
}

fn is_blank(value: Option<&Value>) -> bool {
  match value {
    None | Some(Value::Null) => true,
    Some(Value::String(s)) => s.trim().is_empty(),
    Some(_) => false,
  }
}

/// Render a scalar payload value as text; numbers and booleans use their JSON
/// form. Arrays and objects have no text form.
pub fn text(value: &Value) -> Option<String> {
  match value {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    _ => None,
  }
}

/// An integral number within `[min, max]`, or `None`.
pub fn int_in_range(value: Option<&Value>, min: i64, max: i64) -> Option<i64> {
  value.and_then(integral).filter(|n| (min..=max).contains(n))
}

/// A JSON number with no fractional part. `2024` and `2024.0` both qualify.
pub fn integral(value: &Value) -> Option<i64> {
  value.as_i64().or_else(|| {
    value
      .as_f64()
      .filter(|f| f.is_finite() && f.fract() == 0.0)
      .map(|f| f as i64)
  })
}

/// Reject `OutOfRange` unless `field` holds an integer in `[min, max]`.
pub fn range(
  data: &Record,
  field: &str,
  min: i64,
  max: i64,
) -> Result<i64, Rejection> {
  int_in_range(data.get(field), min, max).ok_or_else(|| {
    Rejection::new(
      RejectionKind::OutOfRange,
      format!("{field} must be a whole number between {min} and {max}."),
    )
    .with_target(field)
  })
}

/// Whether `field` is present in the payload at all (even if null).
pub fn supplied(data: &Record, field: &str) -> bool { data.contains_key(field) }
