//! Per-entity rule sets run before CREATE/UPDATE/DELETE.
//!
//! Each rule reads the pending change, issues read-only lookups through the
//! transaction it is handed, and either falls through (possibly having
//! normalized or defaulted the payload) or rejects. Checks run in a fixed
//! order and the first failure short-circuits.

pub mod degree_program;
pub mod plan_subject;
pub mod program_plan;
pub mod student;
pub mod subject;
pub mod teacher;

use serde_json::Value;
use uuid::Uuid;

use crate::{
  entity::{Entity, PlanState, Record, Request, id_value, parse_uuid},
  error::{Error, Rejection, RejectionKind, Result},
  normalize,
  store::Transaction,
  validate,
};

/// What a rule gets besides the request: the caller's transaction and the
/// clock reading it should use.
pub struct Context<'a, T> {
  pub tx:           &'a T,
  pub current_year: i32,
}

impl<T> Clone for Context<'_, T> {
  fn clone(&self) -> Self { *self }
}

impl<T> Copy for Context<'_, T> {}

impl<T: Transaction> Context<'_, T> {
  /// [`Transaction::query_one`] with the store error boxed.
  pub(crate) async fn find(
    &self,
    entity: Entity,
    columns: &[&str],
    filter: &[(&str, Value)],
  ) -> Result<Option<Record>> {
    self
      .tx
      .query_one(entity, columns, filter)
      .await
      .map_err(|e| Error::Store(Box::new(e)))
  }

  pub(crate) async fn find_by_id(
    &self,
    entity: Entity,
    columns: &[&str],
    id: Uuid,
  ) -> Result<Option<Record>> {
    self.find(entity, columns, &[("id", id_value(id))]).await
  }

  /// Whether any row of `entity` has `column` equal to `id`.
  pub(crate) async fn referenced_by(
    &self,
    entity: Entity,
    column: &str,
    id: Uuid,
  ) -> Result<bool> {
    Ok(self.find(entity, &["id"], &[(column, id_value(id))]).await?.is_some())
  }
}

// ─── People ──────────────────────────────────────────────────────────────────

/// The natural key of a person-like entity.
pub(crate) struct PersonKey {
  pub entity:   Entity,
  pub field:    &'static str,
  pub label:    &'static str,
  pub code:     &'static str,
  pub required: &'static [&'static str],
}

/// Shared CREATE rule for students and teachers: required fields, identifier
/// normalization in place, then a uniqueness gate on the normalized key.
pub(crate) async fn create_person<T: Transaction>(
  cx: &Context<'_, T>,
  req: &mut Request,
  key: &PersonKey,
) -> Result<()> {
  validate::required(&req.data, key.required)?;
  let value = normalize_person_key(req, key)?;
  check_person_key(cx, key, value, None).await
}

/// Shared UPDATE rule: the target must exist, required fields that are
/// supplied must not be blank, and a supplied key is normalized in place and
/// must not belong to another row.
pub(crate) async fn update_person<T: Transaction>(
  cx: &Context<'_, T>,
  req: &mut Request,
  key: &PersonKey,
) -> Result<()> {
  let id = req.target_id()?;
  cx.find_by_id(key.entity, &["id"], id)
    .await?
    .ok_or_else(|| Rejection::not_found(&key.entity.to_string()))?;

  let supplied: Vec<&str> = key
    .required
    .iter()
    .copied()
    .filter(|f| validate::supplied(&req.data, f))
    .collect();
  validate::required(&req.data, &supplied)?;

  if !validate::supplied(&req.data, key.field) {
    return Ok(());
  }
  let value = normalize_person_key(req, key)?;
  check_person_key(cx, key, value, Some(id)).await
}

fn normalize_person_key(req: &mut Request, key: &PersonKey) -> Result<String, Rejection> {
  let value = normalize::identifier(&text_field(&req.data, key.field)?);
  req
    .data
    .insert(key.field.to_owned(), Value::String(value.clone()));
  Ok(value)
}

/// Reject if a row other than `own` already carries the normalized key.
async fn check_person_key<T: Transaction>(
  cx: &Context<'_, T>,
  key: &PersonKey,
  value: String,
  own: Option<Uuid>,
) -> Result<()> {
  let existing = cx
    .find(key.entity, &["id"], &[(key.field, Value::String(value.clone()))])
    .await?;
  let taken = existing.is_some_and(|row| {
    own.is_none() || row.get("id").and_then(parse_uuid) != own
  });
  if taken {
    return Err(
      Rejection::new(
        RejectionKind::DuplicateKey,
        format!("A {} with {} {value} already exists.", key.entity, key.label),
      )
      .with_target(key.field)
      .with_code(key.code)
      .into(),
    );
  }
  Ok(())
}

// ─── Payload helpers ─────────────────────────────────────────────────────────

/// The text form of `field`, or `InvalidFormat` if it is not a scalar.
/// Absent and null read as the empty string.
pub(crate) fn text_field(data: &Record, field: &str) -> Result<String, Rejection> {
  match data.get(field) {
    None | Some(Value::Null) => Ok(String::new()),
    Some(v) => validate::text(v).ok_or_else(|| {
      Rejection::new(RejectionKind::InvalidFormat, format!("{field} must be text."))
        .with_target(field)
    }),
  }
}

/// Resolve a reference field to a UUID, writing the canonical form back into
/// the payload. A value that is not a UUID cannot name a row, so it reads
/// as `None`.
pub(crate) fn reference(data: &mut Record, field: &str) -> Option<Uuid> {
  let id = data.get(field).and_then(parse_uuid)?;
  data.insert(field.to_owned(), id_value(id));
  Some(id)
}

/// Whether an incoming reference names the same row as the stored one.
pub(crate) fn same_reference(incoming: &Value, current: Option<&Value>) -> bool {
  match (parse_uuid(incoming), current.and_then(parse_uuid)) {
    (Some(a), Some(b)) => a == b,
    _ => Some(incoming) == current,
  }
}

pub(crate) fn immutable(field: &str, what: &str) -> Rejection {
  Rejection::new(
    RejectionKind::ImmutableField,
    format!("The {what} cannot be changed. Delete and create it again."),
  )
  .with_target(field)
  .with_code("FIELD_IMMUTABLE")
}

/// The stored plan state; anything unrecognised is treated as not editable.
pub(crate) fn plan_state(plan: &Record) -> Option<PlanState> {
  plan.get("state").and_then(Value::as_str).and_then(PlanState::parse)
}

pub(crate) fn state_label(plan: &Record) -> String {
  match plan.get("state") {
    Some(Value::String(s)) => s.clone(),
    _ => "unknown".to_owned(),
  }
}

/// Set `field` to `value` when it is absent, null, or an empty string.
pub(crate) fn default_field(data: &mut Record, field: &str, value: &str) {
  let unset = match data.get(field) {
    None | Some(Value::Null) => true,
    Some(Value::String(s)) => s.is_empty(),
    Some(_) => false,
  };
  if unset {
    data.insert(field.to_owned(), Value::String(value.to_owned()));
  }
}

#[cfg(test)]
pub(crate) mod memory;
