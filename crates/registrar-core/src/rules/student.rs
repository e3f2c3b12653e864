//! Student rules. The identity number is the natural key.

use crate::{
  entity::{Entity, Request},
  error::Result,
  rules::{Context, PersonKey, create_person, update_person},
  store::Transaction,
};

const KEY: PersonKey = PersonKey {
  entity:   Entity::Student,
  field:    "identity_number",
  label:    "identity number",
  code:     "IDENTITY_NUMBER_EXISTS",
  required: &["identity_number", "first_name", "last_name"],
};

/// Normalize the identity number and refuse a second student with the same
/// normalized number.
pub async fn create<T: Transaction>(
  cx: &Context<'_, T>,
  req: &mut Request,
) -> Result<()> {
  create_person(cx, req, &KEY).await
}

/// Re-normalize a supplied identity number and refuse one held by another student.
pub async fn update<T: Transaction>(
  cx: &Context<'_, T>,
  req: &mut Request,
) -> Result<()> {
  update_person(cx, req, &KEY).await
}
