//! Teacher rules. Mirror the student rules over the staff
//! number.

use crate::{
  entity::{Entity, Request},
  error::Result,
  rules::{Context, PersonKey, create_person, update_person},
  store::Transaction,
};

const KEY: PersonKey = PersonKey {
  entity:   Entity::Teacher,
  field:    "staff_number",
  label:    "staff number",
  code:     "STAFF_NUMBER_EXISTS",
  required: &["staff_number", "first_name", "last_name", "email"],
};

pub async fn create<T: Transaction>(
  cx: &Context<'_, T>,
  req: &mut Request,
) -> Result<()> {
  create_person(cx, req, &KEY).await
}

/// Re-normalize a supplied staff number and refuse one held by another teacher.
pub async fn update<T: Transaction>(
  cx: &Context<'_, T>,
  req: &mut Request,
) -> Result<()> {
  update_person(cx, req, &KEY).await
}
