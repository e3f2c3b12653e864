//! Subject rules. Names are normalized and unique by exact match.

use serde_json::Value;
use uuid::Uuid;

use crate::{
  entity::{Entity, Request, parse_uuid},
  error::{Rejection, RejectionKind, Result},
  normalize,
  rules::{Context, text_field},
  store::Transaction,
  validate,
};

const NAME_MAX: usize = 100;

/// Normalize the payload's `name` and check it is non-empty and short
/// enough. Returns the normalized name.
fn normalized_name(req: &Request) -> Result<String, Rejection> {
  let name = normalize::name(&text_field(&req.data, "name")?);
  if name.is_empty() {
    return Err(
      Rejection::new(RejectionKind::EmptyField, "name cannot be empty.")
        .with_target("name"),
    );
  }
  if name.chars().count() > NAME_MAX {
    return Err(
      Rejection::new(
        RejectionKind::TooLong,
        format!("name cannot exceed {NAME_MAX} characters."),
      )
      .with_target("name"),
    );
  }
  Ok(name)
}

/// Reject if a subject other than `own` already carries `name`.
async fn check_unique<T: Transaction>(
  cx: &Context<'_, T>,
  name: &str,
  own: Option<Uuid>,
) -> Result<()> {
  let dup = cx
    .find(Entity::Subject, &["id"], &[("name", Value::String(name.to_owned()))])
    .await?;
  let taken = dup.is_some_and(|row| {
    own.is_none() || row.get("id").and_then(parse_uuid) != own
  });
  if taken {
    return Err(
      Rejection::new(
        RejectionKind::DuplicateKey,
        "A subject with that name already exists.",
      )
      .with_target("name")
      .with_code("SUBJECT_DUPLICATE")
      .into(),
    );
  }
  Ok(())
}

// ─── CREATE ──────────────────────────────────────────────────────────────────

pub async fn create<T: Transaction>(
  cx: &Context<'_, T>,
  req: &mut Request,
) -> Result<()> {
  // Blank names pass here and fail as empty once normalized.
  if matches!(req.data.get("name"), None | Some(Value::Null)) {
    return Err(
      Rejection {
        missing: vec!["name".to_owned()],
        ..Rejection::new(RejectionKind::MissingFields, "name is required.")
          .with_target("name")
          .with_code("MISSING_FIELDS")
      }
      .into(),
    );
  }

  let name = normalized_name(req)?;
  check_unique(cx, &name, None).await?;
  req.data.insert("name".into(), Value::String(name));
  Ok(())
}

// ─── UPDATE ──────────────────────────────────────────────────────────────────

pub async fn update<T: Transaction>(
  cx: &Context<'_, T>,
  req: &mut Request,
) -> Result<()> {
  let id = req.target_id()?;
  cx.find_by_id(Entity::Subject, &["id", "name"], id)
    .await?
    .ok_or_else(|| Rejection::not_found("Subject"))?;

  if validate::supplied(&req.data, "name") {
    let name = normalized_name(req)?;
    check_unique(cx, &name, Some(id)).await?;
    req.data.insert("name".into(), Value::String(name));
  }
  Ok(())
}

// ─── DELETE ──────────────────────────────────────────────────────────────────

pub async fn delete<T: Transaction>(
  cx: &Context<'_, T>,
  req: &mut Request,
) -> Result<()> {
  let id = req.target_id()?;
  cx.find_by_id(Entity::Subject, &["id"], id)
    .await?
    .ok_or_else(|| Rejection::not_found("Subject"))?;

  if cx.referenced_by(Entity::PlanSubject, "subject_id", id).await? {
    return Err(
      Rejection::new(
        RejectionKind::InUse,
        "Cannot delete: the subject is used in at least one plan.",
      )
      .with_code("SUBJECT_IN_USE")
      .into(),
    );
  }
  Ok(())
}
