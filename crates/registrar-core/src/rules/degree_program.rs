//! Degree program rules.
//!
//! The code is the natural key: upper-cased, free of whitespace, unique, and
//! fixed once created. A program referenced by any plan cannot be deleted.

use serde_json::Value;

use crate::{
  entity::{Entity, Request},
  error::{Rejection, RejectionKind, Result},
  normalize,
  rules::{Context, immutable, text_field},
  store::Transaction,
  validate,
};

const CODE_MAX: usize = 10;
const NAME_MAX: usize = 120;

fn check_code(code: &str) -> Result<(), Rejection> {
  let len = code.chars().count();
  let well_formed = code
    .chars()
    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-'));

  if (1..=CODE_MAX).contains(&len) && well_formed {
    return Ok(());
  }
  Err(
    Rejection::new(
      RejectionKind::InvalidFormat,
      format!(
        "code must be 1 to {CODE_MAX} characters of uppercase letters, digits, '.', '_' or '-'."
      ),
    )
    .with_target("code")
    .with_code("PROGRAM_CODE_INVALID"),
  )
}

/// Normalize `name` in the payload and check its length.
fn normalize_name(req: &mut Request) -> Result<(), Rejection> {
  let name = normalize::name(&text_field(&req.data, "name")?);
  let len = name.chars().count();
  if len == 0 {
    return Err(
      Rejection::new(RejectionKind::EmptyField, "name cannot be empty.")
        .with_target("name"),
    );
  }
  if len > NAME_MAX {
    return Err(
      Rejection::new(
        RejectionKind::TooLong,
        format!("name cannot exceed {NAME_MAX} characters."),
      )
      .with_target("name"),
    );
  }
  req.data.insert("name".into(), Value::String(name));
  Ok(())
}

// ─── CREATE ──────────────────────────────────────────────────────────────────

pub async fn create<T: Transaction>(
  cx: &Context<'_, T>,
  req: &mut Request,
) -> Result<()> {
  validate::required(&req.data, &["code", "name", "program_type"])?;

  let code = normalize::code(&text_field(&req.data, "code")?);
  req.data.insert("code".into(), Value::String(code.clone()));
  check_code(&code)?;
  normalize_name(req)?;

  let dup = cx
    .find(Entity::DegreeProgram, &["id"], &[("code", Value::String(code.clone()))])
    .await?;
  if dup.is_some() {
    return Err(
      Rejection::new(
        RejectionKind::DuplicateKey,
        format!("A degree program with code {code} already exists."),
      )
      .with_target("code")
      .with_code("PROGRAM_CODE_EXISTS")
      .into(),
    );
  }
  Ok(())
}

// ─── UPDATE ──────────────────────────────────────────────────────────────────

/// The code may be resent but not changed. A new name is re-normalized;
/// name uniqueness is not checked here.
pub async fn update<T: Transaction>(
  cx: &Context<'_, T>,
  req: &mut Request,
) -> Result<()> {
  let id = req.target_id()?;
  let current = cx
    .find_by_id(Entity::DegreeProgram, &["id", "code"], id)
    .await?
    .ok_or_else(|| Rejection::not_found("Degree program"))?;

  if validate::supplied(&req.data, "code") {
    let incoming = normalize::code(&text_field(&req.data, "code")?);
    if current.get("code").and_then(Value::as_str) != Some(incoming.as_str()) {
      return Err(immutable("code", "degree program code").into());
    }
    req.data.insert("code".into(), Value::String(incoming));
  }

  if validate::supplied(&req.data, "name") {
    normalize_name(req)?;
  }
  Ok(())
}

// ─── DELETE ──────────────────────────────────────────────────────────────────

pub async fn delete<T: Transaction>(
  cx: &Context<'_, T>,
  req: &mut Request,
) -> Result<()> {
  let id = req.target_id()?;
  cx.find_by_id(Entity::DegreeProgram, &["id"], id)
    .await?
    .ok_or_else(|| Rejection::not_found("Degree program"))?;

  if cx.referenced_by(Entity::ProgramPlan, "program_id", id).await? {
    return Err(
      Rejection::new(
        RejectionKind::InUse,
        "Cannot delete: the degree program has plans.",
      )
      .with_code("PROGRAM_IN_USE")
      .into(),
    );
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use serde_json::json;
  use uuid::Uuid;

  use super::*;
  use crate::{
    entity::{Record, TargetId},
    rules::memory::MemoryTx,
    store::Transaction as _,
  };

  fn data(v: Value) -> Record { v.as_object().cloned().unwrap() }

  fn kind(err: crate::Error) -> RejectionKind { err.rejection().unwrap().kind }

  #[tokio::test]
  async fn create_normalizes_code_and_name() {
    let tx = MemoryTx::default();
    let cx = Context { tx: &tx, current_year: 2026 };
    let mut req = Request::create(
      Entity::DegreeProgram,
      data(json!({ "code": " ing sis ", "name": "  Systems   Engineering ", "program_type": "Undergraduate" })),
    );

    create(&cx, &mut req).await.unwrap();
    assert_eq!(req.data["code"], "INGSIS");
    assert_eq!(req.data["name"], "Systems Engineering");
  }

  #[tokio::test]
  async fn create_rejects_bad_codes() {
    let tx = MemoryTx::default();
    let cx = Context { tx: &tx, current_year: 2026 };
    for code in ["ABCDEFGHIJK", "ING/SIS", "ÁB"] {
      let mut req = Request::create(
        Entity::DegreeProgram,
        data(json!({ "code": code, "name": "N", "program_type": "Graduate" })),
      );
      let err = create(&cx, &mut req).await.unwrap_err();
      assert_eq!(kind(err), RejectionKind::InvalidFormat, "{code}");
    }
  }

  #[tokio::test]
  async fn create_rejects_long_names() {
    let tx = MemoryTx::default();
    let cx = Context { tx: &tx, current_year: 2026 };
    let mut req = Request::create(
      Entity::DegreeProgram,
      data(json!({ "code": "X", "name": "n".repeat(121), "program_type": "Graduate" })),
    );
    assert_eq!(kind(create(&cx, &mut req).await.unwrap_err()), RejectionKind::TooLong);
  }

  #[tokio::test]
  async fn create_rejects_duplicate_code_case_insensitively() {
    let tx = MemoryTx::default();
    tx.program("LIC-MAT");
    let cx = Context { tx: &tx, current_year: 2026 };
    let mut req = Request::create(
      Entity::DegreeProgram,
      data(json!({ "code": "lic-mat", "name": "Math", "program_type": "Graduate" })),
    );

    let err = create(&cx, &mut req).await.unwrap_err();
    let r = err.rejection().unwrap();
    assert_eq!(r.kind, RejectionKind::DuplicateKey);
    assert_eq!(r.code, Some("PROGRAM_CODE_EXISTS"));
  }

  #[tokio::test]
  async fn update_keeps_code_fixed() {
    let tx = MemoryTx::default();
    let id = tx.program("ING");
    let cx = Context { tx: &tx, current_year: 2026 };

    let mut same = Request::update(
      Entity::DegreeProgram,
      Some(TargetId::ByPath(id)),
      data(json!({ "code": " ing ", "name": " New  name " })),
    );
    update(&cx, &mut same).await.unwrap();
    assert_eq!(same.data["code"], "ING");
    assert_eq!(same.data["name"], "New name");

    let mut changed = Request::update(
      Entity::DegreeProgram,
      Some(TargetId::ByPath(id)),
      data(json!({ "code": "MED" })),
    );
    let err = update(&cx, &mut changed).await.unwrap_err();
    assert_eq!(kind(err), RejectionKind::ImmutableField);
  }

  #[tokio::test]
  async fn update_missing_program_is_not_found() {
    let tx = MemoryTx::default();
    let cx = Context { tx: &tx, current_year: 2026 };
    let mut req = Request::update(
      Entity::DegreeProgram,
      Some(TargetId::ByBody(Uuid::new_v4())),
      Record::new(),
    );
    let err = update(&cx, &mut req).await.unwrap_err();
    assert_eq!(err.rejection().unwrap().status(), 404);
  }

  #[tokio::test]
  async fn delete_blocked_while_a_plan_references_it() {
    let tx = MemoryTx::default();
    let program = tx.program("ING");
    let plan = tx.plan(program, 2024, 5, "Draft");
    let cx = Context { tx: &tx, current_year: 2026 };

    let mut req = Request::delete(Entity::DegreeProgram, Some(TargetId::ByPath(program)));
    let err = delete(&cx, &mut req).await.unwrap_err();
    assert_eq!(kind(err), RejectionKind::InUse);

    tx.delete(Entity::ProgramPlan, plan).await.unwrap();
    delete(&cx, &mut req).await.unwrap();
  }

  #[tokio::test]
  async fn delete_without_target_is_missing_id() {
    let tx = MemoryTx::default();
    let cx = Context { tx: &tx, current_year: 2026 };
    let mut req = Request::delete(Entity::DegreeProgram, None);
    let err = delete(&cx, &mut req).await.unwrap_err();
    assert_eq!(kind(err), RejectionKind::MissingFields);
  }
}
