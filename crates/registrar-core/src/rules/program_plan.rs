//! Program plan rules.
//!
//! A plan belongs to one degree program and is unique per (program, effective
//! year). It starts in `Draft`; outside `Draft` only its state may change, and
//! it can be deleted only while `Draft` and childless.

use serde_json::{Value, json};

use crate::{
  entity::{Entity, PlanState, Record, Request, id_value},
  error::{Rejection, RejectionKind, Result},
  rules::{Context, default_field, immutable, plan_state, reference, same_reference, state_label},
  store::Transaction,
  validate,
};

const FIRST_YEAR: i64 = 2000;
const MAX_DURATION: i64 = 10;

fn effective_year(data: &Record, current_year: i32) -> Result<i64, Rejection> {
  validate::range(data, "effective_year", FIRST_YEAR, i64::from(current_year) + 1)
    .map_err(|r| r.with_code("EFFECTIVE_YEAR_OUT_OF_RANGE"))
}

fn duration_years(data: &Record) -> Result<i64, Rejection> {
  validate::range(data, "duration_years", 1, MAX_DURATION)
    .map_err(|r| r.with_code("DURATION_OUT_OF_RANGE"))
}

fn duplicate_year() -> Rejection {
  Rejection::new(
    RejectionKind::DuplicateKey,
    "A plan for that degree program and effective year already exists.",
  )
  .with_target("effective_year")
  .with_code("PLAN_DUPLICATE_YEAR")
}

async fn year_taken<T: Transaction>(
  cx: &Context<'_, T>,
  program: &Value,
  year: i64,
) -> Result<bool> {
  let filter = [("program_id", program.clone()), ("effective_year", json!(year))];
  Ok(cx.find(Entity::ProgramPlan, &["id"], &filter).await?.is_some())
}

// ─── CREATE ──────────────────────────────────────────────────────────────────

pub async fn create<T: Transaction>(
  cx: &Context<'_, T>,
  req: &mut Request,
) -> Result<()> {
  validate::required(&req.data, &["program_id", "effective_year", "duration_years"])?;

  let program = match reference(&mut req.data, "program_id") {
    Some(id) => cx.find_by_id(Entity::DegreeProgram, &["id"], id).await?.map(|_| id),
    None => None,
  };
  let program = program.ok_or_else(|| {
    Rejection::new(RejectionKind::ParentNotFound, "Degree program not found.")
      .with_target("program_id")
      .with_code("PROGRAM_NOT_FOUND")
  })?;

  let year = effective_year(&req.data, cx.current_year)?;
  let duration = duration_years(&req.data)?;
  req.data.insert("effective_year".into(), json!(year));
  req.data.insert("duration_years".into(), json!(duration));

  if year_taken(cx, &id_value(program), year).await? {
    return Err(duplicate_year().into());
  }

  default_field(&mut req.data, "state", PlanState::Draft.as_str());
  Ok(())
}

// ─── UPDATE ──────────────────────────────────────────────────────────────────

/// Fields other than these are frozen once the plan leaves `Draft`.
const ALWAYS_EDITABLE: &[&str] = &["id", "state"];

pub async fn update<T: Transaction>(
  cx: &Context<'_, T>,
  req: &mut Request,
) -> Result<()> {
  let id = req.target_id()?;
  let current = cx
    .find_by_id(
      Entity::ProgramPlan,
      &["id", "program_id", "effective_year", "duration_years", "state"],
      id,
    )
    .await?
    .ok_or_else(|| Rejection::not_found("Program plan"))?;

  if plan_state(&current) != Some(PlanState::Draft) {
    let frozen = req.data.iter().find(|(field, value)| {
      !ALWAYS_EDITABLE.contains(&field.as_str())
        && !unchanged(field, value, current.get(field.as_str()))
    });
    if let Some((field, _)) = frozen {
      return Err(
        Rejection::new(
          RejectionKind::InvalidState,
          format!(
            "Cannot modify a plan in state {}; only its state may change.",
            state_label(&current)
          ),
        )
        .with_target(field.as_str())
        .with_code("PLAN_NOT_EDITABLE")
        .into(),
      );
    }
  }

  if let Some(incoming) = req.data.get("program_id")
    && !same_reference(incoming, current.get("program_id"))
  {
    return Err(immutable("program_id", "degree program of a plan").into());
  }
  // Stored ids are lower-case; a resent reference must match them byte for byte.
  reference(&mut req.data, "program_id");

  if validate::supplied(&req.data, "effective_year") {
    let year = effective_year(&req.data, cx.current_year)?;
    req.data.insert("effective_year".into(), json!(year));
    if current.get("effective_year").and_then(Value::as_i64) != Some(year) {
      let program = current.get("program_id").cloned().unwrap_or(Value::Null);
      if year_taken(cx, &program, year).await? {
        return Err(duplicate_year().into());
      }
    }
  }

  if validate::supplied(&req.data, "duration_years") {
    let duration = duration_years(&req.data)?;
    req.data.insert("duration_years".into(), json!(duration));
  }
  Ok(())
}

fn unchanged(field: &str, incoming: &Value, current: Option<&Value>) -> bool {
  match field {
    "program_id" => same_reference(incoming, current),
    _ => match (incoming.as_f64(), current.and_then(Value::as_f64)) {
      (Some(a), Some(b)) => a == b,
      _ => Some(incoming) == current,
    },
  }
}

// ─── DELETE ──────────────────────────────────────────────────────────────────

pub async fn delete<T: Transaction>(
  cx: &Context<'_, T>,
  req: &mut Request,
) -> Result<()> {
  let id = req.target_id()?;
  let plan = cx
    .find_by_id(Entity::ProgramPlan, &["id", "state"], id)
    .await?
    .ok_or_else(|| Rejection::not_found("Program plan"))?;

  if plan_state(&plan) != Some(PlanState::Draft) {
    return Err(
      Rejection::new(
        RejectionKind::InvalidState,
        format!("Cannot delete a plan in state {}.", state_label(&plan)),
      )
      .with_code("PLAN_NOT_EDITABLE")
      .into(),
    );
  }

  if cx.referenced_by(Entity::PlanSubject, "plan_id", id).await? {
    return Err(
      Rejection::new(
        RejectionKind::HasChildren,
        "Cannot delete: the plan has subjects.",
      )
      .with_code("PLAN_HAS_CHILDREN")
      .into(),
    );
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use uuid::Uuid;

  use super::*;
  use crate::{entity::TargetId, rules::memory::MemoryTx};

  const YEAR: i32 = 2026;

  fn data(v: Value) -> Record { v.as_object().cloned().unwrap() }

  fn kind(err: crate::Error) -> RejectionKind { err.rejection().unwrap().kind }

  fn new_plan(program: Uuid, year: i64, duration: i64) -> Request {
    Request::create(
      Entity::ProgramPlan,
      data(json!({
        "program_id": program.to_string(),
        "effective_year": year,
        "duration_years": duration,
      })),
    )
  }

  fn patch(id: Uuid, v: Value) -> Request {
    Request::update(Entity::ProgramPlan, Some(TargetId::ByPath(id)), data(v))
  }

  #[tokio::test]
  async fn effective_year_bounds() {
    let tx = MemoryTx::default();
    let program = tx.program("ING");
    let cx = Context { tx: &tx, current_year: YEAR };

    let err = create(&cx, &mut new_plan(program, 1999, 5)).await.unwrap_err();
    assert_eq!(kind(err), RejectionKind::OutOfRange);

    create(&cx, &mut new_plan(program, i64::from(YEAR) + 1, 5)).await.unwrap();

    let err = create(&cx, &mut new_plan(program, i64::from(YEAR) + 2, 5))
      .await
      .unwrap_err();
    assert_eq!(kind(err), RejectionKind::OutOfRange);
  }

  #[tokio::test]
  async fn duration_bounds_and_integrality() {
    let tx = MemoryTx::default();
    let program = tx.program("ING");
    let cx = Context { tx: &tx, current_year: YEAR };

    for bad in [json!(0), json!(11), json!(2.5), json!("4")] {
      let mut req = new_plan(program, 2024, 1);
      req.data.insert("duration_years".into(), bad);
      let err = create(&cx, &mut req).await.unwrap_err();
      assert_eq!(kind(err), RejectionKind::OutOfRange);
    }

    let mut req = new_plan(program, 2024, 1);
    req.data.insert("effective_year".into(), json!(2024.0));
    req.data.insert("duration_years".into(), json!(4.0));
    create(&cx, &mut req).await.unwrap();
    assert_eq!(req.data["effective_year"], json!(2024));
    assert_eq!(req.data["duration_years"], json!(4));
  }

  #[tokio::test]
  async fn create_defaults_state_to_draft() {
    let tx = MemoryTx::default();
    let program = tx.program("ING");
    let cx = Context { tx: &tx, current_year: YEAR };

    let mut req = new_plan(program, 2024, 5);
    create(&cx, &mut req).await.unwrap();
    assert_eq!(req.data["state"], "Draft");

    let mut req = new_plan(program, 2025, 5);
    req.data.insert("state".into(), json!("Current"));
    create(&cx, &mut req).await.unwrap();
    assert_eq!(req.data["state"], "Current");
  }

  #[tokio::test]
  async fn create_requires_existing_program() {
    let tx = MemoryTx::default();
    let cx = Context { tx: &tx, current_year: YEAR };

    let err = create(&cx, &mut new_plan(Uuid::new_v4(), 2024, 5)).await.unwrap_err();
    let r = err.rejection().unwrap();
    assert_eq!(r.kind, RejectionKind::ParentNotFound);
    assert_eq!(r.status(), 404);

    let mut req = new_plan(Uuid::new_v4(), 2024, 5);
    req.data.insert("program_id".into(), json!("garbage"));
    let err = create(&cx, &mut req).await.unwrap_err();
    assert_eq!(kind(err), RejectionKind::ParentNotFound);
  }

  #[tokio::test]
  async fn create_rejects_duplicate_program_year() {
    let tx = MemoryTx::default();
    let program = tx.program("ING");
    tx.plan(program, 2024, 5, "Draft");
    let cx = Context { tx: &tx, current_year: YEAR };

    let err = create(&cx, &mut new_plan(program, 2024, 4)).await.unwrap_err();
    let r = err.rejection().unwrap();
    assert_eq!(r.kind, RejectionKind::DuplicateKey);
    assert_eq!(r.code, Some("PLAN_DUPLICATE_YEAR"));

    let other = tx.program("MED");
    create(&cx, &mut new_plan(other, 2024, 4)).await.unwrap();
  }

  #[tokio::test]
  async fn update_non_draft_plan_is_frozen() {
    let tx = MemoryTx::default();
    let program = tx.program("ING");
    let plan = tx.plan(program, 2024, 5, "Current");
    let cx = Context { tx: &tx, current_year: YEAR };

    for duration in [json!(4), json!(99)] {
      let err = update(&cx, &mut patch(plan, json!({ "duration_years": duration })))
        .await
        .unwrap_err();
      assert_eq!(kind(err), RejectionKind::InvalidState);
    }

    update(&cx, &mut patch(plan, json!({ "state": "Legacy" }))).await.unwrap();
    update(&cx, &mut patch(plan, json!({ "duration_years": 5.0 }))).await.unwrap();
    update(&cx, &mut patch(plan, json!({ "duration_years": 5, "state": "Legacy" })))
      .await
      .unwrap();
  }

  #[tokio::test]
  async fn update_program_is_immutable() {
    let tx = MemoryTx::default();
    let program = tx.program("ING");
    let plan = tx.plan(program, 2024, 5, "Draft");
    let cx = Context { tx: &tx, current_year: YEAR };

    let same = program.to_string().to_uppercase();
    let mut req = patch(plan, json!({ "program_id": same }));
    update(&cx, &mut req).await.unwrap();
    assert_eq!(req.data["program_id"], id_value(program));

    let err = update(&cx, &mut patch(plan, json!({ "program_id": Uuid::new_v4().to_string() })))
      .await
      .unwrap_err();
    assert_eq!(kind(err), RejectionKind::ImmutableField);
  }

  #[tokio::test]
  async fn update_year_rechecks_uniqueness() {
    let tx = MemoryTx::default();
    let program = tx.program("ING");
    let plan = tx.plan(program, 2024, 5, "Draft");
    tx.plan(program, 2025, 5, "Draft");
    let cx = Context { tx: &tx, current_year: YEAR };

    update(&cx, &mut patch(plan, json!({ "effective_year": 2024 }))).await.unwrap();

    let err = update(&cx, &mut patch(plan, json!({ "effective_year": 2025 })))
      .await
      .unwrap_err();
    assert_eq!(kind(err), RejectionKind::DuplicateKey);

    let err = update(&cx, &mut patch(plan, json!({ "effective_year": 1990 })))
      .await
      .unwrap_err();
    assert_eq!(kind(err), RejectionKind::OutOfRange);

    update(&cx, &mut patch(plan, json!({ "effective_year": 2026, "duration_years": 3 })))
      .await
      .unwrap();
  }

  #[tokio::test]
  async fn delete_requires_draft_and_no_children() {
    let tx = MemoryTx::default();
    let program = tx.program("ING");
    let current = tx.plan(program, 2023, 5, "Current");
    let draft = tx.plan(program, 2024, 5, "Draft");
    let subject = tx.subject("Algebra");
    tx.plan_subject(draft, subject, 1);
    let cx = Context { tx: &tx, current_year: YEAR };

    let mut req = Request::delete(Entity::ProgramPlan, Some(TargetId::ByPath(current)));
    assert_eq!(kind(delete(&cx, &mut req).await.unwrap_err()), RejectionKind::InvalidState);

    let mut req = Request::delete(Entity::ProgramPlan, Some(TargetId::ByPath(draft)));
    assert_eq!(kind(delete(&cx, &mut req).await.unwrap_err()), RejectionKind::HasChildren);

    let empty = tx.plan(program, 2025, 5, "Draft");
    let mut req = Request::delete(Entity::ProgramPlan, Some(TargetId::ByBody(empty)));
    delete(&cx, &mut req).await.unwrap();

    let mut req = Request::delete(Entity::ProgramPlan, Some(TargetId::ByBody(Uuid::new_v4())));
    assert_eq!(kind(delete(&cx, &mut req).await.unwrap_err()), RejectionKind::NotFound);
  }
}
