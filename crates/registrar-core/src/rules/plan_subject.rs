//! Plan-subject rules.
//!
//! A plan-subject places one subject in one plan, in a given year and term.
//! It can only be created, edited, or removed while its plan is `Draft`, and
//! its plan/subject references never change.

use serde_json::Value;
use uuid::Uuid;

use crate::{
  entity::{Entity, PlanState, PlanSubjectState, Record, Request, Term, id_value, parse_uuid},
  error::{Rejection, RejectionKind, Result},
  rules::{Context, default_field, immutable, plan_state, reference, same_reference, state_label},
  store::Transaction,
  validate,
};

/// Every field an UPDATE payload may carry.
const EDITABLE: &[&str] = &["year_in_plan", "term", "state", "plan_id", "subject_id", "id"];

fn plan_not_found() -> Rejection {
  Rejection::new(RejectionKind::ParentNotFound, "Plan not found.")
    .with_target("plan_id")
    .with_code("PLAN_NOT_FOUND")
}

/// Reject unless the owning plan is `Draft`.
fn require_draft(plan: &Record, action: &str) -> Result<(), Rejection> {
  if plan_state(plan) == Some(PlanState::Draft) {
    return Ok(());
  }
  Err(
    Rejection::new(
      RejectionKind::InvalidState,
      format!("Cannot {action} a plan in state {}.", state_label(plan)),
    )
    .with_target("plan_id")
    .with_code("PLAN_NOT_EDITABLE"),
  )
}

/// Check `year_in_plan` against the plan's duration and store it as an
/// integer.
fn check_year(data: &mut Record, plan: &Record) -> Result<(), Rejection> {
  let duration = plan.get("duration_years").and_then(validate::integral).unwrap_or(0);
  if let Some(year) = validate::int_in_range(data.get("year_in_plan"), 1, duration) {
    data.insert("year_in_plan".into(), Value::from(year));
    return Ok(());
  }
  Err(
    Rejection::new(
      RejectionKind::OutOfRange,
      format!("year_in_plan must be between 1 and {duration}."),
    )
    .with_target("year_in_plan")
    .with_code("YEAR_OUT_OF_RANGE"),
  )
}

fn check_term(data: &Record) -> Result<(), Rejection> {
  if data.get("term").and_then(Value::as_str).and_then(Term::parse).is_some() {
    return Ok(());
  }
  Err(
    Rejection::new(RejectionKind::InvalidEnum, "Invalid term. Use 'S1' or 'S2'.")
      .with_target("term")
      .with_code("TERM_INVALID"),
  )
}

async fn load_plan<T: Transaction>(cx: &Context<'_, T>, id: Uuid) -> Result<Record> {
  let plan = cx
    .find_by_id(Entity::ProgramPlan, &["id", "duration_years", "state"], id)
    .await?
    .ok_or_else(plan_not_found)?;
  Ok(plan)
}

/// The row being updated or deleted, and its owning plan.
async fn load_with_plan<T: Transaction>(
  cx: &Context<'_, T>,
  req: &Request,
) -> Result<(Record, Record)> {
  let id = req.target_id()?;
  let row = cx
    .find_by_id(Entity::PlanSubject, &["id", "plan_id", "subject_id"], id)
    .await?
    .ok_or_else(|| Rejection::not_found("Plan subject"))?;

  let plan_id = row.get("plan_id").and_then(parse_uuid).ok_or_else(plan_not_found)?;
  let plan = load_plan(cx, plan_id).await?;
  Ok((row, plan))
}

// ─── CREATE ──────────────────────────────────────────────────────────────────

pub async fn create<T: Transaction>(
  cx: &Context<'_, T>,
  req: &mut Request,
) -> Result<()> {
  validate::required(&req.data, &["plan_id", "subject_id", "year_in_plan", "term"])?;

  let plan_id = reference(&mut req.data, "plan_id").ok_or_else(plan_not_found)?;
  let plan = load_plan(cx, plan_id).await?;
  require_draft(&plan, "modify")?;

  let subject_missing = || {
    Rejection::new(RejectionKind::ParentNotFound, "Subject not found.")
      .with_target("subject_id")
      .with_code("SUBJECT_NOT_FOUND")
  };
  let subject_id = reference(&mut req.data, "subject_id").ok_or_else(subject_missing)?;
  cx.find_by_id(Entity::Subject, &["id"], subject_id)
    .await?
    .ok_or_else(subject_missing)?;

  check_year(&mut req.data, &plan)?;
  check_term(&req.data)?;

  let filter = [("plan_id", id_value(plan_id)), ("subject_id", id_value(subject_id))];
  if cx.find(Entity::PlanSubject, &["id"], &filter).await?.is_some() {
    return Err(
      Rejection::new(
        RejectionKind::DuplicateKey,
        "The subject is already part of this plan.",
      )
      .with_target("subject_id")
      .with_code("DUPLICATED_PLAN_SUBJECT")
      .into(),
    );
  }

  default_field(&mut req.data, "state", PlanSubjectState::Active.as_str());
  Ok(())
}

// ─── UPDATE ──────────────────────────────────────────────────────────────────

/// Only `year_in_plan`, `term`, and `state` may change; the references may be
/// resent unchanged.
pub async fn update<T: Transaction>(
  cx: &Context<'_, T>,
  req: &mut Request,
) -> Result<()> {
  let (current, plan) = load_with_plan(cx, req).await?;
  require_draft(&plan, "modify")?;

  if validate::supplied(&req.data, "term") {
    check_term(&req.data)?;
  }

  for (field, what) in [("plan_id", "plan"), ("subject_id", "subject")] {
    if let Some(incoming) = req.data.get(field)
      && !same_reference(incoming, current.get(field))
    {
      return Err(immutable(field, what).into());
    }
    reference(&mut req.data, field);
  }

  if let Some(field) = req.data.keys().find(|k| !EDITABLE.contains(&k.as_str())) {
    return Err(
      Rejection::new(
        RejectionKind::UnknownField,
        format!("Field not editable on update: {field}"),
      )
      .with_target(field.as_str())
      .with_code("FIELD_NOT_EDITABLE")
      .into(),
    );
  }

  if validate::supplied(&req.data, "year_in_plan") {
    check_year(&mut req.data, &plan)?;
  }
  Ok(())
}

// ─── DELETE ──────────────────────────────────────────────────────────────────

pub async fn delete<T: Transaction>(
  cx: &Context<'_, T>,
  req: &mut Request,
) -> Result<()> {
  let (_, plan) = load_with_plan(cx, req).await?;
  require_draft(&plan, "remove subjects from")?;
  Ok(())
}
