//! The modeling layer: declared columns and enumerated values.
//!
//! Hooks assume this layer has already run. It is kept behind the
//! [`EnumValidator`] trait so rule sets can be exercised without it.

use serde_json::Value;

use crate::{
  entity::{Entity, Phase, PlanState, PlanSubjectState, ProgramType, Record, Term},
  error::{Rejection, RejectionKind},
};

/// Decides whether `value` is an accepted member of the enum declared for
/// `field`.
pub trait EnumValidator: Send + Sync {
  fn validate_enum(&self, entity: Entity, field: &str, value: &str) -> bool;

  /// Whether `field` is an enum-typed column on `entity`.
  fn is_enum(&self, entity: Entity, field: &str) -> bool;
}

/// The enums declared by the data model.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclaredEnums;

impl DeclaredEnums {
  fn values(entity: Entity, field: &str) -> Option<&'static [&'static str]> {
    match (entity, field) {
      (Entity::DegreeProgram, "program_type") => Some(ProgramType::VALUES),
      (Entity::ProgramPlan, "state") => Some(PlanState::VALUES),
      (Entity::PlanSubject, "state") => Some(PlanSubjectState::VALUES),
      (Entity::PlanSubject, "term") => Some(Term::VALUES),
      _ => None,
    }
  }
}

impl EnumValidator for DeclaredEnums {
  fn validate_enum(&self, entity: Entity, field: &str, value: &str) -> bool {
    Self::values(entity, field).is_some_and(|vs| vs.contains(&value))
  }

  fn is_enum(&self, entity: Entity, field: &str) -> bool {
    Self::values(entity, field).is_some()
  }
}

/// Check a payload against the entity's declared shape: every key must be a
/// declared column, and every enum field must hold a member. On CREATE a null
/// enum field is left for the rule to default.
pub fn conform(
  entity: Entity,
  phase: Phase,
  data: &Record,
  enums: &dyn EnumValidator,
) -> Result<(), Rejection> {
  for (field, value) in data {
    if !entity.has_column(field) {
      return Err(
        Rejection::new(
          RejectionKind::UnknownField,
          format!("{entity} has no field {field}."),
        )
        .with_target(field.as_str()),
      );
    }

    if !enums.is_enum(entity, field) || (value.is_null() && phase == Phase::Create) {
      continue;
    }

    let accepted = value
      .as_str()
      .is_some_and(|s| enums.validate_enum(entity, field, s));
    if !accepted {
      return Err(
        Rejection::new(
          RejectionKind::InvalidEnum,
          format!("Invalid value for {field}: {}", render(value)),
        )
        .with_target(field.as_str()),
      );
    }
  }
  Ok(())
}

fn render(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn record(v: Value) -> Record { v.as_object().cloned().unwrap() }

  #[test]
  fn declared_enums() {
    let e = DeclaredEnums;
    assert!(e.validate_enum(Entity::PlanSubject, "term", "S2"));
    assert!(!e.validate_enum(Entity::PlanSubject, "term", "S3"));
    assert!(e.validate_enum(Entity::ProgramPlan, "state", "Legacy"));
    assert!(!e.validate_enum(Entity::ProgramPlan, "state", "Active"));
    assert!(!e.is_enum(Entity::Subject, "name"));
  }

  #[test]
  fn conform_rejects_undeclared_fields() {
    let data = record(json!({ "name": "Algebra", "credits": 6 }));
    let err = conform(Entity::Subject, Phase::Create, &data, &DeclaredEnums).unwrap_err();
    assert_eq!(err.kind, RejectionKind::UnknownField);
    assert_eq!(err.target.as_deref(), Some("credits"));
  }

  #[test]
  fn conform_rejects_bad_enum_members() {
    let data = record(json!({ "code": "X", "program_type": "Doctorate" }));
    let err = conform(Entity::DegreeProgram, Phase::Create, &data, &DeclaredEnums)
      .unwrap_err();
    assert_eq!(err.kind, RejectionKind::InvalidEnum);

    let data = record(json!({ "state": null, "duration_years": 4 }));
    assert!(conform(Entity::ProgramPlan, Phase::Create, &data, &DeclaredEnums).is_ok());
    let err = conform(Entity::ProgramPlan, Phase::Update, &data, &DeclaredEnums)
      .unwrap_err();
    assert_eq!(err.kind, RejectionKind::InvalidEnum);
  }
}
