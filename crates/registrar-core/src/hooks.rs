//! The `before(phase, entity)` hook table.
//!
//! [`Rules::before`] is the single entry point a dispatcher calls ahead of a
//! write: it runs the rule registered for the `(phase, entity)` pair, then
//! checks whatever the rule let through against the modeling layer. Pairs
//! without a rule go straight to the modeling layer.
//!
//! The rule goes first so its fixed check order (target, parent, state, then
//! field checks) decides which rejection a bad payload gets.

use chrono::Datelike as _;

use crate::{
  entity::{Entity, Phase, Request},
  error::{Error, Result},
  model::{self, DeclaredEnums, EnumValidator},
  rules::{self, Context},
  store::Transaction,
};

pub struct Rules<V = DeclaredEnums> {
  enums:        V,
  current_year: Option<i32>,
}

impl Default for Rules<DeclaredEnums> {
  fn default() -> Self { Self::new(DeclaredEnums) }
}

impl<V: EnumValidator> Rules<V> {
  pub fn new(enums: V) -> Self { Self { enums, current_year: None } }

  /// Pin the year used for date-range checks instead of reading the clock.
  pub fn with_current_year(mut self, year: i32) -> Self {
    self.current_year = Some(year);
    self
  }

  pub fn current_year(&self) -> i32 {
    self.current_year.unwrap_or_else(|| chrono::Utc::now().year())
  }

  pub fn enums(&self) -> &V { &self.enums }

  /// Whether a rule is registered for `(phase, entity)`.
  pub fn has_rule(phase: Phase, entity: Entity) -> bool {
    !matches!(
      (phase, entity),
      (Phase::Delete, Entity::Student | Entity::Teacher)
    )
  }

  /// Run the registered rule and the modeling-layer checks against `req`,
  /// inside the caller's transaction `tx`. On `Ok`, `req.data` holds the
  /// normalized payload to write.
  pub async fn before<T: Transaction>(&self, tx: &T, req: &mut Request) -> Result<()> {
    let result = self.run(tx, req).await;

    if let Err(Error::Rejected(r)) = &result {
      tracing::debug!(
        entity = ?req.entity,
        phase = %req.phase,
        kind = ?r.kind,
        field = r.target.as_deref(),
        code = r.code,
        "rejected: {}",
        r.message,
      );
    }
    result
  }

  async fn run<T: Transaction>(&self, tx: &T, req: &mut Request) -> Result<()> {
    self.rule(tx, req).await?;
    if req.phase != Phase::Delete {
      model::conform(req.entity, req.phase, &req.data, &self.enums)?;
    }
    Ok(())
  }

  async fn rule<T: Transaction>(&self, tx: &T, req: &mut Request) -> Result<()> {
    let cx = Context { tx, current_year: self.current_year() };
    match (req.phase, req.entity) {
      (Phase::Create, Entity::Student) => rules::student::create(&cx, req).await,
      (Phase::Update, Entity::Student) => rules::student::update(&cx, req).await,
      (Phase::Create, Entity::Teacher) => rules::teacher::create(&cx, req).await,
      (Phase::Update, Entity::Teacher) => rules::teacher::update(&cx, req).await,

      (Phase::Create, Entity::DegreeProgram) => rules::degree_program::create(&cx, req).await,
      (Phase::Update, Entity::DegreeProgram) => rules::degree_program::update(&cx, req).await,
      (Phase::Delete, Entity::DegreeProgram) => rules::degree_program::delete(&cx, req).await,

      (Phase::Create, Entity::ProgramPlan) => rules::program_plan::create(&cx, req).await,
      (Phase::Update, Entity::ProgramPlan) => rules::program_plan::update(&cx, req).await,
      (Phase::Delete, Entity::ProgramPlan) => rules::program_plan::delete(&cx, req).await,

      (Phase::Create, Entity::PlanSubject) => rules::plan_subject::create(&cx, req).await,
      (Phase::Update, Entity::PlanSubject) => rules::plan_subject::update(&cx, req).await,
      (Phase::Delete, Entity::PlanSubject) => rules::plan_subject::delete(&cx, req).await,

      (Phase::Create, Entity::Subject) => rules::subject::create(&cx, req).await,
      (Phase::Update, Entity::Subject) => rules::subject::update(&cx, req).await,
      (Phase::Delete, Entity::Subject) => rules::subject::delete(&cx, req).await,

      (Phase::Delete, Entity::Student | Entity::Teacher) => Ok(()),
    }
  }
}
