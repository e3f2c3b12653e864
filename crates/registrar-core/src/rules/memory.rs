//! In-memory [`Transaction`] double for rule tests.

use std::{collections::HashMap, convert::Infallible, sync::Mutex};

use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
  entity::{Entity, Record, id_value, parse_uuid},
  store::Transaction,
};

#[derive(Default)]
pub struct MemoryTx {
  rows: Mutex<HashMap<Entity, Vec<Record>>>,
}

impl MemoryTx {
  /// Seed a row, returning its id.
  pub fn seed(&self, entity: Entity, row: Value) -> Uuid {
    let mut row = row.as_object().cloned().unwrap();
    let id = row.get("id").and_then(parse_uuid).unwrap_or_else(Uuid::new_v4);
    row.insert("id".into(), id_value(id));
    self.rows.lock().unwrap().entry(entity).or_default().push(row);
    id
  }

  pub fn program(&self, code: &str) -> Uuid {
    self.seed(
      Entity::DegreeProgram,
      json!({ "code": code, "name": "Program", "program_type": "Undergraduate" }),
    )
  }

  pub fn plan(&self, program: Uuid, year: i64, duration: i64, state: &str) -> Uuid {
    self.seed(
      Entity::ProgramPlan,
      json!({
        "program_id": program.to_string(),
        "effective_year": year,
        "duration_years": duration,
        "state": state,
      }),
    )
  }

  pub fn subject(&self, name: &str) -> Uuid {
    self.seed(Entity::Subject, json!({ "name": name }))
  }

  pub fn plan_subject(&self, plan: Uuid, subject: Uuid, year: i64) -> Uuid {
    self.seed(
      Entity::PlanSubject,
      json!({
        "plan_id": plan.to_string(),
        "subject_id": subject.to_string(),
        "year_in_plan": year,
        "term": "S1",
        "state": "Active",
      }),
    )
  }

  pub fn count(&self, entity: Entity) -> usize {
    self.rows.lock().unwrap().get(&entity).map_or(0, Vec::len)
  }
}

fn matches(row: &Record, filter: &[(&str, Value)]) -> bool {
  filter.iter().all(|(col, v)| row.get(*col) == Some(v))
}

impl Transaction for MemoryTx {
  type Error = Infallible;

  async fn query_one<'a>(
    &'a self,
    entity: Entity,
    columns: &'a [&'a str],
    filter: &'a [(&'a str, Value)],
  ) -> Result<Option<Record>, Infallible> {
    let rows = self.rows.lock().unwrap();
    Ok(
      rows
        .get(&entity)
        .and_then(|rs| rs.iter().find(|r| matches(r, filter)))
        .map(|r| {
          columns
            .iter()
            .filter_map(|c| r.get(*c).map(|v| ((*c).to_owned(), v.clone())))
            .collect()
        }),
    )
  }

  async fn list(&self, entity: Entity) -> Result<Vec<Record>, Infallible> {
    Ok(self.rows.lock().unwrap().get(&entity).cloned().unwrap_or_default())
  }

  async fn insert(&self, entity: Entity, record: Record) -> Result<Record, Infallible> {
    let id = self.seed(entity, Value::Object(record));
    Ok(self.query_one(entity, entity.columns(), &[("id", id_value(id))]).await?.unwrap_or_default())
  }

  async fn update(
    &self,
    entity: Entity,
    id: Uuid,
    changes: Record,
  ) -> Result<Option<Record>, Infallible> {
    let mut rows = self.rows.lock().unwrap();
    let row = rows
      .get_mut(&entity)
      .and_then(|rs| rs.iter_mut().find(|r| r.get("id") == Some(&id_value(id))));
    Ok(row.map(|r| {
      r.extend(changes);
      r.clone()
    }))
  }

  async fn delete(&self, entity: Entity, id: Uuid) -> Result<bool, Infallible> {
    let mut rows = self.rows.lock().unwrap();
    let Some(rs) = rows.get_mut(&entity) else { return Ok(false) };
    let before = rs.len();
    rs.retain(|r| r.get("id") != Some(&id_value(id)));
    Ok(rs.len() != before)
  }

  async fn commit(self) -> Result<(), Infallible> { Ok(()) }

  async fn rollback(self) -> Result<(), Infallible> { Ok(()) }
}
