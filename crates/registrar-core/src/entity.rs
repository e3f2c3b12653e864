//! Entities, their declared columns, and the pending-change request that
//! lifecycle hooks operate on.
//!
//! Rows and payloads are both plain JSON object maps ([`Record`]). The typed
//! enums below give the string forms that the modeling layer accepts.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{Rejection, RejectionKind};

/// A pending change payload, or a row read back from storage.
pub type Record = serde_json::Map<String, Value>;

// ─── Entity ──────────────────────────────────────────────────────────────────

/// Every entity the hooks know about. The serde form is the plural
/// kebab-case path segment used by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Entity {
  #[serde(rename = "students")]
  Student,
  #[serde(rename = "teachers")]
  Teacher,
  #[serde(rename = "degree-programs")]
  DegreeProgram,
  #[serde(rename = "program-plans")]
  ProgramPlan,
  #[serde(rename = "plan-subjects")]
  PlanSubject,
  #[serde(rename = "subjects")]
  Subject,
}

impl Entity {
  pub const ALL: [Entity; 6] = [
    Entity::Student,
    Entity::Teacher,
    Entity::DegreeProgram,
    Entity::ProgramPlan,
    Entity::PlanSubject,
    Entity::Subject,
  ];

  /// The storage table backing this entity.
  pub fn table(self) -> &'static str {
    match self {
      Self::Student => "students",
      Self::Teacher => "teachers",
      Self::DegreeProgram => "degree_programs",
      Self::ProgramPlan => "program_plans",
      Self::PlanSubject => "plan_subjects",
      Self::Subject => "subjects",
    }
  }

  /// The declared columns, `id` first.
  pub fn columns(self) -> &'static [&'static str] {
    match self {
      Self::Student => {
        &["id", "identity_number", "first_name", "last_name", "email"]
      }
      Self::Teacher => {
        &["id", "staff_number", "first_name", "last_name", "email"]
      }
      Self::DegreeProgram => &["id", "code", "name", "program_type"],
      Self::ProgramPlan => {
        &["id", "program_id", "effective_year", "duration_years", "state"]
      }
      Self::PlanSubject => {
        &["id", "plan_id", "subject_id", "year_in_plan", "term", "state"]
      }
      Self::Subject => &["id", "name"],
    }
  }

  pub fn has_column(self, column: &str) -> bool {
    self.columns().contains(&column)
  }
}

impl fmt::Display for Entity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Student => "Student",
      Self::Teacher => "Teacher",
      Self::DegreeProgram => "Degree program",
      Self::ProgramPlan => "Program plan",
      Self::PlanSubject => "Plan subject",
      Self::Subject => "Subject",
    })
  }
}

// ─── Enumerated values ───────────────────────────────────────────────────────

/// Lifecycle state of a program plan. Only `Draft` plans (and their
/// plan-subjects) may be edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlanState {
  #[default]
  Draft,
  Current,
  Legacy,
}

/// The half of the year a plan-subject is taught in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Term {
  S1,
  S2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlanSubjectState {
  #[default]
  Active,
  Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgramType {
  Undergraduate,
  Graduate,
  Technical,
}

macro_rules! string_forms {
  ($ty:ty { $($variant:ident),+ $(,)? }) => {
    impl $ty {
      pub const VALUES: &'static [&'static str] = &[$(stringify!($variant)),+];

      pub fn as_str(self) -> &'static str {
        match self {
          $(Self::$variant => stringify!($variant)),+
        }
      }

      pub fn parse(s: &str) -> Option<Self> {
        match s {
          $(stringify!($variant) => Some(Self::$variant),)+
          _ => None,
        }
      }
    }

    impl fmt::Display for $ty {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
      }
    }
  };
}

string_forms!(PlanState { Draft, Current, Legacy });
string_forms!(Term { S1, S2 });
string_forms!(PlanSubjectState { Active, Inactive });
string_forms!(ProgramType { Undergraduate, Graduate, Technical });

// ─── Phase ───────────────────────────────────────────────────────────────────

/// The write a hook runs in front of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Phase {
  Create,
  Update,
  Delete,
}

impl fmt::Display for Phase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Create => "CREATE",
      Self::Update => "UPDATE",
      Self::Delete => "DELETE",
    })
  }
}

// ─── Target id ───────────────────────────────────────────────────────────────

/// Where the id of an UPDATE/DELETE target came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetId {
  ByBody(Uuid),
  ByPath(Uuid),
}

impl TargetId {
  /// Resolve the target once: the payload's `id` wins over the path
  /// parameter. A payload `id` that is not a UUID is rejected outright.
  pub fn resolve(
    data: &Record,
    path: Option<Uuid>,
  ) -> Result<Option<Self>, Rejection> {
    match data.get("id") {
      None | Some(Value::Null) => Ok(path.map(Self::ByPath)),
      Some(v) => parse_uuid(v).map(|id| Some(Self::ByBody(id))).ok_or_else(
        || {
          Rejection::new(RejectionKind::InvalidFormat, "id must be a UUID.")
            .with_target("id")
        },
      ),
    }
  }

  pub fn id(self) -> Uuid {
    match self {
      Self::ByBody(id) | Self::ByPath(id) => id,
    }
  }
}

/// Read a UUID out of a JSON string value.
pub fn parse_uuid(v: &Value) -> Option<Uuid> {
  v.as_str().and_then(|s| Uuid::parse_str(s.trim()).ok())
}

/// The canonical stored form of an id.
pub fn id_value(id: Uuid) -> Value { Value::String(id.hyphenated().to_string()) }

// ─── Request ─────────────────────────────────────────────────────────────────

/// The pending change a hook inspects and may normalize in place.
#[derive(Debug, Clone)]
pub struct Request {
  pub phase:  Phase,
  pub entity: Entity,
  pub data:   Record,
  pub target: Option<TargetId>,
}

impl Request {
  pub fn create(entity: Entity, data: Record) -> Self {
    Self { phase: Phase::Create, entity, data, target: None }
  }

  pub fn update(entity: Entity, target: Option<TargetId>, data: Record) -> Self {
    Self { phase: Phase::Update, entity, data, target }
  }

  pub fn delete(entity: Entity, target: Option<TargetId>) -> Self {
    Self { phase: Phase::Delete, entity, data: Record::new(), target }
  }

  /// The target id, or a `MissingFields` rejection naming `id`.
  pub fn target_id(&self) -> Result<Uuid, Rejection> {
    self
      .target
      .map(TargetId::id)
      .ok_or_else(|| Rejection::missing_id(&self.entity.to_string()))
  }
}
