//! Error types for `registrar-core`.
//!
//! A [`Rejection`] is an expected, user-correctable outcome of a lifecycle
//! hook. Storage faults are kept apart in [`Error::Store`] and never dressed up
//! as rejections.

use serde::Serialize;
use thiserror::Error;

// ─── Rejection kinds ─────────────────────────────────────────────────────────

/// Why a pending change was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RejectionKind {
  MissingFields,
  InvalidFormat,
  OutOfRange,
  InvalidEnum,
  EmptyField,
  TooLong,
  ImmutableField,
  UnknownField,
  InvalidState,
  ParentNotFound,
  NotFound,
  DuplicateKey,
  InUse,
  HasChildren,
}

impl RejectionKind {
  /// The HTTP-equivalent status code surfaced to the caller.
  pub fn status(self) -> u16 {
    match self {
      Self::ParentNotFound | Self::NotFound => 404,
      Self::DuplicateKey => 409,
      _ => 400,
    }
  }
}

// ─── Rejection ───────────────────────────────────────────────────────────────

/// A structured refusal: message text plus `target`/`code` metadata so a
/// client can highlight the offending field.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message}")]
pub struct Rejection {
  pub kind:    RejectionKind,
  pub message: String,
  /// The payload field the rejection points at, if any.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub target:  Option<String>,
  /// Stable machine-readable code, e.g. `PLAN_NOT_EDITABLE`.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub code:    Option<&'static str>,
  /// Every missing field, for [`RejectionKind::MissingFields`].
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub missing: Vec<String>,
}

impl Rejection {
  pub fn new(kind: RejectionKind, message: impl Into<String>) -> Self {
    Self {
      kind,
      message: message.into(),
      target: None,
      code: None,
      missing: Vec::new(),
    }
  }

  pub fn with_target(mut self, target: impl Into<String>) -> Self {
    self.target = Some(target.into());
    self
  }

  pub fn with_code(mut self, code: &'static str) -> Self {
    self.code = Some(code);
    self
  }

  pub fn status(&self) -> u16 { self.kind.status() }

  // ── Shorthands for the kinds every rule set needs ────────────────────────

  pub fn not_found(what: &str) -> Self {
    Self::new(RejectionKind::NotFound, format!("{what} not found."))
  }

  pub fn missing_id(what: &str) -> Self {
    Self {
      missing: vec!["id".to_owned()],
      ..Self::new(RejectionKind::MissingFields, format!("Missing {what} id."))
        .with_target("id")
        .with_code("MISSING_FIELDS")
    }
  }
}

// ─── Hook error ──────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum Error {
  #[error("rejected: {0}")]
  Rejected(#[from] Rejection),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// The rejection, if this error is one.
  pub fn rejection(&self) -> Option<&Rejection> {
    match self {
      Self::Rejected(r) => Some(r),
      Self::Store(_) => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
