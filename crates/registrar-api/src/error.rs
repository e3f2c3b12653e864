//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use registrar_core::{Rejection, RejectionKind, store::Transaction};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// A lifecycle hook refused the change.
  #[error("rejected: {0}")]
  Rejected(#[from] Rejection),

  /// The store's own UNIQUE guard fired after the hook had passed.
  #[error("conflict: {0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Wrap a storage error, lifting unique-constraint failures into
  /// [`ApiError::Conflict`].
  pub fn store<T: Transaction>(error: T::Error) -> Self {
    if T::is_unique_violation(&error) {
      Self::Conflict(error.to_string())
    } else {
      Self::Store(Box::new(error))
    }
  }
}

impl From<registrar_core::Error> for ApiError {
  fn from(error: registrar_core::Error) -> Self {
    match error {
      registrar_core::Error::Rejected(r) => Self::Rejected(r),
      registrar_core::Error::Store(e) => Self::Store(e),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, body) = match self {
      ApiError::Rejected(r) => {
        let status = StatusCode::from_u16(r.status())
          .unwrap_or(StatusCode::BAD_REQUEST);
        (status, json!({
          "error":   r.message,
          "kind":    r.kind,
          "target":  r.target,
          "code":    r.code,
          "missing": r.missing,
        }))
      }
      ApiError::Conflict(m) => {
        tracing::warn!("unique constraint caught a write the hooks let through: {m}");
        (StatusCode::CONFLICT, json!({
          "error": "A record with the same key already exists.",
          "kind":  RejectionKind::DuplicateKey,
        }))
      }
      ApiError::Store(e) => {
        tracing::error!("store error: {e}");
        (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": e.to_string() }))
      }
    };
    (status, Json(body)).into_response()
  }
}
