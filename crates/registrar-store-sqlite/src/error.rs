//! Error type for `registrar-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  /// A column name outside the entity's declared columns.
  #[error("unknown column {column:?} on {table}")]
  UnknownColumn { table: &'static str, column: String },

  /// The storage-level guard behind a natural or composite key fired.
  #[error("unique constraint violated: {0}")]
  UniqueViolation(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
