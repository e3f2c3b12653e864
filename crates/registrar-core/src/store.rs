//! The storage collaborator, seen through the narrow interface the hooks need.
//!
//! The traits are implemented by storage backends (e.g.
//! `registrar-store-sqlite`). Hooks only ever call
//! [`Transaction::query_one`]; the write methods are for the dispatcher that
//! performs the change once the hook has accepted it.

use std::future::Future;

use serde_json::Value;
use uuid::Uuid;

use crate::entity::{Entity, Record};

// ─── Traits ──────────────────────────────────────────────────────────────────

/// A transactional record store.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait Store: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;
  type Tx: Transaction<Error = Self::Error>;

  /// Begin a transaction. Reads made through it observe one consistent
  /// snapshot together with the eventual write.
  fn begin(&self) -> impl Future<Output = Result<Self::Tx, Self::Error>> + Send + '_;
}

/// One open transaction. Dropping it without [`Transaction::commit`] rolls
/// back.
pub trait Transaction: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Point lookup: the first row of `entity` whose columns equal every pair
  /// in `filter`, projected onto `columns`. `None` if there is no such row.
  fn query_one<'a>(
    &'a self,
    entity: Entity,
    columns: &'a [&'a str],
    filter: &'a [(&'a str, Value)],
  ) -> impl Future<Output = Result<Option<Record>, Self::Error>> + Send + 'a;

  /// Every row of `entity`, all columns.
  fn list(
    &self,
    entity: Entity,
  ) -> impl Future<Output = Result<Vec<Record>, Self::Error>> + Send + '_;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Insert `record`, assigning a fresh id when it carries none. Returns the
  /// stored row.
  fn insert(
    &self,
    entity: Entity,
    record: Record,
  ) -> impl Future<Output = Result<Record, Self::Error>> + Send + '_;

  /// Apply `changes` to row `id`. Returns the stored row, or `None` if the
  /// row does not exist.
  fn update(
    &self,
    entity: Entity,
    id: Uuid,
    changes: Record,
  ) -> impl Future<Output = Result<Option<Record>, Self::Error>> + Send + '_;

  /// Delete row `id`. Returns whether a row was removed.
  fn delete(
    &self,
    entity: Entity,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Completion ────────────────────────────────────────────────────────

  fn commit(self) -> impl Future<Output = Result<(), Self::Error>> + Send;

  fn rollback(self) -> impl Future<Output = Result<(), Self::Error>> + Send;

  /// Whether `error` is the storage layer's own unique-constraint guard
  /// firing. Backends without such constraints keep the default.
  fn is_unique_violation(_error: &Self::Error) -> bool { false }
}

// ─── Lookup helpers ──────────────────────────────────────────────────────────

/// Shorthand for an id lookup.
pub async fn by_id<T: Transaction>(
  tx: &T,
  entity: Entity,
  columns: &[&str],
  id: Uuid,
) -> Result<Option<Record>, T::Error> {
  let filter = [("id", crate::entity::id_value(id))];
  tx.query_one(entity, columns, &filter).await
}
