//! [`SqliteStore`]: the SQLite implementation of [`Store`].

use std::{
  path::Path,
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
};

use rusqlite::{OptionalExtension as _, params_from_iter};
use serde_json::Value;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use registrar_core::{
  entity::{Entity, Record},
  store::{Store, Transaction},
};

use crate::{
  Error, Result,
  encode::{checked_columns, decode_row, encode_uuid, encode_value},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A registrar store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. Transactions
/// are serialized: [`SqliteStore::begin`] waits until the previous one has
/// committed or rolled back.
#[derive(Clone)]
pub struct SqliteStore {
  conn:    tokio_rusqlite::Connection,
  lock:    Arc<Mutex<()>>,
  /// Set when a transaction was dropped where no rollback could be spawned;
  /// the next `begin` rolls it back first.
  pending: Arc<AtomicBool>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(Self {
      conn,
      lock: Arc::new(Mutex::new(())),
      pending: Arc::new(AtomicBool::new(false)),
    })
  }
}

impl Store for SqliteStore {
  type Error = Error;
  type Tx = SqliteTx;

  async fn begin(&self) -> Result<SqliteTx> {
    let guard = self.lock.clone().lock_owned().await;
    let abandoned = self.pending.swap(false, Ordering::AcqRel);
    self
      .conn
      .call(move |conn| {
        if abandoned && !conn.is_autocommit() {
          conn.execute_batch("ROLLBACK")?;
        }
        conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
      })
      .await?;
    Ok(SqliteTx {
      conn:    self.conn.clone(),
      guard:   Some(guard),
      pending: self.pending.clone(),
    })
  }
}

// ─── Transaction ─────────────────────────────────────────────────────────────

/// An open `BEGIN IMMEDIATE` transaction on a [`SqliteStore`].
///
/// Holds the store's transaction lock until it is committed, rolled back, or
/// dropped. Dropping an unfinished transaction rolls it back in the
/// background.
pub struct SqliteTx {
  conn:    tokio_rusqlite::Connection,
  guard:   Option<OwnedMutexGuard<()>>,
  pending: Arc<AtomicBool>,
}

impl SqliteTx {
  async fn finish(&mut self, statement: &'static str) -> Result<()> {
    let result = self
      .conn
      .call(move |conn| {
        conn.execute_batch(statement)?;
        Ok(())
      })
      .await;
    self.guard = None;
    result.map_err(Error::from)
  }

  async fn select(
    &self,
    entity: Entity,
    columns: Vec<String>,
    filter: Vec<(String, Value)>,
  ) -> Result<Option<Record>> {
    let mut sql = format!("SELECT {} FROM {}", columns.join(", "), entity.table());
    for (i, (column, _)) in filter.iter().enumerate() {
      let joiner = if i == 0 { "WHERE" } else { "AND" };
      sql.push_str(&format!(" {joiner} {column} = ?{}", i + 1));
    }
    sql.push_str(" LIMIT 1");

    let params = filter
      .iter()
      .map(|(_, v)| encode_value(v))
      .collect::<Result<Vec<_>>>()?;

    let row = self
      .conn
      .call(move |conn| {
        let row = conn
          .query_row(&sql, params_from_iter(params.iter()), |row| {
            decode_row(row, &columns)
          })
          .optional()?;
        Ok(row)
      })
      .await?;
    Ok(row)
  }

  async fn by_id(&self, entity: Entity, id: Uuid) -> Result<Option<Record>> {
    let columns = checked_columns(entity, entity.columns().iter().copied())?;
    self
      .select(entity, columns, vec![("id".to_owned(), Value::String(encode_uuid(id)))])
      .await
  }
}

impl Transaction for SqliteTx {
  type Error = Error;

  async fn query_one<'a>(
    &'a self,
    entity: Entity,
    columns: &'a [&'a str],
    filter: &'a [(&'a str, Value)],
  ) -> Result<Option<Record>> {
    let projection = if columns.is_empty() { entity.columns() } else { columns };
    let columns = checked_columns(entity, projection.iter().copied())?;
    let names = checked_columns(entity, filter.iter().map(|(c, _)| *c))?;
    let filter = names
      .into_iter()
      .zip(filter.iter().map(|(_, v)| v.clone()))
      .collect();
    self.select(entity, columns, filter).await
  }

  async fn list(&self, entity: Entity) -> Result<Vec<Record>> {
    let columns = checked_columns(entity, entity.columns().iter().copied())?;
    let sql = format!("SELECT {} FROM {} ORDER BY rowid", columns.join(", "), entity.table());

    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], |row| decode_row(row, &columns))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  async fn insert(&self, entity: Entity, mut record: Record) -> Result<Record> {
    let id = match record.get("id").filter(|v| !v.is_null()) {
      Some(Value::String(s)) => Uuid::parse_str(s)?,
      Some(other) => Uuid::parse_str(&other.to_string())?,
      None => Uuid::new_v4(),
    };
    record.insert("id".into(), Value::String(encode_uuid(id)));

    let columns = checked_columns(entity, record.keys().map(String::as_str))?;
    let params = record.values().map(encode_value).collect::<Result<Vec<_>>>()?;
    let placeholders = (1..=columns.len())
      .map(|i| format!("?{i}"))
      .collect::<Vec<_>>()
      .join(", ");
    let sql = format!(
      "INSERT INTO {} ({}) VALUES ({placeholders})",
      entity.table(),
      columns.join(", "),
    );

    self
      .conn
      .call(move |conn| {
        conn.execute(&sql, params_from_iter(params.iter()))?;
        Ok(())
      })
      .await
      .map_err(classify)?;

    // Reading back picks up column defaults the record did not carry.
    Ok(self.by_id(entity, id).await?.unwrap_or(record))
  }

  async fn update(&self, entity: Entity, id: Uuid, mut changes: Record) -> Result<Option<Record>> {
    changes.remove("id");
    if changes.is_empty() {
      return self.by_id(entity, id).await;
    }

    let columns = checked_columns(entity, changes.keys().map(String::as_str))?;
    let mut params = changes.values().map(encode_value).collect::<Result<Vec<_>>>()?;
    params.push(rusqlite::types::Value::Text(encode_uuid(id)));
    let assignments = columns
      .iter()
      .enumerate()
      .map(|(i, c)| format!("{c} = ?{}", i + 1))
      .collect::<Vec<_>>()
      .join(", ");
    let sql = format!(
      "UPDATE {} SET {assignments} WHERE id = ?{}",
      entity.table(),
      params.len(),
    );

    let touched = self
      .conn
      .call(move |conn| Ok(conn.execute(&sql, params_from_iter(params.iter()))?))
      .await
      .map_err(classify)?;

    if touched == 0 {
      return Ok(None);
    }
    self.by_id(entity, id).await
  }

  async fn delete(&self, entity: Entity, id: Uuid) -> Result<bool> {
    let sql = format!("DELETE FROM {} WHERE id = ?1", entity.table());
    let id = encode_uuid(id);
    let removed = self
      .conn
      .call(move |conn| Ok(conn.execute(&sql, [id])?))
      .await?;
    Ok(removed > 0)
  }

  async fn commit(mut self) -> Result<()> { self.finish("COMMIT").await }

  async fn rollback(mut self) -> Result<()> { self.finish("ROLLBACK").await }

  fn is_unique_violation(error: &Error) -> bool {
    matches!(error, Error::UniqueViolation(_))
  }
}

impl Drop for SqliteTx {
  fn drop(&mut self) {
    let Some(guard) = self.guard.take() else { return };
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
      // Flagged while the lock is still held, so the next `begin` sees it.
      self.pending.store(true, Ordering::Release);
      tracing::warn!("transaction dropped outside a runtime; rolling back on next begin");
      drop(guard);
      return;
    };

    let conn = self.conn.clone();
    handle.spawn(async move {
      // The lock is released only once the rollback has run.
      let _guard = guard;
      let result = conn
        .call(|conn| {
          conn.execute_batch("ROLLBACK")?;
          Ok(())
        })
        .await;
      if let Err(e) = result {
        tracing::warn!("rollback of abandoned transaction failed: {e}");
      }
    });
  }
}

/// Lift UNIQUE and PRIMARY KEY failures out of the generic database error so
/// callers can report them as conflicts.
fn classify(error: tokio_rusqlite::Error) -> Error {
  if let tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(failure, message)) = &error
    && matches!(
      failure.extended_code,
      rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
  {
    return Error::UniqueViolation(message.clone().unwrap_or_else(|| failure.to_string()));
  }
  Error::Database(error)
}
