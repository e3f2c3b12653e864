//! Handlers for the `/{entity}` endpoints.
//!
//! | Method   | Path             | Notes |
//! |----------|------------------|-------|
//! | `GET`    | `/{entity}`      | Every row |
//! | `POST`   | `/{entity}`      | CREATE hook; 201 + stored row |
//! | `GET`    | `/{entity}/{id}` | 404 if not found |
//! | `PATCH`  | `/{entity}/{id}` | UPDATE hook; a body `id` wins over the path |
//! | `DELETE` | `/{entity}/{id}` | DELETE hook; 204 |
//!
//! Every write runs in one transaction: hook, write, commit. A rejection
//! drops the transaction, so nothing the hook normalized is persisted.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use registrar_core::{
  Rejection, RejectionKind,
  entity::{Entity, Record, Request, TargetId},
  store::{self, Store, Transaction},
};
use uuid::Uuid;

use crate::{AppState, error::ApiError};

type TxOf<S> = <S as Store>::Tx;

async fn begin<S: Store>(state: &AppState<S>) -> Result<S::Tx, ApiError> {
  state.store.begin().await.map_err(ApiError::store::<S::Tx>)
}

/// Resolve the write target: the body `id` first, then the path segment.
fn target(data: &Record, raw: &str) -> Result<TargetId, ApiError> {
  let path = Uuid::parse_str(raw).ok();
  TargetId::resolve(data, path)?.ok_or_else(|| {
    Rejection::new(RejectionKind::InvalidFormat, "id must be a UUID.")
      .with_target("id")
      .into()
  })
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /{entity}`
pub async fn list<S: Store>(
  State(state): State<AppState<S>>,
  Path(entity): Path<Entity>,
) -> Result<Json<Vec<Record>>, ApiError> {
  let tx = begin(&state).await?;
  let rows = tx.list(entity).await.map_err(ApiError::store::<TxOf<S>>)?;
  tx.rollback().await.map_err(ApiError::store::<TxOf<S>>)?;
  Ok(Json(rows))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /{entity}/{id}`
pub async fn get_one<S: Store>(
  State(state): State<AppState<S>>,
  Path((entity, raw)): Path<(Entity, String)>,
) -> Result<Json<Record>, ApiError> {
  let not_found = || Rejection::not_found(&entity.to_string());
  let id = Uuid::parse_str(&raw).map_err(|_| not_found())?;

  let tx = begin(&state).await?;
  let row = store::by_id(&tx, entity, entity.columns(), id)
    .await
    .map_err(ApiError::store::<TxOf<S>>)?;
  tx.rollback().await.map_err(ApiError::store::<TxOf<S>>)?;
  Ok(Json(row.ok_or_else(not_found)?))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /{entity}`
pub async fn create<S: Store>(
  State(state): State<AppState<S>>,
  Path(entity): Path<Entity>,
  Json(data): Json<Record>,
) -> Result<impl IntoResponse, ApiError> {
  let tx = begin(&state).await?;

  let mut req = Request::create(entity, data);
  state.rules.before(&tx, &mut req).await?;

  let row = tx
    .insert(entity, req.data)
    .await
    .map_err(ApiError::store::<TxOf<S>>)?;
  tx.commit().await.map_err(ApiError::store::<TxOf<S>>)?;

  tracing::info!(%entity, id = ?row.get("id"), "created");
  Ok((StatusCode::CREATED, Json(row)))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PATCH /{entity}/{id}`
pub async fn update<S: Store>(
  State(state): State<AppState<S>>,
  Path((entity, raw)): Path<(Entity, String)>,
  Json(data): Json<Record>,
) -> Result<Json<Record>, ApiError> {
  let target = target(&data, &raw)?;
  let tx = begin(&state).await?;

  let mut req = Request::update(entity, Some(target), data);
  state.rules.before(&tx, &mut req).await?;

  let mut changes = req.data;
  changes.remove("id");
  let row = tx
    .update(entity, target.id(), changes)
    .await
    .map_err(ApiError::store::<TxOf<S>>)?
    .ok_or_else(|| Rejection::not_found(&entity.to_string()))?;
  tx.commit().await.map_err(ApiError::store::<TxOf<S>>)?;

  tracing::info!(%entity, id = %target.id(), "updated");
  Ok(Json(row))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /{entity}/{id}`
pub async fn delete<S: Store>(
  State(state): State<AppState<S>>,
  Path((entity, raw)): Path<(Entity, String)>,
) -> Result<StatusCode, ApiError> {
  let target = target(&Record::new(), &raw)?;
  let tx = begin(&state).await?;

  let mut req = Request::delete(entity, Some(target));
  state.rules.before(&tx, &mut req).await?;

  let removed = tx
    .delete(entity, target.id())
    .await
    .map_err(ApiError::store::<TxOf<S>>)?;
  if !removed {
    return Err(Rejection::not_found(&entity.to_string()).into());
  }
  tx.commit().await.map_err(ApiError::store::<TxOf<S>>)?;

  tracing::info!(%entity, id = %target.id(), "deleted");
  Ok(StatusCode::NO_CONTENT)
}
