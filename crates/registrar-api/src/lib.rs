//! JSON REST API for the registrar.
//!
//! Exposes an axum [`Router`] backed by any [`registrar_core::store::Store`].
//! The handlers are the dispatcher for the lifecycle hooks: each write opens a
//! transaction, runs [`Rules::before`], then writes and commits.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", registrar_api::router(state))
//! ```

pub mod error;
pub mod records;

use std::{path::PathBuf, sync::Arc};

use axum::{Router, routing::get};
use registrar_core::{Rules, store::Store};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `REGISTRAR_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store: Arc<S>,
  pub rules: Arc<Rules>,
}

impl<S> AppState<S> {
  pub fn new(store: S, rules: Rules) -> Self {
    Self { store: Arc::new(store), rules: Arc::new(rules) }
  }
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), rules: self.rules.clone() }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn router<S>(state: AppState<S>) -> Router<()>
where
  S: Store + 'static,
{
  Router::new()
    .route("/{entity}", get(records::list::<S>).post(records::create::<S>))
    .route(
      "/{entity}/{id}",
      get(records::get_one::<S>)
        .patch(records::update::<S>)
        .delete(records::delete::<S>),
    )
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
