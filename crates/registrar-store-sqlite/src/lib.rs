//! SQLite backend for the registrar's storage collaborator.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every natural and composite key the
//! hooks check is also backed by a UNIQUE constraint here.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{SqliteStore, SqliteTx};
