//! Lifecycle hooks for the academic records service.
//!
//! Validates and normalizes pending changes to students, teachers, degree
//! programs, program plans, plan-subjects, and subjects before they are
//! written. This crate is deliberately free of HTTP and database
//! dependencies: storage is reached only through the [`store`] traits.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod entity;
pub mod error;
pub mod hooks;
pub mod model;
pub mod normalize;
pub mod rules;
pub mod store;
pub mod validate;

pub use error::{Error, Rejection, RejectionKind, Result};
pub use hooks::Rules;
