//! cfx-reconcile
//!
//! Reconciliation engine: merges the country and exchange-rate feeds into
//! persisted storage.
//!
//! - Both feeds are fetched concurrently; either failing aborts the run
//!   before storage is touched.
//! - Per-record problems (no name, bad population, malformed shape) are
//!   skipped and reported, never fatal.
//! - Writes are upserts keyed by case-insensitive name, committed as one batch.
//! - The summary image is rendered afterwards; its failures are only logged.
//!
//! [`plan`] is the pure part (no IO, injected RNG).

mod engine;
pub mod plan;
mod types;

pub use engine::Reconciler;
pub use plan::{plan_refresh, RefreshPlan, SkipReason};
pub use types::*;
