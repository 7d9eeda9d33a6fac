//! Storage boundary for country rows.

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cfx_schemas::{CountryRecord, CountryWrite, ListQuery, StatusSummary};

/// Persisted country storage.
///
/// Object safe so the engine, the query service and the HTTP layer can share
/// one `Arc<dyn CountryStore>` without knowing the backend.
///
/// Name matching is case-insensitive everywhere (see
/// [`cfx_schemas::name_key`]). Lookup and delete take the name as given:
/// surrounding whitespace is not stripped.
#[async_trait]
pub trait CountryStore: Send + Sync {
    /// [`cfx_schemas::name_key`] of every stored row.
    async fn name_keys(&self) -> Result<HashSet<String>>;

    /// Upsert every write by case-insensitive name, stamping each with
    /// `refreshed_at`. All-or-nothing: on error no write is visible.
    ///
    /// Returns the number of rows written.
    async fn apply_batch(&self, writes: &[CountryWrite], refreshed_at: DateTime<Utc>) -> Result<usize>;

    async fn list(&self, query: &ListQuery) -> Result<Vec<CountryRecord>>;

    async fn find_by_name(&self, name: &str) -> Result<Option<CountryRecord>>;

    /// Remove the row matching `name`, returning its prior state.
    async fn delete_by_name(&self, name: &str) -> Result<Option<CountryRecord>>;

    async fn status(&self) -> Result<StatusSummary>;
}
