//! Process-local [`CountryStore`].
//!
//! Same matching and ordering rules as the Postgres store. Used by tests and
//! by the daemon when run with `CFX_STORE=memory`.

use std::collections::{BTreeMap, HashSet};

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cfx_schemas::{name_key, CountryRecord, CountryWrite, ListQuery, StatusSummary};
use tokio::sync::RwLock;

use crate::store::CountryStore;

#[derive(Debug, Default)]
struct Rows {
    next_id: i64,
    by_id: BTreeMap<i64, CountryRecord>,
}

impl Rows {
    fn id_for(&self, key: &str) -> Option<i64> {
        self.by_id
            .values()
            .find(|r| name_key(&r.name) == key)
            .map(|r| r.id)
    }
}

#[derive(Debug, Default)]
pub struct MemoryCountryStore {
    rows: RwLock<Rows>,
}

impl MemoryCountryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn check_write(w: &CountryWrite) -> Result<()> {
    // Mirrors the table's check constraints.
    if w.name.trim().is_empty() {
        bail!("country name must not be empty");
    }
    if w.population <= 0 {
        bail!("country '{}' population must be positive", w.name);
    }
    Ok(())
}

#[async_trait]
impl CountryStore for MemoryCountryStore {
    async fn name_keys(&self) -> Result<HashSet<String>> {
        let rows = self.rows.read().await;
        Ok(rows.by_id.values().map(|r| name_key(&r.name)).collect())
    }

    async fn apply_batch(&self, writes: &[CountryWrite], refreshed_at: DateTime<Utc>) -> Result<usize> {
        // Validate everything before touching state so a bad write leaves no trace.
        for w in writes {
            check_write(w)?;
        }

        let mut rows = self.rows.write().await;
        for w in writes {
            let id = match rows.id_for(&name_key(&w.name)) {
                Some(id) => id,
                None => {
                    rows.next_id += 1;
                    rows.next_id
                }
            };
            rows.by_id.insert(id, w.clone().into_record(id, refreshed_at));
        }
        Ok(writes.len())
    }

    async fn list(&self, query: &ListQuery) -> Result<Vec<CountryRecord>> {
        let rows = self.rows.read().await;
        Ok(query.apply(rows.by_id.values().cloned()))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<CountryRecord>> {
        let rows = self.rows.read().await;
        // Stored names are already trimmed; the lookup itself is not.
        let key = name.to_lowercase();
        Ok(rows.id_for(&key).and_then(|id| rows.by_id.get(&id).cloned()))
    }

    async fn delete_by_name(&self, name: &str) -> Result<Option<CountryRecord>> {
        let mut rows = self.rows.write().await;
        let key = name.to_lowercase();
        Ok(match rows.id_for(&key) {
            Some(id) => rows.by_id.remove(&id),
            None => None,
        })
    }

    async fn status(&self) -> Result<StatusSummary> {
        let rows = self.rows.read().await;
        Ok(StatusSummary {
            total_countries: rows.by_id.len() as i64,
            last_refreshed_at: rows.by_id.values().map(|r| r.last_refreshed_at).max(),
        })
    }
}
