use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use cfx_db::CountryStore;
use cfx_feeds::{FeedSource, RawCountry};
use cfx_report::ReportSink;
use cfx_schemas::{name_key, CountryRecord, ListQuery, RefreshOutcome, SortKey};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::plan::{evaluate, plan_refresh};
use crate::types::{CreateCountryRequest, CreateError, RefreshError};

/// Merges the upstream feeds into the store and keeps the summary artifact
/// current.
pub struct Reconciler {
    feeds: Arc<dyn FeedSource>,
    store: Arc<dyn CountryStore>,
    sink: Arc<dyn ReportSink>,
    /// Held for a whole refresh so runs in one process never interleave.
    run_lock: Mutex<()>,
}

impl Reconciler {
    pub fn new(
        feeds: Arc<dyn FeedSource>,
        store: Arc<dyn CountryStore>,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        Self {
            feeds,
            store,
            sink,
            run_lock: Mutex::new(()),
        }
    }

    /// One full refresh: fetch both feeds, plan, commit as one batch, render.
    pub async fn reconcile(&self) -> Result<RefreshOutcome, RefreshError> {
        let _guard = self.run_lock.lock().await;

        let (countries, rates) = tokio::try_join!(
            self.feeds.fetch_countries(),
            self.feeds.fetch_exchange_rates()
        )?;

        let existing = self.store.name_keys().await.map_err(RefreshError::Storage)?;

        // Postgres keeps microseconds; truncate so the outcome matches what is stored.
        let refreshed_at = Utc::now().trunc_subsecs(6);

        let plan = {
            let mut rng = rand::thread_rng();
            plan_refresh(&countries, &rates, &existing, &mut rng)
        };

        let written = self
            .store
            .apply_batch(&plan.writes, refreshed_at)
            .await
            .map_err(RefreshError::Storage)?;

        info!(
            entries = countries.len(),
            rates = rates.len(),
            written,
            created = plan.created.len(),
            updated = plan.updated.len(),
            skipped = plan.skipped.len(),
            "refresh committed"
        );

        self.render_summary(refreshed_at).await;

        Ok(RefreshOutcome::from_lists(
            plan.created,
            plan.updated,
            plan.skipped,
            refreshed_at,
        ))
    }

    /// Best effort. Failures are logged and never reach the caller.
    async fn render_summary(&self, refreshed_at: DateTime<Utc>) {
        let query = ListQuery {
            sort: SortKey::GdpDesc,
            ..ListQuery::default()
        };
        let records = match self.store.list(&query).await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "summary skipped: could not read countries");
                return;
            }
        };

        let sink = Arc::clone(&self.sink);
        match tokio::task::spawn_blocking(move || sink.render(&records, refreshed_at)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!(error = %e, "summary image render failed"),
            Err(e) => warn!(error = %e, "summary image task failed"),
        }
    }

    /// Insert one country taken from the upstream feed.
    ///
    /// The stored population comes from upstream; the request only selects
    /// which country to take.
    pub async fn create_from_feeds(
        &self,
        req: CreateCountryRequest,
    ) -> Result<CountryRecord, CreateError> {
        let target = req.validate()?;
        let _guard = self.run_lock.lock().await;

        let (countries, rates) = tokio::try_join!(
            self.feeds.fetch_countries(),
            self.feeds.fetch_exchange_rates()
        )?;

        let wanted_key = name_key(&target.name);
        let write = {
            let mut rng = rand::thread_rng();
            countries
                .iter()
                .filter_map(|v| RawCountry::from_value(v).ok())
                .filter(|raw| {
                    let by_name = raw.name.as_deref().map(name_key).as_deref() == Some(wanted_key.as_str());
                    let by_code = raw
                        .currency_code
                        .as_deref()
                        .map(|c| c.trim().eq_ignore_ascii_case(&target.currency_code))
                        .unwrap_or(false);
                    by_name || by_code
                })
                .find_map(|raw| evaluate(&raw, &rates, &mut rng).ok())
        };
        let write = write.ok_or_else(|| CreateError::NotFound {
            name: target.name.clone(),
            currency_code: target.currency_code.clone(),
        })?;

        if self
            .store
            .find_by_name(&write.name)
            .await
            .map_err(CreateError::Storage)?
            .is_some()
        {
            return Err(CreateError::Conflict { name: write.name });
        }

        let name = write.name.clone();
        let refreshed_at = Utc::now().trunc_subsecs(6);
        self.store
            .apply_batch(std::slice::from_ref(&write), refreshed_at)
            .await
            .map_err(CreateError::Storage)?;

        let record = self
            .store
            .find_by_name(&name)
            .await
            .map_err(CreateError::Storage)?
            .ok_or_else(|| CreateError::Storage(anyhow::anyhow!("country '{name}' missing after insert")))?;

        info!(id = record.id, name = %record.name, "country created from feed");
        Ok(record)
    }
}
