//! Shared runtime state for cfx-daemon.
//!
//! One [`AppState`] is built at startup and handed to the router as
//! `State<Arc<AppState>>`. It owns the reconciler, the query service and the
//! summary sink; nothing else holds global state.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use cfx_config::{AppConfig, StoreConfig};
use cfx_db::{CountryStore, MemoryCountryStore, PgCountryStore, QueryService};
use cfx_feeds::{FeedSource, HttpFeedClient};
use cfx_reconcile::Reconciler;
use cfx_report::{PngSummarySink, ReportSink};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

/// Static build metadata included in health responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub build: BuildInfo,
    pub reconciler: Arc<Reconciler>,
    pub query: QueryService,
    /// Read side of the summary image; the reconciler writes through the same sink.
    pub sink: Arc<dyn ReportSink>,
}

impl AppState {
    pub fn new(
        feeds: Arc<dyn FeedSource>,
        store: Arc<dyn CountryStore>,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        Self {
            build: BuildInfo {
                service: "cfx-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            reconciler: Arc::new(Reconciler::new(feeds, Arc::clone(&store), Arc::clone(&sink))),
            query: QueryService::new(store),
            sink,
        }
    }

    /// Wire production dependencies: HTTP feeds, the configured store
    /// (migrated if Postgres) and the PNG sink under the cache dir.
    pub async fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        let feeds = HttpFeedClient::new(
            cfg.countries_url.clone(),
            cfg.rates_url.clone(),
            cfg.fetch_timeout,
        )?;
        let store = open_store(&cfg.store).await?;
        let sink = PngSummarySink::new(cfg.cache_dir.clone());

        Ok(Self::new(Arc::new(feeds), store, Arc::new(sink)))
    }
}

/// Open the configured store. Postgres is connected and migrated first.
pub async fn open_store(cfg: &StoreConfig) -> anyhow::Result<Arc<dyn CountryStore>> {
    match cfg {
        StoreConfig::Postgres { url } => {
            let pool = cfx_db::connect(url).await?;
            cfx_db::migrate(&pool)
                .await
                .context("apply migrations at startup")?;
            info!("postgres store ready");
            Ok(Arc::new(PgCountryStore::new(pool)))
        }
        StoreConfig::Memory => {
            warn!("using in-memory store; rows are lost on restart");
            Ok(Arc::new(MemoryCountryStore::new()))
        }
    }
}

// ---------------------------------------------------------------------------
// Background tasks
// ---------------------------------------------------------------------------

/// Spawn a background task that runs a full refresh every `interval`.
///
/// The first tick fires immediately. Failures are logged and the task keeps
/// going; runs never overlap because the reconciler serializes them.
pub fn spawn_refresh_tick(reconciler: Arc<Reconciler>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match reconciler.reconcile().await {
                Ok(out) => info!(
                    created = out.created,
                    updated = out.updated,
                    skipped = out.skipped,
                    "scheduled refresh done"
                ),
                Err(e) => error!(error = %e, "scheduled refresh failed"),
            }
        }
    });
}
