use std::sync::Arc;

use async_trait::async_trait;
use cfx_db::{CountryStore, MemoryCountryStore};
use cfx_feeds::{FeedError, FeedSource, RateTable};
use cfx_reconcile::Reconciler;
use cfx_report::{PngSummarySink, ReportSink, SUMMARY_FILE};
use serde_json::{json, Value};

struct FixedFeeds;

#[async_trait]
impl FeedSource for FixedFeeds {
    async fn fetch_countries(&self) -> Result<Vec<Value>, FeedError> {
        Ok(vec![
            json!({"name": "Wakanda", "region": "Africa", "population": 6_000_000,
                   "currencies": [{"code": "WAK"}]}),
            json!({"name": "Genovia", "region": "Europe", "population": 30_000,
                   "currencies": [{"code": "EUR"}]}),
        ])
    }

    async fn fetch_exchange_rates(&self) -> Result<RateTable, FeedError> {
        Ok([("WAK".to_string(), 2.0), ("EUR".to_string(), 0.9)]
            .into_iter()
            .collect())
    }
}

#[tokio::test]
async fn scenario_refresh_renders_png_into_cache_dir() {
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("cache");
    let store = Arc::new(MemoryCountryStore::new());
    let sink = Arc::new(PngSummarySink::new(&cache));
    let r = Reconciler::new(Arc::new(FixedFeeds), store.clone(), sink.clone());

    // Nothing rendered before the first refresh.
    assert_eq!(sink.path_of(), None);

    let out = r.reconcile().await.unwrap();
    assert_eq!(out.created, 2);
    assert_eq!(store.status().await.unwrap().total_countries, 2);

    let path = sink.path_of().expect("summary image after refresh");
    assert_eq!(path, cache.join(SUMMARY_FILE));
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    assert!(!cache.join(format!("{SUMMARY_FILE}.tmp")).exists());

    // A second refresh replaces the file in place.
    let again = r.reconcile().await.unwrap();
    assert_eq!(again.updated, 2);
    assert_eq!(sink.path_of(), Some(path));
}
