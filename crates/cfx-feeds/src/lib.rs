//! cfx-feeds
//!
//! External feed client: one bounded-timeout GET per upstream (country
//! metadata, exchange rates), classified into [`FeedError`] on failure.
//!
//! This crate does **not** write to the DB and does not decide what a country
//! entry means; the reconciliation engine does both.

pub mod country;
pub mod rates;
pub mod source;

pub use country::{MalformedCountry, RawCountry};
pub use rates::RateTable;
pub use source::{FeedError, FeedKind, FeedSource};

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

/// HTTP-backed [`FeedSource`]. No retries; the first failure is returned.
#[derive(Debug, Clone)]
pub struct HttpFeedClient {
    http: reqwest::Client,
    countries_url: String,
    rates_url: String,
}

impl HttpFeedClient {
    /// `timeout` bounds each fetch end to end, body read included.
    pub fn new(countries_url: String, rates_url: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build feed http client failed")?;
        Ok(Self {
            http,
            countries_url,
            rates_url,
        })
    }

    async fn get_json(&self, feed: FeedKind, url: &str) -> Result<Value, FeedError> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| classify(feed, "request failed", e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FeedError::Unavailable {
                feed,
                detail: format!("http status {}", status.as_u16()),
            });
        }

        // The deadline also covers the body read.
        resp.json::<Value>()
            .await
            .map_err(|e| classify(feed, "response json decode failed", e))
    }
}

fn classify(feed: FeedKind, what: &str, e: reqwest::Error) -> FeedError {
    if e.is_timeout() {
        FeedError::Timeout { feed }
    } else {
        FeedError::Unavailable {
            feed,
            detail: format!("{what}: {e}"),
        }
    }
}

#[async_trait]
impl FeedSource for HttpFeedClient {
    async fn fetch_countries(&self) -> Result<Vec<Value>, FeedError> {
        let feed = FeedKind::Countries;
        match self.get_json(feed, &self.countries_url).await? {
            Value::Array(entries) => {
                info!(entries = entries.len(), "countries feed fetched");
                Ok(entries)
            }
            _ => Err(FeedError::Unavailable {
                feed,
                detail: "countries payload is not a JSON array".to_string(),
            }),
        }
    }

    async fn fetch_exchange_rates(&self) -> Result<RateTable, FeedError> {
        let feed = FeedKind::ExchangeRates;
        let body = self.get_json(feed, &self.rates_url).await?;
        let table = RateTable::from_value(&body).map_err(|detail| FeedError::Unavailable { feed, detail })?;
        info!(rates = table.len(), "exchange rates feed fetched");
        Ok(table)
    }
}
