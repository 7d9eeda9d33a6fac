//! Pure planning step of a refresh: feed entries + rates + existing names in,
//! writes and outcome lists out. No IO. Randomness is injected.

use std::collections::{HashMap, HashSet};
use std::fmt;

use cfx_feeds::{RateTable, RawCountry};
use cfx_schemas::{name_key, CountryWrite, DEFAULT_CAPITAL, DEFAULT_REGION};
use rand::Rng;
use serde_json::Value;
use tracing::warn;

/// Inclusive bounds of the random GDP multiplier.
pub const GDP_FACTOR_MIN: u32 = 1000;
pub const GDP_FACTOR_MAX: u32 = 2000;

/// Label used in the skip list when an entry has no readable name.
pub const UNKNOWN_NAME: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoName,
    InvalidPopulation,
    /// Entry shape could not be interpreted.
    ProcessingError,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::NoName => "no name",
            SkipReason::InvalidPopulation => "invalid population",
            SkipReason::ProcessingError => "processing error",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Writes to commit plus the per-name outcome lists, all in feed order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefreshPlan {
    pub writes: Vec<CountryWrite>,
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub skipped: Vec<String>,
}

impl RefreshPlan {
    fn skip(&mut self, name: Option<&str>, reason: SkipReason) {
        let label = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(UNKNOWN_NAME);
        self.skipped.push(format!("{label} ({reason})"));
    }
}

/// Build the refresh plan.
///
/// `existing` holds [`name_key`]s of rows already stored; it decides created
/// vs updated. A name seen twice in one feed collapses to a single write (the
/// later entry wins) and the repeat counts as updated.
pub fn plan_refresh<R: Rng + ?Sized>(
    entries: &[Value],
    rates: &RateTable,
    existing: &HashSet<String>,
    rng: &mut R,
) -> RefreshPlan {
    let mut plan = RefreshPlan::default();
    let mut pending: HashMap<String, usize> = HashMap::new();

    for entry in entries {
        let raw = match RawCountry::from_value(entry) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "skipping malformed country entry");
                plan.skip(e.name.as_deref(), SkipReason::ProcessingError);
                continue;
            }
        };

        let write = match evaluate(&raw, rates, rng) {
            Ok(w) => w,
            Err(reason) => {
                plan.skip(raw.name.as_deref(), reason);
                continue;
            }
        };

        let key = name_key(&write.name);
        if let Some(&idx) = pending.get(&key) {
            plan.updated.push(write.name.clone());
            plan.writes[idx] = write;
            continue;
        }

        if existing.contains(&key) {
            plan.updated.push(write.name.clone());
        } else {
            plan.created.push(write.name.clone());
        }
        pending.insert(key, plan.writes.len());
        plan.writes.push(write);
    }

    plan
}

/// Validate one decoded entry and derive its currency and GDP fields.
pub fn evaluate<R: Rng + ?Sized>(
    raw: &RawCountry,
    rates: &RateTable,
    rng: &mut R,
) -> Result<CountryWrite, SkipReason> {
    let name = raw
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or(SkipReason::NoName)?;

    let population = raw
        .population
        .filter(|p| *p > 0)
        .ok_or(SkipReason::InvalidPopulation)?;

    let code = raw
        .currency_code
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());

    let (currency_code, exchange_rate, estimated_gdp) = match code {
        Some(code) => match rates.get(code).filter(|r| r.is_finite() && *r > 0.0) {
            Some(rate) => (
                Some(code.to_string()),
                Some(rate),
                estimate_gdp(population, rate, rng),
            ),
            // Code not covered by the rate feed: treated as no usable currency.
            None => (None, None, 0.0),
        },
        None => (None, None, 0.0),
    };

    Ok(CountryWrite {
        name: name.to_string(),
        capital: raw
            .capital
            .clone()
            .unwrap_or_else(|| DEFAULT_CAPITAL.to_string()),
        region: raw
            .region
            .clone()
            .unwrap_or_else(|| DEFAULT_REGION.to_string()),
        population,
        currency_code,
        exchange_rate,
        estimated_gdp,
        flag_url: raw.flag.clone().unwrap_or_default(),
    })
}

/// `population × factor / rate` with a fresh factor from
/// `[GDP_FACTOR_MIN, GDP_FACTOR_MAX]`. Caller guarantees `rate > 0`.
pub fn estimate_gdp<R: Rng + ?Sized>(population: i64, rate: f64, rng: &mut R) -> f64 {
    let factor = rng.gen_range(GDP_FACTOR_MIN..=GDP_FACTOR_MAX);
    population as f64 * f64::from(factor) / rate
}
