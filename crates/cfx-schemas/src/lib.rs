//! cfx-schemas
//!
//! Shared data model for the country FX desk: the persisted country row,
//! the per-refresh outcome, and the query/status shapes used by the HTTP
//! surface and the CLI. No IO lives here.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder used when upstream omits `capital`.
pub const DEFAULT_CAPITAL: &str = "N/A";
/// Placeholder used when upstream omits `region`.
pub const DEFAULT_REGION: &str = "Unknown";

/// Max names echoed back per created/updated list in a [`RefreshOutcome`].
pub const OUTCOME_NAME_LIMIT: usize = 10;

// ---------------------------------------------------------------------------
// CountryRecord
// ---------------------------------------------------------------------------

/// One persisted country row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryRecord {
    pub id: i64,
    pub name: String,
    pub capital: String,
    pub region: String,
    pub population: i64,
    pub currency_code: Option<String>,
    pub exchange_rate: Option<f64>,
    pub estimated_gdp: f64,
    pub flag_url: String,
    pub last_refreshed_at: DateTime<Utc>,
}

/// A country write produced by reconciliation, before storage assigns an id.
///
/// Stores upsert these by case-insensitive `name`.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryWrite {
    pub name: String,
    pub capital: String,
    pub region: String,
    pub population: i64,
    pub currency_code: Option<String>,
    pub exchange_rate: Option<f64>,
    pub estimated_gdp: f64,
    pub flag_url: String,
}

impl CountryWrite {
    pub fn into_record(self, id: i64, refreshed_at: DateTime<Utc>) -> CountryRecord {
        CountryRecord {
            id,
            name: self.name,
            capital: self.capital,
            region: self.region,
            population: self.population,
            currency_code: self.currency_code,
            exchange_rate: self.exchange_rate,
            estimated_gdp: self.estimated_gdp,
            flag_url: self.flag_url,
            last_refreshed_at: refreshed_at,
        }
    }
}

/// The natural key used for upsert matching.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

// ---------------------------------------------------------------------------
// RefreshOutcome
// ---------------------------------------------------------------------------

/// Summary of one reconciliation run. Returned to the caller, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshOutcome {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    /// First [`OUTCOME_NAME_LIMIT`] created names, in feed order.
    pub created_countries: Vec<String>,
    /// First [`OUTCOME_NAME_LIMIT`] updated names, in feed order.
    pub updated_countries: Vec<String>,
    /// Every skipped entry as `"<name> (<reason>)"`.
    pub skipped_countries: Vec<String>,
    pub message: String,
    pub last_refreshed_at: DateTime<Utc>,
}

impl RefreshOutcome {
    /// Build the outcome from the full name lists; created/updated are truncated,
    /// counts are not.
    pub fn from_lists(
        created: Vec<String>,
        updated: Vec<String>,
        skipped: Vec<String>,
        refreshed_at: DateTime<Utc>,
    ) -> Self {
        let message = format!(
            "Created {} and updated {} countries. Skipped {}.",
            created.len(),
            updated.len(),
            skipped.len()
        );
        Self {
            created: created.len(),
            updated: updated.len(),
            skipped: skipped.len(),
            created_countries: created.into_iter().take(OUTCOME_NAME_LIMIT).collect(),
            updated_countries: updated.into_iter().take(OUTCOME_NAME_LIMIT).collect(),
            skipped_countries: skipped,
            message,
            last_refreshed_at: refreshed_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Sort order accepted by `GET /countries?sort=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    GdpDesc,
    GdpAsc,
    PopulationDesc,
    PopulationAsc,
    #[default]
    NameAsc,
    NameDesc,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::GdpDesc => "gdp_desc",
            SortKey::GdpAsc => "gdp_asc",
            SortKey::PopulationDesc => "population_desc",
            SortKey::PopulationAsc => "population_asc",
            SortKey::NameAsc => "name_asc",
            SortKey::NameDesc => "name_desc",
        }
    }

    /// Lenient parse: absent or unrecognized keys fall back to `name_asc`.
    pub fn parse_or_default(s: Option<&str>) -> Self {
        match s.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("gdp_desc") => SortKey::GdpDesc,
            Some("gdp_asc") => SortKey::GdpAsc,
            Some("population_desc") => SortKey::PopulationDesc,
            Some("population_asc") => SortKey::PopulationAsc,
            Some("name_desc") => SortKey::NameDesc,
            _ => SortKey::NameAsc,
        }
    }

    /// Row ordering for this key. Ties fall back to `id` so output is stable.
    pub fn compare(&self, a: &CountryRecord, b: &CountryRecord) -> Ordering {
        let primary = match self {
            SortKey::GdpDesc => b.estimated_gdp.total_cmp(&a.estimated_gdp),
            SortKey::GdpAsc => a.estimated_gdp.total_cmp(&b.estimated_gdp),
            SortKey::PopulationDesc => b.population.cmp(&a.population),
            SortKey::PopulationAsc => a.population.cmp(&b.population),
            SortKey::NameAsc => a.name.cmp(&b.name),
            SortKey::NameDesc => b.name.cmp(&a.name),
        };
        primary.then(a.id.cmp(&b.id))
    }
}

/// Filters + sort for a country listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Case-insensitive substring of `region`.
    pub region: Option<String>,
    /// Exact currency code; matched upper-cased.
    pub currency: Option<String>,
    pub sort: SortKey,
}

impl ListQuery {
    /// Build from raw query-string values. Blank filters count as absent.
    pub fn from_params(region: Option<&str>, currency: Option<&str>, sort: Option<&str>) -> Self {
        Self {
            region: non_blank(region).map(str::to_string),
            currency: non_blank(currency).map(str::to_uppercase),
            sort: SortKey::parse_or_default(sort),
        }
    }

    pub fn matches(&self, rec: &CountryRecord) -> bool {
        if let Some(region) = &self.region {
            if !rec.region.to_lowercase().contains(&region.to_lowercase()) {
                return false;
            }
        }
        if let Some(code) = &self.currency {
            if rec.currency_code.as_deref() != Some(code.to_uppercase().as_str()) {
                return false;
            }
        }
        true
    }

    /// Filter and sort an in-memory record set.
    pub fn apply(&self, records: impl IntoIterator<Item = CountryRecord>) -> Vec<CountryRecord> {
        let mut out: Vec<CountryRecord> = records.into_iter().filter(|r| self.matches(r)).collect();
        out.sort_by(|a, b| self.sort.compare(a, b));
        out
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|v| !v.is_empty())
}

/// Aggregate store status for `GET /countries/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub total_countries: i64,
    pub last_refreshed_at: Option<DateTime<Utc>>,
}

// -----------------
// Tests
// -----------------
