//! Runtime configuration for the cfx daemon and CLI.
//!
//! # Contract
//! - Everything is read from environment variables **once** at startup via
//!   [`AppConfig::from_env`]; the result is passed into constructors.
//!   Never scatter `std::env::var` calls across the codebase.
//! - `.env.local` is loaded first when present (dev convenience). Production
//!   injects env vars directly.
//! - The database URL carries a password; `Debug` redacts it.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

pub const ENV_COUNTRIES_URL: &str = "CFX_COUNTRIES_URL";
pub const ENV_RATES_URL: &str = "CFX_RATES_URL";
pub const ENV_DATABASE_URL: &str = "CFX_DATABASE_URL";
pub const ENV_DB_USER: &str = "CFX_DB_USER";
pub const ENV_DB_PASSWORD: &str = "CFX_DB_PASSWORD";
pub const ENV_DB_HOST: &str = "CFX_DB_HOST";
pub const ENV_DB_NAME: &str = "CFX_DB_NAME";
pub const ENV_DAEMON_ADDR: &str = "CFX_DAEMON_ADDR";
pub const ENV_CACHE_DIR: &str = "CFX_CACHE_DIR";
pub const ENV_FETCH_TIMEOUT_SECS: &str = "CFX_FETCH_TIMEOUT_SECS";
pub const ENV_REFRESH_INTERVAL_SECS: &str = "CFX_REFRESH_INTERVAL_SECS";
pub const ENV_STORE: &str = "CFX_STORE";

pub const DEFAULT_COUNTRIES_URL: &str =
    "https://restcountries.com/v2/all?fields=name,capital,region,population,flag,currencies";
pub const DEFAULT_RATES_URL: &str = "https://open.er-api.com/v6/latest/USD";
pub const DEFAULT_CACHE_DIR: &str = "cache";
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

pub fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8899))
}

/// Where country rows are persisted.
#[derive(Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Postgres { url: String },
    /// Process-local store; rows are lost on restart.
    Memory,
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Never print the URL; it embeds the password.
            StoreConfig::Postgres { .. } => f.write_str("Postgres { url: <REDACTED> }"),
            StoreConfig::Memory => f.write_str("Memory"),
        }
    }
}

/// Resolved application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub countries_url: String,
    pub rates_url: String,
    pub store: StoreConfig,
    pub bind_addr: SocketAddr,
    pub cache_dir: PathBuf,
    pub fetch_timeout: Duration,
    /// `None` disables the periodic refresh task.
    pub refresh_interval: Option<Duration>,
}

impl AppConfig {
    /// Load `.env.local` (if present) and resolve from the process environment.
    pub fn from_env() -> Result<Self> {
        // Silent if the file does not exist.
        let _ = dotenvy::from_filename(".env.local");
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Resolve from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let store = resolve_store(&get)?;

        let bind_addr = match get(ENV_DAEMON_ADDR) {
            Some(s) => s
                .parse()
                .with_context(|| format!("{ENV_DAEMON_ADDR} is not a socket address: {s}"))?,
            None => default_bind_addr(),
        };

        let fetch_timeout = match get(ENV_FETCH_TIMEOUT_SECS) {
            Some(s) => Duration::from_secs(parse_secs(ENV_FETCH_TIMEOUT_SECS, &s)?),
            None => DEFAULT_FETCH_TIMEOUT,
        };

        let refresh_interval = get(ENV_REFRESH_INTERVAL_SECS)
            .map(|s| parse_secs(ENV_REFRESH_INTERVAL_SECS, &s).map(Duration::from_secs))
            .transpose()?;

        Ok(Self {
            countries_url: get(ENV_COUNTRIES_URL).unwrap_or_else(|| DEFAULT_COUNTRIES_URL.to_string()),
            rates_url: get(ENV_RATES_URL).unwrap_or_else(|| DEFAULT_RATES_URL.to_string()),
            store,
            bind_addr,
            cache_dir: PathBuf::from(get(ENV_CACHE_DIR).unwrap_or_else(|| DEFAULT_CACHE_DIR.to_string())),
            fetch_timeout,
            refresh_interval,
        })
    }

    /// The Postgres URL, or an error naming the env vars to set.
    pub fn database_url(&self) -> Result<&str> {
        match &self.store {
            StoreConfig::Postgres { url } => Ok(url),
            StoreConfig::Memory => bail!(
                "no database configured: set {ENV_DATABASE_URL} or {ENV_DB_USER}/{ENV_DB_PASSWORD}/{ENV_DB_HOST}/{ENV_DB_NAME}"
            ),
        }
    }
}

fn resolve_store<G>(get: &G) -> Result<StoreConfig>
where
    G: Fn(&str) -> Option<String>,
{
    if let Some(kind) = get(ENV_STORE) {
        match kind.to_ascii_lowercase().as_str() {
            "memory" => return Ok(StoreConfig::Memory),
            "postgres" => {}
            other => bail!("{ENV_STORE} must be 'postgres' or 'memory', got '{other}'"),
        }
    }

    if let Some(url) = get(ENV_DATABASE_URL) {
        return Ok(StoreConfig::Postgres { url });
    }

    match (get(ENV_DB_USER), get(ENV_DB_PASSWORD), get(ENV_DB_HOST), get(ENV_DB_NAME)) {
        (Some(user), Some(pass), Some(host), Some(name)) => Ok(StoreConfig::Postgres {
            url: format!("postgres://{user}:{pass}@{host}/{name}"),
        }),
        (None, None, None, None) => bail!(
            "missing database config: set {ENV_DATABASE_URL}, the {ENV_DB_USER}/{ENV_DB_PASSWORD}/{ENV_DB_HOST}/{ENV_DB_NAME} set, or {ENV_STORE}=memory"
        ),
        _ => bail!(
            "incomplete database config: {ENV_DB_USER}, {ENV_DB_PASSWORD}, {ENV_DB_HOST} and {ENV_DB_NAME} must all be set"
        ),
    }
}

fn parse_secs(key: &str, raw: &str) -> Result<u64> {
    let n: u64 = raw
        .parse()
        .with_context(|| format!("{key} must be a whole number of seconds, got '{raw}'"))?;
    if n == 0 {
        bail!("{key} must be greater than zero");
    }
    Ok(n)
}
