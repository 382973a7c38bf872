//! Explicit configuration passed into components at construction.
//! Everything here is resolved once from env/CLI; no module holds ambient
//! keys or connection handles.

use std::time::Duration;

use anyhow::{Context, Result};
use url::Url;

use crate::util::env::{env_opt, env_parse};

/// External API endpoints and credentials for every collection.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub weather_endpoint: Url,
    pub omdb_endpoint: Url,
    pub omdb_api_key: Option<String>,
    pub countrylayer_endpoint: Url,
    pub countrylayer_api_key: Option<String>,
    pub food_endpoint: Url,
    pub user_agent: String,
    pub timeout: Duration,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self> {
        crate::util::env::init_env();
        Ok(Self {
            weather_endpoint: endpoint(
                "WEATHER_API_URL",
                "https://archive-api.open-meteo.com/v1/era5",
            )?,
            omdb_endpoint: endpoint("OMDB_API_URL", "http://www.omdbapi.com/")?,
            omdb_api_key: env_opt("OMDB_API_KEY"),
            // Trailing slash matters: relative joins below this base must not
            // replace the version segment.
            countrylayer_endpoint: endpoint(
                "COUNTRYLAYER_API_URL",
                "https://api.countrylayer.com/v2/",
            )?,
            countrylayer_api_key: env_opt("COUNTRYLAYER_API_KEY"),
            food_endpoint: endpoint("FOOD_API_URL", "https://world.openfoodfacts.org/")?,
            user_agent: env_opt("HTTP_USER_AGENT")
                .unwrap_or_else(|| "almanac/0.1 (course project)".into()),
            timeout: Duration::from_secs(env_parse("HTTP_TIMEOUT_SECS", 15u64)),
        })
    }
}

fn endpoint(key: &str, default: &str) -> Result<Url> {
    let raw = env_opt(key).unwrap_or_else(|| default.to_string());
    Url::parse(&raw).with_context(|| format!("invalid URL in {key}: {raw}"))
}

/// Per-run ingestion knobs.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Per-invocation cap on fetch attempts. Probe-skips do not count.
    pub quota: u32,
}

impl IngestConfig {
    pub fn from_env(quota_override: Option<u32>) -> Self {
        Self {
            quota: quota_override.unwrap_or_else(|| env_parse("MAX_ITEMS_PER_RUN", 25u32)),
        }
    }
}

/// Resolve the SQLite path: CLI flag, then ALMANAC_DB, then the default file.
pub fn db_path(cli_override: Option<String>) -> String {
    cli_override
        .or_else(|| env_opt("ALMANAC_DB"))
        .unwrap_or_else(|| "almanac.db".into())
}
