//! Country statistics from the CountryLayer API, one country per work item.
//!
//! The endpoint answers with a JSON array of matches; logical API errors
//! arrive as HTTP 200 with an `error` object and are treated as an empty
//! response (no usable data), matching how per-item problems are recovered
//! everywhere else.

use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::collectors::{Collector, StoreSummary};
use crate::config::ApiConfig;
use crate::database_ops::db::Db;
use crate::database_ops::ledger::{
    country_exists, insert_country_if_absent, CountryRecord, InsertOutcome, Presence,
};
use crate::fetch::{FetchClient, FetchFailure, FetchOutcome};
use crate::util::env::env_parse;
use crate::work::{country_names, WorkItem};

pub struct CountriesCollector {
    endpoint: Url,
    api_key: String,
    delay: Duration,
}

impl CountriesCollector {
    pub fn new(api: &ApiConfig) -> Result<Self> {
        let Some(api_key) = api.countrylayer_api_key.clone() else {
            bail!("COUNTRYLAYER_API_KEY is required for the countries collection");
        };
        Ok(Self {
            endpoint: api.countrylayer_endpoint.clone(),
            api_key,
            delay: Duration::from_millis(env_parse("COUNTRYLAYER_DELAY_MS", 1_000u64)),
        })
    }
}

/// Normalize a name-search response (array of country objects) into records.
/// Entries without a name are dropped; every other field is optional.
pub fn extract_countries(payload: &Value) -> Vec<CountryRecord> {
    let Some(entries) = payload.as_array() else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            let name = entry.get("name")?.as_str()?.to_string();
            let latlng = entry.get("latlng").and_then(|v| v.as_array());
            Some(CountryRecord {
                name,
                capital: entry
                    .get("capital")
                    .and_then(|v| v.as_str())
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
                population: entry.get("population").and_then(|v| v.as_i64()),
                latitude: latlng.and_then(|c| c.first()).and_then(|v| v.as_f64()),
                longitude: latlng.and_then(|c| c.get(1)).and_then(|v| v.as_f64()),
            })
        })
        .collect()
}

#[async_trait]
impl Collector for CountriesCollector {
    fn collection(&self) -> &'static str {
        "countries"
    }

    fn request_delay(&self) -> Duration {
        self.delay
    }

    fn work_items(&self) -> Vec<WorkItem> {
        country_names()
    }

    async fn probe(&self, db: &Db, item: &WorkItem) -> Result<Presence> {
        let WorkItem::Country { name } = item else {
            return Ok(Presence::Absent);
        };
        if country_exists(db, name).await? {
            Ok(Presence::Complete)
        } else {
            Ok(Presence::Absent)
        }
    }

    async fn fetch_item(&self, http: &FetchClient, item: &WorkItem) -> FetchOutcome {
        let WorkItem::Country { name } = item else {
            return FetchOutcome::Failure(FetchFailure::Malformed("unexpected work item".into()));
        };
        let url = match self
            .endpoint
            .join(&format!("name/{}", urlencoding::encode(name)))
        {
            Ok(url) => url,
            Err(err) => {
                return FetchOutcome::Failure(FetchFailure::Malformed(err.to_string()));
            }
        };
        let query = [
            ("access_key", self.api_key.clone()),
            ("fullText", "true".to_string()),
        ];
        match http.get_json(url, &query).await {
            FetchOutcome::Success(payload) => {
                let api_error = payload.get("error").is_some();
                if api_error || extract_countries(&payload).is_empty() {
                    FetchOutcome::Empty
                } else {
                    FetchOutcome::Success(payload)
                }
            }
            other => other,
        }
    }

    async fn store(
        &self,
        db: &Db,
        _item: &WorkItem,
        payload: &Value,
        _presence: Presence,
    ) -> Result<StoreSummary> {
        let mut summary = StoreSummary::default();
        for record in extract_countries(payload) {
            match insert_country_if_absent(db, &record).await? {
                InsertOutcome::Inserted => summary.inserted += 1,
                InsertOutcome::AlreadyPresent => summary.already_present += 1,
            }
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_optional_fields() {
        let payload = json!([{
            "name": "France",
            "capital": "Paris",
            "population": 67_000_000i64,
            "latlng": [46.0, 2.0]
        }]);
        let records = extract_countries(&payload);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].capital.as_deref(), Some("Paris"));
        assert_eq!(records[0].population, Some(67_000_000));
        assert_eq!(records[0].latitude, Some(46.0));
        assert_eq!(records[0].longitude, Some(2.0));
    }

    #[test]
    fn missing_fields_become_none() {
        let payload = json!([{"name": "Atlantis"}]);
        let records = extract_countries(&payload);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].capital, None);
        assert_eq!(records[0].population, None);
        assert_eq!(records[0].latitude, None);
    }

    #[test]
    fn nameless_entries_and_non_arrays_are_dropped() {
        assert!(extract_countries(&json!([{"capital": "Nowhere"}])).is_empty());
        assert!(extract_countries(&json!({"error": {"info": "bad key"}})).is_empty());
    }
}
