//! Historical daily temperatures from the open-meteo ERA5 archive.
//!
//! One work item covers one city over the whole configured date range; a
//! single response carries ~10 years of daily values, so the ledger write is
//! the bulk of the work and the probe treats any stored day as "complete".

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::collectors::{Collector, StoreSummary};
use crate::config::ApiConfig;
use crate::database_ops::db::Db;
use crate::database_ops::ledger::{
    ensure_location, insert_daily_if_absent, location_day_count, DailyTemperature, InsertOutcome,
    Presence,
};
use crate::fetch::{FetchClient, FetchFailure, FetchOutcome};
use crate::util::env::{env_opt, env_parse};
use crate::work::{weather_cities, WorkItem};

const DAILY_PARAMS: &str = "temperature_2m_mean";

pub struct WeatherCollector {
    endpoint: Url,
    start_date: String,
    end_date: String,
    delay: Duration,
}

impl WeatherCollector {
    pub fn new(api: &ApiConfig) -> Self {
        Self {
            endpoint: api.weather_endpoint.clone(),
            start_date: env_opt("WEATHER_START_DATE").unwrap_or_else(|| "2013-01-01".into()),
            end_date: env_opt("WEATHER_END_DATE").unwrap_or_else(|| "2022-12-31".into()),
            delay: Duration::from_millis(env_parse("WEATHER_DELAY_MS", 1_000u64)),
        }
    }
}

/// Zip the `daily.time` and `daily.temperature_2m_mean` arrays into records.
/// Missing arrays yield an empty sequence; a per-day null is preserved as
/// `None`, not dropped.
pub fn extract_daily(payload: &Value) -> Vec<DailyTemperature> {
    let Some(daily) = payload.get("daily") else {
        return Vec::new();
    };
    let dates = daily.get("time").and_then(|v| v.as_array());
    let temps = daily.get(DAILY_PARAMS).and_then(|v| v.as_array());
    let (Some(dates), Some(temps)) = (dates, temps) else {
        return Vec::new();
    };
    dates
        .iter()
        .zip(temps.iter())
        .filter_map(|(date, temp)| {
            Some(DailyTemperature {
                date: date.as_str()?.to_string(),
                temperature_c: temp.as_f64(),
            })
        })
        .collect()
}

#[async_trait]
impl Collector for WeatherCollector {
    fn collection(&self) -> &'static str {
        "weather"
    }

    fn request_delay(&self) -> Duration {
        self.delay
    }

    fn work_items(&self) -> Vec<WorkItem> {
        weather_cities()
    }

    /// Pre-create every location row so daily inserts always have their
    /// foreign key, mirroring the one-time setup pass of the original job.
    async fn setup(&self, db: &Db) -> Result<()> {
        for item in self.work_items() {
            if let WorkItem::City {
                name,
                latitude,
                longitude,
            } = item
            {
                ensure_location(db, &name, latitude, longitude).await?;
            }
        }
        Ok(())
    }

    async fn probe(&self, db: &Db, item: &WorkItem) -> Result<Presence> {
        let WorkItem::City { name, .. } = item else {
            return Ok(Presence::Absent);
        };
        if location_day_count(db, name).await? > 0 {
            Ok(Presence::Complete)
        } else {
            Ok(Presence::Absent)
        }
    }

    async fn fetch_item(&self, http: &FetchClient, item: &WorkItem) -> FetchOutcome {
        let WorkItem::City {
            latitude,
            longitude,
            ..
        } = item
        else {
            return FetchOutcome::Failure(FetchFailure::Malformed("unexpected work item".into()));
        };
        let query = [
            ("latitude", latitude.to_string()),
            ("longitude", longitude.to_string()),
            ("start_date", self.start_date.clone()),
            ("end_date", self.end_date.clone()),
            ("daily", DAILY_PARAMS.to_string()),
            ("timezone", "UTC".to_string()),
        ];
        match http.get_json(self.endpoint.clone(), &query).await {
            FetchOutcome::Success(payload) => {
                if extract_daily(&payload).is_empty() {
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
        item: &WorkItem,
        payload: &Value,
        _presence: Presence,
    ) -> Result<StoreSummary> {
        let WorkItem::City {
            name,
            latitude,
            longitude,
        } = item
        else {
            return Ok(StoreSummary::default());
        };
        let location_id = ensure_location(db, name, *latitude, *longitude).await?;
        let mut summary = StoreSummary::default();
        for record in extract_daily(payload) {
            match insert_daily_if_absent(db, location_id, &record).await? {
                InsertOutcome::Inserted => summary.inserted += 1,
                InsertOutcome::AlreadyPresent => summary.already_present += 1,
            }
        }
        Ok(summary)
    }
}
