//! Movie metadata from OMDb, one title per work item.
//!
//! OMDb answers unknown titles with HTTP 200 and `Response: "False"`; that
//! is classified as an empty response, not a failure. A stored movie whose
//! year is NULL is re-fetched under quota and patched with an explicit
//! update instead of an insert.

use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::collectors::{Collector, StoreSummary};
use crate::config::ApiConfig;
use crate::database_ops::db::Db;
use crate::database_ops::ledger::{
    insert_movie_if_absent, movie_presence, update_movie_year, InsertOutcome, MovieRecord,
    Presence,
};
use crate::fetch::{FetchClient, FetchFailure, FetchOutcome};
use crate::normalization::{money::parse_money, year::truncate_year};
use crate::util::env::env_parse;
use crate::work::{movie_titles, WorkItem};

pub struct MoviesCollector {
    endpoint: Url,
    api_key: String,
    delay: Duration,
}

impl MoviesCollector {
    pub fn new(api: &ApiConfig) -> Result<Self> {
        let Some(api_key) = api.omdb_api_key.clone() else {
            bail!("OMDB_API_KEY is required for the movies collection");
        };
        Ok(Self {
            endpoint: api.omdb_endpoint.clone(),
            api_key,
            delay: Duration::from_millis(env_parse("OMDB_DELAY_MS", 1_000u64)),
        })
    }
}

/// Subset of the OMDb payload we persist; unknown fields are ignored.
#[derive(Debug, Default, Deserialize)]
struct OmdbPayload {
    #[serde(rename = "Title")]
    title: Option<String>,
    #[serde(rename = "Year")]
    year: Option<String>,
    #[serde(rename = "Genre")]
    genre: Option<String>,
    #[serde(rename = "BoxOffice")]
    box_office: Option<String>,
}

/// Normalize one OMDb payload into a movie record. Absent fields become
/// `None`; the requested title is the fallback when the payload carries none.
pub fn extract_movie(requested_title: &str, payload: &Value) -> MovieRecord {
    let parsed: OmdbPayload = serde_json::from_value(payload.clone()).unwrap_or_default();
    MovieRecord {
        title: parsed
            .title
            .unwrap_or_else(|| requested_title.to_string()),
        box_office: parsed.box_office.as_deref().and_then(parse_money),
        genres: parsed.genre.filter(|s| !s.is_empty()),
        year: parsed.year.as_deref().and_then(truncate_year),
    }
}

#[async_trait]
impl Collector for MoviesCollector {
    fn collection(&self) -> &'static str {
        "movies"
    }

    fn request_delay(&self) -> Duration {
        self.delay
    }

    fn work_items(&self) -> Vec<WorkItem> {
        movie_titles()
    }

    async fn probe(&self, db: &Db, item: &WorkItem) -> Result<Presence> {
        let WorkItem::Title { title } = item else {
            return Ok(Presence::Absent);
        };
        movie_presence(db, title).await
    }

    async fn fetch_item(&self, http: &FetchClient, item: &WorkItem) -> FetchOutcome {
        let WorkItem::Title { title } = item else {
            return FetchOutcome::Failure(FetchFailure::Malformed("unexpected work item".into()));
        };
        let query = [("t", title.clone()), ("apikey", self.api_key.clone())];
        match http.get_json(self.endpoint.clone(), &query).await {
            FetchOutcome::Success(payload) => {
                let not_found = payload.get("Response").and_then(|v| v.as_str()) == Some("False");
                if not_found {
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
        presence: Presence,
    ) -> Result<StoreSummary> {
        let WorkItem::Title { title } = item else {
            return Ok(StoreSummary::default());
        };
        let record = extract_movie(title, payload);
        let mut summary = StoreSummary::default();
        if presence == Presence::NeedsUpdate {
            // The probed row is keyed by the requested title, which may
            // differ from the canonical title OMDb returns.
            update_movie_year(db, title, record.year).await?;
            summary.updated += 1;
            return Ok(summary);
        }
        match insert_movie_if_absent(db, &record).await? {
            InsertOutcome::Inserted => summary.inserted += 1,
            InsertOutcome::AlreadyPresent => {
                // Same canonical title reached via a different request
                // string; patch the year like the needs-update path.
                if record.year.is_some() {
                    update_movie_year(db, &record.title, record.year).await?;
                    summary.updated += 1;
                } else {
                    summary.already_present += 1;
                }
            }
        }
        Ok(summary)
    }
}
