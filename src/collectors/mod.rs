//! One module per external API. Each collector owns its work list, its
//! rate-limit delay, and the fetch/extract/store path for its records; the
//! batch runner in `crate::ingest` drives them all through the same
//! checkpointed loop.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::database_ops::db::Db;
use crate::database_ops::ledger::Presence;
use crate::fetch::{FetchClient, FetchOutcome};
use crate::work::WorkItem;

pub mod countries;
pub mod food;
pub mod movies;
pub mod weather;

/// Per-item write tally reported back to the batch runner.
#[derive(Debug, Default, Clone, Copy)]
pub struct StoreSummary {
    pub inserted: u64,
    pub updated: u64,
    pub already_present: u64,
}

#[async_trait]
pub trait Collector: Send + Sync {
    /// Stable name; keys the ingest cursor row.
    fn collection(&self) -> &'static str;

    /// Fixed inter-request delay honoring the API's documented rate limit.
    fn request_delay(&self) -> Duration;

    /// The static, ordered work list. Order is part of the cursor contract.
    fn work_items(&self) -> Vec<WorkItem>;

    /// One-time initialization, gated by the cursor's setup flag.
    async fn setup(&self, _db: &Db) -> Result<()> {
        Ok(())
    }

    /// Classify the item against the ledger before spending quota on it.
    async fn probe(&self, db: &Db, item: &WorkItem) -> Result<Presence>;

    /// One bounded request for this item. Domain-level "nothing here"
    /// responses are classified as `Empty` so the runner skips the write.
    async fn fetch_item(&self, http: &FetchClient, item: &WorkItem) -> FetchOutcome;

    /// Extract records from a successful payload and write them through the
    /// ledger. Errors are storage faults and abort the run.
    async fn store(
        &self,
        db: &Db,
        item: &WorkItem,
        payload: &Value,
        presence: Presence,
    ) -> Result<StoreSummary>;
}
