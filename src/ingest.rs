//! The checkpointed batch runner shared by every collection.
//!
//! Per run: load the cursor, walk the static work list from there, spend at
//! most `quota` fetch attempts, write through the ledger, and advance the
//! cursor one item at a time, only after that item's records are committed.
//! A malformed or failed item is logged and left behind; a ledger or cursor
//! fault aborts the run so the resumption guarantee is never weakened.
//!
//! Cursor unit: work items attempted (or probe-skipped). Failed items are
//! not retried within a run; a later run starts past them, and records with
//! missing fields come back into scope through the needs-update probe.

use anyhow::Result;
use tracing::{info, warn};

use crate::collectors::Collector;
use crate::config::IngestConfig;
use crate::database_ops::{checkpoint, db::Db, ledger::Presence};
use crate::fetch::{FetchClient, FetchOutcome};

/// Outcome tallies for one run; everything the operator sees at exit.
#[derive(Debug, Default, Clone)]
pub struct RunReport {
    pub collection: &'static str,
    pub offset_start: i64,
    pub offset_end: i64,
    pub attempted: u32,
    pub skipped: u32,
    pub fetched: u32,
    pub empty: u32,
    pub failed: u32,
    pub inserted: u64,
    pub updated: u64,
    pub already_present: u64,
}

impl RunReport {
    pub fn print_summary(&self) {
        println!(
            "[{}] run complete attempted={} fetched={} empty={} failed={} skipped={} inserted={} updated={} already_present={} cursor {}->{}",
            self.collection,
            self.attempted,
            self.fetched,
            self.empty,
            self.failed,
            self.skipped,
            self.inserted,
            self.updated,
            self.already_present,
            self.offset_start,
            self.offset_end,
        );
    }
}

/// Run one quota-bounded batch for a collection. Clean exit whether the
/// quota or the work list runs out first; storage faults are fatal.
pub async fn run_batch(
    collector: &dyn Collector,
    db: &Db,
    http: &FetchClient,
    cfg: &IngestConfig,
) -> Result<RunReport> {
    let collection = collector.collection();
    let items = collector.work_items();

    let offset_start = checkpoint::load(db, collection).await?;
    if !checkpoint::setup_complete(db, collection).await? {
        collector.setup(db).await?;
        checkpoint::mark_setup_complete(db, collection).await?;
        info!(collection, "one-time setup complete");
    }

    let mut report = RunReport {
        collection,
        offset_start,
        offset_end: offset_start,
        ..RunReport::default()
    };
    let mut offset = offset_start.max(0) as usize;
    let mut remaining = cfg.quota;
    let mut fetched_before = false;

    info!(
        collection,
        offset, quota = cfg.quota, total_items = items.len(), "starting batch"
    );

    while offset < items.len() && remaining > 0 {
        let item = &items[offset];
        let presence = collector.probe(db, item).await?;
        if presence == Presence::Complete {
            info!(collection, item = %item.key(), "skipped: already in ledger");
            report.skipped += 1;
            offset += 1;
            report.offset_end = checkpoint::advance(db, collection, 1).await?;
            continue;
        }

        // Fixed spacing between consecutive outbound requests; probe-skips
        // in between do not reset it.
        if fetched_before {
            tokio::time::sleep(collector.request_delay()).await;
        }
        fetched_before = true;
        remaining -= 1;
        report.attempted += 1;

        match collector.fetch_item(http, item).await {
            FetchOutcome::Success(payload) => {
                let stored = collector.store(db, item, &payload, presence).await?;
                report.fetched += 1;
                report.inserted += stored.inserted;
                report.updated += stored.updated;
                report.already_present += stored.already_present;
                info!(
                    collection,
                    item = %item.key(),
                    inserted = stored.inserted,
                    updated = stored.updated,
                    already_present = stored.already_present,
                    "fetched"
                );
            }
            FetchOutcome::Empty => {
                report.empty += 1;
                info!(collection, item = %item.key(), "empty response; nothing written");
            }
            FetchOutcome::Failure(reason) => {
                report.failed += 1;
                warn!(collection, item = %item.key(), reason = %reason, "fetch failed");
            }
        }

        offset += 1;
        report.offset_end = checkpoint::advance(db, collection, 1).await?;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use crate::collectors::movies::extract_movie;
    use crate::collectors::StoreSummary;
    use crate::database_ops::ledger::{
        insert_movie_if_absent, movie_presence, scan_movies, update_movie_year, InsertOutcome,
        MovieRecord,
    };
    use crate::fetch::FetchFailure;
    use crate::work::WorkItem;

    /// Network-free collector: canned outcomes keyed by title, writing real
    /// movie rows so probes and idempotence work against the real ledger.
    struct ScriptedCollector {
        items: Vec<WorkItem>,
        outcomes: HashMap<String, FetchOutcome>,
        fetch_log: Mutex<Vec<String>>,
    }

    impl ScriptedCollector {
        fn new(titles: &[&str]) -> Self {
            let outcomes = titles
                .iter()
                .map(|t| {
                    (
                        t.to_string(),
                        FetchOutcome::Success(json!({
                            "Title": t,
                            "Year": "2020",
                            "BoxOffice": "$1,000,000",
                            "Response": "True"
                        })),
                    )
                })
                .collect();
            Self {
                items: titles
                    .iter()
                    .map(|t| WorkItem::Title {
                        title: t.to_string(),
                    })
                    .collect(),
                outcomes,
                fetch_log: Mutex::new(Vec::new()),
            }
        }

        fn with_outcome(mut self, title: &str, outcome: FetchOutcome) -> Self {
            self.outcomes.insert(title.to_string(), outcome);
            self
        }

        fn fetches(&self) -> Vec<String> {
            self.fetch_log.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Collector for ScriptedCollector {
        fn collection(&self) -> &'static str {
            "scripted"
        }

        fn request_delay(&self) -> Duration {
            Duration::ZERO
        }

        fn work_items(&self) -> Vec<WorkItem> {
            self.items.clone()
        }

        async fn probe(&self, db: &Db, item: &WorkItem) -> Result<Presence> {
            let WorkItem::Title { title } = item else {
                return Ok(Presence::Absent);
            };
            movie_presence(db, title).await
        }

        async fn fetch_item(&self, _http: &FetchClient, item: &WorkItem) -> FetchOutcome {
            let key = item.key();
            self.fetch_log.lock().unwrap().push(key.clone());
            self.outcomes
                .get(&key)
                .cloned()
                .unwrap_or(FetchOutcome::Empty)
        }

        async fn store(
            &self,
            db: &Db,
            item: &WorkItem,
            payload: &Value,
            presence: Presence,
        ) -> Result<StoreSummary> {
            let record = extract_movie(&item.key(), payload);
            let mut summary = StoreSummary::default();
            if presence == Presence::NeedsUpdate {
                update_movie_year(db, &item.key(), record.year).await?;
                summary.updated += 1;
                return Ok(summary);
            }
            match insert_movie_if_absent(db, &record).await? {
                InsertOutcome::Inserted => summary.inserted += 1,
                InsertOutcome::AlreadyPresent => summary.already_present += 1,
            }
            Ok(summary)
        }
    }

    async fn test_db() -> Db {
        Db::connect(":memory:", 1).await.unwrap()
    }

    fn http() -> FetchClient {
        FetchClient::new(Duration::from_secs(1), "almanac-tests").unwrap()
    }

    fn quota(n: u32) -> IngestConfig {
        IngestConfig { quota: n }
    }

    #[tokio::test]
    async fn quota_bounds_fetch_attempts() {
        let titles: Vec<String> = (0..100).map(|i| format!("t{i:03}")).collect();
        let refs: Vec<&str> = titles.iter().map(String::as_str).collect();
        let collector = ScriptedCollector::new(&refs);
        let db = test_db().await;

        let report = run_batch(&collector, &db, &http(), &quota(25)).await.unwrap();
        assert_eq!(report.attempted, 25);
        assert_eq!(report.offset_end, 25);
        assert_eq!(collector.fetches().len(), 25);
        assert_eq!(checkpoint::load(&db, "scripted").await.unwrap(), 25);
    }

    #[tokio::test]
    async fn three_items_quota_two_resumes_and_drains() {
        let collector = ScriptedCollector::new(&["a", "b", "c"]);
        let db = test_db().await;
        let http = http();

        let run1 = run_batch(&collector, &db, &http, &quota(2)).await.unwrap();
        assert_eq!(run1.attempted, 2);
        assert_eq!(checkpoint::load(&db, "scripted").await.unwrap(), 2);

        let run2 = run_batch(&collector, &db, &http, &quota(2)).await.unwrap();
        assert_eq!(run2.attempted, 1);
        assert_eq!(checkpoint::load(&db, "scripted").await.unwrap(), 3);

        // Offset past the end of the list: attempts nothing, exits cleanly.
        let run3 = run_batch(&collector, &db, &http, &quota(2)).await.unwrap();
        assert_eq!(run3.attempted, 0);
        assert_eq!(run3.skipped, 0);
        assert_eq!(checkpoint::load(&db, "scripted").await.unwrap(), 3);

        // No successful item was ever re-fetched, none was dropped.
        assert_eq!(collector.fetches(), vec!["a", "b", "c"]);
        assert_eq!(scan_movies(&db).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn double_run_never_duplicates_ledger_entries() {
        let collector = ScriptedCollector::new(&["x", "y", "z"]);
        let db = test_db().await;
        let http = http();

        run_batch(&collector, &db, &http, &quota(25)).await.unwrap();
        let second = run_batch(&collector, &db, &http, &quota(25)).await.unwrap();

        assert_eq!(second.attempted, 0);
        assert_eq!(collector.fetches().len(), 3);
        let movies = scan_movies(&db).await.unwrap();
        assert_eq!(movies.len(), 3);
    }

    #[tokio::test]
    async fn per_item_failure_does_not_abort_the_run() {
        let collector = ScriptedCollector::new(&["a", "b", "c"])
            .with_outcome("b", FetchOutcome::Failure(FetchFailure::Status(500)));
        let db = test_db().await;
        let http = http();

        let report = run_batch(&collector, &db, &http, &quota(25)).await.unwrap();
        assert_eq!(report.attempted, 3);
        assert_eq!(report.failed, 1);
        assert_eq!(report.inserted, 2);
        // The failed item still advanced the cursor; the next run does not
        // spin on it.
        assert_eq!(checkpoint::load(&db, "scripted").await.unwrap(), 3);
        let retry = run_batch(&collector, &db, &http, &quota(25)).await.unwrap();
        assert_eq!(retry.attempted, 0);
    }

    #[tokio::test]
    async fn empty_response_writes_nothing() {
        let collector =
            ScriptedCollector::new(&["a", "b"]).with_outcome("a", FetchOutcome::Empty);
        let db = test_db().await;

        let report = run_batch(&collector, &db, &http(), &quota(25)).await.unwrap();
        assert_eq!(report.empty, 1);
        assert_eq!(report.inserted, 1);
        assert_eq!(scan_movies(&db).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn needs_update_consumes_quota_and_patches() {
        let collector = ScriptedCollector::new(&["a"]);
        let db = test_db().await;
        insert_movie_if_absent(
            &db,
            &MovieRecord {
                title: "a".into(),
                box_office: None,
                genres: None,
                year: None,
            },
        )
        .await
        .unwrap();

        let report = run_batch(&collector, &db, &http(), &quota(25)).await.unwrap();
        assert_eq!(report.attempted, 1);
        assert_eq!(report.updated, 1);
        assert_eq!(report.skipped, 0);
        let movies = scan_movies(&db).await.unwrap();
        assert_eq!(movies[0].year, Some(2020));
    }

    #[tokio::test]
    async fn probe_skips_consume_no_quota() {
        let collector = ScriptedCollector::new(&["a", "b", "c"]);
        let db = test_db().await;
        let http = http();
        run_batch(&collector, &db, &http, &quota(25)).await.unwrap();

        // Fresh cursor, same ledger: everything probes Complete and the
        // whole list is walked even with a quota of one.
        sqlx::query("UPDATE ingest_cursors SET offset = 0 WHERE collection = 'scripted'")
            .execute(&db.pool)
            .await
            .unwrap();
        let report = run_batch(&collector, &db, &http, &quota(1)).await.unwrap();
        assert_eq!(report.skipped, 3);
        assert_eq!(report.attempted, 0);
        assert_eq!(report.offset_end, 3);
    }
}
