//! Durable per-collection ingest cursor.
//!
//! One row per collection in `ingest_cursors`. The connection runs with
//! synchronous=FULL (see `db.rs`), so once `advance` returns the new offset
//! has been flushed; a crash immediately afterwards cannot lose it. The
//! caller only advances after the corresponding records are committed to the
//! ledger, never speculatively. Rows are created at offset zero on first
//! load and are never deleted.

use anyhow::Result;
use chrono::Utc;
use tracing::{debug, instrument};

use crate::database_ops::db::Db;

/// Current offset for a collection, creating the zero row on first use.
pub async fn load(db: &Db, collection: &str) -> Result<i64> {
    sqlx::query("INSERT INTO ingest_cursors (collection, offset) VALUES (?, 0) ON CONFLICT (collection) DO NOTHING")
        .bind(collection)
        .execute(&db.pool)
        .await?;
    let offset: i64 = sqlx::query_scalar("SELECT offset FROM ingest_cursors WHERE collection = ?")
        .bind(collection)
        .fetch_one(&db.pool)
        .await?;
    Ok(offset)
}

/// Move the cursor forward; monotonic by construction.
#[instrument(skip(db))]
pub async fn advance(db: &Db, collection: &str, by: i64) -> Result<i64> {
    debug_assert!(by >= 0);
    sqlx::query("UPDATE ingest_cursors SET offset = offset + ?, updated_at = ? WHERE collection = ?")
        .bind(by)
        .bind(Utc::now())
        .bind(collection)
        .execute(&db.pool)
        .await?;
    let offset: i64 = sqlx::query_scalar("SELECT offset FROM ingest_cursors WHERE collection = ?")
        .bind(collection)
        .fetch_one(&db.pool)
        .await?;
    debug!(collection, offset, "cursor advanced");
    Ok(offset)
}

/// Whether the collection's one-time setup has already run.
pub async fn setup_complete(db: &Db, collection: &str) -> Result<bool> {
    let flag: i64 =
        sqlx::query_scalar("SELECT setup_complete FROM ingest_cursors WHERE collection = ?")
            .bind(collection)
            .fetch_one(&db.pool)
            .await?;
    Ok(flag != 0)
}

pub async fn mark_setup_complete(db: &Db, collection: &str) -> Result<()> {
    sqlx::query("UPDATE ingest_cursors SET setup_complete = 1, updated_at = ? WHERE collection = ?")
        .bind(Utc::now())
        .bind(collection)
        .execute(&db.pool)
        .await?;
    Ok(())
}

/// All cursor rows, for the status command.
pub async fn list(db: &Db) -> Result<Vec<(String, i64, bool)>> {
    use sqlx::Row;
    let rows = sqlx::query(
        "SELECT collection, offset, setup_complete FROM ingest_cursors ORDER BY collection",
    )
    .fetch_all(&db.pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|r| {
            (
                r.get::<String, _>("collection"),
                r.get::<i64, _>("offset"),
                r.get::<i64, _>("setup_complete") != 0,
            )
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> Db {
        Db::connect(":memory:", 1).await.unwrap()
    }

    #[tokio::test]
    async fn first_load_creates_zero_row() {
        let db = test_db().await;
        assert_eq!(load(&db, "weather").await.unwrap(), 0);
        // Read-your-writes: a second load sees the same row, not a reset.
        assert_eq!(load(&db, "weather").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn advance_persists_and_accumulates() {
        let db = test_db().await;
        load(&db, "movies").await.unwrap();
        assert_eq!(advance(&db, "movies", 2).await.unwrap(), 2);
        assert_eq!(advance(&db, "movies", 1).await.unwrap(), 3);
        assert_eq!(load(&db, "movies").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn cursors_are_independent_per_collection() {
        let db = test_db().await;
        load(&db, "weather").await.unwrap();
        load(&db, "movies").await.unwrap();
        advance(&db, "weather", 5).await.unwrap();
        assert_eq!(load(&db, "movies").await.unwrap(), 0);
        assert_eq!(load(&db, "weather").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn setup_flag_flips_once() {
        let db = test_db().await;
        load(&db, "food").await.unwrap();
        assert!(!setup_complete(&db, "food").await.unwrap());
        mark_setup_complete(&db, "food").await.unwrap();
        assert!(setup_complete(&db, "food").await.unwrap());
        let cursors = list(&db).await.unwrap();
        assert_eq!(cursors, vec![("food".to_string(), 0, true)]);
    }
}
