//! The ledger: durable, deduplicating store of atomic records.
//!
//! Every insert is a single `INSERT .. ON CONFLICT DO NOTHING` statement so
//! the uniqueness constraint is the sole integrity mechanism; there is no
//! check-then-act window even if a reader runs concurrently. Storage faults
//! bubble up as errors; the caller treats them as fatal to the run.

use anyhow::Result;
use sqlx::Row;
use tracing::{debug, instrument};

use crate::database_ops::db::Db;

/// Outcome of an idempotent insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyPresent,
}

/// What a probe found for a work item's natural key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Not in the ledger; fetch and insert.
    Absent,
    /// Fully ingested; skip without consuming quota.
    Complete,
    /// Present but missing a field worth a re-fetch (e.g. a NULL year);
    /// consumes quota and ends in an explicit update.
    NeedsUpdate,
}

/// One day of temperature for a location. Natural key: (location, date).
#[derive(Debug, Clone, PartialEq)]
pub struct DailyTemperature {
    pub date: String,
    pub temperature_c: Option<f64>,
}

/// Natural key: title.
#[derive(Debug, Clone, PartialEq)]
pub struct MovieRecord {
    pub title: String,
    pub box_office: Option<i64>,
    pub genres: Option<String>,
    pub year: Option<i32>,
}

/// Natural key: name.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryRecord {
    pub name: String,
    pub capital: Option<String>,
    pub population: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Natural key: (category, product_name).
#[derive(Debug, Clone, PartialEq)]
pub struct FoodProduct {
    pub category: String,
    pub product_name: String,
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub fat: Option<f64>,
    pub sugar: Option<f64>,
    pub sodium: Option<f64>,
    pub serving_size: Option<String>,
}

/// Daily row joined with its city name, as the aggregator consumes it.
#[derive(Debug, Clone, PartialEq)]
pub struct CityDay {
    pub city: String,
    pub date: String,
    pub temperature_c: Option<f64>,
}

/// Get-or-create a location row, returning its id.
pub async fn ensure_location(db: &Db, name: &str, latitude: f64, longitude: f64) -> Result<i64> {
    if let Some(r) = sqlx::query("SELECT id FROM locations WHERE city_name = ?")
        .bind(name)
        .fetch_optional(&db.pool)
        .await?
    {
        debug!(city = %name, location_id = r.get::<i64, _>("id"), "location exists");
        return Ok(r.get::<i64, _>("id"));
    }
    let result = sqlx::query("INSERT INTO locations (city_name, latitude, longitude) VALUES (?, ?, ?)")
        .bind(name)
        .bind(latitude)
        .bind(longitude)
        .execute(&db.pool)
        .await?;
    let id = result.last_insert_rowid();
    debug!(city = %name, location_id = id, "location created");
    Ok(id)
}

pub async fn location_day_count(db: &Db, city_name: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM daily_temperatures d
         JOIN locations l ON l.id = d.location_id
         WHERE l.city_name = ?",
    )
    .bind(city_name)
    .fetch_one(&db.pool)
    .await?;
    Ok(count)
}

pub async fn insert_daily_if_absent(
    db: &Db,
    location_id: i64,
    record: &DailyTemperature,
) -> Result<InsertOutcome> {
    let result = sqlx::query(
        "INSERT INTO daily_temperatures (location_id, date, temperature_c)
         VALUES (?, ?, ?)
         ON CONFLICT (location_id, date) DO NOTHING",
    )
    .bind(location_id)
    .bind(&record.date)
    .bind(record.temperature_c)
    .execute(&db.pool)
    .await?;
    Ok(outcome(result.rows_affected()))
}

/// Classify a title: absent, complete, or present with a NULL year
/// (worth one more fetch to patch it).
pub async fn movie_presence(db: &Db, title: &str) -> Result<Presence> {
    let row = sqlx::query("SELECT year FROM movies WHERE title = ?")
        .bind(title)
        .fetch_optional(&db.pool)
        .await?;
    Ok(match row {
        None => Presence::Absent,
        Some(r) => match r.get::<Option<i32>, _>("year") {
            Some(_) => Presence::Complete,
            None => Presence::NeedsUpdate,
        },
    })
}

pub async fn insert_movie_if_absent(db: &Db, record: &MovieRecord) -> Result<InsertOutcome> {
    let result = sqlx::query(
        "INSERT INTO movies (title, box_office, genres, year)
         VALUES (?, ?, ?, ?)
         ON CONFLICT (title) DO NOTHING",
    )
    .bind(&record.title)
    .bind(record.box_office)
    .bind(&record.genres)
    .bind(record.year)
    .execute(&db.pool)
    .await?;
    Ok(outcome(result.rows_affected()))
}

/// The explicit needs-update write: patch the year on an existing row.
#[instrument(skip(db))]
pub async fn update_movie_year(db: &Db, title: &str, year: Option<i32>) -> Result<()> {
    sqlx::query("UPDATE movies SET year = ? WHERE title = ?")
        .bind(year)
        .bind(title)
        .execute(&db.pool)
        .await?;
    Ok(())
}

pub async fn country_exists(db: &Db, name: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM countries WHERE name = ?")
        .bind(name)
        .fetch_one(&db.pool)
        .await?;
    Ok(count > 0)
}

pub async fn insert_country_if_absent(db: &Db, record: &CountryRecord) -> Result<InsertOutcome> {
    let result = sqlx::query(
        "INSERT INTO countries (name, capital, population, latitude, longitude)
         VALUES (?, ?, ?, ?, ?)
         ON CONFLICT (name) DO NOTHING",
    )
    .bind(&record.name)
    .bind(&record.capital)
    .bind(record.population)
    .bind(record.latitude)
    .bind(record.longitude)
    .execute(&db.pool)
    .await?;
    Ok(outcome(result.rows_affected()))
}

pub async fn insert_food_if_absent(db: &Db, record: &FoodProduct) -> Result<InsertOutcome> {
    let result = sqlx::query(
        "INSERT INTO food_products
             (category, product_name, calories, protein, fat, sugar, sodium, serving_size)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT (category, product_name) DO NOTHING",
    )
    .bind(&record.category)
    .bind(&record.product_name)
    .bind(record.calories)
    .bind(record.protein)
    .bind(record.fat)
    .bind(record.sugar)
    .bind(record.sodium)
    .bind(&record.serving_size)
    .execute(&db.pool)
    .await?;
    Ok(outcome(result.rows_affected()))
}

/// All daily rows joined with their city, ordered by (city, date).
pub async fn scan_daily_temperatures(db: &Db) -> Result<Vec<CityDay>> {
    let rows = sqlx::query(
        "SELECT l.city_name AS city, d.date AS date, d.temperature_c AS temperature_c
         FROM daily_temperatures d
         JOIN locations l ON l.id = d.location_id
         ORDER BY l.city_name, d.date",
    )
    .fetch_all(&db.pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|r| CityDay {
            city: r.get("city"),
            date: r.get("date"),
            temperature_c: r.get("temperature_c"),
        })
        .collect())
}

/// All movies, ordered by title.
pub async fn scan_movies(db: &Db) -> Result<Vec<MovieRecord>> {
    let rows = sqlx::query("SELECT title, box_office, genres, year FROM movies ORDER BY title")
        .fetch_all(&db.pool)
        .await?;
    Ok(rows
        .into_iter()
        .map(|r| MovieRecord {
            title: r.get("title"),
            box_office: r.get("box_office"),
            genres: r.get("genres"),
            year: r.get("year"),
        })
        .collect())
}

/// Row counts for the status command, in a fixed display order.
pub async fn table_counts(db: &Db) -> Result<Vec<(&'static str, i64)>> {
    let mut counts = Vec::new();
    for table in [
        "locations",
        "daily_temperatures",
        "movies",
        "countries",
        "food_products",
    ] {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&db.pool)
            .await?;
        counts.push((table, count));
    }
    Ok(counts)
}

fn outcome(rows_affected: u64) -> InsertOutcome {
    if rows_affected > 0 {
        InsertOutcome::Inserted
    } else {
        InsertOutcome::AlreadyPresent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> Db {
        Db::connect(":memory:", 1).await.unwrap()
    }

    fn movie(title: &str, year: Option<i32>) -> MovieRecord {
        MovieRecord {
            title: title.to_string(),
            box_office: Some(1_000_000),
            genres: Some("Drama".into()),
            year,
        }
    }

    #[tokio::test]
    async fn insert_if_absent_is_idempotent() {
        let db = test_db().await;
        let rec = movie("Whiplash", Some(2014));
        assert_eq!(
            insert_movie_if_absent(&db, &rec).await.unwrap(),
            InsertOutcome::Inserted
        );
        assert_eq!(
            insert_movie_if_absent(&db, &rec).await.unwrap(),
            InsertOutcome::AlreadyPresent
        );
        let all = scan_movies(&db).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_key_never_duplicates_daily_rows() {
        let db = test_db().await;
        let loc = ensure_location(&db, "Berlin", 52.52, 13.41).await.unwrap();
        let rec = DailyTemperature {
            date: "2020-01-01".into(),
            temperature_c: Some(3.5),
        };
        assert_eq!(
            insert_daily_if_absent(&db, loc, &rec).await.unwrap(),
            InsertOutcome::Inserted
        );
        assert_eq!(
            insert_daily_if_absent(&db, loc, &rec).await.unwrap(),
            InsertOutcome::AlreadyPresent
        );
        assert_eq!(location_day_count(&db, "Berlin").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn ensure_location_reuses_existing_rows() {
        let db = test_db().await;
        let a = ensure_location(&db, "Tokyo", 35.68, 139.69).await.unwrap();
        let b = ensure_location(&db, "Tokyo", 35.68, 139.69).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn movie_presence_classifies_needs_update() {
        let db = test_db().await;
        assert_eq!(
            movie_presence(&db, "Logan").await.unwrap(),
            Presence::Absent
        );
        insert_movie_if_absent(&db, &movie("Logan", None))
            .await
            .unwrap();
        assert_eq!(
            movie_presence(&db, "Logan").await.unwrap(),
            Presence::NeedsUpdate
        );
        update_movie_year(&db, "Logan", Some(2017)).await.unwrap();
        assert_eq!(
            movie_presence(&db, "Logan").await.unwrap(),
            Presence::Complete
        );
    }

    #[tokio::test]
    async fn nullable_fields_round_trip() {
        let db = test_db().await;
        let rec = CountryRecord {
            name: "Atlantis".into(),
            capital: None,
            population: None,
            latitude: None,
            longitude: None,
        };
        assert_eq!(
            insert_country_if_absent(&db, &rec).await.unwrap(),
            InsertOutcome::Inserted
        );
        assert!(country_exists(&db, "Atlantis").await.unwrap());
    }
}
