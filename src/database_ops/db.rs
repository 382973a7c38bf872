use std::str::FromStr;
use std::time::Duration;

use anyhow::Result;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use tracing::{info, instrument};

/// Every statement is idempotent; the schema is ensured on each connect so a
/// fresh database file is usable immediately, like the original one-time
/// setup but without a separate step.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS locations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        city_name TEXT NOT NULL UNIQUE,
        latitude REAL NOT NULL,
        longitude REAL NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS daily_temperatures (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        location_id INTEGER NOT NULL REFERENCES locations (id),
        date TEXT NOT NULL,
        temperature_c REAL,
        UNIQUE (location_id, date)
    )",
    "CREATE TABLE IF NOT EXISTS movies (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL UNIQUE,
        box_office INTEGER,
        genres TEXT,
        year INTEGER
    )",
    "CREATE TABLE IF NOT EXISTS countries (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        capital TEXT,
        population INTEGER,
        latitude REAL,
        longitude REAL
    )",
    "CREATE TABLE IF NOT EXISTS food_products (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        category TEXT NOT NULL,
        product_name TEXT NOT NULL,
        calories REAL,
        protein REAL,
        fat REAL,
        sugar REAL,
        sodium REAL,
        serving_size TEXT,
        UNIQUE (category, product_name)
    )",
    "CREATE TABLE IF NOT EXISTS ingest_cursors (
        collection TEXT PRIMARY KEY,
        offset INTEGER NOT NULL DEFAULT 0,
        setup_complete INTEGER NOT NULL DEFAULT 0,
        updated_at TEXT
    )",
];

#[derive(Clone)]
pub struct Db {
    pub pool: SqlitePool,
}

impl Db {
    /// Open (creating if missing) the ledger database and ensure its schema.
    ///
    /// synchronous=FULL: a committed write (in particular a cursor advance)
    /// is flushed before the call returns. Resumption depends on never
    /// losing an acknowledged advance.
    #[instrument(skip(path))]
    pub async fn connect(path: &str, max_connections: u32) -> Result<Self> {
        let mut connect_options = if path == ":memory:" {
            SqliteConnectOptions::from_str("sqlite::memory:")?
        } else {
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
        };
        connect_options = connect_options
            .synchronous(SqliteSynchronous::Full)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await?;
        info!("connected to db");

        for stmt in SCHEMA {
            sqlx::query(stmt).execute(&pool).await?;
        }
        info!(tables = SCHEMA.len(), "schema ensured");

        Ok(Self { pool })
    }
}
