// src/store/sqlite.rs
// =============================================================================
// SQLite-backed link storage using sqlx.
//
// Schema:
//   urls(id INTEGER PRIMARY KEY AUTOINCREMENT,
//        url TEXT NOT NULL UNIQUE,
//        parent_url TEXT)
//
// The table is created on connect if it does not exist yet.
// =============================================================================

use std::str::FromStr;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

use crate::crawl::CrawlReport;

// One row of the urls table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredLink {
    pub id: i64,
    pub url: String,
    pub parent_url: Option<String>,
}

pub struct LinkStore {
    pool: SqlitePool,
}

impl LinkStore {
    // Opens (or creates) the database and makes sure the table exists
    //
    // Accepts sqlx URLs such as "sqlite://links.db" or "sqlite::memory:".
    pub async fn connect(database_url: &str) -> Result<Self> {
        // A Postgres URL left over in .env would otherwise fail with a
        // confusing parse error from the SQLite driver
        if is_postgres_url(database_url) {
            bail!(
                "'{}' is a PostgreSQL URL; only SQLite is supported (e.g. sqlite://links.db)",
                database_url
            );
        }

        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid database URL '{}'", database_url))?
            .create_if_missing(true);

        // One connection: SQLite serializes writers anyway, and an in-memory
        // database only exists inside the connection that created it
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .context("failed to connect to database")?;

        // Create the table on first use
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS urls (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL UNIQUE,
                parent_url TEXT
            )
            ",
        )
        .execute(&pool)
        .await
        .context("failed to create table")?;

        Ok(Self { pool })
    }

    // Inserts every link of the report in one transaction
    //
    // Returns how many rows were actually added; URLs already present are
    // left untouched.
    pub async fn store_links(&self, report: &CrawlReport) -> Result<u64> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("failed to begin transaction")?;

        // Count only rows that were really added
        let mut inserted = 0;
        for link in &report.links {
            // The parent is NULL if the report has none for this link
            let result = sqlx::query(
                r"
                INSERT INTO urls (url, parent_url)
                VALUES (?, ?)
                ON CONFLICT (url) DO NOTHING
                ",
            )
            .bind(link)
            .bind(report.parent_of(link))
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to insert link {}", link))?;

            // 0 when the URL was already stored
            inserted += result.rows_affected();
        }

        // Dropping tx on an early return rolls everything back
        tx.commit().await.context("failed to commit links")?;
        Ok(inserted)
    }

    pub async fn stored_links(&self) -> Result<Vec<StoredLink>> {
        let rows = sqlx::query("SELECT id, url, parent_url FROM urls ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .context("error while querying stored links")?;

        // collect() stops at the first row that fails to decode
        rows.iter().map(row_to_link).collect()
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

fn is_postgres_url(database_url: &str) -> bool {
    database_url.starts_with("postgres://") || database_url.starts_with("postgresql://")
}

fn row_to_link(row: &SqliteRow) -> Result<StoredLink> {
    Ok(StoredLink {
        id: row.try_get("id")?,
        url: row.try_get("url")?,
        parent_url: row.try_get("parent_url")?,
    })
}
