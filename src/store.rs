// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Destination store: current-state upserts plus append-only history.
//!
//! Backed by SQLite through sqlx. Two tables share the `id` domain but have
//! independent lifecycles:
//!
//! - `patients`: one row per `id`, replaced in place on every ingestion
//!   (upsert). `timestamp` records when the row was last written.
//! - `history`: one row appended per record per batch application, never
//!   overwritten, never deduplicated, never pruned here.
//!
//! # Write Path
//!
//! A batch is applied as one transaction:
//!
//! 1. bulk-load the records into a temp staging table (chunked multi-row
//!    inserts, to stay under SQLite's bind-parameter ceiling)
//! 2. one `INSERT ... SELECT ... ON CONFLICT(id) DO UPDATE` into `patients`
//! 3. one `INSERT ... SELECT` into `history`
//!
//! Round-trips are bounded to O(batches), not O(records). Both tables see the
//! same application timestamp for every record in the batch, so a
//! current-state row and its history snapshot always agree.
//!
//! # Single Writer
//!
//! The pool is capped at one connection. Batches are applied strictly
//! sequentially by the orchestrator, and the single connection makes the
//! destination a single-writer resource even if a caller misbehaves.

use crate::batch::Batch;
use crate::error::{ReplicateError, Result};
use crate::metrics;
use crate::record::Record;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::QueryBuilder;
use std::path::Path;
use std::str::FromStr;
use std::time::Instant;
use tracing::{debug, info};

/// Rows per staging INSERT. Nine binds per row keeps a full chunk well under
/// SQLite's default variable limit.
const STAGING_CHUNK_ROWS: usize = 512;

/// A persisted current-state row, read back for verification or diagnostics.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PatientRow {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub date_of_birth: String,
    pub created_at: String,
    pub updated_at: String,
    pub total_visits: i64,
    pub timestamp: DateTime<Utc>,
}

/// Destination store handle, scoped to one run.
///
/// Acquired once per run and released on every exit path via
/// [`close()`](Self::close).
pub struct ReplicationStore {
    pool: SqlitePool,
    path: String,
}

impl ReplicationStore {
    /// Open (or create) the destination database at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        info!(path = %path_str, "Opening replication store");

        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}?mode=rwc", path_str))
            .map_err(|e| ReplicateError::Config(format!("Invalid SQLite path: {}", e)))?
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1) // Single-writer destination
            .connect_with(options)
            .await?;

        Ok(Self {
            pool,
            path: path_str,
        })
    }

    /// Create both destination tables if they do not exist.
    ///
    /// Provisioning runs once before replication; the core write path
    /// assumes the tables are present.
    pub async fn provision(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS patients (
                id INTEGER PRIMARY KEY,
                first_name TEXT,
                last_name TEXT,
                email TEXT,
                date_of_birth TEXT,
                created_at TEXT,
                updated_at TEXT,
                total_visits INTEGER,
                timestamp TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS history (
                id INTEGER,
                first_name TEXT,
                last_name TEXT,
                email TEXT,
                date_of_birth TEXT,
                created_at TEXT,
                updated_at TEXT,
                total_visits INTEGER,
                timestamp TIMESTAMP,
                change_timestamp TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        debug!("Destination schema provisioned");
        Ok(())
    }

    /// Drop and recreate both tables. For test setups and full resets only.
    pub async fn reset(&self) -> Result<()> {
        sqlx::query("DROP TABLE IF EXISTS patients")
            .execute(&self.pool)
            .await?;
        sqlx::query("DROP TABLE IF EXISTS history")
            .execute(&self.pool)
            .await?;
        self.provision().await
    }

    /// Apply one batch: upsert every record into `patients` and append one
    /// `history` row per record, as a single transaction.
    ///
    /// Re-applying the same batch leaves `patients` with the same field
    /// values (the write timestamp moves forward) while `history` grows by
    /// one row per record. An empty batch is a no-op, not an error. On error
    /// the transaction rolls back and the batch counts as not applied.
    pub async fn apply_batch(&self, batch: &Batch) -> Result<()> {
        if batch.is_empty() {
            debug!("Empty batch, nothing to apply");
            return Ok(());
        }

        let started = Instant::now();
        let applied_at = Utc::now();
        let mut tx = self.pool.begin().await?;

        // Temp tables are connection-scoped; the single-connection pool means
        // this staging table is reused across batches within a run.
        sqlx::query(
            r#"
            CREATE TEMP TABLE IF NOT EXISTS staging_records (
                id INTEGER,
                first_name TEXT,
                last_name TEXT,
                email TEXT,
                date_of_birth TEXT,
                created_at TEXT,
                updated_at TEXT,
                total_visits INTEGER
            )
            "#,
        )
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM staging_records")
            .execute(&mut *tx)
            .await?;

        for chunk in batch.records().chunks(STAGING_CHUNK_ROWS) {
            Self::load_staging_chunk(&mut tx, chunk).await?;
        }

        sqlx::query(
            r#"
            INSERT INTO patients (id, first_name, last_name, email, date_of_birth,
                                  created_at, updated_at, total_visits, timestamp)
            SELECT id, first_name, last_name, email, date_of_birth,
                   created_at, updated_at, total_visits, ?
            FROM staging_records
            WHERE true
            ON CONFLICT(id) DO UPDATE SET
                first_name = excluded.first_name,
                last_name = excluded.last_name,
                email = excluded.email,
                date_of_birth = excluded.date_of_birth,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at,
                total_visits = excluded.total_visits,
                timestamp = excluded.timestamp
            "#,
        )
        .bind(applied_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO history (id, first_name, last_name, email, date_of_birth,
                                 created_at, updated_at, total_visits,
                                 timestamp, change_timestamp)
            SELECT id, first_name, last_name, email, date_of_birth,
                   created_at, updated_at, total_visits, ?, ?
            FROM staging_records
            "#,
        )
        .bind(applied_at)
        .bind(applied_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM staging_records")
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        metrics::record_batch_applied(batch.len(), started.elapsed());
        info!(
            records = batch.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Batch applied"
        );
        Ok(())
    }

    async fn load_staging_chunk(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        chunk: &[Record],
    ) -> Result<()> {
        let mut builder: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(
            "INSERT INTO staging_records (id, first_name, last_name, email, \
             date_of_birth, created_at, updated_at, total_visits) ",
        );
        builder.push_values(chunk, |mut row, record| {
            row.push_bind(record.id)
                .push_bind(&record.first_name)
                .push_bind(&record.last_name)
                .push_bind(&record.email)
                .push_bind(&record.date_of_birth)
                .push_bind(&record.created_at)
                .push_bind(&record.updated_at)
                .push_bind(record.total_visits);
        });
        builder.build().execute(&mut **tx).await?;
        Ok(())
    }

    /// Number of rows in the current-state table.
    pub async fn patient_count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM patients")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Number of rows in the history table.
    pub async fn history_count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM history")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Look up the current-state row for one `id`.
    pub async fn patient(&self, id: i64) -> Result<Option<PatientRow>> {
        let row = sqlx::query_as::<_, PatientRow>("SELECT * FROM patients WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Database path (for diagnostics).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Close the connection pool gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Replication store closed");
    }
}
