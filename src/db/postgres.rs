// PgDatabase: PostgreSQL backend implementing the Database trait.
//
// Uses sqlx PgPool with runtime parameter binding (no compile-time macros,
// so DATABASE_URL is not needed to build).
//
// Differences from SQLite:
// - review_date is a DATE; values that never parsed are stored as NULL
// - $1/$2 parameter syntax
// - GENERATED ALWAYS AS IDENTITY for the bank surrogate key

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx_core::pool::Pool;
use sqlx_core::query::Query;
use sqlx_core::row::Row;
use sqlx_postgres::{PgArguments, PgRow, Postgres};

use super::load::{self, LoadReport};
use super::models::{BankStat, StoredReview};
use super::traits::Database;
use crate::models::ScoredReview;

const INSERT_BANK: &str = "INSERT INTO banks (bank_name, bank_code) VALUES ($1, $2)
     ON CONFLICT (bank_code) DO NOTHING";

const INSERT_REVIEW: &str = "INSERT INTO reviews
        (review_id, bank_id, review_text, rating, review_date,
         sentiment_label, sentiment_score, source)
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
     ON CONFLICT (review_id) DO NOTHING";

const SELECT_BANK_IDS: &str = "SELECT bank_code, bank_id::bigint FROM banks";

/// Bind a review to INSERT_REVIEW. Dates that never parsed go in as NULL.
fn insert_review_query(review: &StoredReview) -> Result<Query<'_, Postgres, PgArguments>> {
    let review_date = review
        .review_date
        .as_deref()
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
    let bank_id = i32::try_from(review.bank_id).context("bank_id exceeds i32 range")?;

    Ok(sqlx_core::query::query(INSERT_REVIEW)
        .bind(&review.review_id)
        .bind(bank_id)
        .bind(&review.review_text)
        .bind(i16::from(review.rating))
        .bind(review_date)
        .bind(&review.sentiment_label)
        .bind(review.sentiment_score)
        .bind(review.source.as_deref()))
}

fn bank_id_map(rows: &[PgRow]) -> HashMap<String, i64> {
    rows.iter()
        .map(|r| (r.get::<String, _>(0), r.get::<i64, _>(1)))
        .collect()
}

/// Type alias for the PostgreSQL connection pool.
pub type PgPool = Pool<Postgres>;

pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    /// Connect to PostgreSQL and run migrations.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .context("Failed to connect to PostgreSQL")?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Run all pending migrations.
    ///
    /// A session-level advisory lock serializes concurrent loaders. The lock
    /// is bound to the connection that took it, so lock and unlock run on the
    /// same dedicated connection and the unlock runs even if a migration fails.
    async fn run_migrations(&self) -> Result<()> {
        // ASCII "BANKREVW" as a big-endian i64.
        const MIGRATION_LOCK_KEY: i64 = 0x42414E4B52455657_u64 as i64;

        let mut lock_conn = self
            .pool
            .acquire()
            .await
            .context("Failed to acquire connection for migration advisory lock")?;

        sqlx_core::query::query("SELECT pg_advisory_lock($1)")
            .bind(MIGRATION_LOCK_KEY)
            .execute(&mut *lock_conn)
            .await
            .context("Failed to acquire migration advisory lock")?;

        let migration_result: Result<()> = async {
            sqlx_core::query::query(
                "CREATE TABLE IF NOT EXISTS schema_version (
                    version INTEGER PRIMARY KEY,
                    applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )",
            )
            .execute(&self.pool)
            .await?;

            let migrations = [
                (1, include_str!("../../migrations/postgres/0001_initial.sql")),
                (2, include_str!("../../migrations/postgres/0002_sentiment_index.sql")),
            ];

            for (version, sql) in migrations {
                let applied: bool = sqlx_core::query::query(
                    "SELECT COUNT(*) > 0 FROM schema_version WHERE version = $1",
                )
                .bind(version)
                .fetch_one(&self.pool)
                .await
                .map(|row| row.get::<bool, _>(0))
                .unwrap_or(false);

                if !applied {
                    let mut tx = self.pool.begin().await?;
                    sqlx_core::raw_sql::raw_sql(sql).execute(&mut *tx).await?;
                    tx.commit().await?;
                }
            }

            Ok(())
        }
        .await;

        let unlock_result = sqlx_core::query::query("SELECT pg_advisory_unlock($1)")
            .bind(MIGRATION_LOCK_KEY)
            .execute(&mut *lock_conn)
            .await
            .context("Failed to release migration advisory lock");

        migration_result?;
        unlock_result?;

        Ok(())
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn table_count(&self) -> Result<i64> {
        let row = sqlx_core::query::query(
            "SELECT COUNT(*)::bigint FROM information_schema.tables
             WHERE table_schema = 'public' AND table_type = 'BASE TABLE'",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get::<i64, _>(0))
    }

    async fn upsert_bank(&self, bank_code: &str, bank_name: &str) -> Result<bool> {
        let result = sqlx_core::query::query(INSERT_BANK)
            .bind(bank_name)
            .bind(bank_code)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_review(&self, review: &StoredReview) -> Result<bool> {
        let result = insert_review_query(review)?.execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn load_batch(&self, scored: &[ScoredReview]) -> Result<LoadReport> {
        // Rolled back on drop unless committed
        let mut tx = self.pool.begin().await?;
        let mut report = LoadReport::default();

        for (code, name) in load::distinct_banks(scored) {
            let result = sqlx_core::query::query(INSERT_BANK)
                .bind(name)
                .bind(code)
                .execute(&mut *tx)
                .await?;
            if result.rows_affected() > 0 {
                report.banks_inserted += 1;
            }
        }

        let rows = sqlx_core::query::query(SELECT_BANK_IDS)
            .fetch_all(&mut *tx)
            .await?;
        let ids = bank_id_map(&rows);

        for review in scored {
            let Some(row) = load::stored_row(review, &ids) else {
                report.reviews_skipped += 1;
                continue;
            };
            let result = insert_review_query(&row)?.execute(&mut *tx).await?;
            if result.rows_affected() > 0 {
                report.reviews_inserted += 1;
            } else {
                report.reviews_existing += 1;
            }
        }

        tx.commit().await?;
        Ok(report)
    }

    async fn bank_ids(&self) -> Result<HashMap<String, i64>> {
        let rows = sqlx_core::query::query(SELECT_BANK_IDS)
            .fetch_all(&self.pool)
            .await?;
        Ok(bank_id_map(&rows))
    }

    async fn review_count(&self) -> Result<i64> {
        let row = sqlx_core::query::query("SELECT COUNT(*)::bigint FROM reviews")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>(0))
    }

    async fn reviews_per_bank(&self) -> Result<Vec<BankStat<i64>>> {
        let rows = sqlx_core::query::query(
            "SELECT b.bank_name, COUNT(r.review_id)::bigint
             FROM banks b
             LEFT JOIN reviews r ON r.bank_id = b.bank_id
             GROUP BY b.bank_id, b.bank_name
             ORDER BY b.bank_name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|r| BankStat {
                bank_name: r.get(0),
                value: r.get(1),
            })
            .collect())
    }

    async fn average_rating_per_bank(&self) -> Result<Vec<BankStat<f64>>> {
        let rows = sqlx_core::query::query(
            "SELECT b.bank_name, AVG(r.rating)::double precision
             FROM banks b
             JOIN reviews r ON r.bank_id = b.bank_id
             GROUP BY b.bank_id, b.bank_name
             ORDER BY b.bank_name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|r| BankStat {
                bank_name: r.get(0),
                value: r.get(1),
            })
            .collect())
    }

    async fn sentiment_distribution(&self) -> Result<Vec<(String, i64)>> {
        let rows = sqlx_core::query::query(
            "SELECT sentiment_label, COUNT(*)::bigint
             FROM reviews
             WHERE sentiment_label IS NOT NULL
             GROUP BY sentiment_label
             ORDER BY COUNT(*) DESC, sentiment_label",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|r| (r.get::<String, _>(0), r.get::<i64, _>(1)))
            .collect())
    }
}
