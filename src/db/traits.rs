// Database trait: backend-agnostic async interface for the loader.
//
// Implementors: SqliteDatabase (wraps rusqlite), PgDatabase (wraps sqlx).
// All methods are async so both the Mutex-wrapped sync backend and the
// native async one fit behind a single interface.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;

use super::load::LoadReport;
use super::models::{BankStat, StoredReview};
use crate::models::ScoredReview;

#[async_trait]
pub trait Database: Send + Sync {
    // --- Lifecycle ---

    /// Count the number of user-created tables in the database.
    async fn table_count(&self) -> Result<i64>;

    // --- Writes ---

    /// Insert a bank unless its code already exists. Returns true if inserted.
    async fn upsert_bank(&self, bank_code: &str, bank_name: &str) -> Result<bool>;

    /// Insert a review unless its id already exists. Returns true if inserted.
    /// An existing row is never overwritten.
    async fn insert_review(&self, review: &StoredReview) -> Result<bool>;

    /// Insert every distinct bank, then every review with an id and a known
    /// bank, inside one transaction. On error the store is left as it was.
    async fn load_batch(&self, scored: &[ScoredReview]) -> Result<LoadReport>;

    // --- Reads ---

    /// Map of bank code to surrogate bank id.
    async fn bank_ids(&self) -> Result<HashMap<String, i64>>;

    async fn review_count(&self) -> Result<i64>;

    /// Review count per bank, by bank name.
    async fn reviews_per_bank(&self) -> Result<Vec<BankStat<i64>>>;

    /// Mean star rating per bank, by bank name. Banks without reviews are omitted.
    async fn average_rating_per_bank(&self) -> Result<Vec<BankStat<f64>>>;

    /// (label, count) pairs, most frequent first.
    async fn sentiment_distribution(&self) -> Result<Vec<(String, i64)>>;
}
