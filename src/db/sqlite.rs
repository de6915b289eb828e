// SqliteDatabase: rusqlite backend implementing the Database trait.
//
// The Connection is wrapped in tokio::sync::Mutex because Connection is !Send.
// Trait methods lock, do synchronous rusqlite work in queries.rs, and return.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use rusqlite::Connection;
use tokio::sync::Mutex;

use super::load::LoadReport;
use super::models::{BankStat, StoredReview};
use super::traits::Database;
use crate::models::ScoredReview;

pub struct SqliteDatabase {
    conn: Mutex<Connection>,
}

impl SqliteDatabase {
    /// Wrap an already-opened rusqlite Connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn table_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::schema::table_count(&conn)
    }

    async fn upsert_bank(&self, bank_code: &str, bank_name: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        super::queries::upsert_bank(&conn, bank_code, bank_name)
    }

    async fn insert_review(&self, review: &StoredReview) -> Result<bool> {
        let conn = self.conn.lock().await;
        super::queries::insert_review(&conn, review)
    }

    async fn load_batch(&self, scored: &[ScoredReview]) -> Result<LoadReport> {
        let mut conn = self.conn.lock().await;
        super::queries::load_batch(&mut conn, scored)
    }

    async fn bank_ids(&self) -> Result<HashMap<String, i64>> {
        let conn = self.conn.lock().await;
        super::queries::bank_ids(&conn)
    }

    async fn review_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::queries::review_count(&conn)
    }

    async fn reviews_per_bank(&self) -> Result<Vec<BankStat<i64>>> {
        let conn = self.conn.lock().await;
        super::queries::reviews_per_bank(&conn)
    }

    async fn average_rating_per_bank(&self) -> Result<Vec<BankStat<f64>>> {
        let conn = self.conn.lock().await;
        super::queries::average_rating_per_bank(&conn)
    }

    async fn sentiment_distribution(&self) -> Result<Vec<(String, i64)>> {
        let conn = self.conn.lock().await;
        super::queries::sentiment_distribution(&conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::create_tables;

    fn test_db() -> SqliteDatabase {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        SqliteDatabase::new(conn)
    }

    #[tokio::test]
    async fn trait_bank_roundtrip() {
        let db = test_db();
        assert!(db.upsert_bank("Dashen", "Dashen Bank").await.unwrap());
        assert!(!db.upsert_bank("Dashen", "Dashen Bank").await.unwrap());
        let ids = db.bank_ids().await.unwrap();
        assert!(ids.contains_key("Dashen"));
        assert_eq!(db.table_count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn trait_review_insert_is_idempotent() {
        let db = test_db();
        db.upsert_bank("CBE", "Commercial Bank of Ethiopia").await.unwrap();
        let bank_id = db.bank_ids().await.unwrap()["CBE"];
        let review = StoredReview {
            review_id: "gp:1".into(),
            bank_id,
            review_text: "fast transfers".into(),
            rating: 5,
            review_date: Some("2024-04-30".into()),
            sentiment_label: "positive".into(),
            sentiment_score: 0.4,
            source: Some("Google Play".into()),
        };
        assert!(db.insert_review(&review).await.unwrap());
        assert!(!db.insert_review(&review).await.unwrap());
        assert_eq!(db.review_count().await.unwrap(), 1);
    }
}
