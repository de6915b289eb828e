// SQLite queries for banks and reviews.
//
// Every SQLite interaction goes through this module; SqliteDatabase only
// locks the connection and delegates here.

use std::collections::HashMap;

use anyhow::Result;
use rusqlite::{params, Connection};

use super::load::{self, LoadReport};
use super::models::{BankStat, StoredReview};
use crate::models::ScoredReview;

// --- Banks ---

/// Insert a bank; an existing code is left untouched. Returns true if inserted.
pub fn upsert_bank(conn: &Connection, bank_code: &str, bank_name: &str) -> Result<bool> {
    let changed = conn.execute(
        "INSERT INTO banks (bank_name, bank_code) VALUES (?1, ?2)
         ON CONFLICT(bank_code) DO NOTHING",
        params![bank_name, bank_code],
    )?;
    Ok(changed > 0)
}

pub fn bank_ids(conn: &Connection) -> Result<HashMap<String, i64>> {
    let mut stmt = conn.prepare("SELECT bank_code, bank_id FROM banks")?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;

    let mut ids = HashMap::new();
    for row in rows {
        let (code, id) = row?;
        ids.insert(code, id);
    }
    Ok(ids)
}

// --- Reviews ---

/// Insert a review; an existing review_id is a no-op. Returns true if inserted.
pub fn insert_review(conn: &Connection, review: &StoredReview) -> Result<bool> {
    let changed = conn.execute(
        "INSERT INTO reviews
            (review_id, bank_id, review_text, rating, review_date,
             sentiment_label, sentiment_score, source)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(review_id) DO NOTHING",
        params![
            review.review_id,
            review.bank_id,
            review.review_text,
            review.rating,
            review.review_date,
            review.sentiment_label,
            review.sentiment_score,
            review.source,
        ],
    )?;
    Ok(changed > 0)
}

/// Banks then reviews in a single transaction. Dropping the transaction on
/// an error rolls every insert back.
pub fn load_batch(conn: &mut Connection, scored: &[ScoredReview]) -> Result<LoadReport> {
    let tx = conn.transaction()?;
    let mut report = LoadReport::default();

    for (code, name) in load::distinct_banks(scored) {
        if upsert_bank(&tx, code, name)? {
            report.banks_inserted += 1;
        }
    }

    let ids = bank_ids(&tx)?;
    for review in scored {
        let Some(row) = load::stored_row(review, &ids) else {
            report.reviews_skipped += 1;
            continue;
        };
        if insert_review(&tx, &row)? {
            report.reviews_inserted += 1;
        } else {
            report.reviews_existing += 1;
        }
    }

    tx.commit()?;
    Ok(report)
}

pub fn review_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM reviews", [], |row| row.get(0))?;
    Ok(count)
}

// --- Verification reports ---

pub fn reviews_per_bank(conn: &Connection) -> Result<Vec<BankStat<i64>>> {
    let mut stmt = conn.prepare(
        "SELECT b.bank_name, COUNT(r.review_id)
         FROM banks b
         LEFT JOIN reviews r ON r.bank_id = b.bank_id
         GROUP BY b.bank_id, b.bank_name
         ORDER BY b.bank_name",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(BankStat {
            bank_name: row.get(0)?,
            value: row.get(1)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn average_rating_per_bank(conn: &Connection) -> Result<Vec<BankStat<f64>>> {
    let mut stmt = conn.prepare(
        "SELECT b.bank_name, AVG(r.rating)
         FROM banks b
         JOIN reviews r ON r.bank_id = b.bank_id
         GROUP BY b.bank_id, b.bank_name
         ORDER BY b.bank_name",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(BankStat {
            bank_name: row.get(0)?,
            value: row.get(1)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn sentiment_distribution(conn: &Connection) -> Result<Vec<(String, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT sentiment_label, COUNT(*)
         FROM reviews
         WHERE sentiment_label IS NOT NULL
         GROUP BY sentiment_label
         ORDER BY COUNT(*) DESC, sentiment_label",
    )?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}
