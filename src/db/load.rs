// Loading scored reviews into the store.
//
// Banks go in first (distinct codes, first-seen order), then the code→id
// map is read back and each review is inserted against its bank id. Both
// inserts are no-ops on an existing key, so reloading the same artifact
// changes nothing. Backends run the whole batch in one transaction: if any
// insert fails, nothing from the batch is kept.

use std::collections::HashMap;

use anyhow::Result;
use tracing::{debug, info, instrument};

use super::models::StoredReview;
use super::traits::Database;
use crate::models::ScoredReview;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct LoadReport {
    pub banks_inserted: usize,
    pub reviews_inserted: usize,
    /// Reviews whose id was already stored
    pub reviews_existing: usize,
    /// Reviews with no id or no bank code
    pub reviews_skipped: usize,
}

#[instrument(skip_all, fields(reviews = scored.len()))]
pub async fn load_reviews(db: &dyn Database, scored: &[ScoredReview]) -> Result<LoadReport> {
    let report = db.load_batch(scored).await?;

    info!(
        banks = report.banks_inserted,
        inserted = report.reviews_inserted,
        existing = report.reviews_existing,
        skipped = report.reviews_skipped,
        "Load complete"
    );
    Ok(report)
}

/// Distinct (bank_code, bank_name) pairs in first-seen order. Reviews
/// without a bank code contribute nothing.
pub fn distinct_banks(scored: &[ScoredReview]) -> Vec<(&str, &str)> {
    let mut banks: Vec<(&str, &str)> = Vec::new();
    for review in scored {
        let Some(code) = review.bank_code.as_deref() else {
            continue;
        };
        if !banks.iter().any(|(c, _)| *c == code) {
            banks.push((code, review.bank_name.as_str()));
        }
    }
    banks
}

/// The stored row for a review, or None when it has no id or its bank code
/// is unknown to the store.
pub fn stored_row(review: &ScoredReview, bank_ids: &HashMap<String, i64>) -> Option<StoredReview> {
    let bank_id = review
        .bank_code
        .as_deref()
        .and_then(|code| bank_ids.get(code).copied());
    let row = bank_id.and_then(|id| StoredReview::from_scored(review, id));
    if row.is_none() {
        debug!(review_id = ?review.review_id, bank = ?review.bank_code, "Skipping review without id or bank");
    }
    row
}
