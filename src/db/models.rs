// Store-side row shapes.
//
// Kept apart from the backends so the loader and status report can use them
// without depending on rusqlite or sqlx.

use serde::{Deserialize, Serialize};

use crate::models::ScoredReview;

/// A review row as persisted in the `reviews` relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReview {
    pub review_id: String,
    pub bank_id: i64,
    pub review_text: String,
    pub rating: u8,
    /// Canonical YYYY-MM-DD, or the verbatim value when it never parsed
    pub review_date: Option<String>,
    pub sentiment_label: String,
    pub sentiment_score: f64,
    pub source: Option<String>,
}

impl StoredReview {
    /// Build the stored row for a scored review. None when the review has no id.
    pub fn from_scored(review: &ScoredReview, bank_id: i64) -> Option<Self> {
        Some(Self {
            review_id: review.review_id.clone()?,
            bank_id,
            review_text: review.review_text.clone(),
            rating: review.rating,
            review_date: review.review_date.clone(),
            sentiment_label: review.sentiment_label.as_str().to_string(),
            sentiment_score: review.sentiment_score,
            source: review.source.clone(),
        })
    }
}

/// One line of a per-bank aggregate (review count or average rating).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BankStat<T> {
    pub bank_name: String,
    pub value: T,
}
