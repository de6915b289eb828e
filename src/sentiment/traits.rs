// Sentiment scorer trait and the three-way label derived from a compound score.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::{CleanReview, ScoredReview};

/// Compound scores at or above this are positive.
pub const POSITIVE_THRESHOLD: f64 = 0.05;
/// Compound scores at or below this are negative.
pub const NEGATIVE_THRESHOLD: f64 = -0.05;

/// Three-way sentiment label. Always a pure function of the compound score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub fn from_score(score: f64) -> Self {
        if score >= POSITIVE_THRESHOLD {
            SentimentLabel::Positive
        } else if score <= NEGATIVE_THRESHOLD {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Negative => "negative",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for scoring review polarity. Scoring is CPU-only, so unlike the
/// source and store traits this one is synchronous.
pub trait SentimentScorer: Send + Sync {
    /// Compound polarity of a single text, in [-1, 1].
    fn polarity(&self, text: &str) -> f64;

    /// Score every review, preserving order.
    fn score_reviews(&self, reviews: Vec<CleanReview>) -> Vec<ScoredReview> {
        reviews
            .into_iter()
            .map(|review| {
                let score = self.polarity(&review.review_text).clamp(-1.0, 1.0);
                ScoredReview::from_clean(review, score)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_thresholds() {
        assert_eq!(SentimentLabel::from_score(0.06), SentimentLabel::Positive);
        assert_eq!(SentimentLabel::from_score(0.05), SentimentLabel::Positive);
        assert_eq!(SentimentLabel::from_score(0.0), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::from_score(0.0499), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::from_score(-0.05), SentimentLabel::Negative);
        assert_eq!(SentimentLabel::from_score(-0.2), SentimentLabel::Negative);
    }

    #[test]
    fn label_display_is_lowercase() {
        assert_eq!(SentimentLabel::Positive.to_string(), "positive");
        assert_eq!(SentimentLabel::Negative.as_str(), "negative");
    }
}
