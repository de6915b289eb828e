// Review rows as they move through the pipeline.
//
// Each struct is one artifact's row shape. Optional fields are the ones a
// stage may legitimately see missing; an empty CSV field reads back as None.

use serde::{Deserialize, Deserializer, Serialize};

use crate::sentiment::traits::SentimentLabel;

/// Provenance tag written on every collected review.
pub const SOURCE_TAG: &str = "Google Play";

/// A review as collected from the store, before any cleaning.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawReview {
    pub review_id: Option<String>,
    pub review_text: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub rating: Option<u8>,
    pub review_date: Option<String>,
    pub user_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub thumbs_up: Option<u32>,
    pub bank_code: Option<String>,
    pub bank_name: Option<String>,
    pub source: Option<String>,
}

/// A review after normalization. Text is non-empty and free of Ethiopic script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanReview {
    pub review_id: Option<String>,
    pub review_text: String,
    pub rating: u8,
    pub review_date: Option<String>,
    pub bank_code: Option<String>,
    pub bank_name: String,
    pub user_name: String,
    pub thumbs_up: u32,
    pub text_length: usize,
    pub source: Option<String>,
}

/// A cleaned review with its compound polarity score and label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredReview {
    pub review_id: Option<String>,
    pub review_text: String,
    pub rating: u8,
    pub review_date: Option<String>,
    pub bank_code: Option<String>,
    pub bank_name: String,
    pub user_name: String,
    pub thumbs_up: u32,
    pub text_length: usize,
    pub source: Option<String>,
    pub sentiment_score: f64,
    pub sentiment_label: SentimentLabel,
}

impl ScoredReview {
    /// Attach a score to a cleaned review. The label always derives from the score.
    pub fn from_clean(review: CleanReview, score: f64) -> Self {
        Self {
            review_id: review.review_id,
            review_text: review.review_text,
            rating: review.rating,
            review_date: review.review_date,
            bank_code: review.bank_code,
            bank_name: review.bank_name,
            user_name: review.user_name,
            thumbs_up: review.thumbs_up,
            text_length: review.text_length,
            source: review.source,
            sentiment_score: score,
            sentiment_label: SentimentLabel::from_score(score),
        }
    }
}

/// Accept integers written as "4" or "4.0" (tabular tools widen int columns
/// with gaps to floats). Anything else reads as missing.
fn lenient_int<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        let s = s.trim();
        let value = s
            .parse::<u64>()
            .ok()
            .or_else(|| match s.parse::<f64>() {
                Ok(f) if f >= 0.0 && f.fract() == 0.0 => Some(f as u64),
                _ => None,
            })?;
        T::try_from(value).ok()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_reviews_read_empty_fields_as_missing() {
        let data = "review_id,review_text,rating,review_date,user_name,thumbs_up,bank_code,bank_name,source\n\
                    r1,,4.0,2024-01-02,,,CBE,Commercial Bank of Ethiopia,Google Play\n";
        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let rows: Vec<RawReview> = reader.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].review_text, None);
        assert_eq!(rows[0].rating, Some(4));
        assert_eq!(rows[0].user_name, None);
        assert_eq!(rows[0].thumbs_up, None);
        assert_eq!(rows[0].bank_code.as_deref(), Some("CBE"));
    }

    #[test]
    fn scored_label_follows_score() {
        let clean = CleanReview {
            review_id: Some("r1".into()),
            review_text: "fine".into(),
            rating: 3,
            review_date: None,
            bank_code: Some("BOA".into()),
            bank_name: "Bank of Abyssinia".into(),
            user_name: "Anonymous".into(),
            thumbs_up: 0,
            text_length: 4,
            source: None,
        };
        let scored = ScoredReview::from_clean(clean, -0.2);
        assert_eq!(scored.sentiment_label, SentimentLabel::Negative);
    }
}
