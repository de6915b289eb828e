// Sentiment scoring: lexicon/rule-based compound polarity per review.
//
// The scorer sits behind the SentimentScorer trait. The default
// implementation is a VADER-style scorer driven by a lexicon file on disk.

pub mod download;
pub mod traits;
pub mod vader;

pub use traits::{SentimentLabel, SentimentScorer};
pub use vader::VaderScorer;
