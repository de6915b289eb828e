// Keyword extractor trait: lets the TF-IDF extractor be swapped without
// touching per-bank orchestration.

use anyhow::Result;

/// Characteristic terms of a corpus, in the extractor's own ranking order.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordSet {
    pub terms: Vec<String>,
    /// One weight per term (mean TF-IDF across documents for the default extractor).
    pub weights: Vec<f64>,
}

pub trait KeywordExtractor {
    /// Extract keywords from a corpus of documents. Errors when the corpus
    /// yields no usable vocabulary.
    fn extract(&self, docs: &[&str]) -> Result<KeywordSet>;
}
