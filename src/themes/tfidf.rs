// TF-IDF keyword extraction.
//
// Each review is a document. The vocabulary is every unigram and bigram of
// the stop-word filtered token stream. When it exceeds `max_features`, only
// the terms with the highest total count across the corpus are kept. Kept
// terms come back in vocabulary (alphabetical) order, not sorted by score.

use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use tracing::debug;

use super::tokenize::Tokenizer;
use super::traits::{KeywordExtractor, KeywordSet};

pub struct TfIdfExtractor {
    tokenizer: Tokenizer,
    /// Vocabulary cap
    pub max_features: usize,
    /// Longest n-gram included in the vocabulary
    pub ngram_max: usize,
}

impl TfIdfExtractor {
    pub fn new(tokenizer: Tokenizer, max_features: usize, ngram_max: usize) -> Self {
        Self {
            tokenizer,
            max_features,
            ngram_max,
        }
    }
}

impl KeywordExtractor for TfIdfExtractor {
    fn extract(&self, docs: &[&str]) -> Result<KeywordSet> {
        if docs.is_empty() {
            anyhow::bail!("No documents to analyze");
        }

        // Per-document term counts; BTreeMap keeps the vocabulary sorted.
        let doc_counts: Vec<HashMap<String, u32>> = docs
            .iter()
            .map(|d| {
                let mut counts = HashMap::new();
                for term in self.tokenizer.ngrams(d, self.ngram_max) {
                    *counts.entry(term).or_insert(0) += 1;
                }
                counts
            })
            .collect();

        let mut totals: BTreeMap<&str, u32> = BTreeMap::new();
        let mut doc_freq: HashMap<&str, u32> = HashMap::new();
        for counts in &doc_counts {
            for (term, &c) in counts {
                *totals.entry(term.as_str()).or_insert(0) += c;
                *doc_freq.entry(term.as_str()).or_insert(0) += 1;
            }
        }

        if totals.is_empty() {
            anyhow::bail!("Empty vocabulary; the documents may only contain stop words");
        }

        // Cap by corpus frequency. The sort is stable over the alphabetical
        // vocabulary, so ties keep alphabetical order.
        let mut ranked: Vec<(&str, u32)> = totals.into_iter().collect();
        if ranked.len() > self.max_features {
            ranked.sort_by(|a, b| b.1.cmp(&a.1));
            ranked.truncate(self.max_features);
            ranked.sort_by(|a, b| a.0.cmp(b.0));
        }
        let terms: Vec<&str> = ranked.iter().map(|(t, _)| *t).collect();

        // Smoothed idf, raw tf, l2-normalized rows; weight = mean over documents.
        let n = docs.len() as f64;
        let idf: Vec<f64> = terms
            .iter()
            .map(|t| ((1.0 + n) / (1.0 + doc_freq[t] as f64)).ln() + 1.0)
            .collect();

        let mut weights = vec![0.0; terms.len()];
        for counts in &doc_counts {
            let row: Vec<f64> = terms
                .iter()
                .zip(&idf)
                .map(|(t, idf)| counts.get(*t).copied().unwrap_or(0) as f64 * idf)
                .collect();
            let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
            if norm > 0.0 {
                for (w, v) in weights.iter_mut().zip(&row) {
                    *w += v / norm;
                }
            }
        }
        for w in weights.iter_mut() {
            *w /= n;
        }

        debug!(terms = terms.len(), docs = docs.len(), "Extracted TF-IDF keywords");

        Ok(KeywordSet {
            terms: terms.into_iter().map(str::to_string).collect(),
            weights,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor(max_features: usize) -> TfIdfExtractor {
        TfIdfExtractor::new(
            Tokenizer::with_stop_words(["the", "is", "very", "and", "not"]),
            max_features,
            2,
        )
    }

    #[test]
    fn includes_bigrams_in_alphabetical_order() {
        let set = extractor(50)
            .extract(&["login fails", "login slow"])
            .unwrap();
        assert_eq!(
            set.terms,
            vec!["fails", "login", "login fails", "login slow", "slow"]
        );
        assert_eq!(set.weights.len(), set.terms.len());
    }

    #[test]
    fn cap_keeps_most_frequent_terms() {
        let set = extractor(2)
            .extract(&["zebra app", "zebra app", "zebra app crash"])
            .unwrap();
        // "zebra", "app" and "zebra app" all occur 3 times; ties go alphabetical
        assert_eq!(set.terms, vec!["app", "zebra"]);
    }

    #[test]
    fn stop_word_only_corpus_is_an_error() {
        assert!(extractor(50).extract(&["the is very", "and not"]).is_err());
        assert!(extractor(50).extract(&[]).is_err());
    }

    #[test]
    fn weights_are_bounded_and_symmetric() {
        let set = extractor(50)
            .extract(&["app crash", "app", "app"])
            .unwrap();
        let weight = |t: &str| set.weights[set.terms.iter().position(|x| x == t).unwrap()];
        assert!(set.weights.iter().all(|w| *w > 0.0 && *w <= 1.0));
        // same document frequency and count, same weight
        assert!((weight("crash") - weight("app crash")).abs() < 1e-12);
    }
}
