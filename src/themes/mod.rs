// Theme extraction: per-bank keywords, topics and rule-based themes.
//
// Reviews are grouped by bank code in first-appearance order. Each bank is
// processed on its own: a corpus that cannot be vectorized fails that bank
// only, and the failure is carried in its BankOutcome.

pub mod lda;
pub mod profile;
pub mod rules;
pub mod tfidf;
pub mod tokenize;
pub mod traits;

use anyhow::Result;
use tracing::{info, warn};

use crate::models::ScoredReview;
use lda::{CountMatrix, LdaConfig, LdaModel};
use profile::{BankKeywordProfile, Topic, TopicProfile};
use tfidf::TfIdfExtractor;
use tokenize::Tokenizer;
use traits::KeywordExtractor;

#[derive(Debug, Clone)]
pub struct ThemeOptions {
    /// Keyword vocabulary cap per bank
    pub max_features: usize,
    /// Longest n-gram considered for keywords
    pub ngram_max: usize,
    pub num_topics: usize,
    pub top_words: usize,
    pub lda_iterations: usize,
    pub seed: u64,
}

impl Default for ThemeOptions {
    fn default() -> Self {
        Self {
            max_features: 50,
            ngram_max: 2,
            num_topics: 4,
            top_words: 8,
            lda_iterations: 200,
            seed: 42,
        }
    }
}

/// Result of analyzing one bank.
#[derive(Debug)]
pub struct BankOutcome {
    pub bank_code: String,
    pub bank_name: String,
    pub review_count: usize,
    pub result: Result<(BankKeywordProfile, TopicProfile)>,
}

#[derive(Debug, Default)]
pub struct ThemeReport {
    pub banks: Vec<BankOutcome>,
    /// Reviews skipped because they carry no bank code.
    pub unassigned_reviews: usize,
}

impl ThemeReport {
    pub fn keyword_profiles(&self) -> impl Iterator<Item = &BankKeywordProfile> {
        self.banks
            .iter()
            .filter_map(|b| b.result.as_ref().ok().map(|(k, _)| k))
    }

    pub fn topic_profiles(&self) -> impl Iterator<Item = &TopicProfile> {
        self.banks
            .iter()
            .filter_map(|b| b.result.as_ref().ok().map(|(_, t)| t))
    }

    pub fn failed_banks(&self) -> impl Iterator<Item = &BankOutcome> {
        self.banks.iter().filter(|b| b.result.is_err())
    }
}

pub struct ThemeExtractor {
    keywords: Box<dyn KeywordExtractor + Send + Sync>,
    topic_tokenizer: Tokenizer,
    options: ThemeOptions,
}

impl ThemeExtractor {
    /// Extractor using the English stop-word list and TF-IDF keywords.
    pub fn new(options: ThemeOptions) -> Self {
        let keywords = TfIdfExtractor::new(Tokenizer::english(), options.max_features, options.ngram_max);
        Self::with_parts(Box::new(keywords), Tokenizer::english(), options)
    }

    pub fn with_parts(
        keywords: Box<dyn KeywordExtractor + Send + Sync>,
        topic_tokenizer: Tokenizer,
        options: ThemeOptions,
    ) -> Self {
        Self {
            keywords,
            topic_tokenizer,
            options,
        }
    }

    /// Analyze every bank in the scored reviews.
    pub fn extract(&self, reviews: &[ScoredReview]) -> ThemeReport {
        let mut report = ThemeReport::default();
        let mut groups: Vec<(String, String, Vec<&str>)> = Vec::new();

        for review in reviews {
            let Some(code) = review.bank_code.as_deref() else {
                report.unassigned_reviews += 1;
                continue;
            };
            match groups.iter_mut().find(|(c, _, _)| c == code) {
                Some((_, _, docs)) => docs.push(&review.review_text),
                None => groups.push((
                    code.to_string(),
                    review.bank_name.clone(),
                    vec![review.review_text.as_str()],
                )),
            }
        }

        for (bank_code, bank_name, docs) in groups {
            let result = self.analyze_bank(&bank_code, &bank_name, &docs);
            match &result {
                Ok((keywords, _)) => info!(
                    bank = %bank_code,
                    reviews = docs.len(),
                    keywords = keywords.keywords.len(),
                    themes = %keywords.themes.join(", "),
                    "Extracted bank themes"
                ),
                Err(e) => warn!(bank = %bank_code, error = %e, "Theme extraction failed, skipping bank"),
            }
            report.banks.push(BankOutcome {
                bank_code,
                bank_name,
                review_count: docs.len(),
                result,
            });
        }

        report
    }

    fn analyze_bank(
        &self,
        bank_code: &str,
        bank_name: &str,
        docs: &[&str],
    ) -> Result<(BankKeywordProfile, TopicProfile)> {
        // Step 1: keywords and rule-based themes
        let set = self.keywords.extract(docs)?;
        let themes = rules::match_themes(&set.terms.join(profile::LIST_SEPARATOR));
        let keyword_profile = BankKeywordProfile {
            bank_code: bank_code.to_string(),
            bank_name: bank_name.to_string(),
            keywords: set.terms,
            weights: set.weights,
            themes,
        };

        // Step 2: topic model over unigram counts
        let matrix = CountMatrix::from_documents(&self.topic_tokenizer, docs)?;
        let config = LdaConfig {
            num_topics: self.options.num_topics,
            iterations: self.options.lda_iterations,
            seed: self.options.seed,
            ..Default::default()
        };
        let model = LdaModel::fit(&matrix, &config)?;
        let topics = model
            .top_words(&matrix.vocabulary, self.options.top_words)
            .into_iter()
            .enumerate()
            .map(|(i, words)| Topic {
                number: i + 1,
                words,
            })
            .collect();

        Ok((
            keyword_profile,
            TopicProfile {
                bank_code: bank_code.to_string(),
                bank_name: bank_name.to_string(),
                topics,
            },
        ))
    }
}
