// Latent Dirichlet Allocation via collapsed Gibbs sampling.
//
// Works on a bag-of-words count matrix over unigrams. Sampling uses a seeded
// StdRng and visits tokens in a fixed order, so the same corpus and seed
// always produce the same topics.

use std::collections::BTreeMap;

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::tokenize::Tokenizer;

/// Sparse document-term counts with an alphabetical vocabulary.
#[derive(Debug, Clone)]
pub struct CountMatrix {
    pub vocabulary: Vec<String>,
    /// Per document: (term index, count), ordered by term index.
    pub docs: Vec<Vec<(usize, u32)>>,
}

impl CountMatrix {
    /// Build unigram counts for each document. An empty vocabulary is an error.
    pub fn from_documents(tokenizer: &Tokenizer, docs: &[&str]) -> Result<Self> {
        let tokenized: Vec<Vec<String>> = docs.iter().map(|d| tokenizer.tokens(d)).collect();

        let mut index: BTreeMap<&str, usize> = BTreeMap::new();
        for tokens in &tokenized {
            for t in tokens {
                index.entry(t.as_str()).or_insert(0);
            }
        }
        if index.is_empty() {
            anyhow::bail!("Empty vocabulary; the documents may only contain stop words");
        }
        for (i, slot) in index.values_mut().enumerate() {
            *slot = i;
        }

        let docs = tokenized
            .iter()
            .map(|tokens| {
                let mut counts: BTreeMap<usize, u32> = BTreeMap::new();
                for t in tokens {
                    *counts.entry(index[t.as_str()]).or_insert(0) += 1;
                }
                counts.into_iter().collect()
            })
            .collect();
        let vocabulary = index.keys().map(|k| k.to_string()).collect();

        Ok(Self { vocabulary, docs })
    }
}

#[derive(Debug, Clone)]
pub struct LdaConfig {
    pub num_topics: usize,
    pub iterations: usize,
    pub seed: u64,
    /// Document-topic prior; defaults to 1 / num_topics.
    pub alpha: Option<f64>,
    /// Topic-word prior; defaults to 1 / num_topics.
    pub beta: Option<f64>,
}

impl Default for LdaConfig {
    fn default() -> Self {
        Self {
            num_topics: 4,
            iterations: 200,
            seed: 42,
            alpha: None,
            beta: None,
        }
    }
}

/// A fitted model: one weight per (topic, term).
#[derive(Debug, Clone)]
pub struct LdaModel {
    /// num_topics rows of vocabulary-length weights (counts plus prior).
    pub topic_word: Vec<Vec<f64>>,
}

impl LdaModel {
    /// Fit topics to a count matrix.
    pub fn fit(matrix: &CountMatrix, config: &LdaConfig) -> Result<Self> {
        let k = config.num_topics;
        if k == 0 {
            anyhow::bail!("Topic count must be at least 1");
        }
        let v = matrix.vocabulary.len();
        let alpha = config.alpha.unwrap_or(1.0 / k as f64);
        let beta = config.beta.unwrap_or(1.0 / k as f64);
        let v_beta = v as f64 * beta;

        let mut rng = StdRng::seed_from_u64(config.seed);

        // Expand counts into token streams of term ids.
        let words: Vec<Vec<usize>> = matrix
            .docs
            .iter()
            .map(|doc| {
                doc.iter()
                    .flat_map(|&(term, count)| std::iter::repeat(term).take(count as usize))
                    .collect()
            })
            .collect();

        let mut doc_topic = vec![vec![0u32; k]; words.len()];
        let mut topic_word = vec![vec![0u32; v]; k];
        let mut topic_total = vec![0u32; k];
        let mut assignments: Vec<Vec<usize>> = Vec::with_capacity(words.len());

        for (d, doc) in words.iter().enumerate() {
            let mut z = Vec::with_capacity(doc.len());
            for &w in doc {
                let topic = rng.gen_range(0..k);
                doc_topic[d][topic] += 1;
                topic_word[topic][w] += 1;
                topic_total[topic] += 1;
                z.push(topic);
            }
            assignments.push(z);
        }

        let mut probs = vec![0.0; k];
        for _ in 0..config.iterations {
            for (d, doc) in words.iter().enumerate() {
                for (i, &w) in doc.iter().enumerate() {
                    let old = assignments[d][i];
                    doc_topic[d][old] -= 1;
                    topic_word[old][w] -= 1;
                    topic_total[old] -= 1;

                    let mut total = 0.0;
                    for (t, p) in probs.iter_mut().enumerate() {
                        *p = (doc_topic[d][t] as f64 + alpha)
                            * (topic_word[t][w] as f64 + beta)
                            / (topic_total[t] as f64 + v_beta);
                        total += *p;
                    }

                    let mut target = rng.gen::<f64>() * total;
                    let mut new = k - 1;
                    for (t, p) in probs.iter().enumerate() {
                        if target < *p {
                            new = t;
                            break;
                        }
                        target -= p;
                    }

                    assignments[d][i] = new;
                    doc_topic[d][new] += 1;
                    topic_word[new][w] += 1;
                    topic_total[new] += 1;
                }
            }
        }

        debug!(
            topics = k,
            vocabulary = v,
            tokens = topic_total.iter().sum::<u32>(),
            "Fitted LDA model"
        );

        Ok(Self {
            topic_word: topic_word
                .into_iter()
                .map(|row| row.into_iter().map(|c| c as f64 + beta).collect())
                .collect(),
        })
    }

    /// Top `n` terms per topic by weight, descending. Ties keep vocabulary order.
    pub fn top_words(&self, vocabulary: &[String], n: usize) -> Vec<Vec<String>> {
        self.topic_word
            .iter()
            .map(|weights| {
                let mut order: Vec<usize> = (0..weights.len()).collect();
                order.sort_by(|&a, &b| weights[b].total_cmp(&weights[a]));
                order
                    .into_iter()
                    .take(n)
                    .map(|i| vocabulary[i].clone())
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenizer() -> Tokenizer {
        Tokenizer::with_stop_words(["the", "is"])
    }

    const DOCS: [&str; 6] = [
        "login password account locked",
        "password reset account login failed",
        "transfer payment balance fee",
        "payment transfer failed balance",
        "slow loading crash update",
        "crash after update slow",
    ];

    #[test]
    fn count_matrix_vocabulary_is_sorted() {
        let m = CountMatrix::from_documents(&tokenizer(), &["beta alpha alpha", "gamma"]).unwrap();
        assert_eq!(m.vocabulary, vec!["alpha", "beta", "gamma"]);
        assert_eq!(m.docs[0], vec![(0, 2), (1, 1)]);
        assert_eq!(m.docs[1], vec![(2, 1)]);
    }

    #[test]
    fn fit_produces_requested_topic_count() {
        let m = CountMatrix::from_documents(&tokenizer(), &DOCS).unwrap();
        let model = LdaModel::fit(&m, &LdaConfig::default()).unwrap();
        let topics = model.top_words(&m.vocabulary, 8);
        assert_eq!(topics.len(), 4);
        assert!(topics.iter().all(|t| t.len() == 8));
    }

    #[test]
    fn same_seed_same_topics() {
        let m = CountMatrix::from_documents(&tokenizer(), &DOCS).unwrap();
        let a = LdaModel::fit(&m, &LdaConfig::default()).unwrap();
        let b = LdaModel::fit(&m, &LdaConfig::default()).unwrap();
        assert_eq!(a.top_words(&m.vocabulary, 8), b.top_words(&m.vocabulary, 8));
        assert_eq!(a.topic_word, b.topic_word);
    }

    #[test]
    fn small_vocabulary_yields_fewer_words() {
        let m = CountMatrix::from_documents(&tokenizer(), &["slow app", "app crash"]).unwrap();
        let model = LdaModel::fit(&m, &LdaConfig::default()).unwrap();
        let topics = model.top_words(&m.vocabulary, 8);
        assert_eq!(topics.len(), 4);
        assert!(topics.iter().all(|t| t.len() == 3));
    }

    #[test]
    fn stop_word_only_corpus_is_an_error() {
        assert!(CountMatrix::from_documents(&tokenizer(), &["the is", "is"]).is_err());
    }
}
