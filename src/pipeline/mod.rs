// Pipeline stages: each reads its input artifact, runs one component, and
// writes its output artifact(s).
//
// Stages are independently re-runnable and run strictly in sequence. A stage
// that cannot produce its output returns Err and writes nothing. Stages with
// two outputs stage both files before renaming either, so a serialization
// failure never publishes one without the other.

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::artifacts;
use crate::config::Config;
use crate::db::{self, Database, LoadReport};
use crate::models::{CleanReview, RawReview, ScoredReview};
use crate::normalize::{self, NormalizeStats};
use crate::sentiment::{SentimentLabel, SentimentScorer};
use crate::source::scrape::{self, FetchOutcome, ScrapeReport};
use crate::source::traits::ReviewSource;
use crate::themes::{ThemeExtractor, ThemeReport};

/// Collect raw reviews and app summaries for every configured bank.
pub async fn scrape_stage(config: &Config, source: &dyn ReviewSource) -> Result<ScrapeReport> {
    let report = scrape::scrape_all(source, &config.banks, &config.scrape_options()).await;
    check_scrape(&report, config.strict)?;

    let mut staged = vec![artifacts::stage_rows(&config.paths.raw_reviews, &report.reviews)?];
    let app_info = report.app_info_rows();
    if app_info.is_empty() {
        warn!("No app summaries collected; app info artifact not written");
    } else {
        staged.push(artifacts::stage_rows(&config.paths.app_info, &app_info)?);
    }
    artifacts::publish_all(staged)?;
    info!(rows = report.reviews.len(), path = %config.paths.raw_reviews.display(), "Wrote raw reviews");

    Ok(report)
}

/// Decide whether a scrape produced a usable artifact.
pub fn check_scrape(report: &ScrapeReport, strict: bool) -> Result<()> {
    let exhausted: Vec<&str> = report
        .exhausted()
        .map(|a| a.bank.code.as_str())
        .collect();

    if !report.apps.is_empty() && exhausted.len() == report.apps.len() {
        anyhow::bail!("Every app failed after retries; no raw artifact written");
    }
    if report.reviews.is_empty() && !exhausted.is_empty() {
        anyhow::bail!(
            "No reviews collected and {} app(s) failed ({}); no raw artifact written",
            exhausted.len(),
            exhausted.join(", ")
        );
    }
    if strict && !exhausted.is_empty() {
        anyhow::bail!(
            "Strict mode: {} app(s) failed after retries ({})",
            exhausted.len(),
            exhausted.join(", ")
        );
    }
    Ok(())
}

/// Clean the raw artifact into the processed artifact.
pub fn preprocess_stage(config: &Config) -> Result<NormalizeStats> {
    let raw: Vec<RawReview> = artifacts::read_rows(&config.paths.raw_reviews)?;
    let output = normalize::normalize(raw, &config.normalize_options());
    let stats = output.stats;

    if config.strict && stats.dates_unparsed > 0 {
        anyhow::bail!(
            "Strict mode: {} review date(s) could not be parsed",
            stats.dates_unparsed
        );
    }
    if output.reviews.is_empty() {
        anyhow::bail!(
            "No reviews survived cleaning ({} raw rows); processed artifact not written",
            stats.original_count
        );
    }

    artifacts::write_rows(&config.paths.processed_reviews, &output.reviews)?;
    Ok(stats)
}

/// Per-label counts and per-bank mean score for a scored batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SentimentSummary {
    pub total: usize,
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
    /// (bank name, mean compound score), first-seen order
    pub mean_by_bank: Vec<(String, f64)>,
}

impl SentimentSummary {
    pub fn from_scored(scored: &[ScoredReview]) -> Self {
        let mut summary = SentimentSummary {
            total: scored.len(),
            ..Default::default()
        };
        let mut sums: Vec<(String, f64, usize)> = Vec::new();

        for review in scored {
            match review.sentiment_label {
                SentimentLabel::Positive => summary.positive += 1,
                SentimentLabel::Neutral => summary.neutral += 1,
                SentimentLabel::Negative => summary.negative += 1,
            }
            match sums.iter_mut().find(|(name, _, _)| *name == review.bank_name) {
                Some((_, sum, n)) => {
                    *sum += review.sentiment_score;
                    *n += 1;
                }
                None => sums.push((review.bank_name.clone(), review.sentiment_score, 1)),
            }
        }

        summary.mean_by_bank = sums
            .into_iter()
            .map(|(name, sum, n)| (name, sum / n as f64))
            .collect();
        summary
    }
}

/// Score the processed artifact. The scorer is built (and its lexicon
/// loaded) by the caller, so a missing lexicon fails before any row is read.
pub fn sentiment_stage(config: &Config, scorer: &dyn SentimentScorer) -> Result<SentimentSummary> {
    let cleaned: Vec<CleanReview> = artifacts::read_rows(&config.paths.processed_reviews)?;
    let scored = scorer.score_reviews(cleaned);
    let summary = SentimentSummary::from_scored(&scored);

    artifacts::write_rows(&config.paths.sentiment_results, &scored)?;
    info!(
        total = summary.total,
        positive = summary.positive,
        neutral = summary.neutral,
        negative = summary.negative,
        "Sentiment scoring complete"
    );
    Ok(summary)
}

/// Extract keyword and topic profiles per bank from the scored artifact.
pub fn themes_stage(config: &Config) -> Result<ThemeReport> {
    let scored: Vec<ScoredReview> = artifacts::read_rows(&config.paths.sentiment_results)?;
    let report = ThemeExtractor::new(config.theme_options()).extract(&scored);

    let failed: Vec<&str> = report
        .failed_banks()
        .map(|b| b.bank_code.as_str())
        .collect();
    if config.strict && !failed.is_empty() {
        anyhow::bail!("Strict mode: theme extraction failed for {}", failed.join(", "));
    }

    let keyword_rows: Vec<_> = report.keyword_profiles().map(|p| p.to_row()).collect();
    if keyword_rows.is_empty() {
        anyhow::bail!("Theme extraction produced no bank profiles; artifacts not written");
    }
    let topic_rows: Vec<_> = report
        .topic_profiles()
        .flat_map(|p| p.to_rows())
        .collect();

    let keywords = artifacts::stage_rows(&config.paths.keyword_profiles, &keyword_rows)?;
    let topics = artifacts::stage_rows(&config.paths.topic_profiles, &topic_rows)?;
    artifacts::publish_all(vec![keywords, topics])?;
    Ok(report)
}

/// Persist the scored artifact into the store.
pub async fn load_stage(config: &Config, db: &dyn Database) -> Result<LoadReport> {
    let scored: Vec<ScoredReview> = artifacts::read_rows(&config.paths.sentiment_results)?;
    db::load_reviews(db, &scored)
        .await
        .context("Failed to load reviews into the store")
}

/// How a scrape report reads in one line per app, for summaries.
pub fn describe_fetch(outcome: &FetchOutcome) -> String {
    match outcome {
        FetchOutcome::Fetched { count, attempts } => {
            format!("{count} reviews ({attempts} attempt(s))")
        }
        FetchOutcome::Exhausted { attempts, last_error } => {
            format!("failed after {attempts} attempt(s): {last_error}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BankApp;
    use crate::models::CleanReview;
    use crate::source::scrape::AppFetch;

    fn app(code: &str, outcome: FetchOutcome) -> AppFetch {
        AppFetch {
            bank: BankApp {
                code: code.into(),
                name: format!("{code} Bank"),
                app_id: format!("app.{code}"),
            },
            summary: None,
            outcome,
        }
    }

    fn raw(n: usize) -> Vec<RawReview> {
        (0..n)
            .map(|i| RawReview {
                review_id: Some(format!("r{i}")),
                review_text: Some("fine".into()),
                rating: Some(4),
                review_date: Some("2024-05-01".into()),
                user_name: None,
                thumbs_up: Some(0),
                bank_code: Some("CBE".into()),
                bank_name: Some("CBE Bank".into()),
                source: Some("Google Play".into()),
            })
            .collect()
    }

    fn exhausted() -> FetchOutcome {
        FetchOutcome::Exhausted {
            attempts: 3,
            last_error: "timeout".into(),
        }
    }

    #[test]
    fn partial_scrape_passes_unless_strict() {
        let report = ScrapeReport {
            apps: vec![
                app("CBE", FetchOutcome::Fetched { count: 2, attempts: 1 }),
                app("BOA", exhausted()),
            ],
            reviews: raw(2),
        };
        assert!(check_scrape(&report, false).is_ok());
        let err = check_scrape(&report, true).unwrap_err();
        assert!(err.to_string().contains("BOA"));
    }

    #[test]
    fn all_apps_failed_is_an_error() {
        let report = ScrapeReport {
            apps: vec![app("CBE", exhausted()), app("BOA", exhausted())],
            reviews: vec![],
        };
        assert!(check_scrape(&report, false).is_err());
    }

    #[test]
    fn empty_with_any_failure_is_an_error() {
        let report = ScrapeReport {
            apps: vec![
                app("CBE", FetchOutcome::Fetched { count: 0, attempts: 1 }),
                app("BOA", exhausted()),
            ],
            reviews: vec![],
        };
        assert!(check_scrape(&report, false).is_err());
    }

    #[test]
    fn genuinely_empty_scrape_is_ok() {
        let report = ScrapeReport {
            apps: vec![app("CBE", FetchOutcome::Fetched { count: 0, attempts: 1 })],
            reviews: vec![],
        };
        assert!(check_scrape(&report, true).is_ok());
    }

    #[test]
    fn sentiment_summary_counts_labels_and_bank_means() {
        let clean = |bank: &str| CleanReview {
            review_id: None,
            review_text: "x".into(),
            rating: 3,
            review_date: None,
            bank_code: None,
            bank_name: bank.into(),
            user_name: "Anonymous".into(),
            thumbs_up: 0,
            text_length: 1,
            source: None,
        };
        let scored = vec![
            ScoredReview::from_clean(clean("A"), 0.5),
            ScoredReview::from_clean(clean("A"), -0.3),
            ScoredReview::from_clean(clean("B"), 0.0),
        ];
        let summary = SentimentSummary::from_scored(&scored);
        assert_eq!(summary.total, 3);
        assert_eq!((summary.positive, summary.neutral, summary.negative), (1, 1, 1));
        assert_eq!(summary.mean_by_bank.len(), 2);
        assert!((summary.mean_by_bank[0].1 - 0.1).abs() < 1e-9);
        assert_eq!(summary.mean_by_bank[1].0, "B");
    }

    #[test]
    fn describe_fetch_mentions_failure() {
        assert!(describe_fetch(&exhausted()).contains("timeout"));
        assert_eq!(
            describe_fetch(&FetchOutcome::Fetched { count: 5, attempts: 2 }),
            "5 reviews (2 attempt(s))"
        );
    }
}
