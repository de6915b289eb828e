// Scrape orchestration: every configured bank, one app at a time.
//
// Each app's review fetch runs under the fixed-delay retry policy. A failure
// after the last attempt is recorded as Exhausted for that app and the run
// moves on; other apps are unaffected.

use std::time::Duration;

use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::retry::{retry_fixed, Attempted, RetryPolicy};
use super::traits::{AppSummary, ReviewSource, SourceReview};
use crate::config::BankApp;
use crate::models::{RawReview, SOURCE_TAG};

/// Placeholder for app summary fields the store did not provide.
const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    /// Reviews requested per app
    pub count: u32,
    pub lang: String,
    pub country: String,
    /// Total fetch attempts per app
    pub max_attempts: u32,
    pub retry_delay: Duration,
    /// Pause between apps
    pub app_delay: Duration,
}

/// How one app's review fetch ended.
#[derive(Debug)]
pub enum FetchOutcome {
    /// The source answered; the list may legitimately be empty.
    Fetched { count: usize, attempts: u32 },
    /// Every attempt failed.
    Exhausted { attempts: u32, last_error: String },
}

#[derive(Debug)]
pub struct AppFetch {
    pub bank: BankApp,
    pub summary: Option<AppSummary>,
    pub outcome: FetchOutcome,
}

#[derive(Debug, Default)]
pub struct ScrapeReport {
    pub apps: Vec<AppFetch>,
    pub reviews: Vec<RawReview>,
}

impl ScrapeReport {
    pub fn exhausted(&self) -> impl Iterator<Item = &AppFetch> {
        self.apps
            .iter()
            .filter(|a| matches!(a.outcome, FetchOutcome::Exhausted { .. }))
    }

    /// Rows for the app summary artifact, one per app that returned a summary.
    pub fn app_info_rows(&self) -> Vec<AppInfoRow> {
        self.apps
            .iter()
            .filter_map(|a| a.summary.as_ref().map(|s| AppInfoRow::new(&a.bank, s)))
            .collect()
    }
}

/// App summary artifact row. Missing values are written as "N/A".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppInfoRow {
    pub app_id: String,
    pub title: String,
    pub score: String,
    pub ratings: String,
    pub reviews: String,
    pub installs: String,
    pub bank_code: String,
    pub bank_name: String,
}

impl AppInfoRow {
    pub fn new(bank: &BankApp, summary: &AppSummary) -> Self {
        fn or_na<T: ToString>(v: &Option<T>) -> String {
            v.as_ref()
                .map(|x| x.to_string())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string())
        }
        Self {
            app_id: bank.app_id.clone(),
            title: or_na(&summary.title),
            score: or_na(&summary.score),
            ratings: or_na(&summary.ratings),
            reviews: or_na(&summary.reviews),
            installs: or_na(&summary.installs),
            bank_code: bank.code.clone(),
            bank_name: bank.name.clone(),
        }
    }
}

/// Map store reviews to raw artifact rows for one bank. Missing helpful
/// counts become 0 and missing timestamps become `now`.
pub fn to_raw_rows(reviews: Vec<SourceReview>, bank: &BankApp, now: DateTime<Utc>) -> Vec<RawReview> {
    reviews
        .into_iter()
        .map(|r| RawReview {
            review_id: Some(r.review_id),
            review_text: r.text,
            rating: r.score,
            review_date: Some(r.at.unwrap_or(now).format("%Y-%m-%d %H:%M:%S").to_string()),
            user_name: r.user_name,
            thumbs_up: Some(r.thumbs_up.unwrap_or(0)),
            bank_code: Some(bank.code.clone()),
            bank_name: Some(bank.name.clone()),
            source: Some(SOURCE_TAG.to_string()),
        })
        .collect()
}

/// Collect reviews and summaries for every bank, in order.
pub async fn scrape_all(
    source: &dyn ReviewSource,
    banks: &[BankApp],
    options: &ScrapeOptions,
) -> ScrapeReport {
    let policy = RetryPolicy::new(options.max_attempts, options.retry_delay);
    let mut report = ScrapeReport::default();

    let pb = ProgressBar::new(banks.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  Banks [{bar:30}] {pos}/{len} {msg}")
            .expect("valid template")
            .progress_chars("=> "),
    );

    for (i, bank) in banks.iter().enumerate() {
        pb.set_message(bank.code.clone());

        // Step 1: app summary (single attempt, optional)
        let summary = match source
            .fetch_app_summary(&bank.app_id, &options.lang, &options.country)
            .await
        {
            Ok(summary) => summary,
            Err(e) => {
                warn!(bank = %bank.code, app_id = %bank.app_id, error = %e, "App summary unavailable");
                None
            }
        };

        // Step 2: reviews under the retry policy
        let attempted = retry_fixed(&policy, || {
            source.fetch_reviews(&bank.app_id, options.count, &options.lang, &options.country)
        })
        .await;

        let outcome = match attempted {
            Attempted::Succeeded { value, attempts } => {
                info!(bank = %bank.code, reviews = value.len(), attempts, "Fetched reviews");
                let count = value.len();
                report.reviews.extend(to_raw_rows(value, bank, Utc::now()));
                FetchOutcome::Fetched { count, attempts }
            }
            Attempted::Exhausted {
                attempts,
                last_error,
            } => {
                warn!(
                    bank = %bank.code,
                    attempts,
                    error = %last_error,
                    "Giving up on app after max attempts"
                );
                FetchOutcome::Exhausted {
                    attempts,
                    last_error: format!("{last_error:#}"),
                }
            }
        };

        report.apps.push(AppFetch {
            bank: bank.clone(),
            summary,
            outcome,
        });
        pb.inc(1);

        if i + 1 < banks.len() {
            tokio::time::sleep(options.app_delay).await;
        }
    }

    pb.finish_and_clear();
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Source that fails a fixed number of times per app before answering.
    struct FlakySource {
        failures: Mutex<HashMap<String, u32>>,
        reviews: usize,
    }

    impl FlakySource {
        fn new(failures: &[(&str, u32)], reviews: usize) -> Self {
            Self {
                failures: Mutex::new(
                    failures.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
                ),
                reviews,
            }
        }
    }

    #[async_trait]
    impl ReviewSource for FlakySource {
        async fn fetch_reviews(
            &self,
            app_id: &str,
            _count: u32,
            _lang: &str,
            _country: &str,
        ) -> Result<Vec<SourceReview>> {
            {
                let mut failures = self.failures.lock().unwrap();
                if let Some(left) = failures.get_mut(app_id) {
                    if *left > 0 {
                        *left -= 1;
                        bail!("connection reset");
                    }
                }
            }
            Ok((0..self.reviews)
                .map(|i| SourceReview {
                    review_id: format!("{app_id}-{i}"),
                    text: Some(format!("review {i}")),
                    score: Some(4),
                    at: None,
                    user_name: None,
                    thumbs_up: None,
                })
                .collect())
        }

        async fn fetch_app_summary(
            &self,
            app_id: &str,
            _lang: &str,
            _country: &str,
        ) -> Result<Option<AppSummary>> {
            if app_id == "app.nosummary" {
                bail!("details page blocked");
            }
            Ok(Some(AppSummary {
                title: Some(format!("{app_id} title")),
                score: Some(4.1),
                ratings: None,
                reviews: Some(10),
                installs: None,
            }))
        }
    }

    fn bank(code: &str, app_id: &str) -> BankApp {
        BankApp {
            code: code.to_string(),
            name: format!("{code} Bank"),
            app_id: app_id.to_string(),
        }
    }

    fn options(max_attempts: u32) -> ScrapeOptions {
        ScrapeOptions {
            count: 10,
            lang: "en".into(),
            country: "et".into(),
            max_attempts,
            retry_delay: Duration::from_secs(5),
            app_delay: Duration::from_secs(2),
        }
    }

    #[test]
    fn raw_rows_fill_defaults() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let rows = to_raw_rows(
            vec![SourceReview {
                review_id: "r1".into(),
                text: Some("ok".into()),
                score: Some(3),
                at: None,
                user_name: Some("Sara".into()),
                thumbs_up: None,
            }],
            &bank("CBE", "app.cbe"),
            now,
        );
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.thumbs_up, Some(0));
        assert_eq!(row.review_date.as_deref(), Some("2023-11-14 22:13:20"));
        assert_eq!(row.bank_code.as_deref(), Some("CBE"));
        assert_eq!(row.bank_name.as_deref(), Some("CBE Bank"));
        assert_eq!(row.source.as_deref(), Some(SOURCE_TAG));
    }

    #[test]
    fn app_info_uses_placeholder_for_missing_fields() {
        let row = AppInfoRow::new(
            &bank("BOA", "app.boa"),
            &AppSummary {
                title: Some("BoA Mobile".into()),
                score: None,
                ratings: Some(20),
                reviews: None,
                installs: None,
            },
        );
        assert_eq!(row.title, "BoA Mobile");
        assert_eq!(row.score, "N/A");
        assert_eq!(row.ratings, "20");
        assert_eq!(row.installs, "N/A");
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failure_recovers_within_attempts() {
        let source = FlakySource::new(&[("app.cbe", 2)], 3);
        let report = scrape_all(&source, &[bank("CBE", "app.cbe")], &options(3)).await;

        assert_eq!(report.reviews.len(), 3);
        match report.apps[0].outcome {
            FetchOutcome::Fetched { count, attempts } => {
                assert_eq!(count, 3);
                assert_eq!(attempts, 3);
            }
            ref other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_app_does_not_stop_others() {
        let source = FlakySource::new(&[("app.boa", 10)], 2);
        let banks = [bank("BOA", "app.boa"), bank("DASHEN", "app.dashen")];
        let report = scrape_all(&source, &banks, &options(3)).await;

        assert_eq!(report.apps.len(), 2);
        assert_eq!(report.exhausted().count(), 1);
        let exhausted = report.exhausted().next().unwrap();
        assert_eq!(exhausted.bank.code, "BOA");
        match &exhausted.outcome {
            FetchOutcome::Exhausted { attempts, last_error } => {
                assert_eq!(*attempts, 3);
                assert!(last_error.contains("connection reset"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(report.reviews.len(), 2);
        assert!(report
            .reviews
            .iter()
            .all(|r| r.bank_code.as_deref() == Some("DASHEN")));
    }

    #[tokio::test(start_paused = true)]
    async fn summary_failure_is_not_fatal() {
        let source = FlakySource::new(&[], 1);
        let banks = [bank("CBE", "app.nosummary"), bank("BOA", "app.boa")];
        let report = scrape_all(&source, &banks, &options(1)).await;

        assert!(report.apps[0].summary.is_none());
        assert_eq!(report.reviews.len(), 2);
        let rows = report.app_info_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].bank_code, "BOA");
        assert_eq!(rows[0].title, "app.boa title");
    }
}
