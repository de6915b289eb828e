use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::normalize::NormalizeOptions;
use crate::source::scrape::ScrapeOptions;
use crate::themes::ThemeOptions;

/// Static reference table: bank code, display name, env var for the app id,
/// default Play Store app id.
const BANKS: [(&str, &str, &str, &str); 3] = [
    (
        "CBE",
        "Commercial Bank of Ethiopia",
        "CBE_APP_ID",
        "com.combanketh.mobilebanking",
    ),
    (
        "BOA",
        "Bank of Abyssinia",
        "BOA_APP_ID",
        "com.boa.boaMobileBanking",
    ),
    (
        "Dashen",
        "Dashen Bank",
        "DASHEN_APP_ID",
        "com.dashen.dashensuperapp",
    ),
];

/// One bank and the store listing its reviews are collected from.
#[derive(Debug, Clone, PartialEq)]
pub struct BankApp {
    pub code: String,
    pub name: String,
    pub app_id: String,
}

/// Where each stage reads and writes its artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub raw_reviews: PathBuf,
    pub app_info: PathBuf,
    pub processed_reviews: PathBuf,
    pub sentiment_results: PathBuf,
    pub keyword_profiles: PathBuf,
    pub topic_profiles: PathBuf,
}

impl ArtifactPaths {
    /// Lay out the standard artifact tree under `data_dir`.
    pub fn under(data_dir: &Path) -> Self {
        Self {
            raw_reviews: data_dir.join("raw").join("reviews_raw.csv"),
            app_info: data_dir.join("raw").join("app_info.csv"),
            processed_reviews: data_dir.join("processed").join("reviews_processed.csv"),
            sentiment_results: data_dir.join("sentiment").join("sentiment_results.csv"),
            keyword_profiles: data_dir.join("themes").join("themes_by_bank.csv"),
            topic_profiles: data_dir.join("themes").join("lda_topics_by_bank.csv"),
        }
    }

    /// All artifacts in pipeline order, labelled for status output.
    pub fn labelled(&self) -> [(&'static str, &Path); 6] {
        [
            ("Raw reviews", self.raw_reviews.as_path()),
            ("App info", self.app_info.as_path()),
            ("Cleaned reviews", self.processed_reviews.as_path()),
            ("Scored reviews", self.sentiment_results.as_path()),
            ("Keyword profiles", self.keyword_profiles.as_path()),
            ("Topic profiles", self.topic_profiles.as_path()),
        ]
    }
}

/// Central configuration loaded from environment variables.
///
/// The .env file is loaded at startup via dotenvy. Components never read the
/// environment themselves; they take the option structs built here.
#[derive(Debug, Clone)]
pub struct Config {
    pub banks: Vec<BankApp>,
    pub reviews_per_bank: u32,
    /// Total fetch attempts per app (not additional retries).
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub app_delay: Duration,
    pub lang: String,
    pub country: String,
    pub play_store_url: String,
    pub data_dir: PathBuf,
    pub paths: ArtifactPaths,
    pub db_path: String,
    /// PostgreSQL connection URL (when set and starts with postgres://, uses Postgres backend)
    pub database_url: Option<String>,
    pub lexicon_path: PathBuf,
    /// Escalate partial results (exhausted apps, unparsed dates, failed banks) to errors.
    pub strict: bool,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. Every key has a default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let banks = BANKS
            .iter()
            .map(|(code, name, var, default_id)| BankApp {
                code: code.to_string(),
                name: name.to_string(),
                app_id: lookup(var).unwrap_or_else(|| default_id.to_string()),
            })
            .collect();

        let data_dir = PathBuf::from(lookup("DATA_DIR").unwrap_or_else(|| "data".to_string()));
        let lexicon_path = lookup("VADER_LEXICON_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(crate::sentiment::download::default_lexicon_path);

        Ok(Self {
            banks,
            reviews_per_bank: parse_var(&lookup, "REVIEWS_PER_BANK", 500)?,
            max_retries: parse_var(&lookup, "MAX_RETRIES", 3)?,
            retry_delay: Duration::from_secs(parse_var(&lookup, "RETRY_DELAY_SECS", 3)?),
            app_delay: Duration::from_secs(parse_var(&lookup, "APP_DELAY_SECS", 2)?),
            lang: lookup("REVIEW_LANG").unwrap_or_else(|| "en".to_string()),
            country: lookup("REVIEW_COUNTRY").unwrap_or_else(|| "et".to_string()),
            play_store_url: lookup("PLAY_STORE_URL")
                .unwrap_or_else(|| crate::source::client::DEFAULT_PLAY_STORE_URL.to_string()),
            paths: ArtifactPaths::under(&data_dir),
            data_dir,
            db_path: lookup("BANK_REVIEWS_DB_PATH")
                .unwrap_or_else(|| "./bank_reviews.db".to_string()),
            database_url: lookup("DATABASE_URL"),
            lexicon_path,
            strict: parse_var(&lookup, "STRICT_PIPELINE", false)?,
        })
    }

    pub fn scrape_options(&self) -> ScrapeOptions {
        ScrapeOptions {
            count: self.reviews_per_bank,
            lang: self.lang.clone(),
            country: self.country.clone(),
            max_attempts: self.max_retries,
            retry_delay: self.retry_delay,
            app_delay: self.app_delay,
        }
    }

    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions::default()
    }

    pub fn theme_options(&self) -> ThemeOptions {
        ThemeOptions::default()
    }
}

/// Parse an optional variable, falling back to `default` when it is unset.
fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_reference_table() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.banks.len(), 3);
        assert_eq!(config.banks[0].app_id, "com.combanketh.mobilebanking");
        assert_eq!(config.banks[1].name, "Bank of Abyssinia");
        assert_eq!(config.reviews_per_bank, 500);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_delay, Duration::from_secs(3));
        assert_eq!(config.app_delay, Duration::from_secs(2));
        assert_eq!(config.lang, "en");
        assert_eq!(config.country, "et");
        assert!(!config.strict);
        assert_eq!(
            config.paths.raw_reviews,
            PathBuf::from("data/raw/reviews_raw.csv")
        );
    }

    #[test]
    fn env_overrides_apply() {
        let config = Config::from_lookup(lookup_from(&[
            ("DASHEN_APP_ID", "com.example.dashen"),
            ("REVIEWS_PER_BANK", "40"),
            ("MAX_RETRIES", "5"),
            ("DATA_DIR", "/tmp/out"),
            ("STRICT_PIPELINE", "true"),
        ]))
        .unwrap();
        assert_eq!(config.banks[2].app_id, "com.example.dashen");
        assert_eq!(config.reviews_per_bank, 40);
        assert_eq!(config.max_retries, 5);
        assert!(config.strict);
        assert_eq!(
            config.paths.topic_profiles,
            PathBuf::from("/tmp/out/themes/lda_topics_by_bank.csv")
        );
    }

    #[test]
    fn malformed_number_is_an_error() {
        let err = Config::from_lookup(lookup_from(&[("REVIEWS_PER_BANK", "lots")])).unwrap_err();
        assert!(err.to_string().contains("REVIEWS_PER_BANK"));
    }
}
