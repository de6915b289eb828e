// Review source trait and the records it returns.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// One review as the store returns it.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceReview {
    pub review_id: String,
    pub text: Option<String>,
    /// Star rating, 1–5
    pub score: Option<u8>,
    pub at: Option<DateTime<Utc>>,
    pub user_name: Option<String>,
    pub thumbs_up: Option<u32>,
}

/// Store listing summary for an app.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppSummary {
    pub title: Option<String>,
    pub score: Option<f64>,
    pub ratings: Option<u64>,
    pub reviews: Option<u64>,
    pub installs: Option<String>,
}

/// Anything that can supply reviews for an app listing.
#[async_trait]
pub trait ReviewSource: Send + Sync {
    /// Fetch up to `count` reviews, newest first.
    async fn fetch_reviews(
        &self,
        app_id: &str,
        count: u32,
        lang: &str,
        country: &str,
    ) -> Result<Vec<SourceReview>>;

    /// Fetch the listing summary, or None when the listing has none.
    async fn fetch_app_summary(
        &self,
        app_id: &str,
        lang: &str,
        country: &str,
    ) -> Result<Option<AppSummary>>;
}
