// Google Play client: unauthenticated HTTP against the store's web endpoints.
//
// Reviews are pulled page by page from the batchexecute RPC and follow the
// continuation token until the requested count is reached. The app summary
// is scraped from the public details page.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use super::parse;
use super::traits::{AppSummary, ReviewSource, SourceReview};

/// Default store endpoint.
pub const DEFAULT_PLAY_STORE_URL: &str = "https://play.google.com";

/// Largest page the RPC serves in one request.
const MAX_PAGE_SIZE: usize = 200;

pub struct PlayStoreClient {
    client: reqwest::Client,
    base_url: String,
}

impl PlayStoreClient {
    /// Create a client pointing at the given store base URL.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("bank-reviews/0.1 (review analytics)")
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn fetch_page(
        &self,
        app_id: &str,
        page_size: usize,
        token: Option<&str>,
        lang: &str,
        country: &str,
    ) -> Result<parse::ReviewPage> {
        let url = format!("{}/_/PlayStoreUi/data/batchexecute", self.base_url);
        let request = parse::reviews_request(app_id, page_size, token);

        let response = self
            .client
            .post(&url)
            .query(&[("hl", lang), ("gl", country)])
            .form(&[("f.req", request.as_str())])
            .send()
            .await
            .with_context(|| format!("Review request failed for {app_id}"))?;

        if !response.status().is_success() {
            let status = response.status();
            anyhow::bail!("Review request for {app_id} returned {status}");
        }

        let body = response
            .text()
            .await
            .context("Failed to read review response")?;
        parse::parse_reviews_page(&body).with_context(|| format!("Unreadable reviews for {app_id}"))
    }
}

#[async_trait]
impl ReviewSource for PlayStoreClient {
    async fn fetch_reviews(
        &self,
        app_id: &str,
        count: u32,
        lang: &str,
        country: &str,
    ) -> Result<Vec<SourceReview>> {
        let wanted = count as usize;
        let mut reviews: Vec<SourceReview> = Vec::with_capacity(wanted);
        let mut token: Option<String> = None;

        while reviews.len() < wanted {
            let page_size = (wanted - reviews.len()).min(MAX_PAGE_SIZE);
            let page = self
                .fetch_page(app_id, page_size, token.as_deref(), lang, country)
                .await?;
            let got = page.reviews.len();
            reviews.extend(page.reviews);
            debug!(app_id, got, total = reviews.len(), "Fetched review page");

            match page.next_token {
                Some(next) if got > 0 => token = Some(next),
                _ => break,
            }
        }

        reviews.truncate(wanted);
        Ok(reviews)
    }

    async fn fetch_app_summary(
        &self,
        app_id: &str,
        lang: &str,
        country: &str,
    ) -> Result<Option<AppSummary>> {
        let url = format!("{}/store/apps/details", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("id", app_id), ("hl", lang), ("gl", country)])
            .send()
            .await
            .with_context(|| format!("Details request failed for {app_id}"))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            anyhow::bail!("Details page for {app_id} returned {status}");
        }

        let html = response
            .text()
            .await
            .context("Failed to read details page")?;
        parse::parse_app_summary(&html)
    }
}
