// Parsing for Google Play's web responses.
//
// Reviews come back from the batchexecute RPC as a JSON envelope behind an
// anti-XSSI prefix; the payload inside is itself a JSON-encoded string. The
// app summary lives in an AF_initDataCallback block on the details page.
// Both formats are positional arrays, so fields are read by index path.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use chrono::DateTime;
use regex_lite::Regex;
use serde_json::Value;
use tracing::debug;

use super::traits::{AppSummary, SourceReview};

/// RPC id for the review listing.
pub const REVIEWS_RPC: &str = "UsvDTd";
/// Sort order code for newest-first.
pub const SORT_NEWEST: u8 = 2;

static DATA_CALLBACK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"AF_initDataCallback\(\{key:\s*'(ds:\d+)'[\s\S]*?data:([\s\S]*?), sideChannel: \{\}\}\);")
        .expect("valid regex")
});

/// One page of reviews plus the token for the next page, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewPage {
    pub reviews: Vec<SourceReview>,
    pub next_token: Option<String>,
}

/// Build the `f.req` form value for a review page request. The trailing
/// `[null, score]` slot is the star filter; null requests every rating.
pub fn reviews_request(app_id: &str, count: usize, token: Option<&str>) -> String {
    let page = match token {
        Some(t) => Value::from(t),
        None => Value::Null,
    };
    let inner = serde_json::json!([
        null,
        null,
        [2, SORT_NEWEST, [count, null, page], null, [null, null]],
        [app_id, 7]
    ]);
    serde_json::json!([[[REVIEWS_RPC, inner.to_string(), null, "generic"]]]).to_string()
}

/// Walk a positional JSON path.
fn at<'a>(value: &'a Value, path: &[usize]) -> Option<&'a Value> {
    path.iter().try_fold(value, |v, &i| v.get(i))
}

/// Parse a batchexecute review response body.
pub fn parse_reviews_page(body: &str) -> Result<ReviewPage> {
    let start = body
        .find('[')
        .context("Review response has no JSON envelope")?;
    let envelope: Value =
        serde_json::from_str(body[start..].trim_end()).context("Malformed review envelope")?;

    let payload = at(&envelope, &[0, 2])
        .and_then(Value::as_str)
        .context("Review response carried no payload")?;
    let inner: Value = serde_json::from_str(payload).context("Malformed review payload")?;

    let reviews: Vec<SourceReview> = inner
        .get(0)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(parse_review).collect())
        .unwrap_or_default();

    let next_token = inner.as_array().and_then(|outer| {
        let len = outer.len();
        if len < 2 {
            return None;
        }
        outer[len - 2]
            .as_array()
            .and_then(|a| a.last())
            .and_then(Value::as_str)
            .map(str::to_string)
    });

    debug!(reviews = reviews.len(), has_next = next_token.is_some(), "Parsed review page");
    Ok(ReviewPage {
        reviews,
        next_token,
    })
}

fn parse_review(item: &Value) -> Option<SourceReview> {
    let Some(review_id) = at(item, &[0]).and_then(Value::as_str) else {
        debug!("Skipping review entry without an id");
        return None;
    };
    Some(SourceReview {
        review_id: review_id.to_string(),
        user_name: at(item, &[1, 0]).and_then(Value::as_str).map(str::to_string),
        score: at(item, &[2])
            .and_then(Value::as_u64)
            .and_then(|s| u8::try_from(s).ok()),
        text: at(item, &[4]).and_then(Value::as_str).map(str::to_string),
        at: at(item, &[5, 0])
            .and_then(Value::as_i64)
            .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        thumbs_up: at(item, &[6])
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok()),
    })
}

/// Parse the app summary out of a details page. None when the page has no
/// summary block.
pub fn parse_app_summary(html: &str) -> Result<Option<AppSummary>> {
    let Some(caps) = DATA_CALLBACK
        .captures_iter(html)
        .find(|c| c.get(1).map(|m| m.as_str()) == Some("ds:5"))
    else {
        return Ok(None);
    };
    let data = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
    let value: Value = serde_json::from_str(data).context("Malformed app summary block")?;

    Ok(Some(AppSummary {
        title: at(&value, &[1, 2, 0, 0])
            .and_then(Value::as_str)
            .map(str::to_string),
        score: at(&value, &[1, 2, 51, 0, 1]).and_then(Value::as_f64),
        ratings: at(&value, &[1, 2, 51, 2, 1]).and_then(Value::as_u64),
        reviews: at(&value, &[1, 2, 51, 3, 1]).and_then(Value::as_u64),
        installs: at(&value, &[1, 2, 13, 0])
            .and_then(Value::as_str)
            .map(str::to_string),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(inner: &Value) -> String {
        let outer = json!([["wrb.fr", REVIEWS_RPC, inner.to_string(), null, null, null, "generic"]]);
        format!(")]}}'\n\n{outer}")
    }

    fn review_item(id: &str, text: &str, score: u8) -> Value {
        json!([
            id,
            ["Abebe K", [null, 2, null, [null, null, "https://img"]]],
            score,
            null,
            text,
            [1_714_557_600, 0],
            12
        ])
    }

    #[test]
    fn request_embeds_app_and_token() {
        let req = reviews_request("com.boa.boaMobileBanking", 200, Some("tok"));
        let outer: Value = serde_json::from_str(&req).unwrap();
        assert_eq!(outer[0][0][0], REVIEWS_RPC);
        let inner: Value = serde_json::from_str(outer[0][0][1].as_str().unwrap()).unwrap();
        assert_eq!(inner[2][1], 2);
        assert_eq!(inner[2][2][0], 200);
        assert_eq!(inner[2][2][2], "tok");
        assert_eq!(inner[2][4], json!([null, null]));
        assert_eq!(inner[3][0], "com.boa.boaMobileBanking");
    }

    #[test]
    fn first_page_has_no_token() {
        let req = reviews_request("com.dashen.dashensuperapp", 100, None);
        let outer: Value = serde_json::from_str(&req).unwrap();
        let inner: Value = serde_json::from_str(outer[0][0][1].as_str().unwrap()).unwrap();
        assert_eq!(inner[2][2], json!([100, null, null]));
        assert_eq!(inner[3][1], 7);
    }

    #[test]
    fn parses_reviews_and_token() {
        let inner = json!([
            [review_item("gp:1", "Works well", 5), review_item("gp:2", "Keeps crashing", 1)],
            null,
            [null, "next-token"]
        ]);
        let page = parse_reviews_page(&envelope(&inner)).unwrap();
        assert_eq!(page.reviews.len(), 2);
        let first = &page.reviews[0];
        assert_eq!(first.review_id, "gp:1");
        assert_eq!(first.user_name.as_deref(), Some("Abebe K"));
        assert_eq!(first.score, Some(5));
        assert_eq!(first.text.as_deref(), Some("Works well"));
        assert_eq!(first.thumbs_up, Some(12));
        assert_eq!(
            first.at.unwrap().format("%Y-%m-%d").to_string(),
            "2024-05-01"
        );
        assert_eq!(page.next_token.as_deref(), Some("next-token"));
    }

    #[test]
    fn empty_listing_is_not_an_error() {
        let page = parse_reviews_page(&envelope(&json!([[], null]))).unwrap();
        assert!(page.reviews.is_empty());
        assert_eq!(page.next_token, None);
    }

    #[test]
    fn missing_payload_is_an_error() {
        let body = ")]}'\n\n[[\"wrb.fr\",\"UsvDTd\",null,null,null,[5],\"generic\"]]";
        assert!(parse_reviews_page(body).is_err());
        assert!(parse_reviews_page("<html>blocked</html>").is_err());
    }

    #[test]
    fn parses_app_summary_block() {
        let mut listing = vec![Value::Null; 52];
        listing[0] = json!(["Dashen Super App"]);
        listing[13] = json!(["1,000,000+"]);
        listing[51] = json!([[null, 4.2], null, [null, 15234], [null, 3021]]);
        let data = json!([null, [null, null, listing]]);
        let html = format!(
            "<script>AF_initDataCallback({{key: 'ds:4', hash: '1', data:[1], sideChannel: {{}}}});</script>\
             <script>AF_initDataCallback({{key: 'ds:5', hash: '2', data:{data}, sideChannel: {{}}}});</script>"
        );
        let summary = parse_app_summary(&html).unwrap().unwrap();
        assert_eq!(summary.title.as_deref(), Some("Dashen Super App"));
        assert_eq!(summary.score, Some(4.2));
        assert_eq!(summary.ratings, Some(15234));
        assert_eq!(summary.reviews, Some(3021));
        assert_eq!(summary.installs.as_deref(), Some("1,000,000+"));
    }

    #[test]
    fn page_without_summary_block_is_none() {
        assert_eq!(parse_app_summary("<html></html>").unwrap(), None);
    }
}
