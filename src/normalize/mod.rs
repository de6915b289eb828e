// Normalizer: turns raw collected reviews into clean, analysis-ready rows.
//
// Steps run in a fixed order: dedup, Ethiopic stripping, missing-data policy,
// date normalization, whitespace cleanup with empty-row removal, text length,
// then projection and ordering. Each step is a public function so it can be
// exercised on its own; `normalize` chains them and fills in NormalizeStats.

pub mod dates;
pub mod text;

use std::cmp::Ordering;
use std::collections::HashSet;

use tracing::{info, instrument, warn};

use crate::models::{CleanReview, RawReview};

/// Filler for reviews without an author name.
pub const ANONYMOUS: &str = "Anonymous";

/// Star ratings the store accepts. Anything else counts as missing.
pub const RATING_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

fn valid_rating(rating: Option<u8>) -> Option<u8> {
    rating.filter(|r| RATING_RANGE.contains(r))
}

/// Which optional steps to run. Missing-data policy and empty-row removal
/// always run; without them the cleaned-row invariants would not hold.
#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    pub deduplicate: bool,
    pub strip_ethiopic: bool,
    pub normalize_dates: bool,
    pub collapse_whitespace: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            deduplicate: true,
            strip_ethiopic: true,
            normalize_dates: true,
            collapse_whitespace: true,
        }
    }
}

/// Counters for each cleaning step. Part of the normalizer's contract, not
/// just diagnostics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizeStats {
    pub original_count: usize,
    pub duplicates_removed: usize,
    /// Rows whose text contained at least one Ethiopic character.
    pub ethiopic_rows_affected: usize,
    /// Missing values per column, counted before critical rows are dropped.
    /// An out-of-range rating counts as missing.
    pub missing_by_column: Vec<(&'static str, usize)>,
    /// Ratings present but outside 1..=5.
    pub ratings_out_of_range: usize,
    pub rows_removed_missing: usize,
    pub count_after_missing: usize,
    pub dates_unparsed: usize,
    pub empty_reviews_removed: usize,
    pub final_count: usize,
}

#[derive(Debug, Clone)]
pub struct NormalizeOutput {
    pub reviews: Vec<CleanReview>,
    pub stats: NormalizeStats,
}

/// Run the full cleaning sequence. Deterministic for identical input.
#[instrument(skip_all, fields(rows = raw.len()))]
pub fn normalize(raw: Vec<RawReview>, options: &NormalizeOptions) -> NormalizeOutput {
    let mut stats = NormalizeStats {
        original_count: raw.len(),
        ..Default::default()
    };
    let mut rows = raw;

    if options.deduplicate {
        stats.duplicates_removed = deduplicate(&mut rows);
    }
    if options.strip_ethiopic {
        stats.ethiopic_rows_affected = strip_ethiopic(&mut rows);
    }

    stats.missing_by_column = missing_report(&rows);
    stats.ratings_out_of_range = rows
        .iter()
        .filter(|r| r.rating.is_some() && valid_rating(r.rating).is_none())
        .count();
    if stats.ratings_out_of_range > 0 {
        warn!(
            count = stats.ratings_out_of_range,
            "Dropping reviews with ratings outside 1-5"
        );
    }
    let before_missing = rows.len();
    let mut reviews = apply_missing_policy(rows);
    stats.rows_removed_missing = before_missing - reviews.len();
    stats.count_after_missing = reviews.len();

    if options.normalize_dates {
        stats.dates_unparsed = normalize_dates(&mut reviews);
        if stats.dates_unparsed > 0 {
            warn!(
                unparsed = stats.dates_unparsed,
                "Some review dates could not be parsed; keeping original values"
            );
        }
    }

    stats.empty_reviews_removed = clean_text(&mut reviews, options.collapse_whitespace);
    add_text_length(&mut reviews);
    project_and_sort(&mut reviews);
    stats.final_count = reviews.len();

    info!(
        original = stats.original_count,
        duplicates = stats.duplicates_removed,
        missing = stats.rows_removed_missing,
        empty = stats.empty_reviews_removed,
        final_count = stats.final_count,
        "Normalization complete"
    );

    NormalizeOutput { reviews, stats }
}

/// Drop rows repeating an earlier (review_id, review_text) pair, keeping the
/// first occurrence. Missing values compare equal to each other.
pub fn deduplicate(rows: &mut Vec<RawReview>) -> usize {
    let before = rows.len();
    let mut seen: HashSet<(Option<String>, Option<String>)> = HashSet::with_capacity(before);
    rows.retain(|r| seen.insert((r.review_id.clone(), r.review_text.clone())));
    before - rows.len()
}

/// Remove Ethiopic characters from review text in place. Rows are kept even
/// when nothing is left; empty text is dropped later. Returns rows changed.
pub fn strip_ethiopic(rows: &mut [RawReview]) -> usize {
    let mut affected = 0;
    for row in rows.iter_mut() {
        if let Some(t) = row.review_text.as_mut() {
            if text::contains_ethiopic(t) {
                *t = text::strip_ethiopic(t);
                affected += 1;
            }
        }
    }
    affected
}

/// Count missing values per column.
pub fn missing_report(rows: &[RawReview]) -> Vec<(&'static str, usize)> {
    let count = |f: fn(&RawReview) -> bool| rows.iter().filter(|r| f(r)).count();
    vec![
        ("review_id", count(|r| r.review_id.is_none())),
        ("review_text", count(|r| r.review_text.is_none())),
        ("rating", count(|r| valid_rating(r.rating).is_none())),
        ("review_date", count(|r| r.review_date.is_none())),
        ("user_name", count(|r| r.user_name.is_none())),
        ("thumbs_up", count(|r| r.thumbs_up.is_none())),
        ("bank_code", count(|r| r.bank_code.is_none())),
        ("bank_name", count(|r| r.bank_name.is_none())),
        ("source", count(|r| r.source.is_none())),
    ]
}

/// Drop rows missing text, a 1-5 rating or bank name; default the author to
/// "Anonymous" and the helpful count to 0.
pub fn apply_missing_policy(rows: Vec<RawReview>) -> Vec<CleanReview> {
    rows.into_iter()
        .filter_map(|r| {
            let (Some(review_text), Some(rating), Some(bank_name)) =
                (r.review_text, valid_rating(r.rating), r.bank_name)
            else {
                return None;
            };
            Some(CleanReview {
                review_id: r.review_id,
                review_text,
                rating,
                review_date: r.review_date,
                bank_code: r.bank_code,
                bank_name,
                user_name: r.user_name.unwrap_or_else(|| ANONYMOUS.to_string()),
                thumbs_up: r.thumbs_up.unwrap_or(0),
                text_length: 0,
                source: r.source,
            })
        })
        .collect()
}

/// Rewrite dates as YYYY-MM-DD. Values that do not parse are left as they
/// were; returns how many that was.
pub fn normalize_dates(reviews: &mut [CleanReview]) -> usize {
    let mut unparsed = 0;
    for review in reviews.iter_mut() {
        if let Some(raw) = review.review_date.as_mut() {
            match dates::canonical_date(raw) {
                Some(canonical) => *raw = canonical,
                None => unparsed += 1,
            }
        }
    }
    unparsed
}

/// Collapse whitespace (when enabled), trim, and drop rows left empty.
/// Returns the number of rows removed.
pub fn clean_text(reviews: &mut Vec<CleanReview>, collapse: bool) -> usize {
    for review in reviews.iter_mut() {
        review.review_text = if collapse {
            text::collapse_whitespace(&review.review_text)
        } else {
            review.review_text.trim().to_string()
        };
    }
    let before = reviews.len();
    reviews.retain(|r| !r.review_text.is_empty());
    before - reviews.len()
}

/// Character count of the cleaned text.
pub fn add_text_length(reviews: &mut [CleanReview]) {
    for review in reviews.iter_mut() {
        review.text_length = review.review_text.chars().count();
    }
}

/// Order by bank code ascending, then review date descending. Missing keys
/// sort last. The sort is stable, so ties keep input order.
pub fn project_and_sort(reviews: &mut [CleanReview]) {
    reviews.sort_by(|a, b| {
        missing_last(&a.bank_code, &b.bank_code, false)
            .then_with(|| missing_last(&a.review_date, &b.review_date, true))
    });
}

fn missing_last(a: &Option<String>, b: &Option<String>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) if descending => y.cmp(x),
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(id: &str, text: &str, rating: u8) -> RawReview {
        RawReview {
            review_id: Some(id.to_string()),
            review_text: Some(text.to_string()),
            rating: Some(rating),
            review_date: Some("2024-05-01 10:00:00".to_string()),
            user_name: Some("abebe".to_string()),
            thumbs_up: Some(1),
            bank_code: Some("CBE".to_string()),
            bank_name: Some("Commercial Bank of Ethiopia".to_string()),
            source: Some("Google Play".to_string()),
        }
    }

    #[test]
    fn dedup_keeps_first_of_same_id_and_text() {
        let mut rows = vec![raw("a", "great app", 5), raw("a", "great app", 1)];
        assert_eq!(deduplicate(&mut rows), 1);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].rating, Some(5));
    }

    #[test]
    fn dedup_keeps_same_id_with_different_text() {
        let mut rows = vec![raw("a", "great app", 5), raw("a", "great app!", 5)];
        assert_eq!(deduplicate(&mut rows), 0);
    }

    #[test]
    fn dedup_treats_missing_values_as_equal() {
        let mut a = raw("x", "t", 3);
        a.review_id = None;
        let b = a.clone();
        let mut rows = vec![a, b];
        assert_eq!(deduplicate(&mut rows), 1);
    }

    #[test]
    fn missing_policy_drops_critical_and_fills_optional() {
        let mut no_rating = raw("1", "ok", 3);
        no_rating.rating = None;
        let mut no_bank = raw("2", "ok", 3);
        no_bank.bank_name = None;
        let mut no_user = raw("3", "ok", 3);
        no_user.user_name = None;
        no_user.thumbs_up = None;

        let cleaned = apply_missing_policy(vec![no_rating, no_bank, no_user]);
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].user_name, ANONYMOUS);
        assert_eq!(cleaned[0].thumbs_up, 0);
    }

    #[test]
    fn out_of_range_ratings_are_treated_as_missing() {
        let rows = vec![raw("1", "great", 5), raw("2", "zero", 0), raw("3", "six", 6), raw("4", "ok", 1)];
        let out = normalize(rows, &NormalizeOptions::default());
        assert_eq!(out.stats.ratings_out_of_range, 2);
        assert_eq!(out.stats.rows_removed_missing, 2);
        assert_eq!(out.stats.final_count, 2);
        let rating_missing = out
            .stats
            .missing_by_column
            .iter()
            .find(|(col, _)| *col == "rating")
            .map(|(_, n)| *n);
        assert_eq!(rating_missing, Some(2));
        assert!(out.reviews.iter().all(|r| RATING_RANGE.contains(&r.rating)));
    }

    #[test]
    fn unparsed_dates_are_kept_and_counted() {
        let mut reviews = apply_missing_policy(vec![raw("1", "a", 1), raw("2", "b", 2)]);
        reviews[1].review_date = Some("last tuesday".to_string());
        assert_eq!(normalize_dates(&mut reviews), 1);
        assert_eq!(reviews[0].review_date.as_deref(), Some("2024-05-01"));
        assert_eq!(reviews[1].review_date.as_deref(), Some("last tuesday"));
    }

    #[test]
    fn sort_is_bank_ascending_then_date_descending() {
        let mut rows = vec![raw("1", "a", 1), raw("2", "b", 1), raw("3", "c", 1)];
        rows[0].bank_code = Some("Dashen".into());
        rows[1].review_date = Some("2024-01-01".into());
        rows[2].review_date = Some("2024-06-01".into());
        let mut reviews = apply_missing_policy(rows);
        project_and_sort(&mut reviews);
        let ids: Vec<_> = reviews.iter().map(|r| r.review_id.clone().unwrap()).collect();
        assert_eq!(ids, vec!["3", "2", "1"]);
    }

    #[test]
    fn disabled_steps_are_skipped() {
        let options = NormalizeOptions {
            deduplicate: false,
            strip_ethiopic: false,
            ..Default::default()
        };
        let out = normalize(vec![raw("a", "ጥሩ", 5), raw("a", "ጥሩ", 5)], &options);
        assert_eq!(out.stats.duplicates_removed, 0);
        assert_eq!(out.stats.final_count, 2);
    }
}
