// Text-level cleaning helpers.

/// Ethiopic Unicode block (U+1200–U+137F).
const ETHIOPIC: std::ops::RangeInclusive<char> = '\u{1200}'..='\u{137F}';

/// Remove every Ethiopic character, leaving everything else untouched.
pub fn strip_ethiopic(text: &str) -> String {
    text.chars().filter(|c| !ETHIOPIC.contains(c)).collect()
}

pub fn contains_ethiopic(text: &str) -> bool {
    text.chars().any(|c| ETHIOPIC.contains(&c))
}

/// Collapse runs of Unicode whitespace to a single space and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
