// Rule-based theme tagging over a bank's keyword string.
//
// Every rule is checked on its own; a bank can land in several themes. Matches
// are plain substring tests on the lowercased keywords, reported in rule order.

/// Fallback theme when no rule matches.
pub const GENERAL_FEEDBACK: &str = "General Feedback";

pub struct ThemeRule {
    pub name: &'static str,
    pub cues: &'static [&'static str],
}

pub const THEME_RULES: [ThemeRule; 5] = [
    ThemeRule {
        name: "Account Access Issues",
        cues: &["login", "password", "account", "access", "verification"],
    },
    ThemeRule {
        name: "Performance & Reliability",
        cues: &["slow", "loading", "crash", "error", "fail", "not working"],
    },
    ThemeRule {
        name: "User Interface & Experience",
        cues: &["ui", "interface", "design", "easy", "navigation"],
    },
    ThemeRule {
        name: "Customer Support",
        cues: &["support", "service", "help", "call"],
    },
    ThemeRule {
        name: "Transactions & Payments",
        cues: &["transfer", "transaction", "payment", "balance"],
    },
];

/// Themes matched by a keyword string, in rule order. Never empty.
pub fn match_themes(keywords: &str) -> Vec<&'static str> {
    let words = keywords.to_lowercase();
    let mut themes: Vec<&'static str> = THEME_RULES
        .iter()
        .filter(|rule| rule.cues.iter().any(|cue| words.contains(cue)))
        .map(|rule| rule.name)
        .collect();
    if themes.is_empty() {
        themes.push(GENERAL_FEEDBACK);
    }
    themes
}
