// VADER-style rule-based sentiment scorer.
//
// Valences come from a lexicon file (token<TAB>mean<TAB>...). The rules on
// top of the lexicon: booster and dampener words, ALL-CAPS emphasis, negation
// within three tokens, "least", the "but" contrast shift, and exclamation and
// question-mark amplification. The summed valence is squashed into [-1, 1].

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use super::traits::SentimentScorer;

/// Boost applied by an intensifier ("very", "extremely").
const B_INCR: f64 = 0.293;
/// Damping applied by a hedge ("slightly", "kind of").
const B_DECR: f64 = -0.293;
/// Extra emphasis for an ALL-CAPS sentiment word in mixed-case text.
const C_INCR: f64 = 0.733;
/// Valence multiplier under negation.
const N_SCALAR: f64 = -0.74;
/// Normalization constant for the compound score.
const ALPHA: f64 = 15.0;

const NEGATIONS: &[&str] = &[
    "aint", "arent", "cannot", "cant", "couldnt", "darent", "didnt", "doesnt", "ain't", "aren't",
    "can't", "couldn't", "daren't", "didn't", "doesn't", "dont", "hadnt", "hasnt", "havent",
    "isnt", "mightnt", "mustnt", "neither", "don't", "hadn't", "hasn't", "haven't", "isn't",
    "mightn't", "mustn't", "neednt", "needn't", "never", "none", "nope", "nor", "not", "nothing",
    "nowhere", "oughtnt", "shant", "shouldnt", "uhuh", "wasnt", "werent", "oughtn't", "shan't",
    "shouldn't", "uh-uh", "wasn't", "weren't", "without", "wont", "wouldnt", "won't", "wouldn't",
    "rarely", "seldom", "despite",
];

/// Scalar for a booster or dampener word, if the word is one.
fn booster(word: &str) -> Option<f64> {
    match word {
        "absolutely" | "amazingly" | "awfully" | "completely" | "considerable"
        | "considerably" | "decidedly" | "deeply" | "effing" | "enormous" | "enormously"
        | "entirely" | "especially" | "exceptional" | "exceptionally" | "extreme"
        | "extremely" | "fabulously" | "flipping" | "flippin" | "frackin" | "fracking"
        | "fricking" | "frickin" | "frigging" | "friggin" | "fully" | "fuckin" | "fucking"
        | "fuggin" | "fugging" | "greatly" | "hella" | "highly" | "hugely" | "incredible"
        | "incredibly" | "intensely" | "major" | "majorly" | "more" | "most" | "particularly"
        | "purely" | "quite" | "really" | "remarkably" | "so" | "substantially"
        | "thoroughly" | "total" | "totally" | "tremendous" | "tremendously" | "uber"
        | "unbelievably" | "unusually" | "utter" | "utterly" | "very" => Some(B_INCR),
        "almost" | "barely" | "hardly" | "kinda" | "kindof" | "kind-of" | "less" | "little"
        | "marginal" | "marginally" | "occasional" | "occasionally" | "partly" | "scarce"
        | "scarcely" | "slight" | "slightly" | "somewhat" | "sorta" | "sortof" | "sort-of" => {
            Some(B_DECR)
        }
        _ => None,
    }
}

/// Multi-word hedges, matched on the words just before a sentiment token.
fn booster_ngram(phrase: &str) -> Option<f64> {
    match phrase {
        "kind of" | "sort of" => Some(B_DECR),
        _ => None,
    }
}

fn is_negation(word: &str) -> bool {
    NEGATIONS.contains(&word) || word.contains("n't")
}

/// ALL-CAPS test: at least one cased character and no lowercase ones.
fn is_upper(word: &str) -> bool {
    word.chars().any(char::is_uppercase) && !word.chars().any(char::is_lowercase)
}

/// Squash an unbounded valence sum into [-1, 1].
pub fn normalize(score: f64) -> f64 {
    let norm = score / (score * score + ALPHA).sqrt();
    norm.clamp(-1.0, 1.0)
}

/// Lexicon-driven compound polarity scorer.
pub struct VaderScorer {
    lexicon: HashMap<String, f64>,
}

impl VaderScorer {
    /// Load the lexicon from a file.
    ///
    /// Fails when the file is missing, unreadable or holds no entries, so a
    /// scoring run never starts without valences.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!(
                "Sentiment lexicon not found: {}\nRun `bank-reviews download-lexicon` to download it.",
                path.display()
            );
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read sentiment lexicon {}", path.display()))?;
        let scorer = Self::from_lexicon_str(&text)
            .with_context(|| format!("Invalid sentiment lexicon {}", path.display()))?;
        debug!(entries = scorer.len(), "Loaded sentiment lexicon from {}", path.display());
        Ok(scorer)
    }

    /// Parse lexicon text: one `token<TAB>mean[<TAB>...]` entry per line.
    pub fn from_lexicon_str(text: &str) -> Result<Self> {
        let mut lexicon = HashMap::new();
        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut fields = line.split('\t');
            let (Some(token), Some(mean)) = (fields.next(), fields.next()) else {
                anyhow::bail!("Line {}: expected token and mean valence", line_no + 1);
            };
            let valence: f64 = mean
                .trim()
                .parse()
                .with_context(|| format!("Line {}: bad valence {mean:?}", line_no + 1))?;
            // Lookups are lowercased, so mixed-case keys such as ":D" never match
            lexicon.insert(token.to_string(), valence);
        }
        if lexicon.is_empty() {
            anyhow::bail!("Sentiment lexicon contains no entries");
        }
        Ok(Self { lexicon })
    }

    pub fn len(&self) -> usize {
        self.lexicon.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lexicon.is_empty()
    }

    fn valence_of(&self, word: &str) -> Option<f64> {
        self.lexicon.get(word).copied()
    }

    fn in_lexicon(&self, word: &str) -> bool {
        self.lexicon.contains_key(word)
    }

    /// Valence of the token at `i` after all local rules.
    fn token_valence(&self, words: &[String], lower: &[String], i: usize, cap_diff: bool) -> f64 {
        let item = &lower[i];
        let Some(base) = self.valence_of(item) else {
            return 0.0;
        };
        let mut valence = base;

        // "no" directly before another sentiment word acts as negation, not as its own valence
        if item == "no" && i + 1 < lower.len() && self.in_lexicon(&lower[i + 1]) {
            valence = 0.0;
        }
        if (i > 0 && lower[i - 1] == "no")
            || (i > 1 && lower[i - 2] == "no")
            || (i > 2 && lower[i - 3] == "no" && (lower[i - 1] == "or" || lower[i - 1] == "nor"))
        {
            valence = base * N_SCALAR;
        }

        if is_upper(&words[i]) && cap_diff {
            if valence > 0.0 {
                valence += C_INCR;
            } else {
                valence -= C_INCR;
            }
        }

        for start in 0..3 {
            if i <= start || self.in_lexicon(&lower[i - (start + 1)]) {
                continue;
            }
            let mut scalar = self.scalar_inc_dec(&words[i - (start + 1)], valence, cap_diff);
            if start == 1 {
                scalar *= 0.95;
            } else if start == 2 {
                scalar *= 0.9;
            }
            valence += scalar;
            valence = negation_check(valence, lower, start, i);
            if start == 2 {
                valence = ngram_booster_check(valence, lower, i);
            }
        }

        least_check(valence, lower, i, |w| self.in_lexicon(w))
    }

    fn scalar_inc_dec(&self, word: &str, valence: f64, cap_diff: bool) -> f64 {
        let Some(mut scalar) = booster(&word.to_lowercase()) else {
            return 0.0;
        };
        if valence < 0.0 {
            scalar = -scalar;
        }
        if is_upper(word) && cap_diff {
            if valence > 0.0 {
                scalar += C_INCR;
            } else {
                scalar -= C_INCR;
            }
        }
        scalar
    }
}

fn negation_check(valence: f64, lower: &[String], start: usize, i: usize) -> f64 {
    let before = |n: usize| lower[i - n].as_str();
    match start {
        0 if is_negation(before(1)) => valence * N_SCALAR,
        1 if before(2) == "never" && matches!(before(1), "so" | "this") => valence * 1.25,
        1 if before(2) == "without" && before(1) == "doubt" => valence,
        1 if is_negation(before(2)) => valence * N_SCALAR,
        2 if (before(3) == "never" && matches!(before(2), "so" | "this"))
            || matches!(before(1), "so" | "this") =>
        {
            valence * 1.25
        }
        2 if before(3) == "without" && (before(2) == "doubt" || before(1) == "doubt") => valence,
        2 if is_negation(before(3)) => valence * N_SCALAR,
        _ => valence,
    }
}

/// Add the hedge value of "kind of"/"sort of" ending right before token `i`.
/// The shift is applied as is, whatever the sign of the valence.
fn ngram_booster_check(mut valence: f64, lower: &[String], i: usize) -> f64 {
    let (w3, w2, w1) = (&lower[i - 3], &lower[i - 2], &lower[i - 1]);
    for phrase in [format!("{w3} {w2} {w1}"), format!("{w3} {w2}"), format!("{w2} {w1}")] {
        if let Some(shift) = booster_ngram(&phrase) {
            valence += shift;
        }
    }
    valence
}

fn least_check<F>(valence: f64, lower: &[String], i: usize, in_lexicon: F) -> f64
where
    F: Fn(&str) -> bool,
{
    if i > 1 && !in_lexicon(&lower[i - 1]) && lower[i - 1] == "least" {
        if lower[i - 2] != "at" && lower[i - 2] != "very" {
            return valence * N_SCALAR;
        }
    } else if i > 0 && !in_lexicon(&lower[i - 1]) && lower[i - 1] == "least" {
        return valence * N_SCALAR;
    }
    valence
}

/// Tokens before "but" are damped, tokens after it are amplified.
fn but_check(lower: &[String], sentiments: &mut [f64]) {
    if let Some(bi) = lower.iter().position(|w| w == "but") {
        for (idx, s) in sentiments.iter_mut().enumerate() {
            if idx < bi {
                *s *= 0.5;
            } else if idx > bi {
                *s *= 1.5;
            }
        }
    }
}

fn punctuation_emphasis(text: &str) -> f64 {
    let exclamations = text.matches('!').count().min(4);
    let questions = text.matches('?').count();
    let qm = match questions {
        0 | 1 => 0.0,
        2..=3 => questions as f64 * 0.18,
        _ => 0.96,
    };
    exclamations as f64 * 0.292 + qm
}

/// Split on whitespace and strip surrounding punctuation from word tokens,
/// leaving short tokens (emoticons like ":)") intact.
fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|token| {
            let stripped = token.trim_matches(|c: char| c.is_ascii_punctuation());
            if stripped.chars().count() <= 2 {
                token.to_string()
            } else {
                stripped.to_string()
            }
        })
        .collect()
}

impl SentimentScorer for VaderScorer {
    fn polarity(&self, text: &str) -> f64 {
        let words = tokenize(text);
        if words.is_empty() {
            return 0.0;
        }
        let lower: Vec<String> = words.iter().map(|w| w.to_lowercase()).collect();

        let caps = words.iter().filter(|w| is_upper(w)).count();
        let cap_diff = caps > 0 && caps < words.len();

        let mut sentiments = Vec::with_capacity(words.len());
        for i in 0..words.len() {
            let item = lower[i].as_str();
            let skip = booster(item).is_some()
                || (item == "kind" && lower.get(i + 1).is_some_and(|next| next == "of"));
            if skip {
                sentiments.push(0.0);
                continue;
            }
            sentiments.push(self.token_valence(&words, &lower, i, cap_diff));
        }
        but_check(&lower, &mut sentiments);

        let mut sum: f64 = sentiments.iter().sum();
        let emphasis = punctuation_emphasis(text);
        if sum > 0.0 {
            sum += emphasis;
        } else if sum < 0.0 {
            sum -= emphasis;
        }
        let compound = normalize(sum);
        (compound * 10_000.0).round() / 10_000.0
    }
}
