// Word tokenization shared by keyword extraction and topic modeling.
//
// Text is lowercased and split into runs of word characters; runs shorter
// than two characters are dropped, then stop words are removed.

use std::collections::HashSet;

use stop_words::{get, LANGUAGE};

pub struct Tokenizer {
    stop_words: HashSet<String>,
}

impl Tokenizer {
    /// Tokenizer with the English stop-word list from the stop-words crate.
    pub fn english() -> Self {
        let stop_words: Vec<String> = get(LANGUAGE::English);
        Self::with_stop_words(stop_words)
    }

    pub fn with_stop_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            stop_words: words.into_iter().map(|w| w.into().to_lowercase()).collect(),
        }
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word)
    }

    /// Lowercased, stop-word filtered tokens of at least two word characters.
    pub fn tokens(&self, text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|t| t.chars().count() >= 2)
            .filter(|t| !self.is_stop_word(t))
            .map(str::to_string)
            .collect()
    }

    /// Unigrams through n-grams of length `max_n`, built over the filtered
    /// token stream. Unigrams come first, then bigrams, and so on.
    pub fn ngrams(&self, text: &str, max_n: usize) -> Vec<String> {
        let tokens = self.tokens(text);
        let mut terms = tokens.clone();
        for n in 2..=max_n.max(1) {
            terms.extend(tokens.windows(n).map(|w| w.join(" ")));
        }
        terms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenizer() -> Tokenizer {
        Tokenizer::with_stop_words(["the", "is", "a", "to"])
    }

    #[test]
    fn lowercases_and_drops_short_tokens() {
        assert_eq!(
            tokenizer().tokens("The App is SLOW, a 2 x-ray"),
            vec!["app", "slow", "ray"]
        );
    }

    #[test]
    fn bigrams_skip_over_removed_stop_words() {
        assert_eq!(
            tokenizer().ngrams("unable to login", 2),
            vec!["unable", "login", "unable login"]
        );
    }

    #[test]
    fn english_list_filters_common_words() {
        let t = Tokenizer::english();
        assert!(t.is_stop_word("the"));
        assert!(t.tokens("the and of").is_empty());
    }
}
