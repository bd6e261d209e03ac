//! Profanity screening seam.

/// Pure predicate/filter over message text.
///
/// The lexicon and matching strategy belong to the embedding application.
/// The engine screens each draft exactly once, at send time; edits are not
/// re-screened.
pub trait ProfanityFilter: Send + Sync {
    /// Whether the text contains a flagged word.
    fn is_profane(&self, text: &str) -> bool;

    /// The text with flagged words masked.
    fn redact(&self, text: &str) -> String;
}

/// Minimal built-in filter matching whole words against a lowercase list.
///
/// The empty default flags nothing.
#[derive(Debug, Default, Clone)]
pub struct WordListFilter {
    words: Vec<String>,
}

impl WordListFilter {
    /// Build a filter from a list of flagged words.
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            words: words.into_iter().map(|w| w.into().to_lowercase()).collect(),
        }
    }

    fn is_flagged(&self, word: &str) -> bool {
        let stripped = word
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        self.words.iter().any(|flagged| *flagged == stripped)
    }
}

impl ProfanityFilter for WordListFilter {
    fn is_profane(&self, text: &str) -> bool {
        text.split_whitespace().any(|word| self.is_flagged(word))
    }

    fn redact(&self, text: &str) -> String {
        text.split_whitespace()
            .map(|word| {
                if self.is_flagged(word) {
                    "***".to_string()
                } else {
                    word.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}
