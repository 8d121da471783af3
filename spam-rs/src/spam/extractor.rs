//! Phrase extraction
//!
//! Turns a message into the set of phrases used as evidence: word n-grams up
//! to a configurable length, their variants with trailing punctuation
//! stripped, and every token separated by non-word characters.

use regex::Regex;
use std::collections::HashSet;

use crate::config::ExtractorConfig;
use crate::error::Result;

/// Longest phrase, in bytes, that is ever stored or looked up
pub const MAX_PHRASE_BYTES: usize = 256;

/// Splits a message into candidate phrases
#[derive(Debug, Clone)]
pub struct PhraseExtractor {
    word_split: Regex,
    trailing: Regex,
    non_word: Regex,
    max_phrase_length: usize,
}

impl PhraseExtractor {
    /// Build an extractor from configured patterns
    pub fn from_config(config: &ExtractorConfig) -> Result<Self> {
        Ok(Self {
            word_split: Regex::new(&config.word_split)?,
            trailing: Regex::new(&config.trailing)?,
            non_word: Regex::new(r"\W")?,
            max_phrase_length: config.max_phrase_length,
        })
    }

    /// Extract the unique phrases of a message, in first-seen order
    pub fn extract(&self, message: &str) -> Vec<String> {
        let message = message.to_lowercase();
        let words: Vec<&str> = self
            .word_split
            .split(&message)
            .filter(|word| !word.is_empty())
            .collect();

        let mut phrases = PhraseSet::default();

        for n in 1..=self.max_phrase_length {
            for window in words.windows(n) {
                self.push_trimmed(window.join(" "), &mut phrases);
            }
        }

        // Tokens glued together by punctuation never show up as words above
        for token in self.non_word.split(&message) {
            phrases.push(token.to_string());
        }

        phrases.into_vec()
    }

    /// Push a phrase, then each variant with one more trailing character removed
    fn push_trimmed(&self, mut phrase: String, phrases: &mut PhraseSet) {
        phrases.push(phrase.clone());

        while phrase.chars().count() > 1 && self.ends_with_trailing(&phrase) {
            phrase.pop();
            phrases.push(phrase.clone());
        }
    }

    /// Whether the last non-empty trailing match reaches the end of the phrase
    fn ends_with_trailing(&self, phrase: &str) -> bool {
        self.trailing
            .find_iter(phrase)
            .filter(|m| !m.as_str().is_empty())
            .last()
            .map_or(false, |m| m.end() == phrase.len())
    }
}

impl Default for PhraseExtractor {
    fn default() -> Self {
        Self::from_config(&ExtractorConfig::default()).expect("default extractor patterns are valid")
    }
}

/// Insertion-ordered, deduplicated phrase collection
#[derive(Default)]
struct PhraseSet {
    seen: HashSet<String>,
    ordered: Vec<String>,
}

impl PhraseSet {
    fn push(&mut self, phrase: String) {
        if phrase.is_empty() || phrase.len() > MAX_PHRASE_BYTES {
            return;
        }
        if self.seen.insert(phrase.clone()) {
            self.ordered.push(phrase);
        }
    }

    fn into_vec(self) -> Vec<String> {
        self.ordered
    }
}
