//! Spam types and data structures

use serde::{Deserialize, Serialize};

/// Per-phrase observation counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhraseCounts {
    /// Spam messages the phrase appeared in
    pub spam: u64,
    /// Good messages the phrase appeared in
    pub good: u64,
}

impl PhraseCounts {
    pub fn new(spam: u64, good: u64) -> Self {
        Self { spam, good }
    }

    /// Combined number of observations
    pub fn occurrences(&self) -> u64 {
        self.spam + self.good
    }

    /// Counts after one more observation on the given side
    pub fn incremented(self, is_spam: bool) -> Self {
        if is_spam {
            Self { spam: self.spam + 1, ..self }
        } else {
            Self { good: self.good + 1, ..self }
        }
    }
}

/// A stored phrase and its counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhraseRecord {
    pub phrase: String,
    pub spam: u64,
    pub good: u64,
}

impl PhraseRecord {
    pub fn new(phrase: impl Into<String>, counts: PhraseCounts) -> Self {
        Self {
            phrase: phrase.into(),
            spam: counts.spam,
            good: counts.good,
        }
    }

    pub fn counts(&self) -> PhraseCounts {
        PhraseCounts::new(self.spam, self.good)
    }

    pub fn occurrences(&self) -> u64 {
        self.spam + self.good
    }
}

/// Number of whole messages learned per class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub spam: u64,
    pub good: u64,
}

impl Totals {
    pub fn new(spam: u64, good: u64) -> Self {
        Self { spam, good }
    }

    pub fn messages(&self) -> u64 {
        self.spam + self.good
    }

    /// Both classes need at least one message before probabilities exist
    pub fn is_sufficient(&self) -> bool {
        self.spam >= 1 && self.good >= 1
    }

    pub fn incremented(self, is_spam: bool) -> Self {
        if is_spam {
            Self { spam: self.spam + 1, ..self }
        } else {
            Self { good: self.good + 1, ..self }
        }
    }
}

/// A phrase that passed the significance threshold during scoring
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredPhrase {
    pub phrase: String,
    pub probability: f64,
}

/// Per-phrase breakdown of a message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhraseDetail {
    pub phrase: String,
    pub spam: u64,
    pub good: u64,
    /// Clamped spam probability, absent for insignificant phrases
    pub score: Option<f64>,
}

/// Database statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpamStats {
    /// Number of distinct phrases
    pub phrases: u64,
    /// Number of learned messages
    pub total: u64,
    /// Learned spam messages
    pub spam: u64,
    /// Learned good messages
    pub good: u64,
}

impl SpamStats {
    pub fn new(phrases: u64, totals: Totals) -> Self {
        Self {
            phrases,
            total: totals.messages(),
            spam: totals.spam,
            good: totals.good,
        }
    }

    /// Pretty-printed JSON for machine consumers
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Phrases sharing the most extreme probability seen during a dump
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhraseGroup {
    pub probability: f64,
    pub occurrences: u64,
    pub phrases: Vec<String>,
}
