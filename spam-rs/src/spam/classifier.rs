//! Phrase-based Bayesian classifier
//!
//! Learning increments the counters of every phrase extracted from a message
//! together with the message totals. Scoring turns each significant phrase
//! into a clamped spam probability and combines the most extreme of them with
//! the product-odds rule.

use std::io::Write;
use std::sync::Arc;
use tracing::{debug, info};

use super::exporter::PagedExporter;
use super::extractor::PhraseExtractor;
use super::progress::{Progress, ProgressEvent};
use super::report::{self, Extremes};
use super::retry::RetryPolicy;
use super::types::*;
use crate::config::{Config, ExportConfig, SignificantLimit};
use crate::error::{Result, SpamError};
use crate::storage::StatStore;

/// Phrases seen fewer times than this carry no evidence
pub const SIGNIFICANCE_THRESHOLD: u64 = 5;

/// Per-phrase probabilities never reach certainty
pub const MIN_PROBABILITY: f64 = 0.01;
pub const MAX_PROBABILITY: f64 = 0.99;

/// Score of a message without any significant phrase
pub const NEUTRAL_PROBABILITY: f64 = 0.5;

/// Clamped spam probability of one phrase
///
/// `None` when the phrase is insignificant or the totals cannot serve as
/// denominators.
pub fn phrase_probability(counts: PhraseCounts, totals: Totals) -> Option<f64> {
    if counts.occurrences() < SIGNIFICANCE_THRESHOLD || !totals.is_sufficient() {
        return None;
    }

    let bp = (counts.spam as f64 / totals.spam as f64).min(1.0);
    let gp = (counts.good as f64 / totals.good as f64).min(1.0);
    let p = bp / (bp + gp);

    Some(p.clamp(MIN_PROBABILITY, MAX_PROBABILITY))
}

/// Combine phrase probabilities, keeping only the `limit` most extreme
pub fn combine(mut probabilities: Vec<f64>, limit: SignificantLimit) -> f64 {
    // Most informative first; equal distance prefers the spammier value so
    // the outcome does not depend on input order
    probabilities.sort_by(|a, b| {
        (b - NEUTRAL_PROBABILITY)
            .abs()
            .total_cmp(&(a - NEUTRAL_PROBABILITY).abs())
            .then_with(|| b.total_cmp(a))
    });
    if let SignificantLimit::Top(n) = limit {
        probabilities.truncate(n);
    }

    if probabilities.is_empty() {
        return NEUTRAL_PROBABILITY;
    }

    let spam: f64 = probabilities.iter().product();
    let good: f64 = probabilities.iter().map(|p| 1.0 - p).product();

    if spam + good > 0.0 {
        spam / (spam + good)
    } else {
        // Both products underflowed; same ratio through log-odds
        let log_odds: f64 = probabilities.iter().map(|p| (p / (1.0 - p)).ln()).sum();
        1.0 / (1.0 + (-log_odds).exp())
    }
}

/// Result of a full dump
#[derive(Debug, Clone, PartialEq)]
pub struct DumpSummary {
    pub stats: SpamStats,
    pub pages: u64,
    pub extremes: Extremes,
}

/// Spam classifier over a [`StatStore`]
pub struct Classifier<S> {
    store: Arc<S>,
    extractor: PhraseExtractor,
    retry: RetryPolicy,
    max_significant: SignificantLimit,
    export: ExportConfig,
    progress: Progress,
}

impl<S: StatStore + 'static> Classifier<S> {
    /// Create a classifier with default settings
    pub fn new(store: Arc<S>) -> Self {
        let config = Config::default();
        Self {
            store,
            extractor: PhraseExtractor::default(),
            retry: RetryPolicy::default(),
            max_significant: config.classifier.max_significant,
            export: config.export,
            progress: Progress::none(),
        }
    }

    /// Create a classifier from loaded configuration
    pub fn from_config(store: Arc<S>, config: &Config) -> Result<Self> {
        Ok(Self {
            store,
            extractor: PhraseExtractor::from_config(&config.extractor)?,
            retry: RetryPolicy::from_config(&config.retry),
            max_significant: config.classifier.max_significant,
            export: config.export.clone(),
            progress: Progress::none(),
        })
    }

    pub fn with_extractor(mut self, extractor: PhraseExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_significant(mut self, limit: SignificantLimit) -> Self {
        self.max_significant = limit;
        self
    }

    pub fn with_export_config(mut self, export: ExportConfig) -> Self {
        self.export = export;
        self
    }

    /// Register the hook notified on storage retries and per-phrase progress
    pub fn on_progress<F>(&mut self, handler: F)
    where
        F: Fn(&ProgressEvent) + Send + Sync + 'static,
    {
        self.progress = Progress::new(handler);
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn extractor(&self) -> &PhraseExtractor {
        &self.extractor
    }

    /// Learn a message as spam (`true`) or good (`false`)
    ///
    /// Learning the same message twice doubles its weight.
    pub async fn learn(&self, message: &str, is_spam: bool) -> Result<()> {
        let phrases = self.extractor.extract(message);

        self.retry
            .run(&self.progress, || self.store.learn(&phrases, is_spam))
            .await?;

        info!(
            "Learned {} message with {} phrases",
            if is_spam { "spam" } else { "good" },
            phrases.len()
        );
        Ok(())
    }

    /// Message is spam
    pub async fn learn_spam(&self, message: &str) -> Result<()> {
        self.learn(message, true).await
    }

    /// Message is not spam
    pub async fn learn_good(&self, message: &str) -> Result<()> {
        self.learn(message, false).await
    }

    /// Probability (0.0 - 1.0) that the message is spam
    pub async fn score(&self, message: &str) -> Result<f64> {
        let totals = self.totals().await?;
        if !totals.is_sufficient() {
            return Err(SpamError::InsufficientData {
                spam: totals.spam,
                good: totals.good,
            });
        }

        let scored = self.scored_phrases(message, totals).await?;
        let evidence = scored.len();
        let probability = combine(
            scored.into_iter().map(|s| s.probability).collect(),
            self.max_significant,
        );

        debug!(
            "Scored message: {} significant phrases, probability {:.4}",
            evidence, probability
        );
        Ok(probability)
    }

    /// Stored counters for every phrase of the message that the store knows
    pub async fn phrase_details(&self, message: &str) -> Result<Vec<PhraseDetail>> {
        let totals = self.totals().await?;
        let phrases = self.extractor.extract(message);
        let total = phrases.len();
        let mut details = Vec::new();

        for (index, phrase) in phrases.into_iter().enumerate() {
            let counts = self.lookup(&phrase).await?;
            self.progress.notify(ProgressEvent::Phrase { index: index + 1, total });

            if let Some(counts) = counts {
                details.push(PhraseDetail {
                    score: phrase_probability(counts, totals),
                    spam: counts.spam,
                    good: counts.good,
                    phrase,
                });
            }
        }

        Ok(details)
    }

    /// Phrase count and message totals
    pub async fn stats(&self) -> Result<SpamStats> {
        let totals = self.totals().await?;
        let phrases = self
            .retry
            .run(&self.progress, || self.store.count_phrases())
            .await?;

        Ok(SpamStats::new(phrases, totals))
    }

    /// Exporter over this classifier's store and settings
    pub fn exporter(&self) -> PagedExporter<S> {
        PagedExporter::new(Arc::clone(&self.store), self.retry.clone(), self.export.clone())
            .with_progress(self.progress.clone())
    }

    /// Write every phrase and the summary statistics to `sink`
    pub async fn dump<W>(&self, sink: &mut W) -> Result<DumpSummary>
    where
        W: Write + Send + ?Sized,
    {
        let totals = self.totals().await?;
        let mut extremes = Extremes::default();

        report::write_header(sink)?;

        let export = self
            .exporter()
            .for_each_page(|page| {
                for record in &page {
                    report::write_row(sink, record)?;
                    extremes.observe(record, totals);
                }
                Ok(())
            })
            .await?;

        let stats = SpamStats::new(export.rows, totals);
        report::write_summary(sink, &stats, &extremes)?;
        sink.flush()?;

        Ok(DumpSummary {
            stats,
            pages: export.pages,
            extremes,
        })
    }

    async fn totals(&self) -> Result<Totals> {
        self.retry.run(&self.progress, || self.store.get_totals()).await
    }

    async fn lookup(&self, phrase: &str) -> Result<Option<PhraseCounts>> {
        self.retry
            .run(&self.progress, || self.store.get_phrase(phrase))
            .await
    }

    async fn scored_phrases(&self, message: &str, totals: Totals) -> Result<Vec<ScoredPhrase>> {
        let phrases = self.extractor.extract(message);
        let total = phrases.len();
        let mut scored = Vec::new();

        for (index, phrase) in phrases.into_iter().enumerate() {
            let counts = self.lookup(&phrase).await?;
            self.progress.notify(ProgressEvent::Phrase { index: index + 1, total });

            if let Some(probability) = counts.and_then(|c| phrase_probability(c, totals)) {
                scored.push(ScoredPhrase { phrase, probability });
            }
        }

        Ok(scored)
    }
}
