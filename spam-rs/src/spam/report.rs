//! Dump report formatting and the spammiest/cleanest aggregation

use std::io::Write;

use super::classifier::phrase_probability;
use super::types::{PhraseGroup, PhraseRecord, SpamStats, Totals};
use crate::error::Result;

/// Width of the phrase column; longer phrases are cut
const PHRASE_WIDTH: usize = 40;
const COUNT_WIDTH: usize = 18;

/// Most extreme significant phrases seen so far
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extremes {
    pub spammiest: Option<PhraseGroup>,
    pub cleanest: Option<PhraseGroup>,
}

impl Extremes {
    /// Fold one record in; insignificant phrases are ignored
    pub fn observe(&mut self, record: &PhraseRecord, totals: Totals) {
        let Some(probability) = phrase_probability(record.counts(), totals) else {
            return;
        };
        let occurrences = record.occurrences();

        offer(&mut self.cleanest, probability, occurrences, &record.phrase, |g| {
            probability < g.probability
                || (probability == g.probability && occurrences < g.occurrences)
        });
        offer(&mut self.spammiest, probability, occurrences, &record.phrase, |g| {
            probability > g.probability
                || (probability == g.probability && occurrences > g.occurrences)
        });
    }
}

fn offer<F>(slot: &mut Option<PhraseGroup>, probability: f64, occurrences: u64, phrase: &str, better: F)
where
    F: Fn(&PhraseGroup) -> bool,
{
    if let Some(group) = slot.as_mut() {
        if group.probability == probability && group.occurrences == occurrences {
            group.phrases.push(phrase.to_string());
            return;
        }
        if !better(group) {
            return;
        }
    }

    *slot = Some(PhraseGroup {
        probability,
        occurrences,
        phrases: vec![phrase.to_string()],
    });
}

/// Column headings and rule
pub fn write_header<W: Write + ?Sized>(sink: &mut W) -> Result<()> {
    writeln!(
        sink,
        "{:<PHRASE_WIDTH$} {:>COUNT_WIDTH$} {:>COUNT_WIDTH$}",
        "Phrase", "# Spam", "# OK"
    )?;
    writeln!(
        sink,
        "{:<PHRASE_WIDTH$} {:>COUNT_WIDTH$} {:>COUNT_WIDTH$}",
        "------", "------", "----"
    )?;
    Ok(())
}

pub fn write_row<W: Write + ?Sized>(sink: &mut W, record: &PhraseRecord) -> Result<()> {
    writeln!(
        sink,
        "{:<PHRASE_WIDTH$} {:>COUNT_WIDTH$} {:>COUNT_WIDTH$}",
        truncate_chars(&record.phrase, PHRASE_WIDTH),
        record.spam,
        record.good
    )?;
    Ok(())
}

/// Totals, phrase count and the extreme groups
pub fn write_summary<W: Write + ?Sized>(sink: &mut W, stats: &SpamStats, extremes: &Extremes) -> Result<()> {
    writeln!(sink)?;
    writeln!(
        sink,
        "{:<PHRASE_WIDTH$} {:>COUNT_WIDTH$} {:>COUNT_WIDTH$}",
        "Total messages:", stats.spam, stats.good
    )?;
    writeln!(sink, "Phrases: {}", stats.phrases)?;

    if let Some(group) = &extremes.spammiest {
        write_group(sink, "Spammiest", group)?;
    }
    if let Some(group) = &extremes.cleanest {
        write_group(sink, "Cleanest", group)?;
    }

    Ok(())
}

fn write_group<W: Write + ?Sized>(sink: &mut W, label: &str, group: &PhraseGroup) -> Result<()> {
    writeln!(
        sink,
        "{}: {:.4} ({} occurrences): {}",
        label,
        group.probability,
        group.occurrences,
        group.phrases.join(", ")
    )?;
    Ok(())
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spam::types::PhraseCounts;

    fn record(phrase: &str, spam: u64, good: u64) -> PhraseRecord {
        PhraseRecord::new(phrase, PhraseCounts::new(spam, good))
    }

    #[test]
    fn test_extremes_skip_insignificant() {
        let mut extremes = Extremes::default();
        extremes.observe(&record("rare", 4, 0), Totals::new(10, 10));
        assert_eq!(extremes, Extremes::default());
    }

    #[test]
    fn test_extremes_skip_without_totals() {
        let mut extremes = Extremes::default();
        extremes.observe(&record("viagra", 9, 0), Totals::new(9, 0));
        assert_eq!(extremes, Extremes::default());
    }

    #[test]
    fn test_extremes_pick_lowest_and_highest() {
        let totals = Totals::new(10, 10);
        let mut extremes = Extremes::default();
        for r in [record("hello", 1, 8), record("viagra", 9, 0), record("maybe", 3, 3)] {
            extremes.observe(&r, totals);
        }

        let spammiest = extremes.spammiest.unwrap();
        assert_eq!(spammiest.phrases, vec!["viagra"]);
        assert_eq!(spammiest.probability, 0.99);

        let cleanest = extremes.cleanest.unwrap();
        assert_eq!(cleanest.phrases, vec!["hello"]);
    }

    #[test]
    fn test_cleanest_tie_prefers_fewer_occurrences() {
        let totals = Totals::new(10, 10);
        let mut extremes = Extremes::default();
        extremes.observe(&record("meeting agenda", 0, 9), totals);
        extremes.observe(&record("agenda", 0, 6), totals);

        let cleanest = extremes.cleanest.unwrap();
        assert_eq!(cleanest.probability, 0.01);
        assert_eq!(cleanest.occurrences, 6);
        assert_eq!(cleanest.phrases, vec!["agenda"]);
    }

    #[test]
    fn test_exact_ties_accumulate() {
        let totals = Totals::new(10, 10);
        let mut extremes = Extremes::default();
        extremes.observe(&record("cheap", 7, 0), totals);
        extremes.observe(&record("pills", 7, 0), totals);
        extremes.observe(&record("meds", 6, 0), totals);

        let spammiest = extremes.spammiest.unwrap();
        assert_eq!(spammiest.occurrences, 7);
        assert_eq!(spammiest.phrases, vec!["cheap", "pills"]);
    }

    #[test]
    fn test_row_layout() {
        let mut out = Vec::new();
        write_row(&mut out, &record(&"x".repeat(50), 3, 12)).unwrap();
        let line = String::from_utf8(out).unwrap();

        assert_eq!(line.len(), 40 + 1 + 18 + 1 + 18 + 1);
        assert!(line.starts_with(&"x".repeat(40)));
        assert!(line.trim_end().ends_with("12"));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let phrase = "é".repeat(45);
        assert_eq!(truncate_chars(&phrase, 40).chars().count(), 40);
        assert_eq!(truncate_chars("short", 40), "short");
    }

    #[test]
    fn test_summary_lists_groups() {
        let extremes = Extremes {
            spammiest: Some(PhraseGroup {
                probability: 0.99,
                occurrences: 8,
                phrases: vec!["viagra".to_string()],
            }),
            cleanest: None,
        };
        let stats = SpamStats::new(3, Totals::new(5, 4));

        let mut out = Vec::new();
        write_summary(&mut out, &stats, &extremes).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("Total messages:"));
        assert!(text.contains("Phrases: 3"));
        assert!(text.contains("Spammiest: 0.9900 (8 occurrences): viagra"));
        assert!(!text.contains("Cleanest"));
    }
}
