//! Spam classification module
//!
//! Provides phrase extraction, Bayesian learning and scoring over a
//! [`crate::storage::StatStore`], retries on storage contention, and paged
//! export of the learned vocabulary.

pub mod classifier;
pub mod exporter;
pub mod extractor;
pub mod progress;
pub mod report;
pub mod retry;
pub mod types;

pub use classifier::{combine, phrase_probability, Classifier, DumpSummary};
pub use exporter::{ExportSummary, PagedExporter, PollBackoff};
pub use extractor::{PhraseExtractor, MAX_PHRASE_BYTES};
pub use progress::{Progress, ProgressEvent};
pub use report::Extremes;
pub use retry::RetryPolicy;
pub use types::*;
