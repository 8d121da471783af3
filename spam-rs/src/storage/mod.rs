//! Phrase statistics storage
//!
//! Provides the [`StatStore`] abstraction and its backends:
//! - [`sqlite`]: SQLite-backed store with transactional learning
//! - [`memory`]: In-process store for tests and throw-away sessions
//! - [`schema`]: Table creation and migration of the legacy single-table layout

pub mod memory;
pub mod schema;
pub mod sqlite;

pub use memory::MemoryStatStore;
pub use sqlite::SqliteStatStore;

use crate::error::Result;
use crate::spam::types::{PhraseCounts, PhraseRecord, Totals};

/// Persistent phrase counters plus the global message totals
///
/// Any operation may fail with [`crate::SpamError::Busy`] when the backend is
/// contended; callers retry through [`crate::spam::RetryPolicy`].
#[async_trait::async_trait]
pub trait StatStore: Send + Sync {
    /// Look up the counters of one phrase
    async fn get_phrase(&self, phrase: &str) -> Result<Option<PhraseCounts>>;

    /// Add one observation to a phrase, creating it if absent
    async fn increment_phrase(&self, phrase: &str, is_spam: bool) -> Result<()>;

    /// Read the message totals
    async fn get_totals(&self) -> Result<Totals>;

    /// Add one message to the totals
    async fn increment_totals(&self, is_spam: bool) -> Result<()>;

    /// Number of distinct phrases
    async fn count_phrases(&self) -> Result<u64>;

    /// Up to `limit` records ordered by phrase, skipping the first `offset`
    async fn page(&self, offset: u64, limit: u64) -> Result<Vec<PhraseRecord>>;

    /// Increment every phrase once and the totals once, all or nothing
    async fn learn(&self, phrases: &[String], is_spam: bool) -> Result<()>;
}
