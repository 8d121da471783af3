//! spam-rs: Phrase-based Bayesian spam filter
//!
//! Learns from messages marked as spam or good, keeping per-phrase counters in
//! SQLite, and scores new messages by combining the most telling phrases.
//!
//! # Features
//!
//! - **Phrase extraction**: word n-grams, trailing-punctuation variants and
//!   punctuation-glued tokens
//! - **Incremental learning**: one transaction per learned message
//! - **Scoring**: clamped per-phrase probabilities combined with the
//!   product-odds rule over the most extreme phrases
//! - **Export**: paged streaming of the whole vocabulary with adaptive polling
//! - **Contention handling**: bounded retries when the database is busy
//!
//! # Example
//!
//! ```no_run
//! use spam_rs::spam::Classifier;
//! use spam_rs::storage::SqliteStatStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(SqliteStatStore::connect("sqlite://spamstats.db").await?);
//!     let classifier = Classifier::new(store);
//!
//!     classifier.learn_spam("Buy cheap pills now!!").await?;
//!     classifier.learn_good("Lunch meeting moved to noon").await?;
//!
//!     let probability = classifier.score("cheap pills").await?;
//!     println!("spam probability: {:.2}", probability);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration management
//! - [`error`]: Error types and handling
//! - [`spam`]: Extraction, classification, retries and export
//! - [`storage`]: Phrase statistics backends

pub mod config;
pub mod error;
pub mod spam;
pub mod storage;

// Re-export commonly used types
pub use config::Config;
pub use error::{Result, SpamError};
