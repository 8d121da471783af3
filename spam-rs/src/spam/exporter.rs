//! Paged export of the whole phrase corpus
//!
//! A background task reads the store one page at a time and pushes pages into
//! a bounded queue. The caller polls that queue, draining everything queued
//! on each visit, and adapts its polling interval to how fast pages arrive.
//!
//! # Architecture
//! ```text
//! ┌──────────┐  page(offset, n)  ┌───────────────┐  try_recv  ┌──────────┐
//! │ StatStore│ ←──────────────── │ Producer task │ ─[queue]─→ │ Consumer │
//! └──────────┘   (RetryPolicy)   └───────────────┘            └──────────┘
//!                                                   drained → wait × 2/3
//!                                                   empty   → wait × 3/2
//! ```

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::progress::{Progress, ProgressEvent};
use super::retry::RetryPolicy;
use super::types::PhraseRecord;
use crate::config::ExportConfig;
use crate::error::{Result, SpamError};
use crate::storage::StatStore;

/// Pages the producer may run ahead of the consumer
const QUEUE_DEPTH: usize = 4;

/// Outcome of a completed export
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub pages: u64,
    pub rows: u64,
}

/// Polling interval that shrinks while pages keep coming and grows while idle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollBackoff {
    wait: Duration,
    min: Duration,
    max: Duration,
}

impl PollBackoff {
    pub fn new(initial: Duration, min: Duration, max: Duration) -> Self {
        let max = max.max(min);
        Self {
            wait: initial.clamp(min, max),
            min,
            max,
        }
    }

    pub fn from_config(config: &ExportConfig) -> Self {
        Self::new(
            Duration::from_millis(config.initial_poll_ms),
            Duration::from_millis(config.min_poll_ms),
            Duration::from_millis(config.max_poll_ms),
        )
    }

    pub fn current(&self) -> Duration {
        self.wait
    }

    /// Work arrived: poll sooner
    pub fn shrink(&mut self) {
        self.wait = (self.wait * 2 / 3).max(self.min);
    }

    /// Nothing queued: poll later
    pub fn grow(&mut self) {
        self.wait = (self.wait * 3 / 2).min(self.max);
    }
}

/// Streams every [`PhraseRecord`] in phrase order without loading them all
pub struct PagedExporter<S> {
    store: Arc<S>,
    retry: RetryPolicy,
    progress: Progress,
    config: ExportConfig,
}

impl<S: StatStore + 'static> PagedExporter<S> {
    pub fn new(store: Arc<S>, retry: RetryPolicy, config: ExportConfig) -> Self {
        Self {
            store,
            retry,
            progress: Progress::none(),
            config,
        }
    }

    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    pub fn page_size(&self) -> u64 {
        self.config.page_size.max(1)
    }

    /// Hand every page to `on_page`, in increasing offset order
    ///
    /// Returns once the producer has finished and the queue is empty. If
    /// `on_page` fails the error is returned right away; the producer stops
    /// at its next attempt to queue a page.
    pub async fn for_each_page<F>(&self, mut on_page: F) -> Result<ExportSummary>
    where
        F: FnMut(Vec<PhraseRecord>) -> Result<()>,
    {
        let (tx, mut rx) = mpsc::channel(QUEUE_DEPTH);
        let producer = self.spawn_producer(tx);

        let mut backoff = PollBackoff::from_config(&self.config);
        let mut summary = ExportSummary::default();

        loop {
            match rx.try_recv() {
                Ok(first) => {
                    let mut pending = vec![first];
                    while let Ok(page) = rx.try_recv() {
                        pending.push(page);
                    }

                    for page in pending {
                        summary.pages += 1;
                        summary.rows += page.len() as u64;
                        on_page(page)?;
                    }
                    self.progress.notify(ProgressEvent::Rows { rows: summary.rows });

                    backoff.shrink();
                }
                Err(TryRecvError::Empty) => backoff.grow(),
                Err(TryRecvError::Disconnected) => break,
            }

            debug!("Next export poll in {:?}", backoff.current());
            sleep(backoff.current()).await;
        }

        let produced = producer
            .await
            .map_err(|e| SpamError::Export(e.to_string()))??;

        if produced != summary.rows {
            warn!(
                "Export producer fetched {} rows but {} were consumed",
                produced, summary.rows
            );
        }

        info!(
            "Exported {} phrases in {} pages",
            summary.rows, summary.pages
        );

        Ok(summary)
    }

    /// Collect the whole corpus; only sensible for small stores and tests
    pub async fn collect(&self) -> Result<Vec<PhraseRecord>> {
        let mut records = Vec::new();
        self.for_each_page(|page| {
            records.extend(page);
            Ok(())
        })
        .await?;
        Ok(records)
    }

    fn spawn_producer(&self, tx: mpsc::Sender<Vec<PhraseRecord>>) -> JoinHandle<Result<u64>> {
        let store = Arc::clone(&self.store);
        let retry = self.retry.clone();
        let progress = self.progress.clone();
        let page_size = self.page_size();

        tokio::spawn(async move {
            let mut offset = 0_u64;
            let mut rows = 0_u64;

            loop {
                let page = retry.run(&progress, || store.page(offset, page_size)).await?;
                let fetched = page.len() as u64;
                rows += fetched;

                debug!("Fetched {} phrases at offset {}", fetched, offset);

                if fetched > 0 && tx.send(page).await.is_err() {
                    debug!("Export consumer went away at offset {}", offset);
                    break;
                }
                if fetched < page_size {
                    break;
                }
                offset += page_size;
            }

            Ok(rows)
        })
    }
}
