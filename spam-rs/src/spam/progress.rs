//! Progress notifications
//!
//! A [`Progress`] handle is owned by whoever drives an operation and passed
//! down explicitly; there is no process-wide callback.

use std::fmt;
use std::sync::Arc;

/// Something worth telling the user about while work is under way
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Storage was busy; `attempt` of `limit` failed and another follows
    Retry { attempt: u32, limit: u32, reason: String },
    /// Phrase `index` (1-based) of `total` was looked up
    Phrase { index: usize, total: usize },
    /// Rows consumed so far by an export
    Rows { rows: u64 },
}

type Handler = dyn Fn(&ProgressEvent) + Send + Sync;

/// Cloneable, optional progress hook
#[derive(Clone, Default)]
pub struct Progress {
    handler: Option<Arc<Handler>>,
}

impl Progress {
    /// A hook that ignores every event
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&ProgressEvent) + Send + Sync + 'static,
    {
        Self {
            handler: Some(Arc::new(handler)),
        }
    }

    pub fn notify(&self, event: ProgressEvent) {
        if let Some(handler) = &self.handler {
            handler(&event);
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.handler.is_some()
    }
}

impl fmt::Debug for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Progress")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressEvent::Retry { attempt, limit, reason } => {
                write!(f, "storage busy, retry {}/{} ({})", attempt, limit, reason)
            }
            ProgressEvent::Phrase { index, total } => write!(f, "phrase {}/{}", index, total),
            ProgressEvent::Rows { rows } => write!(f, "{} rows", rows),
        }
    }
}
