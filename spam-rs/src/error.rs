use thiserror::Error;

/// SQLite primary result codes that signal contention rather than failure.
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

#[derive(Error, Debug)]
pub enum SpamError {
    #[error("Storage busy: {0}")]
    Busy(String),

    #[error("Storage unavailable after {attempts} attempts: {reason}")]
    StorageUnavailable { attempts: u32, reason: String },

    #[error("Cannot compute probability: sample too small ({spam} spam, {good} good messages learned)")]
    InsufficientData { spam: u64, good: u64 },

    #[error("Totals record missing; store was not initialized")]
    MissingTotals,

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Export failed: {0}")]
    Export(String),
}

impl SpamError {
    /// Whether the error is transient contention worth retrying
    pub fn is_busy(&self) -> bool {
        matches!(self, SpamError::Busy(_))
    }
}

impl From<sqlx::Error> for SpamError {
    fn from(err: sqlx::Error) -> Self {
        if is_contention(&err) {
            SpamError::Busy(err.to_string())
        } else {
            SpamError::Database(err)
        }
    }
}

fn is_contention(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut => true,
        sqlx::Error::Database(db_err) => db_err
            .code()
            .and_then(|code| code.parse::<i32>().ok())
            // Extended codes carry the primary code in the low byte
            .map(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
            .unwrap_or(false),
        _ => false,
    }
}

pub type Result<T> = std::result::Result<T, SpamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_timeout_is_busy() {
        let err: SpamError = sqlx::Error::PoolTimedOut.into();
        assert!(err.is_busy());
    }

    #[test]
    fn test_row_not_found_is_not_busy() {
        let err: SpamError = sqlx::Error::RowNotFound.into();
        assert!(!err.is_busy());
        assert!(matches!(err, SpamError::Database(_)));
    }

    #[test]
    fn test_insufficient_data_message() {
        let err = SpamError::InsufficientData { spam: 0, good: 3 };
        assert!(err.to_string().contains("sample too small"));
    }
}
