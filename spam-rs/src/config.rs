use crate::error::{Result, SpamError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub extractor: ExtractorConfig,
    pub classifier: ClassifierConfig,
    pub retry: RetryConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Word boundary pattern used to build n-grams
    pub word_split: String,
    /// Trailing characters stripped one at a time
    pub trailing: String,
    /// Maximum number of adjacent words joined into one phrase
    pub max_phrase_length: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub max_significant: SignificantLimit,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExportConfig {
    pub page_size: u64,
    pub initial_poll_ms: u64,
    pub min_poll_ms: u64,
    pub max_poll_ms: u64,
}

/// How many of the most extreme phrase probabilities take part in scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "RawLimit", into = "RawLimit")]
pub enum SignificantLimit {
    Top(usize),
    Unlimited,
}

#[derive(Deserialize, Serialize)]
#[serde(untagged)]
enum RawLimit {
    Count(usize),
    Word(String),
}

impl TryFrom<RawLimit> for SignificantLimit {
    type Error = String;

    fn try_from(raw: RawLimit) -> std::result::Result<Self, Self::Error> {
        match raw {
            RawLimit::Count(n) => Ok(SignificantLimit::Top(n)),
            RawLimit::Word(word) => word.parse(),
        }
    }
}

impl From<SignificantLimit> for RawLimit {
    fn from(limit: SignificantLimit) -> Self {
        match limit {
            SignificantLimit::Top(n) => RawLimit::Count(n),
            SignificantLimit::Unlimited => RawLimit::Word("unlimited".to_string()),
        }
    }
}

impl FromStr for SignificantLimit {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "unlimited" | "all" => Ok(SignificantLimit::Unlimited),
            other => other
                .parse::<usize>()
                .map(SignificantLimit::Top)
                .map_err(|_| format!("expected a count or \"unlimited\", got {:?}", s)),
        }
    }
}

impl fmt::Display for SignificantLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignificantLimit::Top(n) => write!(f, "{}", n),
            SignificantLimit::Unlimited => write!(f, "unlimited"),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://spamstats.db".to_string(),
        }
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            word_split: r"[.:;,]*\s+".to_string(),
            trailing: r"[!?]$".to_string(),
            max_phrase_length: 3,
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            max_significant: SignificantLimit::Top(15),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 60,
            interval_ms: 5_000,
        }
    }
}

impl RetryConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            page_size: 10_000,
            initial_poll_ms: 500,
            min_poll_ms: 10,
            max_poll_ms: 5_000,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SpamError::Config(e.to_string()))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| SpamError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the filter misbehave at runtime
    pub fn validate(&self) -> Result<()> {
        regex::Regex::new(&self.extractor.word_split)?;
        regex::Regex::new(&self.extractor.trailing)?;

        if self.retry.max_attempts == 0 {
            return Err(SpamError::Config("retry.max_attempts must be at least 1".to_string()));
        }
        if self.export.page_size == 0 {
            return Err(SpamError::Config("export.page_size must be at least 1".to_string()));
        }
        if self.export.min_poll_ms > self.export.max_poll_ms {
            return Err(SpamError::Config(
                "export.min_poll_ms must not exceed export.max_poll_ms".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.extractor.max_phrase_length, 3);
        assert_eq!(config.classifier.max_significant, SignificantLimit::Top(15));
        assert_eq!(config.retry.max_attempts, 60);
        assert_eq!(config.retry.interval(), Duration::from_secs(5));
        assert_eq!(config.export.page_size, 10_000);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [storage]
            database_url = "sqlite::memory:"

            [classifier]
            max_significant = "unlimited"
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.database_url, "sqlite::memory:");
        assert_eq!(config.classifier.max_significant, SignificantLimit::Unlimited);
        assert_eq!(config.export.page_size, 10_000);
    }

    #[test]
    fn test_numeric_limit() {
        let config = Config::from_toml("[classifier]\nmax_significant = 4\n").unwrap();
        assert_eq!(config.classifier.max_significant, SignificantLimit::Top(4));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let result = Config::from_toml("[extractor]\nword_split = \"[unclosed\"\n");
        assert!(matches!(result, Err(SpamError::Pattern(_))));
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let result = Config::from_toml("[export]\npage_size = 0\n");
        assert!(matches!(result, Err(SpamError::Config(_))));
    }

    #[test]
    fn test_limit_from_str() {
        assert_eq!("ALL".parse::<SignificantLimit>().unwrap(), SignificantLimit::Unlimited);
        assert_eq!("7".parse::<SignificantLimit>().unwrap(), SignificantLimit::Top(7));
        assert!("many".parse::<SignificantLimit>().is_err());
    }
}
