//! SQLite phrase statistics store
//!
//! Phrase counters live in `phrase_stats`, message totals in the single row of
//! `message_totals`. Learning a message runs in one transaction so the totals
//! never disagree with the phrase increments they belong to.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Executor, Sqlite, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

use super::{schema, StatStore};
use crate::error::{Result, SpamError};
use crate::spam::types::{PhraseCounts, PhraseRecord, Totals};

/// SQLite-backed [`StatStore`]
#[derive(Clone)]
pub struct SqliteStatStore {
    db: SqlitePool,
}

impl SqliteStatStore {
    /// Open (or create) the database at `database_url` and initialize it
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // In-memory databases are per connection unless the pool shares one
        let max_connections = if database_url.contains(":memory:") { 1 } else { 4 };

        let db = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        info!("Opened phrase database {}", database_url);
        Self::new(db).await
    }

    /// Wrap an existing pool, creating tables as needed
    pub async fn new(db: SqlitePool) -> Result<Self> {
        schema::init(&db).await?;
        Ok(Self { db })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db
    }
}

async fn upsert_phrase<'e, E>(executor: E, phrase: &str, is_spam: bool) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let (spam, good) = if is_spam { (1_i64, 0_i64) } else { (0, 1) };

    sqlx::query(
        r#"
        INSERT INTO phrase_stats (phrase, spam, good)
        VALUES (?, ?, ?)
        ON CONFLICT(phrase) DO UPDATE SET
            spam = spam + excluded.spam,
            good = good + excluded.good
        "#,
    )
    .bind(phrase)
    .bind(spam)
    .bind(good)
    .execute(executor)
    .await?;

    Ok(())
}

async fn bump_totals<'e, E>(executor: E, is_spam: bool) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let (spam, good) = if is_spam { (1_i64, 0_i64) } else { (0, 1) };

    let result = sqlx::query("UPDATE message_totals SET spam = spam + ?, good = good + ? WHERE id = 1")
        .bind(spam)
        .bind(good)
        .execute(executor)
        .await?;

    if result.rows_affected() == 0 {
        return Err(SpamError::MissingTotals);
    }

    Ok(())
}

#[async_trait::async_trait]
impl StatStore for SqliteStatStore {
    async fn get_phrase(&self, phrase: &str) -> Result<Option<PhraseCounts>> {
        let row = sqlx::query_as::<_, (i64, i64)>(
            "SELECT spam, good FROM phrase_stats WHERE phrase = ?",
        )
        .bind(phrase)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(|(spam, good)| PhraseCounts::new(spam as u64, good as u64)))
    }

    async fn increment_phrase(&self, phrase: &str, is_spam: bool) -> Result<()> {
        upsert_phrase(&self.db, phrase, is_spam).await
    }

    async fn get_totals(&self) -> Result<Totals> {
        let row = sqlx::query_as::<_, (i64, i64)>(
            "SELECT spam, good FROM message_totals WHERE id = 1",
        )
        .fetch_optional(&self.db)
        .await?;

        row.map(|(spam, good)| Totals::new(spam as u64, good as u64))
            .ok_or(SpamError::MissingTotals)
    }

    async fn increment_totals(&self, is_spam: bool) -> Result<()> {
        bump_totals(&self.db, is_spam).await
    }

    async fn count_phrases(&self) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM phrase_stats")
            .fetch_one(&self.db)
            .await?;

        Ok(count as u64)
    }

    async fn page(&self, offset: u64, limit: u64) -> Result<Vec<PhraseRecord>> {
        let rows = sqlx::query_as::<_, (String, i64, i64)>(
            "SELECT phrase, spam, good FROM phrase_stats ORDER BY phrase LIMIT ? OFFSET ?",
        )
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(phrase, spam, good)| PhraseRecord {
                phrase,
                spam: spam as u64,
                good: good as u64,
            })
            .collect())
    }

    async fn learn(&self, phrases: &[String], is_spam: bool) -> Result<()> {
        let mut tx = self.db.begin().await?;

        for phrase in phrases {
            upsert_phrase(&mut *tx, phrase, is_spam).await?;
        }
        bump_totals(&mut *tx, is_spam).await?;

        tx.commit().await?;

        debug!("Committed {} phrase increments", phrases.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SqliteStatStore {
        SqliteStatStore::connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_fresh_store_is_empty() {
        let store = store().await;
        assert_eq!(store.get_totals().await.unwrap(), Totals::default());
        assert_eq!(store.count_phrases().await.unwrap(), 0);
        assert!(store.get_phrase("anything").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_increment_phrase_creates_then_updates() {
        let store = store().await;
        store.increment_phrase("cheap", true).await.unwrap();
        assert_eq!(store.get_phrase("cheap").await.unwrap(), Some(PhraseCounts::new(1, 0)));

        store.increment_phrase("cheap", false).await.unwrap();
        store.increment_phrase("cheap", true).await.unwrap();
        assert_eq!(store.get_phrase("cheap").await.unwrap(), Some(PhraseCounts::new(2, 1)));
    }

    #[tokio::test]
    async fn test_increment_totals_counts_each_class() {
        let store = store().await;
        store.increment_totals(true).await.unwrap();
        store.increment_totals(false).await.unwrap();
        store.increment_totals(true).await.unwrap();

        assert_eq!(store.get_totals().await.unwrap(), Totals::new(2, 1));
        assert_eq!(store.count_phrases().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_increment_totals_without_row_fails() {
        let store = store().await;
        sqlx::query("DELETE FROM message_totals")
            .execute(store.pool())
            .await
            .unwrap();

        let result = store.increment_totals(false).await;
        assert!(matches!(result, Err(SpamError::MissingTotals)));
    }

    #[tokio::test]
    async fn test_learn_updates_phrases_and_totals() {
        let store = store().await;
        let phrases = vec!["buy".to_string(), "now".to_string(), "buy now".to_string()];

        store.learn(&phrases, true).await.unwrap();
        store.learn(&phrases[..1], false).await.unwrap();

        assert_eq!(store.get_totals().await.unwrap(), Totals::new(1, 1));
        assert_eq!(store.get_phrase("buy").await.unwrap(), Some(PhraseCounts::new(1, 1)));
        assert_eq!(store.get_phrase("buy now").await.unwrap(), Some(PhraseCounts::new(1, 0)));
        assert_eq!(store.count_phrases().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_learn_with_no_phrases_still_counts_message() {
        let store = store().await;
        store.learn(&[], false).await.unwrap();
        assert_eq!(store.get_totals().await.unwrap(), Totals::new(0, 1));
    }

    #[tokio::test]
    async fn test_learn_rolls_back_without_totals_row() {
        let store = store().await;
        sqlx::query("DELETE FROM message_totals")
            .execute(store.pool())
            .await
            .unwrap();

        let result = store.learn(&["orphan".to_string()], true).await;
        assert!(matches!(result, Err(SpamError::MissingTotals)));
        assert!(store.get_phrase("orphan").await.unwrap().is_none());
        assert!(matches!(store.get_totals().await, Err(SpamError::MissingTotals)));
    }

    #[tokio::test]
    async fn test_page_is_ordered_by_phrase() {
        let store = store().await;
        for phrase in ["delta", "alpha", "charlie", "bravo"] {
            store.increment_phrase(phrase, true).await.unwrap();
        }

        let first = store.page(0, 3).await.unwrap();
        let rest = store.page(3, 3).await.unwrap();

        let names: Vec<_> = first.iter().chain(rest.iter()).map(|r| r.phrase.as_str()).collect();
        assert_eq!(names, vec!["alpha", "bravo", "charlie", "delta"]);
        assert_eq!(rest.len(), 1);
        assert!(store.page(4, 3).await.unwrap().is_empty());
    }
}
