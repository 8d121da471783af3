//! Database bootstrap
//!
//! Creates the phrase and totals tables, and folds a database in the legacy
//! single-table layout (`SPAMSTATS`, with the totals kept in the row keyed by
//! a single space) into them.

use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::info;

use crate::error::Result;

/// Key under which the legacy layout stored the message totals
const LEGACY_TOTALS_KEY: &str = " ";

/// Create tables if needed and migrate legacy data
pub async fn init(db: &SqlitePool) -> Result<()> {
    let mut tx = db.begin().await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS phrase_stats (
            phrase TEXT NOT NULL PRIMARY KEY,
            spam INTEGER NOT NULL DEFAULT 0,
            good INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS message_totals (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            spam INTEGER NOT NULL DEFAULT 0,
            good INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    let seeded = sqlx::query("INSERT OR IGNORE INTO message_totals (id, spam, good) VALUES (1, 0, 0)")
        .execute(&mut *tx)
        .await?;
    if seeded.rows_affected() > 0 {
        info!("Created phrase statistics tables");
    }

    if has_legacy_table(&mut tx).await? {
        migrate_legacy(&mut tx).await?;
    }

    tx.commit().await?;
    Ok(())
}

async fn has_legacy_table(tx: &mut Transaction<'_, Sqlite>) -> Result<bool> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'SPAMSTATS' COLLATE NOCASE",
    )
    .fetch_one(&mut **tx)
    .await?;

    Ok(count > 0)
}

async fn migrate_legacy(tx: &mut Transaction<'_, Sqlite>) -> Result<()> {
    let phrases = sqlx::query(
        r#"
        INSERT INTO phrase_stats (phrase, spam, good)
        SELECT phrase, COALESCE(spam, 0), COALESCE(good, 0)
        FROM SPAMSTATS
        WHERE phrase <> ?
        ON CONFLICT(phrase) DO UPDATE SET
            spam = spam + excluded.spam,
            good = good + excluded.good
        "#,
    )
    .bind(LEGACY_TOTALS_KEY)
    .execute(&mut **tx)
    .await?;

    sqlx::query(
        r#"
        UPDATE message_totals SET
            spam = spam + COALESCE((SELECT spam FROM SPAMSTATS WHERE phrase = ?), 0),
            good = good + COALESCE((SELECT good FROM SPAMSTATS WHERE phrase = ?), 0)
        WHERE id = 1
        "#,
    )
    .bind(LEGACY_TOTALS_KEY)
    .bind(LEGACY_TOTALS_KEY)
    .execute(&mut **tx)
    .await?;

    sqlx::query("DROP TABLE SPAMSTATS")
        .execute(&mut **tx)
        .await?;

    info!(
        "Migrated {} phrases from legacy SPAMSTATS table",
        phrases.rows_affected()
    );

    Ok(())
}
