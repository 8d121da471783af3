//! In-memory phrase statistics store

use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::StatStore;
use crate::error::Result;
use crate::spam::types::{PhraseCounts, PhraseRecord, Totals};

#[derive(Default)]
struct MemoryState {
    phrases: BTreeMap<String, PhraseCounts>,
    totals: Totals,
}

/// [`StatStore`] kept in a sorted map; nothing survives the process
#[derive(Default)]
pub struct MemoryStatStore {
    state: RwLock<MemoryState>,
}

impl MemoryStatStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl StatStore for MemoryStatStore {
    async fn get_phrase(&self, phrase: &str) -> Result<Option<PhraseCounts>> {
        let state = self.state.read().await;
        Ok(state.phrases.get(phrase).copied())
    }

    async fn increment_phrase(&self, phrase: &str, is_spam: bool) -> Result<()> {
        let mut state = self.state.write().await;
        let counts = state.phrases.entry(phrase.to_string()).or_default();
        *counts = counts.incremented(is_spam);
        Ok(())
    }

    async fn get_totals(&self) -> Result<Totals> {
        Ok(self.state.read().await.totals)
    }

    async fn increment_totals(&self, is_spam: bool) -> Result<()> {
        let mut state = self.state.write().await;
        state.totals = state.totals.incremented(is_spam);
        Ok(())
    }

    async fn count_phrases(&self) -> Result<u64> {
        Ok(self.state.read().await.phrases.len() as u64)
    }

    async fn page(&self, offset: u64, limit: u64) -> Result<Vec<PhraseRecord>> {
        let state = self.state.read().await;
        Ok(state
            .phrases
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|(phrase, counts)| PhraseRecord::new(phrase.clone(), *counts))
            .collect())
    }

    async fn learn(&self, phrases: &[String], is_spam: bool) -> Result<()> {
        // One write guard for the whole message keeps readers from seeing half of it
        let mut state = self.state.write().await;
        for phrase in phrases {
            let counts = state.phrases.entry(phrase.clone()).or_default();
            *counts = counts.incremented(is_spam);
        }
        state.totals = state.totals.incremented(is_spam);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_learn_and_lookup() {
        let store = MemoryStatStore::new();
        store
            .learn(&["free".to_string(), "free money".to_string()], true)
            .await
            .unwrap();
        store.learn(&["free".to_string()], false).await.unwrap();

        assert_eq!(store.get_totals().await.unwrap(), Totals::new(1, 1));
        assert_eq!(store.get_phrase("free").await.unwrap(), Some(PhraseCounts::new(1, 1)));
        assert_eq!(store.count_phrases().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_page_order_and_bounds() {
        let store = MemoryStatStore::new();
        for phrase in ["c", "a", "b"] {
            store.increment_phrase(phrase, false).await.unwrap();
        }

        let page = store.page(1, 5).await.unwrap();
        let names: Vec<_> = page.iter().map(|r| r.phrase.as_str()).collect();
        assert_eq!(names, vec!["b", "c"]);
        assert!(store.page(10, 5).await.unwrap().is_empty());
    }
}
