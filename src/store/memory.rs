//! In-memory store, used in local mode and by tests.

use super::{field_matches, PostingStore};
use crate::error::StoreError;
use crate::models::{Posting, StoredPosting};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

/// Collections keyed by name, documents keyed by id.
///
/// Data is lost on restart, so repeated cycles only deduplicate within one
/// process lifetime.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, BTreeMap<String, StoredPosting>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection
    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }

    /// Snapshot of a collection in id order
    pub async fn documents(&self, collection: &str) -> Vec<StoredPosting> {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PostingStore for MemoryStore {
    async fn exists(&self, collection: &str, field: &str, value: &str) -> Result<bool, StoreError> {
        let collections = self.collections.read().await;
        let Some(docs) = collections.get(collection) else {
            return Ok(false);
        };

        if field == "id" {
            return Ok(docs.contains_key(value));
        }

        for doc in docs.values() {
            let serialized = serde_json::to_value(doc)?;
            if field_matches(&serialized, field, value) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn insert(&self, collection: &str, posting: &Posting) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();

        if docs.contains_key(&posting.id) {
            return Ok(false);
        }

        docs.insert(
            posting.id.clone(),
            StoredPosting {
                posting: posting.clone(),
                created_at: Utc::now(),
            },
        );
        Ok(true)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PostingKind, Source};

    fn posting(id: &str) -> Posting {
        Posting {
            id: id.to_string(),
            source: Source::Saeol,
            source_name: Source::Saeol.display_name().to_string(),
            title: "산불감시원 채용 공고".to_string(),
            date: None,
            link: format!("https://www.namhae.go.kr/gosi/{id}"),
            phones: vec!["055-860-3114".to_string()],
            keywords: vec!["채용".to_string()],
            kind: PostingKind::Job,
            crawled_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn insert_is_conditional_on_id() {
        let store = MemoryStore::new();
        assert!(store.insert("jobs", &posting("saeol_a")).await.unwrap());
        assert!(!store.insert("jobs", &posting("saeol_a")).await.unwrap());
        assert_eq!(store.count("jobs").await, 1);
        assert_eq!(store.count("houses").await, 0);
    }

    #[tokio::test]
    async fn exists_matches_any_top_level_field() {
        let store = MemoryStore::new();
        store.insert("jobs", &posting("saeol_b")).await.unwrap();

        assert!(store.exists("jobs", "id", "saeol_b").await.unwrap());
        assert!(store.exists("jobs", "link", "https://www.namhae.go.kr/gosi/saeol_b").await.unwrap());
        assert!(store.exists("jobs", "type", "job").await.unwrap());
        assert!(!store.exists("houses", "id", "saeol_b").await.unwrap());
    }
}
