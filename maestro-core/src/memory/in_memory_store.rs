//! In-memory `Store`. Not persistent; dev/test default.

use std::collections::HashMap;
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::memory::store::{
    Item, MatchCondition, SearchItem, SearchOptions, Store, StoreError, StoreOp, StoreOpResult,
};

fn map_key(namespace: &[String], key: &str) -> String {
    format!("{}\0{}", namespace.join("\0"), key)
}

fn matches(value: &serde_json::Value, conditions: &[MatchCondition]) -> bool {
    conditions.iter().all(|c| match c {
        MatchCondition::Eq(field, expected) => {
            value.get(field).map(|v| v == expected).unwrap_or(false)
        }
    })
}

#[derive(Debug, Clone)]
struct Entry {
    namespace: Vec<String>,
    key: String,
    value: serde_json::Value,
    created_at: SystemTime,
    updated_at: SystemTime,
}

impl Entry {
    fn to_item(&self) -> Item {
        Item::with_timestamps(
            self.namespace.clone(),
            self.key.clone(),
            self.value.clone(),
            self.created_at,
            self.updated_at,
        )
    }
}

/// In-memory implementation of `Store`, keyed by namespace + key.
#[derive(Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get(&self, namespace: &[String], key: &str) -> Result<Option<Item>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries.get(&map_key(namespace, key)).map(Entry::to_item))
    }

    async fn put(
        &self,
        namespace: &[String],
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        let now = SystemTime::now();
        let map_key = map_key(namespace, key);
        let created_at = entries.get(&map_key).map(|e| e.created_at).unwrap_or(now);
        entries.insert(
            map_key,
            Entry {
                namespace: namespace.to_vec(),
                key: key.to_string(),
                value,
                created_at,
                updated_at: now,
            },
        );
        Ok(())
    }

    async fn delete(&self, namespace: &[String], key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.remove(&map_key(namespace, key));
        Ok(())
    }

    async fn search(
        &self,
        namespace: &[String],
        options: &SearchOptions,
    ) -> Result<Vec<SearchItem>, StoreError> {
        let entries = self.entries.read().await;
        let mut results: Vec<SearchItem> = entries
            .values()
            .filter(|e| e.namespace == namespace)
            .filter(|e| matches(&e.value, &options.filter))
            .map(|e| SearchItem {
                item: e.to_item(),
                score: None,
            })
            .collect();
        if let Some(limit) = options.limit {
            results.truncate(limit);
        }
        Ok(results)
    }

    async fn batch(&self, ops: Vec<StoreOp>) -> Result<Vec<StoreOpResult>, StoreError> {
        let mut results = Vec::with_capacity(ops.len());
        for op in ops {
            match op {
                StoreOp::Put {
                    namespace,
                    key,
                    value,
                } => self.put(&namespace, &key, value).await?,
                StoreOp::Delete { namespace, key } => self.delete(&namespace, &key).await?,
            }
            results.push(StoreOpResult::Done);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: a value written with `put` is returned unchanged by `get`.
    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = InMemoryStore::new();
        let ns = vec!["user-1".to_string()];
        store
            .put(&ns, "pref", serde_json::json!({"theme": "dark"}))
            .await
            .unwrap();
        let item = store.get(&ns, "pref").await.unwrap().unwrap();
        assert_eq!(item.value, serde_json::json!({"theme": "dark"}));
    }

    /// **Scenario**: `delete` removes the item so a subsequent `get` returns `None`.
    #[tokio::test]
    async fn delete_removes_item() {
        let store = InMemoryStore::new();
        let ns = vec!["user-1".to_string()];
        store.put(&ns, "pref", serde_json::json!(1)).await.unwrap();
        store.delete(&ns, "pref").await.unwrap();
        assert!(store.get(&ns, "pref").await.unwrap().is_none());
    }

    /// **Scenario**: `search` only returns items from the requested namespace.
    #[tokio::test]
    async fn search_scopes_to_namespace() {
        let store = InMemoryStore::new();
        store
            .put(&["a".to_string()], "k", serde_json::json!(1))
            .await
            .unwrap();
        store
            .put(&["b".to_string()], "k", serde_json::json!(2))
            .await
            .unwrap();
        let results = store
            .search(&["a".to_string()], &SearchOptions::default())
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
    }
}
