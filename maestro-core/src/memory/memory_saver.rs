//! In-memory checkpointer. No persistence across process restarts.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::memory::checkpoint::{Checkpoint, CheckpointListItem, CheckpointMetadata};
use crate::memory::checkpointer::{CheckpointError, Checkpointer};
use crate::memory::config::RunnableConfig;

type Key = (String, String, String);

/// In-memory `Checkpointer`. Keyed by `(thread_id, checkpoint_ns, checkpoint_id)`.
///
/// Dev/test default; state is lost when the process exits. Use `SqliteSaver` for
/// sessions that must survive a restart.
#[derive(Default)]
pub struct MemorySaver<S> {
    checkpoints: Mutex<HashMap<Key, (Checkpoint<S>, CheckpointMetadata)>>,
    order: Mutex<Vec<Key>>,
}

impl<S> MemorySaver<S> {
    /// Creates an empty in-memory checkpointer.
    pub fn new() -> Self {
        Self {
            checkpoints: Mutex::new(HashMap::new()),
            order: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl<S> Checkpointer<S> for MemorySaver<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn put(
        &self,
        config: &RunnableConfig,
        checkpoint: &Checkpoint<S>,
    ) -> Result<String, CheckpointError> {
        let thread_id = config
            .thread_id
            .clone()
            .ok_or(CheckpointError::ThreadIdRequired)?;
        let key = (
            thread_id,
            config.checkpoint_ns.clone(),
            checkpoint.id.clone(),
        );
        let mut checkpoints = self.checkpoints.lock();
        if !checkpoints.contains_key(&key) {
            self.order.lock().push(key.clone());
        }
        checkpoints.insert(key, (checkpoint.clone(), checkpoint.metadata.clone()));
        Ok(checkpoint.id.clone())
    }

    async fn get_tuple(
        &self,
        config: &RunnableConfig,
    ) -> Result<Option<(Checkpoint<S>, CheckpointMetadata)>, CheckpointError> {
        let thread_id = config
            .thread_id
            .clone()
            .ok_or(CheckpointError::ThreadIdRequired)?;
        let checkpoints = self.checkpoints.lock();
        if let Some(ref wanted) = config.checkpoint_id {
            let key = (thread_id, config.checkpoint_ns.clone(), wanted.clone());
            return Ok(checkpoints.get(&key).cloned());
        }
        let order = self.order.lock();
        let latest = order
            .iter()
            .rev()
            .find(|(t, ns, _)| *t == thread_id && *ns == config.checkpoint_ns)
            .and_then(|key| checkpoints.get(key).cloned());
        Ok(latest)
    }

    async fn list(
        &self,
        config: &RunnableConfig,
        limit: Option<usize>,
        before: Option<&str>,
        after: Option<&str>,
    ) -> Result<Vec<CheckpointListItem>, CheckpointError> {
        let thread_id = config
            .thread_id
            .clone()
            .ok_or(CheckpointError::ThreadIdRequired)?;
        let checkpoints = self.checkpoints.lock();
        let order = self.order.lock();
        let mut items: Vec<CheckpointListItem> = order
            .iter()
            .filter(|(t, ns, _)| *t == thread_id && *ns == config.checkpoint_ns)
            .filter_map(|key| {
                checkpoints.get(key).map(|(cp, meta)| CheckpointListItem {
                    checkpoint_id: cp.id.clone(),
                    metadata: meta.clone(),
                })
            })
            .collect();
        if let Some(a) = after {
            if let Some(pos) = items.iter().position(|i| i.checkpoint_id == a) {
                items = items[pos + 1..].to_vec();
            }
        }
        if let Some(b) = before {
            if let Some(pos) = items.iter().position(|i| i.checkpoint_id == b) {
                items = items[..pos].to_vec();
            }
        }
        if let Some(n) = limit {
            if items.len() > n {
                let start = items.len() - n;
                items = items[start..].to_vec();
            }
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::checkpoint::{CheckpointSource, CHECKPOINT_VERSION};
    use std::collections::HashMap as StdHashMap;

    fn checkpoint(id: &str, value: i32) -> Checkpoint<i32> {
        Checkpoint {
            v: CHECKPOINT_VERSION,
            id: id.to_string(),
            ts: "2026-01-01T00:00:00Z".to_string(),
            channel_values: value,
            channel_versions: StdHashMap::new(),
            versions_seen: StdHashMap::new(),
            updated_channels: None,
            pending_sends: Vec::new(),
            metadata: CheckpointMetadata {
                source: CheckpointSource::Loop,
                step: 0,
                created_at: None,
                parents: StdHashMap::new(),
            },
        }
    }

    /// **Scenario**: `put` without `thread_id` fails with `ThreadIdRequired`.
    #[tokio::test]
    async fn put_requires_thread_id() {
        let saver: MemorySaver<i32> = MemorySaver::new();
        let config = RunnableConfig::default();
        let err = saver.put(&config, &checkpoint("a", 1)).await.unwrap_err();
        assert!(matches!(err, CheckpointError::ThreadIdRequired));
    }

    /// **Scenario**: `get_tuple` with no checkpoint_id returns the most recently put one.
    #[tokio::test]
    async fn get_tuple_returns_latest() {
        let saver: MemorySaver<i32> = MemorySaver::new();
        let config = RunnableConfig::with_thread_id("t1");
        saver.put(&config, &checkpoint("a", 1)).await.unwrap();
        saver.put(&config, &checkpoint("b", 2)).await.unwrap();
        let (cp, _) = saver.get_tuple(&config).await.unwrap().unwrap();
        assert_eq!(cp.channel_values, 2);
    }

    /// **Scenario**: `get_tuple` with an explicit checkpoint_id loads that exact checkpoint.
    #[tokio::test]
    async fn get_tuple_loads_specific_checkpoint() {
        let saver: MemorySaver<i32> = MemorySaver::new();
        let config = RunnableConfig::with_thread_id("t1");
        saver.put(&config, &checkpoint("a", 1)).await.unwrap();
        saver.put(&config, &checkpoint("b", 2)).await.unwrap();
        let specific = config.clone().with_checkpoint_id("a");
        let (cp, _) = saver.get_tuple(&specific).await.unwrap().unwrap();
        assert_eq!(cp.channel_values, 1);
    }

    /// **Scenario**: different thread ids do not see each other's checkpoints.
    #[tokio::test]
    async fn threads_are_isolated() {
        let saver: MemorySaver<i32> = MemorySaver::new();
        saver
            .put(&RunnableConfig::with_thread_id("t1"), &checkpoint("a", 1))
            .await
            .unwrap();
        let result = saver
            .get_tuple(&RunnableConfig::with_thread_id("t2"))
            .await
            .unwrap();
        assert!(result.is_none());
    }
}
