//! Long-term, cross-session key-value store, isolated by `Namespace`.
//!
//! Distinct from `Checkpointer`: a `Store` holds values that outlive any single
//! thread/session (e.g. user preferences), addressed by an explicit namespace
//! rather than `thread_id`. Kept minimal here: no vector/semantic search, since
//! nothing in this workspace currently needs it; `InMemoryStore` is the only
//! implementation.

use std::time::SystemTime;

use async_trait::async_trait;
use thiserror::Error;

/// A namespace is a path of segments, e.g. `["user-123", "preferences"]`.
pub type Namespace = Vec<String>;

/// Errors returned by `Store` operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying storage failure (I/O, serialization, etc.).
    #[error("store error: {0}")]
    Backend(String),
}

/// A stored item: namespace, key, value, and timestamps.
#[derive(Debug, Clone)]
pub struct Item {
    /// Namespace this item lives under.
    pub namespace: Namespace,
    /// Key within the namespace.
    pub key: String,
    /// Opaque JSON value.
    pub value: serde_json::Value,
    /// When the item was first written.
    pub created_at: SystemTime,
    /// When the item was last updated.
    pub updated_at: SystemTime,
}

impl Item {
    /// Builds an item with explicit timestamps (used when reconstructing from storage).
    pub fn with_timestamps(
        namespace: Namespace,
        key: String,
        value: serde_json::Value,
        created_at: SystemTime,
        updated_at: SystemTime,
    ) -> Self {
        Self {
            namespace,
            key,
            value,
            created_at,
            updated_at,
        }
    }
}

/// How a namespace prefix filter should match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceMatchType {
    /// Namespace must match exactly.
    Exact,
    /// Namespace must start with the given prefix.
    Prefix,
}

/// Options for `Store::list_namespaces`.
#[derive(Debug, Clone, Default)]
pub struct ListNamespacesOptions {
    /// Optional prefix filter.
    pub prefix: Option<Namespace>,
    /// Maximum number of namespaces to return.
    pub limit: Option<usize>,
}

/// A field-level match condition, used by `SearchOptions::filter`.
#[derive(Debug, Clone)]
pub enum MatchCondition {
    /// Field equals value.
    Eq(String, serde_json::Value),
}

/// Options for `Store::search`.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Only items matching all conditions are returned.
    pub filter: Vec<MatchCondition>,
    /// Maximum number of results.
    pub limit: Option<usize>,
}

/// One search hit: the item plus an optional relevance score.
#[derive(Debug, Clone)]
pub struct SearchItem {
    /// The matched item.
    pub item: Item,
    /// Relevance score, when the backend supports ranking (unset for exact-match stores).
    pub score: Option<f32>,
}

/// Alias kept for backend implementations that want a distinct search-result type.
pub type StoreSearchHit = SearchItem;

/// A single store mutation, for batched `Store::batch` calls.
#[derive(Debug, Clone)]
pub enum StoreOp {
    /// Write (or overwrite) a value at `namespace`/`key`.
    Put {
        /// Target namespace.
        namespace: Namespace,
        /// Target key.
        key: String,
        /// Value to store.
        value: serde_json::Value,
    },
    /// Delete the value at `namespace`/`key`, if present.
    Delete {
        /// Target namespace.
        namespace: Namespace,
        /// Target key.
        key: String,
    },
}

/// Result of a single `StoreOp` within a batch.
#[derive(Debug, Clone)]
pub enum StoreOpResult {
    /// The op completed with no return value.
    Done,
}

/// Cross-session key-value store, isolated by namespace.
#[async_trait]
pub trait Store: Send + Sync {
    /// Reads a single item, if present.
    async fn get(&self, namespace: &[String], key: &str) -> Result<Option<Item>, StoreError>;

    /// Writes (or overwrites) a value.
    async fn put(
        &self,
        namespace: &[String],
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), StoreError>;

    /// Deletes a value, if present.
    async fn delete(&self, namespace: &[String], key: &str) -> Result<(), StoreError>;

    /// Lists items in a namespace, optionally filtered.
    async fn search(
        &self,
        namespace: &[String],
        options: &SearchOptions,
    ) -> Result<Vec<SearchItem>, StoreError>;

    /// Applies multiple ops; implementations may batch them in one transaction.
    async fn batch(&self, ops: Vec<StoreOp>) -> Result<Vec<StoreOpResult>, StoreError>;
}
