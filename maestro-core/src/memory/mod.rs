//! # Memory: Checkpointing and Long-term Store
//!
//! [Checkpointer] + [Store] for persistence.
//!
//! ## Overview
//!
//! The memory module provides two distinct capabilities:
//!
//! 1. **Checkpointer** — Per-thread state snapshots for time-travel, branching, and resumable
//!    conversations. Keys checkpoints by `(thread_id, checkpoint_ns, checkpoint_id)`.
//! 2. **Store** — Cross-session key-value storage for long-term memory (preferences, facts, etc.).
//!    Isolated by [`Namespace`] (e.g. `[user_id, "memories"]`). Optional vector search via LanceDB.
//!
//! ## Config
//!
//! [`RunnableConfig`] is passed to `CompiledStateGraph::invoke`. When using a checkpointer:
//! - `thread_id`: Required. Identifies the conversation/thread.
//! - `checkpoint_id`: Optional. Load a specific checkpoint (time-travel / branch).
//! - `checkpoint_ns`: Optional namespace for subgraphs.
//! - `user_id`: Used by Store for multi-tenant isolation.
//!
//! ## Checkpointer Implementations
//!
//! | Type         | Persistence | Use case                    | Feature  |
//! |--------------|-------------|-----------------------------|----------|
//! | [`MemorySaver`]  | In-memory   | Dev, tests                  | —        |
//! | [`SqliteSaver`]  | SQLite file | Single-node, production     | — |
//!
//! Use with [`StateGraph::compile_with_checkpointer`](crate::graph::StateGraph::compile_with_checkpointer).
//! [`JsonSerializer`] is required for `SqliteSaver` (state must be `Serialize + DeserializeOwned`).
//!
//! ## Store Implementations
//!
//! | Type             | Persistence | Search                      | Feature  |
//! |------------------|-------------|-----------------------------|----------|
//! | [`InMemoryStore`] | In-memory   | String filter (key/value)   | —        |
//! | [`SqliteStore`]   | SQLite file | String filter               | — |
//! | [`SqliteVecStore`] | SQLite file | Vector similarity (semantic) | — |
//! | [`LanceStore`]      | LanceDB     | Vector similarity (semantic)| `lance`  |
//! | [`InMemoryVectorStore`] | In-memory | Vector similarity (semantic) | — |
//!
//! No vector/semantic search is implemented; nothing in this workspace needs it, since
//! expert memory is scoped to a single session via `Checkpointer`.

mod checkpoint;
mod checkpointer;
mod config;
mod in_memory_store;
mod memory_saver;
mod serializer;
mod sqlite_saver;
mod store;

pub use checkpoint::{
    writes_idx_map, ChannelVersions, Checkpoint, CheckpointListItem, CheckpointMetadata,
    CheckpointSource, CheckpointTuple, PendingWrite, CHECKPOINT_VERSION, ERROR, INTERRUPT, RESUME,
    SCHEDULED,
};
pub use checkpointer::{CheckpointError, Checkpointer};
pub use config::RunnableConfig;
pub use in_memory_store::InMemoryStore;
pub use memory_saver::MemorySaver;
pub use serializer::{
    JsonSerializer, Serializer, TypedData, TypedSerializer, TYPE_BYTES, TYPE_JSON, TYPE_NULL,
};
pub use sqlite_saver::SqliteSaver;
pub use store::{
    Item, ListNamespacesOptions, MatchCondition, Namespace, NamespaceMatchType, SearchItem,
    SearchOptions, Store, StoreError, StoreOp, StoreOpResult, StoreSearchHit,
};
