//! `RunnableConfig`: per-invocation configuration passed to `CompiledStateGraph::invoke`.

use std::collections::HashMap;

/// Config for a single graph run: thread identity for checkpointing, user scoping for
/// the long-term store, and free-form configurable values for node-level overrides.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunnableConfig {
    /// Identifies the conversation/session. Required when a checkpointer is attached.
    pub thread_id: Option<String>,
    /// Namespace for subgraph checkpoints. Empty string for the root graph.
    pub checkpoint_ns: String,
    /// Load a specific checkpoint id instead of the latest (time travel / branching).
    pub checkpoint_id: Option<String>,
    /// Scopes long-term store access for multi-tenant deployments.
    pub user_id: Option<String>,
    /// Maximum number of graph steps before aborting with a recursion error.
    pub recursion_limit: Option<u32>,
    /// Free-form per-run overrides nodes may read (e.g. model name, temperature).
    pub configurable: HashMap<String, serde_json::Value>,
}

impl RunnableConfig {
    /// Builds a config scoped to the given thread id, all other fields default.
    pub fn with_thread_id(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: Some(thread_id.into()),
            ..Self::default()
        }
    }

    /// Sets `checkpoint_id` for loading a specific checkpoint.
    pub fn with_checkpoint_id(mut self, checkpoint_id: impl Into<String>) -> Self {
        self.checkpoint_id = Some(checkpoint_id.into());
        self
    }

    /// Sets `user_id` for store scoping.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}
