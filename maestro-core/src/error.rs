//! `AgentError`: the single error type threaded through graph execution,
//! nodes, checkpointing, and LLM/tool calls.

use crate::tool_source::ToolSourceError;

/// Errors surfaced while compiling or running a graph.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// A node's `run`/`run_with_context` returned this error and the retry
    /// policy (if any) was exhausted.
    #[error("node execution failed: {0}")]
    ExecutionFailed(String),

    /// The run exceeded `RunnableConfig::recursion_limit` (or the default)
    /// without reaching `END`.
    #[error("recursion limit exceeded after {0} steps")]
    RecursionLimitExceeded(u32),

    /// Checkpoint save/load failed.
    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    /// The configured LLM client returned an error.
    #[error("llm error: {0}")]
    Llm(String),

    /// A tool call failed in a way the node's error-handling policy did not
    /// absorb.
    #[error("tool error: {0}")]
    Tool(#[from] ToolSourceError),

    /// State serialization/deserialization failed (e.g. for `Store` or
    /// checkpoint persistence).
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Graph was interrupted (e.g. by an `InterruptHandler`) before
    /// completing.
    #[error("graph interrupted: {0}")]
    Interrupted(String),
}
