//! The `Agent` trait: a named, single-shot unit of work over an owned state
//! type. `ReactRunner` is the concrete agent this crate ships; the
//! orchestrator crate wraps it per expert spec rather than implementing this
//! trait itself, since orchestration needs routing and aggregation on top.

use async_trait::async_trait;

use crate::error::AgentError;

/// A named agent that consumes and returns its own state type.
#[async_trait]
pub trait Agent: Send + Sync {
    type State: Clone + Send + Sync + 'static;

    /// A short, stable name used in logs and trace output.
    fn name(&self) -> &str;

    /// Runs the agent to completion, returning the final state.
    async fn run(&self, state: Self::State) -> Result<Self::State, AgentError>;
}
