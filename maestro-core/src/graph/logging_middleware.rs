//! `LoggingNodeMiddleware`: wraps every node run with start/complete/error logging.
//!
//! Attached via `compile_with_middleware` / `compile_with_checkpointer_and_middleware`,
//! or used directly by `ReactRunner::new` when `AgentOptions::verbose` is set.

use async_trait::async_trait;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::pin::Pin;

use crate::error::AgentError;

use super::logging::{log_node_complete, log_node_start, log_state_update};
use super::node_middleware::NodeMiddleware;
use super::Next;

/// Logs node start/complete/error around the wrapped node execution.
pub struct LoggingNodeMiddleware<S> {
    _marker: PhantomData<S>,
}

impl<S> Default for LoggingNodeMiddleware<S> {
    fn default() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<S> NodeMiddleware<S> for LoggingNodeMiddleware<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    async fn around_run(
        &self,
        node_id: &str,
        state: S,
        inner: Box<
            dyn FnOnce(
                    S,
                ) -> Pin<
                    Box<dyn std::future::Future<Output = Result<(S, Next), AgentError>> + Send>,
                > + Send,
        >,
    ) -> Result<(S, Next), AgentError> {
        log_node_start(node_id);
        let result = inner(state).await;
        match &result {
            Ok((state, _)) => {
                log_node_complete(node_id, true);
                log_state_update(node_id, state);
            }
            Err(e) => {
                log_node_complete(node_id, false);
                tracing::warn!(node_id, error = %e, "node error");
            }
        }
        result
    }
}
