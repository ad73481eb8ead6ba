//! `RunContext`: per-invocation context threaded through `Node::run_with_context`.

use std::collections::HashSet;
use std::fmt::Debug;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::memory::{RunnableConfig, Store};
use crate::stream::{StreamEvent, StreamMode};

/// Context available to a node while it runs, beyond its input state.
///
/// Carries the run's `RunnableConfig` (thread/user id), an optional store, and the
/// streaming channel + enabled modes so nodes like `ThinkNode` can forward LLM
/// token chunks without the caller needing a separate streaming API. Cheap to
/// clone: the runner clones it into boxed middleware closures per node.
#[derive(Clone)]
pub struct RunContext<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// Config for this run (thread_id, user_id, etc.).
    pub config: RunnableConfig,
    /// Long-term store, if the graph was compiled with one.
    pub store: Option<Arc<dyn Store>>,
    /// Sender for stream events, if the caller invoked `stream`/`stream_with_config`.
    pub stream_tx: Option<mpsc::Sender<StreamEvent<S>>>,
    /// Which stream modes are enabled; nodes check this before doing extra work to stream.
    pub stream_mode: HashSet<StreamMode>,
}

impl<S> RunContext<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// Builds a context with no streaming (used by plain `invoke`/`invoke_with_config`).
    pub fn without_streaming(config: RunnableConfig, store: Option<Arc<dyn Store>>) -> Self {
        Self {
            config,
            store,
            stream_tx: None,
            stream_mode: HashSet::new(),
        }
    }

    /// Builds a context with streaming enabled for the given modes.
    pub fn with_streaming(
        config: RunnableConfig,
        store: Option<Arc<dyn Store>>,
        stream_tx: mpsc::Sender<StreamEvent<S>>,
        stream_mode: HashSet<StreamMode>,
    ) -> Self {
        Self {
            config,
            store,
            stream_tx: Some(stream_tx),
            stream_mode,
        }
    }

    /// True when `mode` is enabled and a sender is attached.
    pub fn should_stream(&self, mode: &StreamMode) -> bool {
        self.stream_tx.is_some() && self.stream_mode.contains(mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: a context built without streaming never reports `should_stream`.
    #[test]
    fn without_streaming_never_streams() {
        let ctx: RunContext<i32> = RunContext::without_streaming(RunnableConfig::default(), None);
        assert!(!ctx.should_stream(&StreamMode::Messages));
    }

    /// **Scenario**: `should_stream` is true only for modes included in `stream_mode`.
    #[test]
    fn with_streaming_checks_mode_membership() {
        let (tx, _rx) = mpsc::channel(1);
        let modes: HashSet<StreamMode> = [StreamMode::Messages].into_iter().collect();
        let ctx: RunContext<i32> =
            RunContext::with_streaming(RunnableConfig::default(), None, tx, modes);
        assert!(ctx.should_stream(&StreamMode::Messages));
        assert!(!ctx.should_stream(&StreamMode::Tasks));
    }
}
