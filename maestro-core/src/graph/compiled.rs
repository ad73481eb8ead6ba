//! `CompiledStateGraph`: the executable form of a `StateGraph`, produced by `compile*`.
//!
//! Walks nodes in `next_map` order starting from `first_node_id`, applying the
//! state updater after each step, checkpointing when a thread id is set, and
//! retrying failed nodes per `retry_policy`. `invoke` runs to completion and
//! returns the final state; `stream` does the same work on a background task
//! and additionally emits `StreamEvent`s for tasks, values, and checkpoints as
//! it goes.

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::pin::Pin;
use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;

use crate::channels::BoxedStateUpdater;
use crate::error::AgentError;
use crate::graph::conditional::NextEntry;
use crate::graph::interrupt::InterruptHandler;
use crate::graph::next::Next;
use crate::graph::node::Node;
use crate::graph::node_middleware::NodeMiddleware;
use crate::graph::retry::RetryPolicy;
use crate::graph::run_context::RunContext;
use crate::memory::{
    Checkpoint, CheckpointMetadata, CheckpointSource, Checkpointer, RunnableConfig, Store,
};
use crate::stream::{CheckpointEvent, StreamEvent, StreamMode};

/// Default cap on graph steps when `RunnableConfig::recursion_limit` is unset.
pub const DEFAULT_RECURSION_LIMIT: u32 = 25;

/// An executable graph produced by `StateGraph::compile*`.
///
/// Immutable once built. Cheap to share: clone the `Arc` fields if you need
/// several owners, or wrap the whole thing in an `Arc<CompiledStateGraph<S>>`.
pub struct CompiledStateGraph<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    pub(crate) nodes: HashMap<String, Arc<dyn Node<S>>>,
    pub(crate) first_node_id: String,
    #[allow(dead_code)]
    pub(crate) edge_order: Vec<String>,
    pub(crate) next_map: HashMap<String, NextEntry<S>>,
    pub(crate) checkpointer: Option<Arc<dyn Checkpointer<S>>>,
    pub(crate) store: Option<Arc<dyn Store>>,
    pub(crate) middleware: Option<Arc<dyn NodeMiddleware<S>>>,
    pub(crate) state_updater: BoxedStateUpdater<S>,
    pub(crate) retry_policy: RetryPolicy,
    #[allow(dead_code)]
    pub(crate) interrupt_handler: Option<Arc<dyn InterruptHandler>>,
}

impl<S> CompiledStateGraph<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// Runs the graph to completion and returns the final state.
    ///
    /// When `config` carries a `thread_id` and the graph was compiled with a
    /// checkpointer, the state is persisted after every node.
    pub async fn invoke(&self, state: S, config: Option<RunnableConfig>) -> Result<S, AgentError> {
        let config = config.unwrap_or_default();
        let ctx = RunContext::without_streaming(config.clone(), self.store.clone());
        self.run_loop(state, config, ctx, None).await
    }

    /// Runs the graph, emitting `StreamEvent`s for the enabled `modes` on a
    /// channel drained by the returned stream. The graph itself runs on a
    /// spawned task so the caller can consume events as they happen.
    pub fn stream(
        &self,
        initial_state: S,
        run_config: Option<RunnableConfig>,
        modes: HashSet<StreamMode>,
    ) -> Pin<Box<dyn Stream<Item = StreamEvent<S>> + Send>>
    where
        S: Send,
    {
        let config = run_config.unwrap_or_default();
        let (tx, rx) = mpsc::channel(64);
        let ctx = RunContext::with_streaming(config.clone(), self.store.clone(), tx.clone(), modes);

        let graph = self.clone_handles();
        tokio::spawn(async move {
            let result = graph.run_loop(initial_state, config, ctx.clone(), Some(&tx)).await;
            if let Err(err) = result {
                tracing::error!(error = %err, "graph run failed");
            }
        });

        Box::pin(ReceiverStream::new(rx))
    }

    /// Shallow clone of the `Arc`-backed fields needed to run the graph from a
    /// spawned task without borrowing `self`.
    fn clone_handles(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            first_node_id: self.first_node_id.clone(),
            edge_order: self.edge_order.clone(),
            next_map: self.next_map.clone(),
            checkpointer: self.checkpointer.clone(),
            store: self.store.clone(),
            middleware: self.middleware.clone(),
            state_updater: self.state_updater.clone(),
            retry_policy: self.retry_policy.clone(),
            interrupt_handler: self.interrupt_handler.clone(),
        }
    }

    async fn run_loop(
        &self,
        mut state: S,
        config: RunnableConfig,
        ctx: RunContext<S>,
        events: Option<&mpsc::Sender<StreamEvent<S>>>,
    ) -> Result<S, AgentError> {
        let recursion_limit = config.recursion_limit.unwrap_or(DEFAULT_RECURSION_LIMIT);
        let mut current = self.first_node_id.clone();
        let mut step: u32 = 0;

        loop {
            if step >= recursion_limit {
                return Err(AgentError::ExecutionFailed(format!(
                    "recursion limit ({recursion_limit}) exceeded at node '{current}'"
                )));
            }
            let node = self
                .nodes
                .get(&current)
                .unwrap_or_else(|| panic!("compiled graph references unknown node '{current}'"));

            if let Some(tx) = events {
                let _ = tx
                    .send(StreamEvent::TaskStart {
                        node_id: current.clone(),
                    })
                    .await;
            }

            let run_result = self.run_node(node.as_ref(), state.clone(), &ctx).await;
            if let Some(tx) = events {
                let task_result = match &run_result {
                    Ok(_) => Ok(()),
                    Err(e) => Err(e.to_string()),
                };
                let _ = tx
                    .send(StreamEvent::TaskEnd {
                        node_id: current.clone(),
                        result: task_result,
                    })
                    .await;
            }
            let (update, next) = run_result?;
            self.state_updater.apply_update(&mut state, &update);
            step += 1;

            if let Some(tx) = events {
                let _ = tx.send(StreamEvent::Updates {
                    node_id: current.clone(),
                    state: state.clone(),
                }).await;
                let _ = tx.send(StreamEvent::Values(state.clone())).await;
            }

            let checkpoint_id = self.checkpoint_if_configured(&config, &state, step).await?;
            if let (Some(tx), Some(checkpoint_id)) = (events, checkpoint_id) {
                let _ = tx
                    .send(StreamEvent::Checkpoint(CheckpointEvent {
                        checkpoint_id,
                        timestamp: chrono::Utc::now().to_rfc3339(),
                        step: step as i64,
                        state: state.clone(),
                        thread_id: config.thread_id.clone(),
                        checkpoint_ns: Some(config.checkpoint_ns.clone()),
                    }))
                    .await;
            }

            let next_id = match next {
                Next::End => break,
                Next::Node(id) => id,
                Next::Continue => match self.next_map.get(&current) {
                    Some(NextEntry::Unconditional(to)) => to.clone(),
                    Some(NextEntry::Conditional(router)) => router.resolve(&state),
                    None => crate::graph::state_graph::END.to_string(),
                },
            };
            if next_id == crate::graph::state_graph::END {
                break;
            }
            current = next_id;
        }

        Ok(state)
    }

    async fn run_node(
        &self,
        node: &dyn Node<S>,
        state: S,
        ctx: &RunContext<S>,
    ) -> Result<(S, Next), AgentError> {
        let attempts = self.retry_policy.max_attempts();
        let mut last_err = None;
        for attempt in 0..attempts {
            if attempt > 0 {
                tokio::time::sleep(self.retry_policy.delay_for_attempt(attempt - 1)).await;
            }
            let result = match &self.middleware {
                Some(mw) => {
                    let node_ctx = ctx.clone();
                    let node_arc: Arc<dyn Node<S>> = self
                        .nodes
                        .get(node.id())
                        .cloned()
                        .expect("node looked up by its own id");
                    let inner: Box<
                        dyn FnOnce(
                                S,
                            ) -> Pin<
                                Box<dyn std::future::Future<Output = Result<(S, Next), AgentError>> + Send>,
                            > + Send,
                    > = Box::new(move |s: S| {
                        Box::pin(async move { node_arc.run_with_context(s, &node_ctx).await })
                    });
                    mw.around_run(node.id(), state.clone(), inner).await
                }
                None => node.run_with_context(state.clone(), ctx).await,
            };
            match result {
                Ok(ok) => return Ok(ok),
                Err(err) => last_err = Some(err),
            }
        }
        Err(last_err.expect("at least one attempt always runs"))
    }

    /// Persists a checkpoint when the graph has a checkpointer and the run has a
    /// thread id. Returns the new checkpoint id, if one was written.
    async fn checkpoint_if_configured(
        &self,
        config: &RunnableConfig,
        state: &S,
        step: u32,
    ) -> Result<Option<String>, AgentError> {
        let (Some(checkpointer), Some(_)) = (&self.checkpointer, &config.thread_id) else {
            return Ok(None);
        };
        let checkpoint = Checkpoint {
            v: crate::memory::CHECKPOINT_VERSION,
            id: uuid::Uuid::new_v4().to_string(),
            ts: chrono::Utc::now().to_rfc3339(),
            channel_values: state.clone(),
            channel_versions: HashMap::new(),
            versions_seen: HashMap::new(),
            updated_channels: None,
            pending_sends: Vec::new(),
            metadata: CheckpointMetadata {
                source: CheckpointSource::Loop,
                step: step as i64,
                created_at: Some(SystemTime::now()),
                parents: HashMap::new(),
            },
        };
        let checkpoint_id = checkpointer
            .put(config, &checkpoint)
            .await
            .map_err(|e| AgentError::ExecutionFailed(format!("checkpoint failed: {e}")))?;
        Ok(Some(checkpoint_id))
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use std::sync::Arc;

    use super::*;
    use crate::graph::state_graph::{StateGraph, END, START};

    #[derive(Clone, Debug, PartialEq)]
    struct Counter(i32);

    struct Increment;

    #[async_trait]
    impl Node<Counter> for Increment {
        fn id(&self) -> &str {
            "increment"
        }
        async fn run(&self, state: Counter) -> Result<(Counter, Next), AgentError> {
            Ok((Counter(state.0 + 1), Next::End))
        }
    }

    /// **Scenario**: a single-node graph runs once and returns the updated state.
    #[tokio::test]
    async fn invoke_runs_single_node_to_end() {
        let mut graph = StateGraph::<Counter>::new();
        graph
            .add_node("increment", Arc::new(Increment))
            .add_edge(START, "increment")
            .add_edge("increment", END);
        let compiled = graph.compile().unwrap();
        let result = compiled.invoke(Counter(0), None).await.unwrap();
        assert_eq!(result, Counter(1));
    }

    struct LoopThrice;

    #[async_trait]
    impl Node<Counter> for LoopThrice {
        fn id(&self) -> &str {
            "loop"
        }
        async fn run(&self, state: Counter) -> Result<(Counter, Next), AgentError> {
            let next = if state.0 >= 2 { Next::End } else { Next::Continue };
            Ok((Counter(state.0 + 1), next))
        }
    }

    /// **Scenario**: `Next::Continue` follows the configured edge, here a self-loop,
    /// until the node itself returns `Next::End`.
    #[tokio::test]
    async fn invoke_follows_self_loop_until_end() {
        let mut graph = StateGraph::<Counter>::new();
        graph
            .add_node("loop", Arc::new(LoopThrice))
            .add_edge(START, "loop")
            .add_edge("loop", "loop");
        let compiled = graph.compile().unwrap();
        let result = compiled.invoke(Counter(0), None).await.unwrap();
        assert_eq!(result, Counter(3));
    }

    /// **Scenario**: exceeding the recursion limit surfaces as an execution error
    /// instead of looping forever.
    #[tokio::test]
    async fn invoke_respects_recursion_limit() {
        let mut graph = StateGraph::<Counter>::new();
        graph
            .add_node("loop", Arc::new(LoopThrice))
            .add_edge(START, "loop")
            .add_edge("loop", "loop");
        let compiled = graph.compile().unwrap();
        let config = RunnableConfig {
            recursion_limit: Some(1),
            ..Default::default()
        };
        let result = compiled.invoke(Counter(0), Some(config)).await;
        assert!(matches!(result, Err(AgentError::ExecutionFailed(_))));
    }

    /// **Scenario**: `stream` emits a `Values` event per step and ends with the
    /// same final state `invoke` would produce.
    #[tokio::test]
    async fn stream_emits_values_events() {
        use tokio_stream::StreamExt;

        let mut graph = StateGraph::<Counter>::new();
        graph
            .add_node("increment", Arc::new(Increment))
            .add_edge(START, "increment")
            .add_edge("increment", END);
        let compiled = graph.compile().unwrap();
        let modes: HashSet<StreamMode> = [StreamMode::Values].into_iter().collect();
        let mut stream = compiled.stream(Counter(0), None, modes);
        let mut last = None;
        while let Some(event) = stream.next().await {
            if let StreamEvent::Values(s) = event {
                last = Some(s);
            }
        }
        assert_eq!(last, Some(Counter(1)));
    }
}
