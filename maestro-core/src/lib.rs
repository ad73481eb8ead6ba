//! # Maestro Core
//!
//! A minimal, graph-based agent engine. Build stateful agents and graphs
//! with a simple **state-in, state-out** design: one shared state type flows
//! through nodes, with no separate Input/Output types.
//!
//! ## Design principles
//!
//! - **Single state type**: Each graph uses one state struct (e.g. [`ReActState`]) that all
//!   nodes read from and write to.
//! - **One step per run**: Each node implements a single step—receive state, return updated state.
//! - **State graphs**: Compose nodes into [`StateGraph`] with conditional edges for complex workflows.
//! - **Minimal core API with optional streaming**: [`CompiledStateGraph::invoke`] stays state-in/state-out;
//!   use [`CompiledStateGraph::stream`] for incremental output when you need it.
//!
//! ## Features
//!
//! - **State Graphs**: Build and run stateful agent graphs with conditional routing.
//! - **ReAct Pattern**: Built-in reasoning + acting loop (Think → Act → Observe) via [`ReactRunner`].
//! - **LLM Integration**: Flexible [`LlmClient`] trait with [`MockLlm`] and OpenAI-compatible [`ChatOpenAI`].
//! - **Memory & Checkpointing**: In-memory and SQLite-backed storage for agent state ([`Checkpointer`], [`Store`]).
//! - **Tool Integration**: Extensible tool system with MCP support ([`ToolSource`], [`McpToolSource`]).
//! - **Middleware**: Wrap node execution with custom async logic ([`NodeMiddleware`]).
//! - **Streaming**: Stream per-step states or node updates via [`CompiledStateGraph::stream`] with [`StreamMode`].
//! - **Channels**: State update strategies ([`EphemeralValue`], [`NamedBarrierValue`]); custom merge
//!   via [`StateUpdater`] and [`FieldBasedUpdater`].
//! - **Cache, Retry**: In-memory caching ([`InMemoryCache`]), retry policies ([`RetryPolicy`]).
//! - **Graph Visualization**: [`generate_dot`], [`generate_text`].
//!
//! ## Main modules
//!
//! - [`graph`]: [`StateGraph`], [`CompiledStateGraph`], [`Node`], [`Next`], [`RunContext`] — build and run state graphs.
//! - [`agent`]: [`agent::react`] — ReAct nodes ([`ThinkNode`], [`ActNode`], [`ObserveNode`]), [`tools_condition`], [`ReactRunner`].
//! - [`state`]: [`ReActState`], [`ToolCall`], [`ToolResult`] — state and tool types for ReAct.
//! - [`llm`]: [`LlmClient`] trait, [`MockLlm`], [`ChatOpenAI`].
//! - [`memory`]: Checkpointing ([`Checkpointer`], [`MemorySaver`], [`SqliteSaver`]), [`Store`].
//! - [`tool_source`]: [`ToolSource`], [`ToolSpec`], [`AggregateToolSource`]; MCP ([`McpToolSource`]).
//! - [`traits`]: Core [`Agent`] trait — implement for custom agents.
//! - [`message`]: [`Message`] (System / User / Assistant).
//! - [`stream`]: [`StreamWriter`], [`StreamEvent`], [`StreamMode`] for graph runs.
//! - [`cache`]: [`Cache`], [`InMemoryCache`].
//! - [`channels`]: [`Channel`], [`EphemeralValue`], etc.; [`StateUpdater`], [`FieldBasedUpdater`].
//!
//! Key types are re-exported at crate root: `use maestro_core::{Agent, StateGraph, Message, ReActState};`.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use maestro_core::{Agent, AgentError, Message};
//!
//! #[derive(Clone, Debug, Default)]
//! struct MyState {
//!     messages: Vec<Message>,
//! }
//!
//! struct EchoAgent;
//!
//! #[async_trait]
//! impl Agent for EchoAgent {
//!     fn name(&self) -> &str {
//!         "echo"
//!     }
//!
//!     type State = MyState;
//!
//!     async fn run(&self, state: Self::State) -> Result<Self::State, AgentError> {
//!         let mut messages = state.messages;
//!         if let Some(Message::User(s)) = messages.last() {
//!             messages.push(Message::Assistant(s.clone()));
//!         }
//!         Ok(MyState { messages })
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() {
//! let mut state = MyState::default();
//! state.messages.push(Message::User("hello, world!".to_string()));
//!
//! let agent = EchoAgent;
//! match agent.run(state).await {
//!     Ok(s) => {
//!         if let Some(Message::Assistant(content)) = s.messages.last() {
//!             println!("{}", content);
//!         }
//!     }
//!     Err(e) => eprintln!("error: {}", e),
//! }
//! # }
//! ```
//!
//! This crate underpins the orchestration server's expert runner: experts are compiled
//! `ReactRunner`s, sessions are `Checkpointer` handles, and tool bindings are `ToolSource`s.

pub mod agent;
pub mod cache;
pub mod channels;
pub mod error;
pub mod graph;
pub mod llm;
pub mod memory;
pub mod message;
pub mod runner_common;
pub mod state;
pub mod stream;
pub mod tool_source;
pub mod traits;

pub use agent::react::{
    build_react_initial_state, run_agent, run_react_graph_stream, tools_condition, ActNode,
    AgentOptions, ApprovalPolicy, ErrorHandlerFn, HandleToolErrors, ObserveNode, ReactRunner,
    RunError as ReactRunError, ThinkNode, ToolsConditionResult, WithNodeLogging,
    DEFAULT_EXECUTION_ERROR_TEMPLATE, DEFAULT_TOOL_ERROR_TEMPLATE, REACT_SYSTEM_PROMPT,
    STEP_PROGRESS_EVENT_TYPE,
};
pub use cache::{Cache, CacheError, InMemoryCache};
pub use channels::{
    BoxedStateUpdater, Channel, ChannelError, EphemeralValue, FieldBasedUpdater,
    NamedBarrierUpdate, NamedBarrierValue, ReplaceUpdater, StateUpdater,
};
pub use error::AgentError;
pub use graph::{
    generate_dot, generate_text, log_graph_complete, log_graph_error, log_graph_start,
    log_node_complete, log_node_start, log_state_update, CompilationError, CompiledStateGraph,
    DefaultInterruptHandler, GraphInterrupt, Interrupt, InterruptHandler, LoggingNodeMiddleware,
    NameNode, Next, Node, NodeMiddleware, RetryPolicy, RunContext, Runtime, StateGraph, END, START,
};
pub use llm::{ChatOpenAI, LlmClient, LlmResponse, LlmUsage, MockLlm, ToolChoiceMode};
pub use memory::{
    Checkpoint, CheckpointError, CheckpointListItem, CheckpointMetadata, CheckpointSource,
    Checkpointer, InMemoryStore, JsonSerializer, MemorySaver, Namespace, RunnableConfig, SqliteSaver,
    Store, StoreError, StoreSearchHit,
};
pub use message::Message;
pub use state::{ReActState, ToolCall, ToolResult};
pub use stream::{
    CheckpointEvent, MessageChunk, StreamEvent, StreamMetadata, StreamMode, StreamWriter,
    ToolStreamWriter,
};
pub use tool_source::{
    AggregateToolSource, McpToolSource, MockToolSource, ToolCallContent, ToolCallContext,
    ToolSource, ToolSourceError, ToolSpec,
};
pub use traits::Agent;
