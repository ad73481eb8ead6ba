//! `ToolSource`: the interface ReAct's ActNode uses to list and call tools,
//! whether they live behind an MCP server process or in-process.
//!
//! Concrete sources: [`mcp::McpToolSource`] connects to a real MCP server via
//! stdio or Streamable HTTP. [`MockToolSource`] is a canned source for demos
//! and tests that don't need a live server.

pub mod context;
pub mod mcp;

pub use context::ToolCallContext;
pub use mcp::{McpHttpSession, McpSession, McpSessionError, McpToolSource};

use async_trait::async_trait;
use serde_json::Value;

/// Specification of a single callable tool: name, description, and JSON Schema
/// for its arguments. Mirrors the shape of an MCP `tools/list` entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Value,
}

/// Text result of a tool call. MCP tool results may carry multiple content
/// blocks (text, image, ...); callers in this crate only care about text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToolCallContent {
    pub text: String,
}

/// Errors from listing or calling tools.
#[derive(Debug, thiserror::Error)]
pub enum ToolSourceError {
    /// Requested tool name is not known to this source.
    #[error("tool not found: {0}")]
    NotFound(String),
    /// Transport-level failure: process spawn, stdio, HTTP, timeout.
    #[error("transport error: {0}")]
    Transport(String),
    /// The remote side returned a JSON-RPC error object.
    #[error("json-rpc error: {0}")]
    JsonRpc(String),
    /// Arguments failed validation before or during the call.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
}

/// Uniform tool access for ReAct's ActNode: list specs, call by name.
///
/// Implementors: [`mcp::McpToolSource`] (one MCP server), [`AggregateToolSource`]
/// (fan-out over several named sources), [`MockToolSource`] (canned responses).
#[async_trait]
pub trait ToolSource: Send + Sync {
    /// Lists all tools currently available from this source.
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolSourceError>;

    /// Calls the named tool with the given JSON arguments.
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolCallContent, ToolSourceError>;

    /// Injects per-step context (recent messages, thread/user ids) before a
    /// batch of tool calls. Default no-op; only sources that use context
    /// (e.g. short-term memory tools) need to override it.
    fn set_call_context(&self, _ctx: ToolCallContext) {}
}

/// Fan-out `ToolSource` over multiple named upstream sources (e.g. one per MCP
/// tool server). `list_tools` concatenates every source's tools; `call_tool`
/// routes by first match, since tool names are expected to be unique across
/// the aggregate.
pub struct AggregateToolSource {
    sources: tokio::sync::RwLock<Vec<std::sync::Arc<dyn ToolSource>>>,
}

impl Default for AggregateToolSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AggregateToolSource {
    pub fn new() -> Self {
        Self {
            sources: tokio::sync::RwLock::new(Vec::new()),
        }
    }

    /// Registers an upstream source. All of its tools become visible through
    /// this aggregate.
    pub async fn register(&self, source: std::sync::Arc<dyn ToolSource>) {
        self.sources.write().await.push(source);
    }
}

#[async_trait]
impl ToolSource for AggregateToolSource {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolSourceError> {
        let sources = self.sources.read().await;
        let mut out = Vec::new();
        for source in sources.iter() {
            out.extend(source.list_tools().await?);
        }
        Ok(out)
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolCallContent, ToolSourceError> {
        let sources = self.sources.read().await;
        for source in sources.iter() {
            match source.list_tools().await {
                Ok(specs) if specs.iter().any(|s| s.name == name) => {
                    return source.call_tool(name, arguments).await;
                }
                _ => continue,
            }
        }
        Err(ToolSourceError::NotFound(name.to_string()))
    }
}

/// Canned `ToolSource` for demos and tests: no process, no network.
///
/// [`MockToolSource::get_time_example`] exposes a single `get_time` tool that
/// always returns a fixed string, matching the "what time is it?" quick-start
/// example used by [`crate::run_agent`].
pub struct MockToolSource {
    specs: Vec<ToolSpec>,
    response: String,
}

impl MockToolSource {
    /// A single `get_time` tool with no arguments, returning a fixed answer.
    pub fn get_time_example() -> Self {
        Self {
            specs: vec![ToolSpec {
                name: "get_time".to_string(),
                description: Some("Returns the current time.".to_string()),
                input_schema: serde_json::json!({"type": "object", "properties": {}}),
            }],
            response: "The current time is 12:00 UTC.".to_string(),
        }
    }
}

#[async_trait]
impl ToolSource for MockToolSource {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolSourceError> {
        Ok(self.specs.clone())
    }

    async fn call_tool(&self, name: &str, _arguments: Value) -> Result<ToolCallContent, ToolSourceError> {
        if self.specs.iter().any(|s| s.name == name) {
            Ok(ToolCallContent {
                text: self.response.clone(),
            })
        } else {
            Err(ToolSourceError::NotFound(name.to_string()))
        }
    }
}
