//! Act node: read tool_calls, call the tool source for each, write tool_results.
//!
//! # Error Handling
//!
//! By default tool errors propagate and short-circuit the graph. Use
//! [`ActNode::with_handle_tool_errors`] to absorb them into a tool result
//! message instead:
//!
//! - [`HandleToolErrors::Never`] — errors propagate (default)
//! - [`HandleToolErrors::Always`] — errors become an error tool result
//! - [`HandleToolErrors::Custom`] — a caller-supplied handler formats the message
//!
//! # Approval
//!
//! When constructed `with_approval_policy(Some(policy))`, tool names the
//! policy flags require `ReActState::approval_result` to be set before the
//! call executes. Absent that, the node returns `AgentError::Interrupted` so
//! the caller can surface an approval prompt and resume with the result set.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::error::AgentError;
use crate::graph::{Next, Node, RunContext};
use crate::state::{ApprovalResult, ReActState, ToolCall, ToolResult};
use crate::stream::{StreamEvent, StreamMode};
use crate::tool_source::{ToolCallContext, ToolSource, ToolSourceError};

/// Event type for `Custom` stream events emitted after each tool call.
pub const STEP_PROGRESS_EVENT_TYPE: &str = "step_progress";

fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max_len).collect::<String>())
    }
}

fn parse_tool_arguments(arguments: &str) -> Value {
    if arguments.trim().is_empty() {
        return serde_json::json!({});
    }
    match serde_json::from_str(arguments) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, arguments = %arguments, "tool arguments JSON parse failed, using empty object");
            serde_json::json!({})
        }
    }
}

fn step_progress_payload(tool_name: &str, call_id: &str, summary: &str) -> Value {
    serde_json::json!({
        "type": STEP_PROGRESS_EVENT_TYPE,
        "node_id": "act",
        "tool_name": tool_name,
        "call_id": call_id,
        "summary": summary,
    })
}

/// Default error message template used by `HandleToolErrors::Always` when no
/// custom message is given.
pub const DEFAULT_EXECUTION_ERROR_TEMPLATE: &str =
    "Error executing tool '{tool_name}' with arguments {tool_kwargs}: {error}\nPlease fix the error and try again.";

/// Default template, unused unless a caller formats it directly; kept for
/// parity with [`DEFAULT_EXECUTION_ERROR_TEMPLATE`]'s naming.
pub const DEFAULT_TOOL_ERROR_TEMPLATE: &str = "Error: {error}\nPlease fix your mistakes.";

pub type ErrorHandlerFn = Arc<dyn Fn(&ToolSourceError, &str, &Value) -> String + Send + Sync>;

/// How `ActNode` turns a tool-call failure into (or out of) a `ReActState`.
#[derive(Clone)]
pub enum HandleToolErrors {
    /// Errors propagate as `AgentError::Tool`, ending the run.
    Never,
    /// Errors are caught and turned into an error tool result using the
    /// given message, or [`DEFAULT_EXECUTION_ERROR_TEMPLATE`] when `None`.
    Always(Option<String>),
    /// A caller-supplied handler formats the tool result message.
    Custom(ErrorHandlerFn),
}

impl Default for HandleToolErrors {
    fn default() -> Self {
        Self::Never
    }
}

impl std::fmt::Debug for HandleToolErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Never => write!(f, "HandleToolErrors::Never"),
            Self::Always(msg) => write!(f, "HandleToolErrors::Always({:?})", msg),
            Self::Custom(_) => write!(f, "HandleToolErrors::Custom(<fn>)"),
        }
    }
}

/// Which tool calls require human approval before they execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalPolicy {
    /// No tool requires approval (equivalent to passing `None` to
    /// `with_approval_policy`, spelled out for explicit configs).
    None,
    /// Every tool call requires approval.
    All,
    /// Only tool calls to names in this list require approval. Carries an
    /// owned list so it can come from runtime config.
    Named(Arc<Vec<String>>),
}

impl ApprovalPolicy {
    fn requires(&self, tool_name: &str) -> bool {
        match self {
            Self::None => false,
            Self::All => true,
            Self::Named(names) => names.iter().any(|n| n == tool_name),
        }
    }
}

fn approval_required_payload(tc: &ToolCall, args: &Value) -> Value {
    serde_json::json!({
        "type": "approval_required",
        "node_id": "act",
        "tool_name": tc.name,
        "call_id": tc.id,
        "arguments": args,
    })
}

/// Act node: one ReAct step that executes `tool_calls` and produces `tool_results`.
pub struct ActNode {
    tools: Box<dyn ToolSource>,
    handle_tool_errors: HandleToolErrors,
    approval_policy: Option<ApprovalPolicy>,
}

impl ActNode {
    pub fn new(tools: Box<dyn ToolSource>) -> Self {
        Self {
            tools,
            handle_tool_errors: HandleToolErrors::Never,
            approval_policy: None,
        }
    }

    pub fn with_approval_policy(mut self, policy: Option<ApprovalPolicy>) -> Self {
        self.approval_policy = policy;
        self
    }

    pub fn with_handle_tool_errors(mut self, handle_tool_errors: HandleToolErrors) -> Self {
        self.handle_tool_errors = handle_tool_errors;
        self
    }

    fn needs_approval(&self, tool_name: &str) -> bool {
        self.approval_policy
            .as_ref()
            .is_some_and(|p| p.requires(tool_name))
    }

    fn handle_error(&self, error: &ToolSourceError, tool_name: &str, tool_args: &Value) -> Option<String> {
        match &self.handle_tool_errors {
            HandleToolErrors::Never => None,
            HandleToolErrors::Always(custom_msg) => Some(custom_msg.clone().unwrap_or_else(|| {
                DEFAULT_EXECUTION_ERROR_TEMPLATE
                    .replace("{tool_name}", tool_name)
                    .replace("{tool_kwargs}", &tool_args.to_string())
                    .replace("{error}", &error.to_string())
            })),
            HandleToolErrors::Custom(handler) => Some(handler(error, tool_name, tool_args)),
        }
    }

    async fn run_calls(
        &self,
        state: ReActState,
        emit_progress: Option<&tokio::sync::mpsc::Sender<StreamEvent<ReActState>>>,
    ) -> Result<(ReActState, Next), AgentError> {
        let ctx = ToolCallContext::new(state.messages.clone());
        self.tools.set_call_context(ctx);

        let mut tool_results = Vec::with_capacity(state.tool_calls.len());
        let mut approval_consumed = false;

        for tc in &state.tool_calls {
            let args = parse_tool_arguments(&tc.arguments);

            if self.needs_approval(&tc.name) {
                match &state.approval_result {
                    None => {
                        let payload = approval_required_payload(tc, &args);
                        if let Some(tx) = emit_progress {
                            let _ = tx.send(StreamEvent::Custom(payload.clone())).await;
                        }
                        return Err(AgentError::Interrupted(payload.to_string()));
                    }
                    Some(ApprovalResult::Denied { reason }) => {
                        tool_results.push(ToolResult {
                            call_id: tc.id.clone(),
                            name: tc.name.clone(),
                            output: format!("User denied: {reason}"),
                            is_error: true,
                        });
                        approval_consumed = true;
                        continue;
                    }
                    Some(ApprovalResult::Approved) => {
                        approval_consumed = true;
                    }
                }
            }

            debug!(tool = %tc.name, args = ?args, "calling tool");
            let result = self.tools.call_tool(&tc.name, args.clone()).await;

            match result {
                Ok(content) => {
                    let summary = truncate_for_log(&content.text, 200);
                    trace!(tool = %tc.name, result_preview = %summary, "tool returned");
                    tool_results.push(ToolResult {
                        call_id: tc.id.clone(),
                        name: tc.name.clone(),
                        output: content.text,
                        is_error: false,
                    });
                    if let Some(tx) = emit_progress {
                        let call_id = tc.id.as_deref().unwrap_or("");
                        let payload = step_progress_payload(&tc.name, call_id, &summary);
                        let _ = tx.send(StreamEvent::Custom(payload)).await;
                    }
                }
                Err(e) => {
                    warn!(tool = %tc.name, error = %e, "tool call failed");
                    if let Some(error_msg) = self.handle_error(&e, &tc.name, &args) {
                        let summary = truncate_for_log(&error_msg, 200);
                        tool_results.push(ToolResult {
                            call_id: tc.id.clone(),
                            name: tc.name.clone(),
                            output: error_msg,
                            is_error: true,
                        });
                        if let Some(tx) = emit_progress {
                            let call_id = tc.id.as_deref().unwrap_or("");
                            let payload = step_progress_payload(&tc.name, call_id, &summary);
                            let _ = tx.send(StreamEvent::Custom(payload)).await;
                        }
                    } else {
                        return Err(AgentError::Tool(e));
                    }
                }
            }
        }

        let new_state = ReActState {
            tool_results,
            approval_result: if approval_consumed {
                None
            } else {
                state.approval_result
            },
            ..state
        };
        Ok((new_state, Next::Continue))
    }
}

#[async_trait]
impl Node<ReActState> for ActNode {
    fn id(&self) -> &str {
        "act"
    }

    async fn run(&self, state: ReActState) -> Result<(ReActState, Next), AgentError> {
        self.run_calls(state, None).await
    }

    async fn run_with_context(
        &self,
        state: ReActState,
        run_ctx: &RunContext<ReActState>,
    ) -> Result<(ReActState, Next), AgentError> {
        let emit = if run_ctx.stream_mode.contains(&StreamMode::Custom) {
            run_ctx.stream_tx.as_ref()
        } else {
            None
        };
        self.run_calls(state, emit).await
    }
}
