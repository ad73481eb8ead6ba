//! `ReActState`: the graph state threaded through Think → Act → Observe.

use crate::llm::LlmUsage;
use crate::message::Message;

/// One tool invocation requested by the LLM in a Think step.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToolCall {
    /// Call id from the LLM response, when the provider assigns one (used to
    /// correlate streamed tool_call_chunk events and to pair results back up).
    pub id: Option<String>,
    pub name: String,
    /// Raw JSON-encoded arguments, as produced by the LLM.
    pub arguments: String,
}

/// Result of executing one [`ToolCall`], written by `ActNode` and folded into
/// `messages` by `ObserveNode`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    pub call_id: Option<String>,
    pub name: String,
    pub output: String,
    pub is_error: bool,
}

/// Outcome of an approval check before a tool call executes (see
/// `crate::agent::react::act_node::ApprovalPolicy`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalResult {
    Approved,
    Denied { reason: String },
}

/// State for the minimal ReAct chain: think (LLM) → act (tools) → observe
/// (merge results, loop or end).
#[derive(Debug, Clone, Default)]
pub struct ReActState {
    pub messages: Vec<Message>,
    /// Tool calls requested by the last Think step; cleared by Observe.
    pub tool_calls: Vec<ToolCall>,
    /// Results of executing `tool_calls`; cleared by Observe once folded into
    /// `messages`.
    pub tool_results: Vec<ToolResult>,
    /// Number of think→act→observe rounds completed so far.
    pub turn_count: i32,
    /// Result of the most recent approval check, if `ActNode` is configured
    /// with an `ApprovalPolicy` that can deny calls.
    pub approval_result: Option<ApprovalResult>,
    /// Token usage from the most recent Think call.
    pub usage: Option<LlmUsage>,
    /// Cumulative token usage across all Think calls this run.
    pub total_usage: Option<LlmUsage>,
    /// Length of `messages` right after the last Think step; lets Act/Observe
    /// tell which messages in the list are new this round.
    pub message_count_after_last_think: Option<usize>,
}

impl ReActState {
    /// The most recent assistant reply, if any — the conventional "final
    /// answer" once the graph reaches `END`.
    pub fn last_assistant_reply(&self) -> Option<&str> {
        self.messages.iter().rev().find_map(|m| match m {
            Message::Assistant(content) => Some(content.as_str()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_assistant_reply_finds_the_most_recent_assistant_message() {
        let state = ReActState {
            messages: vec![
                Message::user("hi"),
                Message::assistant("first"),
                Message::user("more"),
                Message::assistant("second"),
            ],
            ..Default::default()
        };
        assert_eq!(state.last_assistant_reply(), Some("second"));
    }

    #[test]
    fn last_assistant_reply_is_none_with_no_assistant_messages() {
        let state = ReActState {
            messages: vec![Message::user("hi")],
            ..Default::default()
        };
        assert_eq!(state.last_assistant_reply(), None);
    }
}
