//! Observe node: fold tool_results into messages, clear tool_calls/tool_results,
//! and route back to think (loop) or end.

use async_trait::async_trait;

use crate::error::AgentError;
use crate::graph::Next;
use crate::message::Message;
use crate::state::ReActState;
use crate::Node;

/// Maximum number of ReAct loop rounds (observe passes) before forcing End.
pub const MAX_REACT_TURNS: i32 = 10;

pub struct ObserveNode {
    enable_loop: bool,
}

impl ObserveNode {
    pub fn new() -> Self {
        Self { enable_loop: false }
    }

    /// Loops back to `think` while tool_calls were present, up to
    /// [`MAX_REACT_TURNS`] rounds; otherwise ends after one pass.
    pub fn with_loop() -> Self {
        Self { enable_loop: true }
    }
}

impl Default for ObserveNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node<ReActState> for ObserveNode {
    fn id(&self) -> &str {
        "observe"
    }

    async fn run(&self, state: ReActState) -> Result<(ReActState, Next), AgentError> {
        let had_tool_calls = !state.tool_calls.is_empty();
        let mut messages = state.messages;
        for tr in &state.tool_results {
            messages.push(Message::User(format!(
                "Tool {} returned: {}",
                tr.name, tr.output
            )));
        }
        let next_turn = state.turn_count.saturating_add(1);
        let new_state = ReActState {
            messages,
            tool_calls: vec![],
            tool_results: vec![],
            turn_count: next_turn,
            ..state
        };
        let next = if self.enable_loop && (next_turn >= MAX_REACT_TURNS || !had_tool_calls) {
            Next::End
        } else if self.enable_loop {
            Next::Continue
        } else {
            Next::Continue
        };
        Ok((new_state, next))
    }
}
