//! Mock LLM for tests and demos.
//!
//! Returns a fixed assistant message and optional fixed `ToolCall`; the
//! stateful constructor returns tool_calls on the first call and an empty
//! tool_calls list afterward, to exercise a multi-round ReAct loop.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::AgentError;
use crate::llm::{LlmClient, LlmResponse};
use crate::message::Message;
use crate::state::ToolCall;
use crate::stream::MessageChunk;

/// Mock LLM: fixed assistant text and optional tool_calls.
pub struct MockLlm {
    content: String,
    tool_calls: Vec<ToolCall>,
    /// When `Some`, the first `invoke()` returns `(content, tool_calls)`;
    /// later calls return `(second_content, [])`.
    call_count: Option<AtomicUsize>,
    second_content: Option<String>,
    stream_by_char: AtomicBool,
}

impl MockLlm {
    /// Returns one assistant message and one tool call (`get_time`).
    pub fn with_get_time_call() -> Self {
        Self {
            content: "I'll check the time.".to_string(),
            tool_calls: vec![ToolCall {
                name: "get_time".to_string(),
                arguments: "{}".to_string(),
                id: Some("call-1".to_string()),
            }],
            call_count: None,
            second_content: None,
            stream_by_char: AtomicBool::new(false),
        }
    }

    /// Returns assistant text and no tool_calls (END path).
    pub fn with_no_tool_calls(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: vec![],
            call_count: None,
            second_content: None,
            stream_by_char: AtomicBool::new(false),
        }
    }

    /// Custom content and tool_calls.
    pub fn new(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: content.into(),
            tool_calls,
            call_count: None,
            second_content: None,
            stream_by_char: AtomicBool::new(false),
        }
    }

    /// Stateful mock: first `invoke()` returns a `get_time` tool call, second
    /// returns no tool_calls, ending the loop.
    pub fn first_tools_then_end() -> Self {
        Self {
            content: "I'll check the time.".to_string(),
            tool_calls: vec![ToolCall {
                name: "get_time".to_string(),
                arguments: "{}".to_string(),
                id: Some("call-1".to_string()),
            }],
            call_count: Some(AtomicUsize::new(0)),
            second_content: Some("The time is as above.".to_string()),
            stream_by_char: AtomicBool::new(false),
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = tool_calls;
        self
    }

    /// Enables character-by-character streaming for `invoke_stream()`.
    pub fn with_stream_by_char(self) -> Self {
        self.stream_by_char.store(true, Ordering::SeqCst);
        self
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn invoke(&self, _messages: &[Message]) -> Result<LlmResponse, AgentError> {
        let (content, tool_calls) = match &self.call_count {
            Some(c) => {
                let n = c.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    (self.content.clone(), self.tool_calls.clone())
                } else {
                    (
                        self.second_content
                            .as_deref()
                            .unwrap_or(&self.content)
                            .to_string(),
                        vec![],
                    )
                }
            }
            None => (self.content.clone(), self.tool_calls.clone()),
        };
        Ok(LlmResponse {
            content,
            tool_calls,
            usage: None,
        })
    }

    async fn invoke_stream(
        &self,
        messages: &[Message],
        chunk_tx: Option<mpsc::Sender<MessageChunk>>,
    ) -> Result<LlmResponse, AgentError> {
        let response = self.invoke(messages).await?;
        if let Some(tx) = chunk_tx {
            if !response.content.is_empty() {
                if self.stream_by_char.load(Ordering::SeqCst) {
                    for c in response.content.chars() {
                        let _ = tx
                            .send(MessageChunk {
                                content: c.to_string(),
                            })
                            .await;
                    }
                } else {
                    let _ = tx
                        .send(MessageChunk {
                            content: response.content.clone(),
                        })
                        .await;
                }
            }
        }
        Ok(response)
    }
}
