//! Conversation messages threaded through `ReActState` and passed to
//! `LlmClient::invoke`.

use serde::{Deserialize, Serialize};

/// One turn in a conversation.
///
/// Tool results are folded back into a `User` message by `ObserveNode` rather
/// than carrying a dedicated `Tool` variant, since neither `MockLlm` nor
/// `ChatOpenAI` need to distinguish it on the read side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    System(String),
    User(String),
    Assistant(String),
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self::System(content.into())
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::User(content.into())
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant(content.into())
    }

    /// Returns the text content regardless of role.
    pub fn content(&self) -> &str {
        match self {
            Self::System(s) | Self::User(s) | Self::Assistant(s) => s,
        }
    }

    /// Role name as used by chat-completion APIs ("system", "user", "assistant").
    pub fn role(&self) -> &'static str {
        match self {
            Self::System(_) => "system",
            Self::User(_) => "user",
            Self::Assistant(_) => "assistant",
        }
    }
}
