//! `OrchestratorError`: the taxonomy every orchestration-layer boundary returns.
//!
//! Mirrors `maestro_core::AgentError`'s shape (one flat `thiserror` enum, no
//! nested error trees) so the HTTP layer can match on it the same way it
//! already matches on engine errors.

use maestro_core::AgentError;

/// Error taxonomy for the orchestration core. `maestro-server` maps each
/// variant to an HTTP status via `status_code`/`error_code`; this crate has
/// no axum dependency and never constructs a response itself.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("config error: {0}")]
    Config(String),

    #[error("unknown expert '{0}'")]
    UnknownExpert(String),

    #[error("expert '{0}' is disabled")]
    DisabledExpert(String),

    #[error("expert '{expert_id}' exceeded its turn budget ({max_steps} steps)")]
    MaxTurnsExceeded { expert_id: String, max_steps: u32 },

    #[error("tool server error: {0}")]
    ToolServer(String),

    #[error("cancelled")]
    Cancelled,

    #[error("orchestration failed: {0}")]
    Orchestration(String),

    #[error("request validation failed: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Agent(#[from] AgentError),
}

impl OrchestratorError {
    /// Stable tag used in HTTP error bodies (`error_code` field) and logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "config_error",
            Self::UnknownExpert(_) => "unknown_expert",
            Self::DisabledExpert(_) => "disabled_expert",
            Self::MaxTurnsExceeded { .. } => "max_turns_exceeded",
            Self::ToolServer(_) => "tool_server_error",
            Self::Cancelled => "cancelled",
            Self::Orchestration(_) => "orchestrator_error",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Agent(_) => "agent_error",
        }
    }

    /// HTTP status code this error maps to (`maestro-server` is the only
    /// caller; kept here so the taxonomy and its HTTP mapping stay in sync).
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Config(_) => 400,
            Self::UnknownExpert(_) | Self::DisabledExpert(_) => 404,
            Self::MaxTurnsExceeded { .. } | Self::InvalidRequest(_) => 422,
            Self::ToolServer(_) | Self::Orchestration(_) | Self::Agent(_) => 500,
            Self::Cancelled => 499,
        }
    }
}
