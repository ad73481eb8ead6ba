//! Streaming pipeline: turns one buffered orchestration result into an
//! ordered `StreamChunk` sequence delivered over a push channel.
//!
//! MoE and SmartRouter do not stream mid-orchestration (expert outputs are
//! mixed/synthesized, so intermediate tokens would be misleading) — every
//! run emits exactly `metadata`, one `token` carrying the final answer, then
//! `done`, or `metadata` then `error` on failure. Nothing follows `done`/
//! `error`. Grounded on the engine's push-channel model (`StreamWriter`
//! forwarding into an `mpsc::Sender`) retargeted from WebSocket framing to
//! SSE framing by `maestro-server`.

use chrono::Utc;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::OrchestratorError;

/// One SSE-shaped chunk. `maestro-server` serializes each variant as one
/// `data: ` line (`#[serde(tag = "type")]` gives it a discriminated,
/// self-describing wire shape, matching `stream-event`'s `ProtocolEvent`
/// convention in the engine crate).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamChunk {
    Metadata {
        expert_id: Option<String>,
        display_name: Option<String>,
        orchestrator: String,
        session_enabled: bool,
        session_id: Option<String>,
        max_steps: u32,
        timestamp: String,
    },
    Token {
        content: String,
    },
    Step {
        name: String,
        detail: Option<String>,
    },
    Done {
        experts_used: Vec<String>,
        cache_hit: bool,
        guardrail_triggered: bool,
        latency_ms: u64,
    },
    Error {
        error_code: String,
        message: String,
    },
}

/// Parameters needed to build the leading `metadata` chunk, known before any
/// orchestration work starts.
pub struct StreamMetadataInit {
    pub expert_id: Option<String>,
    pub display_name: Option<String>,
    pub orchestrator: String,
    pub session_enabled: bool,
    pub session_id: Option<String>,
    pub max_steps: u32,
}

/// Outcome of a buffered orchestration run, bridged into the chunk sequence.
pub struct StreamableResult {
    pub response: String,
    pub experts_used: Vec<String>,
    pub cache_hit: bool,
    pub guardrail_triggered: bool,
    pub latency_ms: u64,
}

/// Runs `produce` to completion, pushing `metadata` immediately, then either
/// `token` + `done` on success or `error` on failure, honoring `cancel`
/// throughout. Returns a channel the caller (the SSE handler) drains.
pub fn stream_orchestration<F>(
    init: StreamMetadataInit,
    cancel: CancellationToken,
    produce: F,
) -> mpsc::Receiver<StreamChunk>
where
    F: std::future::Future<Output = Result<StreamableResult, OrchestratorError>> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(8);
    tokio::spawn(async move {
        let metadata = StreamChunk::Metadata {
            expert_id: init.expert_id,
            display_name: init.display_name,
            orchestrator: init.orchestrator,
            session_enabled: init.session_enabled,
            session_id: init.session_id,
            max_steps: init.max_steps,
            timestamp: Utc::now().to_rfc3339(),
        };
        if tx.send(metadata).await.is_err() {
            return;
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(OrchestratorError::Cancelled),
            result = produce => result,
        };

        match outcome {
            Ok(result) => {
                let _ = tx.send(StreamChunk::Token { content: result.response }).await;
                let _ = tx
                    .send(StreamChunk::Done {
                        experts_used: result.experts_used,
                        cache_hit: result.cache_hit,
                        guardrail_triggered: result.guardrail_triggered,
                        latency_ms: result.latency_ms,
                    })
                    .await;
            }
            Err(e) => {
                let _ = tx
                    .send(StreamChunk::Error {
                        error_code: e.error_code().to_string(),
                        message: e.to_string(),
                    })
                    .await;
            }
        }
    });
    rx
}
