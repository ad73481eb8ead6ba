//! HTTP handlers: buffered chat, streamed chat, and mock simulate.
//!
//! `{id}` in the path is dispatched to the MoE orchestrator, the SmartRouter
//! orchestrator, or a concrete expert's single-expert path — the three
//! orchestrators share this one surface.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use maestro_orchestrator::stream::{stream_orchestration, StreamMetadataInit, StreamableResult};
use maestro_orchestrator::trace::{OrchestrationTrace, PhaseSnapshot, TraceSnapshot};
use maestro_orchestrator::{Orchestrator, OrchestratorError};

use crate::error::ApiError;
use crate::session::generate_session_id;

const MAX_QUERY_CHARS: usize = 8_000;
const DEFAULT_MAX_STEPS: u32 = 25;
const MIN_MAX_STEPS: u32 = 1;
const MAX_MAX_STEPS: u32 = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ChatRequest {
    pub input: String,
    #[serde(default)]
    pub context: Option<serde_json::Value>,
    #[serde(default)]
    pub max_steps: Option<u32>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct HallucinationGuardrailMetadata {
    pub triggered: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct GuardrailsMetadata {
    pub hallucination: HallucinationGuardrailMetadata,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ChatMetadata {
    pub mode: &'static str,
    pub orchestrator: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expert_id: Option<String>,
    pub session_id: String,
    pub experts_used: Vec<String>,
    pub trace: TraceSnapshot,
    pub guardrails: GuardrailsMetadata,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub trace: Vec<PhaseSnapshot>,
    pub metadata: ChatMetadata,
}

fn validate_input(input: &str) -> Result<(), ApiError> {
    if input.trim().is_empty() {
        return Err(ApiError(OrchestratorError::InvalidRequest(
            "input must not be empty".to_string(),
        )));
    }
    if input.chars().count() > MAX_QUERY_CHARS {
        return Err(ApiError(OrchestratorError::InvalidRequest(format!(
            "input exceeds the {MAX_QUERY_CHARS}-character bound"
        ))));
    }
    Ok(())
}

fn is_orchestrator_route(id: &str) -> bool {
    matches!(id, "moe" | "smartrouter")
}

/// Resolves `max-steps`, defaulting when absent and rejecting anything
/// outside `[1, 100]` rather than silently clamping it.
fn validate_max_steps(max_steps: Option<u32>) -> Result<u32, ApiError> {
    let value = max_steps.unwrap_or(DEFAULT_MAX_STEPS);
    if !(MIN_MAX_STEPS..=MAX_MAX_STEPS).contains(&value) {
        return Err(ApiError(OrchestratorError::InvalidRequest(format!(
            "max-steps must be between {MIN_MAX_STEPS} and {MAX_MAX_STEPS}"
        ))));
    }
    Ok(value)
}

/// Buffered orchestration: `POST /agents/{id}/chat`.
pub async fn chat(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path(id): Path<String>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    validate_input(&req.input)?;
    let max_steps = validate_max_steps(req.max_steps)?;
    let session_id = req.session_id.unwrap_or_else(|| generate_session_id(&id));
    let cancel = CancellationToken::new();

    let response = dispatch(&orchestrator, &id, &req.input, &session_id, max_steps, cancel).await?;
    Ok(Json(response))
}

/// Streamed orchestration: `POST /agents/{id}/chat/stream`.
pub async fn chat_stream(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path(id): Path<String>,
    Json(req): Json<ChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&req.input)?;
    let max_steps = validate_max_steps(req.max_steps)?;
    let session_id = req.session_id.unwrap_or_else(|| generate_session_id(&id));
    let cancel = CancellationToken::new();

    let display_name = (!is_orchestrator_route(&id))
        .then(|| orchestrator.config().expert(&id).map(|e| e.display_name().to_string()))
        .flatten();

    let init = StreamMetadataInit {
        expert_id: (!is_orchestrator_route(&id)).then(|| id.clone()),
        display_name,
        orchestrator: id.clone(),
        session_enabled: true,
        session_id: Some(session_id.clone()),
        max_steps,
    };

    let orchestrator = orchestrator.clone();
    let id_for_task = id.clone();
    let input = req.input.clone();
    let session_for_task = session_id.clone();
    let cancel_for_produce = cancel.clone();

    let rx = stream_orchestration(init, cancel.clone(), async move {
        run_streamable(
            &orchestrator,
            &id_for_task,
            &input,
            &session_for_task,
            max_steps,
            cancel_for_produce,
        )
        .await
    });

    // Keeps `cancel` alive for the lifetime of the response body: when the
    // client disconnects, axum drops this stream (and the closure holding
    // `guard`), which cancels the in-flight orchestration within one tick.
    let guard = CancelOnDrop(cancel);
    let body = ReceiverStream::new(rx).map(move |chunk| {
        let _ = &guard;
        let data = serde_json::to_string(&chunk).unwrap_or_else(|_| "{}".to_string());
        Ok::<Event, Infallible>(Event::default().data(data))
    });

    // nginx (or another buffering reverse proxy) must not coalesce SSE
    // chunks, or cancellation-on-disconnect stops being bounded.
    Ok((
        [("x-accel-buffering", "no")],
        Sse::new(body).keep_alive(KeepAlive::default()),
    ))
}

struct CancelOnDrop(CancellationToken);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// Mock orchestration, no LLM calls: `POST /agents/{id}/simulate`.
pub async fn simulate(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path(id): Path<String>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    validate_input(&req.input)?;
    let session_id = req.session_id.unwrap_or_else(|| generate_session_id(&id));

    if !is_orchestrator_route(&id) {
        let config = orchestrator.config();
        config
            .expert(&id)
            .ok_or_else(|| ApiError(OrchestratorError::UnknownExpert(id.clone())))?;
    }

    let mut trace = OrchestrationTrace::new("simulate", &session_id);
    let phase = trace.start_phase("mock");
    trace.finish_phase(phase, Some(format!("echoed input for '{id}'")));
    let snapshot = trace.snapshot();

    Ok(Json(ChatResponse {
        response: format!("[MOCK] {}", req.input),
        trace: snapshot.phases.clone(),
        metadata: ChatMetadata {
            mode: "mock",
            orchestrator: id.clone(),
            expert_id: (!is_orchestrator_route(&id)).then(|| id),
            session_id,
            experts_used: vec![],
            trace: snapshot,
            guardrails: GuardrailsMetadata {
                hallucination: HallucinationGuardrailMetadata { triggered: false },
            },
        },
    }))
}

async fn dispatch(
    orchestrator: &Orchestrator,
    id: &str,
    input: &str,
    session_id: &str,
    max_steps: u32,
    cancel: CancellationToken,
) -> Result<ChatResponse, ApiError> {
    match id {
        "moe" => {
            let result = orchestrator
                .chat_moe(input, Some(session_id), max_steps, cancel)
                .await?;
            Ok(ChatResponse {
                response: result.response,
                trace: result.trace.phases.clone(),
                metadata: ChatMetadata {
                    mode: "real",
                    orchestrator: "moe".to_string(),
                    expert_id: None,
                    session_id: session_id.to_string(),
                    experts_used: result.experts_used,
                    guardrails: GuardrailsMetadata {
                        hallucination: HallucinationGuardrailMetadata {
                            triggered: result.guardrail_triggered,
                        },
                    },
                    trace: result.trace,
                },
            })
        }
        "smartrouter" => {
            let result = orchestrator
                .chat_smartrouter(input, session_id, max_steps, cancel)
                .await?;
            Ok(ChatResponse {
                response: result.response,
                trace: result.trace.phases.clone(),
                metadata: ChatMetadata {
                    mode: "real",
                    orchestrator: "smartrouter".to_string(),
                    expert_id: None,
                    session_id: session_id.to_string(),
                    experts_used: result.experts_used,
                    guardrails: GuardrailsMetadata {
                        hallucination: HallucinationGuardrailMetadata {
                            triggered: result.guardrail_triggered,
                        },
                    },
                    trace: result.trace,
                },
            })
        }
        expert_id => {
            let result = orchestrator
                .chat_single(expert_id, input, Some(session_id), max_steps)
                .await?;
            Ok(ChatResponse {
                response: result.response,
                trace: result.trace.phases.clone(),
                metadata: ChatMetadata {
                    mode: "real",
                    orchestrator: "single".to_string(),
                    expert_id: Some(expert_id.to_string()),
                    session_id: session_id.to_string(),
                    experts_used: vec![expert_id.to_string()],
                    guardrails: GuardrailsMetadata {
                        hallucination: HallucinationGuardrailMetadata {
                            triggered: result.guardrail_triggered,
                        },
                    },
                    trace: result.trace,
                },
            })
        }
    }
}

async fn run_streamable(
    orchestrator: &Orchestrator,
    id: &str,
    input: &str,
    session_id: &str,
    max_steps: u32,
    cancel: CancellationToken,
) -> Result<StreamableResult, OrchestratorError> {
    match id {
        "moe" => {
            let result = orchestrator
                .chat_moe(input, Some(session_id), max_steps, cancel)
                .await?;
            Ok(StreamableResult {
                response: result.response,
                experts_used: result.experts_used,
                cache_hit: result.cache_hit,
                guardrail_triggered: result.guardrail_triggered,
                latency_ms: result.trace.latency_ms,
            })
        }
        "smartrouter" => {
            let result = orchestrator
                .chat_smartrouter(input, session_id, max_steps, cancel)
                .await?;
            Ok(StreamableResult {
                response: result.response,
                experts_used: result.experts_used,
                cache_hit: false,
                guardrail_triggered: result.guardrail_triggered,
                latency_ms: result.trace.latency_ms,
            })
        }
        expert_id => {
            let result = orchestrator
                .chat_single(expert_id, input, Some(session_id), max_steps)
                .await?;
            Ok(StreamableResult {
                response: result.response,
                experts_used: vec![expert_id.to_string()],
                cache_hit: false,
                guardrail_triggered: result.guardrail_triggered,
                latency_ms: result.trace.latency_ms,
            })
        }
    }
}
