//! `OrchestrationTrace`: the append-only phase log every orchestrator builds
//! during a run and returns as response metadata.

use std::time::{Duration, Instant};

use serde::Serialize;

/// One timed phase within an orchestration run (selection, an individual
/// expert attempt, synthesis, guardrail check, ...). `start`/`end` are kept
/// as `Instant`s during the run and only rendered to milliseconds-since-start
/// at serialization time via [`OrchestrationTrace::finish`].
#[derive(Debug, Clone)]
pub struct PhaseRecord {
    pub name: String,
    pub detail: Option<String>,
    start: Instant,
    end: Option<Instant>,
}

impl PhaseRecord {
    fn start(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            detail: None,
            start: Instant::now(),
            end: None,
        }
    }

    fn finish(&mut self, detail: Option<String>) {
        self.end = Some(Instant::now());
        self.detail = detail;
    }

    fn duration(&self) -> Duration {
        self.end.unwrap_or_else(Instant::now).saturating_duration_since(self.start)
    }
}

/// Serializable view of one phase, emitted in the HTTP response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct PhaseSnapshot {
    pub name: String,
    pub detail: Option<String>,
    pub latency_ms: u64,
}

/// Per-expert attempt record: which expert, whether it succeeded, its weight
/// in the mix, and its own timing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExpertAttempt {
    pub expert_id: String,
    pub succeeded: bool,
    pub weight: f32,
    pub error: Option<String>,
    pub latency_ms: u64,
}

/// Append-only trace built during one orchestration call, serialized into
/// the response once the call completes.
#[derive(Debug, Clone)]
pub struct OrchestrationTrace {
    pub orchestrator: String,
    pub request_id: String,
    pub selected_experts: Vec<String>,
    pub expert_attempts: Vec<ExpertAttempt>,
    pub cache_hit: bool,
    pub fallback: bool,
    phases: Vec<PhaseRecord>,
    run_start: Instant,
}

impl OrchestrationTrace {
    pub fn new(orchestrator: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            orchestrator: orchestrator.into(),
            request_id: request_id.into(),
            selected_experts: Vec::new(),
            expert_attempts: Vec::new(),
            cache_hit: false,
            fallback: false,
            phases: Vec::new(),
            run_start: Instant::now(),
        }
    }

    /// Opens a new phase and returns its index for later completion via
    /// [`Self::finish_phase`]. Phases are total-ordered by when they were
    /// opened, matching the invariant that within one call phase order in
    /// the trace is total.
    pub fn start_phase(&mut self, name: impl Into<String>) -> usize {
        self.phases.push(PhaseRecord::start(name));
        self.phases.len() - 1
    }

    pub fn finish_phase(&mut self, index: usize, detail: Option<String>) {
        if let Some(phase) = self.phases.get_mut(index) {
            phase.finish(detail);
        }
    }

    pub fn record_attempt(&mut self, attempt: ExpertAttempt) {
        self.expert_attempts.push(attempt);
    }

    pub fn total_latency_ms(&self) -> u64 {
        // Always > 0 even on the degenerate fallback path, since run_start is
        // set at construction and Instant::now() always advances.
        self.run_start.elapsed().as_millis() as u64
    }

    pub fn snapshot(&self) -> TraceSnapshot {
        TraceSnapshot {
            orchestrator: self.orchestrator.clone(),
            request_id: self.request_id.clone(),
            selected_experts: self.selected_experts.clone(),
            expert_attempts: self.expert_attempts.clone(),
            phases: self
                .phases
                .iter()
                .map(|p| PhaseSnapshot {
                    name: p.name.clone(),
                    detail: p.detail.clone(),
                    latency_ms: p.duration().as_millis() as u64,
                })
                .collect(),
            cache_hit: self.cache_hit,
            fallback: self.fallback,
            latency_ms: self.total_latency_ms(),
        }
    }
}

/// Serializable, frozen view of an [`OrchestrationTrace`] for the HTTP
/// response and for cache storage (`ResultCacheEntry.trace_snapshot`).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TraceSnapshot {
    pub orchestrator: String,
    pub request_id: String,
    pub selected_experts: Vec<String>,
    pub expert_attempts: Vec<ExpertAttempt>,
    pub phases: Vec<PhaseSnapshot>,
    pub cache_hit: bool,
    pub fallback: bool,
    pub latency_ms: u64,
}
