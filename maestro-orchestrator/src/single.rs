//! Single-expert chat path: routes `{id}` directly to one configured expert,
//! sharing the expert runner and guardrail with MoE/SmartRouter.

use crate::config::ExpertsConfig;
use crate::error::OrchestratorError;
use crate::expert_runner;
use crate::factory::AgentFactory;
use crate::guardrail::{self, GuardrailConfig};
use crate::trace::{ExpertAttempt, OrchestrationTrace, TraceSnapshot};

/// Result of a single-expert call: the (possibly repaired) answer plus trace.
pub struct SingleExpertResult {
    pub response: String,
    pub trace: TraceSnapshot,
    pub guardrail_triggered: bool,
}

/// Runs one input against `expert_id` directly — no selection, no mixing.
pub async fn run_single_expert(
    config: &ExpertsConfig,
    factory: &AgentFactory,
    guardrail_config: &GuardrailConfig,
    expert_id: &str,
    input: &str,
    session_id: Option<&str>,
    max_steps: u32,
    request_id: &str,
) -> Result<SingleExpertResult, OrchestratorError> {
    let descriptor = config
        .expert(expert_id)
        .ok_or_else(|| OrchestratorError::UnknownExpert(expert_id.to_string()))?;
    if !descriptor.enabled {
        return Err(OrchestratorError::DisabledExpert(expert_id.to_string()));
    }

    let mut trace = OrchestrationTrace::new("single", request_id);
    trace.selected_experts = vec![expert_id.to_string()];

    let attempt_phase = trace.start_phase(format!("expert:{expert_id}"));
    let worker = match session_id {
        Some(sid) => factory.get_agent_with_session(expert_id, sid).await?,
        None => factory.get_agent(expert_id).await?,
    };
    let run_result =
        expert_runner::run(&worker, expert_id, input, session_id, max_steps).await;
    trace.finish_phase(attempt_phase, None);

    let run_result = match run_result {
        Ok(r) => r,
        Err(e) => {
            trace.record_attempt(ExpertAttempt {
                expert_id: expert_id.to_string(),
                succeeded: false,
                weight: 1.0,
                error: Some(e.to_string()),
                latency_ms: trace.total_latency_ms(),
            });
            return Err(e);
        }
    };

    trace.record_attempt(ExpertAttempt {
        expert_id: expert_id.to_string(),
        succeeded: true,
        weight: 1.0,
        error: None,
        latency_ms: trace.total_latency_ms(),
    });

    let mut response = run_result.final_output;

    let mut guardrail_triggered = false;
    let guardrail_phase = trace.start_phase("guardrail");
    if let Some(verdict) =
        guardrail::check_hallucination(guardrail_config, "single", input, &response).await
    {
        if guardrail::should_repair(&verdict) {
            response = verdict.safe_repair.clone();
            guardrail_triggered = true;
        }
        trace.finish_phase(guardrail_phase, Some(verdict.reason));
    } else {
        trace.finish_phase(guardrail_phase, None);
    }

    Ok(SingleExpertResult {
        response,
        trace: trace.snapshot(),
        guardrail_triggered,
    })
}
