//! SmartRouter orchestrator: interpret a query, decompose it into
//! dependency-ordered sub-queries, route each to an expert, execute
//! respecting dependencies, then synthesize a cited answer.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::config::{ExpertDescriptor, ExpertsConfig};
use crate::error::OrchestratorError;
use crate::expert_runner;
use crate::factory::AgentFactory;
use crate::guardrail::{self, GuardrailConfig};
use crate::trace::{ExpertAttempt, OrchestrationTrace, TraceSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubQueryStatus {
    Pending,
    Dispatched,
    Succeeded,
    Failed,
    Skipped,
}

#[derive(Debug, Clone)]
pub struct SubQuery {
    pub id: String,
    pub text: String,
    pub expert_id: String,
    pub depends_on: Vec<String>,
    pub status: SubQueryStatus,
    pub output: Option<String>,
}

pub struct SmartRouterResult {
    pub response: String,
    pub trace: TraceSnapshot,
    pub experts_used: Vec<String>,
    pub guardrail_triggered: bool,
}

/// Phase 1: interpretation. Splits on conjunctions ("and"/";") as a cheap
/// stand-in for an LLM planner classifying domains/complexity — real
/// decomposition warrants an LLM call, but the structural shape (does this
/// query have more than one independent ask?) is decidable lexically enough
/// to drive routing deterministically in tests.
fn interpret(query: &str) -> Vec<String> {
    let parts: Vec<String> = query
        .split(|c| c == ';')
        .flat_map(|segment| segment.split(" and "))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if parts.is_empty() {
        vec![query.trim().to_string()]
    } else {
        parts
    }
}

/// Phase 3: routing. Picks the enabled expert whose capability tags best
/// match the sub-query text, falling back to the first enabled expert
/// lexicographically if nothing matches.
fn route<'a>(config: &'a ExpertsConfig, sub_query_text: &str) -> Option<&'a ExpertDescriptor> {
    let lower = sub_query_text.to_lowercase();
    let mut best: Option<(&ExpertDescriptor, u32)> = None;
    for expert in config.enabled_experts() {
        let score = expert
            .capability_tags
            .iter()
            .filter(|tag| lower.contains(&tag.to_lowercase()))
            .count() as u32;
        let replace = match best {
            None => true,
            Some((current, current_score)) => {
                score > current_score || (score == current_score && expert.id < current.id)
            }
        };
        if replace {
            best = Some((expert, score));
        }
    }
    best.map(|(e, _)| e)
}

fn decompose(config: &ExpertsConfig, query: &str) -> Vec<SubQuery> {
    interpret(query)
        .into_iter()
        .enumerate()
        .filter_map(|(idx, text)| {
            route(config, &text).map(|expert| SubQuery {
                id: format!("sq-{idx}"),
                text,
                expert_id: expert.id.clone(),
                // This implementation routes independent sub-queries with no
                // inter-dependency; a planner-driven decomposition could
                // populate `depends_on` when one sub-answer feeds another.
                depends_on: vec![],
                status: SubQueryStatus::Pending,
                output: None,
            })
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
pub async fn run_smartrouter(
    config: &ExpertsConfig,
    factory: &AgentFactory,
    guardrail_config: &GuardrailConfig,
    query: &str,
    session_id: &str,
    max_steps: u32,
    request_id: &str,
    cancel: CancellationToken,
) -> Result<SmartRouterResult, OrchestratorError> {
    let mut trace = OrchestrationTrace::new("smartrouter", request_id);

    let interpretation_phase = trace.start_phase("interpretation");
    let mut sub_queries = decompose(config, query);
    trace.finish_phase(
        interpretation_phase,
        Some(format!("{} sub-queries", sub_queries.len())),
    );

    if sub_queries.is_empty() {
        return Err(OrchestratorError::Orchestration(
            "no expert available to route any sub-query".to_string(),
        ));
    }

    trace.selected_experts = sub_queries.iter().map(|sq| sq.expert_id.clone()).collect();

    let routing_phase = trace.start_phase("routing");
    for sq in &sub_queries {
        trace.finish_phase(
            trace.start_phase(format!("route:{}->{}", sq.id, sq.expert_id)),
            None,
        );
    }
    trace.finish_phase(routing_phase, Some(format!("{} routed", sub_queries.len())));

    // Phase 4: dependency-respecting execution, bounded fan-out.
    let execution_phase = trace.start_phase("execution");
    let semaphore = Arc::new(Semaphore::new(config.orchestrator.smartrouter_fanout_limit.max(1)));
    let per_expert_timeout = Duration::from_millis(config.orchestrator.per_expert_timeout_ms);

    loop {
        let ready: Vec<usize> = sub_queries
            .iter()
            .enumerate()
            .filter(|(_, sq)| sq.status == SubQueryStatus::Pending)
            .filter(|(_, sq)| {
                sq.depends_on.iter().all(|dep_id| {
                    sub_queries
                        .iter()
                        .find(|d| &d.id == dep_id)
                        .map(|d| d.status == SubQueryStatus::Succeeded)
                        .unwrap_or(true)
                })
            })
            .map(|(idx, _)| idx)
            .collect();

        if ready.is_empty() {
            break;
        }

        if cancel.is_cancelled() {
            for idx in ready {
                sub_queries[idx].status = SubQueryStatus::Skipped;
            }
            return Err(OrchestratorError::Cancelled);
        }

        let failed_or_skipped: HashSet<String> = sub_queries
            .iter()
            .filter(|sq| matches!(sq.status, SubQueryStatus::Failed | SubQueryStatus::Skipped))
            .map(|sq| sq.id.clone())
            .collect();
        for sq in sub_queries.iter_mut() {
            if sq.status == SubQueryStatus::Pending
                && sq.depends_on.iter().any(|dep_id| failed_or_skipped.contains(dep_id))
            {
                sq.status = SubQueryStatus::Skipped;
            }
        }

        let mut handles = Vec::new();
        for idx in ready {
            if sub_queries[idx].status != SubQueryStatus::Pending {
                continue;
            }
            sub_queries[idx].status = SubQueryStatus::Dispatched;
            let sq = sub_queries[idx].clone();
            let permit = Arc::clone(&semaphore);
            let session_id = session_id.to_string();
            let child_token = cancel.child_token();
            handles.push(async move {
                let _permit = permit.acquire_owned().await.ok();
                let outcome = tokio::select! {
                    biased;
                    _ = child_token.cancelled() => Err(OrchestratorError::Cancelled),
                    result = run_sub_query(factory, &sq, &session_id, max_steps, per_expert_timeout) => result,
                };
                (idx, outcome)
            });
        }

        let batch_results = futures::future::join_all(handles).await;
        for (idx, outcome) in batch_results {
            match outcome {
                Ok(output) => {
                    sub_queries[idx].status = SubQueryStatus::Succeeded;
                    sub_queries[idx].output = Some(output);
                }
                Err(e) => {
                    sub_queries[idx].status = SubQueryStatus::Failed;
                    trace.record_attempt(ExpertAttempt {
                        expert_id: sub_queries[idx].expert_id.clone(),
                        succeeded: false,
                        weight: 1.0,
                        error: Some(e.to_string()),
                        latency_ms: trace.total_latency_ms(),
                    });
                }
            }
        }
    }

    for sq in sub_queries.iter().filter(|sq| sq.status == SubQueryStatus::Succeeded) {
        trace.record_attempt(ExpertAttempt {
            expert_id: sq.expert_id.clone(),
            succeeded: true,
            weight: 1.0,
            error: None,
            latency_ms: trace.total_latency_ms(),
        });
    }
    trace.finish_phase(
        execution_phase,
        Some(format!(
            "{} succeeded, {} failed, {} skipped",
            sub_queries.iter().filter(|s| s.status == SubQueryStatus::Succeeded).count(),
            sub_queries.iter().filter(|s| s.status == SubQueryStatus::Failed).count(),
            sub_queries.iter().filter(|s| s.status == SubQueryStatus::Skipped).count(),
        )),
    );

    let succeeded: Vec<&SubQuery> = sub_queries
        .iter()
        .filter(|sq| sq.status == SubQueryStatus::Succeeded)
        .collect();
    if succeeded.is_empty() {
        return Err(OrchestratorError::Orchestration(
            "every sub-query failed".to_string(),
        ));
    }

    // Phase 5: synthesis, citing contributing experts.
    let synthesis_phase = trace.start_phase("synthesis");
    let mut response = String::new();
    let mut experts_used = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    for sq in &succeeded {
        if let Some(output) = &sq.output {
            response.push_str(output);
            response.push_str(&format!(" (source: {})", sq.expert_id));
            response.push('\n');
        }
        if seen.insert(sq.expert_id.as_str()) {
            experts_used.push(sq.expert_id.clone());
        }
    }
    trace.finish_phase(synthesis_phase, Some(format!("{} contributors cited", experts_used.len())));

    // Phase 6: optional self-check, recorded but never retried.
    let evaluation_phase = trace.start_phase("evaluation");
    trace.finish_phase(evaluation_phase, Some("self-check not configured".to_string()));

    let mut guardrail_triggered = false;
    let guardrail_phase = trace.start_phase("guardrail");
    if let Some(verdict) =
        guardrail::check_hallucination(guardrail_config, "smartrouter", query, &response).await
    {
        if guardrail::should_repair(&verdict) {
            response = verdict.safe_repair.clone();
            guardrail_triggered = true;
        }
        trace.finish_phase(guardrail_phase, Some(verdict.reason));
    } else {
        trace.finish_phase(guardrail_phase, None);
    }

    Ok(SmartRouterResult {
        response,
        trace: trace.snapshot(),
        experts_used,
        guardrail_triggered,
    })
}

async fn run_sub_query(
    factory: &AgentFactory,
    sub_query: &SubQuery,
    session_id: &str,
    max_steps: u32,
    timeout: Duration,
) -> Result<String, OrchestratorError> {
    let worker = factory
        .get_agent_with_persistent_session(&sub_query.expert_id, session_id)
        .await?;
    let result = tokio::time::timeout(
        timeout,
        expert_runner::run(&worker, &sub_query.expert_id, &sub_query.text, Some(session_id), max_steps),
    )
    .await
    .map_err(|_| {
        OrchestratorError::Orchestration(format!("sub-query '{}' timed out", sub_query.id))
    })??;
    Ok(result.final_output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OrchestratorPolicy, SessionPolicy};

    fn expert(id: &str, tags: &[&str]) -> ExpertDescriptor {
        ExpertDescriptor {
            id: id.to_string(),
            display_name: None,
            model: "gpt-4.1-mini".to_string(),
            temperature: 0.7,
            max_tokens: 256,
            session_policy: SessionPolicy::None,
            enabled: true,
            capability_tags: tags.iter().map(|t| t.to_string()).collect(),
            tool_server: None,
            instructions: None,
        }
    }

    fn config() -> ExpertsConfig {
        ExpertsConfig {
            orchestrator: OrchestratorPolicy::default(),
            experts: vec![expert("weather", &["weather"]), expert("yelp", &["restaurants", "ramen"])],
            tool_servers: vec![],
        }
    }

    #[test]
    fn interpret_splits_on_and_and_semicolon() {
        let parts = interpret("weather in SF and top 3 ramen shops");
        assert_eq!(parts.len(), 2);
        assert!(parts[0].contains("weather"));
        assert!(parts[1].contains("ramen"));
    }

    #[test]
    fn decompose_routes_each_part_to_its_best_expert() {
        let cfg = config();
        let subs = decompose(&cfg, "weather in SF and top 3 ramen shops");
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].expert_id, "weather");
        assert_eq!(subs[1].expert_id, "yelp");
    }

    #[test]
    fn single_part_query_produces_one_sub_query() {
        let cfg = config();
        let subs = decompose(&cfg, "what's the weather like");
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].expert_id, "weather");
    }
}
