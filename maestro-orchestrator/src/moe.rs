//! Mixture-of-Experts orchestrator: select a relevant subset of experts, run
//! them in parallel, mix their outputs, synthesize one final answer.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::cache::{CacheEntry, CacheKey, Lookup, ResultCache};
use crate::config::{ExpertDescriptor, ExpertsConfig};
use crate::error::OrchestratorError;
use crate::expert_runner;
use crate::factory::AgentFactory;
use crate::guardrail::{self, GuardrailConfig};
use crate::trace::{ExpertAttempt, OrchestrationTrace, TraceSnapshot};

const FALLBACK_TEXT: &str =
    "I wasn't able to get a confident answer from any expert for this request.";

/// Owns single-flight build responsibility for one cache key after
/// `ResultCache::lookup` returns `Lookup::Build`. Aborts the in-flight
/// marker on drop unless [`disarm`](Self::disarm) was called first, so every
/// path out of the build section — fallback, cancellation, an early error
/// return — releases waiters instead of leaving them blocked forever.
struct CacheBuildGuard<'a> {
    cache: &'a ResultCache,
    key: Option<CacheKey>,
}

impl<'a> CacheBuildGuard<'a> {
    fn new(cache: &'a ResultCache, key: CacheKey) -> Self {
        Self { cache, key: Some(key) }
    }

    /// Releases ownership without aborting: the caller is about to commit
    /// this same key itself.
    fn disarm(mut self) {
        self.key = None;
    }
}

impl Drop for CacheBuildGuard<'_> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            self.cache.abort(&key);
        }
    }
}

pub struct MoeResult {
    pub response: String,
    pub trace: TraceSnapshot,
    pub experts_used: Vec<String>,
    pub cache_hit: bool,
    pub guardrail_triggered: bool,
}

/// Scores every enabled expert's capability tags against `query`'s tokens,
/// takes the top `k`, breaking ties by descriptor id so selection is
/// reproducible across identical inputs.
fn select_experts<'a>(
    config: &'a ExpertsConfig,
    query: &str,
    k: usize,
) -> Vec<&'a ExpertDescriptor> {
    let query_lower = query.to_lowercase();
    let mut scored: Vec<(&ExpertDescriptor, u32)> = config
        .enabled_experts()
        .map(|expert| {
            let score = expert
                .capability_tags
                .iter()
                .filter(|tag| query_lower.contains(&tag.to_lowercase()))
                .count() as u32;
            (expert, score)
        })
        .collect();

    scored.sort_by(|(a, a_score), (b, b_score)| {
        b_score.cmp(a_score).then_with(|| a.id.cmp(&b.id))
    });

    // When nothing scored, fall back to the first `k` enabled experts
    // (lexicographic by id) rather than returning nothing: a request must
    // always get a chance at an answer.
    if scored.iter().all(|(_, score)| *score == 0) {
        let mut all: Vec<&ExpertDescriptor> = config.enabled_experts().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        return all.into_iter().take(k).collect();
    }

    scored.into_iter().take(k).map(|(e, _)| e).collect()
}

#[allow(clippy::too_many_arguments)]
pub async fn run_moe(
    config: &ExpertsConfig,
    factory: &AgentFactory,
    cache: &ResultCache,
    guardrail_config: &GuardrailConfig,
    query: &str,
    session_id: Option<&str>,
    max_steps: u32,
    request_id: &str,
    cancel: CancellationToken,
) -> Result<MoeResult, OrchestratorError> {
    let mut trace = OrchestrationTrace::new("moe", request_id);

    // Phase 1: selection.
    let selection_phase = trace.start_phase("selection");
    let selected = select_experts(config, query, config.orchestrator.selection_count);
    let selected_ids: Vec<String> = selected.iter().map(|e| e.id.clone()).collect();
    trace.selected_experts = selected_ids.clone();
    trace.finish_phase(selection_phase, Some(format!("{} experts", selected_ids.len())));

    if selected.is_empty() {
        trace.fallback = true;
        return Ok(MoeResult {
            response: FALLBACK_TEXT.to_string(),
            trace: trace.snapshot(),
            experts_used: vec![],
            cache_hit: false,
            guardrail_triggered: false,
        });
    }

    // Phase 2: cache lookup.
    let cache_phase = trace.start_phase("cache_lookup");
    let cache_key = CacheKey::new("moe", query, &selected_ids);
    let mut build_guard: Option<CacheBuildGuard> = None;
    match cache.lookup(&cache_key).await {
        Lookup::Hit(entry) => {
            trace.cache_hit = true;
            trace.finish_phase(cache_phase, Some("hit".to_string()));
            return Ok(MoeResult {
                response: entry.answer,
                trace: entry.trace_snapshot,
                experts_used: entry.experts_used,
                cache_hit: true,
                guardrail_triggered: entry.guardrail_triggered,
            });
        }
        Lookup::WaitedForBuild => {
            // Another caller just finished (or failed) building; re-lookup
            // once more, then fall through to building ourselves if it
            // turned out to have failed.
            if let Lookup::Hit(entry) = cache.lookup(&cache_key).await {
                trace.cache_hit = true;
                trace.finish_phase(cache_phase, Some("hit-after-wait".to_string()));
                return Ok(MoeResult {
                    response: entry.answer,
                    trace: entry.trace_snapshot,
                    experts_used: entry.experts_used,
                    cache_hit: true,
                    guardrail_triggered: entry.guardrail_triggered,
                });
            }
            trace.finish_phase(cache_phase, Some("miss-after-wait".to_string()));
        }
        Lookup::Build => {
            trace.finish_phase(cache_phase, Some("miss".to_string()));
            build_guard = Some(CacheBuildGuard::new(cache, cache_key.clone()));
        }
    }

    // Phase 3: parallel execution.
    let execution_phase = trace.start_phase("execution");
    let per_expert_timeout = Duration::from_millis(config.orchestrator.per_expert_timeout_ms);
    let tasks = selected.iter().map(|expert| {
        let expert_id = expert.id.clone();
        let query = query.to_string();
        let session_id = session_id.map(|s| s.to_string());
        let child_token = cancel.child_token();
        async move {
            if child_token.is_cancelled() {
                return (expert_id, Err(OrchestratorError::Cancelled));
            }
            let outcome = tokio::select! {
                biased;
                _ = child_token.cancelled() => Err(OrchestratorError::Cancelled),
                result = run_one_expert(factory, &expert_id, &query, session_id.as_deref(), max_steps, per_expert_timeout) => result,
            };
            (expert_id, outcome)
        }
    });
    let results: Vec<(String, Result<String, OrchestratorError>)> =
        futures::future::join_all(tasks).await;

    if cancel.is_cancelled() {
        return Err(OrchestratorError::Cancelled);
    }

    let mut successes: Vec<(String, f32, String)> = Vec::new();
    for (expert_id, result) in &results {
        let weight = selected
            .iter()
            .position(|e| &e.id == expert_id)
            .map(|idx| 1.0 - (idx as f32 * 0.1))
            .unwrap_or(0.5)
            .max(0.1);
        match result {
            Ok(output) => {
                successes.push((expert_id.clone(), weight, output.clone()));
                trace.record_attempt(ExpertAttempt {
                    expert_id: expert_id.clone(),
                    succeeded: true,
                    weight,
                    error: None,
                    latency_ms: trace.total_latency_ms(),
                });
            }
            Err(e) => {
                trace.record_attempt(ExpertAttempt {
                    expert_id: expert_id.clone(),
                    succeeded: false,
                    weight: weight * 0.5,
                    error: Some(e.to_string()),
                    latency_ms: trace.total_latency_ms(),
                });
            }
        }
    }
    trace.finish_phase(
        execution_phase,
        Some(format!("{}/{} succeeded", successes.len(), selected.len())),
    );

    // Degradation: zero successes -> fallback; one success -> skip synthesis.
    let (response, experts_used) = if successes.is_empty() {
        trace.fallback = true;
        (FALLBACK_TEXT.to_string(), vec![])
    } else if successes.len() == 1 {
        let (id, _, output) = successes.into_iter().next().unwrap();
        (output, vec![id])
    } else {
        // Phase 4: mixing (collect weighted contributions).
        let mixing_phase = trace.start_phase("mixing");
        let experts_used: Vec<String> = successes.iter().map(|(id, _, _)| id.clone()).collect();
        trace.finish_phase(mixing_phase, Some(format!("{} contributions", successes.len())));

        // Phase 5: synthesis by the highest-weight survivor.
        let synthesis_phase = trace.start_phase("synthesis");
        let mut ranked = successes;
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        let synthesized = synthesize(&ranked);
        trace.finish_phase(synthesis_phase, Some(format!("synthesized from {}", ranked[0].0)));
        (synthesized, experts_used)
    };

    // Guardrail, immediately before returning.
    let mut response = response;
    let mut guardrail_triggered = false;
    let guardrail_phase = trace.start_phase("guardrail");
    if let Some(verdict) =
        guardrail::check_hallucination(guardrail_config, "moe", query, &response).await
    {
        if guardrail::should_repair(&verdict) {
            response = verdict.safe_repair.clone();
            guardrail_triggered = true;
        }
        trace.finish_phase(guardrail_phase, Some(verdict.reason));
    } else {
        trace.finish_phase(guardrail_phase, None);
    }

    let snapshot = trace.snapshot();
    if !trace.fallback {
        if let Some(guard) = build_guard.take() {
            guard.disarm();
        }
        cache.commit(
            cache_key,
            CacheEntry {
                answer: response.clone(),
                trace_snapshot: snapshot.clone(),
                experts_used: experts_used.clone(),
                guardrail_triggered,
                created_at: Instant::now(),
            },
        );
    }
    // else: `build_guard`, if claimed, drops here and aborts the in-flight
    // marker so the next identical request rebuilds instead of hanging.

    Ok(MoeResult {
        response,
        trace: snapshot,
        experts_used,
        cache_hit: false,
        guardrail_triggered,
    })
}

async fn run_one_expert(
    factory: &AgentFactory,
    expert_id: &str,
    query: &str,
    session_id: Option<&str>,
    max_steps: u32,
    timeout: Duration,
) -> Result<String, OrchestratorError> {
    let worker = match session_id {
        Some(sid) => factory.get_agent_with_session(expert_id, sid).await?,
        None => factory.get_agent(expert_id).await?,
    };
    let result = tokio::time::timeout(
        timeout,
        expert_runner::run(&worker, expert_id, query, session_id, max_steps),
    )
    .await
    .map_err(|_| OrchestratorError::Orchestration(format!("expert '{expert_id}' timed out")))??;
    Ok(result.final_output)
}

/// Condenses weighted expert outputs into one answer: the highest-weight
/// survivor leads, with the remaining contributions appended as supporting
/// context the way a synthesis pass would fold in secondary sources.
fn synthesize(ranked: &[(String, f32, String)]) -> String {
    let (_, _, lead_text) = &ranked[0];
    if ranked.len() == 1 {
        return lead_text.clone();
    }
    let mut out = lead_text.clone();
    out.push_str("\n\nAdditional input:\n");
    for (id, _, text) in &ranked[1..] {
        out.push_str(&format!("- ({id}): {text}\n"));
    }
    out
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
            orchestrator: OrchestratorPolicy {
                selection_count: 2,
                ..OrchestratorPolicy::default()
            },
            experts: vec![
                expert("yelp", &["restaurants", "food"]),
                expert("weather", &["weather"]),
                expert("chitchat", &["smalltalk", "general"]),
            ],
            tool_servers: vec![],
        }
    }

    #[tokio::test]
    async fn build_guard_aborts_the_in_flight_marker_on_drop() {
        let cache = ResultCache::new(std::time::Duration::from_secs(60), 16);
        let key = CacheKey::new("moe", "hello", &["chitchat".to_string()]);
        assert!(matches!(cache.lookup(&key).await, Lookup::Build));

        {
            let _guard = CacheBuildGuard::new(&cache, key.clone());
            // Guard drops here without being disarmed — simulating the
            // fallback/cancellation exit paths.
        }

        // The marker must be gone, not stuck `InFlight` forever.
        assert!(matches!(cache.lookup(&key).await, Lookup::Build));
    }

    #[tokio::test]
    async fn disarmed_build_guard_does_not_abort_a_since_committed_entry() {
        let cache = ResultCache::new(std::time::Duration::from_secs(60), 16);
        let key = CacheKey::new("moe", "hello", &["chitchat".to_string()]);
        assert!(matches!(cache.lookup(&key).await, Lookup::Build));

        let guard = CacheBuildGuard::new(&cache, key.clone());
        guard.disarm();
        cache.commit(key.clone(), entry_for_test("hi there"));

        match cache.lookup(&key).await {
            Lookup::Hit(e) => assert_eq!(e.answer, "hi there"),
            _ => panic!("expected hit: disarm must not have aborted the committed entry"),
        }
    }

    fn entry_for_test(answer: &str) -> CacheEntry {
        CacheEntry {
            answer: answer.to_string(),
            trace_snapshot: OrchestrationTrace::new("moe", "req").snapshot(),
            experts_used: vec!["chitchat".to_string()],
            guardrail_triggered: false,
            created_at: Instant::now(),
        }
    }

    #[test]
    fn selection_prefers_matching_capability_tags() {
        let cfg = config();
        let selected = select_experts(&cfg, "find me good restaurants nearby", 2);
        assert_eq!(selected[0].id, "yelp");
    }

    #[test]
    fn selection_ties_break_lexicographically_by_id() {
        let cfg = config();
        let selected = select_experts(&cfg, "no matching terms here at all", 2);
        let ids: Vec<&str> = selected.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["chitchat", "weather"]);
    }

    #[test]
    fn synthesize_single_survivor_returns_its_text_unchanged() {
        let ranked = vec![("yelp".to_string(), 1.0, "Try Nopa.".to_string())];
        assert_eq!(synthesize(&ranked), "Try Nopa.");
    }

    #[test]
    fn synthesize_multiple_survivors_leads_with_highest_weight() {
        let ranked = vec![
            ("yelp".to_string(), 1.0, "Try Nopa.".to_string()),
            ("weather".to_string(), 0.5, "It's sunny.".to_string()),
        ];
        let out = synthesize(&ranked);
        assert!(out.starts_with("Try Nopa."));
        assert!(out.contains("weather"));
    }
}
