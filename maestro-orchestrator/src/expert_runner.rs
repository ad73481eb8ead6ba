//! Wraps `ReactRunner::invoke_with_config` with the turn-bound clamp and
//! output coercion the orchestration layer needs: every expert call returns
//! renderable text, whatever shape its underlying tool/LLM output took.

use maestro_core::memory::RunnableConfig;
use maestro_core::{ReactRunError, ReactRunner};
use serde_json::Value;

use crate::error::OrchestratorError;

/// Internal floor on `max_steps`: a multi-tool path needs 3-4 turns plus
/// overhead for think/act/observe bookkeeping, so anything lower is rounded
/// up rather than rejected.
const MIN_MAX_STEPS: u32 = 10;

/// One expert invocation's result: the coerced final text plus the raw
/// message count consumed, used by orchestrators to build trace entries.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub final_output: String,
    pub turn_count: u32,
}

/// Runs `worker` against `input` with `session_id` (if any) and a clamped
/// `max_steps` bound, returning coerced text.
pub async fn run(
    worker: &ReactRunner,
    expert_id: &str,
    input: &str,
    session_id: Option<&str>,
    max_steps: u32,
) -> Result<RunResult, OrchestratorError> {
    let clamped = max_steps.max(MIN_MAX_STEPS);
    let config = Some(RunnableConfig {
        thread_id: session_id.map(|s| s.to_string()),
        recursion_limit: Some(clamped),
        ..RunnableConfig::default()
    });

    let final_state = worker
        .invoke_with_config(input, config)
        .await
        .map_err(|e| map_run_error(expert_id, clamped, e))?;

    let final_output = final_state
        .last_assistant_reply()
        .map(coerce_output)
        .unwrap_or_else(|| "(no response)".to_string());

    Ok(RunResult {
        final_output,
        turn_count: final_state.turn_count,
    })
}

fn map_run_error(expert_id: &str, max_steps: u32, err: ReactRunError) -> OrchestratorError {
    let text = err.to_string();
    if text.contains("recursion limit") {
        return OrchestratorError::MaxTurnsExceeded {
            expert_id: expert_id.to_string(),
            max_steps,
        };
    }
    match err {
        ReactRunError::Compilation(e) => OrchestratorError::Config(e.to_string()),
        ReactRunError::Checkpoint(e) => OrchestratorError::Config(e.to_string()),
        ReactRunError::Execution(e) => OrchestratorError::Agent(e),
        ReactRunError::StreamEndedWithoutState => {
            OrchestratorError::Orchestration("stream ended without a final state".to_string())
        }
    }
}

/// Coerces a possibly-structured assistant reply into renderable text.
///
/// Assistant replies in this engine are always plain `String`s (there is no
/// structured-output mode on `Message::Assistant`), so the coercion this
/// orchestration layer needs operates one level down: when that string is
/// itself a JSON document (a tool returned structured data and the model
/// echoed it verbatim), walk it the way a nested payload is unwrapped rather
/// than dumping raw JSON at the caller.
fn coerce_output(text: &str) -> String {
    let trimmed = text.trim();
    let Ok(value) = serde_json::from_str::<Value>(trimmed) else {
        return text.to_string();
    };
    coerce_value(&value).unwrap_or_else(|| text.to_string())
}

const TEXT_FIELD_CANDIDATES: &[&str] = &["response", "answer", "content", "text", "message", "output"];

fn coerce_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => {
            for key in TEXT_FIELD_CANDIDATES {
                if let Some(found) = map.get(*key) {
                    if let Some(text) = coerce_value(found) {
                        return Some(text);
                    }
                }
            }
            // Interactive-map payload: a discriminant tag plus structured
            // fields with no plain-text field — render as fenced JSON so
            // callers at least see structure instead of losing the payload.
            if map.contains_key("type") || map.contains_key("kind") {
                return serde_json::to_string_pretty(value)
                    .ok()
                    .map(|json| format!("```json\n{json}\n```"));
            }
            serde_json::to_string_pretty(value)
                .ok()
                .map(|json| format!("```json\n{json}\n```"))
        }
        Value::Array(items) => items.iter().find_map(coerce_value),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passes_through_unchanged() {
        assert_eq!(coerce_output("just a normal reply"), "just a normal reply");
    }

    #[test]
    fn json_with_response_field_unwraps_to_its_text() {
        let out = coerce_output(r#"{"response": "the weather is sunny"}"#);
        assert_eq!(out, "the weather is sunny");
    }

    #[test]
    fn nested_answer_field_is_preferred_over_fenced_json() {
        let out = coerce_output(r#"{"answer": {"text": "42"}}"#);
        assert_eq!(out, "42");
    }

    #[test]
    fn structured_payload_with_no_text_field_renders_as_fenced_json() {
        let out = coerce_output(r#"{"type": "card", "title": "Restaurant"}"#);
        assert!(out.starts_with("```json"));
        assert!(out.contains("\"title\""));
    }

    #[test]
    fn list_takes_first_non_empty_element() {
        let out = coerce_output(r#"[null, {"content": "second item wins"}]"#);
        assert_eq!(out, "second item wins");
    }

    #[test]
    fn max_steps_below_floor_is_rounded_up() {
        assert_eq!(MIN_MAX_STEPS.max(1), MIN_MAX_STEPS);
        assert_eq!(MIN_MAX_STEPS.max(50), 50);
    }
}
