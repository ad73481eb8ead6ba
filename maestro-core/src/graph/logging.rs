//! Free logging helpers for graph execution, used by `LoggingNodeMiddleware` and
//! by `StateGraph::with_node_logging` (see `agent::react::with_node_logging`).

use std::fmt::Debug;

/// Logs the start of a graph run.
pub fn log_graph_start(thread_id: Option<&str>) {
    tracing::info!(thread_id = thread_id.unwrap_or("-"), "graph run started");
}

/// Logs successful completion of a graph run.
pub fn log_graph_complete(thread_id: Option<&str>, steps: u32) {
    tracing::info!(
        thread_id = thread_id.unwrap_or("-"),
        steps,
        "graph run completed"
    );
}

/// Logs a graph run that ended in error.
pub fn log_graph_error(thread_id: Option<&str>, error: &str) {
    tracing::error!(thread_id = thread_id.unwrap_or("-"), error, "graph run failed");
}

/// Logs a node about to execute.
pub fn log_node_start(node_id: &str) {
    tracing::debug!(node_id, "node start");
}

/// Logs a node that finished executing, with its outcome.
pub fn log_node_complete(node_id: &str, ok: bool) {
    if ok {
        tracing::debug!(node_id, "node complete");
    } else {
        tracing::warn!(node_id, "node failed");
    }
}

/// Logs a state value at debug level, truncated so large states don't flood logs.
pub fn log_state_update<S: Debug>(node_id: &str, state: &S) {
    let rendered = format!("{state:?}");
    let truncated = if rendered.chars().count() > 500 {
        format!("{}...", rendered.chars().take(500).collect::<String>())
    } else {
        rendered
    };
    tracing::debug!(node_id, state = %truncated, "state updated");
}
