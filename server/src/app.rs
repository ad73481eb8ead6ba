//! Axum app: shared state and route table.

use std::sync::Arc;

use axum::routing::post;
use axum::Router;

use maestro_orchestrator::Orchestrator;

use crate::handlers::{chat, chat_stream, simulate};

pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        .route("/agents/:id/chat", post(chat))
        .route("/agents/:id/chat/stream", post(chat_stream))
        .route("/agents/:id/simulate", post(simulate))
        .with_state(orchestrator)
}
