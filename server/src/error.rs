//! Maps `OrchestratorError` to HTTP responses at the boundary. The
//! orchestrator crate stays axum-free; this newtype is where the typed
//! taxonomy becomes `detail` / `error-code` / `timestamp` JSON.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use maestro_orchestrator::OrchestratorError;
use serde::Serialize;

pub struct ApiError(pub OrchestratorError);

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        Self(err)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct ErrorBody {
    detail: String,
    error_code: String,
    timestamp: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorBody {
            detail: self.0.to_string(),
            error_code: self.0.error_code().to_string(),
            timestamp: Utc::now().to_rfc3339(),
        };
        (status, axum::Json(body)).into_response()
    }
}
