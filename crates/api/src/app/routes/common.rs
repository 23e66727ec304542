use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use microfin_intelligence::IntelligenceResult;

use crate::app::errors;

/// Runs a blocking intelligence call off the async runtime and maps the
/// outcome to a JSON response.
pub async fn run_blocking<T, F>(task: F) -> axum::response::Response
where
    F: FnOnce() -> IntelligenceResult<T> + Send + 'static,
    T: Serialize + Send + 'static,
{
    match tokio::task::spawn_blocking(task).await {
        Ok(Ok(value)) => (StatusCode::OK, Json(value)).into_response(),
        Ok(Err(e)) => errors::intelligence_error_to_response(e),
        Err(e) => {
            tracing::error!(error = %e, "intelligence task aborted");
            errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "request aborted",
            )
        }
    }
}
