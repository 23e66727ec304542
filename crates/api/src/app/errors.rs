use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use microfin_intelligence::IntelligenceError;

pub fn intelligence_error_to_response(err: IntelligenceError) -> axum::response::Response {
    let message = err.to_string();
    if err.is_client_error() {
        tracing::debug!(error = %message, "rejected request");
    } else {
        tracing::warn!(error = %message, "request failed");
    }
    match err {
        IntelligenceError::InvalidInput(_) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_input", message)
        }
        IntelligenceError::InvalidHorizon { .. } => {
            json_error(StatusCode::BAD_REQUEST, "invalid_horizon", message)
        }
        IntelligenceError::UnsupportedMethod(_) => {
            json_error(StatusCode::BAD_REQUEST, "unsupported_method", message)
        }
        IntelligenceError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", message),
        IntelligenceError::InsufficientData {
            required,
            available,
        } => {
            let missing = required.saturating_sub(available);
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                axum::Json(json!({
                    "error": "insufficient_data",
                    "message": format!("need {missing} more days of history"),
                    "required_days": required,
                    "available_days": available,
                    "missing_days": missing,
                })),
            )
                .into_response()
        }
        IntelligenceError::ModelFit(_) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "model_fit_failed", message)
        }
        IntelligenceError::Source(_) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "source_unavailable", message)
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(err: IntelligenceError) -> StatusCode {
        intelligence_error_to_response(err).status()
    }

    #[test]
    fn maps_every_error_kind_to_its_status() {
        assert_eq!(status(IntelligenceError::invalid_input("x")), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(IntelligenceError::InvalidHorizon { requested: 0, max: 365 }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(IntelligenceError::UnsupportedMethod("prophet".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status(IntelligenceError::NotFound("product".into())), StatusCode::NOT_FOUND);
        assert_eq!(
            status(IntelligenceError::insufficient(14, 5)),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status(IntelligenceError::model_fit("no candidate converged")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status(IntelligenceError::Source("connection refused".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
