use axum::http::StatusCode;
use serde::Deserialize;

use microfin_core::{BranchId, ProductId};
use microfin_intelligence::{ForecastMethod, IntelligenceError, Page};

use crate::app::errors;

/// Forecast horizon when `days` is omitted.
pub const DEFAULT_FORECAST_DAYS: u32 = 30;

// -------------------------
// Query DTOs
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct ForecastQuery {
    pub days: Option<i64>,
    pub method: Option<String>,
    pub branch_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReorderPointQuery {
    pub lead_time: Option<i64>,
    pub branch_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecommendationsQuery {
    pub branch_id: Option<String>,
    /// Comma-separated product ids; empty or absent means every product.
    pub product_ids: Option<String>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

// -------------------------
// Parsing helpers
// -------------------------

pub fn parse_product_id(raw: &str) -> Result<ProductId, axum::response::Response> {
    raw.parse()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id"))
}

pub fn parse_branch_id(raw: Option<&str>) -> Result<Option<BranchId>, axum::response::Response> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(|_| {
            errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid branch id")
        }),
    }
}

pub fn parse_product_ids(raw: Option<&str>) -> Result<Vec<ProductId>, axum::response::Response> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_product_id)
        .collect()
}

pub fn parse_method(
    raw: Option<&str>,
    default: ForecastMethod,
) -> Result<ForecastMethod, axum::response::Response> {
    match raw {
        None => Ok(default),
        Some(s) => s.parse().map_err(errors::intelligence_error_to_response),
    }
}

/// Values that do not fit a day count are rejected quoting the raw value;
/// the 1..=max range itself is checked by the engine.
pub fn parse_horizon(raw: Option<i64>, max: u32) -> Result<u32, axum::response::Response> {
    let days = raw.unwrap_or(i64::from(DEFAULT_FORECAST_DAYS));
    u32::try_from(days).map_err(|_| {
        errors::intelligence_error_to_response(IntelligenceError::invalid_input(format!(
            "days must be between 1 and {max} (got {days})"
        )))
    })
}

pub fn parse_lead_time(raw: Option<i64>) -> Result<i64, axum::response::Response> {
    raw.ok_or_else(|| {
        errors::intelligence_error_to_response(IntelligenceError::invalid_input(
            "lead_time is required",
        ))
    })
}

pub fn page(query: &RecommendationsQuery) -> Page {
    let default = Page::default();
    Page::new(
        query.offset.unwrap_or(default.offset),
        query.limit.unwrap_or(default.limit),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_ids_skip_blanks_and_reject_garbage() {
        let a = ProductId::new();
        let b = ProductId::new();
        let raw = format!(" {a}, ,{b},");
        assert_eq!(parse_product_ids(Some(&raw)).unwrap(), vec![a, b]);
        assert!(parse_product_ids(None).unwrap().is_empty());
        assert!(parse_product_ids(Some("nope")).is_err());
    }

    #[test]
    fn blank_branch_means_all_branches() {
        assert_eq!(parse_branch_id(Some("  ")).unwrap(), None);
        assert!(parse_branch_id(Some("x")).is_err());
    }

    #[test]
    fn horizon_defaults_to_a_week() {
        assert_eq!(parse_horizon(None, 365).unwrap(), DEFAULT_FORECAST_DAYS);
        assert_eq!(parse_horizon(Some(14), 365).unwrap(), 14);
    }

    #[tokio::test]
    async fn negative_horizon_is_rejected_with_the_raw_value() {
        let res = parse_horizon(Some(-1), 365).unwrap_err();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "invalid_input");
        let message = body["message"].as_str().unwrap();
        assert!(message.contains("got -1"), "{message}");
    }

    #[test]
    fn page_falls_back_to_defaults() {
        let q = RecommendationsQuery {
            offset: Some(3),
            ..Default::default()
        };
        assert_eq!(page(&q), Page::new(3, Page::default().limit));
    }
}
