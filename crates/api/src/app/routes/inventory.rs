use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    routing::get,
    Router,
};

use crate::app::dto;
use crate::app::routes::common::run_blocking;
use crate::app::services::Intelligence;

pub fn router() -> Router {
    Router::new()
        .route("/forecast/:product_id", get(get_forecast))
        .route("/reorder-point/:product_id", get(get_reorder_point))
        .route("/recommendations", get(get_recommendations))
}

pub async fn get_forecast(
    Extension(intelligence): Extension<Arc<Intelligence>>,
    Path(product_id): Path<String>,
    Query(query): Query<dto::ForecastQuery>,
) -> axum::response::Response {
    let product_id = match dto::parse_product_id(&product_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let branch_id = match dto::parse_branch_id(query.branch_id.as_deref()) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let config = intelligence.config();
    let method = match dto::parse_method(query.method.as_deref(), config.default_method) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let days = match dto::parse_horizon(query.days, config.max_horizon_days) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    run_blocking(move || intelligence.forecast(product_id, branch_id, days, method)).await
}

pub async fn get_reorder_point(
    Extension(intelligence): Extension<Arc<Intelligence>>,
    Path(product_id): Path<String>,
    Query(query): Query<dto::ReorderPointQuery>,
) -> axum::response::Response {
    let product_id = match dto::parse_product_id(&product_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let branch_id = match dto::parse_branch_id(query.branch_id.as_deref()) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let lead_time = match dto::parse_lead_time(query.lead_time) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    run_blocking(move || intelligence.reorder_point(product_id, branch_id, lead_time)).await
}

pub async fn get_recommendations(
    Extension(intelligence): Extension<Arc<Intelligence>>,
    Query(query): Query<dto::RecommendationsQuery>,
) -> axum::response::Response {
    let branch_id = match dto::parse_branch_id(query.branch_id.as_deref()) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let products = match dto::parse_product_ids(query.product_ids.as_deref()) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let page = dto::page(&query);

    run_blocking(move || intelligence.recommendations(branch_id, &products, page)).await
}
