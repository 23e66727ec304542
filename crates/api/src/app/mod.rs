//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: collaborator wiring (in-memory or Postgres source)
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: query parameters and parsing helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::Intelligence;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(intelligence: Arc<Intelligence>) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/inventory", routes::inventory::router())
        .layer(ServiceBuilder::new().layer(Extension(intelligence)))
}
