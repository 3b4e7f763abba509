//! astrosetu-lambda
//!
//! HTTP surface of the report-generation service: start, status, worker and
//! record lookup endpoints over a shared [`state::AppState`]. Runs under AWS
//! Lambda or as a plain local listener.

use axum::Router;
use axum::middleware as axum_mw;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

use state::AppState;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route(
            "/report-generation-start",
            post(routes::reports::start_report),
        )
        .route(
            "/report-generation-status",
            get(routes::reports::report_status),
        )
        .route("/report-worker", post(routes::worker::run_worker))
        .route("/reports/{id}", get(routes::reports::get_report))
        .layer(axum_mw::from_fn(middleware::audit::audit_log))
        .layer(cors)
        .with_state(state)
}
