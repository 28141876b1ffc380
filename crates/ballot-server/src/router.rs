use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::state::AppState;

/// Build the axum router with all ballot endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route("/v1/info", get(handler::info_handler))
        .route("/v1/proposals", get(handler::proposals_handler))
        .route("/v1/winner", get(handler::winner_handler))
        .route("/v1/participants/:id", get(handler::participant_handler))
        .route("/v1/receipts", get(handler::receipts_handler))
        .route("/v1/rights", post(handler::grant_right_handler))
        .route("/v1/votes", post(handler::vote_handler))
        .route("/v1/delegations", post(handler::delegation_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
