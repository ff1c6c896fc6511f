use std::time::Duration;

use axum::http::{HeaderName, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::handlers;
use crate::state::MatchState;

/// The match service router with its middleware stack.
///
/// ```text
/// POST /matches                   -> create_match
/// GET  /matches/{id}              -> get_match
/// POST /matches/{id}/responses    -> submit_response
/// POST /matches/{id}/votes        -> submit_vote
/// ```
///
/// CORS is wide open; preflight requests are answered by the CORS layer.
pub fn build_match_router(state: MatchState, request_timeout_secs: u64) -> Router {
    let request_id_header = HeaderName::from_static("x-request-id");

    Router::new()
        .route("/matches", post(handlers::create_match))
        .route("/matches/{id}", get(handlers::get_match))
        .route("/matches/{id}/responses", post(handlers::submit_response))
        .route("/matches/{id}/votes", post(handlers::submit_vote))
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(request_timeout_secs),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
