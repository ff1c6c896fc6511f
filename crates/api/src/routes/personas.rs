//! Route definitions for the `/personas` resource.

use axum::routing::{get, put};
use axum::Router;

use crate::handlers::personas;
use crate::state::AppState;

/// Routes mounted at `/personas`.
///
/// ```text
/// GET, POST    /                 -> list, create
/// GET, PATCH   /{id}             -> get_by_id, update
/// PUT          /{id}/ai-config   -> set_ai_config
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(personas::list).post(personas::create))
        .route("/{id}", get(personas::get_by_id).patch(personas::update))
        .route("/{id}/ai-config", put(personas::set_ai_config))
}
