//! Route definitions for the `/conversations` resource.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::{conversations, messages};
use crate::state::AppState;

/// Routes mounted at `/conversations`.
///
/// ```text
/// GET, POST            /                                        -> list, create
/// GET, PATCH, DELETE   /{id}                                    -> get_by_id, update, delete
/// POST                 /{id}/participants                       -> add_participant
/// DELETE               /{id}/participants/{persona_id}          -> remove_participant
/// POST                 /{id}/participants/{persona_id}/leave    -> leave
/// POST                 /{id}/close | /pause | /resume           -> lifecycle
/// GET, POST            /{id}/messages                           -> messages::{list, create}
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(conversations::list).post(conversations::create))
        .route(
            "/{id}",
            get(conversations::get_by_id)
                .patch(conversations::update)
                .delete(conversations::delete),
        )
        .route("/{id}/participants", post(conversations::add_participant))
        .route(
            "/{id}/participants/{persona_id}",
            delete(conversations::remove_participant),
        )
        .route(
            "/{id}/participants/{persona_id}/leave",
            post(conversations::leave),
        )
        .route("/{id}/close", post(conversations::close))
        .route("/{id}/pause", post(conversations::pause))
        .route("/{id}/resume", post(conversations::resume))
        .route(
            "/{id}/messages",
            get(messages::list).post(messages::create),
        )
}
