pub mod auth;
pub mod conversations;
pub mod health;
pub mod personas;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/register                                          register (public)
/// /auth/login                                             login (public)
/// /auth/verify-email                                      redeem verification token (public)
/// /auth/forgot-password                                   request reset email (public)
/// /auth/reset-password                                    redeem reset token (public)
/// /auth/me                                                get, update, delete own account
///
/// /personas                                               list, create
/// /personas/{id}                                          get, update (owner or admin)
/// /personas/{id}/ai-config                                set AI-agent flags (admin only)
///
/// /conversations                                          query, create
/// /conversations/{id}                                     get, update, soft delete
/// /conversations/{id}/participants                        add
/// /conversations/{id}/participants/{persona_id}           remove
/// /conversations/{id}/participants/{persona_id}/leave     leave
/// /conversations/{id}/close                               close (POST)
/// /conversations/{id}/pause                               pause (POST)
/// /conversations/{id}/resume                              resume (POST)
/// /conversations/{id}/messages                            list, post
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/personas", personas::router())
        .nest("/conversations", conversations::router())
}
