use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use parlor_core::game::GameError;
use parlor_core::types::DbId;
use parlor_db::StoreError;
use serde_json::json;

/// Errors returned by the match endpoints.
///
/// Rendered as `{ "error": "<message>" }`.
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error("Match {0} not found")]
    MatchNotFound(DbId),

    #[error(transparent)]
    Game(#[from] GameError),

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<JsonRejection> for MatchError {
    fn from(rejection: JsonRejection) -> Self {
        MatchError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for MatchError {
    fn from(rejection: PathRejection) -> Self {
        MatchError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for MatchError {
    fn into_response(self) -> Response {
        let status = match &self {
            MatchError::MatchNotFound(_) | MatchError::Game(GameError::RoundNotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            MatchError::Game(_) | MatchError::BadRequest(_) => StatusCode::BAD_REQUEST,
            MatchError::Store(err) => {
                tracing::error!(error = %err, "Match store failure");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    axum::Json(json!({ "error": "Internal server error" })),
                )
                    .into_response();
            }
        };
        (status, axum::Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_errors_map_to_client_statuses() {
        assert_eq!(
            MatchError::Game(GameError::RoundNotFound(9)).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            MatchError::Game(GameError::SelfVote).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            MatchError::MatchNotFound(DbId::nil()).into_response().status(),
            StatusCode::NOT_FOUND
        );
    }
}
