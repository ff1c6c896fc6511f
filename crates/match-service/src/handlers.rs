//! Handlers for `/matches`.
//!
//! Each write loads the match, applies one move through the game state
//! machine and saves the whole document back.

use std::collections::BTreeMap;

use axum::extract::{FromRequest, FromRequestParts, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use parlor_core::game::Match;
use parlor_core::types::DbId;
use parlor_events::{event_types, DomainEvent};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::MatchError;
use crate::state::MatchState;

/// `Json<T>` whose rejection is a [`MatchError::BadRequest`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(MatchError))]
pub struct MatchJson<T>(pub T);

/// `Path<T>` whose rejection is a [`MatchError::BadRequest`].
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(MatchError))]
pub struct MatchPath<T>(pub T);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMatchRequest {
    pub player_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponseRequest {
    pub round_number: u32,
    pub identity: String,
    pub response: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitVoteRequest {
    pub round_number: u32,
    pub voter: String,
    pub voted_for: String,
}

/// A match plus the running vote tally.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchView {
    #[serde(flatten)]
    pub game: Match,
    pub vote_tally: BTreeMap<String, u32>,
}

impl From<Match> for MatchView {
    fn from(game: Match) -> Self {
        let vote_tally = game.tally();
        Self { game, vote_tally }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    #[serde(flatten)]
    pub view: MatchView,
    pub round_completed: bool,
    pub match_completed: bool,
}

type MatchResult<T> = Result<T, MatchError>;

/// POST /matches
pub async fn create_match(
    State(state): State<MatchState>,
    MatchJson(input): MatchJson<CreateMatchRequest>,
) -> MatchResult<(StatusCode, Json<MatchView>)> {
    let game = {
        let mut rng = rand::rng();
        Match::new(DbId::new_v4(), &input.player_name, Utc::now(), &mut rng)?
    };
    state.store.save(&game).await?;

    tracing::info!(match_id = %game.match_id, "Match created");
    state.event_bus.publish(
        DomainEvent::new(event_types::MATCH_CREATED)
            .with_subject("match", game.match_id)
            .with_payload(json!({ "player_name": input.player_name.trim() })),
    );

    Ok((StatusCode::CREATED, Json(game.into())))
}

/// GET /matches/{id}
pub async fn get_match(
    State(state): State<MatchState>,
    MatchPath(match_id): MatchPath<DbId>,
) -> MatchResult<Json<MatchView>> {
    let game = load(&state, match_id).await?;
    Ok(Json(game.into()))
}

/// POST /matches/{id}/responses
///
/// Scripted participants answer right after the human.
pub async fn submit_response(
    State(state): State<MatchState>,
    MatchPath(match_id): MatchPath<DbId>,
    MatchJson(input): MatchJson<SubmitResponseRequest>,
) -> MatchResult<Json<MatchView>> {
    let mut game = load(&state, match_id).await?;
    {
        let mut rng = rand::rng();
        game.submit_response(
            input.round_number,
            &input.identity,
            &input.response,
            Utc::now(),
            &mut rng,
        )?;
    }
    state.store.save(&game).await?;

    tracing::debug!(%match_id, round = input.round_number, "Responses recorded");
    Ok(Json(game.into()))
}

/// POST /matches/{id}/votes
///
/// Scripted participants vote right after the human; a full set of votes
/// completes the round.
pub async fn submit_vote(
    State(state): State<MatchState>,
    MatchPath(match_id): MatchPath<DbId>,
    MatchJson(input): MatchJson<SubmitVoteRequest>,
) -> MatchResult<Json<VoteResponse>> {
    let mut game = load(&state, match_id).await?;
    let outcome = {
        let mut rng = rand::rng();
        game.submit_vote(
            input.round_number,
            &input.voter,
            &input.voted_for,
            Utc::now(),
            &mut rng,
        )?
    };
    state.store.save(&game).await?;

    if outcome.round_completed {
        tracing::info!(%match_id, round = input.round_number, "Round completed");
        state.event_bus.publish(
            DomainEvent::new(event_types::MATCH_ROUND_COMPLETED)
                .with_subject("match", match_id)
                .with_payload(json!({ "round_number": input.round_number })),
        );
    }
    if outcome.match_completed {
        tracing::info!(%match_id, "Match completed");
        state.event_bus.publish(
            DomainEvent::new(event_types::MATCH_COMPLETED)
                .with_subject("match", match_id)
                .with_payload(json!({ "vote_tally": game.tally() })),
        );
    }

    Ok(Json(VoteResponse {
        view: game.into(),
        round_completed: outcome.round_completed,
        match_completed: outcome.match_completed,
    }))
}

async fn load(state: &MatchState, match_id: DbId) -> MatchResult<Match> {
    state
        .store
        .get(match_id)
        .await?
        .ok_or(MatchError::MatchNotFound(match_id))
}
