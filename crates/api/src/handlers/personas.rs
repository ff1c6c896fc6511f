//! Handlers for the `/personas` resource.
//!
//! Owners manage their own personas; admins manage all of them and are the
//! only ones who can turn a persona into an AI agent.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use parlor_core::error::CoreError;
use parlor_core::pagination::{clamp_limit, clamp_offset, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use parlor_core::permissions::PermissionEngine;
use parlor_core::persona::{AiConfig, Persona};
use parlor_core::types::DbId;
use parlor_db::models::persona::{CreatePersona, UpdatePersona};
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::extract::{AppPath, AppQuery, ValidJson};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePersonaRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePersonaRequest {
    #[validate(length(min = 1, max = 100, message = "Name cannot be empty"))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

/// Body for `PUT /personas/{id}/ai-config`.
#[derive(Debug, Deserialize, Validate)]
pub struct AiConfigRequest {
    pub is_ai_agent: bool,
    pub ai_config: Option<AiConfig>,
}

/// GET /api/personas
///
/// The caller's own personas; admins get every persona, paginated.
pub async fn list(
    auth: AuthUser,
    State(state): State<AppState>,
    AppQuery(params): AppQuery<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<Persona>>>> {
    let personas = if PermissionEngine::is_super_admin(&auth.actor()) {
        let limit = clamp_limit(params.limit, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE);
        let offset = clamp_offset(params.offset);
        state.personas.list_all(limit, offset).await?
    } else {
        state.personas.list_by_owner(auth.user_id).await?
    };
    Ok(Json(DataResponse { data: personas }))
}

/// POST /api/personas
pub async fn create(
    auth: AuthUser,
    State(state): State<AppState>,
    ValidJson(input): ValidJson<CreatePersonaRequest>,
) -> AppResult<(StatusCode, Json<Persona>)> {
    let persona = state
        .personas
        .create(&CreatePersona {
            owner_id: auth.user_id,
            name: input.name.trim().to_string(),
            description: input.description,
            is_ai_agent: false,
            ai_config: None,
        })
        .await?;
    tracing::info!(persona_id = %persona.id, user_id = %auth.user_id, "Persona created");
    Ok((StatusCode::CREATED, Json(persona)))
}

/// GET /api/personas/{id}
pub async fn get_by_id(
    auth: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<DbId>,
) -> AppResult<Json<Persona>> {
    let persona = load_managed(&state, &auth, id).await?;
    Ok(Json(persona))
}

/// PATCH /api/personas/{id}
pub async fn update(
    auth: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<DbId>,
    ValidJson(input): ValidJson<UpdatePersonaRequest>,
) -> AppResult<Json<Persona>> {
    load_managed(&state, &auth, id).await?;
    let patch = UpdatePersona {
        name: input.name.map(|n| n.trim().to_string()),
        description: input.description,
    };
    let persona = state
        .personas
        .update(id, &patch)
        .await?
        .ok_or(AppError::Core(CoreError::not_found("Persona", id)))?;
    Ok(Json(persona))
}

/// PUT /api/personas/{id}/ai-config
///
/// Admin only. Clearing `is_ai_agent` also drops the capability flags.
pub async fn set_ai_config(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    AppPath(id): AppPath<DbId>,
    ValidJson(input): ValidJson<AiConfigRequest>,
) -> AppResult<Json<Persona>> {
    let ai_config = if input.is_ai_agent {
        Some(input.ai_config.unwrap_or_default())
    } else {
        None
    };
    let persona = state
        .personas
        .set_ai_config(id, input.is_ai_agent, ai_config.as_ref())
        .await?
        .ok_or(AppError::Core(CoreError::not_found("Persona", id)))?;
    tracing::info!(
        persona_id = %id,
        admin_id = %admin.user_id,
        is_ai_agent = input.is_ai_agent,
        "Persona AI config updated",
    );
    Ok(Json(persona))
}

/// A persona the caller owns, or any persona for an admin.
async fn load_managed(state: &AppState, auth: &AuthUser, id: DbId) -> AppResult<Persona> {
    let persona = state
        .personas
        .find_by_id(id)
        .await?
        .ok_or(AppError::Core(CoreError::not_found("Persona", id)))?;
    if !PermissionEngine::can_manage_persona_as(&auth.actor(), &persona) {
        return Err(AppError::Core(CoreError::Forbidden(
            "You do not own this persona".into(),
        )));
    }
    Ok(persona)
}
