// SPDX-License-Identifier: MIT

//! Collaborator management routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Collaborator, CollaboratorRole, Invitation, List};
use crate::services::access;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// Invitations a single user may send per hour.
const INVITE_RATE_LIMIT_KEY: &str = "invite";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/lists/{list_id}/collaborators",
            get(get_collaborators).post(invite_collaborator),
        )
        .route(
            "/api/lists/{list_id}/collaborators/{target}",
            put(put_collaborator)
                .patch(patch_collaborator_role)
                .delete(remove_collaborator),
        )
}

// ─── Listing ─────────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CollaboratorsResponse {
    pub collaborators: Vec<Collaborator>,
    /// Outstanding email invitations; only included for requesters who can
    /// manage collaborators
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_invitations: Option<Vec<Invitation>>,
}

/// List collaborators on a list the requester can view.
async fn get_collaborators(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(list_id): Path<String>,
) -> Result<Json<CollaboratorsResponse>> {
    let list = require_viewable(&state, &list_id, &user).await?;

    let pending_invitations = if access::can_manage_collaborators(&list, Some(&user.clerk_id)) {
        let invitations = state
            .db
            .get_invitations_for_list(&list_id)
            .await?
            .into_iter()
            .filter(|i| i.status == crate::models::InvitationStatus::Pending)
            .collect();
        Some(invitations)
    } else {
        None
    };

    Ok(Json(CollaboratorsResponse {
        collaborators: list.collaborators,
        pending_invitations,
    }))
}

// ─── Inviting ────────────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct InviteRequest {
    #[validate(email)]
    pub email: String,
    pub role: CollaboratorRole,
}

/// Invite a collaborator by email. Rate-limited per inviter.
async fn invite_collaborator(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(list_id): Path<String>,
    Json(payload): Json<InviteRequest>,
) -> Result<(StatusCode, Json<Invitation>)> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let rate_key = format!("{}:{}", INVITE_RATE_LIMIT_KEY, user.clerk_id);
    if !state.rate_limiter.check(&rate_key) {
        tracing::warn!(clerk_id = %user.clerk_id, "Invite rate limit hit");
        return Err(AppError::RateLimited);
    }

    let invitation = state
        .collab
        .invite_by_email(&list_id, &payload.email, payload.role, &user.clerk_id)
        .await?;

    Ok((StatusCode::CREATED, Json(invitation)))
}

// ─── Accepting / Role Changes ────────────────────────────────

#[derive(Deserialize, Default)]
pub struct PutCollaboratorRequest {
    /// When present, this is a role change; when absent, the requester is
    /// accepting their own direct invite
    pub role: Option<CollaboratorRole>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CollaboratorUpdateResponse {
    pub list_id: String,
    pub collaborators: Vec<Collaborator>,
}

/// Overloaded collaborator update.
///
/// Without a role in the body, the requester accepts their own pending
/// direct invite (the path target must be themselves). With a role, this is
/// a role change and requires manage permission.
async fn put_collaborator(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((list_id, target)): Path<(String, String)>,
    payload: Option<Json<PutCollaboratorRequest>>,
) -> Result<Json<CollaboratorUpdateResponse>> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();

    let list = match payload.role {
        Some(role) => {
            state
                .collab
                .update_collaborator_role(&list_id, &target, role, &user.clerk_id)
                .await?
        }
        None => {
            if target != user.clerk_id {
                return Err(AppError::Forbidden(
                    "Only the invited user can accept a direct invite".to_string(),
                ));
            }
            state
                .collab
                .accept_direct_invite(&list_id, &user.clerk_id)
                .await?
        }
    };

    Ok(Json(update_response(list)))
}

#[derive(Deserialize)]
pub struct RoleUpdateRequest {
    pub role: CollaboratorRole,
}

/// Change a collaborator's role.
async fn patch_collaborator_role(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((list_id, target)): Path<(String, String)>,
    Json(payload): Json<RoleUpdateRequest>,
) -> Result<Json<CollaboratorUpdateResponse>> {
    let list = state
        .collab
        .update_collaborator_role(&list_id, &target, payload.role, &user.clerk_id)
        .await?;

    Ok(Json(update_response(list)))
}

/// Remove a collaborator, matched by clerk id or invite email.
async fn remove_collaborator(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((list_id, target)): Path<(String, String)>,
) -> Result<Json<CollaboratorUpdateResponse>> {
    let list = state
        .collab
        .remove_collaborator(&list_id, &target, &user.clerk_id)
        .await?;

    Ok(Json(update_response(list)))
}

// ─── Helpers ─────────────────────────────────────────────────

fn update_response(list: List) -> CollaboratorUpdateResponse {
    CollaboratorUpdateResponse {
        list_id: list.id,
        collaborators: list.collaborators,
    }
}

async fn require_viewable(
    state: &AppState,
    list_id: &str,
    user: &AuthUser,
) -> Result<List> {
    let list = state
        .db
        .get_list(list_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("List {} not found", list_id)))?;

    if !access::can_view(&list, Some(&user.clerk_id)) {
        return Err(AppError::NotFound(format!("List {} not found", list_id)));
    }
    Ok(list)
}
