// SPDX-License-Identifier: MIT

//! Invitation inbox routes: the invitee's side of email invitations.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::Invitation;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/invitations", get(get_invitations))
        .route("/api/invitations/{invitation_id}/accept", post(accept))
        .route("/api/invitations/{invitation_id}/decline", post(decline))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct InvitationsResponse {
    pub invitations: Vec<Invitation>,
}

/// Pending invitations addressed to any of the requester's verified emails.
async fn get_invitations(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<InvitationsResponse>> {
    let emails = state.clerk.verified_emails(&user.clerk_id).await?;
    let invitations = state.db.get_pending_invitations_for_emails(&emails).await?;

    Ok(Json(InvitationsResponse { invitations }))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct InvitationResponse {
    pub invitation: Invitation,
    /// Present after acceptance: the list the requester now collaborates on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_id: Option<String>,
}

/// Accept an invitation addressed to the requester.
async fn accept(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(invitation_id): Path<String>,
) -> Result<Json<InvitationResponse>> {
    let (invitation, list) = state
        .collab
        .accept_invitation(&invitation_id, &user.clerk_id)
        .await?;

    tracing::info!(
        invitation_id,
        list_id = %list.id,
        clerk_id = %user.clerk_id,
        "Invitation accepted"
    );

    Ok(Json(InvitationResponse {
        invitation,
        list_id: Some(list.id),
    }))
}

/// Decline an invitation addressed to the requester.
async fn decline(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(invitation_id): Path<String>,
) -> Result<Json<InvitationResponse>> {
    let invitation = state
        .collab
        .decline_invitation(&invitation_id, &user.clerk_id)
        .await?;

    Ok(Json(InvitationResponse {
        invitation,
        list_id: None,
    }))
}
