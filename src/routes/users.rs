// SPDX-License-Identifier: MIT

//! User profile and follow routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Follow, FollowStatus};
use crate::time_utils::now_rfc3339;
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
        .route("/api/me", get(get_me))
        .route(
            "/api/users/{clerk_id}/follow",
            post(follow_user).delete(unfollow_user),
        )
}

// ─── Profile ─────────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MeResponse {
    pub clerk_id: String,
    pub username: String,
    pub display_name: String,
    pub image_url: Option<String>,
    pub follower_count: u32,
    pub following_count: u32,
    pub pinned_count: u32,
}

/// Current user's profile, fetched fresh from the identity provider.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<MeResponse>> {
    let profile = state.clerk.get_user(&user.clerk_id).await?;

    let followers = state.db.get_followers(&user.clerk_id).await?;
    let following = state.db.get_following(&user.clerk_id).await?;
    let pins = state.db.get_pins_for_user(&user.clerk_id).await?;

    Ok(Json(MeResponse {
        clerk_id: profile.id.clone(),
        username: profile.username_or_id(),
        display_name: profile.display_name(),
        image_url: profile.image_url.clone(),
        follower_count: followers.len() as u32,
        following_count: following.len() as u32,
        pinned_count: pins.len() as u32,
    }))
}

// ─── Follows ─────────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct FollowResponse {
    pub following: bool,
}

/// Follow another user. Idempotent.
async fn follow_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(clerk_id): Path<String>,
) -> Result<Json<FollowResponse>> {
    if clerk_id == user.clerk_id {
        return Err(AppError::BadRequest("Cannot follow yourself".to_string()));
    }

    if state.db.get_follow(&user.clerk_id, &clerk_id).await?.is_some() {
        return Ok(Json(FollowResponse { following: true }));
    }

    // Confirm the target exists with the identity provider
    state.clerk.get_user(&clerk_id).await?;

    let follow = Follow {
        follower_id: user.clerk_id.clone(),
        following_id: clerk_id,
        status: FollowStatus::Active,
        created_at: now_rfc3339(),
    };
    state.db.set_follow(&follow).await?;

    Ok(Json(FollowResponse { following: true }))
}

/// Unfollow a user. Idempotent.
async fn unfollow_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(clerk_id): Path<String>,
) -> Result<Json<FollowResponse>> {
    state.db.delete_follow(&user.clerk_id, &clerk_id).await?;
    Ok(Json(FollowResponse { following: false }))
}
