// SPDX-License-Identifier: MIT

//! List CRUD, feed, and pin routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::{AuthUser, MaybeAuthUser};
use crate::models::{List, ListItem, ListOwner, ListStats, Pin, Privacy};
use crate::services::access;
use crate::services::EnrichedList;
use crate::time_utils::now_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

const MAX_PER_PAGE: u32 = 100;

/// Routes that permit anonymous requesters (gated per-list by the access
/// evaluator). The optional-auth layer is applied in routes/mod.rs.
pub fn viewer_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/lists/{list_id}", get(get_list))
}

/// Routes requiring authentication.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/lists", get(get_lists).post(create_list))
        .route(
            "/api/lists/{list_id}",
            axum::routing::put(update_list).delete(delete_list),
        )
        .route("/api/lists/{list_id}/pin", post(pin_list).delete(unpin_list))
}

// ─── Create ──────────────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct CreateListRequest {
    #[validate(length(min = 1, max = 120))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    pub privacy: Privacy,
    #[serde(default)]
    #[validate(nested)]
    pub items: Vec<ListItemPayload>,
}

#[derive(Deserialize, Validate)]
pub struct ListItemPayload {
    pub rank: u32,
    #[validate(length(min = 1, max = 300))]
    pub title: String,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Create a new list owned by the requester.
async fn create_list(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateListRequest>,
) -> Result<(StatusCode, Json<List>)> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    // Denormalize the owner username at creation; the identity-provider
    // webhook keeps it current afterwards
    let profile = state.clerk.get_user(&user.clerk_id).await?;

    let now = now_rfc3339();
    let mut items: Vec<ListItem> = payload
        .items
        .into_iter()
        .map(|i| ListItem {
            rank: i.rank,
            title: i.title,
            comment: i.comment,
        })
        .collect();
    items.sort_by_key(|i| i.rank);

    let list = List {
        id: uuid::Uuid::new_v4().to_string(),
        title: payload.title,
        description: payload.description,
        category: payload.category,
        privacy: payload.privacy,
        owner: ListOwner {
            user_id: None,
            clerk_id: user.clerk_id.clone(),
            username: profile.username_or_id(),
        },
        collaborators: vec![],
        collaborator_clerk_ids: vec![],
        items,
        stats: ListStats::default(),
        created_at: now.clone(),
        updated_at: now,
        edited_at: None,
    };

    state.db.set_list(&list).await?;
    tracing::info!(list_id = %list.id, owner = %user.clerk_id, "List created");

    Ok((StatusCode::CREATED, Json(list)))
}

// ─── Read ────────────────────────────────────────────────────

/// Get a single list, enriched for display.
///
/// Private lists the requester cannot view respond 404, hiding their
/// existence.
async fn get_list(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<MaybeAuthUser>,
    Path(list_id): Path<String>,
) -> Result<Json<EnrichedList>> {
    let list = state
        .db
        .get_list(&list_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("List {} not found", list_id)))?;

    let requester = user.as_ref().map(|u| u.clerk_id.as_str());
    if !access::can_view(&list, requester) {
        return Err(AppError::NotFound(format!("List {} not found", list_id)));
    }

    // View accounting runs off the response path
    if let Some(auth) = user.clone() {
        let state = state.clone();
        let list = list.clone();
        tokio::spawn(async move {
            state.enricher.record_view(&list, &auth.clerk_id).await;
        });
    }

    let enriched = state
        .enricher
        .enrich_lists(vec![list], requester)
        .await?;

    enriched
        .into_iter()
        .next()
        .map(Json)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Enrichment returned no list")))
}

#[derive(Deserialize)]
struct ListsQuery {
    /// Pagination: page number (1-indexed)
    #[serde(default = "default_page")]
    page: u32,
    /// Pagination: items per page
    #[serde(default = "default_per_page")]
    per_page: u32,
}

fn default_page() -> u32 {
    1
}
fn default_per_page() -> u32 {
    50
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ListsResponse {
    pub lists: Vec<EnrichedList>,
    pub page: u32,
    pub per_page: u32,
    pub total: u32,
}

/// Get the requester's feed: owned lists plus lists they collaborate on.
async fn get_lists(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<ListsQuery>,
) -> Result<Json<ListsResponse>> {
    if params.page < 1 {
        return Err(AppError::BadRequest(
            "Page must be greater than 0".to_string(),
        ));
    }
    let limit = params.per_page.min(MAX_PER_PAGE);

    let mut lists = state.db.get_lists_for_owner(&user.clerk_id).await?;
    let collaborating = state.db.get_lists_for_collaborator(&user.clerk_id).await?;

    // The membership index includes pending entries; the evaluator filters
    // them out here
    for list in collaborating {
        if access::can_view(&list, Some(&user.clerk_id)) {
            lists.push(list);
        }
    }
    lists.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
    lists.dedup_by(|a, b| a.id == b.id);

    let total = lists.len() as u32;

    // In-memory pagination; per-user list counts are small
    let start = (params.page as usize - 1)
        .checked_mul(limit as usize)
        .ok_or_else(|| AppError::BadRequest("Page number causes overflow".to_string()))?;
    let page_lists = if start < lists.len() {
        let end = start.saturating_add(limit as usize).min(lists.len());
        lists[start..end].to_vec()
    } else {
        vec![]
    };

    let enriched = state
        .enricher
        .enrich_lists(page_lists, Some(&user.clerk_id))
        .await?;

    Ok(Json(ListsResponse {
        lists: enriched,
        page: params.page,
        per_page: limit,
        total,
    }))
}

// ─── Update ──────────────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct UpdateListRequest {
    #[validate(length(min = 1, max = 120))]
    pub title: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub category: Option<String>,
    pub privacy: Option<Privacy>,
    #[validate(nested)]
    pub items: Option<Vec<ListItemPayload>>,
}

/// Update list content. Requires edit permission (owner, admin, or editor).
async fn update_list(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(list_id): Path<String>,
    Json(payload): Json<UpdateListRequest>,
) -> Result<Json<List>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let mut list = state
        .db
        .get_list(&list_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("List {} not found", list_id)))?;

    if !access::can_view(&list, Some(&user.clerk_id)) {
        return Err(AppError::NotFound(format!("List {} not found", list_id)));
    }
    if !access::can_edit(&list, Some(&user.clerk_id)) {
        return Err(AppError::Forbidden(
            "Editing requires the editor or admin role".to_string(),
        ));
    }

    if let Some(title) = payload.title {
        list.title = title;
    }
    if let Some(description) = payload.description {
        list.description = description;
    }
    if let Some(category) = payload.category {
        list.category = Some(category);
    }
    if let Some(privacy) = payload.privacy {
        list.privacy = privacy;
    }
    if let Some(items) = payload.items {
        let mut items: Vec<ListItem> = items
            .into_iter()
            .map(|i| ListItem {
                rank: i.rank,
                title: i.title,
                comment: i.comment,
            })
            .collect();
        items.sort_by_key(|i| i.rank);
        list.items = items;
    }

    let now = now_rfc3339();
    list.edited_at = Some(now.clone());
    list.updated_at = now;
    state.db.set_list(&list).await?;

    Ok(Json(list))
}

// ─── Delete ──────────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DeleteListResponse {
    pub success: bool,
    pub message: String,
}

/// Delete a list. Owner only; collaborators cannot delete, not even admins.
async fn delete_list(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(list_id): Path<String>,
) -> Result<Json<DeleteListResponse>> {
    let list = state
        .db
        .get_list(&list_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("List {} not found", list_id)))?;

    if !access::can_view(&list, Some(&user.clerk_id)) {
        return Err(AppError::NotFound(format!("List {} not found", list_id)));
    }
    if !access::can_delete(&list, Some(&user.clerk_id)) {
        return Err(AppError::Forbidden(
            "Only the owner can delete a list".to_string(),
        ));
    }

    let deleted = state.db.delete_list_cascade(&list_id).await?;
    tracing::info!(list_id, deleted, owner = %user.clerk_id, "List deleted");

    Ok(Json(DeleteListResponse {
        success: true,
        message: "List and associated records removed".to_string(),
    }))
}

// ─── Pins ────────────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PinResponse {
    pub pinned: bool,
    pub pin_count: u32,
}

/// Pin (save) a list. Idempotent per user.
async fn pin_list(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(list_id): Path<String>,
) -> Result<Json<PinResponse>> {
    let mut list = state
        .db
        .get_list(&list_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("List {} not found", list_id)))?;

    if !access::can_view(&list, Some(&user.clerk_id)) {
        return Err(AppError::NotFound(format!("List {} not found", list_id)));
    }

    if state.db.get_pin(&user.clerk_id, &list_id).await?.is_some() {
        return Ok(Json(PinResponse {
            pinned: true,
            pin_count: list.stats.pin_count,
        }));
    }

    let pin = Pin {
        clerk_id: user.clerk_id.clone(),
        list_id: list_id.clone(),
        pinned_at: now_rfc3339(),
        last_viewed_at: None,
    };
    state.db.set_pin(&pin).await?;

    // Counter maintenance is best-effort fetch-modify-write
    list.stats.pin_count += 1;
    state.db.set_list(&list).await?;

    Ok(Json(PinResponse {
        pinned: true,
        pin_count: list.stats.pin_count,
    }))
}

/// Unpin a list. Idempotent per user.
async fn unpin_list(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(list_id): Path<String>,
) -> Result<Json<PinResponse>> {
    let mut list = state
        .db
        .get_list(&list_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("List {} not found", list_id)))?;

    if state.db.get_pin(&user.clerk_id, &list_id).await?.is_none() {
        return Ok(Json(PinResponse {
            pinned: false,
            pin_count: list.stats.pin_count,
        }));
    }

    state.db.delete_pin(&user.clerk_id, &list_id).await?;
    list.stats.pin_count = list.stats.pin_count.saturating_sub(1);
    state.db.set_list(&list).await?;

    Ok(Json(PinResponse {
        pinned: false,
        pin_count: list.stats.pin_count,
    }))
}
