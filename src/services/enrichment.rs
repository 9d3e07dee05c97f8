// SPDX-License-Identifier: MIT

//! List enrichment: attach identity-provider profile data and per-requester
//! view state to stored list documents.
//!
//! Cache-aside read-through: stored cache entries within the 24h TTL are
//! used as-is, misses go to Clerk in one batch, and fetched profiles are
//! written back opportunistically. Identity-provider failures degrade to the
//! denormalized owner username rather than failing the request.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::{CachedProfile, List, ListView};
use crate::services::access;
use crate::services::clerk::ClerkClient;
use crate::time_utils::now_rfc3339;
use serde::Serialize;
use std::collections::HashMap;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Owner profile fields attached to an enriched list.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct OwnerProfile {
    pub username: String,
    pub display_name: String,
    pub image_url: Option<String>,
}

/// A display-ready list: the stored document plus joined profile and
/// per-requester view state.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedList {
    #[serde(flatten)]
    pub list: List,
    pub owner_profile: OwnerProfile,
    /// Whether the requesting user has pinned this list
    pub pinned: bool,
    /// The requesting user's last view of this list, from their pin record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_viewed_at: Option<String>,
}

/// List enrichment joiner.
#[derive(Clone)]
pub struct EnrichmentService {
    db: FirestoreDb,
    clerk: ClerkClient,
}

impl EnrichmentService {
    pub fn new(db: FirestoreDb, clerk: ClerkClient) -> Self {
        Self { db, clerk }
    }

    /// Resolve display profiles for a set of owner clerk ids.
    ///
    /// Ids the cache and Clerk both miss are absent from the result; callers
    /// fall back to the denormalized username stored on the list.
    pub async fn owner_profiles(
        &self,
        clerk_ids: &[String],
    ) -> Result<HashMap<String, OwnerProfile>, AppError> {
        let mut distinct: Vec<String> = clerk_ids.to_vec();
        distinct.sort();
        distinct.dedup();

        let now = chrono::Utc::now();
        let mut profiles: HashMap<String, OwnerProfile> = HashMap::new();

        for cached in self.db.get_cached_profiles(&distinct).await? {
            if cached.is_fresh(now) {
                profiles.insert(
                    cached.clerk_id.clone(),
                    OwnerProfile {
                        username: cached.username,
                        display_name: cached.display_name,
                        image_url: cached.image_url,
                    },
                );
            }
        }

        let misses: Vec<String> = distinct
            .iter()
            .filter(|id| !profiles.contains_key(*id))
            .cloned()
            .collect();

        if misses.is_empty() {
            return Ok(profiles);
        }

        // Degrade on provider failure instead of failing the whole request
        let fetched = match self.clerk.get_users(&misses).await {
            Ok(users) => users,
            Err(e) => {
                tracing::warn!(error = %e, count = misses.len(),
                    "Profile fetch failed; falling back to stored owner fields");
                return Ok(profiles);
            }
        };

        for user in fetched {
            let profile = OwnerProfile {
                username: user.username_or_id(),
                display_name: user.display_name(),
                image_url: user.image_url.clone(),
            };

            // Opportunistic write-back; a failed cache write only costs a
            // re-fetch later
            let cache_entry = CachedProfile {
                clerk_id: user.id.clone(),
                username: profile.username.clone(),
                display_name: profile.display_name.clone(),
                image_url: profile.image_url.clone(),
                cached_at: now_rfc3339(),
            };
            if let Err(e) = self.db.set_cached_profile(&cache_entry).await {
                tracing::warn!(error = %e, clerk_id = %user.id, "Profile cache write failed");
            }

            profiles.insert(user.id, profile);
        }

        Ok(profiles)
    }

    /// Join lists with owner profiles and the requester's pin state.
    pub async fn enrich_lists(
        &self,
        lists: Vec<List>,
        requester: Option<&str>,
    ) -> Result<Vec<EnrichedList>, AppError> {
        let owner_ids: Vec<String> = lists.iter().map(|l| l.owner.clerk_id.clone()).collect();
        let profiles = self.owner_profiles(&owner_ids).await?;

        // Pin state is attached for the requesting user only
        let pins: HashMap<String, Option<String>> = match requester {
            Some(clerk_id) => self
                .db
                .get_pins_for_user(clerk_id)
                .await?
                .into_iter()
                .map(|p| (p.list_id, p.last_viewed_at))
                .collect(),
            None => HashMap::new(),
        };

        Ok(lists
            .into_iter()
            .map(|list| {
                let owner_profile = profiles.get(&list.owner.clerk_id).cloned().unwrap_or_else(
                    || OwnerProfile {
                        username: list.owner.username.clone(),
                        display_name: list.owner.username.clone(),
                        image_url: None,
                    },
                );
                let pin = pins.get(&list.id);
                EnrichedList {
                    pinned: pin.is_some(),
                    last_viewed_at: pin.cloned().flatten(),
                    owner_profile,
                    list,
                }
            })
            .collect())
    }

    /// Record a qualifying view: upsert the requester's ListView row.
    ///
    /// Best-effort; callers run this off the response path.
    pub async fn record_view(&self, list: &List, clerk_id: &str) {
        let has_pin = match self.db.get_pin(clerk_id, &list.id).await {
            Ok(pin) => pin.is_some(),
            Err(e) => {
                tracing::warn!(error = %e, list_id = %list.id, "Pin lookup failed during view record");
                false
            }
        };

        let Some(access_type) = access::view_access_type(list, clerk_id, has_pin) else {
            return;
        };

        let view = ListView {
            clerk_id: clerk_id.to_string(),
            list_id: list.id.clone(),
            last_viewed_at: now_rfc3339(),
            access_type,
        };

        if let Err(e) = self.db.upsert_list_view(&view).await {
            tracing::warn!(error = %e, list_id = %list.id, "Failed to record list view");
        } else {
            tracing::debug!(list_id = %list.id, ?access_type, "List view recorded");
        }
    }
}
