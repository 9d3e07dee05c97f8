// SPDX-License-Identifier: MIT

//! Pin (saved list) and list-view recency records.

use serde::{Deserialize, Serialize};

/// A user's saved ("pinned") list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pin {
    pub clerk_id: String,
    pub list_id: String,
    pub pinned_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_viewed_at: Option<String>,
}

impl Pin {
    /// Document id, unique per `(clerk_id, list_id)` pair.
    pub fn doc_id(clerk_id: &str, list_id: &str) -> String {
        format!("{}_{}", clerk_id, list_id)
    }
}

/// How the requester qualified for a recorded view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    Pin,
    Owner,
    Collaborator,
}

/// Audit/recency record, upserted on each qualifying view.
///
/// Keyed by `(clerk_id, list_id)` so repeat views are idempotent upserts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListView {
    pub clerk_id: String,
    pub list_id: String,
    pub last_viewed_at: String,
    pub access_type: AccessType,
}

impl ListView {
    pub fn doc_id(clerk_id: &str, list_id: &str) -> String {
        format!("{}_{}", clerk_id, list_id)
    }
}
