// SPDX-License-Identifier: MIT

//! Follow edges between users (profile visibility, not list access).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FollowStatus {
    Active,
    Pending,
}

/// A follower -> following edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Follow {
    pub follower_id: String,
    pub following_id: String,
    pub status: FollowStatus,
    pub created_at: String,
}

impl Follow {
    pub fn doc_id(follower_id: &str, following_id: &str) -> String {
        format!("{}_{}", follower_id, following_id)
    }
}
