// SPDX-License-Identifier: MIT

//! List model: the central document, with embedded collaborator entries.

use serde::{Deserialize, Serialize};

/// List visibility flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    Public,
    Private,
}

/// Role granted to a collaborator.
///
/// `Admin` and `Editor` may edit list content; only `Admin` (and the owner)
/// may manage collaborators. `Viewer` grants read access to private lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollaboratorRole {
    Admin,
    Editor,
    Viewer,
}

/// Acceptance state of a collaborator entry.
///
/// Transitions `Pending -> Accepted` exactly once and never reverses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollaboratorStatus {
    Pending,
    Accepted,
}

/// Who a collaborator entry refers to.
///
/// Stored documents carry either a `clerk_id` (user-identified entry) or an
/// `email` (outstanding email invite), never both. Modeling this as a tagged
/// union keeps the two cases exhaustively checkable while `#[serde(flatten)]`
/// + `#[serde(untagged)]` preserves the flat wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CollaboratorIdentity {
    User {
        clerk_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_id: Option<String>,
    },
    EmailInvite { email: String },
}

/// A non-owner identity granted (or offered) a role on a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collaborator {
    #[serde(flatten)]
    pub identity: CollaboratorIdentity,
    pub role: CollaboratorRole,
    pub status: CollaboratorStatus,
    /// When the invite was created (ISO 8601)
    pub invited_at: String,
    /// Set exactly once, at the pending -> accepted transition (ISO 8601)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<String>,
}

impl Collaborator {
    /// Whether this entry is an accepted grant (pending entries grant nothing).
    pub fn is_accepted(&self) -> bool {
        self.status == CollaboratorStatus::Accepted
    }

    /// Match by clerk id. Email-invite entries never match a clerk id.
    pub fn matches_clerk_id(&self, clerk_id: &str) -> bool {
        matches!(&self.identity, CollaboratorIdentity::User { clerk_id: id, .. } if id == clerk_id)
    }

    /// Match by invite email (case-insensitive).
    pub fn matches_email(&self, email: &str) -> bool {
        matches!(&self.identity, CollaboratorIdentity::EmailInvite { email: e }
            if e.eq_ignore_ascii_case(email))
    }
}

/// Denormalized owner reference stored on the list.
///
/// The owner is immutable after creation and never appears as a collaborator
/// row; their permissions are implicit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListOwner {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub clerk_id: String,
    /// Denormalized for display; refreshed by the identity-provider webhook.
    pub username: String,
}

/// A ranked entry on a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    pub rank: u32,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Aggregate counters maintained best-effort on pin/copy/view actions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListStats {
    #[serde(default)]
    pub view_count: u32,
    #[serde(default)]
    pub pin_count: u32,
    #[serde(default)]
    pub copy_count: u32,
}

/// A ranked list document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct List {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub privacy: Privacy,
    pub owner: ListOwner,
    #[serde(default)]
    pub collaborators: Vec<Collaborator>,
    /// Clerk ids of user-identified collaborators, kept in sync with
    /// `collaborators` so membership queries can use array-contains.
    #[serde(default)]
    pub collaborator_clerk_ids: Vec<String>,
    #[serde(default)]
    pub items: Vec<ListItem>,
    #[serde(default)]
    pub stats: ListStats,
    pub created_at: String,
    pub updated_at: String,
    /// Last content edit (as opposed to collaborator/stats churn)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<String>,
}

impl List {
    /// Rebuild the query index of user-identified collaborator ids.
    ///
    /// Must be called after any mutation of `collaborators`.
    pub fn refresh_collaborator_index(&mut self) {
        self.collaborator_clerk_ids = self
            .collaborators
            .iter()
            .filter_map(|c| match &c.identity {
                CollaboratorIdentity::User { clerk_id, .. } => Some(clerk_id.clone()),
                CollaboratorIdentity::EmailInvite { .. } => None,
            })
            .collect();
    }
}
