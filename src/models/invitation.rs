// SPDX-License-Identifier: MIT

//! Email invitation documents (separate collection from the embedded
//! collaborator entries).

use crate::models::list::CollaboratorRole;
use serde::{Deserialize, Serialize};

/// Invitation lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Declined,
}

/// An outstanding (or resolved) offer to join a list, keyed by email.
///
/// Created when a list manager invites a non-collaborator by email; consumed
/// by matching one of the invitee's verified emails from the identity
/// provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
    pub id: String,
    pub list_id: String,
    pub inviter_id: String,
    pub inviter_username: String,
    /// Normalized (lowercased) invitee email
    pub invitee_email: String,
    pub role: CollaboratorRole,
    pub status: InvitationStatus,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responded_at: Option<String>,
}

impl Invitation {
    /// Document id for an invitation.
    ///
    /// Keyed on `(list_id, email)` so duplicate-invite detection is a point
    /// read rather than a query.
    pub fn doc_id(list_id: &str, email: &str) -> String {
        format!("{}_{}", list_id, urlencoding::encode(&normalize_email(email)))
    }
}

/// Normalize an email for identity comparison and document keys.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_id_is_stable_across_case_and_whitespace() {
        assert_eq!(
            Invitation::doc_id("l1", "  A@X.com "),
            Invitation::doc_id("l1", "a@x.com")
        );
    }

    #[test]
    fn doc_id_escapes_email_characters() {
        let id = Invitation::doc_id("l1", "a+tag@x.com");
        assert!(!id.contains('+'));
        assert!(id.starts_with("l1_"));
    }
}
