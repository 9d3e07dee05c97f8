// SPDX-License-Identifier: MIT

//! Notification documents recording dispatched side effects.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    InviteSent,
    InviteAccepted,
    InviteDeclined,
}

/// A record of an outbound notification.
///
/// Actual email delivery is an external concern; we persist the dispatch so
/// the delivery worker (and the invitee's in-app inbox) can consume it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub kind: NotificationKind,
    pub list_id: String,
    /// Recipient: email for invite dispatches, clerk id otherwise
    pub recipient: String,
    pub actor_username: String,
    pub created_at: String,
}
