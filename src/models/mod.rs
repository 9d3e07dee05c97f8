// SPDX-License-Identifier: MIT

//! Data models for the application.

pub mod follow;
pub mod invitation;
pub mod list;
pub mod notification;
pub mod pin;
pub mod user;

pub use follow::{Follow, FollowStatus};
pub use invitation::{Invitation, InvitationStatus};
pub use list::{
    Collaborator, CollaboratorIdentity, CollaboratorRole, CollaboratorStatus, List, ListItem,
    ListOwner, ListStats, Privacy,
};
pub use notification::{Notification, NotificationKind};
pub use pin::{AccessType, ListView, Pin};
pub use user::CachedProfile;
