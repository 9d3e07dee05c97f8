// SPDX-License-Identifier: MIT

//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    pub const LISTS: &str = "lists";
    pub const INVITATIONS: &str = "invitations";
    pub const FOLLOWS: &str = "follows";
    pub const PINS: &str = "pins";
    /// Per-user view recency records (keyed by `{clerk_id}_{list_id}`)
    pub const LIST_VIEWS: &str = "list_views";
    /// Identity-provider profile cache (keyed by clerk id)
    pub const USER_CACHE: &str = "user_cache";
    pub const NOTIFICATIONS: &str = "notifications";
}
