// SPDX-License-Identifier: MIT

//! Services module - business logic layer.

pub mod access;
pub mod clerk;
pub mod collaboration;
pub mod enrichment;

pub use clerk::{ClerkClient, ClerkUser};
pub use collaboration::CollaborationService;
pub use enrichment::{EnrichedList, EnrichmentService, OwnerProfile};
