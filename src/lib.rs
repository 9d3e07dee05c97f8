// SPDX-License-Identifier: MIT

//! Curate: Collaborative ranked lists
//!
//! This crate provides the backend API for creating, sharing, and
//! collaborating on ranked lists, with identity handled by Clerk and
//! storage in Firestore.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use middleware::RateLimiter;
use services::{ClerkClient, CollaborationService, EnrichmentService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub clerk: ClerkClient,
    pub enricher: EnrichmentService,
    pub collab: CollaborationService,
    pub rate_limiter: RateLimiter,
}
