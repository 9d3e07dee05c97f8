// SPDX-License-Identifier: MIT

use curate_api::config::Config;
use curate_api::db::FirestoreDb;
use curate_api::middleware::RateLimiter;
use curate_api::routes::create_router;
use curate_api::services::{ClerkClient, CollaborationService, EnrichmentService};
use curate_api::AppState;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Create a test app with offline mock dependencies.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let db = test_db_offline();
    let clerk = ClerkClient::new(
        config.clerk_api_url.clone(),
        config.clerk_secret_key.clone(),
    );
    let enricher = EnrichmentService::new(db.clone(), clerk.clone());
    let collab = CollaborationService::new(db.clone(), clerk.clone());
    let rate_limiter = RateLimiter::new(20, 60 * 60);

    let state = Arc::new(AppState {
        config,
        db,
        clerk,
        enricher,
        collab,
        rate_limiter,
    });

    (create_router(state.clone()), state)
}
