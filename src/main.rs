// SPDX-License-Identifier: MIT

//! Curate API Server
//!
//! Collaborative ranked lists: owners share lists with collaborators by
//! email invitation or direct add, and readers browse what they can see.

use curate_api::{
    config::Config,
    db::FirestoreDb,
    middleware::RateLimiter,
    services::{ClerkClient, CollaborationService, EnrichmentService},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Invitations a single user may send per hour.
const INVITE_LIMIT_PER_HOUR: u32 = 20;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Curate API");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    // Initialize Clerk Backend API client
    let clerk = ClerkClient::new(
        config.clerk_api_url.clone(),
        config.clerk_secret_key.clone(),
    );
    tracing::info!(api_url = %config.clerk_api_url, "Clerk client initialized");

    let enricher = EnrichmentService::new(db.clone(), clerk.clone());
    let collab = CollaborationService::new(db.clone(), clerk.clone());
    let rate_limiter = RateLimiter::new(INVITE_LIMIT_PER_HOUR, 60 * 60);

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        clerk,
        enricher,
        collab,
        rate_limiter,
    });

    // Build router
    let app = curate_api::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("curate_api=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
