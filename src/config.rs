// SPDX-License-Identifier: MIT

//! Application configuration loaded from environment variables.
//!
//! Secrets are read once at startup and cached in memory (Cloud Run injects
//! them as environment variables via secret bindings).

use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL for CORS
    pub frontend_url: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// Clerk API base URL (overridable for tests)
    pub clerk_api_url: String,
    /// Server port
    pub port: u16,

    // --- Secrets ---
    /// Clerk backend API secret key
    pub clerk_secret_key: String,
    /// Clerk webhook (Svix) signing secret, `whsec_...`
    pub clerk_webhook_secret: String,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            clerk_api_url: env::var("CLERK_API_URL")
                .unwrap_or_else(|_| "https://api.clerk.com/v1".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),

            clerk_secret_key: env::var("CLERK_SECRET_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("CLERK_SECRET_KEY"))?,
            clerk_webhook_secret: env::var("CLERK_WEBHOOK_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("CLERK_WEBHOOK_SECRET"))?,
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
        })
    }

    /// Default config for tests. Never used in production paths.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            clerk_api_url: "https://api.clerk.invalid/v1".to_string(),
            port: 8080,
            clerk_secret_key: "sk_test_secret".to_string(),
            clerk_webhook_secret: "whsec_dGVzdC13ZWJob29rLXNlY3JldA==".to_string(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("CLERK_SECRET_KEY", "sk_test_abc");
        env::set_var("CLERK_WEBHOOK_SECRET", "whsec_abc");
        env::set_var("JWT_SIGNING_KEY", "test_jwt_key_32_bytes_minimum!!");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.clerk_secret_key, "sk_test_abc");
        assert_eq!(config.clerk_api_url, "https://api.clerk.com/v1");
        assert_eq!(config.port, 8080);
    }
}
