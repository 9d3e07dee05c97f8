// SPDX-License-Identifier: MIT

//! Clerk Backend API client.
//!
//! Handles:
//! - Single and batch user profile lookup (for list enrichment)
//! - Verified email resolution (for invitation identity checks)

use crate::error::AppError;
use serde::Deserialize;

/// Clerk Backend API client.
#[derive(Clone)]
pub struct ClerkClient {
    http: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl ClerkClient {
    /// Create a new Clerk client with a backend secret key.
    pub fn new(base_url: String, secret_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            secret_key,
        }
    }

    /// Get a user by clerk id.
    pub async fn get_user(&self, clerk_id: &str) -> Result<ClerkUser, AppError> {
        let url = format!("{}/users/{}", self.base_url, clerk_id);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| AppError::ClerkApi(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Batch-fetch users by clerk id.
    ///
    /// Clerk's list endpoint accepts repeated `user_id` parameters; ids that
    /// no longer exist are simply absent from the result.
    pub async fn get_users(&self, clerk_ids: &[String]) -> Result<Vec<ClerkUser>, AppError> {
        if clerk_ids.is_empty() {
            return Ok(vec![]);
        }

        let url = format!("{}/users", self.base_url);
        let query: Vec<(&str, &str)> = clerk_ids
            .iter()
            .map(|id| ("user_id", id.as_str()))
            .chain(std::iter::once(("limit", "100")))
            .collect();

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.secret_key)
            .query(&query)
            .send()
            .await
            .map_err(|e| AppError::ClerkApi(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Look up the user holding an email address, if any.
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<ClerkUser>, AppError> {
        let url = format!("{}/users", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.secret_key)
            .query(&[("email_address", email), ("limit", "1")])
            .send()
            .await
            .map_err(|e| AppError::ClerkApi(e.to_string()))?;

        let users: Vec<ClerkUser> = self.check_response_json(response).await?;
        Ok(users.into_iter().next())
    }

    /// The user's verified email addresses, normalized to lowercase.
    pub async fn verified_emails(&self, clerk_id: &str) -> Result<Vec<String>, AppError> {
        let user = self.get_user(clerk_id).await?;
        Ok(user.verified_emails())
    }

    /// Map non-success responses to errors.
    async fn check_response_json<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound("Clerk user not found".to_string()));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ClerkApi(format!(
                "Clerk API returned {}: {}",
                status, body
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AppError::ClerkApi(format!("Failed to parse Clerk response: {}", e)))
    }
}

// ─── Wire Types ──────────────────────────────────────────────────

/// Clerk user record (subset of fields we consume).
#[derive(Debug, Clone, Deserialize)]
pub struct ClerkUser {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub email_addresses: Vec<ClerkEmailAddress>,
    #[serde(default)]
    pub primary_email_address_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClerkEmailAddress {
    pub id: String,
    pub email_address: String,
    #[serde(default)]
    pub verification: Option<ClerkVerification>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClerkVerification {
    pub status: String,
}

impl ClerkUser {
    /// Display name assembled from first/last name, falling back to username.
    pub fn display_name(&self) -> String {
        let full = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        if full.is_empty() {
            self.username.clone().unwrap_or_else(|| self.id.clone())
        } else {
            full
        }
    }

    /// Username, falling back to the clerk id for accounts without one.
    pub fn username_or_id(&self) -> String {
        self.username.clone().unwrap_or_else(|| self.id.clone())
    }

    /// Verified email addresses, normalized to lowercase.
    pub fn verified_emails(&self) -> Vec<String> {
        self.email_addresses
            .iter()
            .filter(|e| {
                e.verification
                    .as_ref()
                    .is_some_and(|v| v.status == "verified")
            })
            .map(|e| e.email_address.trim().to_ascii_lowercase())
            .collect()
    }
}
