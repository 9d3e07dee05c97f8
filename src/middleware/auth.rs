// SPDX-License-Identifier: MIT

//! JWT session authentication middleware.
//!
//! The identity provider (Clerk) verifies credentials; our session tokens
//! carry the clerk user id in `sub` and are signed with the server key.

use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const SESSION_COOKIE: &str = "curate_session";

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (Clerk user id)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Authenticated user extracted from JWT.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub clerk_id: String,
}

/// The requester's identity on routes that allow anonymous access.
pub type MaybeAuthUser = Option<AuthUser>;

fn extract_token(jar: &CookieJar, request: &Request) -> Option<String> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        return Some(cookie.value().to_string());
    }

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())?;

    auth_header
        .strip_prefix("Bearer ")
        .map(|token| token.to_string())
}

fn decode_user(token: &str, signing_key: &[u8]) -> Option<AuthUser> {
    let key = DecodingKey::from_secret(signing_key);
    let validation = Validation::new(Algorithm::HS256);

    let token_data = decode::<Claims>(token, &key, &validation).ok()?;
    Some(AuthUser {
        clerk_id: token_data.claims.sub,
    })
}

/// Middleware that extracts the requester's identity when present.
///
/// Invalid or missing tokens fall through as anonymous; routes behind this
/// layer gate per-list via the access evaluator, not per-request. Applied to
/// the whole `/api` surface; `require_auth` sits inside it on protected
/// routes.
pub async fn optional_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_user: MaybeAuthUser = extract_token(&jar, &request)
        .and_then(|token| decode_user(&token, &state.config.jwt_signing_key));

    request.extensions_mut().insert(auth_user);
    next.run(request).await
}

/// Middleware that rejects anonymous requests.
///
/// Relies on `optional_auth` having already resolved the session token.
/// A request that presented credentials which failed to decode gets the
/// invalid-token error rather than the generic one.
pub async fn require_auth(mut request: Request, next: Next) -> Result<Response, Response> {
    match request
        .extensions()
        .get::<MaybeAuthUser>()
        .cloned()
        .flatten()
    {
        Some(user) => {
            request.extensions_mut().insert(user);
            Ok(next.run(request).await)
        }
        None => {
            let presented_credentials = request.headers().contains_key(header::AUTHORIZATION)
                || request.headers().contains_key(header::COOKIE);
            let err = if presented_credentials {
                AppError::InvalidToken
            } else {
                AppError::Unauthorized
            };
            Err(err.into_response())
        }
    }
}

/// Create a JWT for a user session.
pub fn create_jwt(clerk_id: &str, signing_key: &[u8]) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = Claims {
        sub: clerk_id.to_string(),
        iat: now,
        exp: now + 30 * 24 * 60 * 60, // 30 days
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}
