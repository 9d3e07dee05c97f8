// SPDX-License-Identifier: MIT

//! Webhook routes for Clerk user lifecycle events.
//!
//! Clerk delivers webhooks through Svix; every request carries an HMAC
//! signature over `{id}.{timestamp}.{body}` that we verify before touching
//! any data.

use crate::error::AppError;
use crate::models::CachedProfile;
use crate::services::ClerkUser;
use crate::time_utils::now_rfc3339;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Router,
};
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;

/// Maximum clock skew tolerated on the svix-timestamp header, in seconds.
const TIMESTAMP_TOLERANCE_SECS: i64 = 300;

/// Webhook routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/webhook/clerk", post(handle_event))
}

// ─── Signature Verification ──────────────────────────────────

/// Verify a Svix webhook signature.
///
/// `secret` is the endpoint secret as issued ("whsec_" followed by the
/// base64-encoded key). The signature header may carry several space
/// separated `v1,<base64 sig>` candidates after key rotation; any valid
/// candidate passes. `now` is a parameter so the tolerance window is
/// testable.
pub fn verify_svix_signature(
    secret: &str,
    msg_id: &str,
    timestamp: &str,
    body: &[u8],
    signature_header: &str,
    now: i64,
) -> Result<(), AppError> {
    let encoded_key = secret
        .strip_prefix("whsec_")
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Malformed webhook secret")))?;
    let key = base64::engine::general_purpose::STANDARD
        .decode(encoded_key)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Malformed webhook secret")))?;

    let ts: i64 = timestamp
        .parse()
        .map_err(|_| AppError::Forbidden("Invalid webhook timestamp".to_string()))?;
    if (now - ts).abs() > TIMESTAMP_TOLERANCE_SECS {
        return Err(AppError::Forbidden(
            "Webhook timestamp outside tolerance".to_string(),
        ));
    }

    let mut mac = Hmac::<Sha256>::new_from_slice(&key)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Malformed webhook secret")))?;
    mac.update(msg_id.as_bytes());
    mac.update(b".");
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body);

    for candidate in signature_header.split(' ') {
        let Some(encoded) = candidate.strip_prefix("v1,") else {
            continue;
        };
        let Ok(sig) = base64::engine::general_purpose::STANDARD.decode(encoded) else {
            continue;
        };
        // verify_slice is constant-time
        if mac.clone().verify_slice(&sig).is_ok() {
            return Ok(());
        }
    }

    Err(AppError::Forbidden(
        "Webhook signature mismatch".to_string(),
    ))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

// ─── Event Handling ──────────────────────────────────────────

/// Clerk webhook event envelope.
#[derive(Deserialize, Debug)]
struct WebhookEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: serde_json::Value,
}

/// Fields present on `user.deleted` events (the full user object is gone).
#[derive(Deserialize, Debug)]
struct DeletedUser {
    id: String,
}

/// Handle incoming Clerk webhook events (POST).
async fn handle_event(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let (Some(msg_id), Some(timestamp), Some(signature)) = (
        header_str(&headers, "svix-id"),
        header_str(&headers, "svix-timestamp"),
        header_str(&headers, "svix-signature"),
    ) else {
        tracing::warn!("Webhook request missing svix headers");
        return StatusCode::FORBIDDEN;
    };

    let now = chrono::Utc::now().timestamp();
    if let Err(e) = verify_svix_signature(
        &state.config.clerk_webhook_secret,
        msg_id,
        timestamp,
        &body,
        signature,
        now,
    ) {
        tracing::warn!(msg_id, error = %e, "Webhook signature verification failed");
        return StatusCode::FORBIDDEN;
    }

    let event: WebhookEvent = match serde_json::from_slice(&body) {
        Ok(e) => e,
        Err(e) => {
            tracing::error!(error = %e, "Failed to parse webhook event");
            return StatusCode::OK; // Still return 200 to avoid retries
        }
    };

    tracing::info!(msg_id, event_type = %event.event_type, "Webhook event received");

    match event.event_type.as_str() {
        "user.created" | "user.updated" => {
            let user: ClerkUser = match serde_json::from_value(event.data) {
                Ok(u) => u,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to parse user payload");
                    return StatusCode::OK;
                }
            };
            if let Err(e) = apply_user_upsert(&state, &user).await {
                tracing::error!(error = %e, clerk_id = %user.id, "Failed to apply user update");
            }
        }
        "user.deleted" => {
            let user: DeletedUser = match serde_json::from_value(event.data) {
                Ok(u) => u,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to parse deleted-user payload");
                    return StatusCode::OK;
                }
            };
            match state.db.delete_user_data(&user.id).await {
                Ok(count) => {
                    tracing::info!(clerk_id = %user.id, deleted = count, "User data deleted");
                }
                Err(e) => {
                    tracing::error!(error = %e, clerk_id = %user.id, "Failed to delete user data");
                }
            }
        }
        other => {
            tracing::debug!(event_type = %other, "Ignoring unhandled event type");
        }
    }

    // Always return 200 OK quickly so Svix does not retry
    StatusCode::OK
}

/// Refresh the profile cache and propagate the username onto owned lists.
///
/// Per-list failures are logged and do not abort the rest; the next
/// user.updated delivery or cache refresh converges them.
async fn apply_user_upsert(state: &AppState, user: &ClerkUser) -> Result<(), AppError> {
    let profile = CachedProfile {
        clerk_id: user.id.clone(),
        username: user.username_or_id(),
        display_name: user.display_name(),
        image_url: user.image_url.clone(),
        cached_at: now_rfc3339(),
    };
    state.db.set_cached_profile(&profile).await?;

    let owned = state.db.get_lists_for_owner(&user.id).await?;
    for mut list in owned {
        if list.owner.username == profile.username {
            continue;
        }
        list.owner.username = profile.username.clone();
        if let Err(e) = state.db.set_list(&list).await {
            tracing::error!(error = %e, list_id = %list.id, "Failed to propagate username");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_dGVzdC13ZWJob29rLXNlY3JldA==";

    fn sign(msg_id: &str, timestamp: &str, body: &[u8]) -> String {
        let key = base64::engine::general_purpose::STANDARD
            .decode(SECRET.strip_prefix("whsec_").unwrap())
            .unwrap();
        let mut mac = Hmac::<Sha256>::new_from_slice(&key).unwrap();
        mac.update(format!("{}.{}.", msg_id, timestamp).as_bytes());
        mac.update(body);
        let sig = base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());
        format!("v1,{}", sig)
    }

    #[test]
    fn valid_signature_passes() {
        let body = br#"{"type":"user.created","data":{"id":"user_1"}}"#;
        let header = sign("msg_1", "1700000000", body);
        assert!(
            verify_svix_signature(SECRET, "msg_1", "1700000000", body, &header, 1_700_000_000)
                .is_ok()
        );
    }

    #[test]
    fn any_candidate_in_header_passes() {
        let body = b"{}";
        let good = sign("msg_1", "1700000000", body);
        let header = format!("v1,AAAA {}", good);
        assert!(
            verify_svix_signature(SECRET, "msg_1", "1700000000", body, &header, 1_700_000_000)
                .is_ok()
        );
    }

    #[test]
    fn tampered_body_fails() {
        let header = sign("msg_1", "1700000000", b"{}");
        assert!(verify_svix_signature(
            SECRET,
            "msg_1",
            "1700000000",
            b"{\"x\":1}",
            &header,
            1_700_000_000
        )
        .is_err());
    }

    #[test]
    fn stale_timestamp_fails() {
        let body = b"{}";
        let header = sign("msg_1", "1700000000", body);
        let now = 1_700_000_000 + TIMESTAMP_TOLERANCE_SECS + 1;
        assert!(verify_svix_signature(SECRET, "msg_1", "1700000000", body, &header, now).is_err());
    }

    #[test]
    fn future_timestamp_fails() {
        let body = b"{}";
        let header = sign("msg_1", "1700000000", body);
        let now = 1_700_000_000 - TIMESTAMP_TOLERANCE_SECS - 1;
        assert!(verify_svix_signature(SECRET, "msg_1", "1700000000", body, &header, now).is_err());
    }

    #[test]
    fn garbage_header_fails() {
        assert!(verify_svix_signature(
            SECRET,
            "msg_1",
            "1700000000",
            b"{}",
            "v2,whatever not-a-sig",
            1_700_000_000
        )
        .is_err());
    }
}
