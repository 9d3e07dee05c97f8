// SPDX-License-Identifier: MIT

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Lists (documents with embedded collaborator entries)
//! - Invitations (email invites, keyed on `(list_id, email)`)
//! - Pins / ListViews (per-user saved state and view recency)
//! - Follows (profile graph)
//! - UserCache (identity-provider profile cache)
//! - Notifications (dispatched side effects)

use crate::db::collections;
use crate::error::AppError;
use crate::models::{
    CachedProfile, Follow, Invitation, List, ListView, Notification, Pin,
};
use futures_util::{stream, StreamExt};

const MAX_CONCURRENT_DB_OPS: usize = 50;
// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;
// A commit aborts when a concurrent transaction touched the same documents;
// fresh-read retries absorb short contention bursts.
const TX_ATTEMPTS: u32 = 3;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── List Operations ─────────────────────────────────────────

    /// Get a list by ID.
    pub async fn get_list(&self, list_id: &str) -> Result<Option<List>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::LISTS)
            .obj()
            .one(list_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update a list document.
    pub async fn set_list(&self, list: &List) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::LISTS)
            .document_id(&list.id)
            .object(list)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get lists owned by a user, newest first.
    pub async fn get_lists_for_owner(&self, clerk_id: &str) -> Result<Vec<List>, AppError> {
        let clerk_id = clerk_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::LISTS)
            .filter(move |q| q.field("owner.clerk_id").eq(clerk_id.clone()))
            .order_by([(
                "updated_at",
                firestore::FirestoreQueryDirection::Descending,
            )])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get lists where the user appears as a user-identified collaborator.
    ///
    /// Uses the denormalized `collaborator_clerk_ids` index field; acceptance
    /// status is filtered in memory by the caller via the access evaluator.
    pub async fn get_lists_for_collaborator(&self, clerk_id: &str) -> Result<Vec<List>, AppError> {
        let clerk_id = clerk_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::LISTS)
            .filter(move |q| {
                q.field("collaborator_clerk_ids")
                    .array_contains(clerk_id.clone())
            })
            .order_by([(
                "updated_at",
                firestore::FirestoreQueryDirection::Descending,
            )])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a list and its dependent records (pins, views, invitations).
    ///
    /// Cascade is best-effort and non-transactional; the list document is
    /// removed last so a partial failure never leaves an orphaned list.
    pub async fn delete_list_cascade(&self, list_id: &str) -> Result<usize, AppError> {
        let mut deleted_count = 0;

        let pins: Vec<Pin> = self.get_pins_for_list(list_id).await?;
        let count = pins.len();
        self.batch_delete(&pins, collections::PINS, |p: &Pin| {
            Pin::doc_id(&p.clerk_id, &p.list_id)
        })
        .await?;
        deleted_count += count;
        tracing::debug!(list_id, count, "Deleted pins");

        let views: Vec<ListView> = self.get_views_for_list(list_id).await?;
        let count = views.len();
        self.batch_delete(&views, collections::LIST_VIEWS, |v: &ListView| {
            ListView::doc_id(&v.clerk_id, &v.list_id)
        })
        .await?;
        deleted_count += count;
        tracing::debug!(list_id, count, "Deleted list views");

        let invitations: Vec<Invitation> = self.get_invitations_for_list(list_id).await?;
        let count = invitations.len();
        self.batch_delete(&invitations, collections::INVITATIONS, |i: &Invitation| {
            i.id.clone()
        })
        .await?;
        deleted_count += count;
        tracing::debug!(list_id, count, "Deleted invitations");

        self.get_client()?
            .fluent()
            .delete()
            .from(collections::LISTS)
            .document_id(list_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        deleted_count += 1;

        tracing::info!(list_id, deleted_count, "List deletion complete");
        Ok(deleted_count)
    }

    // ─── Invitation Operations ───────────────────────────────────

    /// Get an invitation by document ID.
    pub async fn get_invitation(&self, invitation_id: &str) -> Result<Option<Invitation>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::INVITATIONS)
            .obj()
            .one(invitation_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update an invitation document.
    pub async fn set_invitation(&self, invitation: &Invitation) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::INVITATIONS)
            .document_id(&invitation.id)
            .object(invitation)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete an invitation document.
    pub async fn delete_invitation(&self, invitation_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::INVITATIONS)
            .document_id(invitation_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// All invitations for a list (any status).
    pub async fn get_invitations_for_list(
        &self,
        list_id: &str,
    ) -> Result<Vec<Invitation>, AppError> {
        let list_id = list_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::INVITATIONS)
            .filter(move |q| q.field("list_id").eq(list_id.clone()))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Pending invitations addressed to any of the given (normalized) emails.
    pub async fn get_pending_invitations_for_emails(
        &self,
        emails: &[String],
    ) -> Result<Vec<Invitation>, AppError> {
        let client = self.get_client()?;

        let results: Vec<Result<Vec<Invitation>, AppError>> = stream::iter(emails.to_vec())
            .map(|email| async move {
                client
                    .fluent()
                    .select()
                    .from(collections::INVITATIONS)
                    .filter(move |q| {
                        q.for_all([
                            q.field("invitee_email").eq(email.clone()),
                            q.field("status").eq("pending"),
                        ])
                    })
                    .obj()
                    .query()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))
            })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect()
            .await;

        let mut invitations = Vec::new();
        for result in results {
            invitations.extend(result?);
        }
        Ok(invitations)
    }

    // ─── Pin Operations ──────────────────────────────────────────

    pub async fn get_pin(&self, clerk_id: &str, list_id: &str) -> Result<Option<Pin>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::PINS)
            .obj()
            .one(Pin::doc_id(clerk_id, list_id))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn set_pin(&self, pin: &Pin) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::PINS)
            .document_id(Pin::doc_id(&pin.clerk_id, &pin.list_id))
            .object(pin)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    pub async fn delete_pin(&self, clerk_id: &str, list_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::PINS)
            .document_id(Pin::doc_id(clerk_id, list_id))
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// All pins held by a user.
    pub async fn get_pins_for_user(&self, clerk_id: &str) -> Result<Vec<Pin>, AppError> {
        let clerk_id = clerk_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::PINS)
            .filter(move |q| q.field("clerk_id").eq(clerk_id.clone()))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All pins pointing at a list (for cascade deletion).
    pub async fn get_pins_for_list(&self, list_id: &str) -> Result<Vec<Pin>, AppError> {
        let list_id = list_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::PINS)
            .filter(move |q| q.field("list_id").eq(list_id.clone()))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── ListView Operations ─────────────────────────────────────

    /// Upsert a view recency record; idempotent per `(clerk_id, list_id)`.
    pub async fn upsert_list_view(&self, view: &ListView) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::LIST_VIEWS)
            .document_id(ListView::doc_id(&view.clerk_id, &view.list_id))
            .object(view)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn get_views_for_list(&self, list_id: &str) -> Result<Vec<ListView>, AppError> {
        let list_id = list_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::LIST_VIEWS)
            .filter(move |q| q.field("list_id").eq(list_id.clone()))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Follow Operations ───────────────────────────────────────

    pub async fn get_follow(
        &self,
        follower_id: &str,
        following_id: &str,
    ) -> Result<Option<Follow>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::FOLLOWS)
            .obj()
            .one(Follow::doc_id(follower_id, following_id))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn set_follow(&self, follow: &Follow) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::FOLLOWS)
            .document_id(Follow::doc_id(&follow.follower_id, &follow.following_id))
            .object(follow)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    pub async fn delete_follow(
        &self,
        follower_id: &str,
        following_id: &str,
    ) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::FOLLOWS)
            .document_id(Follow::doc_id(follower_id, following_id))
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Active followers of a user.
    pub async fn get_followers(&self, clerk_id: &str) -> Result<Vec<Follow>, AppError> {
        let clerk_id = clerk_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::FOLLOWS)
            .filter(move |q| q.field("following_id").eq(clerk_id.clone()))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Users a user follows.
    pub async fn get_following(&self, clerk_id: &str) -> Result<Vec<Follow>, AppError> {
        let clerk_id = clerk_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::FOLLOWS)
            .filter(move |q| q.field("follower_id").eq(clerk_id.clone()))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── User Cache Operations ───────────────────────────────────

    /// Fetch cache entries for a set of clerk ids, skipping misses.
    pub async fn get_cached_profiles(
        &self,
        clerk_ids: &[String],
    ) -> Result<Vec<CachedProfile>, AppError> {
        let client = self.get_client()?;

        let results: Vec<Result<Option<CachedProfile>, AppError>> =
            stream::iter(clerk_ids.to_vec())
                .map(|id| async move {
                    client
                        .fluent()
                        .select()
                        .by_id_in(collections::USER_CACHE)
                        .obj()
                        .one(&id)
                        .await
                        .map_err(|e| AppError::Database(e.to_string()))
                })
                .buffer_unordered(MAX_CONCURRENT_DB_OPS)
                .collect()
                .await;

        let mut profiles = Vec::new();
        for result in results {
            if let Some(profile) = result? {
                profiles.push(profile);
            }
        }
        Ok(profiles)
    }

    pub async fn set_cached_profile(&self, profile: &CachedProfile) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USER_CACHE)
            .document_id(&profile.clerk_id)
            .object(profile)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    pub async fn delete_cached_profile(&self, clerk_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::USER_CACHE)
            .document_id(clerk_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Notification Operations ─────────────────────────────────

    pub async fn create_notification(&self, notification: &Notification) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::NOTIFICATIONS)
            .document_id(&notification.id)
            .object(notification)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Atomic Invitation Acceptance ────────────────────────────

    /// Atomically resolve an invitation and update the target list.
    ///
    /// Both documents are read through the transaction, registering them for
    /// commit-time conflict detection, and both writes commit together. If a
    /// concurrent request committed a change to either document first, the
    /// commit aborts and the whole cycle (fresh reads, the caller's `apply`
    /// mutation, writes) runs again, so no grant on the embedded collaborator
    /// array is ever silently overwritten.
    pub async fn resolve_invitation_atomic<F>(
        &self,
        invitation_id: &str,
        list_id: &str,
        apply: F,
    ) -> Result<(Invitation, List), AppError>
    where
        F: Fn(&mut Invitation, &mut List) -> Result<(), AppError>,
    {
        let client = self.get_client()?;

        let mut attempt = 1;
        loop {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            // Plain reads would not participate in the transaction; only
            // reads carrying its consistency selector are registered for
            // conflict detection.
            let tx_db = client.clone_with_consistency_selector(
                firestore::FirestoreConsistencySelector::Transaction(
                    transaction.transaction_id().clone(),
                ),
            );

            let read = async {
                let invitation: Invitation = tx_db
                    .fluent()
                    .select()
                    .by_id_in(collections::INVITATIONS)
                    .obj()
                    .one(invitation_id)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?
                    .ok_or_else(|| {
                        AppError::NotFound(format!("Invitation {} not found", invitation_id))
                    })?;

                let list: List = tx_db
                    .fluent()
                    .select()
                    .by_id_in(collections::LISTS)
                    .obj()
                    .one(list_id)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?
                    .ok_or_else(|| AppError::NotFound(format!("List {} not found", list_id)))?;

                Ok::<_, AppError>((invitation, list))
            }
            .await;

            let (mut invitation, mut list) = match read {
                Ok(docs) => docs,
                Err(e) => {
                    let _ = transaction.rollback().await;
                    return Err(e);
                }
            };

            if let Err(e) = apply(&mut invitation, &mut list) {
                let _ = transaction.rollback().await;
                return Err(e);
            }

            client
                .fluent()
                .update()
                .in_col(collections::INVITATIONS)
                .document_id(&invitation.id)
                .object(&invitation)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add invitation to transaction: {}", e))
                })?;

            client
                .fluent()
                .update()
                .in_col(collections::LISTS)
                .document_id(&list.id)
                .object(&list)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add list to transaction: {}", e))
                })?;

            match transaction.commit().await {
                Ok(_) => {
                    tracing::info!(
                        invitation_id,
                        list_id,
                        status = ?invitation.status,
                        "Invitation resolved atomically"
                    );
                    return Ok((invitation, list));
                }
                Err(e) if attempt < TX_ATTEMPTS => {
                    tracing::warn!(
                        invitation_id,
                        list_id,
                        attempt,
                        error = %e,
                        "Invitation transaction conflicted; retrying with fresh reads"
                    );
                    attempt += 1;
                }
                Err(e) => {
                    return Err(AppError::Database(format!(
                        "Transaction commit failed: {}",
                        e
                    )));
                }
            }
        }
    }

    // ─── Helper Methods ────────────────────────────────────────────

    /// Helper to batch delete documents using transactions.
    async fn batch_delete<T, F>(
        &self,
        items: &[T],
        collection: &str,
        id_extractor: F,
    ) -> Result<(), AppError>
    where
        F: Fn(&T) -> String,
    {
        let client = self.get_client()?;

        for chunk in items.chunks(BATCH_SIZE) {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for item in chunk {
                let doc_id = id_extractor(item);
                client
                    .fluent()
                    .delete()
                    .from(collection)
                    .document_id(&doc_id)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add deletion to transaction for {}: {}",
                            collection, e
                        ))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                AppError::Database(format!("Failed to commit batch deletion: {}", e))
            })?;
        }

        Ok(())
    }

    // ─── User Data Deletion ────────────────────────────────────────

    /// Delete ALL data for a user (identity-provider account deletion).
    ///
    /// Deletes pins, view records, follow edges (both directions), the cache
    /// entry, and every owned list with its cascade. Collaborator entries the
    /// user holds on other people's lists are left for the cleanup script;
    /// they grant nothing once the identity is gone.
    ///
    /// Returns the number of documents deleted.
    pub async fn delete_user_data(&self, clerk_id: &str) -> Result<usize, AppError> {
        let mut deleted_count = 0;

        let pins = self.get_pins_for_user(clerk_id).await?;
        let count = pins.len();
        self.batch_delete(&pins, collections::PINS, |p: &Pin| {
            Pin::doc_id(&p.clerk_id, &p.list_id)
        })
        .await?;
        deleted_count += count;
        tracing::debug!(clerk_id, count, "Deleted pins");

        let views: Vec<ListView> = {
            let clerk_id = clerk_id.to_string();
            self.get_client()?
                .fluent()
                .select()
                .from(collections::LIST_VIEWS)
                .filter(move |q| q.field("clerk_id").eq(clerk_id.clone()))
                .obj()
                .query()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?
        };
        let count = views.len();
        self.batch_delete(&views, collections::LIST_VIEWS, |v: &ListView| {
            ListView::doc_id(&v.clerk_id, &v.list_id)
        })
        .await?;
        deleted_count += count;
        tracing::debug!(clerk_id, count, "Deleted list views");

        let mut follows = self.get_followers(clerk_id).await?;
        follows.extend(self.get_following(clerk_id).await?);
        let count = follows.len();
        self.batch_delete(&follows, collections::FOLLOWS, |f: &Follow| {
            Follow::doc_id(&f.follower_id, &f.following_id)
        })
        .await?;
        deleted_count += count;
        tracing::debug!(clerk_id, count, "Deleted follow edges");

        let owned = self.get_lists_for_owner(clerk_id).await?;
        for list in &owned {
            deleted_count += self.delete_list_cascade(&list.id).await?;
        }
        tracing::debug!(clerk_id, count = owned.len(), "Deleted owned lists");

        self.delete_cached_profile(clerk_id).await?;
        deleted_count += 1;

        tracing::info!(clerk_id, deleted_count, "User data deletion complete");

        Ok(deleted_count)
    }
}
