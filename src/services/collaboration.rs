// SPDX-License-Identifier: MIT

//! Collaboration lifecycle: invitations and collaborator state transitions.
//!
//! All permission checks go through the access evaluator; all collaborator
//! array mutations go through [`grant_accepted`] so acceptance is idempotent
//! per `(list, identity)` and a double-accept can never produce duplicate
//! collaborator rows.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::invitation::normalize_email;
use crate::models::{
    Collaborator, CollaboratorIdentity, CollaboratorRole, CollaboratorStatus, Invitation,
    InvitationStatus, List, Notification, NotificationKind,
};
use crate::services::access;
use crate::services::clerk::ClerkClient;
use crate::time_utils::now_rfc3339;

/// Result of granting accepted access to an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantOutcome {
    /// A fresh accepted entry was appended.
    Added,
    /// A pending email-invite entry was converted in place to a user entry.
    Converted,
    /// A pending user entry was flipped to accepted.
    FlippedPending,
    /// An accepted entry already existed; nothing changed.
    AlreadyAccepted,
}

/// Grant accepted collaborator access to `clerk_id` on the list.
///
/// Resolution order: existing accepted entry (no-op), pending user entry
/// (flip), pending email-invite entry matching `email` (convert in place:
/// email replaced by clerk id, status flipped, `accepted_at` set), otherwise
/// append. Exactly one entry for the identity exists afterwards.
pub fn grant_accepted(
    list: &mut List,
    clerk_id: &str,
    email: Option<&str>,
    role: CollaboratorRole,
    invited_at: &str,
    now: &str,
) -> GrantOutcome {
    if list
        .collaborators
        .iter()
        .any(|c| c.is_accepted() && c.matches_clerk_id(clerk_id))
    {
        return GrantOutcome::AlreadyAccepted;
    }

    let outcome = if let Some(entry) = list
        .collaborators
        .iter_mut()
        .find(|c| c.matches_clerk_id(clerk_id))
    {
        entry.status = CollaboratorStatus::Accepted;
        entry.accepted_at = Some(now.to_string());
        GrantOutcome::FlippedPending
    } else if let Some(entry) = email.and_then(|email| {
        list.collaborators
            .iter_mut()
            .find(|c| c.matches_email(email))
    }) {
        entry.identity = CollaboratorIdentity::User {
            clerk_id: clerk_id.to_string(),
            user_id: None,
        };
        entry.status = CollaboratorStatus::Accepted;
        entry.accepted_at = Some(now.to_string());
        GrantOutcome::Converted
    } else {
        list.collaborators.push(Collaborator {
            identity: CollaboratorIdentity::User {
                clerk_id: clerk_id.to_string(),
                user_id: None,
            },
            role,
            status: CollaboratorStatus::Accepted,
            invited_at: invited_at.to_string(),
            accepted_at: Some(now.to_string()),
        });
        GrantOutcome::Added
    };

    list.refresh_collaborator_index();
    outcome
}

/// Collaboration state manager.
#[derive(Clone)]
pub struct CollaborationService {
    db: FirestoreDb,
    clerk: ClerkClient,
}

impl CollaborationService {
    pub fn new(db: FirestoreDb, clerk: ClerkClient) -> Self {
        Self { db, clerk }
    }

    async fn require_list(&self, list_id: &str) -> Result<List, AppError> {
        self.db
            .get_list(list_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("List {} not found", list_id)))
    }

    /// Invite a non-collaborator by email.
    ///
    /// Creates the Invitation document, appends a pending email-invite entry
    /// to the list, and records the email dispatch (delivery itself is an
    /// external concern).
    pub async fn invite_by_email(
        &self,
        list_id: &str,
        email: &str,
        role: CollaboratorRole,
        inviter_clerk_id: &str,
    ) -> Result<Invitation, AppError> {
        let mut list = self.require_list(list_id).await?;

        if !access::can_manage_collaborators(&list, Some(inviter_clerk_id)) {
            return Err(AppError::Forbidden(
                "Only the owner or an admin collaborator can invite".to_string(),
            ));
        }

        let email = normalize_email(email);
        let invitation_id = Invitation::doc_id(list_id, &email);

        // Duplicate prevention: a still-pending invitation for this exact
        // (list, email) pair blocks a second invite.
        if let Some(existing) = self.db.get_invitation(&invitation_id).await? {
            if existing.status == InvitationStatus::Pending {
                return Err(AppError::Conflict(format!(
                    "A pending invitation for {} already exists",
                    email
                )));
            }
        }

        if list.collaborators.iter().any(|c| c.matches_email(&email)) {
            return Err(AppError::Conflict(format!(
                "{} has already been invited to this list",
                email
            )));
        }

        // An accepted entry no longer carries the email (converted to a
        // clerk id on acceptance), so resolve the email with the identity
        // provider before concluding the address is new to this list.
        if let Some(holder) = self.clerk.get_user_by_email(&email).await? {
            if access::is_owner(&list, &holder.id)
                || list.collaborators.iter().any(|c| c.matches_clerk_id(&holder.id))
            {
                return Err(AppError::Conflict(format!(
                    "{} already has access to this list",
                    email
                )));
            }
        }

        let inviter = self.clerk.get_user(inviter_clerk_id).await?;
        let now = now_rfc3339();

        let invitation = Invitation {
            id: invitation_id,
            list_id: list_id.to_string(),
            inviter_id: inviter_clerk_id.to_string(),
            inviter_username: inviter.username_or_id(),
            invitee_email: email.clone(),
            role,
            status: InvitationStatus::Pending,
            created_at: now.clone(),
            responded_at: None,
        };
        self.db.set_invitation(&invitation).await?;

        list.collaborators.push(Collaborator {
            identity: CollaboratorIdentity::EmailInvite {
                email: email.clone(),
            },
            role,
            status: CollaboratorStatus::Pending,
            invited_at: now.clone(),
            accepted_at: None,
        });
        list.refresh_collaborator_index();
        list.updated_at = now.clone();
        self.db.set_list(&list).await?;

        self.dispatch_notification(
            NotificationKind::InviteSent,
            list_id,
            &email,
            &invitation.inviter_username,
        )
        .await;

        tracing::info!(
            list_id,
            invitee = %email,
            role = ?role,
            "Invitation created and email dispatch queued"
        );

        Ok(invitation)
    }

    /// Accept an email invitation on behalf of the requester.
    ///
    /// The requester must hold a verified email matching the invitation.
    /// Invitation transition and collaborator grant commit in one
    /// transaction, and the grant is idempotent per identity.
    pub async fn accept_invitation(
        &self,
        invitation_id: &str,
        requester_clerk_id: &str,
    ) -> Result<(Invitation, List), AppError> {
        let invitation = self
            .db
            .get_invitation(invitation_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Invitation {} not found", invitation_id)))?;

        if invitation.status != InvitationStatus::Pending {
            return Err(AppError::Conflict(
                "Invitation is no longer pending".to_string(),
            ));
        }

        self.verify_invitee(&invitation, requester_clerk_id).await?;

        let clerk_id = requester_clerk_id.to_string();
        let (invitation, list) = self
            .db
            .resolve_invitation_atomic(invitation_id, &invitation.list_id, move |inv, list| {
                // Re-checked on the fresh copy inside the transaction
                if inv.status != InvitationStatus::Pending {
                    return Err(AppError::Conflict(
                        "Invitation is no longer pending".to_string(),
                    ));
                }

                let now = now_rfc3339();
                inv.status = InvitationStatus::Accepted;
                inv.responded_at = Some(now.clone());

                let outcome = grant_accepted(
                    list,
                    &clerk_id,
                    Some(&inv.invitee_email),
                    inv.role,
                    &inv.created_at,
                    &now,
                );
                tracing::debug!(list_id = %list.id, ?outcome, "Collaborator grant applied");
                list.updated_at = now;
                Ok(())
            })
            .await?;

        self.dispatch_notification(
            NotificationKind::InviteAccepted,
            &invitation.list_id,
            &invitation.inviter_id,
            requester_clerk_id,
        )
        .await;

        Ok((invitation, list))
    }

    /// Decline an email invitation. No list mutation.
    pub async fn decline_invitation(
        &self,
        invitation_id: &str,
        requester_clerk_id: &str,
    ) -> Result<Invitation, AppError> {
        let mut invitation = self
            .db
            .get_invitation(invitation_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Invitation {} not found", invitation_id)))?;

        if invitation.status != InvitationStatus::Pending {
            return Err(AppError::Conflict(
                "Invitation is no longer pending".to_string(),
            ));
        }

        self.verify_invitee(&invitation, requester_clerk_id).await?;

        invitation.status = InvitationStatus::Declined;
        invitation.responded_at = Some(now_rfc3339());
        self.db.set_invitation(&invitation).await?;

        self.dispatch_notification(
            NotificationKind::InviteDeclined,
            &invitation.list_id,
            &invitation.inviter_id,
            requester_clerk_id,
        )
        .await;

        Ok(invitation)
    }

    /// Accept a direct (clerk-id keyed) invite: flip the requester's own
    /// pending entry to accepted.
    pub async fn accept_direct_invite(
        &self,
        list_id: &str,
        requester_clerk_id: &str,
    ) -> Result<List, AppError> {
        let mut list = self.require_list(list_id).await?;

        let entry = list
            .collaborators
            .iter_mut()
            .find(|c| c.matches_clerk_id(requester_clerk_id))
            .ok_or_else(|| {
                AppError::NotFound("No invite for this user on this list".to_string())
            })?;

        if entry.is_accepted() {
            // Idempotent: re-accepting an accepted entry is a no-op
            return Ok(list);
        }

        let now = now_rfc3339();
        entry.status = CollaboratorStatus::Accepted;
        entry.accepted_at = Some(now.clone());
        list.updated_at = now;
        self.db.set_list(&list).await?;

        Ok(list)
    }

    /// Remove a collaborator entry matching either a clerk id or an email.
    ///
    /// Also cancels the matching pending Invitation document when removing
    /// an email invite, so the email can never be converted into access
    /// later.
    pub async fn remove_collaborator(
        &self,
        list_id: &str,
        target: &str,
        requester_clerk_id: &str,
    ) -> Result<List, AppError> {
        let mut list = self.require_list(list_id).await?;

        if !access::can_manage_collaborators(&list, Some(requester_clerk_id)) {
            return Err(AppError::Forbidden(
                "Only the owner or an admin collaborator can remove collaborators".to_string(),
            ));
        }

        let before = list.collaborators.len();
        list.collaborators
            .retain(|c| !(c.matches_clerk_id(target) || c.matches_email(target)));

        if list.collaborators.len() == before {
            return Err(AppError::NotFound(format!(
                "No collaborator matching {} on this list",
                target
            )));
        }

        list.refresh_collaborator_index();
        list.updated_at = now_rfc3339();
        self.db.set_list(&list).await?;

        if target.contains('@') {
            let invitation_id = Invitation::doc_id(list_id, target);
            if let Some(invitation) = self.db.get_invitation(&invitation_id).await? {
                if invitation.status == InvitationStatus::Pending {
                    self.db.delete_invitation(&invitation_id).await?;
                    tracing::info!(list_id, invitation_id, "Cancelled pending invitation");
                }
            }
        }

        Ok(list)
    }

    /// Change an existing collaborator's role.
    ///
    /// The owner has no collaborator row; targeting the owner is rejected.
    /// Ownership transfer is deliberately not supported server-side.
    pub async fn update_collaborator_role(
        &self,
        list_id: &str,
        target_clerk_id: &str,
        new_role: CollaboratorRole,
        requester_clerk_id: &str,
    ) -> Result<List, AppError> {
        let mut list = self.require_list(list_id).await?;

        if !access::can_manage_collaborators(&list, Some(requester_clerk_id)) {
            return Err(AppError::Forbidden(
                "Only the owner or an admin collaborator can change roles".to_string(),
            ));
        }

        if access::is_owner(&list, target_clerk_id) {
            return Err(AppError::BadRequest(
                "The owner's role is implicit and cannot be changed".to_string(),
            ));
        }

        let entry = list
            .collaborators
            .iter_mut()
            .find(|c| c.matches_clerk_id(target_clerk_id))
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "No collaborator {} on this list",
                    target_clerk_id
                ))
            })?;

        entry.role = new_role;
        list.updated_at = now_rfc3339();
        self.db.set_list(&list).await?;

        Ok(list)
    }

    /// Check that one of the requester's verified emails matches the invitee.
    async fn verify_invitee(
        &self,
        invitation: &Invitation,
        requester_clerk_id: &str,
    ) -> Result<(), AppError> {
        let emails = self.clerk.verified_emails(requester_clerk_id).await?;
        if !emails.contains(&invitation.invitee_email) {
            return Err(AppError::Forbidden(
                "This invitation was sent to a different email address".to_string(),
            ));
        }
        Ok(())
    }

    /// Persist a notification record; failures are logged, never surfaced.
    async fn dispatch_notification(
        &self,
        kind: NotificationKind,
        list_id: &str,
        recipient: &str,
        actor_username: &str,
    ) {
        let notification = Notification {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            list_id: list_id.to_string(),
            recipient: recipient.to_string(),
            actor_username: actor_username.to_string(),
            created_at: now_rfc3339(),
        };

        if let Err(e) = self.db.create_notification(&notification).await {
            tracing::warn!(error = %e, ?kind, list_id, "Failed to record notification");
        }
    }
}
