// SPDX-License-Identifier: MIT

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running
//! (FIRESTORE_EMULATOR_HOST set). The emulator provides a clean state for
//! each test run.

use curate_api::models::{
    Collaborator, CollaboratorIdentity, CollaboratorRole, CollaboratorStatus, Invitation,
    InvitationStatus, List, ListOwner, ListStats, Pin, Privacy,
};

mod common;
use common::test_db;

/// Generate a unique id suffix for test isolation.
fn unique_suffix() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos()
        .to_string()
}

fn test_list(id: &str, owner_clerk_id: &str) -> List {
    List {
        id: id.to_string(),
        title: "Best test fixtures".to_string(),
        description: String::new(),
        category: None,
        privacy: Privacy::Private,
        owner: ListOwner {
            user_id: None,
            clerk_id: owner_clerk_id.to_string(),
            username: "owner".to_string(),
        },
        collaborators: vec![],
        collaborator_clerk_ids: vec![],
        items: vec![],
        stats: ListStats::default(),
        created_at: "2026-01-15T10:00:00Z".to_string(),
        updated_at: "2026-01-15T10:00:00Z".to_string(),
        edited_at: None,
    }
}

#[tokio::test]
async fn test_list_round_trip() {
    require_emulator!();

    let db = test_db().await;
    let id = format!("list_{}", unique_suffix());
    let owner = format!("user_{}", unique_suffix());

    assert!(db.get_list(&id).await.unwrap().is_none());

    db.set_list(&test_list(&id, &owner)).await.unwrap();

    let fetched = db.get_list(&id).await.unwrap().expect("list should exist");
    assert_eq!(fetched.id, id);
    assert_eq!(fetched.owner.clerk_id, owner);
    assert_eq!(fetched.privacy, Privacy::Private);

    let owned = db.get_lists_for_owner(&owner).await.unwrap();
    assert_eq!(owned.len(), 1);
}

#[tokio::test]
async fn test_collaborator_membership_query() {
    require_emulator!();

    let db = test_db().await;
    let id = format!("list_{}", unique_suffix());
    let owner = format!("user_{}", unique_suffix());
    let collaborator = format!("user_{}", unique_suffix());

    let mut list = test_list(&id, &owner);
    list.collaborators.push(Collaborator {
        identity: CollaboratorIdentity::User {
            clerk_id: collaborator.clone(),
            user_id: None,
        },
        role: CollaboratorRole::Editor,
        status: CollaboratorStatus::Accepted,
        invited_at: "2026-01-15T10:00:00Z".to_string(),
        accepted_at: Some("2026-01-15T11:00:00Z".to_string()),
    });
    list.refresh_collaborator_index();
    db.set_list(&list).await.unwrap();

    let memberships = db.get_lists_for_collaborator(&collaborator).await.unwrap();
    assert_eq!(memberships.len(), 1);
    assert_eq!(memberships[0].id, id);

    // A stranger's membership query finds nothing
    let stranger = format!("user_{}", unique_suffix());
    assert!(db.get_lists_for_collaborator(&stranger).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_invitation_lifecycle() {
    require_emulator!();

    let db = test_db().await;
    let list_id = format!("list_{}", unique_suffix());
    let email = format!("invitee_{}@example.com", unique_suffix());

    let invitation = Invitation {
        id: Invitation::doc_id(&list_id, &email),
        list_id: list_id.clone(),
        inviter_id: "user_inviter".to_string(),
        inviter_username: "inviter".to_string(),
        invitee_email: email.clone(),
        role: CollaboratorRole::Viewer,
        status: InvitationStatus::Pending,
        created_at: "2026-01-15T10:00:00Z".to_string(),
        responded_at: None,
    };
    db.set_invitation(&invitation).await.unwrap();

    // Duplicate detection is a point read on the derived doc id
    let existing = db
        .get_invitation(&Invitation::doc_id(&list_id, &email.to_uppercase()))
        .await
        .unwrap();
    assert!(existing.is_some());

    // Inbox query matches the normalized email
    let inbox = db
        .get_pending_invitations_for_emails(&[email.clone()])
        .await
        .unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].list_id, list_id);

    db.delete_invitation(&invitation.id).await.unwrap();
    assert!(db.get_invitation(&invitation.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_atomic_invitation_resolution_rolls_back() {
    require_emulator!();

    let db = test_db().await;
    let list_id = format!("list_{}", unique_suffix());
    let owner = format!("user_{}", unique_suffix());
    let email = format!("invitee_{}@example.com", unique_suffix());

    db.set_list(&test_list(&list_id, &owner)).await.unwrap();
    let invitation = Invitation {
        id: Invitation::doc_id(&list_id, &email),
        list_id: list_id.clone(),
        inviter_id: owner.clone(),
        inviter_username: "owner".to_string(),
        invitee_email: email.clone(),
        role: CollaboratorRole::Editor,
        status: InvitationStatus::Pending,
        created_at: "2026-01-15T10:00:00Z".to_string(),
        responded_at: None,
    };
    db.set_invitation(&invitation).await.unwrap();

    let result = db
        .resolve_invitation_atomic(&invitation.id, &list_id, |_inv, _list| {
            Err(curate_api::error::AppError::Conflict("forced".to_string()))
        })
        .await;
    assert!(result.is_err());

    // Neither document changed
    let inv = db.get_invitation(&invitation.id).await.unwrap().unwrap();
    assert_eq!(inv.status, InvitationStatus::Pending);
    let list = db.get_list(&list_id).await.unwrap().unwrap();
    assert!(list.collaborators.is_empty());
}

#[tokio::test]
async fn test_concurrent_accepts_keep_both_grants() {
    require_emulator!();

    let db = test_db().await;
    let list_id = format!("list_{}", unique_suffix());
    let owner = format!("user_{}", unique_suffix());
    db.set_list(&test_list(&list_id, &owner)).await.unwrap();

    let invite = |email: &str| Invitation {
        id: Invitation::doc_id(&list_id, email),
        list_id: list_id.clone(),
        inviter_id: owner.clone(),
        inviter_username: "owner".to_string(),
        invitee_email: email.to_string(),
        role: CollaboratorRole::Editor,
        status: InvitationStatus::Pending,
        created_at: "2026-01-15T10:00:00Z".to_string(),
        responded_at: None,
    };
    let inv_a = invite(&format!("a_{}@example.com", unique_suffix()));
    let inv_b = invite(&format!("b_{}@example.com", unique_suffix()));
    db.set_invitation(&inv_a).await.unwrap();
    db.set_invitation(&inv_b).await.unwrap();

    let grant = |clerk_id: &str| {
        let clerk_id = clerk_id.to_string();
        move |inv: &mut Invitation, list: &mut List| {
            inv.status = InvitationStatus::Accepted;
            list.collaborators.push(Collaborator {
                identity: CollaboratorIdentity::User {
                    clerk_id: clerk_id.clone(),
                    user_id: None,
                },
                role: inv.role,
                status: CollaboratorStatus::Accepted,
                invited_at: inv.created_at.clone(),
                accepted_at: Some("2026-01-15T11:00:00Z".to_string()),
            });
            list.refresh_collaborator_index();
            Ok(())
        }
    };

    // Two accepts of different invitations racing on the same list document
    let (a, b) = tokio::join!(
        db.resolve_invitation_atomic(&inv_a.id, &list_id, grant("user_accept_a")),
        db.resolve_invitation_atomic(&inv_b.id, &list_id, grant("user_accept_b")),
    );
    a.unwrap();
    b.unwrap();

    // Neither grant may overwrite the other
    let list = db.get_list(&list_id).await.unwrap().unwrap();
    assert_eq!(list.collaborators.len(), 2);
    assert!(list
        .collaborator_clerk_ids
        .contains(&"user_accept_a".to_string()));
    assert!(list
        .collaborator_clerk_ids
        .contains(&"user_accept_b".to_string()));

    let inv_a = db.get_invitation(&inv_a.id).await.unwrap().unwrap();
    let inv_b = db.get_invitation(&inv_b.id).await.unwrap().unwrap();
    assert_eq!(inv_a.status, InvitationStatus::Accepted);
    assert_eq!(inv_b.status, InvitationStatus::Accepted);
}

#[tokio::test]
async fn test_cascade_delete_removes_dependents() {
    require_emulator!();

    let db = test_db().await;
    let list_id = format!("list_{}", unique_suffix());
    let owner = format!("user_{}", unique_suffix());
    let pinner = format!("user_{}", unique_suffix());

    db.set_list(&test_list(&list_id, &owner)).await.unwrap();
    db.set_pin(&Pin {
        clerk_id: pinner.clone(),
        list_id: list_id.clone(),
        pinned_at: "2026-01-15T10:00:00Z".to_string(),
        last_viewed_at: None,
    })
    .await
    .unwrap();

    let email = format!("invitee_{}@example.com", unique_suffix());
    db.set_invitation(&Invitation {
        id: Invitation::doc_id(&list_id, &email),
        list_id: list_id.clone(),
        inviter_id: owner.clone(),
        inviter_username: "owner".to_string(),
        invitee_email: email,
        role: CollaboratorRole::Viewer,
        status: InvitationStatus::Pending,
        created_at: "2026-01-15T10:00:00Z".to_string(),
        responded_at: None,
    })
    .await
    .unwrap();

    db.delete_list_cascade(&list_id).await.unwrap();

    assert!(db.get_list(&list_id).await.unwrap().is_none());
    assert!(db.get_pin(&pinner, &list_id).await.unwrap().is_none());
    assert!(db
        .get_invitations_for_list(&list_id)
        .await
        .unwrap()
        .is_empty());
}
