// SPDX-License-Identifier: MIT

//! List access evaluation: the single authoritative permission check.
//!
//! Every route that touches a list calls these predicates instead of
//! re-deriving owner/collaborator/privacy logic inline. All functions are
//! pure over the list document and the requester's clerk id; an
//! unauthenticated requester is `None`.

use crate::models::{AccessType, Collaborator, CollaboratorRole, List, Privacy};

/// Whether the requester is the list owner.
pub fn is_owner(list: &List, clerk_id: &str) -> bool {
    list.owner.clerk_id == clerk_id
}

/// The requester's accepted collaborator entry, if any.
///
/// Pending entries never match: a pending invite grants no permission
/// regardless of role. Email-invite entries never match a clerk id.
fn accepted_entry<'a>(list: &'a List, clerk_id: &str) -> Option<&'a Collaborator> {
    list.collaborators
        .iter()
        .find(|c| c.is_accepted() && c.matches_clerk_id(clerk_id))
}

/// Whether the requester may view the list.
///
/// Public lists are viewable by anyone, including unauthenticated requesters.
/// Private lists require ownership or an accepted collaborator entry of any
/// role.
pub fn can_view(list: &List, requester: Option<&str>) -> bool {
    if list.privacy == Privacy::Public {
        return true;
    }
    let Some(clerk_id) = requester else {
        return false;
    };
    is_owner(list, clerk_id) || accepted_entry(list, clerk_id).is_some()
}

/// Whether the requester may edit list content.
///
/// Owner, or an accepted collaborator with role `admin` or `editor`.
/// Viewer-role collaborators cannot edit.
pub fn can_edit(list: &List, requester: Option<&str>) -> bool {
    let Some(clerk_id) = requester else {
        return false;
    };
    if is_owner(list, clerk_id) {
        return true;
    }
    matches!(
        accepted_entry(list, clerk_id).map(|c| c.role),
        Some(CollaboratorRole::Admin) | Some(CollaboratorRole::Editor)
    )
}

/// Whether the requester may invite, remove, or re-role collaborators.
///
/// Owner, or an accepted `admin` collaborator. The role hierarchy stops
/// here: `editor` edits content but never manages membership.
pub fn can_manage_collaborators(list: &List, requester: Option<&str>) -> bool {
    let Some(clerk_id) = requester else {
        return false;
    };
    if is_owner(list, clerk_id) {
        return true;
    }
    matches!(
        accepted_entry(list, clerk_id).map(|c| c.role),
        Some(CollaboratorRole::Admin)
    )
}

/// Whether the requester may delete the list. Owner only, no delegation.
pub fn can_delete(list: &List, requester: Option<&str>) -> bool {
    requester.is_some_and(|clerk_id| is_owner(list, clerk_id))
}

/// How an authenticated requester qualifies for a recorded view.
///
/// Owner and accepted-collaborator access take precedence over a pin;
/// a requester with none of the three gets no view record.
pub fn view_access_type(list: &List, clerk_id: &str, has_pin: bool) -> Option<AccessType> {
    if is_owner(list, clerk_id) {
        Some(AccessType::Owner)
    } else if accepted_entry(list, clerk_id).is_some() {
        Some(AccessType::Collaborator)
    } else if has_pin {
        Some(AccessType::Pin)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CollaboratorIdentity, CollaboratorStatus, ListOwner, ListStats,
    };

    fn list_with(privacy: Privacy, collaborators: Vec<Collaborator>) -> List {
        List {
            id: "l1".to_string(),
            title: "Top films".to_string(),
            description: String::new(),
            category: Some("movies".to_string()),
            privacy,
            owner: ListOwner {
                user_id: None,
                clerk_id: "u1".to_string(),
                username: "owner".to_string(),
            },
            collaborators,
            collaborator_clerk_ids: vec![],
            items: vec![],
            stats: ListStats::default(),
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
            edited_at: None,
        }
    }

    fn entry(clerk_id: &str, role: CollaboratorRole, status: CollaboratorStatus) -> Collaborator {
        Collaborator {
            identity: CollaboratorIdentity::User {
                clerk_id: clerk_id.to_string(),
                user_id: None,
            },
            role,
            status,
            invited_at: "2026-01-01T00:00:00Z".to_string(),
            accepted_at: (status == CollaboratorStatus::Accepted)
                .then(|| "2026-01-02T00:00:00Z".to_string()),
        }
    }

    fn email_entry(email: &str, role: CollaboratorRole) -> Collaborator {
        Collaborator {
            identity: CollaboratorIdentity::EmailInvite {
                email: email.to_string(),
            },
            role,
            status: CollaboratorStatus::Pending,
            invited_at: "2026-01-01T00:00:00Z".to_string(),
            accepted_at: None,
        }
    }

    #[test]
    fn public_list_viewable_by_anyone() {
        let list = list_with(Privacy::Public, vec![]);
        assert!(can_view(&list, None));
        assert!(can_view(&list, Some("u1")));
        assert!(can_view(&list, Some("stranger")));
    }

    #[test]
    fn private_list_hidden_from_strangers_and_anonymous() {
        let list = list_with(Privacy::Private, vec![]);
        assert!(!can_view(&list, None));
        assert!(!can_view(&list, Some("stranger")));
        assert!(can_view(&list, Some("u1")));
    }

    #[test]
    fn pending_entry_grants_nothing_regardless_of_role() {
        for role in [
            CollaboratorRole::Admin,
            CollaboratorRole::Editor,
            CollaboratorRole::Viewer,
        ] {
            let list = list_with(
                Privacy::Private,
                vec![entry("u2", role, CollaboratorStatus::Pending)],
            );
            assert!(!can_view(&list, Some("u2")), "role {:?}", role);
            assert!(!can_edit(&list, Some("u2")), "role {:?}", role);
            assert!(!can_manage_collaborators(&list, Some("u2")), "role {:?}", role);
        }
    }

    #[test]
    fn accepted_roles_gate_editing() {
        let cases = [
            (CollaboratorRole::Admin, true),
            (CollaboratorRole::Editor, true),
            (CollaboratorRole::Viewer, false),
        ];
        for (role, expect_edit) in cases {
            let list = list_with(
                Privacy::Private,
                vec![entry("u2", role, CollaboratorStatus::Accepted)],
            );
            assert!(can_view(&list, Some("u2")), "role {:?}", role);
            assert_eq!(can_edit(&list, Some("u2")), expect_edit, "role {:?}", role);
        }
    }

    #[test]
    fn only_admin_and_owner_manage_collaborators() {
        let list = list_with(
            Privacy::Private,
            vec![
                entry("admin", CollaboratorRole::Admin, CollaboratorStatus::Accepted),
                entry("editor", CollaboratorRole::Editor, CollaboratorStatus::Accepted),
                entry("viewer", CollaboratorRole::Viewer, CollaboratorStatus::Accepted),
            ],
        );
        assert!(can_manage_collaborators(&list, Some("u1")));
        assert!(can_manage_collaborators(&list, Some("admin")));
        assert!(!can_manage_collaborators(&list, Some("editor")));
        assert!(!can_manage_collaborators(&list, Some("viewer")));
        assert!(!can_manage_collaborators(&list, None));
    }

    #[test]
    fn delete_is_owner_only() {
        let list = list_with(
            Privacy::Private,
            vec![entry("admin", CollaboratorRole::Admin, CollaboratorStatus::Accepted)],
        );
        assert!(can_delete(&list, Some("u1")));
        assert!(!can_delete(&list, Some("admin")));
        assert!(!can_delete(&list, None));
    }

    #[test]
    fn private_editor_scenario() {
        // private list, u1 owner, u2 accepted editor
        let list = list_with(
            Privacy::Private,
            vec![entry("u2", CollaboratorRole::Editor, CollaboratorStatus::Accepted)],
        );
        assert!(can_edit(&list, Some("u2")));
        assert!(!can_edit(&list, Some("u3")));
        assert!(!can_view(&list, None));
    }

    #[test]
    fn email_invite_never_matches_a_clerk_id() {
        // Even if someone's clerk id happens to equal the invite email,
        // matching is by clerk_id field only.
        let list = list_with(
            Privacy::Private,
            vec![email_entry("a@x.com", CollaboratorRole::Admin)],
        );
        assert!(!can_view(&list, Some("a@x.com")));
        assert!(!can_edit(&list, Some("a@x.com")));
    }

    #[test]
    fn view_access_type_precedence() {
        let list = list_with(
            Privacy::Public,
            vec![entry("u2", CollaboratorRole::Viewer, CollaboratorStatus::Accepted)],
        );
        assert_eq!(view_access_type(&list, "u1", true), Some(AccessType::Owner));
        assert_eq!(
            view_access_type(&list, "u2", true),
            Some(AccessType::Collaborator)
        );
        assert_eq!(view_access_type(&list, "u3", true), Some(AccessType::Pin));
        assert_eq!(view_access_type(&list, "u3", false), None);
    }
}
