use criterion::{black_box, criterion_group, criterion_main, Criterion};
use curate_api::models::{
    Collaborator, CollaboratorIdentity, CollaboratorRole, CollaboratorStatus, List, ListOwner,
    ListStats, Privacy,
};
use curate_api::services::access;

/// A private list with `n` accepted collaborators, alternating roles.
fn list_with_collaborators(n: usize) -> List {
    let collaborators = (0..n)
        .map(|i| Collaborator {
            identity: CollaboratorIdentity::User {
                clerk_id: format!("user_{}", i),
                user_id: None,
            },
            role: match i % 3 {
                0 => CollaboratorRole::Admin,
                1 => CollaboratorRole::Editor,
                _ => CollaboratorRole::Viewer,
            },
            status: CollaboratorStatus::Accepted,
            invited_at: "2026-01-01T00:00:00Z".to_string(),
            accepted_at: Some("2026-01-02T00:00:00Z".to_string()),
        })
        .collect::<Vec<_>>();

    let mut list = List {
        id: "bench_list".to_string(),
        title: "Benchmark list".to_string(),
        description: String::new(),
        category: None,
        privacy: Privacy::Private,
        owner: ListOwner {
            user_id: None,
            clerk_id: "owner".to_string(),
            username: "owner".to_string(),
        },
        collaborators,
        collaborator_clerk_ids: vec![],
        items: vec![],
        stats: ListStats::default(),
        created_at: "2026-01-01T00:00:00Z".to_string(),
        updated_at: "2026-01-01T00:00:00Z".to_string(),
        edited_at: None,
    };
    list.refresh_collaborator_index();
    list
}

fn benchmark_access_evaluation(c: &mut Criterion) {
    let small = list_with_collaborators(5);
    let large = list_with_collaborators(500);

    let mut group = c.benchmark_group("access_evaluation");

    group.bench_function("can_view_hit_small", |b| {
        b.iter(|| access::can_view(black_box(&small), black_box(Some("user_3"))))
    });

    group.bench_function("can_view_miss_large", |b| {
        b.iter(|| access::can_view(black_box(&large), black_box(Some("stranger"))))
    });

    group.bench_function("can_edit_last_entry_large", |b| {
        b.iter(|| access::can_edit(black_box(&large), black_box(Some("user_499"))))
    });

    group.bench_function("can_manage_owner_large", |b| {
        b.iter(|| access::can_manage_collaborators(black_box(&large), black_box(Some("owner"))))
    });

    group.finish();
}

criterion_group!(benches, benchmark_access_evaluation);
criterion_main!(benches);
