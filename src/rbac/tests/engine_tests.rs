//! Authorization engine integration tests
//!
//! Grant resolution across the resource hierarchy and the role graph,
//! superuser bypass, and property checks over generated grants.

mod common;

use common::Fixture;
use cretoai_rbac::{
    Decision, InMemoryPermissionStore, Mutation, Permission, PermissionStore, Resource,
    ResourceHierarchy, Role, RoleMembership,
};
use proptest::prelude::*;

// ============================================================================
// SUPERUSER
// ============================================================================

#[tokio::test]
async fn test_superuser_bypasses_all_checks() {
    let fx = Fixture::with_roles(&[]).await;
    let admin = fx.role("admin");
    assert!(admin.is_superuser);

    for permission in Permission::INDIVIDUAL {
        assert!(fx.engine.authorize(&admin, permission, &Resource::AllKeyspaces));
        assert!(fx.engine.authorize(&admin, permission, &Resource::role("anyone")));
    }
    assert_eq!(
        fx.engine.explain(&admin, Permission::Drop, &Resource::keyspace("ks")),
        Decision::Superuser
    );
}

#[tokio::test]
async fn test_no_grants_denies() {
    let fx = Fixture::with_roles(&["alice"]).await;

    for permission in Permission::INDIVIDUAL {
        assert!(!fx.allowed("alice", permission, &Resource::table("ks", "t")));
    }
    assert_eq!(fx.engine.metrics().allowed_decisions, 0);
}

// ============================================================================
// RESOURCE HIERARCHY
// ============================================================================

#[tokio::test]
async fn test_all_keyspaces_grant_covers_everything_below() {
    let fx = Fixture::with_roles(&["alice"]).await;
    fx.grant("alice", Permission::Select, Resource::AllKeyspaces).await;
    fx.sync().await;

    assert!(fx.allowed("alice", Permission::Select, &Resource::AllKeyspaces));
    assert!(fx.allowed("alice", Permission::Select, &Resource::keyspace("a")));
    assert!(fx.allowed("alice", Permission::Select, &Resource::table("b", "t")));
    assert!(!fx.allowed("alice", Permission::Select, &Resource::AllRoles));
}

#[tokio::test]
async fn test_table_grant_does_not_cover_sibling() {
    let fx = Fixture::with_roles(&["alice"]).await;
    fx.grant("alice", Permission::Select, Resource::table("ks", "t1")).await;
    fx.sync().await;

    assert!(fx.allowed("alice", Permission::Select, &Resource::table("ks", "t1")));
    assert!(!fx.allowed("alice", Permission::Select, &Resource::table("ks", "t2")));
    assert!(!fx.allowed("alice", Permission::Select, &Resource::keyspace("ks")));
}

#[tokio::test]
async fn test_all_grant_covers_every_permission() {
    let fx = Fixture::with_roles(&["alice"]).await;
    fx.grant("alice", Permission::All, Resource::keyspace("ks")).await;
    fx.sync().await;

    for permission in Permission::INDIVIDUAL {
        if permission == Permission::Drop {
            continue;
        }
        assert!(
            fx.allowed("alice", permission, &Resource::keyspace("ks")),
            "ALL on keyspace should cover {}",
            permission
        );
    }
    for permission in Permission::INDIVIDUAL {
        assert!(fx.allowed("alice", permission, &Resource::table("ks", "t")));
    }
}

#[tokio::test]
async fn test_keyspace_drop_covers_tables_not_keyspace() {
    let fx = Fixture::with_roles(&["alice", "bob"]).await;
    fx.grant("alice", Permission::Drop, Resource::keyspace("ks")).await;
    fx.grant("bob", Permission::Drop, Resource::AllKeyspaces).await;
    fx.sync().await;

    assert!(fx.allowed("alice", Permission::Drop, &Resource::table("ks", "t")));
    assert!(!fx.allowed("alice", Permission::Drop, &Resource::keyspace("ks")));

    assert!(fx.allowed("bob", Permission::Drop, &Resource::keyspace("ks")));
    assert!(fx.allowed("bob", Permission::Drop, &Resource::table("ks", "t")));
}

#[tokio::test]
async fn test_all_roles_grant_covers_each_role() {
    let fx = Fixture::with_roles(&["alice", "bob"]).await;
    fx.grant("alice", Permission::Authorize, Resource::AllRoles).await;
    fx.sync().await;

    assert!(fx.allowed("alice", Permission::Authorize, &Resource::role("bob")));
    assert!(!fx.allowed("alice", Permission::Authorize, &Resource::keyspace("ks")));
}

// ============================================================================
// ROLE GRAPH
// ============================================================================

#[tokio::test]
async fn test_member_inherits_granted_role_permissions() {
    let fx = Fixture::with_roles(&["alice", "bob", "analyst", "reader"]).await;
    fx.grant("reader", Permission::Select, Resource::keyspace("shop")).await;
    fx.add_member("analyst", "reader").await;
    fx.add_member("alice", "analyst").await;
    fx.sync().await;

    let table = Resource::table("shop", "orders");
    assert!(fx.allowed("alice", Permission::Select, &table));
    assert!(fx.allowed("analyst", Permission::Select, &table));
    assert!(!fx.allowed("bob", Permission::Select, &table));

    // Inheritance is one-way
    fx.grant("alice", Permission::Modify, table.clone()).await;
    fx.sync().await;
    assert!(!fx.allowed("reader", Permission::Modify, &table));

    match fx.engine.explain(&fx.role("alice"), Permission::Select, &table) {
        Decision::Granted { role, scope, .. } => {
            assert_eq!(role, "reader");
            assert_eq!(scope, Resource::keyspace("shop"));
        }
        other => panic!("Expected Granted, got {:?}", other),
    }
}

#[tokio::test]
async fn test_revoked_membership_drops_inherited_permissions() {
    let fx = Fixture::with_roles(&["alice", "analyst"]).await;
    fx.grant("analyst", Permission::Select, Resource::AllKeyspaces).await;
    fx.add_member("alice", "analyst").await;
    fx.sync().await;
    assert!(fx.allowed("alice", Permission::Select, &Resource::keyspace("ks")));

    fx.store
        .mutate(Mutation::RevokeRole(RoleMembership::new("alice", "analyst")))
        .await
        .unwrap();
    fx.sync().await;
    assert!(!fx.allowed("alice", Permission::Select, &Resource::keyspace("ks")));
}

#[tokio::test]
async fn test_unknown_principal_has_no_permissions() {
    let fx = Fixture::with_roles(&["alice"]).await;
    fx.grant("alice", Permission::Select, Resource::AllKeyspaces).await;
    fx.sync().await;

    let ghost = Role::new("ghost");
    assert!(fx.engine.principal("ghost").is_none());
    assert!(!fx.engine.authorize(&ghost, Permission::Select, &Resource::keyspace("ks")));
}

// ============================================================================
// CONCURRENCY
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_authorize_during_refresh() {
    let fx = Fixture::with_roles(&["alice"]).await;
    let ks = Resource::keyspace("ks");

    let readers: Vec<_> = (0..8)
        .map(|_| {
            let engine = fx.engine.clone();
            let ks = ks.clone();
            tokio::task::spawn_blocking(move || {
                let alice = Role::login("alice");
                let mut allowed = 0u32;
                for _ in 0..2_000 {
                    if engine.authorize(&alice, Permission::Select, &ks) {
                        allowed += 1;
                    }
                }
                allowed
            })
        })
        .collect();

    for i in 0..20 {
        if i % 2 == 0 {
            fx.grant("alice", Permission::Select, ks.clone()).await;
        } else {
            fx.revoke("alice", Permission::Select, ks.clone()).await;
        }
        fx.sync().await;
    }

    let results = futures::future::join_all(readers).await;
    for result in results {
        assert!(result.unwrap() <= 2_000);
    }

    let metrics = fx.engine.metrics();
    assert_eq!(metrics.total_requests, 16_000);
    assert_eq!(metrics.allowed_decisions + metrics.denied_decisions, 16_000);
}

// ============================================================================
// PROPERTIES
// ============================================================================

fn name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,7}"
}

fn permission() -> impl Strategy<Value = Permission> {
    prop::sample::select(Permission::INDIVIDUAL.to_vec())
}

fn resource() -> impl Strategy<Value = Resource> {
    prop_oneof![
        Just(Resource::AllKeyspaces),
        name().prop_map(Resource::Keyspace),
        (name(), name()).prop_map(|(ks, t)| Resource::table(ks, t)),
        Just(Resource::AllRoles),
        name().prop_map(Resource::Role),
    ]
}

/// Engine over a store holding `grants` for role `user`
fn engine_with_grants(
    grants: Vec<(Permission, Resource)>,
    superuser: bool,
) -> cretoai_rbac::AuthorizationEngine {
    tokio_test::block_on(async {
        let store = InMemoryPermissionStore::new();
        store
            .create_role(Role::login("user").with_superuser(superuser))
            .await
            .unwrap();
        for (_, resource) in &grants {
            if let Resource::Role(name) = resource {
                // Grants on a role require the role to exist
                let _ = store.create_role(Role::new(name.clone())).await;
            }
        }
        for (permission, resource) in grants {
            store
                .mutate(Mutation::Grant(cretoai_rbac::Grant::new(
                    "user", permission, resource,
                )))
                .await
                .unwrap();
        }
        cretoai_rbac::AuthorizationEngine::start(Default::default(), std::sync::Arc::new(store))
            .await
            .unwrap()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_superuser_always_allowed(p in permission(), r in resource()) {
        let engine = engine_with_grants(vec![], true);
        let user = engine.principal("user").unwrap();
        prop_assert!(engine.authorize(&user, p, &r));
    }

    #[test]
    fn prop_no_grants_never_allowed(p in permission(), r in resource()) {
        let engine = engine_with_grants(vec![], false);
        let user = engine.principal("user").unwrap();
        prop_assert!(!engine.authorize(&user, p, &r));
    }

    #[test]
    fn prop_ancestor_grant_covers_table(
        p in permission(),
        ks in name(),
        t in name(),
        level in 0usize..3,
    ) {
        let table = Resource::table(ks, t);
        let scope = ResourceHierarchy::ancestors_of(&table)[level].clone();

        let engine = engine_with_grants(vec![(p, scope)], false);
        let user = engine.principal("user").unwrap();
        prop_assert!(engine.authorize(&user, p, &table));
    }

    #[test]
    fn prop_table_grant_does_not_leak_to_sibling(
        p in permission(),
        ks in name(),
        t1 in name(),
        t2 in name(),
    ) {
        prop_assume!(t1 != t2);

        let engine = engine_with_grants(vec![(p, Resource::table(ks.clone(), t1))], false);
        let user = engine.principal("user").unwrap();
        prop_assert!(!engine.authorize(&user, p, &Resource::table(ks, t2)));
    }

    #[test]
    fn prop_all_grant_covers_every_permission(r in resource(), p in permission()) {
        prop_assume!(!(p == Permission::Drop && matches!(r, Resource::Keyspace(_))));

        let engine = engine_with_grants(vec![(Permission::All, r.clone())], false);
        let user = engine.principal("user").unwrap();
        prop_assert!(engine.authorize(&user, p, &r));
    }
}
