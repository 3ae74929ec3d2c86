//! Integration tests for transitive role resolution
//!
//! Covers direct, group and containment membership, both containment
//! directions, cycle safety, qualifier roll-up and concurrent resolution.

mod common;

use common::{date, graph_with_roles, init_tracing, resolver, roles};
use proptest::prelude::*;
use routeflow_kim::graph::RoleGraph;
use routeflow_kim::resolver::{ContainmentDirection, ResolverConfig};
use routeflow_kim::types::{Role, RoleMembership};
use routeflow_kim::QualifierSet;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tokio::task::JoinSet;

fn inverse() -> ResolverConfig {
    ResolverConfig {
        containment: ContainmentDirection::ContainingImpliesContained,
        ..Default::default()
    }
}

// ============================================================================
// MEMBERSHIP SCENARIOS
// ============================================================================

#[test]
fn test_principal_directly_in_role() {
    init_tracing();
    let graph = graph_with_roles(&["r1", "r2"]);
    graph.add_member(RoleMembership::principal("m1", "r1", "p1")).unwrap();

    let resolver = resolver(graph, ResolverConfig::default());
    assert!(resolver.principal_has_role("p1", &roles(&["r1"]), None));
}

#[test]
fn test_principal_in_role_through_group() {
    init_tracing();
    let graph = graph_with_roles(&["r1", "r2"]);
    graph.add_group_member("g1", "p2");
    graph.add_member(RoleMembership::group("m1", "r2", "g1")).unwrap();

    let resolver = resolver(graph, ResolverConfig::default());
    assert!(resolver.principal_has_role("p2", &roles(&["r2"]), None));
    assert!(!resolver.principal_has_role("p2", &roles(&["r1"]), None));
}

#[test]
fn test_containing_role_member_holds_contained_role() {
    init_tracing();
    // p3 in r2, r2 contains r1
    let graph = graph_with_roles(&["r1", "r2"]);
    graph.add_member(RoleMembership::principal("m1", "r2", "p3")).unwrap();
    graph.add_containment("r2", "r1").unwrap();

    let resolver = resolver(graph, inverse());
    assert!(resolver.principal_has_role("p3", &roles(&["r1"]), None));
}

#[test]
fn test_containment_transitivity() {
    init_tracing();
    // A contains B, B contains C, P in C
    let graph = graph_with_roles(&["A", "B", "C"]);
    graph.add_containment("A", "B").unwrap();
    graph.add_containment("B", "C").unwrap();
    graph.add_member(RoleMembership::principal("m1", "C", "P")).unwrap();

    let resolver = resolver(graph, ResolverConfig::default());
    assert!(resolver.principal_has_role("P", &roles(&["A"]), None));
    assert!(resolver.principal_has_role("P", &roles(&["B"]), None));
}

#[test]
fn test_any_requested_role_suffices() {
    let graph = graph_with_roles(&["r1", "r2", "r3"]);
    graph.add_member(RoleMembership::principal("m1", "r3", "p1")).unwrap();

    let resolver = resolver(graph, ResolverConfig::default());
    assert!(resolver.principal_has_role("p1", &roles(&["r1", "r2", "r3"]), None));
    assert!(!resolver.principal_has_role("p1", &roles(&["r1", "r2"]), None));
}

#[test]
fn test_containment_cycle_terminates() {
    init_tracing();
    let graph = graph_with_roles(&["A", "B", "C"]);
    graph.add_containment("A", "B").unwrap();
    graph.add_containment("B", "A").unwrap();
    graph.add_member(RoleMembership::principal("m1", "B", "p1")).unwrap();

    assert_eq!(graph.containment_cycles().len(), 1);

    for config in [ResolverConfig::default(), inverse()] {
        let resolver = resolver(graph.clone(), config);
        assert!(resolver.principal_has_role("p1", &roles(&["A"]), None));
        assert!(!resolver.principal_has_role("p2", &roles(&["A"]), None));
        assert!(!resolver.principal_has_role("p1", &roles(&["C"]), None));
    }
}

#[test]
fn test_depth_limit_fails_closed() {
    let ids: Vec<String> = (0..10).map(|i| format!("r{}", i)).collect();
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let graph = graph_with_roles(&id_refs);
    for pair in ids.windows(2) {
        graph.add_containment(&pair[1], &pair[0]).unwrap();
    }
    graph.add_member(RoleMembership::principal("m1", "r0", "p1")).unwrap();

    let shallow = ResolverConfig {
        max_depth: 3,
        ..Default::default()
    };
    let top = roles(&["r9"]);
    assert!(!resolver(graph.clone(), shallow).principal_has_role("p1", &top, None));
    assert!(resolver(graph, ResolverConfig::default()).principal_has_role("p1", &top, None));
}

#[test]
fn test_resolution_is_idempotent() {
    let graph = graph_with_roles(&["r1", "r2"]);
    graph.add_containment("r2", "r1").unwrap();
    graph.add_member(RoleMembership::principal("m1", "r1", "p1")).unwrap();

    let resolver = resolver(graph, ResolverConfig::default());
    let q = QualifierSet::new().with("dept", "CHEM");

    let first = resolver.principal_has_role("p1", &roles(&["r2"]), Some(&q));
    let second = resolver.principal_has_role("p1", &roles(&["r2"]), Some(&q));
    assert_eq!(first, second);
    assert_eq!(resolver.cache_stats().hits, 1);
}

#[test]
fn test_inactive_role_never_matches() {
    let graph = graph_with_roles(&[]);
    graph.add_role(Role::new("r1", "KR", "Old", "default").inactive()).unwrap();
    graph.add_member(RoleMembership::principal("m1", "r1", "p1")).unwrap();

    let resolver = resolver(graph, ResolverConfig::default());
    assert!(!resolver.principal_has_role("p1", &roles(&["r1"]), None));
}

#[test]
fn test_unregistered_role_type_is_no_match() {
    init_tracing();
    let graph = graph_with_roles(&["r1"]);
    graph.add_role(Role::new("x", "KR", "Custom", "campus")).unwrap();
    graph.add_member(RoleMembership::principal("m1", "x", "p1")).unwrap();
    graph.add_containment("r1", "x").unwrap();

    let resolver = resolver(graph, ResolverConfig::default());
    assert!(!resolver.principal_has_role("p1", &roles(&["x"]), None));
    assert!(!resolver.principal_has_role("p1", &roles(&["r1"]), None));
}

#[test]
fn test_membership_dates() {
    let graph = graph_with_roles(&["r1"]);
    graph
        .add_member(
            RoleMembership::principal("m1", "r1", "p1")
                .with_active_range(Some(date(2020, 1, 1)), None),
        )
        .unwrap();

    let resolver = resolver(graph, ResolverConfig::default());
    assert!(!resolver.principal_has_role_as_of("p1", &roles(&["r1"]), None, date(2019, 12, 31)));
    assert!(resolver.principal_has_role_as_of("p1", &roles(&["r1"]), None, date(2020, 1, 1)));
}

/// `layers` layers of two roles each; every role contains both roles of the
/// next layer. Returns the graph with roles named `L{layer}_{index}`.
fn lattice(layers: usize) -> Arc<routeflow_kim::graph::InMemoryRoleGraph> {
    let ids: Vec<String> = (0..layers)
        .flat_map(|layer| (0..2).map(move |i| format!("L{}_{}", layer, i)))
        .collect();
    let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let graph = graph_with_roles(&refs);

    for layer in 0..layers - 1 {
        for i in 0..2 {
            for j in 0..2 {
                graph
                    .add_containment(&format!("L{}_{}", layer, i), &format!("L{}_{}", layer + 1, j))
                    .unwrap();
            }
        }
    }
    graph
}

#[test]
fn test_shared_sub_hierarchies_are_walked_once() {
    init_tracing();
    let graph = lattice(24);
    graph
        .add_member(RoleMembership::principal("m1", "L23_1", "p1"))
        .unwrap();

    let config = ResolverConfig {
        cache_enabled: false,
        ..Default::default()
    };
    let resolver = resolver(graph, config);
    let top = roles(&["L0_0"]);

    assert!(!resolver.principal_has_role("nobody", &top, None));
    assert!(resolver.principal_has_role("p1", &top, None));

    let members = resolver.role_members(&top, None);
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].via_role_id, "L23_1");
}

// ============================================================================
// QUALIFIERS
// ============================================================================

#[test]
fn test_hierarchical_subject_roll_up() {
    let graph = graph_with_roles(&[]);
    graph.add_role(Role::new("chair", "KR", "Chair", "subject")).unwrap();
    graph
        .add_member(
            RoleMembership::principal("m1", "chair", "p1")
                .with_qualifier(QualifierSet::new().with("subject", "PHYS")),
        )
        .unwrap();

    let resolver = resolver(graph, ResolverConfig::default());
    let chair = roles(&["chair"]);

    let chem = QualifierSet::new().with("subject", "CHEM");
    let sci = QualifierSet::new().with("subject", "SCI");
    assert!(resolver.principal_has_role("p1", &chair, Some(&chem)));
    assert!(!resolver.principal_has_role("p1", &chair, Some(&sci)));
}

#[test]
fn test_qualified_containment_edge() {
    let graph = graph_with_roles(&["r1", "r2"]);
    graph.add_member(RoleMembership::principal("m1", "r1", "p1")).unwrap();
    graph
        .add_member(
            RoleMembership::role("e1", "r2", "r1")
                .with_qualifier(QualifierSet::new().with("dept", "CHEM")),
        )
        .unwrap();

    let resolver = resolver(graph, ResolverConfig::default());
    let chem = QualifierSet::new().with("dept", "CHEM");
    let phys = QualifierSet::new().with("dept", "PHYS");

    assert!(resolver.principal_has_role("p1", &roles(&["r2"]), Some(&chem)));
    assert!(!resolver.principal_has_role("p1", &roles(&["r2"]), Some(&phys)));
    assert!(resolver.principal_has_role("p1", &roles(&["r2"]), None));
}

#[test]
fn test_role_members_in_inverse_direction() {
    let graph = graph_with_roles(&["r1", "r2"]);
    graph.add_member(RoleMembership::principal("m1", "r2", "p3")).unwrap();
    graph.add_member(RoleMembership::principal("m2", "r1", "p1")).unwrap();
    graph.add_containment("r2", "r1").unwrap();

    let resolver = resolver(graph, inverse());
    let members = resolver.role_members(&roles(&["r1"]), None);

    let principals: Vec<&str> = members.iter().map(|m| m.principal_id.as_str()).collect();
    assert_eq!(principals, vec!["p1", "p3"]);
    assert_eq!(members[1].via_role_id, "r2");
}

// ============================================================================
// CACHE
// ============================================================================

#[test]
fn test_removed_validator_invalidates_cached_answers() {
    let graph = graph_with_roles(&["r1"]);
    graph.add_member(RoleMembership::principal("m1", "r1", "p1")).unwrap();

    let resolver = resolver(graph, ResolverConfig::default());
    assert!(resolver.principal_has_role("p1", &roles(&["r1"]), None));

    assert!(resolver.validators().remove("default"));
    assert!(!resolver.principal_has_role("p1", &roles(&["r1"]), None));
}

#[test]
fn test_cache_keeps_caching_across_mutations() {
    let graph = graph_with_roles(&["r1"]);
    let config = ResolverConfig {
        max_cache_size: 2,
        ..Default::default()
    };
    let resolver = resolver(graph.clone(), config);
    let r1 = roles(&["r1"]);

    for i in 0..3 {
        graph
            .add_member(RoleMembership::principal(format!("m{}", i), "r1", format!("p{}", i)))
            .unwrap();
        assert!(resolver.principal_has_role("p0", &r1, None));
    }
    assert!(resolver.principal_has_role("p0", &r1, None));

    let stats = resolver.cache_stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 3);
    assert_eq!(stats.size, 1);
}

// ============================================================================
// CONCURRENCY
// ============================================================================

#[tokio::test]
async fn test_concurrent_resolution() {
    let graph = graph_with_roles(&["r1", "r2", "r3"]);
    graph.add_containment("r3", "r2").unwrap();
    graph.add_containment("r2", "r1").unwrap();
    for i in 0..20 {
        graph
            .add_member(RoleMembership::principal(format!("m{}", i), "r1", format!("p{}", i)))
            .unwrap();
    }

    let resolver = Arc::new(resolver(graph, ResolverConfig::default()));
    let mut join_set = JoinSet::new();

    for i in 0..100 {
        let resolver = resolver.clone();
        join_set.spawn(async move {
            let principal = format!("p{}", i % 25);
            (i % 25 < 20, resolver.principal_has_role(&principal, &roles(&["r3"]), None))
        });
    }

    while let Some(result) = join_set.join_next().await {
        let (expected, holds) = result.unwrap();
        assert_eq!(expected, holds);
    }

    let stats = resolver.cache_stats();
    assert_eq!(stats.size, 25);
}

#[tokio::test]
async fn test_resolution_during_mutation() {
    let graph = graph_with_roles(&["r1"]);
    let resolver = Arc::new(resolver(graph.clone(), ResolverConfig::default()));
    let mut join_set = JoinSet::new();

    for i in 0..50 {
        let graph = graph.clone();
        join_set.spawn(async move {
            graph
                .add_member(RoleMembership::principal(format!("m{}", i), "r1", format!("p{}", i)))
                .unwrap();
        });
    }
    for i in 0..50 {
        let resolver = resolver.clone();
        join_set.spawn(async move {
            let _ = resolver.principal_has_role(&format!("p{}", i), &roles(&["r1"]), None);
        });
    }

    while let Some(result) = join_set.join_next().await {
        result.unwrap();
    }

    assert_eq!(graph.members_of("r1").len(), 50);
    assert!(resolver.principal_has_role("p7", &roles(&["r1"]), None));
}

// ============================================================================
// PROPERTY-BASED TESTS (PROPTEST)
// ============================================================================

/// Does `from` reach `target` over contained-role edges?
fn reaches(edges: &[(usize, usize)], from: usize, target: usize) -> bool {
    let mut seen = HashSet::new();
    let mut queue = VecDeque::from([from]);
    while let Some(current) = queue.pop_front() {
        if current == target {
            return true;
        }
        if seen.insert(current) {
            for (containing, contained) in edges {
                if *containing == current {
                    queue.push_back(*contained);
                }
            }
        }
    }
    false
}

proptest! {
    #[test]
    fn test_membership_matches_reachability(
        edges in prop::collection::vec((0usize..6, 0usize..6), 0..12),
        assigned in 0usize..6,
    ) {
        let ids: Vec<String> = (0..6).map(|i| format!("r{}", i)).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let graph = graph_with_roles(&id_refs);

        let mut accepted = Vec::new();
        for (containing, contained) in edges {
            if graph.add_containment(&ids[containing], &ids[contained]).is_ok() {
                accepted.push((containing, contained));
            }
        }
        graph.add_member(RoleMembership::principal("m", &ids[assigned], "p")).unwrap();

        let resolver = resolver(graph, ResolverConfig::default());
        for (role, id) in ids.iter().enumerate() {
            let expected = reaches(&accepted, role, assigned);
            let holds = resolver.principal_has_role_as_of(
                "p",
                std::slice::from_ref(id),
                None,
                date(2024, 1, 1),
            );
            prop_assert_eq!(holds, expected, "role {}", id);
        }
    }

    #[test]
    fn test_resolution_is_deterministic(
        edges in prop::collection::vec((0usize..5, 0usize..5), 0..10),
    ) {
        let ids: Vec<String> = (0..5).map(|i| format!("r{}", i)).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let graph = graph_with_roles(&id_refs);
        for (containing, contained) in edges {
            let _ = graph.add_containment(&ids[containing], &ids[contained]);
        }
        graph.add_member(RoleMembership::principal("m", "r0", "p")).unwrap();

        let config = ResolverConfig { cache_enabled: false, ..Default::default() };
        let resolver = resolver(graph, config);

        let first = resolver.principal_has_role("p", &ids, None);
        let second = resolver.principal_has_role("p", &ids, None);
        prop_assert_eq!(first, second);
        prop_assert!(first);
    }
}
