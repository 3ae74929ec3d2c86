//! Integration tests for route-node actor resolution
//!
//! Builds a small purchasing workflow: reviewers qualified by department,
//! an approver group, and delegations on the reviewer role.

mod common;

use common::{date, graph_with_roles, init_tracing, validators};
use routeflow_kim::graph::InMemoryRoleGraph;
use routeflow_kim::resolver::{ResolverConfig, RoleResolver};
use routeflow_kim::responsibility::{
    InMemoryResponsibilities, Responsibility, ResponsibilityAction,
};
use routeflow_kim::routing::{
    ActorResolver, InMemoryRoutingDefinitions, ResponsibilityBinding, RouteNode, RoutedDocument,
    RoutingDefinition,
};
use routeflow_kim::types::{
    ActionPolicy, ActionType, ActiveRange, Delegation, DelegationMember, DelegationType, MemberKind,
    RoleMembership,
};
use routeflow_kim::{KimError, QualifierSet};
use std::sync::Arc;
use tokio::task::JoinSet;

struct Workflow {
    graph: Arc<InMemoryRoleGraph>,
    responsibilities: Arc<InMemoryResponsibilities>,
    actors: ActorResolver,
}

fn dept(value: &str) -> QualifierSet {
    QualifierSet::new().with("dept", value)
}

fn binding(node: &str, responsibility_id: &str, role_id: &str) -> ResponsibilityBinding {
    ResponsibilityBinding::new(node, responsibility_id, &[role_id])
}

fn workflow() -> Workflow {
    init_tracing();
    let graph = graph_with_roles(&["reviewers", "approvers"]);

    graph
        .add_member(RoleMembership::principal("m1", "reviewers", "p1").with_qualifier(dept("CHEM")))
        .unwrap();
    graph
        .add_member(RoleMembership::principal("m2", "reviewers", "p2").with_qualifier(dept("PHYS")))
        .unwrap();
    graph.add_member(RoleMembership::principal("m3", "approvers", "p1")).unwrap();
    graph.add_group_member("g1", "p3");
    graph.add_group_member("g1", "p4");
    graph.add_member(RoleMembership::group("m4", "approvers", "g1")).unwrap();

    let responsibilities = Arc::new(
        InMemoryResponsibilities::new()
            .with_responsibility(Responsibility::new("rsp-review", "KR-WKFLW", "Review"))
            .with_responsibility(
                Responsibility::new("rsp-approve", "KR-WKFLW", "Approve").at_assignment_level(),
            ),
    );
    responsibilities.add_action(
        "reviewers",
        ResponsibilityAction::new("rsp-review", ActionType::Approve, ActionPolicy::FirstApprove, 2),
    );
    responsibilities.add_action(
        "approvers",
        ResponsibilityAction::new(
            "rsp-approve",
            ActionType::Acknowledge,
            ActionPolicy::AllApprove,
            1,
        ),
    );

    let definitions = Arc::new(
        InMemoryRoutingDefinitions::new()
            .with(
                RoutingDefinition::new("PO")
                    .with_node(RouteNode::new("Review").with_next("Approve"))
                    .with_node(RouteNode::new("Approve"))
                    .with_binding(binding("Review", "rsp-review", "reviewers"))
                    .with_binding(binding("Approve", "rsp-review", "reviewers"))
                    .with_binding(binding("Approve", "rsp-approve", "approvers")),
            )
            .with(RoutingDefinition::new("PO.Capital").with_parent("PO"))
            .with(
                RoutingDefinition::new("PO.Lab")
                    .with_parent("PO")
                    .with_binding(binding("Approve", "rsp-approve", "approvers")),
            ),
    );

    let resolver = Arc::new(RoleResolver::new(
        graph.clone(),
        validators(),
        ResolverConfig::default(),
    ));
    let actors = ActorResolver::new(resolver, definitions, responsibilities.clone());

    Workflow {
        graph,
        responsibilities,
        actors,
    }
}

fn purchase_order(document_type: &str) -> RoutedDocument {
    RoutedDocument::new("doc-42", document_type).with_attribute("dept", "CHEM")
}

fn sorted(mut principals: Vec<&str>) -> Vec<&str> {
    principals.sort();
    principals
}

// ============================================================================
// NODE RESOLUTION
// ============================================================================

#[test]
fn test_resolve_review_node() {
    let wf = workflow();
    let result = wf
        .actors
        .resolve_actors(&purchase_order("PO"), &RouteNode::new("Review"))
        .unwrap();

    assert_eq!(result.principals(), vec!["p1"]);
    let request = &result.requests[0];
    assert_eq!(request.action, ActionType::Approve);
    assert_eq!(request.source_role_id, "reviewers");
    assert_eq!(request.membership_id, "m1");
    assert_eq!(request.qualifier.get("documentTypeName"), Some("PO"));
    assert_eq!(request.qualifier.get("routeNodeName"), Some("Review"));
    assert_eq!(request.delegated_for, None);
}

#[test]
fn test_one_request_per_principal() {
    let wf = workflow();
    let result = wf
        .actors
        .resolve_actors(&purchase_order("PO"), &RouteNode::new("Approve"))
        .unwrap();

    assert_eq!(result.len(), 3);
    assert_eq!(result.principals()[0], "p1");
    assert_eq!(sorted(result.principals()), vec!["p1", "p3", "p4"]);

    // Approve (rank 3) from the review binding beats Acknowledge
    assert_eq!(result.for_principal("p1").unwrap().action, ActionType::Approve);
    assert_eq!(result.for_principal("p3").unwrap().action, ActionType::Acknowledge);
    assert_eq!(result.for_principal("p4").unwrap().membership_id, "m4");
}

#[test]
fn test_member_level_actions() {
    let wf = workflow();
    wf.responsibilities.add_action(
        "approvers",
        ResponsibilityAction::new("rsp-approve", ActionType::Complete, ActionPolicy::AllApprove, 1)
            .for_member("m4"),
    );

    let result = wf
        .actors
        .resolve_actors(&purchase_order("PO.Lab"), &RouteNode::new("Approve"))
        .unwrap();

    assert_eq!(result.for_principal("p1").unwrap().action, ActionType::Acknowledge);
    assert_eq!(result.for_principal("p3").unwrap().action, ActionType::Complete);
}

#[test]
fn test_incomplete_member_action_skips_only_that_member() {
    let wf = workflow();
    wf.responsibilities
        .add_action("approvers", ResponsibilityAction::empty("rsp-approve").for_member("m4"));

    let result = wf
        .actors
        .resolve_actors(&purchase_order("PO.Lab"), &RouteNode::new("Approve"))
        .unwrap();

    assert_eq!(result.principals(), vec!["p1"]);
    assert_eq!(result.requests[0].membership_id, "m3");
}

#[test]
fn test_unbound_node_has_no_actors() {
    let wf = workflow();
    let result = wf
        .actors
        .resolve_actors(&purchase_order("PO"), &RouteNode::new("Archive"))
        .unwrap();
    assert!(result.is_empty());
}

#[test]
fn test_date_bounded_membership() {
    let wf = workflow();
    wf.graph
        .add_member(
            RoleMembership::principal("m5", "reviewers", "p5")
                .with_qualifier(dept("CHEM"))
                .with_active_range(Some(date(2030, 1, 1)), None),
        )
        .unwrap();

    let doc = purchase_order("PO");
    let node = RouteNode::new("Review");

    let before = wf.actors.resolve_actors_as_of(&doc, &node, date(2029, 12, 31)).unwrap();
    let after = wf.actors.resolve_actors_as_of(&doc, &node, date(2030, 1, 1)).unwrap();
    assert_eq!(before.principals(), vec!["p1"]);
    assert_eq!(after.principals(), vec!["p1", "p5"]);
}

// ============================================================================
// DOCUMENT TYPE HIERARCHY
// ============================================================================

#[test]
fn test_child_type_inherits_parent_bindings() {
    let wf = workflow();
    let result = wf
        .actors
        .resolve_actors(&purchase_order("PO.Capital"), &RouteNode::new("Review"))
        .unwrap();

    assert_eq!(result.principals(), vec!["p1"]);
    assert_eq!(result.requests[0].qualifier.get("documentTypeName"), Some("PO.Capital"));
}

#[test]
fn test_child_bindings_replace_parent_bindings() {
    let wf = workflow();
    let result = wf
        .actors
        .resolve_actors(&purchase_order("PO.Lab"), &RouteNode::new("Approve"))
        .unwrap();

    assert!(result.requests.iter().all(|r| r.responsibility_id == "rsp-approve"));
    assert_eq!(result.for_principal("p1").unwrap().action, ActionType::Acknowledge);
}

#[test]
fn test_unknown_document_type() {
    let wf = workflow();
    let result = wf
        .actors
        .resolve_actors(&purchase_order("Invoice"), &RouteNode::new("Review"));

    assert!(matches!(result, Err(KimError::UnknownDocumentType(t)) if t == "Invoice"));
}

// ============================================================================
// DELEGATION
// ============================================================================

#[test]
fn test_primary_delegation_replaces_delegator() {
    let wf = workflow();
    wf.graph
        .add_delegation(
            Delegation::new("dlg1", "reviewers", DelegationType::Primary)
                .with_member(
                    DelegationMember::new(MemberKind::Principal, "d1").for_membership("m1"),
                ),
        )
        .unwrap();

    let result = wf
        .actors
        .resolve_actors(&purchase_order("PO"), &RouteNode::new("Review"))
        .unwrap();

    assert_eq!(result.principals(), vec!["d1"]);
    assert_eq!(result.requests[0].delegated_for.as_deref(), Some("p1"));
    assert_eq!(result.requests[0].membership_id, "m1");
}

#[test]
fn test_secondary_delegation_adds_delegates() {
    let wf = workflow();
    wf.graph.add_group_member("g-deputies", "d2");
    wf.graph.add_group_member("g-deputies", "d3");
    wf.graph
        .add_delegation(
            Delegation::new("dlg2", "reviewers", DelegationType::Secondary)
                .with_member(DelegationMember::new(MemberKind::Group, "g-deputies")),
        )
        .unwrap();

    let result = wf
        .actors
        .resolve_actors(&purchase_order("PO"), &RouteNode::new("Review"))
        .unwrap();

    assert_eq!(result.principals()[0], "p1");
    assert_eq!(sorted(result.principals()), vec!["d2", "d3", "p1"]);
    assert!(result
        .requests
        .iter()
        .filter(|r| r.principal_id != "p1")
        .all(|r| r.delegated_for.as_deref() == Some("p1")));
}

#[test]
fn test_delegation_scoped_by_qualifier_and_dates() {
    let wf = workflow();
    wf.graph
        .add_delegation(
            Delegation::new("dlg3", "reviewers", DelegationType::Primary)
                .with_member(
                    DelegationMember::new(MemberKind::Principal, "d4").with_qualifier(dept("PHYS")),
                )
                .with_member({
                    let mut expired = DelegationMember::new(MemberKind::Principal, "d5");
                    expired.active = ActiveRange::new(None, Some(date(2000, 1, 1)));
                    expired
                }),
        )
        .unwrap();

    let result = wf
        .actors
        .resolve_actors(&purchase_order("PO"), &RouteNode::new("Review"))
        .unwrap();

    assert_eq!(result.principals(), vec!["p1"]);
}

#[test]
fn test_role_delegates_are_ignored() {
    let wf = workflow();
    wf.graph
        .add_delegation(
            Delegation::new("dlg4", "reviewers", DelegationType::Primary)
                .with_member(DelegationMember::new(MemberKind::Role, "approvers")),
        )
        .unwrap();

    let result = wf
        .actors
        .resolve_actors(&purchase_order("PO"), &RouteNode::new("Review"))
        .unwrap();
    assert_eq!(result.principals(), vec!["p1"]);
}

// ============================================================================
// CONCURRENCY
// ============================================================================

#[tokio::test]
async fn test_concurrent_node_resolution() {
    let wf = workflow();
    let actors = Arc::new(wf.actors);
    let mut join_set = JoinSet::new();

    for i in 0..40 {
        let actors = actors.clone();
        join_set.spawn(async move {
            let (document_type, node) = if i % 2 == 0 {
                ("PO", "Approve")
            } else {
                ("PO.Capital", "Review")
            };
            let result = actors
                .resolve_actors(&purchase_order(document_type), &RouteNode::new(node))
                .unwrap();
            (node, result.len())
        });
    }

    while let Some(result) = join_set.join_next().await {
        let (node, count) = result.unwrap();
        let expected = if node == "Approve" { 3 } else { 1 };
        assert_eq!(count, expected);
    }
}
