//! Conversion of an approved document into graph entries

use super::{resolve_qualifiers, RoleDocument};
use crate::error::{KimError, Result};
use crate::graph::{InMemoryRoleGraph, RoleGraph};
use crate::responsibility::{InMemoryResponsibilities, ResponsibilityAction};
use crate::rules::lookup::AttributeLookup;
use crate::types::{Delegation, DelegationMember, MemberKind, MembershipId, Role, RoleMembership};
use std::collections::HashSet;
use tracing::info;
use uuid::Uuid;

/// Graph entries produced from an approved role document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedRole {
    pub role: Role,
    pub memberships: Vec<RoleMembership>,
    pub delegations: Vec<Delegation>,

    /// Role-level actions (no `role_member_id`) followed by member-level ones
    pub actions: Vec<ResponsibilityAction>,
}

impl MaterializedRole {
    /// Write the role into an in-memory graph and responsibility store,
    /// replacing memberships and actions with the same ids
    ///
    /// Nothing is written unless every entry can be applied.
    ///
    /// # Errors
    ///
    /// - `KimError::RoleTypeImmutable` if the role exists with another type
    /// - `KimError::RoleNotFound` if a role member names an unknown role
    /// - `KimError::InvalidMembership` for empty member ids, self-containment
    ///   or repeated membership ids
    pub fn apply(
        &self,
        graph: &InMemoryRoleGraph,
        responsibilities: &InMemoryResponsibilities,
    ) -> Result<()> {
        self.check(graph)?;

        graph.add_role(self.role.clone())?;

        for membership in &self.memberships {
            graph.remove_member(&membership.id);
            graph.add_member(membership.clone())?;
        }

        for delegation in &self.delegations {
            graph.add_delegation(delegation.clone())?;
        }

        let membership_ids: Vec<MembershipId> =
            self.memberships.iter().map(|m| m.id.clone()).collect();
        responsibilities.replace_role_actions(&self.role.id, &membership_ids, self.actions.clone());

        info!(
            role_id = %self.role.id,
            memberships = self.memberships.len(),
            delegations = self.delegations.len(),
            "Applied role document"
        );
        Ok(())
    }

    fn check(&self, graph: &InMemoryRoleGraph) -> Result<()> {
        if let Some(existing) = graph.role(&self.role.id) {
            if existing.role_type != self.role.role_type {
                return Err(KimError::RoleTypeImmutable {
                    role: self.role.id.clone(),
                    existing: existing.role_type,
                    requested: self.role.role_type.clone(),
                });
            }
        }

        let mut ids = HashSet::new();
        for membership in &self.memberships {
            if !ids.insert(membership.id.as_str()) {
                return Err(KimError::InvalidMembership(format!(
                    "Duplicate membership id '{}' in role '{}'",
                    membership.id, self.role.id
                )));
            }
            if membership.member_id.trim().is_empty() {
                return Err(KimError::InvalidMembership(format!(
                    "Membership '{}' of role '{}' has an empty member id",
                    membership.id, self.role.id
                )));
            }
            if membership.member_kind != MemberKind::Role {
                continue;
            }
            if membership.member_id == self.role.id {
                return Err(KimError::InvalidMembership(format!(
                    "Role '{}' cannot contain itself",
                    self.role.id
                )));
            }
            if graph.role(&membership.member_id).is_none() {
                return Err(KimError::RoleNotFound(membership.member_id.clone()));
            }
        }

        Ok(())
    }
}

fn generated_id() -> String {
    Uuid::new_v4().to_string()
}

impl RoleDocument {
    /// Give every member and delegation without an id a generated one
    pub fn assign_missing_ids(&mut self) {
        for member in &mut self.members {
            if member.role_member_id.is_none() {
                member.role_member_id = Some(generated_id());
            }
        }
        for delegation in &mut self.delegations {
            if delegation.delegation_id.is_none() {
                delegation.delegation_id = Some(generated_id());
            }
        }
    }

    /// Graph entries described by this document
    ///
    /// Entries without ids receive generated ones in the result only; call
    /// [`assign_missing_ids`](Self::assign_missing_ids) first to keep them
    /// on the document.
    pub fn materialize(&self, attributes: &dyn AttributeLookup) -> MaterializedRole {
        let mut role = Role::new(
            &self.role_id,
            &self.role_namespace,
            &self.role_name,
            &self.role_type,
        );
        role.active = self.active;

        let mut memberships = Vec::with_capacity(self.members.len());
        let mut actions: Vec<ResponsibilityAction> = self
            .responsibilities
            .iter()
            .flat_map(|r| r.actions.iter().cloned())
            .map(|mut action| {
                action.role_member_id = None;
                action
            })
            .collect();

        for member in &self.members {
            let id = member.role_member_id.clone().unwrap_or_else(generated_id);

            let membership = RoleMembership::new(
                id.clone(),
                &self.role_id,
                member.member_kind,
                &member.member_id,
            )
            .with_qualifier(resolve_qualifiers(&member.qualifiers, attributes))
            .with_active_range(member.active_from, member.active_to);
            memberships.push(membership);

            actions.extend(member.responsibility_actions.iter().cloned().map(|mut action| {
                action.role_member_id = Some(id.clone());
                action
            }));
        }

        let delegations = self
            .delegations
            .iter()
            .map(|entry| {
                let id = entry.delegation_id.clone().unwrap_or_else(generated_id);
                entry.members.iter().fold(
                    Delegation::new(id, &self.role_id, entry.delegation_type),
                    |delegation, member| {
                        let mut delegate =
                            DelegationMember::new(member.member_kind, &member.member_id)
                                .with_qualifier(resolve_qualifiers(&member.qualifiers, attributes));
                        delegate.role_member_id = member.role_member_id.clone();
                        delegate.active = member.active_range();
                        delegation.with_member(delegate)
                    },
                )
            })
            .collect();

        MaterializedRole {
            role,
            memberships,
            delegations,
            actions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{
        DelegationEntry, DelegationMemberEntry, QualifierEntry, RoleMemberEntry,
        RoleResponsibilityEntry,
    };
    use crate::graph::RoleGraph;
    use crate::responsibility::ResponsibilityLookup;
    use crate::rules::lookup::InMemoryAttributes;
    use crate::types::{ActionPolicy, ActionType, DelegationType, MemberKind};

    fn document() -> RoleDocument {
        RoleDocument::new("d1", "r1", "KR", "Reviewer", "default")
            .with_member(
                RoleMemberEntry::principal("p1")
                    .with_id("m1")
                    .with_qualifier(QualifierEntry::new("a1", "CHEM"))
                    .with_action(ResponsibilityAction::new(
                        "rsp1",
                        ActionType::Fyi,
                        ActionPolicy::AllApprove,
                        2,
                    )),
            )
            .with_member(RoleMemberEntry::group("g1"))
            .with_responsibility(
                RoleResponsibilityEntry::new("rsp1").with_action(ResponsibilityAction::new(
                    "rsp1",
                    ActionType::Approve,
                    ActionPolicy::FirstApprove,
                    1,
                )),
            )
            .with_delegation(
                DelegationEntry::new(DelegationType::Secondary)
                    .with_member(DelegationMemberEntry::principal("p9").for_member("m1")),
            )
    }

    #[test]
    fn test_materialize() {
        let attributes = InMemoryAttributes::new().with_attribute("a1", "dept");
        let materialized = document().materialize(&attributes);

        assert_eq!(materialized.role.id, "r1");
        assert_eq!(materialized.memberships.len(), 2);
        assert_eq!(materialized.memberships[0].id, "m1");
        assert_eq!(materialized.memberships[0].qualifier.get("dept"), Some("CHEM"));
        assert_eq!(materialized.memberships[1].member_kind, MemberKind::Group);
        assert!(!materialized.memberships[1].id.is_empty());

        assert_eq!(materialized.actions.len(), 2);
        assert_eq!(materialized.actions[0].role_member_id, None);
        assert_eq!(materialized.actions[1].role_member_id.as_deref(), Some("m1"));

        assert_eq!(materialized.delegations[0].members[0].role_member_id.as_deref(), Some("m1"));
    }

    #[test]
    fn test_assign_missing_ids_is_stable() {
        let mut doc = document();
        doc.assign_missing_ids();
        let ids: Vec<_> = doc.members.iter().map(|m| m.role_member_id.clone()).collect();

        doc.assign_missing_ids();
        let again: Vec<_> = doc.members.iter().map(|m| m.role_member_id.clone()).collect();

        assert_eq!(ids, again);
        assert!(doc.delegations[0].delegation_id.is_some());
    }

    #[test]
    fn test_apply_to_graph() {
        let graph = InMemoryRoleGraph::new();
        let responsibilities = InMemoryResponsibilities::new();
        let attributes = InMemoryAttributes::new().with_attribute("a1", "dept");

        let materialized = document().materialize(&attributes);
        materialized.apply(&graph, &responsibilities).unwrap();
        // Applying twice replaces instead of duplicating
        materialized.apply(&graph, &responsibilities).unwrap();

        assert!(graph.is_member_direct("p1", "r1"));
        assert_eq!(graph.members_of("r1").len(), 2);
        assert_eq!(responsibilities.role_actions("r1", "rsp1").len(), 1);
        assert_eq!(responsibilities.member_actions("m1", "rsp1").len(), 1);
    }

    #[test]
    fn test_apply_writes_nothing_when_a_role_member_is_unknown() {
        let graph = InMemoryRoleGraph::new();
        let responsibilities = InMemoryResponsibilities::new();
        let attributes = InMemoryAttributes::new().with_attribute("a1", "dept");

        document().materialize(&attributes).apply(&graph, &responsibilities).unwrap();
        let generation = graph.generation();

        let broken = document()
            .with_member(RoleMemberEntry::role("ghost"))
            .materialize(&attributes);
        assert!(matches!(
            broken.apply(&graph, &responsibilities),
            Err(KimError::RoleNotFound(id)) if id == "ghost"
        ));

        assert_eq!(graph.generation(), generation);
        assert_eq!(graph.members_of("r1").len(), 2);
        assert!(graph.is_member_direct("p1", "r1"));
    }

    #[test]
    fn test_apply_rejects_self_containment() {
        let graph = InMemoryRoleGraph::new();
        let responsibilities = InMemoryResponsibilities::new();
        let materialized = RoleDocument::new("d1", "r1", "KR", "Reviewer", "default")
            .with_member(RoleMemberEntry::role("r1"))
            .materialize(&InMemoryAttributes::new());

        assert!(matches!(
            materialized.apply(&graph, &responsibilities),
            Err(KimError::InvalidMembership(_))
        ));
        assert!(graph.role("r1").is_none());
    }
}
