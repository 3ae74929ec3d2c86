//! In-memory role graph backed by DashMap indexes

use super::RoleGraph;
use crate::error::{KimError, Result};
use crate::types::{
    Delegation, GroupId, MemberKind, MembershipId, PrincipalId, Role, RoleId, RoleMembership,
};
use dashmap::DashMap;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Thread-safe in-memory [`RoleGraph`]
///
/// Containment cycles are accepted (they are a configuration error the
/// resolver tolerates) but logged, and can be listed with
/// [`containment_cycles`](Self::containment_cycles).
///
/// # Example
///
/// ```rust
/// use routeflow_kim::graph::{InMemoryRoleGraph, RoleGraph};
/// use routeflow_kim::types::{Role, RoleMembership};
///
/// let graph = InMemoryRoleGraph::new();
/// graph.add_role(Role::new("r1", "KR", "Reviewer", "default")).unwrap();
/// graph.add_member(RoleMembership::principal("m1", "r1", "p1")).unwrap();
///
/// assert!(graph.is_member_direct("p1", "r1"));
/// ```
#[derive(Default)]
pub struct InMemoryRoleGraph {
    roles: DashMap<RoleId, Role>,

    /// role -> membership entries
    members: DashMap<RoleId, Vec<RoleMembership>>,

    /// contained role -> containing roles
    containers: DashMap<RoleId, BTreeSet<RoleId>>,

    group_members: DashMap<GroupId, BTreeSet<PrincipalId>>,
    principal_groups: DashMap<PrincipalId, BTreeSet<GroupId>>,

    delegations: DashMap<RoleId, Vec<Delegation>>,

    generation: AtomicU64,
}

impl InMemoryRoleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Register a role
    ///
    /// Re-registering an existing id replaces its name and namespace but the
    /// type is immutable.
    ///
    /// # Errors
    ///
    /// Returns `KimError::RoleTypeImmutable` if the role exists with another type.
    pub fn add_role(&self, role: Role) -> Result<()> {
        if let Some(existing) = self.roles.get(&role.id) {
            if existing.role_type != role.role_type {
                return Err(KimError::RoleTypeImmutable {
                    role: role.id.clone(),
                    existing: existing.role_type.clone(),
                    requested: role.role_type.clone(),
                });
            }
        }

        debug!(role_id = %role.id, role_type = %role.role_type, "Adding role");
        self.roles.insert(role.id.clone(), role);
        self.bump();
        Ok(())
    }

    /// Add a membership entry
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The role (or, for role members, the member role) does not exist
    /// - The member id is empty
    /// - The membership id is already used in this role
    /// - A role would contain itself
    pub fn add_member(&self, membership: RoleMembership) -> Result<()> {
        if !self.roles.contains_key(&membership.role_id) {
            return Err(KimError::RoleNotFound(membership.role_id.clone()));
        }

        if membership.member_id.trim().is_empty() {
            return Err(KimError::InvalidMembership(format!(
                "Membership '{}' of role '{}' has an empty member id",
                membership.id, membership.role_id
            )));
        }

        if membership.member_kind == MemberKind::Role {
            if membership.member_id == membership.role_id {
                return Err(KimError::InvalidMembership(format!(
                    "Role '{}' cannot contain itself",
                    membership.role_id
                )));
            }
            if !self.roles.contains_key(&membership.member_id) {
                return Err(KimError::RoleNotFound(membership.member_id.clone()));
            }
        }

        {
            let mut entries = self.members.entry(membership.role_id.clone()).or_default();
            if entries.iter().any(|m| m.id == membership.id) {
                return Err(KimError::InvalidMembership(format!(
                    "Duplicate membership id '{}' in role '{}'",
                    membership.id, membership.role_id
                )));
            }
            entries.push(membership.clone());
        }

        if membership.member_kind == MemberKind::Role {
            self.containers
                .entry(membership.member_id.clone())
                .or_default()
                .insert(membership.role_id.clone());

            if self.contains_transitively(&membership.member_id, &membership.role_id) {
                warn!(
                    containing = %membership.role_id,
                    contained = %membership.member_id,
                    "Role containment cycle introduced"
                );
            }
        }

        debug!(
            role_id = %membership.role_id,
            member_kind = %membership.member_kind,
            member_id = %membership.member_id,
            "Added role member"
        );
        self.bump();
        Ok(())
    }

    /// Declare that `containing` contains `contained`; returns the membership id
    pub fn add_containment(&self, containing: &str, contained: &str) -> Result<MembershipId> {
        let id = format!("{}>{}", containing, contained);
        self.add_member(RoleMembership::role(id.clone(), containing, contained))?;
        Ok(id)
    }

    pub fn add_group_member(&self, group_id: &str, principal_id: &str) {
        self.group_members
            .entry(group_id.to_string())
            .or_default()
            .insert(principal_id.to_string());
        self.principal_groups
            .entry(principal_id.to_string())
            .or_default()
            .insert(group_id.to_string());
        self.bump();
    }

    pub fn remove_group_member(&self, group_id: &str, principal_id: &str) -> bool {
        let removed = self
            .group_members
            .get_mut(group_id)
            .map(|mut principals| principals.remove(principal_id))
            .unwrap_or(false);

        if removed {
            if let Some(mut groups) = self.principal_groups.get_mut(principal_id) {
                groups.remove(group_id);
            }
            self.bump();
        }
        removed
    }

    /// Add a delegation for an existing role, replacing one with the same id
    pub fn add_delegation(&self, delegation: Delegation) -> Result<()> {
        if !self.roles.contains_key(&delegation.role_id) {
            return Err(KimError::RoleNotFound(delegation.role_id.clone()));
        }
        {
            let mut delegations = self.delegations.entry(delegation.role_id.clone()).or_default();
            delegations.retain(|d| d.id != delegation.id);
            delegations.push(delegation);
        }
        self.bump();
        Ok(())
    }

    /// Remove a membership entry by id from whichever role holds it
    pub fn remove_member(&self, membership_id: &str) -> bool {
        let mut removed: Vec<RoleMembership> = Vec::new();

        for mut entry in self.members.iter_mut() {
            if let Some(position) = entry.value().iter().position(|m| m.id == membership_id) {
                removed.push(entry.value_mut().remove(position));
            }
        }

        for membership in &removed {
            if membership.member_kind == MemberKind::Role {
                let still_contained = self
                    .members
                    .get(&membership.role_id)
                    .map(|entries| {
                        entries.iter().any(|m| {
                            m.member_kind == MemberKind::Role && m.member_id == membership.member_id
                        })
                    })
                    .unwrap_or(false);

                if !still_contained {
                    if let Some(mut containing) = self.containers.get_mut(&membership.member_id) {
                        containing.remove(&membership.role_id);
                    }
                }
            }
        }

        if removed.is_empty() {
            false
        } else {
            self.bump();
            true
        }
    }

    /// Add every membership, stopping at the first error
    pub fn add_members(&self, memberships: impl IntoIterator<Item = RoleMembership>) -> Result<()> {
        for membership in memberships {
            self.add_member(membership)?;
        }
        Ok(())
    }

    pub fn role_count(&self) -> usize {
        self.roles.len()
    }

    pub fn membership_count(&self) -> usize {
        self.members.iter().map(|entry| entry.value().len()).sum()
    }

    /// Role ids directly contained by `role_id`
    fn contained_roles(&self, role_id: &str) -> Vec<RoleId> {
        self.members
            .get(role_id)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|m| m.member_kind == MemberKind::Role)
                    .map(|m| m.member_id.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Does `from` contain `target`, directly or transitively?
    fn contains_transitively(&self, from: &str, target: &str) -> bool {
        let mut stack = vec![from.to_string()];
        let mut seen = HashSet::new();

        while let Some(current) = stack.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            for contained in self.contained_roles(&current) {
                if contained == target {
                    return true;
                }
                stack.push(contained);
            }
        }

        false
    }

    /// Every containment cycle, each as a path that ends where it starts
    ///
    /// Depth-first search with three states per role: unvisited, on the
    /// current path, finished. Reaching a role that is on the current path
    /// closes a cycle.
    pub fn containment_cycles(&self) -> Vec<Vec<RoleId>> {
        let mut role_ids: Vec<RoleId> = self.roles.iter().map(|e| e.key().clone()).collect();
        role_ids.sort();

        let mut state: HashMap<RoleId, VisitState> = HashMap::new();
        let mut cycles = Vec::new();

        for role_id in &role_ids {
            if !state.contains_key(role_id) {
                let mut path = Vec::new();
                self.collect_cycles(role_id, &mut state, &mut path, &mut cycles);
            }
        }

        cycles
    }

    fn collect_cycles(
        &self,
        role_id: &str,
        state: &mut HashMap<RoleId, VisitState>,
        path: &mut Vec<RoleId>,
        cycles: &mut Vec<Vec<RoleId>>,
    ) {
        match state.get(role_id) {
            Some(VisitState::Visiting) => {
                if let Some(start) = path.iter().position(|r| r == role_id) {
                    let mut cycle: Vec<RoleId> = path[start..].to_vec();
                    cycle.push(role_id.to_string());
                    cycles.push(cycle);
                }
                return;
            }
            Some(VisitState::Visited) => return,
            None => {}
        }

        state.insert(role_id.to_string(), VisitState::Visiting);
        path.push(role_id.to_string());

        let mut contained = self.contained_roles(role_id);
        contained.sort();
        for child in contained {
            self.collect_cycles(&child, state, path, cycles);
        }

        path.pop();
        state.insert(role_id.to_string(), VisitState::Visited);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Visiting,
    Visited,
}

impl RoleGraph for InMemoryRoleGraph {
    fn role(&self, role_id: &str) -> Option<Role> {
        self.roles.get(role_id).map(|role| role.value().clone())
    }

    fn members_of(&self, role_id: &str) -> Vec<RoleMembership> {
        self.members
            .get(role_id)
            .map(|entries| entries.value().clone())
            .unwrap_or_default()
    }

    fn containing_roles_of(&self, role_id: &str) -> Vec<RoleId> {
        self.containers
            .get(role_id)
            .map(|containing| containing.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn groups_of(&self, principal_id: &str) -> Vec<GroupId> {
        self.principal_groups
            .get(principal_id)
            .map(|groups| groups.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn principals_in_group(&self, group_id: &str) -> Vec<PrincipalId> {
        self.group_members
            .get(group_id)
            .map(|principals| principals.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn delegations_of(&self, role_id: &str) -> Vec<Delegation> {
        self.delegations
            .get(role_id)
            .map(|delegations| delegations.value().clone())
            .unwrap_or_default()
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}
