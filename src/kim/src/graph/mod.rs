//! Role graph: roles, memberships and containment
//!
//! The resolver only reads the graph through [`RoleGraph`]. Writes happen
//! when role documents are approved, outside of resolution.

pub mod memory;

pub use memory::InMemoryRoleGraph;

use crate::types::{Delegation, GroupId, MemberKind, PrincipalId, Role, RoleId, RoleMembership};

/// Read interface over role, membership and group data
pub trait RoleGraph: Send + Sync {
    /// Look up a role by id
    fn role(&self, role_id: &str) -> Option<Role>;

    /// Every membership entry of a role, in insertion order
    fn members_of(&self, role_id: &str) -> Vec<RoleMembership>;

    /// Roles holding `role_id` as a role member, sorted
    fn containing_roles_of(&self, role_id: &str) -> Vec<RoleId>;

    /// Groups the principal belongs to, sorted
    fn groups_of(&self, principal_id: &str) -> Vec<GroupId>;

    /// Principals in a group, sorted
    fn principals_in_group(&self, group_id: &str) -> Vec<PrincipalId>;

    /// Delegations declared for a role
    fn delegations_of(&self, _role_id: &str) -> Vec<Delegation> {
        Vec::new()
    }

    /// Mutation counter; changes whenever the graph changes
    fn generation(&self) -> u64 {
        0
    }

    /// Direct principal assignment, ignoring qualifiers and dates
    fn is_member_direct(&self, principal_id: &str, role_id: &str) -> bool {
        self.members_of(role_id)
            .iter()
            .any(|m| m.member_kind == MemberKind::Principal && m.member_id == principal_id)
    }
}
