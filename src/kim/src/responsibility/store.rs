//! Responsibility lookup collaborator and its in-memory implementation

use super::{Responsibility, ResponsibilityAction};
use crate::types::{MembershipId, ResponsibilityId, RoleId};
use dashmap::DashMap;
use tracing::debug;

/// Read access to responsibilities and their configured actions
pub trait ResponsibilityLookup: Send + Sync {
    fn responsibility(&self, responsibility_id: &str) -> Option<Responsibility>;

    /// Does the responsibility take its actions from each role member?
    ///
    /// Unknown responsibilities resolve at role level.
    fn actions_at_assignment_level(&self, responsibility_id: &str) -> bool {
        self.responsibility(responsibility_id)
            .map_or(false, |r| r.actions_at_assignment_level)
    }

    /// Role-level actions of a responsibility on a role
    fn role_actions(&self, role_id: &str, responsibility_id: &str) -> Vec<ResponsibilityAction>;

    /// Actions configured on one role membership
    fn member_actions(
        &self,
        membership_id: &str,
        responsibility_id: &str,
    ) -> Vec<ResponsibilityAction>;
}

/// In-memory [`ResponsibilityLookup`]
#[derive(Default)]
pub struct InMemoryResponsibilities {
    responsibilities: DashMap<ResponsibilityId, Responsibility>,
    role_actions: DashMap<RoleId, Vec<ResponsibilityAction>>,
    member_actions: DashMap<MembershipId, Vec<ResponsibilityAction>>,
}

impl InMemoryResponsibilities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_responsibility(&self, responsibility: Responsibility) {
        debug!(responsibility_id = %responsibility.id, "Adding responsibility");
        self.responsibilities.insert(responsibility.id.clone(), responsibility);
    }

    pub fn with_responsibility(self, responsibility: Responsibility) -> Self {
        self.add_responsibility(responsibility);
        self
    }

    /// Add an action to a role; actions carrying a `role_member_id` are
    /// stored against that membership instead
    pub fn add_action(&self, role_id: &str, action: ResponsibilityAction) {
        match action.role_member_id.clone() {
            Some(membership_id) => {
                self.member_actions.entry(membership_id).or_default().push(action)
            }
            None => self.role_actions.entry(role_id.to_string()).or_default().push(action),
        }
    }

    /// Replace every action of a role and of the given memberships
    pub fn replace_role_actions(
        &self,
        role_id: &str,
        membership_ids: &[MembershipId],
        actions: Vec<ResponsibilityAction>,
    ) {
        self.role_actions.remove(role_id);
        for membership_id in membership_ids {
            self.member_actions.remove(membership_id);
        }
        for action in actions {
            self.add_action(role_id, action);
        }
    }
}

impl ResponsibilityLookup for InMemoryResponsibilities {
    fn responsibility(&self, responsibility_id: &str) -> Option<Responsibility> {
        self.responsibilities.get(responsibility_id).map(|r| r.value().clone())
    }

    fn role_actions(&self, role_id: &str, responsibility_id: &str) -> Vec<ResponsibilityAction> {
        self.role_actions
            .get(role_id)
            .map(|actions| {
                actions
                    .iter()
                    .filter(|a| a.responsibility_id == responsibility_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn member_actions(
        &self,
        membership_id: &str,
        responsibility_id: &str,
    ) -> Vec<ResponsibilityAction> {
        self.member_actions
            .get(membership_id)
            .map(|actions| {
                actions
                    .iter()
                    .filter(|a| a.responsibility_id == responsibility_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}
