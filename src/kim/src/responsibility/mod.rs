//! Responsibilities and the actions they require
//!
//! A responsibility attached to a role turns role membership into work: each
//! holder receives the responsibility's actions. Actions come either from a
//! uniform role-level list, or per member when the responsibility resolves
//! actions at assignment level.

pub mod actions;
pub mod store;

pub use actions::{derive_actions, validate_action};
pub use store::{InMemoryResponsibilities, ResponsibilityLookup};

use crate::error::KimError;
use crate::types::{ActionPolicy, ActionType, MembershipId, ResponsibilityId};
use serde::{Deserialize, Serialize};

/// Responsibility definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Responsibility {
    pub id: ResponsibilityId,
    pub namespace: String,
    pub name: String,

    /// Actions are set per role member instead of once per role
    #[serde(default)]
    pub actions_at_assignment_level: bool,
}

impl Responsibility {
    pub fn new(
        id: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            namespace: namespace.into(),
            name: name.into(),
            actions_at_assignment_level: false,
        }
    }

    pub fn at_assignment_level(mut self) -> Self {
        self.actions_at_assignment_level = true;
        self
    }
}

/// Action configuration as authored
///
/// Every field is optional while editing; [`validate_action`] reports what
/// is missing and [`RequiredAction::try_from`] rejects incomplete entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponsibilityAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub responsibility_id: ResponsibilityId,

    /// Set for member-level actions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_member_id: Option<MembershipId>,

    #[serde(default)]
    pub action_type_code: Option<String>,

    #[serde(default)]
    pub action_policy_code: Option<String>,

    #[serde(default)]
    pub priority_number: Option<u32>,

    #[serde(default)]
    pub force_action: bool,
}

impl ResponsibilityAction {
    /// Fully populated action
    pub fn new(
        responsibility_id: impl Into<String>,
        action: ActionType,
        policy: ActionPolicy,
        priority: u32,
    ) -> Self {
        Self {
            id: None,
            responsibility_id: responsibility_id.into(),
            role_member_id: None,
            action_type_code: Some(action.code().to_string()),
            action_policy_code: Some(policy.code().to_string()),
            priority_number: Some(priority),
            force_action: false,
        }
    }

    /// Action with nothing but its responsibility set
    pub fn empty(responsibility_id: impl Into<String>) -> Self {
        Self {
            responsibility_id: responsibility_id.into(),
            ..Default::default()
        }
    }

    pub fn for_member(mut self, membership_id: impl Into<String>) -> Self {
        self.role_member_id = Some(membership_id.into());
        self
    }

    pub fn forced(mut self) -> Self {
        self.force_action = true;
        self
    }
}

/// A validated action to turn into requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequiredAction {
    pub action: ActionType,
    pub policy: ActionPolicy,
    pub priority: u32,
    pub force_action: bool,
}

impl TryFrom<&ResponsibilityAction> for RequiredAction {
    type Error = KimError;

    fn try_from(value: &ResponsibilityAction) -> Result<Self, Self::Error> {
        let type_code = value.action_type_code.as_deref().unwrap_or_default();
        let action = ActionType::from_code(type_code).ok_or_else(|| {
            KimError::InvalidAction(format!(
                "unknown action type code '{}' for responsibility '{}'",
                type_code, value.responsibility_id
            ))
        })?;

        let policy_code = value.action_policy_code.as_deref().unwrap_or_default();
        let policy = ActionPolicy::from_code(policy_code).ok_or_else(|| {
            KimError::InvalidAction(format!(
                "unknown action policy code '{}' for responsibility '{}'",
                policy_code, value.responsibility_id
            ))
        })?;

        let priority = value.priority_number.ok_or_else(|| {
            KimError::InvalidAction(format!(
                "missing priority number for responsibility '{}'",
                value.responsibility_id
            ))
        })?;

        Ok(Self {
            action,
            policy,
            priority,
            force_action: value.force_action,
        })
    }
}
