//! Role maintenance documents
//!
//! A `RoleDocument` carries proposed changes to one role: its members,
//! responsibilities, permissions and delegations. Documents are checked by
//! [`RoleDocumentRules`](crate::rules::RoleDocumentRules) and, once approved,
//! turned into graph entries by [`materialize`](RoleDocument::materialize).

pub mod materialize;
pub mod state;

pub use materialize::MaterializedRole;
pub use state::DocumentState;

use crate::qualifier::QualifierSet;
use crate::responsibility::ResponsibilityAction;
use crate::rules::lookup::AttributeLookup;
use crate::types::{ActiveRange, DelegationType, MemberKind, MembershipId, ResponsibilityId, RoleId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Qualifier value as stored on a document
///
/// Only the attribute definition id is mandatory; the name is looked up
/// when missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualifierEntry {
    pub attribute_definition_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_name: Option<String>,

    pub value: String,
}

impl QualifierEntry {
    pub fn new(attribute_definition_id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute_definition_id: attribute_definition_id.into(),
            attribute_name: None,
            value: value.into(),
        }
    }

    pub fn named(
        attribute_definition_id: impl Into<String>,
        attribute_name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            attribute_definition_id: attribute_definition_id.into(),
            attribute_name: Some(attribute_name.into()),
            value: value.into(),
        }
    }

    /// Attribute name, stored or looked up
    pub fn resolve_name(&self, attributes: &dyn AttributeLookup) -> Option<String> {
        self.attribute_name
            .clone()
            .or_else(|| attributes.attribute_name(&self.attribute_definition_id))
    }
}

/// Build a qualifier set, skipping entries whose name cannot be resolved
pub fn resolve_qualifiers(
    entries: &[QualifierEntry],
    attributes: &dyn AttributeLookup,
) -> QualifierSet {
    entries
        .iter()
        .filter_map(|entry| entry.resolve_name(attributes).map(|name| (name, entry.value.clone())))
        .collect()
}

/// Proposed role member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleMemberEntry {
    /// Existing membership id; generated on approval when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_member_id: Option<MembershipId>,

    pub member_kind: MemberKind,
    pub member_id: String,

    #[serde(default)]
    pub active_from: Option<NaiveDate>,

    #[serde(default)]
    pub active_to: Option<NaiveDate>,

    #[serde(default)]
    pub qualifiers: Vec<QualifierEntry>,

    /// Member-level responsibility actions
    #[serde(default)]
    pub responsibility_actions: Vec<ResponsibilityAction>,
}

impl RoleMemberEntry {
    pub fn new(member_kind: MemberKind, member_id: impl Into<String>) -> Self {
        Self {
            role_member_id: None,
            member_kind,
            member_id: member_id.into(),
            active_from: None,
            active_to: None,
            qualifiers: Vec::new(),
            responsibility_actions: Vec::new(),
        }
    }

    pub fn principal(principal_id: impl Into<String>) -> Self {
        Self::new(MemberKind::Principal, principal_id)
    }

    pub fn group(group_id: impl Into<String>) -> Self {
        Self::new(MemberKind::Group, group_id)
    }

    pub fn role(role_id: impl Into<String>) -> Self {
        Self::new(MemberKind::Role, role_id)
    }

    pub fn with_id(mut self, role_member_id: impl Into<String>) -> Self {
        self.role_member_id = Some(role_member_id.into());
        self
    }

    pub fn with_active_dates(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.active_from = from;
        self.active_to = to;
        self
    }

    pub fn with_qualifier(mut self, qualifier: QualifierEntry) -> Self {
        self.qualifiers.push(qualifier);
        self
    }

    pub fn with_action(mut self, action: ResponsibilityAction) -> Self {
        self.responsibility_actions.push(action);
        self
    }

    pub fn active_range(&self) -> ActiveRange {
        ActiveRange::new(self.active_from, self.active_to)
    }

    /// Same member with the same qualifier values
    pub fn same_assignment(&self, other: &RoleMemberEntry) -> bool {
        let values = |entry: &RoleMemberEntry| {
            let mut values: Vec<(String, String)> = entry
                .qualifiers
                .iter()
                .map(|q| (q.attribute_definition_id.clone(), q.value.clone()))
                .collect();
            values.sort();
            values
        };

        self.member_kind == other.member_kind
            && self.member_id == other.member_id
            && values(self) == values(other)
    }
}

/// Responsibility assigned to the role with its role-level actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleResponsibilityEntry {
    pub responsibility_id: ResponsibilityId,

    #[serde(default)]
    pub actions: Vec<ResponsibilityAction>,
}

impl RoleResponsibilityEntry {
    pub fn new(responsibility_id: impl Into<String>) -> Self {
        Self {
            responsibility_id: responsibility_id.into(),
            actions: Vec::new(),
        }
    }

    pub fn with_action(mut self, action: ResponsibilityAction) -> Self {
        self.actions.push(action);
        self
    }
}

/// Permission granted to the role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionEntry {
    pub permission_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl PermissionEntry {
    pub fn new(permission_id: impl Into<String>) -> Self {
        Self {
            permission_id: permission_id.into(),
            name: None,
        }
    }
}

/// Delegate on a delegation entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationMemberEntry {
    pub member_kind: MemberKind,
    pub member_id: String,

    /// Restricts the delegate to one member of the document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_member_id: Option<MembershipId>,

    #[serde(default)]
    pub active_from: Option<NaiveDate>,

    #[serde(default)]
    pub active_to: Option<NaiveDate>,

    #[serde(default)]
    pub qualifiers: Vec<QualifierEntry>,
}

impl DelegationMemberEntry {
    pub fn new(member_kind: MemberKind, member_id: impl Into<String>) -> Self {
        Self {
            member_kind,
            member_id: member_id.into(),
            role_member_id: None,
            active_from: None,
            active_to: None,
            qualifiers: Vec::new(),
        }
    }

    pub fn principal(principal_id: impl Into<String>) -> Self {
        Self::new(MemberKind::Principal, principal_id)
    }

    pub fn for_member(mut self, role_member_id: impl Into<String>) -> Self {
        self.role_member_id = Some(role_member_id.into());
        self
    }

    pub fn with_active_dates(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.active_from = from;
        self.active_to = to;
        self
    }

    pub fn with_qualifier(mut self, qualifier: QualifierEntry) -> Self {
        self.qualifiers.push(qualifier);
        self
    }

    pub fn active_range(&self) -> ActiveRange {
        ActiveRange::new(self.active_from, self.active_to)
    }
}

/// Delegation of one type with its delegates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delegation_id: Option<String>,

    pub delegation_type: DelegationType,

    #[serde(default)]
    pub members: Vec<DelegationMemberEntry>,
}

impl DelegationEntry {
    pub fn new(delegation_type: DelegationType) -> Self {
        Self {
            delegation_id: None,
            delegation_type,
            members: Vec::new(),
        }
    }

    pub fn with_member(mut self, member: DelegationMemberEntry) -> Self {
        self.members.push(member);
        self
    }
}

/// Document proposing changes to one role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDocument {
    pub document_id: String,

    #[serde(default)]
    pub state: DocumentState,

    pub role_id: RoleId,
    pub role_namespace: String,
    pub role_name: String,

    /// Role type (validator key)
    pub role_type: String,

    #[serde(default = "default_active")]
    pub active: bool,

    #[serde(default)]
    pub members: Vec<RoleMemberEntry>,

    #[serde(default)]
    pub responsibilities: Vec<RoleResponsibilityEntry>,

    #[serde(default)]
    pub permissions: Vec<PermissionEntry>,

    #[serde(default)]
    pub delegations: Vec<DelegationEntry>,
}

fn default_active() -> bool {
    true
}

impl RoleDocument {
    /// Empty draft for a role
    pub fn new(
        document_id: impl Into<String>,
        role_id: impl Into<String>,
        role_namespace: impl Into<String>,
        role_name: impl Into<String>,
        role_type: impl Into<String>,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            state: DocumentState::Draft,
            role_id: role_id.into(),
            role_namespace: role_namespace.into(),
            role_name: role_name.into(),
            role_type: role_type.into(),
            active: true,
            members: Vec::new(),
            responsibilities: Vec::new(),
            permissions: Vec::new(),
            delegations: Vec::new(),
        }
    }

    pub fn with_member(mut self, member: RoleMemberEntry) -> Self {
        self.members.push(member);
        self
    }

    pub fn with_responsibility(mut self, responsibility: RoleResponsibilityEntry) -> Self {
        self.responsibilities.push(responsibility);
        self
    }

    pub fn with_permission(mut self, permission: PermissionEntry) -> Self {
        self.permissions.push(permission);
        self
    }

    pub fn with_delegation(mut self, delegation: DelegationEntry) -> Self {
        self.delegations.push(delegation);
        self
    }

    pub fn member_by_id(&self, role_member_id: &str) -> Option<&RoleMemberEntry> {
        self.members
            .iter()
            .find(|m| m.role_member_id.as_deref() == Some(role_member_id))
    }
}
