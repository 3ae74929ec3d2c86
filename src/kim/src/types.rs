//! Core role graph types

use crate::qualifier::QualifierSet;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique principal (user) identifier
pub type PrincipalId = String;

/// Unique group identifier
pub type GroupId = String;

/// Unique role identifier
pub type RoleId = String;

/// Unique role membership identifier
pub type MembershipId = String;

/// Unique responsibility identifier
pub type ResponsibilityId = String;

/// Role definition
///
/// `role_type` is the key of the role type validator that owns qualifier
/// validation and matching for this role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Role identifier (e.g., "r1")
    pub id: RoleId,

    /// Namespace the role is defined in (e.g., "KR-WKFLW")
    pub namespace: String,

    /// Role name, unique within the namespace
    pub name: String,

    /// Role type (validator registry key)
    #[serde(rename = "type")]
    pub role_type: String,

    /// Inactive roles never match
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Role {
    /// Create an active role
    pub fn new(
        id: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
        role_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            namespace: namespace.into(),
            name: name.into(),
            role_type: role_type.into(),
            active: true,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

/// Kind of member held by a role membership entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MemberKind {
    #[serde(rename = "P")]
    Principal,
    #[serde(rename = "G")]
    Group,
    #[serde(rename = "R")]
    Role,
}

impl MemberKind {
    pub fn code(&self) -> &'static str {
        match self {
            MemberKind::Principal => "P",
            MemberKind::Group => "G",
            MemberKind::Role => "R",
        }
    }
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MemberKind::Principal => "principal",
            MemberKind::Group => "group",
            MemberKind::Role => "role",
        };
        f.write_str(label)
    }
}

/// Optional active window, both bounds inclusive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActiveRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<NaiveDate>,
}

impl ActiveRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    /// Check whether `date` falls inside the window
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| from <= date) && self.to.map_or(true, |to| date <= to)
    }

    /// `to` precedes `from`; unset bounds never conflict
    pub fn is_inverted(&self) -> bool {
        matches!((self.from, self.to), (Some(from), Some(to)) if to < from)
    }
}

/// One assignment of a principal, group or role to a role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleMembership {
    /// Membership identifier
    pub id: MembershipId,

    /// Role the member is assigned to
    pub role_id: RoleId,

    /// Kind of member
    pub member_kind: MemberKind,

    /// Principal, group or role id depending on `member_kind`
    pub member_id: String,

    /// Context the assignment applies to
    #[serde(default)]
    pub qualifier: QualifierSet,

    /// Active window
    #[serde(default)]
    pub active: ActiveRange,
}

impl RoleMembership {
    pub fn new(
        id: impl Into<String>,
        role_id: impl Into<String>,
        member_kind: MemberKind,
        member_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            role_id: role_id.into(),
            member_kind,
            member_id: member_id.into(),
            qualifier: QualifierSet::new(),
            active: ActiveRange::default(),
        }
    }

    /// Principal assignment shortcut
    pub fn principal(
        id: impl Into<String>,
        role_id: impl Into<String>,
        principal_id: impl Into<String>,
    ) -> Self {
        Self::new(id, role_id, MemberKind::Principal, principal_id)
    }

    /// Group assignment shortcut
    pub fn group(
        id: impl Into<String>,
        role_id: impl Into<String>,
        group_id: impl Into<String>,
    ) -> Self {
        Self::new(id, role_id, MemberKind::Group, group_id)
    }

    /// Role containment shortcut: `role_id` contains `contained_role_id`
    pub fn role(
        id: impl Into<String>,
        role_id: impl Into<String>,
        contained_role_id: impl Into<String>,
    ) -> Self {
        Self::new(id, role_id, MemberKind::Role, contained_role_id)
    }

    pub fn with_qualifier(mut self, qualifier: QualifierSet) -> Self {
        self.qualifier = qualifier;
        self
    }

    pub fn with_active_range(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.active = ActiveRange::new(from, to);
        self
    }

    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.active.contains(date)
    }
}

/// Action a principal must take on a routed document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionType {
    #[serde(rename = "A")]
    Approve,
    #[serde(rename = "K")]
    Acknowledge,
    #[serde(rename = "C")]
    Complete,
    #[serde(rename = "F")]
    Fyi,
}

impl ActionType {
    pub fn code(&self) -> &'static str {
        match self {
            ActionType::Approve => "A",
            ActionType::Acknowledge => "K",
            ActionType::Complete => "C",
            ActionType::Fyi => "F",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "A" => Some(ActionType::Approve),
            "K" => Some(ActionType::Acknowledge),
            "C" => Some(ActionType::Complete),
            "F" => Some(ActionType::Fyi),
            _ => None,
        }
    }

    /// Precedence rank, higher wins: Complete > Approve > Acknowledge > Fyi
    pub fn rank(&self) -> u8 {
        match self {
            ActionType::Complete => 4,
            ActionType::Approve => 3,
            ActionType::Acknowledge => 2,
            ActionType::Fyi => 1,
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ActionType::Approve => "approve",
            ActionType::Acknowledge => "acknowledge",
            ActionType::Complete => "complete",
            ActionType::Fyi => "fyi",
        };
        f.write_str(label)
    }
}

/// Routing policy for a group of requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionPolicy {
    /// The first principal to act satisfies the request
    #[serde(rename = "F")]
    FirstApprove,
    /// Every principal must act
    #[serde(rename = "A")]
    AllApprove,
}

impl ActionPolicy {
    pub fn code(&self) -> &'static str {
        match self {
            ActionPolicy::FirstApprove => "F",
            ActionPolicy::AllApprove => "A",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "F" => Some(ActionPolicy::FirstApprove),
            "A" => Some(ActionPolicy::AllApprove),
            _ => None,
        }
    }
}

/// Delegation type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DelegationType {
    /// Delegates act instead of the delegator
    #[serde(rename = "P")]
    Primary,
    /// Delegates act in addition to the delegator
    #[serde(rename = "S")]
    Secondary,
}

impl DelegationType {
    pub fn code(&self) -> &'static str {
        match self {
            DelegationType::Primary => "P",
            DelegationType::Secondary => "S",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "P" => Some(DelegationType::Primary),
            "S" => Some(DelegationType::Secondary),
            _ => None,
        }
    }
}

/// A delegate of a role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationMember {
    pub member_kind: MemberKind,
    pub member_id: String,

    /// Delegation only applies where this qualifier matches
    #[serde(default)]
    pub qualifier: QualifierSet,

    /// Restricts the delegation to a single role membership
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_member_id: Option<MembershipId>,

    #[serde(default)]
    pub active: ActiveRange,
}

impl DelegationMember {
    pub fn new(member_kind: MemberKind, member_id: impl Into<String>) -> Self {
        Self {
            member_kind,
            member_id: member_id.into(),
            qualifier: QualifierSet::new(),
            role_member_id: None,
            active: ActiveRange::default(),
        }
    }

    pub fn for_membership(mut self, membership_id: impl Into<String>) -> Self {
        self.role_member_id = Some(membership_id.into());
        self
    }

    pub fn with_qualifier(mut self, qualifier: QualifierSet) -> Self {
        self.qualifier = qualifier;
        self
    }
}

/// Delegation of a role's requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    pub id: String,
    pub role_id: RoleId,
    pub delegation_type: DelegationType,
    #[serde(default)]
    pub members: Vec<DelegationMember>,
}

impl Delegation {
    pub fn new(
        id: impl Into<String>,
        role_id: impl Into<String>,
        delegation_type: DelegationType,
    ) -> Self {
        Self {
            id: id.into(),
            role_id: role_id.into(),
            delegation_type,
            members: Vec::new(),
        }
    }

    pub fn with_member(mut self, member: DelegationMember) -> Self {
        self.members.push(member);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_membership_creation() {
        let membership = RoleMembership::principal("m1", "r1", "p1")
            .with_qualifier(QualifierSet::new().with("dept", "CHEM"));

        assert_eq!(membership.member_kind, MemberKind::Principal);
        assert_eq!(membership.qualifier.get("dept"), Some("CHEM"));
        assert!(membership.is_active_on(date(2020, 1, 1)));
    }

    #[test]
    fn test_active_range_bounds_inclusive() {
        let range = ActiveRange::new(Some(date(2020, 1, 1)), Some(date(2020, 1, 10)));

        assert!(range.contains(date(2020, 1, 1)));
        assert!(range.contains(date(2020, 1, 10)));
        assert!(!range.contains(date(2019, 12, 31)));
        assert!(!range.contains(date(2020, 1, 11)));
    }

    #[test]
    fn test_active_range_inverted() {
        assert!(ActiveRange::new(Some(date(2020, 1, 10)), Some(date(2020, 1, 1))).is_inverted());
        assert!(!ActiveRange::new(Some(date(2020, 1, 1)), Some(date(2020, 1, 10))).is_inverted());
        assert!(!ActiveRange::new(None, Some(date(2020, 1, 1))).is_inverted());
    }

    #[test]
    fn test_action_codes() {
        for action in [
            ActionType::Approve,
            ActionType::Acknowledge,
            ActionType::Complete,
            ActionType::Fyi,
        ] {
            assert_eq!(ActionType::from_code(action.code()), Some(action));
        }
        assert_eq!(ActionType::from_code("X"), None);
        assert!(ActionType::Complete.rank() > ActionType::Approve.rank());
        assert!(ActionType::Acknowledge.rank() > ActionType::Fyi.rank());
    }

    #[test]
    fn test_role_serde_rename() {
        let role = Role::new("r1", "KR-WKFLW", "Approver", "default");
        let json = serde_json::to_value(&role).unwrap();
        assert_eq!(json["type"], "default");

        let parsed: Role = serde_json::from_str(
            r#"{"id":"r2","namespace":"KR","name":"Reviewer","type":"dept"}"#,
        )
        .unwrap();
        assert!(parsed.active);
    }
}
