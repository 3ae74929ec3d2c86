//! Add-entry events and the checks run before an entry joins a document
//!
//! Each event type has its own small capability trait. Implementations are
//! selected per event through the [`StrategyCatalog`](super::StrategyCatalog).

use super::{keys, ErrorMap};
use crate::document::{
    DelegationEntry, DelegationMemberEntry, PermissionEntry, RoleDocument, RoleMemberEntry,
    RoleResponsibilityEntry,
};
use crate::types::{ActiveRange, DelegationType, MemberKind};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const NEW_MEMBER_PATH: &str = "newMember";
pub const NEW_PERMISSION_PATH: &str = "newPermission";
pub const NEW_RESPONSIBILITY_PATH: &str = "newResponsibility";
pub const NEW_DELEGATION_PATH: &str = "newDelegation";
pub const NEW_DELEGATION_MEMBER_PATH: &str = "newDelegationMember";

/// Kind of add-entry event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    AddMember,
    AddPermission,
    AddResponsibility,
    AddDelegation,
    AddDelegationMember,
}

impl EventType {
    pub const ALL: [EventType; 5] = [
        EventType::AddMember,
        EventType::AddPermission,
        EventType::AddResponsibility,
        EventType::AddDelegation,
        EventType::AddDelegationMember,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::AddMember => "add_member",
            EventType::AddPermission => "add_permission",
            EventType::AddResponsibility => "add_responsibility",
            EventType::AddDelegation => "add_delegation",
            EventType::AddDelegationMember => "add_delegation_member",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request to add an entry to a role document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RuleEvent {
    AddMember(RoleMemberEntry),
    AddPermission(PermissionEntry),
    AddResponsibility(RoleResponsibilityEntry),
    AddDelegation(DelegationEntry),
    AddDelegationMember {
        delegation_type: DelegationType,
        member: DelegationMemberEntry,
    },
}

impl RuleEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            RuleEvent::AddMember(_) => EventType::AddMember,
            RuleEvent::AddPermission(_) => EventType::AddPermission,
            RuleEvent::AddResponsibility(_) => EventType::AddResponsibility,
            RuleEvent::AddDelegation(_) => EventType::AddDelegation,
            RuleEvent::AddDelegationMember { .. } => EventType::AddDelegationMember,
        }
    }
}

pub trait AddMemberRule: Send + Sync {
    fn process_add_member(
        &self,
        document: &RoleDocument,
        member: &RoleMemberEntry,
        errors: &mut ErrorMap,
    ) -> bool;
}

pub trait AddPermissionRule: Send + Sync {
    fn process_add_permission(
        &self,
        document: &RoleDocument,
        permission: &PermissionEntry,
        errors: &mut ErrorMap,
    ) -> bool;
}

pub trait AddResponsibilityRule: Send + Sync {
    fn process_add_responsibility(
        &self,
        document: &RoleDocument,
        responsibility: &RoleResponsibilityEntry,
        errors: &mut ErrorMap,
    ) -> bool;
}

pub trait AddDelegationRule: Send + Sync {
    fn process_add_delegation(
        &self,
        document: &RoleDocument,
        delegation: &DelegationEntry,
        errors: &mut ErrorMap,
    ) -> bool;
}

pub trait AddDelegationMemberRule: Send + Sync {
    fn process_add_delegation_member(
        &self,
        document: &RoleDocument,
        delegation_type: DelegationType,
        member: &DelegationMemberEntry,
        errors: &mut ErrorMap,
    ) -> bool;
}

fn require_id(errors: &mut ErrorMap, path: &str, label: &str, value: &str) -> bool {
    if value.trim().is_empty() {
        errors.put_error_with_args(path, keys::ERROR_EMPTY_ENTRY, [label]);
        false
    } else {
        true
    }
}

fn check_dates(errors: &mut ErrorMap, path: &str, range: ActiveRange) -> bool {
    if range.is_inverted() {
        errors.put_error(path, keys::ERROR_ACTIVE_TO_DATE_BEFORE_FROM_DATE);
        false
    } else {
        true
    }
}

/// Member id present, not a duplicate, not the role itself, dates in order
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMemberRule;

impl AddMemberRule for DefaultMemberRule {
    fn process_add_member(
        &self,
        document: &RoleDocument,
        member: &RoleMemberEntry,
        errors: &mut ErrorMap,
    ) -> bool {
        let id_path = format!("{}.memberId", NEW_MEMBER_PATH);
        if !require_id(errors, &id_path, "Member", &member.member_id) {
            return false;
        }

        let mut valid = true;
        let member_id = member.member_id.as_str();

        if member.member_kind == MemberKind::Role && member_id == document.role_id {
            errors.put_error_with_args(&id_path, keys::ERROR_ROLE_CONTAINS_ITSELF, [member_id]);
            valid = false;
        }

        if document.members.iter().any(|existing| existing.same_assignment(member)) {
            errors.put_error_with_args(
                &id_path,
                keys::ERROR_DUPLICATE_ENTRY,
                ["Member", member_id],
            );
            valid = false;
        }

        valid &= check_dates(
            errors,
            &format!("{}.activeToDate", NEW_MEMBER_PATH),
            member.active_range(),
        );

        valid
    }
}

/// Permission id present and not already granted
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPermissionRule;

impl AddPermissionRule for DefaultPermissionRule {
    fn process_add_permission(
        &self,
        document: &RoleDocument,
        permission: &PermissionEntry,
        errors: &mut ErrorMap,
    ) -> bool {
        let path = format!("{}.permissionId", NEW_PERMISSION_PATH);
        if !require_id(errors, &path, "Permission", &permission.permission_id) {
            return false;
        }

        if document
            .permissions
            .iter()
            .any(|p| p.permission_id == permission.permission_id)
        {
            errors.put_error_with_args(
                &path,
                keys::ERROR_DUPLICATE_ENTRY,
                ["Permission", permission.permission_id.as_str()],
            );
            return false;
        }

        true
    }
}

/// Responsibility id present and not already assigned
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultResponsibilityRule;

impl AddResponsibilityRule for DefaultResponsibilityRule {
    fn process_add_responsibility(
        &self,
        document: &RoleDocument,
        responsibility: &RoleResponsibilityEntry,
        errors: &mut ErrorMap,
    ) -> bool {
        let path = format!("{}.responsibilityId", NEW_RESPONSIBILITY_PATH);
        if !require_id(errors, &path, "Responsibility", &responsibility.responsibility_id) {
            return false;
        }

        if document
            .responsibilities
            .iter()
            .any(|r| r.responsibility_id == responsibility.responsibility_id)
        {
            errors.put_error_with_args(
                &path,
                keys::ERROR_DUPLICATE_ENTRY,
                ["Responsibility", responsibility.responsibility_id.as_str()],
            );
            return false;
        }

        true
    }
}

/// One delegation per delegation type
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultDelegationRule;

impl AddDelegationRule for DefaultDelegationRule {
    fn process_add_delegation(
        &self,
        document: &RoleDocument,
        delegation: &DelegationEntry,
        errors: &mut ErrorMap,
    ) -> bool {
        if document
            .delegations
            .iter()
            .any(|d| d.delegation_type == delegation.delegation_type)
        {
            errors.put_error_with_args(
                &format!("{}.delegationTypeCode", NEW_DELEGATION_PATH),
                keys::ERROR_DUPLICATE_ENTRY,
                ["Delegation Type", delegation.delegation_type.code()],
            );
            return false;
        }

        true
    }
}

/// Delegate id present, dates in order, and any targeted member exists on
/// the document
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultDelegationMemberRule;

impl AddDelegationMemberRule for DefaultDelegationMemberRule {
    fn process_add_delegation_member(
        &self,
        document: &RoleDocument,
        _delegation_type: DelegationType,
        member: &DelegationMemberEntry,
        errors: &mut ErrorMap,
    ) -> bool {
        if !require_id(
            errors,
            &format!("{}.memberId", NEW_DELEGATION_MEMBER_PATH),
            "Member",
            &member.member_id,
        ) {
            return false;
        }

        let mut valid = check_dates(
            errors,
            &format!("{}.activeToDate", NEW_DELEGATION_MEMBER_PATH),
            member.active_range(),
        );

        if let Some(role_member_id) = &member.role_member_id {
            if document.member_by_id(role_member_id).is_none() {
                errors.put_error_with_args(
                    &format!("{}.roleMemberId", NEW_DELEGATION_MEMBER_PATH),
                    keys::ERROR_INVALID_ENTRY,
                    ["Role Member", role_member_id.as_str()],
                );
                valid = false;
            }
        }

        valid
    }
}
