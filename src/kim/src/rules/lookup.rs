//! Collaborators consulted while checking role documents

use super::{keys, ErrorMap};
use crate::document::RoleDocument;
use dashmap::DashMap;

pub use crate::responsibility::ResponsibilityLookup;

/// Resolves attribute definition ids to attribute names
pub trait AttributeLookup: Send + Sync {
    fn attribute_name(&self, attribute_definition_id: &str) -> Option<String>;
}

/// In-memory [`AttributeLookup`]
#[derive(Default)]
pub struct InMemoryAttributes {
    names: DashMap<String, String>,
}

impl InMemoryAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_attribute(
        &self,
        attribute_definition_id: impl Into<String>,
        name: impl Into<String>,
    ) {
        self.names.insert(attribute_definition_id.into(), name.into());
    }

    pub fn with_attribute(
        self,
        attribute_definition_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        self.add_attribute(attribute_definition_id, name);
        self
    }
}

impl AttributeLookup for InMemoryAttributes {
    fn attribute_name(&self, attribute_definition_id: &str) -> Option<String> {
        self.names.get(attribute_definition_id).map(|name| name.value().clone())
    }
}

/// Field-level checks of a document, run before the role rules
pub trait DictionaryValidator: Send + Sync {
    /// Record problems into `errors`; `true` when none were found
    fn validate_document(&self, document: &RoleDocument, errors: &mut ErrorMap) -> bool;
}

/// Required fields and name lengths
#[derive(Debug, Clone)]
pub struct StructuralValidator {
    max_name_length: usize,
}

impl StructuralValidator {
    pub fn new(max_name_length: usize) -> Self {
        Self { max_name_length }
    }

    fn required(errors: &mut ErrorMap, path: &str, label: &str, value: &str) -> bool {
        if value.trim().is_empty() {
            errors.put_error_with_args(path, keys::ERROR_REQUIRED, [label]);
            false
        } else {
            true
        }
    }

    fn bounded(&self, errors: &mut ErrorMap, path: &str, label: &str, value: &str) -> bool {
        if value.chars().count() > self.max_name_length {
            errors.put_error_with_args(
                path,
                keys::ERROR_MAX_LENGTH,
                [label.to_string(), self.max_name_length.to_string()],
            );
            false
        } else {
            true
        }
    }
}

impl Default for StructuralValidator {
    fn default() -> Self {
        Self::new(100)
    }
}

impl DictionaryValidator for StructuralValidator {
    fn validate_document(&self, document: &RoleDocument, errors: &mut ErrorMap) -> bool {
        let mut valid = true;

        valid &= Self::required(errors, "roleNamespace", "Namespace", &document.role_namespace)
            && self.bounded(errors, "roleNamespace", "Namespace", &document.role_namespace);
        valid &= Self::required(errors, "roleName", "Role Name", &document.role_name)
            && self.bounded(errors, "roleName", "Role Name", &document.role_name);
        valid &= Self::required(errors, "roleType", "Role Type", &document.role_type);

        for (i, member) in document.members.iter().enumerate() {
            valid &= Self::required(
                errors,
                &format!("members[{}].memberId", i),
                "Member Identifier",
                &member.member_id,
            );
        }

        for (i, responsibility) in document.responsibilities.iter().enumerate() {
            valid &= Self::required(
                errors,
                &format!("responsibilities[{}].responsibilityId", i),
                "Responsibility",
                &responsibility.responsibility_id,
            );
        }

        for (i, permission) in document.permissions.iter().enumerate() {
            valid &= Self::required(
                errors,
                &format!("permissions[{}].permissionId", i),
                "Permission",
                &permission.permission_id,
            );
        }

        valid
    }
}
