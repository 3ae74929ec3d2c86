//! Save-time checks and lifecycle of role documents

use super::events::RuleEvent;
use super::lookup::{
    AttributeLookup, DictionaryValidator, ResponsibilityLookup, StructuralValidator,
};
use super::registry::{RuleSet, StrategyCatalog};
use super::{keys, ErrorMap};
use crate::config::RuleConfig;
use crate::document::{DelegationEntry, DocumentState, MaterializedRole, RoleDocument};
use crate::error::{KimError, Result};
use crate::graph::RoleGraph;
use crate::qualifier::QualifierSet;
use crate::responsibility::validate_action;
use crate::role_type::ValidatorRegistry;
use crate::types::MemberKind;
use std::sync::Arc;
use tracing::{debug, info};

/// Checks and state changes for role documents
///
/// All collaborators are injected. Validation problems are recorded in the
/// caller's [`ErrorMap`]; only configuration faults are returned as errors.
pub struct RoleDocumentRules {
    validators: Arc<ValidatorRegistry>,
    attributes: Arc<dyn AttributeLookup>,
    responsibilities: Arc<dyn ResponsibilityLookup>,
    dictionary: Arc<dyn DictionaryValidator>,
    /// Existing roles; role members are only checked for existence when set
    roles: Option<Arc<dyn RoleGraph>>,
    rules: RuleSet,
    error_path_prefix: Option<String>,
}

impl RoleDocumentRules {
    pub fn new(
        validators: Arc<ValidatorRegistry>,
        attributes: Arc<dyn AttributeLookup>,
        responsibilities: Arc<dyn ResponsibilityLookup>,
        rules: RuleSet,
    ) -> Self {
        Self {
            validators,
            attributes,
            responsibilities,
            dictionary: Arc::new(StructuralValidator::default()),
            roles: None,
            rules,
            error_path_prefix: None,
        }
    }

    /// Build from configuration, constructing every configured strategy
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a strategy is missing or cannot be
    /// built.
    pub fn from_config(
        config: &RuleConfig,
        catalog: &StrategyCatalog,
        validators: Arc<ValidatorRegistry>,
        attributes: Arc<dyn AttributeLookup>,
        responsibilities: Arc<dyn ResponsibilityLookup>,
    ) -> Result<Self> {
        let rules = RuleSet::from_config(&config.strategies, catalog)?;

        Ok(Self {
            validators,
            attributes,
            responsibilities,
            dictionary: Arc::new(StructuralValidator::new(config.max_name_length)),
            roles: None,
            rules,
            error_path_prefix: config.error_path_prefix.clone(),
        })
    }

    pub fn with_dictionary_validator(mut self, dictionary: Arc<dyn DictionaryValidator>) -> Self {
        self.dictionary = dictionary;
        self
    }

    /// Check role members against the roles of `graph`
    pub fn with_role_graph(mut self, graph: Arc<dyn RoleGraph>) -> Self {
        self.roles = Some(graph);
        self
    }

    pub fn with_error_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.error_path_prefix = Some(prefix.into());
        self
    }

    pub fn rule_set(&self) -> &RuleSet {
        &self.rules
    }

    /// Empty error map using the configured path prefix
    pub fn new_error_map(&self) -> ErrorMap {
        match &self.error_path_prefix {
            Some(prefix) => ErrorMap::with_prefix(prefix.clone()),
            None => ErrorMap::new(),
        }
    }

    /// Run every save-time check on `document`
    ///
    /// Checks never stop at the first problem. Returns `Ok(true)` when this
    /// call recorded nothing.
    ///
    /// # Errors
    ///
    /// Returns `KimError::ValidatorNotRegistered` if the document's role type
    /// has no validator.
    pub fn process_save(&self, document: &RoleDocument, errors: &mut ErrorMap) -> Result<bool> {
        let before = errors.error_count();

        self.dictionary.validate_document(document, errors);
        self.validate_role_members(document, errors);
        self.validate_qualifiers(document, errors)?;
        Self::validate_active_dates(document, errors);
        self.validate_role_responsibility_actions(document, errors);
        Self::validate_member_actions(document, errors);

        let recorded = errors.error_count() - before;
        debug!(
            document_id = %document.document_id,
            role_id = %document.role_id,
            errors = recorded,
            "Checked role document"
        );

        Ok(recorded == 0)
    }

    /// A role member must name another, existing role
    fn validate_role_members(&self, document: &RoleDocument, errors: &mut ErrorMap) {
        for (i, member) in document.members.iter().enumerate() {
            if member.member_kind != MemberKind::Role || member.member_id.trim().is_empty() {
                continue;
            }

            let path = format!("members[{}].memberId", i);
            let role_id = member.member_id.as_str();
            if role_id == document.role_id {
                errors.put_error_with_args(&path, keys::ERROR_ROLE_CONTAINS_ITSELF, [role_id]);
            } else if let Some(roles) = &self.roles {
                if roles.role(role_id).is_none() {
                    errors.put_error_with_args(&path, keys::ERROR_INVALID_ENTRY, ["Role", role_id]);
                }
            }
        }
    }

    fn validate_qualifiers(&self, document: &RoleDocument, errors: &mut ErrorMap) -> Result<()> {
        if document.role_type.trim().is_empty() {
            return Ok(());
        }

        let validator = self.validators.require(&document.role_type)?;

        for (i, member) in document.members.iter().enumerate() {
            let mut qualifier = QualifierSet::new();

            for (j, entry) in member.qualifiers.iter().enumerate() {
                match entry.resolve_name(self.attributes.as_ref()) {
                    Some(name) => {
                        qualifier.insert(name, entry.value.clone());
                    }
                    None => errors.put_error_with_args(
                        &format!("members[{}].qualifiers[{}]", i, j),
                        keys::ERROR_UNKNOWN_ATTRIBUTE,
                        [entry.attribute_definition_id.as_str()],
                    ),
                }
            }

            let path = format!("members[{}].qualifiers", i);
            for error in validator.validate_attributes(&qualifier) {
                errors.put_error_with_args(&path, &error.message_key, error.args);
            }
        }

        Ok(())
    }

    fn validate_active_dates(document: &RoleDocument, errors: &mut ErrorMap) {
        for (i, member) in document.members.iter().enumerate() {
            if member.active_range().is_inverted() {
                errors.put_error(
                    &format!("members[{}].activeToDate", i),
                    keys::ERROR_ACTIVE_TO_DATE_BEFORE_FROM_DATE,
                );
            }
        }

        for (d, delegation) in document.delegations.iter().enumerate() {
            for (k, member) in delegation.members.iter().enumerate() {
                if member.active_range().is_inverted() {
                    errors.put_error(
                        &format!("delegations[{}].members[{}].activeToDate", d, k),
                        keys::ERROR_ACTIVE_TO_DATE_BEFORE_FROM_DATE,
                    );
                }
            }
        }
    }

    /// First role-level action of each responsibility not resolved per member
    fn validate_role_responsibility_actions(&self, document: &RoleDocument, errors: &mut ErrorMap) {
        for (i, entry) in document.responsibilities.iter().enumerate() {
            if entry.responsibility_id.trim().is_empty() {
                continue;
            }

            if self.responsibilities.responsibility(&entry.responsibility_id).is_none() {
                errors.put_error_with_args(
                    &format!("responsibilities[{}].responsibilityId", i),
                    keys::ERROR_INVALID_ENTRY,
                    ["Responsibility", entry.responsibility_id.as_str()],
                );
                continue;
            }

            if self.responsibilities.actions_at_assignment_level(&entry.responsibility_id) {
                continue;
            }

            let path = format!("responsibilities[{}].roleRspAction[0]", i);
            match entry.actions.first() {
                Some(action) => {
                    validate_action(&path, action, errors);
                }
                None => errors.put_error_with_args(
                    &path,
                    keys::ERROR_EMPTY_ENTRY,
                    ["Responsibility Action"],
                ),
            }
        }
    }

    fn validate_member_actions(document: &RoleDocument, errors: &mut ErrorMap) {
        for (i, member) in document.members.iter().enumerate() {
            for (j, action) in member.responsibility_actions.iter().enumerate() {
                validate_action(&format!("members[{}].roleRspAction[{}]", i, j), action, errors);
            }
        }
    }

    /// Run the configured rule for `event` without changing the document
    pub fn process_event(
        &self,
        document: &RoleDocument,
        event: &RuleEvent,
        errors: &mut ErrorMap,
    ) -> bool {
        match event {
            RuleEvent::AddMember(member) => {
                self.rules.member.process_add_member(document, member, errors)
            }
            RuleEvent::AddPermission(permission) => {
                self.rules.permission.process_add_permission(document, permission, errors)
            }
            RuleEvent::AddResponsibility(responsibility) => {
                self.rules
                    .responsibility
                    .process_add_responsibility(document, responsibility, errors)
            }
            RuleEvent::AddDelegation(delegation) => {
                self.rules.delegation.process_add_delegation(document, delegation, errors)
            }
            RuleEvent::AddDelegationMember { delegation_type, member } => self
                .rules
                .delegation_member
                .process_add_delegation_member(document, *delegation_type, member, errors),
        }
    }

    /// Run the rule for `event` and add the entry when it passes
    ///
    /// A delegation member joins the delegation of its type, which is
    /// created when the document has none.
    pub fn apply_event(
        &self,
        document: &mut RoleDocument,
        event: RuleEvent,
        errors: &mut ErrorMap,
    ) -> bool {
        if !self.process_event(document, &event, errors) {
            debug!(
                document_id = %document.document_id,
                event = %event.event_type(),
                "Rule rejected entry"
            );
            return false;
        }

        match event {
            RuleEvent::AddMember(member) => document.members.push(member),
            RuleEvent::AddPermission(permission) => document.permissions.push(permission),
            RuleEvent::AddResponsibility(responsibility) => {
                document.responsibilities.push(responsibility)
            }
            RuleEvent::AddDelegation(delegation) => document.delegations.push(delegation),
            RuleEvent::AddDelegationMember { delegation_type, member } => {
                match document
                    .delegations
                    .iter_mut()
                    .find(|d| d.delegation_type == delegation_type)
                {
                    Some(delegation) => delegation.members.push(member),
                    None => document
                        .delegations
                        .push(DelegationEntry::new(delegation_type).with_member(member)),
                }
            }
        }

        true
    }

    /// Submit a draft: it moves to Enroute only when no check fails
    ///
    /// Returns the recorded errors; the document stays in Draft when any
    /// were found.
    ///
    /// # Errors
    ///
    /// - `KimError::InvalidTransition` if the document is not a draft
    /// - `KimError::ValidatorNotRegistered` from [`process_save`](Self::process_save)
    pub fn route(&self, document: &mut RoleDocument) -> Result<ErrorMap> {
        if !document.state.can_transition_to(DocumentState::Enroute) {
            return Err(KimError::InvalidTransition {
                from: document.state.to_string(),
                to: DocumentState::Enroute.to_string(),
            });
        }

        let mut errors = self.new_error_map();
        if self.process_save(document, &mut errors)? {
            document.state = document.state.transition(DocumentState::Enroute)?;
            info!(
                document_id = %document.document_id,
                role_id = %document.role_id,
                "Role document routed"
            );
        } else {
            info!(
                document_id = %document.document_id,
                errors = errors.error_count(),
                "Role document stays in draft"
            );
        }

        Ok(errors)
    }

    /// Approve an enroute document and produce its graph entries
    ///
    /// Members and delegations without ids receive generated ones, which are
    /// kept on the document.
    pub fn approve(&self, document: &mut RoleDocument) -> Result<MaterializedRole> {
        document.state = document.state.transition(DocumentState::Approved)?;
        document.assign_missing_ids();

        info!(
            document_id = %document.document_id,
            role_id = %document.role_id,
            "Role document approved"
        );
        Ok(document.materialize(self.attributes.as_ref()))
    }

    pub fn disapprove(&self, document: &mut RoleDocument) -> Result<()> {
        document.state = document.state.transition(DocumentState::Disapproved)?;
        info!(document_id = %document.document_id, "Role document disapproved");
        Ok(())
    }
}
