//! Actor resolution at a route node

use super::{
    ResponsibilityBinding, RouteNode, RoutedDocument, RoutingDefinitions, DOCUMENT_TYPE_NAME,
    ROUTE_NODE_NAME,
};
use crate::error::{KimError, Result};
use crate::qualifier::QualifierSet;
use crate::resolver::{ResolvedMember, RoleResolver};
use crate::responsibility::{derive_actions, RequiredAction, ResponsibilityLookup};
use crate::types::{
    ActionPolicy, ActionType, Delegation, DelegationMember, DelegationType, MemberKind,
    MembershipId, PrincipalId, ResponsibilityId, RoleId,
};
use chrono::{NaiveDate, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A principal's required action on a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub principal_id: PrincipalId,
    pub action: ActionType,
    pub policy: ActionPolicy,
    pub priority: u32,

    #[serde(default)]
    pub force_action: bool,

    /// Qualifier the request was resolved under
    pub qualifier: QualifierSet,

    /// Role bound at the route node
    pub source_role_id: RoleId,
    pub responsibility_id: ResponsibilityId,

    /// Membership through which the principal (or delegator) holds the role
    pub membership_id: MembershipId,

    /// Delegator on whose behalf a delegate acts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delegated_for: Option<PrincipalId>,
}

impl ActionRequest {
    /// Does this request take precedence over `other` for the same principal?
    ///
    /// The stronger action wins; equal actions go to the lower priority
    /// number.
    pub fn outranks(&self, other: &ActionRequest) -> bool {
        match self.action.rank().cmp(&other.action.rank()) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Equal => self.priority < other.priority,
        }
    }
}

/// Requests resolved for one document at one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub document_id: String,
    pub node_name: String,
    pub requests: Vec<ActionRequest>,
}

impl ResolutionResult {
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn for_principal(&self, principal_id: &str) -> Option<&ActionRequest> {
        self.requests.iter().find(|r| r.principal_id == principal_id)
    }

    /// Principals in request order
    pub fn principals(&self) -> Vec<&str> {
        self.requests.iter().map(|r| r.principal_id.as_str()).collect()
    }
}

/// Keep one request per principal
///
/// The surviving request is the one that outranks the others and sits at
/// the position of the principal's first request.
pub fn apply_precedence(requests: Vec<ActionRequest>) -> Vec<ActionRequest> {
    let mut by_principal: IndexMap<PrincipalId, ActionRequest> = IndexMap::new();

    for request in requests {
        match by_principal.get_mut(&request.principal_id) {
            Some(current) => {
                if request.outranks(current) {
                    *current = request;
                }
            }
            None => {
                by_principal.insert(request.principal_id.clone(), request);
            }
        }
    }

    by_principal.into_values().collect()
}

/// Resolves who must act on a document at a route node
pub struct ActorResolver {
    resolver: Arc<RoleResolver>,
    definitions: Arc<dyn RoutingDefinitions>,
    responsibilities: Arc<dyn ResponsibilityLookup>,
}

impl ActorResolver {
    pub fn new(
        resolver: Arc<RoleResolver>,
        definitions: Arc<dyn RoutingDefinitions>,
        responsibilities: Arc<dyn ResponsibilityLookup>,
    ) -> Self {
        Self {
            resolver,
            definitions,
            responsibilities,
        }
    }

    /// Action requests for `document` at `node`, evaluated today
    pub fn resolve_actors(
        &self,
        document: &RoutedDocument,
        node: &RouteNode,
    ) -> Result<ResolutionResult> {
        self.resolve_actors_as_of(document, node, Utc::now().date_naive())
    }

    /// Action requests for `document` at `node`, evaluated on `as_of`
    ///
    /// # Errors
    ///
    /// Returns `KimError::UnknownDocumentType` if the document type has no
    /// routing definition. Members whose configured actions are incomplete
    /// are logged and skipped.
    pub fn resolve_actors_as_of(
        &self,
        document: &RoutedDocument,
        node: &RouteNode,
        as_of: NaiveDate,
    ) -> Result<ResolutionResult> {
        let bindings = self.bindings_for(&document.document_type, &node.name)?;

        let mut qualifier = document.attributes.clone();
        qualifier.insert(DOCUMENT_TYPE_NAME, document.document_type.clone());
        qualifier.insert(ROUTE_NODE_NAME, node.name.clone());

        let mut requests = Vec::new();
        for binding in &bindings {
            self.resolve_binding(binding, &qualifier, as_of, &mut requests);
        }

        let discovered = requests.len();
        let requests = apply_precedence(requests);

        info!(
            document_id = %document.id,
            node = %node.name,
            discovered,
            requests = requests.len(),
            "Resolved route node actors"
        );

        Ok(ResolutionResult {
            document_id: document.id.clone(),
            node_name: node.name.clone(),
            requests,
        })
    }

    /// Bindings for `node_name`, inherited from parent types when the type
    /// declares none
    fn bindings_for(
        &self,
        document_type: &str,
        node_name: &str,
    ) -> Result<Vec<ResponsibilityBinding>> {
        let mut current = self
            .definitions
            .definition(document_type)
            .ok_or_else(|| KimError::UnknownDocumentType(document_type.to_string()))?;
        let mut visited = HashSet::new();

        loop {
            visited.insert(current.document_type.clone());

            let bindings: Vec<ResponsibilityBinding> =
                current.bindings_for(node_name).into_iter().cloned().collect();
            if !bindings.is_empty() {
                return Ok(bindings);
            }

            let parent = match &current.parent_type {
                Some(parent) if !visited.contains(parent) => parent.clone(),
                Some(parent) => {
                    warn!(
                        document_type = %document_type,
                        parent = %parent,
                        "Document type hierarchy cycle"
                    );
                    break;
                }
                None => break,
            };

            match self.definitions.definition(&parent) {
                Some(definition) => current = definition,
                None => {
                    warn!(
                        document_type = %document_type,
                        parent = %parent,
                        "Unknown parent document type"
                    );
                    break;
                }
            }
        }

        debug!(
            document_type = %document_type,
            node = %node_name,
            "No responsibilities bound at node"
        );
        Ok(Vec::new())
    }

    fn resolve_binding(
        &self,
        binding: &ResponsibilityBinding,
        qualifier: &QualifierSet,
        as_of: NaiveDate,
        requests: &mut Vec<ActionRequest>,
    ) {
        let responsibility_id = &binding.responsibility_id;
        let responsibility = match self.responsibilities.responsibility(responsibility_id) {
            Some(responsibility) => responsibility,
            None => {
                warn!(
                    responsibility_id = %responsibility_id,
                    "Unknown responsibility, skipping binding"
                );
                return;
            }
        };

        for role_id in &binding.role_ids {
            let role_actions = self.responsibilities.role_actions(role_id, &responsibility.id);
            let delegations = self.resolver.graph().delegations_of(role_id);

            let members = self.resolver.role_members_as_of(
                std::slice::from_ref(role_id),
                Some(qualifier),
                as_of,
            );

            for member in members {
                let member_actions = self
                    .responsibilities
                    .member_actions(&member.membership_id, &responsibility.id);
                let derived = derive_actions(&responsibility, &role_actions, &member_actions);
                let actions = match derived {
                    Ok(actions) => actions,
                    Err(error) => {
                        warn!(
                            responsibility_id = %responsibility.id,
                            membership_id = %member.membership_id,
                            error = %error,
                            "Incomplete responsibility action, skipping member"
                        );
                        continue;
                    }
                };

                let (replaced, delegates) =
                    self.delegates_for(&member, &delegations, qualifier, as_of);

                for action in &actions {
                    if !replaced {
                        requests.push(Self::request(
                            &member,
                            None,
                            action,
                            qualifier,
                            &responsibility.id,
                        ));
                    }
                    for delegate in &delegates {
                        requests.push(Self::request(
                            &member,
                            Some(delegate),
                            action,
                            qualifier,
                            &responsibility.id,
                        ));
                    }
                }
            }
        }
    }

    fn request(
        member: &ResolvedMember,
        delegate: Option<&PrincipalId>,
        action: &RequiredAction,
        qualifier: &QualifierSet,
        responsibility_id: &str,
    ) -> ActionRequest {
        ActionRequest {
            principal_id: delegate.cloned().unwrap_or_else(|| member.principal_id.clone()),
            action: action.action,
            policy: action.policy,
            priority: action.priority,
            force_action: action.force_action,
            qualifier: qualifier.clone(),
            source_role_id: member.role_id.clone(),
            responsibility_id: responsibility_id.to_string(),
            membership_id: member.membership_id.clone(),
            delegated_for: delegate.map(|_| member.principal_id.clone()),
        }
    }

    /// Delegates acting for `member`, and whether a primary delegation
    /// replaces the member
    fn delegates_for(
        &self,
        member: &ResolvedMember,
        delegations: &[Delegation],
        qualifier: &QualifierSet,
        as_of: NaiveDate,
    ) -> (bool, Vec<PrincipalId>) {
        let mut replaced = false;
        let mut delegates: Vec<PrincipalId> = Vec::new();

        for delegation in delegations {
            for delegate in &delegation.members {
                if !self.delegate_applies(member, delegate, qualifier, as_of) {
                    continue;
                }

                let principals = match delegate.member_kind {
                    MemberKind::Principal => vec![delegate.member_id.clone()],
                    MemberKind::Group => {
                        self.resolver.graph().principals_in_group(&delegate.member_id)
                    }
                    MemberKind::Role => {
                        debug!(role_id = %delegate.member_id, "Role delegates are not expanded");
                        Vec::new()
                    }
                };

                for principal_id in principals {
                    if principal_id == member.principal_id {
                        continue;
                    }
                    if delegation.delegation_type == DelegationType::Primary {
                        replaced = true;
                    }
                    if !delegates.contains(&principal_id) {
                        delegates.push(principal_id);
                    }
                }
            }
        }

        if !delegates.is_empty() {
            debug!(
                principal_id = %member.principal_id,
                role_id = %member.role_id,
                delegates = ?delegates,
                replaced,
                "Applied delegation"
            );
        }

        (replaced, delegates)
    }

    fn delegate_applies(
        &self,
        member: &ResolvedMember,
        delegate: &DelegationMember,
        qualifier: &QualifierSet,
        as_of: NaiveDate,
    ) -> bool {
        if !delegate.active.contains(as_of) {
            return false;
        }
        if let Some(target) = &delegate.role_member_id {
            if *target != member.membership_id {
                return false;
            }
        }
        self.resolver.entry_matches(&member.role_id, &delegate.qualifier, qualifier)
    }
}
