//! Transitive role membership resolution
//!
//! The `RoleResolver` answers "does principal P hold any of roles R under
//! qualifier q" by walking the role graph:
//!
//! - **Direct**: principal entries of the role
//! - **Group**: group entries whose group contains the principal
//! - **Containment**: role entries, followed recursively in the configured
//!   [`ContainmentDirection`]
//!
//! Qualifier comparison is always delegated to the [`RoleTypeValidator`]
//! registered for the role's type. A role whose type has no validator never
//! matches.
//!
//! # Example
//!
//! ```rust
//! use routeflow_kim::graph::InMemoryRoleGraph;
//! use routeflow_kim::resolver::{ResolverConfig, RoleResolver};
//! use routeflow_kim::role_type::{ExactMatchValidator, ValidatorRegistry};
//! use routeflow_kim::types::{Role, RoleMembership};
//! use std::sync::Arc;
//!
//! let graph = Arc::new(InMemoryRoleGraph::new());
//! graph.add_role(Role::new("r1", "KR", "Reviewer", "default")).unwrap();
//! graph.add_member(RoleMembership::principal("m1", "r1", "p1")).unwrap();
//!
//! let validators = Arc::new(ValidatorRegistry::new().with(ExactMatchValidator::new("default")));
//! let resolver = RoleResolver::new(graph, validators, ResolverConfig::default());
//!
//! assert!(resolver.principal_has_role("p1", &["r1".to_string()], None));
//! ```

mod cache;

pub use cache::CacheStats;

use crate::error::{KimError, Result};
use crate::graph::RoleGraph;
use crate::qualifier::QualifierSet;
use crate::role_type::{RoleTypeValidator, ValidatorRegistry};
use crate::types::{MemberKind, MembershipId, PrincipalId, RoleId, RoleMembership};
use cache::{CacheKey, Generation, ResolutionCache};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Which side of a containment edge inherits the other's members
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainmentDirection {
    /// Members of a contained role hold every role containing it
    #[default]
    ContainedImpliesContaining,
    /// Members of a containing role hold every role it contains
    ContainingImpliesContained,
}

/// Resolver configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Containment semantics
    #[serde(default)]
    pub containment: ContainmentDirection,

    /// Maximum containment depth followed before giving up
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Enable the membership answer cache
    #[serde(default = "default_cache_enabled")]
    pub cache_enabled: bool,

    /// Cache entry lifetime in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Maximum number of cached answers
    #[serde(default = "default_max_cache_size")]
    pub max_cache_size: usize,
}

fn default_max_depth() -> usize {
    32
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_ttl_secs() -> u64 {
    60
}

fn default_max_cache_size() -> usize {
    10_000
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            containment: ContainmentDirection::default(),
            max_depth: default_max_depth(),
            cache_enabled: default_cache_enabled(),
            cache_ttl_secs: default_cache_ttl_secs(),
            max_cache_size: default_max_cache_size(),
        }
    }
}

impl ResolverConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(KimError::Configuration(
                "resolver.max_depth must be at least 1".to_string(),
            ));
        }
        if self.cache_enabled && self.max_cache_size == 0 {
            return Err(KimError::Configuration(
                "resolver.max_cache_size must be positive when the cache is enabled".to_string(),
            ));
        }
        Ok(())
    }
}

/// A principal holding a requested role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedMember {
    pub principal_id: PrincipalId,

    /// The requested role
    pub role_id: RoleId,

    /// Role whose membership entry matched (differs from `role_id` when
    /// reached through containment)
    pub via_role_id: RoleId,

    /// Matching membership entry
    pub membership_id: MembershipId,

    /// Qualifier of the matching entry
    pub qualifier: QualifierSet,
}

/// Per-query traversal state
///
/// `path` holds the roles on the current branch and cuts cycles.
/// `explored` remembers the shallowest depth at which each role was fully
/// walked under a given qualifier, so shared sub-hierarchies are walked
/// once per query.
struct Walk<'a> {
    qualifier: Option<QualifierSet>,
    as_of: NaiveDate,
    path: HashSet<RoleId>,
    depth: usize,
    groups: &'a HashSet<String>,
    explored: HashMap<(RoleId, Option<QualifierSet>), usize>,
}

impl<'a> Walk<'a> {
    fn new(
        qualifier: Option<&QualifierSet>,
        as_of: NaiveDate,
        groups: &'a HashSet<String>,
    ) -> Self {
        Self {
            qualifier: qualifier.cloned(),
            as_of,
            path: HashSet::new(),
            depth: 0,
            groups,
            explored: HashMap::new(),
        }
    }

    fn explored_key(&self, role_id: &str) -> (RoleId, Option<QualifierSet>) {
        (role_id.to_string(), self.qualifier.clone())
    }

    /// Was `role_id` already walked at this depth or shallower?
    fn already_explored(&self, role_id: &str) -> bool {
        self.explored
            .get(&self.explored_key(role_id))
            .map_or(false, |&depth| depth <= self.depth)
    }
}

/// Role membership resolver
///
/// Thread-safe; share it behind an `Arc`.
#[derive(Clone)]
pub struct RoleResolver {
    graph: Arc<dyn RoleGraph>,
    validators: Arc<ValidatorRegistry>,
    config: ResolverConfig,
    cache: Arc<ResolutionCache>,
}

impl RoleResolver {
    pub fn new(
        graph: Arc<dyn RoleGraph>,
        validators: Arc<ValidatorRegistry>,
        config: ResolverConfig,
    ) -> Self {
        let cache = ResolutionCache::new(
            Duration::from_secs(config.cache_ttl_secs),
            config.max_cache_size,
        );

        Self {
            graph,
            validators,
            config,
            cache: Arc::new(cache),
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn graph(&self) -> &Arc<dyn RoleGraph> {
        &self.graph
    }

    pub fn validators(&self) -> &Arc<ValidatorRegistry> {
        &self.validators
    }

    /// Does the principal hold at least one of `role_ids` today?
    pub fn principal_has_role(
        &self,
        principal_id: &str,
        role_ids: &[RoleId],
        qualifier: Option<&QualifierSet>,
    ) -> bool {
        self.principal_has_role_as_of(principal_id, role_ids, qualifier, Utc::now().date_naive())
    }

    /// Does the principal hold at least one of `role_ids` on `as_of`?
    ///
    /// Without a qualifier every active entry matches.
    pub fn principal_has_role_as_of(
        &self,
        principal_id: &str,
        role_ids: &[RoleId],
        qualifier: Option<&QualifierSet>,
        as_of: NaiveDate,
    ) -> bool {
        if role_ids.is_empty() {
            return false;
        }

        let key = self
            .config
            .cache_enabled
            .then(|| CacheKey::new(principal_id, role_ids, qualifier, as_of, self.generation()));

        if let Some(key) = &key {
            if let Some(holds) = self.cache.get(key) {
                return holds;
            }
        }

        let groups: HashSet<String> = self.graph.groups_of(principal_id).into_iter().collect();
        let mut walk = Walk::new(qualifier, as_of, &groups);
        let holds = role_ids
            .iter()
            .any(|role_id| self.holds(principal_id, role_id, &mut walk));

        debug!(
            principal_id = %principal_id,
            roles = ?role_ids,
            holds,
            "Resolved role membership"
        );

        if let Some(key) = key {
            self.cache.insert(key, holds);
        }

        holds
    }

    /// Principals holding each requested role today
    pub fn role_members(
        &self,
        role_ids: &[RoleId],
        qualifier: Option<&QualifierSet>,
    ) -> Vec<ResolvedMember> {
        self.role_members_as_of(role_ids, qualifier, Utc::now().date_naive())
    }

    /// Principals holding each requested role on `as_of`
    ///
    /// Groups are expanded and containment is followed. Each
    /// `(principal, requested role)` pair appears once, tagged with the
    /// first entry through which it was found.
    pub fn role_members_as_of(
        &self,
        role_ids: &[RoleId],
        qualifier: Option<&QualifierSet>,
        as_of: NaiveDate,
    ) -> Vec<ResolvedMember> {
        let no_groups = HashSet::new();
        let mut members = Vec::new();
        let mut seen: HashSet<(PrincipalId, RoleId)> = HashSet::new();

        for requested in role_ids {
            let mut walk = Walk::new(qualifier, as_of, &no_groups);
            let mut found = Vec::new();
            self.collect_members(requested, &mut walk, &mut found);

            for (principal_id, entry) in found {
                if seen.insert((principal_id.clone(), requested.clone())) {
                    members.push(ResolvedMember {
                        principal_id,
                        role_id: requested.clone(),
                        via_role_id: entry.role_id,
                        membership_id: entry.id,
                        qualifier: entry.qualifier,
                    });
                }
            }
        }

        debug!(roles = ?role_ids, count = members.len(), "Resolved role members");
        members
    }

    /// Does `candidate` satisfy `required` for the role's type?
    ///
    /// Unknown roles and unregistered types never match.
    pub fn entry_matches(
        &self,
        role_id: &str,
        candidate: &QualifierSet,
        required: &QualifierSet,
    ) -> bool {
        match self.validator_for(role_id) {
            Some(validator) => validator.matches(candidate, required),
            None => false,
        }
    }

    pub fn invalidate_cache(&self) {
        self.cache.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    fn generation(&self) -> Generation {
        Generation {
            graph: self.graph.generation(),
            validators: self.validators.generation(),
        }
    }

    /// Validator of an active role, or `None` (logged) when the role is
    /// unknown, inactive or its type is unregistered
    fn validator_for(&self, role_id: &str) -> Option<Arc<dyn RoleTypeValidator>> {
        let role = match self.graph.role(role_id) {
            Some(role) => role,
            None => {
                debug!(role_id = %role_id, "Unknown role");
                return None;
            }
        };

        if !role.active {
            debug!(role_id = %role_id, "Inactive role");
            return None;
        }

        let validator = self.validators.get(&role.role_type);
        if validator.is_none() {
            warn!(
                role_id = %role_id,
                role_type = %role.role_type,
                "No validator registered for role type, failing closed"
            );
        }
        validator
    }

    fn qualifies(
        validator: &dyn RoleTypeValidator,
        entry: &RoleMembership,
        qualifier: Option<&QualifierSet>,
    ) -> bool {
        qualifier.map_or(true, |q| validator.matches(&entry.qualifier, q))
    }

    /// Roles whose holders also hold `role_id`, with the containment edge
    fn implying_roles(&self, role_id: &str) -> Vec<(RoleId, RoleMembership)> {
        match self.config.containment {
            ContainmentDirection::ContainedImpliesContaining => self
                .graph
                .members_of(role_id)
                .into_iter()
                .filter(|m| m.member_kind == MemberKind::Role)
                .map(|m| (m.member_id.clone(), m))
                .collect(),
            ContainmentDirection::ContainingImpliesContained => self
                .graph
                .containing_roles_of(role_id)
                .into_iter()
                .flat_map(|containing| {
                    self.graph
                        .members_of(&containing)
                        .into_iter()
                        .filter(|m| m.member_kind == MemberKind::Role && m.member_id == role_id)
                        .map(move |m| (containing.clone(), m))
                        .collect::<Vec<_>>()
                })
                .collect(),
        }
    }

    /// Does the containment edge apply under the walk's qualifier and date?
    fn edge_applies(&self, edge: &RoleMembership, walk: &Walk<'_>) -> bool {
        if !edge.is_active_on(walk.as_of) {
            return false;
        }
        match &walk.qualifier {
            None => true,
            Some(q) => self.entry_matches(&edge.role_id, &edge.qualifier, q),
        }
    }

    /// Enter `role_id` on the walk; `None` when it must be skipped
    fn enter(&self, role_id: &str, walk: &mut Walk<'_>) -> Option<Arc<dyn RoleTypeValidator>> {
        if walk.depth >= self.config.max_depth {
            warn!(
                role_id = %role_id,
                max_depth = self.config.max_depth,
                "Containment depth limit reached"
            );
            return None;
        }
        if walk.path.contains(role_id) {
            debug!(role_id = %role_id, "Containment cycle, skipping role");
            return None;
        }
        if walk.already_explored(role_id) {
            return None;
        }

        let validator = self.validator_for(role_id)?;
        walk.path.insert(role_id.to_string());
        walk.depth += 1;
        Some(validator)
    }

    fn leave(role_id: &str, walk: &mut Walk<'_>) {
        walk.path.remove(role_id);
        walk.depth -= 1;

        let depth = walk.depth;
        let key = walk.explored_key(role_id);
        walk.explored
            .entry(key)
            .and_modify(|seen| *seen = (*seen).min(depth))
            .or_insert(depth);
    }

    fn holds(&self, principal_id: &str, role_id: &str, walk: &mut Walk<'_>) -> bool {
        let validator = match self.enter(role_id, walk) {
            Some(validator) => validator,
            None => return false,
        };

        let found = self.holds_entered(principal_id, role_id, validator.as_ref(), walk);
        Self::leave(role_id, walk);
        found
    }

    fn holds_entered(
        &self,
        principal_id: &str,
        role_id: &str,
        validator: &dyn RoleTypeValidator,
        walk: &mut Walk<'_>,
    ) -> bool {
        let entries = self.graph.members_of(role_id);

        let direct = entries.iter().any(|entry| {
            entry.is_active_on(walk.as_of)
                && match entry.member_kind {
                    MemberKind::Principal => entry.member_id == principal_id,
                    MemberKind::Group => walk.groups.contains(&entry.member_id),
                    MemberKind::Role => false,
                }
                && Self::qualifies(validator, entry, walk.qualifier.as_ref())
        });
        if direct {
            return true;
        }

        for (related, edge) in self.implying_roles(role_id) {
            if !self.edge_applies(&edge, walk) {
                continue;
            }

            let outer = walk.qualifier.clone();
            walk.qualifier = outer.as_ref().map(|q| validator.qualifier_for_related_role(q));
            let found = self.holds(principal_id, &related, walk);
            walk.qualifier = outer;

            if found {
                return true;
            }
        }

        false
    }

    fn collect_members(
        &self,
        role_id: &str,
        walk: &mut Walk<'_>,
        found: &mut Vec<(PrincipalId, RoleMembership)>,
    ) {
        let validator = match self.enter(role_id, walk) {
            Some(validator) => validator,
            None => return,
        };

        for entry in self.graph.members_of(role_id) {
            if !entry.is_active_on(walk.as_of)
                || !Self::qualifies(validator.as_ref(), &entry, walk.qualifier.as_ref())
            {
                continue;
            }
            match entry.member_kind {
                MemberKind::Principal => found.push((entry.member_id.clone(), entry)),
                MemberKind::Group => {
                    for principal_id in self.graph.principals_in_group(&entry.member_id) {
                        found.push((principal_id, entry.clone()));
                    }
                }
                MemberKind::Role => {}
            }
        }

        for (related, edge) in self.implying_roles(role_id) {
            if !self.edge_applies(&edge, walk) {
                continue;
            }

            let outer = walk.qualifier.clone();
            walk.qualifier = outer.as_ref().map(|q| validator.qualifier_for_related_role(q));
            self.collect_members(&related, walk, found);
            walk.qualifier = outer;
        }

        Self::leave(role_id, walk);
    }
}
