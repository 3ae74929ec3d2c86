//! Role, responsibility and route-node actor resolution
//!
//! This crate decides who must act on a document as it moves through its
//! route. Principals hold roles directly, through groups, or through role
//! containment; assignments are narrowed by qualifiers interpreted by the
//! validator of each role's type. Responsibilities bound to roles at a route
//! node turn membership into action requests.
//!
//! # Components
//!
//! - [`role_type`]: qualifier validation and matching per role type
//! - [`graph`]: roles, memberships, groups and delegations
//! - [`resolver`]: transitive membership checks with caching
//! - [`responsibility`]: required actions per responsibility
//! - [`routing`]: actor resolution at a route node
//! - [`document`] and [`rules`]: authoring and checking role documents
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
//! graph.add_role(Role::new("r2", "KR", "Approver", "default")).unwrap();
//! graph.add_group_member("g1", "p2");
//! graph.add_member(RoleMembership::group("m1", "r2", "g1")).unwrap();
//!
//! let validators = Arc::new(ValidatorRegistry::new().with(ExactMatchValidator::new("default")));
//! let resolver = RoleResolver::new(graph, validators, ResolverConfig::default());
//!
//! assert!(resolver.principal_has_role("p2", &["r2".to_string()], None));
//! assert!(!resolver.principal_has_role("p2", &["r1".to_string()], None));
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod graph;
pub mod qualifier;
pub mod resolver;
pub mod responsibility;
pub mod role_type;
pub mod routing;
pub mod rules;
pub mod types;

pub use config::{KimConfig, RuleConfig};
pub use error::{KimError, Result};
pub use graph::{InMemoryRoleGraph, RoleGraph};
pub use qualifier::QualifierSet;
pub use resolver::{ContainmentDirection, ResolverConfig, RoleResolver};
pub use role_type::{RoleTypeValidator, ValidatorRegistry};
pub use routing::ActorResolver;
pub use rules::{ErrorMap, RoleDocumentRules};
