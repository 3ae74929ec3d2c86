//! Role type validators
//!
//! Each role declares a type. The validator registered for that type owns
//! qualifier validation and qualifier matching for the role; the resolver
//! never compares qualifiers itself.
//!
//! # Example
//!
//! ```rust
//! use routeflow_kim::role_type::{ExactMatchValidator, RoleTypeValidator};
//! use routeflow_kim::QualifierSet;
//!
//! let validator = ExactMatchValidator::new("department");
//! let member = QualifierSet::new().with("dept", "CHEM");
//!
//! assert!(validator.matches(&member, &QualifierSet::new().with("dept", "CHEM")));
//! assert!(!validator.matches(&member, &QualifierSet::new().with("dept", "PHYS")));
//! ```

pub mod matchers;
pub mod registry;
pub mod schema;

pub use matchers::{ExactMatchValidator, HierarchicalValidator, WildcardValidator};
pub use registry::ValidatorRegistry;
pub use schema::{AttributeDefinition, AttributeError, AttributeSchema};

use crate::qualifier::QualifierSet;

/// Capability owned by one role type
pub trait RoleTypeValidator: Send + Sync {
    /// Registry key of this validator
    fn type_name(&self) -> &str;

    /// Validate a member's qualifier attributes; empty means valid
    fn validate_attributes(&self, attributes: &QualifierSet) -> Vec<AttributeError>;

    /// Does a member qualified by `candidate` satisfy `required`?
    fn matches(&self, candidate: &QualifierSet, required: &QualifierSet) -> bool;

    /// Qualifier to use when resolution crosses a containment edge out of a
    /// role of this type
    fn qualifier_for_related_role(&self, qualifier: &QualifierSet) -> QualifierSet {
        qualifier.clone()
    }
}
