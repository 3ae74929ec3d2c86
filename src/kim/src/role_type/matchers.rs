//! Built-in role type validators
//!
//! - [`ExactMatchValidator`]: attribute values must be equal
//! - [`WildcardValidator`]: member values are glob patterns (`*`, `?`)
//! - [`HierarchicalValidator`]: one attribute rolls up a parent hierarchy
//!
//! All three share the same rule for absent attributes: an attribute the
//! query requires but the member does not define places no constraint on
//! the member.

use super::schema::{AttributeError, AttributeSchema};
use super::RoleTypeValidator;
use crate::qualifier::QualifierSet;
use std::collections::{HashMap, HashSet};
use wildmatch::WildMatch;

/// Match every attribute the candidate defines with `value_matches`
fn match_defined<F>(candidate: &QualifierSet, required: &QualifierSet, value_matches: F) -> bool
where
    F: Fn(&str, &str, &str) -> bool,
{
    required.iter().all(|(name, required_value)| match candidate.get(name) {
        Some(candidate_value) => value_matches(name, candidate_value, required_value),
        None => true,
    })
}

/// Exact equality on shared attributes
#[derive(Debug, Clone)]
pub struct ExactMatchValidator {
    type_name: String,
    schema: AttributeSchema,
}

impl ExactMatchValidator {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            schema: AttributeSchema::open(),
        }
    }

    pub fn with_schema(mut self, schema: AttributeSchema) -> Self {
        self.schema = schema;
        self
    }
}

impl RoleTypeValidator for ExactMatchValidator {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn validate_attributes(&self, attributes: &QualifierSet) -> Vec<AttributeError> {
        self.schema.validate(attributes)
    }

    fn matches(&self, candidate: &QualifierSet, required: &QualifierSet) -> bool {
        match_defined(candidate, required, |_, candidate_value, required_value| {
            candidate_value == required_value
        })
    }
}

/// Member values are glob patterns: `*` matches any run, `?` one character
#[derive(Debug, Clone)]
pub struct WildcardValidator {
    type_name: String,
    schema: AttributeSchema,
}

impl WildcardValidator {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            schema: AttributeSchema::open(),
        }
    }

    pub fn with_schema(mut self, schema: AttributeSchema) -> Self {
        self.schema = schema;
        self
    }
}

impl RoleTypeValidator for WildcardValidator {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn validate_attributes(&self, attributes: &QualifierSet) -> Vec<AttributeError> {
        self.schema.validate(attributes)
    }

    fn matches(&self, candidate: &QualifierSet, required: &QualifierSet) -> bool {
        match_defined(candidate, required, |_, pattern, value| {
            pattern == value || WildMatch::new(pattern).matches(value)
        })
    }
}

/// Hierarchical roll-up on a single attribute
///
/// A member qualified for a value covers every value below it. With
/// `CHEM -> PHYS -> SCI`, a member qualified for `PHYS` matches requests for
/// `PHYS` and `CHEM` but not for `SCI`. Attributes other than the
/// hierarchical one use exact matching.
#[derive(Debug, Clone)]
pub struct HierarchicalValidator {
    type_name: String,
    schema: AttributeSchema,
    attribute: String,
    /// child value -> parent value
    parents: HashMap<String, String>,
}

impl HierarchicalValidator {
    pub fn new(type_name: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            schema: AttributeSchema::open(),
            attribute: attribute.into(),
            parents: HashMap::new(),
        }
    }

    pub fn with_schema(mut self, schema: AttributeSchema) -> Self {
        self.schema = schema;
        self
    }

    /// Declare `parent` as the direct parent of `child`
    pub fn with_parent(mut self, child: impl Into<String>, parent: impl Into<String>) -> Self {
        self.parents.insert(child.into(), parent.into());
        self
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Ancestors of `value`, nearest first
    ///
    /// A cyclic hierarchy stops at the first repeated value.
    pub fn ancestors(&self, value: &str) -> Vec<String> {
        let mut ancestors = Vec::new();
        let mut seen = HashSet::new();
        seen.insert(value.to_string());

        let mut current = value;
        while let Some(parent) = self.parents.get(current) {
            if !seen.insert(parent.clone()) {
                break;
            }
            ancestors.push(parent.clone());
            current = parent;
        }

        ancestors
    }

    fn covers(&self, candidate_value: &str, required_value: &str) -> bool {
        candidate_value == required_value
            || self
                .ancestors(required_value)
                .iter()
                .any(|ancestor| ancestor == candidate_value)
    }
}

impl RoleTypeValidator for HierarchicalValidator {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn validate_attributes(&self, attributes: &QualifierSet) -> Vec<AttributeError> {
        self.schema.validate(attributes)
    }

    fn matches(&self, candidate: &QualifierSet, required: &QualifierSet) -> bool {
        match_defined(candidate, required, |name, candidate_value, required_value| {
            if name == self.attribute {
                self.covers(candidate_value, required_value)
            } else {
                candidate_value == required_value
            }
        })
    }
}
