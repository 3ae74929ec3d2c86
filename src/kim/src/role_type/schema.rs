//! Attribute definitions and schema validation shared by the built-in
//! validators

use crate::error::{KimError, Result};
use crate::qualifier::QualifierSet;
use crate::rules::keys;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Declared qualifier attribute of a role type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    /// Attribute name as used in qualifier sets
    pub name: String,

    /// Must be present on every member
    #[serde(default)]
    pub required: bool,

    /// Optional regex the value must match in full
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Optional maximum value length in characters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

impl AttributeDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
            pattern: None,
            max_length: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }
}

/// Validation failure for a single attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeError {
    /// Offending attribute name
    pub attribute: String,

    /// Message key (see [`keys`])
    pub message_key: String,

    /// Substitution arguments; the attribute name comes first
    pub args: Vec<String>,
}

impl AttributeError {
    pub fn new(attribute: impl Into<String>, message_key: impl Into<String>) -> Self {
        let attribute = attribute.into();
        Self {
            args: vec![attribute.clone()],
            attribute,
            message_key: message_key.into(),
        }
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

#[derive(Debug, Clone)]
struct CompiledAttribute {
    definition: AttributeDefinition,
    pattern: Option<Regex>,
}

/// Ordered set of attribute definitions with compiled patterns
///
/// An empty schema accepts any attribute. A non-empty schema rejects
/// attributes it does not declare.
#[derive(Debug, Clone, Default)]
pub struct AttributeSchema {
    attributes: Vec<CompiledAttribute>,
}

impl AttributeSchema {
    /// Schema accepting any attribute
    pub fn open() -> Self {
        Self::default()
    }

    /// Compile a schema
    ///
    /// # Errors
    ///
    /// Returns `KimError::InvalidPattern` if a pattern does not compile.
    pub fn new(definitions: Vec<AttributeDefinition>) -> Result<Self> {
        let mut attributes = Vec::with_capacity(definitions.len());

        for definition in definitions {
            let pattern = match &definition.pattern {
                Some(raw) => Some(Regex::new(&format!("^(?:{})$", raw)).map_err(|e| {
                    KimError::InvalidPattern {
                        pattern: raw.clone(),
                        reason: e.to_string(),
                    }
                })?),
                None => None,
            };
            attributes.push(CompiledAttribute { definition, pattern });
        }

        Ok(Self { attributes })
    }

    pub fn is_open(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn definition(&self, name: &str) -> Option<&AttributeDefinition> {
        self.attributes
            .iter()
            .map(|a| &a.definition)
            .find(|d| d.name == name)
    }

    /// Check `attributes` against the schema
    pub fn validate(&self, attributes: &QualifierSet) -> Vec<AttributeError> {
        let mut errors = Vec::new();

        for compiled in &self.attributes {
            let definition = &compiled.definition;
            match attributes.get(&definition.name) {
                None => {
                    if definition.required {
                        errors.push(AttributeError::new(&definition.name, keys::ERROR_REQUIRED));
                    }
                }
                Some(value) => {
                    if value.trim().is_empty() && definition.required {
                        errors.push(AttributeError::new(&definition.name, keys::ERROR_REQUIRED));
                        continue;
                    }
                    if let Some(max) = definition.max_length {
                        if value.chars().count() > max {
                            errors.push(
                                AttributeError::new(&definition.name, keys::ERROR_MAX_LENGTH)
                                    .with_arg(max.to_string()),
                            );
                        }
                    }
                    if let Some(pattern) = &compiled.pattern {
                        if !pattern.is_match(value) {
                            errors.push(
                                AttributeError::new(&definition.name, keys::ERROR_INVALID_FORMAT)
                                    .with_arg(value),
                            );
                        }
                    }
                }
            }
        }

        if !self.is_open() {
            for name in attributes.names() {
                if self.definition(name).is_none() {
                    errors.push(AttributeError::new(name, keys::ERROR_UNKNOWN_ATTRIBUTE));
                }
            }
        }

        errors
    }
}
