//! Error types for the role resolution engine
//!
//! Only configuration and programming faults surface as `KimError`.
//! User-correctable problems in a role document are collected in an
//! [`ErrorMap`](crate::rules::ErrorMap) instead.

use thiserror::Error;

/// Role engine errors
#[derive(Debug, Error)]
pub enum KimError {
    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No strategy registered under the configured identifier
    #[error("No rule strategy '{strategy}' registered for event '{event}'")]
    MissingStrategy { event: String, strategy: String },

    /// The strategy factory failed to build an instance
    #[error("Unable to create rule strategy '{strategy}' for event '{event}': {reason}")]
    StrategyConstruction {
        event: String,
        strategy: String,
        reason: String,
    },

    /// A role type has no registered validator
    #[error("No role type validator registered for type '{0}'")]
    ValidatorNotRegistered(String),

    /// Role not found in the graph
    #[error("Role not found: {0}")]
    RoleNotFound(String),

    /// Attempt to change the type of a registered role
    #[error("Role '{role}' already has type '{existing}', cannot change to '{requested}'")]
    RoleTypeImmutable {
        role: String,
        existing: String,
        requested: String,
    },

    /// Invalid membership entry
    #[error("Invalid membership: {0}")]
    InvalidMembership(String),

    /// No routing definition for a document type
    #[error("Unknown document type: {0}")]
    UnknownDocumentType(String),

    /// Illegal document state change
    #[error("Invalid document transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Responsibility action that cannot be turned into a request
    #[error("Invalid responsibility action: {0}")]
    InvalidAction(String),

    /// Attribute pattern failed to compile
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for role engine operations
pub type Result<T> = std::result::Result<T, KimError>;

impl KimError {
    /// Whether the error signals a broken deployment rather than bad input
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            KimError::Configuration(_)
                | KimError::MissingStrategy { .. }
                | KimError::StrategyConstruction { .. }
                | KimError::ValidatorNotRegistered(_)
                | KimError::InvalidPattern { .. }
        )
    }
}
