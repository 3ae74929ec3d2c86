//! Role type validator registry keyed by type name

use super::RoleTypeValidator;
use crate::error::{KimError, Result};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Thread-safe registry of role type validators
///
/// Lookups of unregistered keys are not errors here; callers decide whether
/// a missing validator fails closed ([`get`](Self::get)) or is fatal
/// ([`require`](Self::require)).
#[derive(Default)]
pub struct ValidatorRegistry {
    validators: DashMap<String, Arc<dyn RoleTypeValidator>>,
    /// Bumped on every registration or removal
    generation: AtomicU64,
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a validator under its own type name, replacing any previous one
    pub fn register(&self, validator: Arc<dyn RoleTypeValidator>) {
        let type_name = validator.type_name().to_string();
        let replaced = self.validators.insert(type_name.clone(), validator).is_some();
        self.generation.fetch_add(1, Ordering::SeqCst);
        if replaced {
            warn!(role_type = %type_name, "Replaced registered role type validator");
        } else {
            debug!(role_type = %type_name, "Registered role type validator");
        }
    }

    /// Builder-style registration
    pub fn with(self, validator: impl RoleTypeValidator + 'static) -> Self {
        self.register(Arc::new(validator));
        self
    }

    pub fn get(&self, type_name: &str) -> Option<Arc<dyn RoleTypeValidator>> {
        self.validators.get(type_name).map(|entry| Arc::clone(entry.value()))
    }

    /// Look up a validator that must exist
    ///
    /// # Errors
    ///
    /// Returns `KimError::ValidatorNotRegistered` for unknown type names.
    pub fn require(&self, type_name: &str) -> Result<Arc<dyn RoleTypeValidator>> {
        self.get(type_name)
            .ok_or_else(|| KimError::ValidatorNotRegistered(type_name.to_string()))
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.validators.contains_key(type_name)
    }

    pub fn remove(&self, type_name: &str) -> bool {
        let removed = self.validators.remove(type_name).is_some();
        if removed {
            self.generation.fetch_add(1, Ordering::SeqCst);
            debug!(role_type = %type_name, "Removed role type validator");
        }
        removed
    }

    /// Mutation counter, used to invalidate cached membership answers
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Registered type names, sorted
    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.validators.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}
