//! Role document rules
//!
//! - [`ErrorMap`]: explicit accumulator of validation messages
//! - [`events`]: one capability trait per add-entry event, with defaults
//! - [`registry`]: strategy catalog resolved when configuration loads
//! - [`lookup`]: collaborators consulted during checks
//! - [`RoleDocumentRules`]: save-time checks and document lifecycle

pub mod engine;
pub mod error_map;
pub mod events;
pub mod keys;
pub mod lookup;
pub mod registry;

pub use engine::RoleDocumentRules;
pub use error_map::{ErrorMap, ErrorMessage};
pub use events::{
    AddDelegationMemberRule, AddDelegationRule, AddMemberRule, AddPermissionRule,
    AddResponsibilityRule, DefaultDelegationMemberRule, DefaultDelegationRule, DefaultMemberRule,
    DefaultPermissionRule, DefaultResponsibilityRule, EventType, RuleEvent,
};
pub use lookup::{AttributeLookup, DictionaryValidator, InMemoryAttributes, StructuralValidator};
pub use registry::{RuleSet, RuleStrategy, StrategyCatalog, StrategyConfig, DEFAULT_STRATEGY};
