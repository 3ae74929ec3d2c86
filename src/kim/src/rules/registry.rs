//! Rule strategy catalog
//!
//! Strategies are registered under an identifier per event type and built
//! once, when configuration is loaded. A configured identifier without a
//! registration, or a factory that fails, is a configuration error.
//!
//! # Example
//!
//! ```rust
//! use routeflow_kim::rules::{RuleSet, StrategyCatalog, StrategyConfig};
//!
//! let catalog = StrategyCatalog::with_defaults();
//! let rules = RuleSet::from_config(&StrategyConfig::default(), &catalog).unwrap();
//! assert_eq!(rules.strategy_id(routeflow_kim::rules::EventType::AddMember), "default");
//! ```

use super::events::{
    AddDelegationMemberRule, AddDelegationRule, AddMemberRule, AddPermissionRule,
    AddResponsibilityRule, DefaultDelegationMemberRule, DefaultDelegationRule, DefaultMemberRule,
    DefaultPermissionRule, DefaultResponsibilityRule, EventType,
};
use crate::error::{KimError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Identifier of the built-in strategies
pub const DEFAULT_STRATEGY: &str = "default";

/// A constructed rule for one event type
#[derive(Clone)]
pub enum RuleStrategy {
    Member(Arc<dyn AddMemberRule>),
    Permission(Arc<dyn AddPermissionRule>),
    Responsibility(Arc<dyn AddResponsibilityRule>),
    Delegation(Arc<dyn AddDelegationRule>),
    DelegationMember(Arc<dyn AddDelegationMemberRule>),
}

impl RuleStrategy {
    pub fn event_type(&self) -> EventType {
        match self {
            RuleStrategy::Member(_) => EventType::AddMember,
            RuleStrategy::Permission(_) => EventType::AddPermission,
            RuleStrategy::Responsibility(_) => EventType::AddResponsibility,
            RuleStrategy::Delegation(_) => EventType::AddDelegation,
            RuleStrategy::DelegationMember(_) => EventType::AddDelegationMember,
        }
    }
}

type Factory = Arc<dyn Fn() -> anyhow::Result<RuleStrategy> + Send + Sync>;

/// Strategy factories keyed by event type and identifier
#[derive(Clone, Default)]
pub struct StrategyCatalog {
    factories: HashMap<(EventType, String), Factory>,
}

impl StrategyCatalog {
    /// Empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with the built-in rules under [`DEFAULT_STRATEGY`]
    pub fn with_defaults() -> Self {
        let mut catalog = Self::new();
        catalog.register_member_rule(DEFAULT_STRATEGY, || Ok(Arc::new(DefaultMemberRule)));
        catalog.register_permission_rule(DEFAULT_STRATEGY, || Ok(Arc::new(DefaultPermissionRule)));
        catalog.register_responsibility_rule(DEFAULT_STRATEGY, || {
            Ok(Arc::new(DefaultResponsibilityRule))
        });
        catalog.register_delegation_rule(DEFAULT_STRATEGY, || Ok(Arc::new(DefaultDelegationRule)));
        catalog.register_delegation_member_rule(DEFAULT_STRATEGY, || {
            Ok(Arc::new(DefaultDelegationMemberRule))
        });
        catalog
    }

    fn register(&mut self, event: EventType, id: &str, factory: Factory) {
        debug!(event = %event, strategy = %id, "Registered rule strategy");
        self.factories.insert((event, id.to_string()), factory);
    }

    pub fn register_member_rule<F>(&mut self, id: &str, factory: F)
    where
        F: Fn() -> anyhow::Result<Arc<dyn AddMemberRule>> + Send + Sync + 'static,
    {
        self.register(
            EventType::AddMember,
            id,
            Arc::new(move || factory().map(RuleStrategy::Member)),
        );
    }

    pub fn register_permission_rule<F>(&mut self, id: &str, factory: F)
    where
        F: Fn() -> anyhow::Result<Arc<dyn AddPermissionRule>> + Send + Sync + 'static,
    {
        self.register(
            EventType::AddPermission,
            id,
            Arc::new(move || factory().map(RuleStrategy::Permission)),
        );
    }

    pub fn register_responsibility_rule<F>(&mut self, id: &str, factory: F)
    where
        F: Fn() -> anyhow::Result<Arc<dyn AddResponsibilityRule>> + Send + Sync + 'static,
    {
        self.register(
            EventType::AddResponsibility,
            id,
            Arc::new(move || factory().map(RuleStrategy::Responsibility)),
        );
    }

    pub fn register_delegation_rule<F>(&mut self, id: &str, factory: F)
    where
        F: Fn() -> anyhow::Result<Arc<dyn AddDelegationRule>> + Send + Sync + 'static,
    {
        self.register(
            EventType::AddDelegation,
            id,
            Arc::new(move || factory().map(RuleStrategy::Delegation)),
        );
    }

    pub fn register_delegation_member_rule<F>(&mut self, id: &str, factory: F)
    where
        F: Fn() -> anyhow::Result<Arc<dyn AddDelegationMemberRule>> + Send + Sync + 'static,
    {
        self.register(
            EventType::AddDelegationMember,
            id,
            Arc::new(move || factory().map(RuleStrategy::DelegationMember)),
        );
    }

    pub fn contains(&self, event: EventType, id: &str) -> bool {
        self.factories.contains_key(&(event, id.to_string()))
    }

    /// Build the strategy registered for `event` under `id`
    ///
    /// # Errors
    ///
    /// - `KimError::MissingStrategy` if nothing is registered
    /// - `KimError::StrategyConstruction` if the factory fails
    pub fn build(&self, event: EventType, id: &str) -> Result<RuleStrategy> {
        let factory = self
            .factories
            .get(&(event, id.to_string()))
            .ok_or_else(|| KimError::MissingStrategy {
                event: event.to_string(),
                strategy: id.to_string(),
            })?;

        let strategy = factory().map_err(|e| KimError::StrategyConstruction {
            event: event.to_string(),
            strategy: id.to_string(),
            reason: format!("{:#}", e),
        })?;

        if strategy.event_type() != event {
            return Err(KimError::StrategyConstruction {
                event: event.to_string(),
                strategy: id.to_string(),
                reason: format!("factory produced a rule for '{}'", strategy.event_type()),
            });
        }

        Ok(strategy)
    }
}

/// Strategy identifier per event type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyConfig {
    #[serde(default = "default_strategy")]
    pub add_member: String,

    #[serde(default = "default_strategy")]
    pub add_permission: String,

    #[serde(default = "default_strategy")]
    pub add_responsibility: String,

    #[serde(default = "default_strategy")]
    pub add_delegation: String,

    #[serde(default = "default_strategy")]
    pub add_delegation_member: String,
}

fn default_strategy() -> String {
    DEFAULT_STRATEGY.to_string()
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            add_member: default_strategy(),
            add_permission: default_strategy(),
            add_responsibility: default_strategy(),
            add_delegation: default_strategy(),
            add_delegation_member: default_strategy(),
        }
    }
}

impl StrategyConfig {
    pub fn strategy_for(&self, event: EventType) -> &str {
        match event {
            EventType::AddMember => &self.add_member,
            EventType::AddPermission => &self.add_permission,
            EventType::AddResponsibility => &self.add_responsibility,
            EventType::AddDelegation => &self.add_delegation,
            EventType::AddDelegationMember => &self.add_delegation_member,
        }
    }
}

/// Constructed rule per event type
#[derive(Clone)]
pub struct RuleSet {
    pub(crate) member: Arc<dyn AddMemberRule>,
    pub(crate) permission: Arc<dyn AddPermissionRule>,
    pub(crate) responsibility: Arc<dyn AddResponsibilityRule>,
    pub(crate) delegation: Arc<dyn AddDelegationRule>,
    pub(crate) delegation_member: Arc<dyn AddDelegationMemberRule>,
    strategy_ids: HashMap<EventType, String>,
}

impl RuleSet {
    /// Build every configured strategy
    ///
    /// # Errors
    ///
    /// Returns the first `MissingStrategy` or `StrategyConstruction` error.
    pub fn from_config(config: &StrategyConfig, catalog: &StrategyCatalog) -> Result<Self> {
        let mut member = None;
        let mut permission = None;
        let mut responsibility = None;
        let mut delegation = None;
        let mut delegation_member = None;
        let mut strategy_ids = HashMap::new();

        for event in EventType::ALL {
            let id = config.strategy_for(event);
            match catalog.build(event, id)? {
                RuleStrategy::Member(rule) => member = Some(rule),
                RuleStrategy::Permission(rule) => permission = Some(rule),
                RuleStrategy::Responsibility(rule) => responsibility = Some(rule),
                RuleStrategy::Delegation(rule) => delegation = Some(rule),
                RuleStrategy::DelegationMember(rule) => delegation_member = Some(rule),
            }
            strategy_ids.insert(event, id.to_string());
            info!(event = %event, strategy = %id, "Loaded rule strategy");
        }

        let missing =
            |event: EventType| KimError::Internal(format!("no rule built for '{}'", event));

        Ok(Self {
            member: member.ok_or_else(|| missing(EventType::AddMember))?,
            permission: permission.ok_or_else(|| missing(EventType::AddPermission))?,
            responsibility: responsibility.ok_or_else(|| missing(EventType::AddResponsibility))?,
            delegation: delegation.ok_or_else(|| missing(EventType::AddDelegation))?,
            delegation_member: delegation_member
                .ok_or_else(|| missing(EventType::AddDelegationMember))?,
            strategy_ids,
        })
    }

    /// Built-in rules for every event
    pub fn defaults() -> Self {
        let strategy_ids = EventType::ALL
            .iter()
            .map(|event| (*event, DEFAULT_STRATEGY.to_string()))
            .collect();

        Self {
            member: Arc::new(DefaultMemberRule),
            permission: Arc::new(DefaultPermissionRule),
            responsibility: Arc::new(DefaultResponsibilityRule),
            delegation: Arc::new(DefaultDelegationRule),
            delegation_member: Arc::new(DefaultDelegationMemberRule),
            strategy_ids,
        }
    }

    /// Identifier of the strategy loaded for `event`
    pub fn strategy_id(&self, event: EventType) -> &str {
        self.strategy_ids.get(&event).map(String::as_str).unwrap_or(DEFAULT_STRATEGY)
    }
}
