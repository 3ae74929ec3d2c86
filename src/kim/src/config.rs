//! Engine configuration
//!
//! Loaded from TOML:
//!
//! ```toml
//! [resolver]
//! containment = "contained_implies_containing"
//! max_depth = 32
//! cache_enabled = true
//! cache_ttl_secs = 60
//! max_cache_size = 10000
//!
//! [rules]
//! error_path_prefix = "document"
//! max_name_length = 100
//!
//! [rules.strategies]
//! add_member = "default"
//! ```

use crate::resolver::ResolverConfig;
use crate::rules::StrategyConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct KimConfig {
    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub rules: RuleConfig,
}

/// Role document rule configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RuleConfig {
    /// Strategy identifier per event type
    #[serde(default)]
    pub strategies: StrategyConfig,

    /// Root under which error paths are recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_path_prefix: Option<String>,

    /// Maximum length of role namespace and name
    #[serde(default = "default_max_name_length")]
    pub max_name_length: usize,
}

fn default_max_name_length() -> usize {
    100
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            strategies: StrategyConfig::default(),
            error_path_prefix: None,
            max_name_length: default_max_name_length(),
        }
    }
}

impl KimConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .with_context(|| {
                format!("Failed to read configuration file {}", path.as_ref().display())
            })?;

        Self::from_toml_str(&contents)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: KimConfig =
            toml::from_str(contents).context("Failed to parse configuration file")?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// Strategy identifiers are checked later, when the rule set is built
    /// against a catalog.
    pub fn validate(&self) -> Result<()> {
        self.resolver.validate()?;

        if self.rules.max_name_length == 0 {
            anyhow::bail!("rules.max_name_length must be at least 1");
        }

        for event in crate::rules::EventType::ALL {
            if self.rules.strategies.strategy_for(event).trim().is_empty() {
                anyhow::bail!("rules.strategies.{} must not be empty", event);
            }
        }

        Ok(())
    }
}
