//! Enforcement configuration in the configuration definition envelope.
//!
//! ```yaml
//! id: enforcement
//! name: Policy enforcement
//! provider: enforcement
//! version: "1.0"
//! values:
//!   cache:
//!     maximum_size: 5000
//!     expire_after_write: 10m
//!     ask_timeout: 2s
//!   blocked_namespaces:
//!     - org.suspended
//! ```

use crate::error::ConfigError;
use enforcer_cache::CacheConfig;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Configuration definition that describes a configuration module
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigurationDefinition {
    /// Unique identifier for this configuration
    pub id: String,
    /// Human-readable name for this configuration
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The module or crate that provides this configuration
    pub provider: String,
    /// Version of the configuration schema
    pub version: String,
    /// The actual configuration values
    #[serde(default)]
    pub values: HashMap<String, Value>,
}

/// Effective settings of the enforcement gate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnforcementConfig {
    pub cache: CacheConfig,
    pub blocked_namespaces: Vec<String>,
}

impl EnforcementConfig {
    /// Parse a configuration definition; keys missing from `values` keep
    /// their defaults.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let definition: ConfigurationDefinition = serde_yaml::from_str(content)?;
        Self::from_definition(definition)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!("Loading enforcement configuration from {:?}", path);
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_definition(mut definition: ConfigurationDefinition) -> Result<Self, ConfigError> {
        if definition.id.is_empty() {
            return Err(ConfigError::Validation(
                "Configuration ID cannot be empty".to_string(),
            ));
        }
        if definition.provider.is_empty() {
            return Err(ConfigError::Validation(
                "Configuration provider cannot be empty".to_string(),
            ));
        }

        let mut config = Self::default();
        if let Some(cache) = definition.values.remove("cache") {
            config.cache = serde_yaml::from_value(cache)?;
        }
        if let Some(blocked) = definition.values.remove("blocked_namespaces") {
            config.blocked_namespaces = serde_yaml::from_value(blocked)?;
        }
        config.validate()?;

        info!(
            "Loaded enforcement configuration '{}' version {} ({} blocked namespaces)",
            definition.id,
            definition.version,
            config.blocked_namespaces.len()
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cache.validate()?;
        if let Some(empty) = self.blocked_namespaces.iter().find(|ns| ns.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "Blocked namespace must not be empty: {:?}",
                empty
            )));
        }
        Ok(())
    }

    /// Render as a configuration definition.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        let mut values = HashMap::new();
        values.insert("cache".to_string(), serde_yaml::to_value(&self.cache)?);
        values.insert(
            "blocked_namespaces".to_string(),
            serde_yaml::to_value(&self.blocked_namespaces)?,
        );
        let definition = ConfigurationDefinition {
            id: "enforcement".to_string(),
            name: "Policy enforcement".to_string(),
            description: None,
            provider: "enforcement".to_string(),
            version: "1.0".to_string(),
            values,
        };
        Ok(serde_yaml::to_string(&definition)?)
    }
}
