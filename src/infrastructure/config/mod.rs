//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use crate::application::errors::ConfigError;
use crate::application::registry::ConflictPolicy;

/// Mediator configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub mediator: MediatorConfig,
    pub registry: RegistryConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct MediatorConfig {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RegistryConfig {
    pub on_conflict: ConflictPolicy,
}

/// Built-in behaviors the host wraps around every greeting
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct PipelineConfig {
    pub logging: bool,
    pub validation: bool,
    pub cancellation_guard: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct LoggingConfig {
    pub filter: String,
    pub with_target: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mediator: MediatorConfig {
                name: "mediator-lite".to_string(),
            },
            registry: RegistryConfig {
                on_conflict: ConflictPolicy::Reject,
            },
            pipeline: PipelineConfig {
                logging: true,
                validation: true,
                cancellation_guard: false,
            },
            logging: LoggingConfig {
                filter: "info".to_string(),
                with_target: false,
            },
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn load_env() -> Self {
        Self::load_env_from(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for the known keys
    pub fn load_env_from(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Config::default();

        if let Some(filter) = lookup("MEDIATOR_LOG") {
            config.logging.filter = filter;
        }

        if let Some(policy) = lookup("MEDIATOR_ON_CONFLICT") {
            match policy.parse() {
                Ok(policy) => config.registry.on_conflict = policy,
                Err(e) => tracing::warn!("Ignoring MEDIATOR_ON_CONFLICT: {}", e),
            }
        }

        config
    }
}
