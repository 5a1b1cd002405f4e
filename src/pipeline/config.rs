//! Typed pipeline configuration with ordered override layers.
//!
//! A configuration is resolved from the built-in defaults plus any number of
//! [`ConfigOverrides`] layers (YAML files, environment, CLI flags) applied in
//! order. Later layers win field by field; unset fields leave earlier values
//! in place.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configuration value has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// IO error while reading configuration.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Pipeline-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSection {
    /// IAM role the pipeline runs under.
    pub role: String,
    /// Bucket for pipeline artifacts; the platform default when unset.
    pub default_bucket: Option<String>,
    /// Step result caching.
    pub cache: CacheSettings,
}

/// Step caching settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSettings {
    pub enabled: bool,
    /// ISO 8601 duration such as `P30D`.
    pub expire_after: Option<String>,
}

/// Compute settings for processing steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingSection {
    pub instance_type: String,
    pub instance_count: u32,
    /// Framework container version.
    pub framework_version: String,
}

/// Input dataset locations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputSection {
    pub data_uri: Option<String>,
    pub label_uri: Option<String>,
}

/// Fully resolved pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub pipeline: PipelineSection,
    pub processing: ProcessingSection,
    pub inputs: InputSection,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineSection {
                role: String::new(),
                default_bucket: None,
                cache: CacheSettings {
                    enabled: false,
                    expire_after: None,
                },
            },
            processing: ProcessingSection {
                instance_type: "ml.m5.large".to_string(),
                instance_count: 1,
                framework_version: "1.0-1".to_string(),
            },
            inputs: InputSection::default(),
        }
    }
}

impl PipelineConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `layers` in order over the defaults and validates the result.
    pub fn layered(layers: &[ConfigOverrides]) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for layer in layers {
            config.apply(layer);
        }
        config.validate()?;
        Ok(config)
    }

    /// Overwrites every field that `overrides` sets.
    pub fn apply(&mut self, overrides: &ConfigOverrides) {
        let p = &overrides.pipeline;
        if let Some(role) = &p.role {
            self.pipeline.role = role.clone();
        }
        if let Some(bucket) = &p.default_bucket {
            self.pipeline.default_bucket = Some(bucket.clone());
        }
        if let Some(enabled) = p.cache.enabled {
            self.pipeline.cache.enabled = enabled;
        }
        if let Some(expire_after) = &p.cache.expire_after {
            self.pipeline.cache.expire_after = Some(expire_after.clone());
        }

        let proc = &overrides.processing;
        if let Some(instance_type) = &proc.instance_type {
            self.processing.instance_type = instance_type.clone();
        }
        if let Some(instance_count) = proc.instance_count {
            self.processing.instance_count = instance_count;
        }
        if let Some(version) = &proc.framework_version {
            self.processing.framework_version = version.clone();
        }

        let inputs = &overrides.inputs;
        if let Some(uri) = &inputs.data_uri {
            self.inputs.data_uri = Some(uri.clone());
        }
        if let Some(uri) = &inputs.label_uri {
            self.inputs.label_uri = Some(uri.clone());
        }
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` if any values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.role.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "pipeline.role must be set".to_string(),
            ));
        }

        if self.processing.instance_count == 0 {
            return Err(ConfigError::ValidationFailed(
                "processing.instance_count must be greater than 0".to_string(),
            ));
        }

        if self.processing.instance_type.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "processing.instance_type cannot be empty".to_string(),
            ));
        }

        if self.pipeline.cache.enabled && self.pipeline.cache.expire_after.is_none() {
            return Err(ConfigError::ValidationFailed(
                "pipeline.cache.expire_after is required when caching is enabled".to_string(),
            ));
        }

        Ok(())
    }

    /// Renders the configuration as YAML for logging.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Builder method to set the role.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.pipeline.role = role.into();
        self
    }

    /// Builder method to set the processing instances.
    pub fn with_processing(mut self, instance_type: impl Into<String>, instance_count: u32) -> Self {
        self.processing.instance_type = instance_type.into();
        self.processing.instance_count = instance_count;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheOverrides {
    pub enabled: Option<bool>,
    pub expire_after: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineOverrides {
    pub role: Option<String>,
    pub default_bucket: Option<String>,
    pub cache: CacheOverrides,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingOverrides {
    pub instance_type: Option<String>,
    pub instance_count: Option<u32>,
    pub framework_version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputOverrides {
    pub data_uri: Option<String>,
    pub label_uri: Option<String>,
}

/// One layer of optional configuration values.
///
/// Has the same shape as [`PipelineConfig`], so a YAML defaults file and an
/// override file use the same keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigOverrides {
    pub pipeline: PipelineOverrides,
    pub processing: ProcessingOverrides,
    pub inputs: InputOverrides,
}

impl ConfigOverrides {
    /// Parses a YAML layer.
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Reads a YAML layer from `path`.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Creates a layer from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `MLOPS_PIPELINE_ROLE`: IAM role of the pipeline
    /// - `MLOPS_DEFAULT_BUCKET`: default artifact bucket
    /// - `MLOPS_ENABLE_CACHING`: enable step caching (true/false)
    /// - `MLOPS_CACHE_EXPIRE_AFTER`: cache expiry, e.g. `P30D`
    /// - `MLOPS_INSTANCE_TYPE`: processing instance type
    /// - `MLOPS_INSTANCE_COUNT`: processing instance count
    /// - `MLOPS_FRAMEWORK_VERSION`: processing framework version
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a variable cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates a layer from any key lookup; see [`ConfigOverrides::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut layer = Self::default();

        layer.pipeline.role = lookup("MLOPS_PIPELINE_ROLE");
        layer.pipeline.default_bucket = lookup("MLOPS_DEFAULT_BUCKET");
        if let Some(val) = lookup("MLOPS_ENABLE_CACHING") {
            layer.pipeline.cache.enabled = Some(parse_env_bool(&val, "MLOPS_ENABLE_CACHING")?);
        }
        layer.pipeline.cache.expire_after = lookup("MLOPS_CACHE_EXPIRE_AFTER");

        layer.processing.instance_type = lookup("MLOPS_INSTANCE_TYPE");
        if let Some(val) = lookup("MLOPS_INSTANCE_COUNT") {
            layer.processing.instance_count = Some(parse_env_value(&val, "MLOPS_INSTANCE_COUNT")?);
        }
        layer.processing.framework_version = lookup("MLOPS_FRAMEWORK_VERSION");

        Ok(layer)
    }

    /// Layer that only sets the role.
    pub fn role(role: impl Into<String>) -> Self {
        let mut layer = Self::default();
        layer.pipeline.role = Some(role.into());
        layer
    }
}

/// Parse an environment variable value into a type.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("could not parse '{}'", value),
    })
}

/// Parse an environment variable as a boolean.
fn parse_env_bool(value: &str, key: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected boolean value, got '{}'", value),
        }),
    }
}
