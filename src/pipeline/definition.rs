//! Serializable pipeline definitions.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::config::PipelineConfig;

/// Schema version written into every definition.
pub const DEFINITION_VERSION: &str = "2020-12-01";

/// Container path under which processing inputs and outputs are mounted.
pub const PROCESSING_CONTAINER_DIR: &str = "/opt/ml/processing";

/// Declared pipeline parameter, overridable per execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PipelineParameter {
    pub name: String,
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl PipelineParameter {
    /// String parameter with a default.
    pub fn string(name: impl Into<String>, default_value: Option<String>) -> Self {
        Self {
            name: name.into(),
            kind: "String".to_string(),
            default_value,
        }
    }
}

/// Step result caching as written into a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StepCacheConfig {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_after: Option<String>,
}

/// A single pipeline step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PipelineStep {
    pub name: String,
    #[serde(rename = "Type")]
    pub kind: StepKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    pub arguments: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_config: Option<StepCacheConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepKind {
    Processing,
    Training,
    RegisterModel,
}

/// Pipeline definition as stored by the pipeline service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PipelineDefinition {
    pub version: String,
    #[serde(skip)]
    pub name: String,
    pub parameters: Vec<PipelineParameter>,
    pub steps: Vec<PipelineStep>,
}

impl PipelineDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            version: DEFINITION_VERSION.to_string(),
            name: name.into(),
            parameters: Vec::new(),
            steps: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, parameter: PipelineParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_step(mut self, step: PipelineStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn step(&self, name: &str) -> Option<&PipelineStep> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// Compact JSON document.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Indented JSON document, for logs.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// The cache settings of `config` as a step cache config, if enabled.
pub fn step_cache(config: &PipelineConfig) -> Option<StepCacheConfig> {
    let cache = &config.pipeline.cache;
    cache.enabled.then(|| StepCacheConfig {
        enabled: true,
        expire_after: cache.expire_after.clone(),
    })
}

/// Processing step arguments for the configured processing cluster.
pub fn processing_arguments(
    config: &PipelineConfig,
    inputs: &[(&str, Value)],
    outputs: &[&str],
    job_arguments: &[String],
) -> Value {
    let inputs: Vec<Value> = inputs
        .iter()
        .map(|(name, source)| {
            json!({
                "InputName": name,
                "S3Input": {
                    "S3Uri": source,
                    "LocalPath": format!("{}/{}", PROCESSING_CONTAINER_DIR, name),
                },
            })
        })
        .collect();
    let outputs: Vec<Value> = outputs
        .iter()
        .map(|name| {
            json!({
                "OutputName": name,
                "S3Output": {
                    "LocalPath": format!("{}/{}", PROCESSING_CONTAINER_DIR, name),
                },
            })
        })
        .collect();

    json!({
        "ProcessingResources": {
            "ClusterConfig": {
                "InstanceType": config.processing.instance_type,
                "InstanceCount": config.processing.instance_count,
            },
        },
        "AppSpecification": {
            "FrameworkVersion": config.processing.framework_version,
            "ContainerArguments": job_arguments,
        },
        "RoleArn": config.pipeline.role,
        "ProcessingInputs": inputs,
        "ProcessingOutputConfig": { "Outputs": outputs },
    })
}
