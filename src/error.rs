//! Error types for mlops-utilities operations.
//!
//! Defines error types for the major subsystems:
//! - Metric path resolution inside evaluation manifests
//! - Collaborator lookups (model registry, metrics store, serving control plane)
//! - Input shape validation for the conversion helpers
//! - The endpoint promotion workflow
//! - Pipeline definition and execution

use thiserror::Error;

use crate::pipeline::ConfigError;

/// Errors raised while resolving a metric path inside a metrics manifest.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetricPathError {
    #[error("Metric path is empty")]
    EmptyPath,

    #[error("Metric path '{0}' contains an empty segment")]
    EmptySegment(String),

    #[error("Key '{key}' not found at '{path}'")]
    MissingKey { key: String, path: String },

    #[error("Value at '{path}' is not a mapping, cannot descend into '{key}'")]
    NotAMapping { key: String, path: String },

    #[error("Value at '{path}' is not numeric")]
    NotNumeric { path: String },
}

/// Errors returned by the model registry, metrics store, serving control
/// plane and pipeline service.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("No approved model package found for model package group: {0}")]
    NoApprovedPackage(String),

    #[error("Model package '{0}' not found")]
    ModelPackageNotFound(String),

    #[error("Model package '{0}' has no metrics manifest attached")]
    MetricsManifestMissing(String),

    #[error("Metrics manifest '{0}' not found")]
    ManifestNotFound(String),

    #[error("Endpoint '{0}' not found")]
    EndpointNotFound(String),

    #[error("Endpoint config for '{0}' not found")]
    EndpointConfigNotFound(String),

    #[error("Endpoint '{0}' already exists")]
    EndpointExists(String),

    #[error("Model '{0}' not found")]
    ModelNotFound(String),

    #[error("Model '{0}' already exists")]
    ModelExists(String),

    #[error("Pipeline '{0}' not found")]
    PipelineNotFound(String),

    #[error("Invalid approval transition for '{arn}': already {status}")]
    InvalidApprovalTransition { arn: String, status: String },

    #[error("Invalid input: {0}")]
    Input(#[from] InputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PlatformError {
    /// Whether this error reports an absent resource.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            PlatformError::NoApprovedPackage(_)
                | PlatformError::ModelPackageNotFound(_)
                | PlatformError::MetricsManifestMissing(_)
                | PlatformError::ManifestNotFound(_)
                | PlatformError::EndpointNotFound(_)
                | PlatformError::EndpointConfigNotFound(_)
                | PlatformError::ModelNotFound(_)
                | PlatformError::PipelineNotFound(_)
        )
    }
}

/// Errors raised for inputs of the wrong shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Expected a mapping, got nothing")]
    MissingMapping,

    #[error("Sampling percentage must be between 0 and 100, got {0}")]
    SamplingPercentage(u32),

    #[error("Instance count must be greater than 0")]
    ZeroInstanceCount,

    #[error("Invalid storage URI '{0}'")]
    InvalidUri(String),

    #[error("Invalid KEY=VALUE pair '{0}'")]
    InvalidPair(String),

    #[error("Invalid resource name '{name}': {reason}")]
    InvalidName { name: String, reason: String },
}

/// Errors that abort an endpoint deploy/update workflow.
#[derive(Debug, Error)]
pub enum PromotionError {
    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("Metric path error: {0}")]
    MetricPath(#[from] MetricPathError),

    #[error("Invalid input: {0}")]
    Input(#[from] InputError),

    /// The model was created but the endpoint could not be pointed at it.
    #[error("Endpoint update failed; model '{model_name}' was created but is not served: {source}")]
    EndpointUpdateFailed {
        model_name: String,
        #[source]
        source: PlatformError,
    },
}

impl PromotionError {
    /// Whether the workflow aborted because a resource was absent.
    pub fn is_not_found(&self) -> bool {
        match self {
            PromotionError::Platform(e) => e.is_not_found(),
            PromotionError::EndpointUpdateFailed { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}

/// Errors raised by pipeline upsert and run operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Unknown pipeline kind '{kind}' (available: {available})")]
    UnknownKind { kind: String, available: String },

    #[error("Pipeline kind '{0}' is already registered")]
    DuplicateKind(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("Invalid input: {0}")]
    Input(#[from] InputError),

    #[error("Failed to serialize pipeline definition: {0}")]
    Serialization(#[from] serde_json::Error),
}
