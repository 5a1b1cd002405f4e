//! Serving resources: endpoints, their configurations and deployable models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::InputError;
use crate::utils::KeyValue;

/// Default fraction of requests captured, in percent.
pub const DEFAULT_SAMPLING_PERCENTAGE: u32 = 100;

/// Content type captured by default.
pub const DEFAULT_CSV_CONTENT_TYPE: &str = "text/csv";

/// Which side of an inference call is captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureMode {
    Input,
    Output,
}

impl FromStr for CaptureMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "input" => Ok(CaptureMode::Input),
            "output" => Ok(CaptureMode::Output),
            other => Err(format!(
                "Unknown capture mode '{}': expected 'input' or 'output'",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CaptureOption {
    pub capture_mode: CaptureMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CaptureContentTypeHeader {
    pub csv_content_types: Vec<String>,
}

/// Data capture settings of an endpoint.
///
/// The control plane does not carry these over on update, so every update
/// has to send them again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataCaptureConfig {
    pub enable_capture: bool,
    pub initial_sampling_percentage: u32,
    #[serde(rename = "DestinationS3Uri")]
    pub destination_uri: String,
    pub capture_options: Vec<CaptureOption>,
    pub capture_content_type_header: CaptureContentTypeHeader,
}

impl DataCaptureConfig {
    /// Capture of both inputs and outputs, all requests, CSV payloads.
    pub fn for_destination(destination_uri: impl Into<String>) -> Self {
        Self {
            enable_capture: true,
            initial_sampling_percentage: DEFAULT_SAMPLING_PERCENTAGE,
            destination_uri: destination_uri.into(),
            capture_options: vec![
                CaptureOption {
                    capture_mode: CaptureMode::Input,
                },
                CaptureOption {
                    capture_mode: CaptureMode::Output,
                },
            ],
            capture_content_type_header: CaptureContentTypeHeader {
                csv_content_types: vec![DEFAULT_CSV_CONTENT_TYPE.to_string()],
            },
        }
    }

    /// Sets the sampling percentage; must be within 0..=100.
    pub fn with_sampling_percentage(mut self, percentage: u32) -> Result<Self, InputError> {
        if percentage > 100 {
            return Err(InputError::SamplingPercentage(percentage));
        }
        self.initial_sampling_percentage = percentage;
        Ok(self)
    }

    /// Restricts capture to the given modes.
    pub fn with_capture_modes(mut self, modes: &[CaptureMode]) -> Self {
        self.capture_options = modes
            .iter()
            .map(|&capture_mode| CaptureOption { capture_mode })
            .collect();
        self
    }

    /// Disables capture while keeping the rest of the settings.
    pub fn disabled(mut self) -> Self {
        self.enable_capture = false;
        self
    }
}

/// A named live serving resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub name: String,
    /// Name of the endpoint config currently in effect.
    pub config_name: String,
    pub data_capture: Option<DataCaptureConfig>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Snapshot of what an endpoint serves. Replaced, never edited, on update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub name: String,
    pub endpoint_name: String,
    /// Name of the deployed [`ServingModel`].
    pub model_name: String,
    pub instance_type: String,
    pub instance_count: u32,
    pub data_capture: Option<DataCaptureConfig>,
    pub created_at: DateTime<Utc>,
}

/// A deployable model created from a model package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServingModel {
    pub name: String,
    pub model_package_arn: String,
    pub execution_role: String,
    #[serde(default)]
    pub tags: Vec<KeyValue>,
    pub created_at: DateTime<Utc>,
}
