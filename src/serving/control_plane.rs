//! The serving control plane collaborator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::endpoint::{DataCaptureConfig, Endpoint, EndpointConfig, ServingModel};
use crate::error::PlatformError;
use crate::utils::KeyValue;

/// Request to create a deployable model from a model package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateModelRequest {
    pub model_name: String,
    pub model_package_arn: String,
    pub execution_role: String,
    pub tags: Vec<KeyValue>,
}

/// Request to point an existing endpoint at another model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateEndpointRequest {
    pub endpoint_name: String,
    pub model_name: String,
    pub instance_type: String,
    pub instance_count: u32,
    pub data_capture: DataCaptureConfig,
}

/// Request to deploy a model package behind a new endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateEndpointRequest {
    pub endpoint_name: String,
    pub model_package_arn: String,
    pub instance_type: String,
    pub instance_count: u32,
    pub data_capture: DataCaptureConfig,
    pub execution_role: String,
}

/// Acknowledgement of an endpoint create or update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointAck {
    pub endpoint_name: String,
    pub endpoint_config_name: String,
    pub model_name: String,
}

/// Control plane managing named serving endpoints.
#[async_trait]
pub trait ServingControlPlane: Send + Sync {
    /// Endpoints whose name contains `name_filter`.
    async fn list_endpoints(&self, name_filter: &str) -> Result<Vec<Endpoint>, PlatformError>;

    /// Configuration currently in effect for `endpoint_name`.
    async fn describe_endpoint_config(
        &self,
        endpoint_name: &str,
    ) -> Result<EndpointConfig, PlatformError>;

    /// Deployable model named `model_name`.
    async fn describe_model(&self, model_name: &str) -> Result<ServingModel, PlatformError>;

    async fn create_model(
        &self,
        request: CreateModelRequest,
    ) -> Result<ServingModel, PlatformError>;

    /// Supersedes the endpoint's config with one serving `request.model_name`.
    async fn update_endpoint(
        &self,
        request: UpdateEndpointRequest,
    ) -> Result<EndpointAck, PlatformError>;

    async fn create_endpoint(
        &self,
        request: CreateEndpointRequest,
    ) -> Result<EndpointAck, PlatformError>;
}
