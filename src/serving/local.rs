//! JSON-file backed serving control plane for local workspaces.
//!
//! Endpoints become `InService` immediately. Every update writes a new
//! endpoint config and repoints the endpoint; old configs are kept.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::info;

use super::control_plane::{
    CreateEndpointRequest, CreateModelRequest, EndpointAck, ServingControlPlane,
    UpdateEndpointRequest,
};
use super::endpoint::{
    DataCaptureConfig, Endpoint, EndpointConfig, ServingModel,
};
use crate::error::{InputError, PlatformError};
use crate::utils::{truncate_name, validate_resource_name, RESOURCE_NAME_MAX_LEN};

/// Name of the serving state JSON file.
const SERVING_FILENAME: &str = "serving.json";

/// Persisted serving resources.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServingState {
    pub models: Vec<ServingModel>,
    pub endpoint_configs: Vec<EndpointConfig>,
    pub endpoints: Vec<Endpoint>,
}

impl ServingState {
    fn model(&self, name: &str) -> Option<&ServingModel> {
        self.models.iter().find(|m| m.name == name)
    }

    fn endpoint(&self, name: &str) -> Option<&Endpoint> {
        self.endpoints.iter().find(|e| e.name == name)
    }

    fn config(&self, name: &str) -> Option<&EndpointConfig> {
        self.endpoint_configs.iter().find(|c| c.name == name)
    }

    fn configs_for(&self, endpoint_name: &str) -> usize {
        self.endpoint_configs
            .iter()
            .filter(|c| c.endpoint_name == endpoint_name)
            .count()
    }

    fn insert_model(&mut self, request: CreateModelRequest) -> Result<ServingModel, PlatformError> {
        validate_resource_name(&request.model_name)?;
        if self.model(&request.model_name).is_some() {
            return Err(PlatformError::ModelExists(request.model_name));
        }
        let model = ServingModel {
            name: request.model_name,
            model_package_arn: request.model_package_arn,
            execution_role: request.execution_role,
            tags: request.tags,
            created_at: Utc::now(),
        };
        self.models.push(model.clone());
        Ok(model)
    }

    fn insert_config(
        &mut self,
        endpoint_name: &str,
        model_name: &str,
        instance_type: &str,
        instance_count: u32,
        data_capture: &DataCaptureConfig,
    ) -> Result<String, PlatformError> {
        if instance_count == 0 {
            return Err(InputError::ZeroInstanceCount.into());
        }
        let name = format!("{}-config-{}", endpoint_name, self.configs_for(endpoint_name) + 1);
        self.endpoint_configs.push(EndpointConfig {
            name: name.clone(),
            endpoint_name: endpoint_name.to_string(),
            model_name: model_name.to_string(),
            instance_type: instance_type.to_string(),
            instance_count,
            data_capture: Some(data_capture.clone()),
            created_at: Utc::now(),
        });
        Ok(name)
    }
}

/// [`ServingControlPlane`] persisting its resources to `serving.json`.
pub struct LocalControlPlane {
    state_path: PathBuf,
    state: Mutex<ServingState>,
}

impl LocalControlPlane {
    /// Open (or create) the control plane stored under `state_dir`.
    pub fn open(state_dir: PathBuf) -> Result<Self, PlatformError> {
        let state_path = state_dir.join(SERVING_FILENAME);
        let state = if state_path.exists() {
            serde_json::from_str(&fs::read_to_string(&state_path)?)?
        } else {
            ServingState::default()
        };
        Ok(Self {
            state_path,
            state: Mutex::new(state),
        })
    }

    fn save(&self, state: &ServingState) -> Result<(), PlatformError> {
        if let Some(parent) = self.state_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.state_path, serde_json::to_string_pretty(state)?)?;
        Ok(())
    }

    /// Copy of the current state.
    pub async fn snapshot(&self) -> ServingState {
        self.state.lock().await.clone()
    }
}

#[async_trait]
impl ServingControlPlane for LocalControlPlane {
    async fn list_endpoints(&self, name_filter: &str) -> Result<Vec<Endpoint>, PlatformError> {
        let state = self.state.lock().await;
        Ok(state
            .endpoints
            .iter()
            .filter(|e| e.name.contains(name_filter))
            .cloned()
            .collect())
    }

    async fn describe_endpoint_config(
        &self,
        endpoint_name: &str,
    ) -> Result<EndpointConfig, PlatformError> {
        let state = self.state.lock().await;
        let endpoint = state
            .endpoint(endpoint_name)
            .ok_or_else(|| PlatformError::EndpointConfigNotFound(endpoint_name.to_string()))?;
        state
            .config(&endpoint.config_name)
            .cloned()
            .ok_or_else(|| PlatformError::EndpointConfigNotFound(endpoint_name.to_string()))
    }

    async fn describe_model(&self, model_name: &str) -> Result<ServingModel, PlatformError> {
        let state = self.state.lock().await;
        state
            .model(model_name)
            .cloned()
            .ok_or_else(|| PlatformError::ModelNotFound(model_name.to_string()))
    }

    async fn create_model(
        &self,
        request: CreateModelRequest,
    ) -> Result<ServingModel, PlatformError> {
        let mut state = self.state.lock().await;
        let model = state.insert_model(request)?;
        self.save(&state)?;
        info!(model = %model.name, package = %model.model_package_arn, "Created model");
        Ok(model)
    }

    async fn update_endpoint(
        &self,
        request: UpdateEndpointRequest,
    ) -> Result<EndpointAck, PlatformError> {
        let mut state = self.state.lock().await;
        if state.endpoint(&request.endpoint_name).is_none() {
            return Err(PlatformError::EndpointNotFound(request.endpoint_name));
        }
        if state.model(&request.model_name).is_none() {
            return Err(PlatformError::ModelNotFound(request.model_name));
        }

        let config_name = state.insert_config(
            &request.endpoint_name,
            &request.model_name,
            &request.instance_type,
            request.instance_count,
            &request.data_capture,
        )?;

        let now = Utc::now();
        if let Some(endpoint) = state
            .endpoints
            .iter_mut()
            .find(|e| e.name == request.endpoint_name)
        {
            endpoint.config_name = config_name.clone();
            endpoint.data_capture = Some(request.data_capture.clone());
            endpoint.updated_at = now;
        }
        self.save(&state)?;

        info!(
            endpoint = %request.endpoint_name,
            config = %config_name,
            model = %request.model_name,
            "Updated endpoint"
        );
        Ok(EndpointAck {
            endpoint_name: request.endpoint_name,
            endpoint_config_name: config_name,
            model_name: request.model_name,
        })
    }

    async fn create_endpoint(
        &self,
        request: CreateEndpointRequest,
    ) -> Result<EndpointAck, PlatformError> {
        validate_resource_name(&request.endpoint_name)?;
        let mut state = self.state.lock().await;
        if state.endpoint(&request.endpoint_name).is_some() {
            return Err(PlatformError::EndpointExists(request.endpoint_name));
        }

        if request.instance_count == 0 {
            return Err(InputError::ZeroInstanceCount.into());
        }

        let suffix = format!("-model-{}", state.models.len() + 1);
        let model_name = format!(
            "{}{}",
            truncate_name(&request.endpoint_name, RESOURCE_NAME_MAX_LEN - suffix.len()),
            suffix
        );
        state.insert_model(CreateModelRequest {
            model_name: model_name.clone(),
            model_package_arn: request.model_package_arn.clone(),
            execution_role: request.execution_role.clone(),
            tags: Vec::new(),
        })?;
        let config_name = state.insert_config(
            &request.endpoint_name,
            &model_name,
            &request.instance_type,
            request.instance_count,
            &request.data_capture,
        )?;

        let now = Utc::now();
        state.endpoints.push(Endpoint {
            name: request.endpoint_name.clone(),
            config_name: config_name.clone(),
            data_capture: Some(request.data_capture),
            created_at: now,
            updated_at: now,
        });
        self.save(&state)?;

        info!(
            endpoint = %request.endpoint_name,
            package = %request.model_package_arn,
            "Created endpoint"
        );
        Ok(EndpointAck {
            endpoint_name: request.endpoint_name,
            endpoint_config_name: config_name,
            model_name,
        })
    }
}
