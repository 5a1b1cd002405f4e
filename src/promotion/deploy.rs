//! Deploy or update a serving endpoint with the latest approved model.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::decision::{Decision, PromotionPolicy, UpdateReason};
use crate::error::{InputError, PlatformError, PromotionError};
use crate::metrics::{MetricsManifest, MetricsStore};
use crate::registry::{ModelPackage, ModelRegistry};
use crate::serving::{
    CreateEndpointRequest, CreateModelRequest, DataCaptureConfig, EndpointConfig,
    ServingControlPlane, UpdateEndpointRequest,
};
use crate::utils::{datetime_str, truncate_name, validate_resource_name, KeyValue, RESOURCE_NAME_MAX_LEN};

/// Parameters of a deploy/update run.
#[derive(Debug, Clone)]
pub struct DeployRequest {
    pub model_package_group: String,
    pub endpoint_name: String,
    pub instance_type: String,
    pub instance_count: u32,
    /// Re-asserted on every create and update.
    pub data_capture: DataCaptureConfig,
    pub execution_role: String,
    pub policy: PromotionPolicy,
    /// Tags applied to models created for updates.
    pub model_tags: Vec<KeyValue>,
}

impl DeployRequest {
    pub fn new(
        model_package_group: impl Into<String>,
        endpoint_name: impl Into<String>,
        data_capture: DataCaptureConfig,
        execution_role: impl Into<String>,
    ) -> Self {
        Self {
            model_package_group: model_package_group.into(),
            endpoint_name: endpoint_name.into(),
            instance_type: "ml.m5.large".to_string(),
            instance_count: 1,
            data_capture,
            execution_role: execution_role.into(),
            policy: PromotionPolicy::always_update(),
            model_tags: Vec::new(),
        }
    }

    pub fn with_instances(mut self, instance_type: impl Into<String>, instance_count: u32) -> Self {
        self.instance_type = instance_type.into();
        self.instance_count = instance_count;
        self
    }

    pub fn with_policy(mut self, policy: PromotionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_model_tags(mut self, tags: Vec<KeyValue>) -> Self {
        self.model_tags = tags;
        self
    }

    fn validate(&self) -> Result<(), InputError> {
        validate_resource_name(&self.endpoint_name)?;
        if self.instance_count == 0 {
            return Err(InputError::ZeroInstanceCount);
        }
        if self.data_capture.initial_sampling_percentage > 100 {
            return Err(InputError::SamplingPercentage(
                self.data_capture.initial_sampling_percentage,
            ));
        }
        Ok(())
    }
}

/// What a deploy run did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DeploymentOutcome {
    /// The endpoint did not exist and was created.
    Created {
        endpoint_name: String,
        model_package_arn: String,
        endpoint_config_name: String,
    },
    /// The endpoint now serves the candidate package.
    Updated {
        endpoint_name: String,
        model_package_arn: String,
        model_name: String,
        endpoint_config_name: String,
        decision: Decision,
    },
    /// The candidate did not pass the gate; nothing was changed.
    Skipped {
        endpoint_name: String,
        model_package_arn: String,
        decision: Decision,
    },
}

impl DeploymentOutcome {
    pub fn endpoint_name(&self) -> &str {
        match self {
            DeploymentOutcome::Created { endpoint_name, .. }
            | DeploymentOutcome::Updated { endpoint_name, .. }
            | DeploymentOutcome::Skipped { endpoint_name, .. } => endpoint_name,
        }
    }
}

/// Runs the deploy/update workflow against the three collaborators.
///
/// Every lookup happens before the first mutating call, so a failed fetch
/// leaves the endpoint untouched.
pub struct ModelDeployer {
    registry: Arc<dyn ModelRegistry>,
    metrics: Arc<dyn MetricsStore>,
    serving: Arc<dyn ServingControlPlane>,
}

impl ModelDeployer {
    pub fn new(
        registry: Arc<dyn ModelRegistry>,
        metrics: Arc<dyn MetricsStore>,
        serving: Arc<dyn ServingControlPlane>,
    ) -> Self {
        Self {
            registry,
            metrics,
            serving,
        }
    }

    /// Deploys the latest approved package of the request's group.
    ///
    /// Creates the endpoint when it does not exist. Otherwise decides per the
    /// request's policy and, on `Update`, creates a model from the candidate
    /// and points the endpoint at it.
    pub async fn deploy(&self, request: &DeployRequest) -> Result<DeploymentOutcome, PromotionError> {
        request.validate()?;

        let candidate = self
            .registry
            .latest_approved(&request.model_package_group)
            .await?;
        info!(
            endpoint = %request.endpoint_name,
            package = %candidate.arn,
            "Latest approved model package"
        );

        let endpoints = self.serving.list_endpoints(&request.endpoint_name).await?;
        let exists = endpoints.iter().any(|e| e.name == request.endpoint_name);

        if !exists {
            info!(endpoint = %request.endpoint_name, "Create endpoint");
            let ack = self
                .serving
                .create_endpoint(CreateEndpointRequest {
                    endpoint_name: request.endpoint_name.clone(),
                    model_package_arn: candidate.arn.clone(),
                    instance_type: request.instance_type.clone(),
                    instance_count: request.instance_count,
                    data_capture: request.data_capture.clone(),
                    execution_role: request.execution_role.clone(),
                })
                .await?;
            return Ok(DeploymentOutcome::Created {
                endpoint_name: ack.endpoint_name,
                model_package_arn: candidate.arn,
                endpoint_config_name: ack.endpoint_config_name,
            });
        }

        info!(endpoint = %request.endpoint_name, "Update current endpoint");
        let current = self
            .serving
            .describe_endpoint_config(&request.endpoint_name)
            .await?;
        let decision = self.decide(&request.policy, &candidate, &current).await?;

        match decision {
            Decision::Skip { .. } => {
                info!(
                    endpoint = %request.endpoint_name,
                    decision = %decision,
                    "Current endpoint is not updated because the new model has worse quality than the deployed model"
                );
                Ok(DeploymentOutcome::Skipped {
                    endpoint_name: request.endpoint_name.clone(),
                    model_package_arn: candidate.arn,
                    decision,
                })
            }
            Decision::Update(_) => {
                info!(endpoint = %request.endpoint_name, decision = %decision, "Updating endpoint");
                let model = self
                    .serving
                    .create_model(CreateModelRequest {
                        model_name: model_name_for(&candidate),
                        model_package_arn: candidate.arn.clone(),
                        execution_role: request.execution_role.clone(),
                        tags: request.model_tags.clone(),
                    })
                    .await?;
                let ack = self
                    .serving
                    .update_endpoint(UpdateEndpointRequest {
                        endpoint_name: request.endpoint_name.clone(),
                        model_name: model.name.clone(),
                        instance_type: request.instance_type.clone(),
                        instance_count: request.instance_count,
                        data_capture: request.data_capture.clone(),
                    })
                    .await
                    .map_err(|source| {
                        error!(
                            endpoint = %request.endpoint_name,
                            model = %model.name,
                            error = %source,
                            "Endpoint update failed; created model is not served"
                        );
                        PromotionError::EndpointUpdateFailed {
                            model_name: model.name.clone(),
                            source,
                        }
                    })?;
                Ok(DeploymentOutcome::Updated {
                    endpoint_name: ack.endpoint_name,
                    model_package_arn: candidate.arn,
                    model_name: ack.model_name,
                    endpoint_config_name: ack.endpoint_config_name,
                    decision,
                })
            }
        }
    }

    /// Runs the decision for an existing endpoint.
    ///
    /// Manifests are only fetched when the policy names a metric.
    pub async fn decide(
        &self,
        policy: &PromotionPolicy,
        candidate: &ModelPackage,
        current: &EndpointConfig,
    ) -> Result<Decision, PromotionError> {
        if !policy.needs_manifests() {
            return Ok(Decision::Update(UpdateReason::AlwaysRefresh));
        }

        let candidate_manifest = self.manifest_for(candidate).await?;
        let deployed = self.deployed_package(current).await?;
        let deployed_manifest = self.manifest_for(&deployed).await?;
        debug!(
            candidate = %candidate.arn,
            deployed = %deployed.arn,
            "Comparing model metrics"
        );

        Ok(policy.decide(&candidate_manifest, &deployed_manifest)?)
    }

    /// Follows endpoint config -> deployed model -> model package.
    async fn deployed_package(&self, current: &EndpointConfig) -> Result<ModelPackage, PlatformError> {
        let model = self.serving.describe_model(&current.model_name).await?;
        self.registry
            .describe_model_package(&model.model_package_arn)
            .await
    }

    async fn manifest_for(&self, package: &ModelPackage) -> Result<MetricsManifest, PlatformError> {
        let uri = package
            .metrics_uri
            .as_deref()
            .ok_or_else(|| PlatformError::MetricsManifestMissing(package.arn.clone()))?;
        self.metrics.fetch_manifest(uri).await
    }
}

/// Name of the model created for `package`:
/// `{group}-{version}-{timestamp}-{random}`, with the group shortened to fit.
fn model_name_for(package: &ModelPackage) -> String {
    let group: String = package
        .group_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let group = match group.trim_matches('-') {
        "" => "model",
        trimmed => trimmed,
    };
    let random = Uuid::new_v4().simple().to_string();
    let suffix = format!(
        "-{}-{}-{}",
        package.version,
        datetime_str(&Utc::now()),
        &random[..8]
    );
    let prefix = truncate_name(group, RESOURCE_NAME_MAX_LEN.saturating_sub(suffix.len()));
    format!("{}{}", prefix.trim_end_matches('-'), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ApprovalStatus;

    #[test]
    fn test_model_name_for_sanitizes_group() {
        let package = ModelPackage::new("churn_model", 7, None).with_status(ApprovalStatus::Approved);
        let name = model_name_for(&package);
        assert!(name.starts_with("churn-model-7-"));
        assert!(validate_resource_name(&name).is_ok());
    }

    #[test]
    fn test_model_name_for_long_group() {
        let package = ModelPackage::new("g".repeat(100), 12, None);
        let name = model_name_for(&package);
        assert_eq!(name.len(), RESOURCE_NAME_MAX_LEN);
        assert!(name.starts_with("ggg"));
        assert!(validate_resource_name(&name).is_ok());
    }

    #[test]
    fn test_model_name_for_is_unique_per_call() {
        let package = ModelPackage::new("churn", 3, None);
        let first = model_name_for(&package);
        let second = model_name_for(&package);
        assert_ne!(first, second);
    }

    #[test]
    fn test_model_name_for_group_without_alphanumerics() {
        for group in ["__", "-", "..."] {
            let name = model_name_for(&ModelPackage::new(group, 1, None));
            assert!(name.starts_with("model-1-"), "{}", name);
            assert!(validate_resource_name(&name).is_ok(), "{}", name);
        }
    }

    #[test]
    fn test_request_validation() {
        let capture = DataCaptureConfig::for_destination("s3://bucket/capture");
        let request = DeployRequest::new("churn", "churn-ep", capture.clone(), "role");
        assert!(request.validate().is_ok());

        let bad_name = DeployRequest::new("churn", "churn_ep", capture.clone(), "role");
        assert!(bad_name.validate().is_err());

        let zero = DeployRequest::new("churn", "churn-ep", capture, "role").with_instances("ml.m5.large", 0);
        assert_eq!(zero.validate(), Err(InputError::ZeroInstanceCount));
    }
}
