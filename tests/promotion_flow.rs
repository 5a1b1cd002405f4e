//! End-to-end promotion runs against a local workspace.

use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::{tempdir, TempDir};

use mlops_utilities::metrics::{MetricPath, MetricsManifest};
use mlops_utilities::promotion::{DeployRequest, DeploymentOutcome, ModelDeployer, PromotionPolicy};
use mlops_utilities::registry::{ApprovalStatus, ModelPackage};
use mlops_utilities::serving::{
    CreateEndpointRequest, CreateModelRequest, DataCaptureConfig, Endpoint, EndpointAck,
    EndpointConfig, ServingControlPlane, ServingModel, UpdateEndpointRequest,
};
use mlops_utilities::workspace::Workspace;
use mlops_utilities::{PlatformError, PromotionError};

const GROUP: &str = "abalone";
const ENDPOINT: &str = "abalone-endpoint";
const METRIC: &str = "regression_metrics/r2/value";

/// Control plane that records every call before delegating.
struct RecordingControlPlane {
    inner: Arc<dyn ServingControlPlane>,
    calls: Mutex<Vec<&'static str>>,
    fail_updates: AtomicBool,
}

impl RecordingControlPlane {
    fn new(inner: Arc<dyn ServingControlPlane>) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
            fail_updates: AtomicBool::new(false),
        }
    }

    /// Makes every later `update_endpoint` call fail.
    fn fail_updates(&self) {
        self.fail_updates.store(true, Ordering::SeqCst);
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ServingControlPlane for RecordingControlPlane {
    async fn list_endpoints(&self, name_filter: &str) -> Result<Vec<Endpoint>, PlatformError> {
        self.record("list_endpoints");
        self.inner.list_endpoints(name_filter).await
    }

    async fn describe_endpoint_config(
        &self,
        endpoint_name: &str,
    ) -> Result<EndpointConfig, PlatformError> {
        self.record("describe_endpoint_config");
        self.inner.describe_endpoint_config(endpoint_name).await
    }

    async fn describe_model(&self, model_name: &str) -> Result<ServingModel, PlatformError> {
        self.record("describe_model");
        self.inner.describe_model(model_name).await
    }

    async fn create_model(&self, request: CreateModelRequest) -> Result<ServingModel, PlatformError> {
        self.record("create_model");
        self.inner.create_model(request).await
    }

    async fn update_endpoint(
        &self,
        request: UpdateEndpointRequest,
    ) -> Result<EndpointAck, PlatformError> {
        self.record("update_endpoint");
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(PlatformError::EndpointNotFound(request.endpoint_name));
        }
        self.inner.update_endpoint(request).await
    }

    async fn create_endpoint(
        &self,
        request: CreateEndpointRequest,
    ) -> Result<EndpointAck, PlatformError> {
        self.record("create_endpoint");
        self.inner.create_endpoint(request).await
    }
}

struct Harness {
    _dir: TempDir,
    workspace: Workspace,
    serving: Arc<RecordingControlPlane>,
    deployer: ModelDeployer,
}

impl Harness {
    fn new() -> Self {
        let dir = tempdir().unwrap();
        let workspace = Workspace::open(dir.path()).unwrap();
        let serving = Arc::new(RecordingControlPlane::new(workspace.serving.clone()));
        let deployer = ModelDeployer::new(
            workspace.registry.clone(),
            workspace.metrics.clone(),
            serving.clone(),
        );
        Self {
            _dir: dir,
            workspace,
            serving,
            deployer,
        }
    }

    /// Registers an approved package whose manifest reports `r2`.
    async fn publish(&self, tag: &str, r2: f64) -> ModelPackage {
        let uri = format!("s3://models/{}/{}/evaluation.json", GROUP, tag);
        let manifest = MetricsManifest::new(json!({
            "regression_metrics": {"r2": {"value": r2, "standard_deviation": "NaN"}}
        }));
        self.workspace.metrics.put_manifest(&uri, &manifest).await.unwrap();
        self.workspace
            .registry
            .register(GROUP, Some(uri), ApprovalStatus::Approved)
            .await
            .unwrap()
    }

    fn request(&self, gated: bool) -> DeployRequest {
        let request = DeployRequest::new(
            GROUP,
            ENDPOINT,
            DataCaptureConfig::for_destination("s3://capture/abalone"),
            "arn:aws:iam::123456789000:role/Execution",
        );
        if gated {
            request.with_policy(PromotionPolicy::gated_on(MetricPath::parse(METRIC).unwrap()))
        } else {
            request
        }
    }

    async fn deployed_package_arn(&self) -> String {
        let serving = &self.workspace.serving;
        let config = serving.describe_endpoint_config(ENDPOINT).await.unwrap();
        serving
            .describe_model(&config.model_name)
            .await
            .unwrap()
            .model_package_arn
    }
}

#[tokio::test]
async fn test_first_deploy_creates_endpoint() {
    let h = Harness::new();
    let v1 = h.publish("v1", 0.8).await;

    let outcome = h.deployer.deploy(&h.request(true)).await.unwrap();
    assert!(matches!(outcome, DeploymentOutcome::Created { .. }));
    assert_eq!(h.deployed_package_arn().await, v1.arn);
    assert_eq!(h.serving.calls(), vec!["list_endpoints", "create_endpoint"]);

    let config = h.workspace.serving.describe_endpoint_config(ENDPOINT).await.unwrap();
    assert_eq!(
        config.data_capture,
        Some(DataCaptureConfig::for_destination("s3://capture/abalone"))
    );
}

#[tokio::test]
async fn test_better_candidate_updates_endpoint() {
    let h = Harness::new();
    h.publish("v1", 0.8).await;
    h.deployer.deploy(&h.request(true)).await.unwrap();
    let v2 = h.publish("v2", 0.9).await;

    let outcome = h.deployer.deploy(&h.request(true)).await.unwrap();
    match &outcome {
        DeploymentOutcome::Updated {
            model_package_arn,
            decision,
            ..
        } => {
            assert_eq!(model_package_arn, &v2.arn);
            let comparison = decision.comparison().unwrap();
            assert_eq!(comparison.new_value, 0.9);
            assert_eq!(comparison.old_value, 0.8);
        }
        other => panic!("expected update, got {:?}", other),
    }
    assert_eq!(h.deployed_package_arn().await, v2.arn);

    let state = h.workspace.serving.snapshot().await;
    assert_eq!(state.endpoint_configs.len(), 2);
    let current = h.workspace.serving.describe_endpoint_config(ENDPOINT).await.unwrap();
    assert_eq!(
        current.data_capture,
        Some(DataCaptureConfig::for_destination("s3://capture/abalone"))
    );
}

#[tokio::test]
async fn test_equal_metric_updates_endpoint() {
    let h = Harness::new();
    h.publish("v1", 0.8).await;
    h.deployer.deploy(&h.request(true)).await.unwrap();
    let v2 = h.publish("v2", 0.8).await;

    let outcome = h.deployer.deploy(&h.request(true)).await.unwrap();
    assert!(matches!(outcome, DeploymentOutcome::Updated { .. }));
    assert_eq!(h.deployed_package_arn().await, v2.arn);
}

#[tokio::test]
async fn test_worse_candidate_is_skipped() {
    let h = Harness::new();
    let v1 = h.publish("v1", 0.8).await;
    h.deployer.deploy(&h.request(true)).await.unwrap();
    h.publish("v2", 0.5).await;

    let outcome = h.deployer.deploy(&h.request(true)).await.unwrap();
    match &outcome {
        DeploymentOutcome::Skipped { decision, .. } => assert!(!decision.is_update()),
        other => panic!("expected skip, got {:?}", other),
    }
    assert_eq!(h.deployed_package_arn().await, v1.arn);
    assert_eq!(h.workspace.serving.snapshot().await.endpoint_configs.len(), 1);
    assert_eq!(
        h.serving.calls(),
        vec![
            "list_endpoints",
            "create_endpoint",
            "list_endpoints",
            "describe_endpoint_config",
            "describe_model",
        ]
    );
}

#[tokio::test]
async fn test_no_metric_always_updates() {
    let h = Harness::new();
    h.publish("v1", 0.8).await;
    h.deployer.deploy(&h.request(false)).await.unwrap();

    // Worse metric and no manifest at all: both still update.
    let v2 = h.publish("v2", 0.1).await;
    let outcome = h.deployer.deploy(&h.request(false)).await.unwrap();
    assert!(matches!(outcome, DeploymentOutcome::Updated { .. }));
    assert_eq!(h.deployed_package_arn().await, v2.arn);

    let v3 = h
        .workspace
        .registry
        .register(GROUP, None, ApprovalStatus::Approved)
        .await
        .unwrap();
    h.deployer.deploy(&h.request(false)).await.unwrap();
    assert_eq!(h.deployed_package_arn().await, v3.arn);
}

#[tokio::test]
async fn test_no_approved_package_never_contacts_control_plane() {
    let h = Harness::new();
    h.workspace
        .registry
        .register(GROUP, None, ApprovalStatus::PendingManualApproval)
        .await
        .unwrap();

    let err = h.deployer.deploy(&h.request(true)).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(
        err,
        PromotionError::Platform(PlatformError::NoApprovedPackage(ref g)) if g == GROUP
    ));
    assert!(h.serving.calls().is_empty());
}

#[tokio::test]
async fn test_missing_manifest_aborts_without_mutation() {
    let h = Harness::new();
    let v1 = h.publish("v1", 0.8).await;
    h.deployer.deploy(&h.request(true)).await.unwrap();
    h.workspace
        .registry
        .register(
            GROUP,
            Some("s3://models/abalone/missing/evaluation.json".to_string()),
            ApprovalStatus::Approved,
        )
        .await
        .unwrap();
    let calls_before = h.serving.calls().len();

    let err = h.deployer.deploy(&h.request(true)).await.unwrap_err();
    assert!(matches!(
        err,
        PromotionError::Platform(PlatformError::ManifestNotFound(_))
    ));
    let new_calls = &h.serving.calls()[calls_before..];
    assert!(!new_calls.contains(&"create_model"));
    assert!(!new_calls.contains(&"update_endpoint"));
    assert_eq!(h.deployed_package_arn().await, v1.arn);
}

#[tokio::test]
async fn test_missing_metric_key_aborts() {
    let h = Harness::new();
    h.publish("v1", 0.8).await;
    h.deployer.deploy(&h.request(true)).await.unwrap();
    h.publish("v2", 0.9).await;

    let request = h.request(false).with_policy(PromotionPolicy::gated_on(
        MetricPath::parse("regression_metrics/mse/value").unwrap(),
    ));
    let err = h.deployer.deploy(&request).await.unwrap_err();
    assert!(matches!(err, PromotionError::MetricPath(_)));
}

#[tokio::test]
async fn test_rejected_latest_falls_back_to_previous_approved() {
    let h = Harness::new();
    let v1 = h.publish("v1", 0.8).await;
    let v2 = h.publish("v2", 0.9).await;
    h.workspace
        .registry
        .update_approval_status(&v2.arn, ApprovalStatus::Rejected)
        .await
        .unwrap();

    h.deployer.deploy(&h.request(true)).await.unwrap();
    assert_eq!(h.deployed_package_arn().await, v1.arn);
    assert_eq!(h.serving.calls(), vec!["list_endpoints", "create_endpoint"]);
}

#[tokio::test]
async fn test_repeated_deploy_of_same_package_updates() {
    let h = Harness::new();
    let v1 = h.publish("v1", 0.8).await;
    h.deployer.deploy(&h.request(true)).await.unwrap();

    let mut model_names = Vec::new();
    for _ in 0..3 {
        match h.deployer.deploy(&h.request(true)).await.unwrap() {
            DeploymentOutcome::Updated { model_name, .. } => model_names.push(model_name),
            other => panic!("expected update, got {:?}", other),
        }
    }
    model_names.sort();
    model_names.dedup();
    assert_eq!(model_names.len(), 3);
    assert_eq!(h.deployed_package_arn().await, v1.arn);
}

#[tokio::test]
async fn test_failed_endpoint_update_names_created_model() {
    let h = Harness::new();
    let v1 = h.publish("v1", 0.8).await;
    h.deployer.deploy(&h.request(true)).await.unwrap();
    let v2 = h.publish("v2", 0.9).await;
    h.serving.fail_updates();

    let err = h.deployer.deploy(&h.request(true)).await.unwrap_err();
    let model_name = match err {
        PromotionError::EndpointUpdateFailed {
            model_name,
            source: PlatformError::EndpointNotFound(_),
        } => model_name,
        other => panic!("expected endpoint update failure, got {:?}", other),
    };

    let orphan = h.workspace.serving.describe_model(&model_name).await.unwrap();
    assert_eq!(orphan.model_package_arn, v2.arn);
    assert_eq!(h.deployed_package_arn().await, v1.arn);
}
