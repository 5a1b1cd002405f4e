//! Local workspace: every collaborator backed by files under one directory.
//!
//! # Layout
//!
//! ```text
//! <root>/
//!   model_packages.json   model registry
//!   serving.json          models, endpoint configs, endpoints
//!   pipelines.json        pipelines and executions
//!   objects/<bucket>/...  storage for s3:// URIs (metrics manifests)
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::error::PlatformError;
use crate::metrics::LocalMetricsStore;
use crate::pipeline::LocalPipelineService;
use crate::promotion::ModelDeployer;
use crate::registry::LocalModelRegistry;
use crate::serving::LocalControlPlane;

/// Directory under the workspace root that backs storage URIs.
pub const OBJECTS_DIR: &str = "objects";

/// Default workspace directory.
pub const DEFAULT_WORKSPACE_DIR: &str = "./.mlops";

/// Opened local collaborators sharing one root directory.
pub struct Workspace {
    pub registry: Arc<LocalModelRegistry>,
    pub serving: Arc<LocalControlPlane>,
    pub pipelines: Arc<LocalPipelineService>,
    pub metrics: Arc<LocalMetricsStore>,
}

impl Workspace {
    /// Open (or create) the workspace rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, PlatformError> {
        let root = root.into();
        debug!(root = %root.display(), "Opening workspace");
        Ok(Self {
            registry: Arc::new(LocalModelRegistry::open(root.clone())?),
            serving: Arc::new(LocalControlPlane::open(root.clone())?),
            pipelines: Arc::new(LocalPipelineService::open(root.clone())?),
            metrics: Arc::new(LocalMetricsStore::new(root.join(OBJECTS_DIR))),
        })
    }

    /// Deployer wired to this workspace's registry, storage and control plane.
    pub fn deployer(&self) -> ModelDeployer {
        ModelDeployer::new(
            self.registry.clone(),
            self.metrics.clone(),
            self.serving.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricsManifest;
    use crate::promotion::{DeployRequest, DeploymentOutcome};
    use crate::registry::ApprovalStatus;
    use crate::serving::DataCaptureConfig;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_workspace_deploys_registered_package() {
        let dir = tempdir().unwrap();
        let workspace = Workspace::open(dir.path()).unwrap();

        let uri = "s3://models/churn/1/evaluation.json";
        workspace
            .metrics
            .put_manifest(uri, &MetricsManifest::new(json!({"auc": 0.9})))
            .await
            .unwrap();
        assert!(dir.path().join("objects/models/churn/1/evaluation.json").exists());

        workspace
            .registry
            .register("churn", Some(uri.to_string()), ApprovalStatus::Approved)
            .await
            .unwrap();

        let request = DeployRequest::new(
            "churn",
            "churn-endpoint",
            DataCaptureConfig::for_destination("s3://capture/churn"),
            "arn:role",
        );
        let outcome = workspace.deployer().deploy(&request).await.unwrap();
        assert!(matches!(outcome, DeploymentOutcome::Created { .. }));
        assert!(dir.path().join("serving.json").exists());
        assert!(dir.path().join("model_packages.json").exists());
    }
}
