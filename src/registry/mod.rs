//! Model registry module.
//!
//! This module provides:
//! - The `ModelRegistry` collaborator trait consumed by the promotion workflow
//! - Model package records and their approval lifecycle
//! - A JSON-file backed registry for local workspaces

pub mod lifecycle;
pub mod package;

pub use lifecycle::ApprovalLifecycle;
pub use package::{package_arn, ApprovalStatus, ModelPackage, LOCAL_PACKAGE_ARN_PREFIX};

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::info;

use crate::error::PlatformError;

/// Name of the registry JSON file.
const REGISTRY_FILENAME: &str = "model_packages.json";

/// Lookups the promotion workflow needs from a model registry.
#[async_trait]
pub trait ModelRegistry: Send + Sync {
    /// Most recently created approved package in `group_name`.
    ///
    /// Fails with [`PlatformError::NoApprovedPackage`] when the group has no
    /// approved package.
    async fn latest_approved(&self, group_name: &str) -> Result<ModelPackage, PlatformError>;

    /// Package with the given ARN.
    async fn describe_model_package(&self, arn: &str) -> Result<ModelPackage, PlatformError>;
}

/// In-memory model package table with JSON persistence.
pub struct ModelPackageStore {
    /// Path to the registry directory.
    registry_path: PathBuf,
    /// Packages keyed by ARN.
    packages: HashMap<String, ModelPackage>,
}

impl ModelPackageStore {
    /// Create an empty store rooted at `registry_path`.
    pub fn new(registry_path: PathBuf) -> Self {
        Self {
            registry_path,
            packages: HashMap::new(),
        }
    }

    fn registry_file_path(&self) -> PathBuf {
        self.registry_path.join(REGISTRY_FILENAME)
    }

    /// Load the store from disk.
    ///
    /// If the registry file doesn't exist, starts empty.
    pub fn load(&mut self) -> Result<(), PlatformError> {
        let file_path = self.registry_file_path();

        if !file_path.exists() {
            self.packages = HashMap::new();
            return Ok(());
        }

        let contents = fs::read_to_string(&file_path)?;
        let packages: Vec<ModelPackage> = serde_json::from_str(&contents)?;

        self.packages = packages.into_iter().map(|p| (p.arn.clone(), p)).collect();

        Ok(())
    }

    /// Save the store to disk, creating the directory if needed.
    pub fn save(&self) -> Result<(), PlatformError> {
        if !self.registry_path.exists() {
            fs::create_dir_all(&self.registry_path)?;
        }

        let mut packages: Vec<&ModelPackage> = self.packages.values().collect();
        packages.sort_by(|a, b| {
            a.group_name
                .cmp(&b.group_name)
                .then(a.version.cmp(&b.version))
        });
        let contents = serde_json::to_string_pretty(&packages)?;

        fs::write(self.registry_file_path(), contents)?;

        Ok(())
    }

    /// Next free version number in `group_name`.
    pub fn next_version(&self, group_name: &str) -> u32 {
        self.packages
            .values()
            .filter(|p| p.group_name == group_name)
            .map(|p| p.version)
            .max()
            .unwrap_or(0)
            + 1
    }

    /// Register a new package version in `group_name`.
    pub fn register(
        &mut self,
        group_name: &str,
        metrics_uri: Option<String>,
        status: ApprovalStatus,
    ) -> ModelPackage {
        let version = self.next_version(group_name);
        let package = ModelPackage::new(group_name, version, metrics_uri)
            .with_status(status)
            .with_created_at(Utc::now());
        self.packages.insert(package.arn.clone(), package.clone());
        package
    }

    /// Insert a fully-formed package, replacing any with the same ARN.
    pub fn insert(&mut self, package: ModelPackage) {
        self.packages.insert(package.arn.clone(), package);
    }

    pub fn get(&self, arn: &str) -> Option<&ModelPackage> {
        self.packages.get(arn)
    }

    /// Change the approval status of a package.
    pub fn update_status(
        &mut self,
        arn: &str,
        status: ApprovalStatus,
    ) -> Result<ModelPackage, PlatformError> {
        let package = self
            .packages
            .get_mut(arn)
            .ok_or_else(|| PlatformError::ModelPackageNotFound(arn.to_string()))?;
        ApprovalLifecycle::new().transition(package, status)?;
        Ok(package.clone())
    }

    /// Packages in `group_name`, newest version first.
    pub fn list_group(&self, group_name: &str) -> Vec<&ModelPackage> {
        let mut packages: Vec<&ModelPackage> = self
            .packages
            .values()
            .filter(|p| p.group_name == group_name)
            .collect();
        packages.sort_by(|a, b| b.version.cmp(&a.version));
        packages
    }

    /// Most recently created approved package in `group_name`.
    pub fn latest_approved(&self, group_name: &str) -> Option<&ModelPackage> {
        self.packages
            .values()
            .filter(|p| p.group_name == group_name && p.is_approved())
            .max_by(|a, b| {
                a.created_at
                    .cmp(&b.created_at)
                    .then(a.version.cmp(&b.version))
            })
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

/// [`ModelRegistry`] over a [`ModelPackageStore`] that persists every change.
pub struct LocalModelRegistry {
    store: Mutex<ModelPackageStore>,
}

impl LocalModelRegistry {
    /// Open (or create) the registry stored under `registry_path`.
    pub fn open(registry_path: PathBuf) -> Result<Self, PlatformError> {
        let mut store = ModelPackageStore::new(registry_path);
        store.load()?;
        Ok(Self {
            store: Mutex::new(store),
        })
    }

    /// Register a new package version and persist it.
    pub async fn register(
        &self,
        group_name: &str,
        metrics_uri: Option<String>,
        status: ApprovalStatus,
    ) -> Result<ModelPackage, PlatformError> {
        let mut store = self.store.lock().await;
        let package = store.register(group_name, metrics_uri, status);
        store.save()?;
        info!(
            arn = %package.arn,
            status = %package.approval_status,
            "Registered model package"
        );
        Ok(package)
    }

    /// Change a package's approval status and persist it.
    pub async fn update_approval_status(
        &self,
        arn: &str,
        status: ApprovalStatus,
    ) -> Result<ModelPackage, PlatformError> {
        let mut store = self.store.lock().await;
        let package = store.update_status(arn, status)?;
        store.save()?;
        Ok(package)
    }

    /// Packages in `group_name`, newest version first.
    pub async fn list_group(&self, group_name: &str) -> Vec<ModelPackage> {
        let store = self.store.lock().await;
        store.list_group(group_name).into_iter().cloned().collect()
    }
}

#[async_trait]
impl ModelRegistry for LocalModelRegistry {
    async fn latest_approved(&self, group_name: &str) -> Result<ModelPackage, PlatformError> {
        let store = self.store.lock().await;
        store
            .latest_approved(group_name)
            .cloned()
            .ok_or_else(|| PlatformError::NoApprovedPackage(group_name.to_string()))
    }

    async fn describe_model_package(&self, arn: &str) -> Result<ModelPackage, PlatformError> {
        let store = self.store.lock().await;
        store
            .get(arn)
            .cloned()
            .ok_or_else(|| PlatformError::ModelPackageNotFound(arn.to_string()))
    }
}
