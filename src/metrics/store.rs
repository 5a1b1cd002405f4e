//! Access to metrics manifests held in object storage.

use async_trait::async_trait;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::debug;

use super::manifest::MetricsManifest;
use crate::error::{InputError, PlatformError};

/// Location of an object in a bucket-style store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageUri {
    pub scheme: String,
    pub bucket: String,
    pub key: String,
}

impl StorageUri {
    /// Parses `scheme://bucket/key`. The key may contain further slashes.
    pub fn parse(uri: &str) -> Result<Self, InputError> {
        let (scheme, rest) = uri
            .split_once("://")
            .ok_or_else(|| InputError::InvalidUri(uri.to_string()))?;
        let (bucket, key) = rest
            .split_once('/')
            .ok_or_else(|| InputError::InvalidUri(uri.to_string()))?;
        if scheme.is_empty() || bucket.is_empty() || key.is_empty() {
            return Err(InputError::InvalidUri(uri.to_string()));
        }
        Ok(Self {
            scheme: scheme.to_string(),
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }
}

impl fmt::Display for StorageUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", self.scheme, self.bucket, self.key)
    }
}

/// Object store holding evaluation-metrics documents.
#[async_trait]
pub trait MetricsStore: Send + Sync {
    /// Fetches and parses the manifest at `uri`.
    ///
    /// Fails with [`PlatformError::ManifestNotFound`] when nothing is stored
    /// at that location.
    async fn fetch_manifest(&self, uri: &str) -> Result<MetricsManifest, PlatformError>;
}

/// Metrics store backed by a local directory.
///
/// `s3://bucket/path/to/file.json` maps to `<root>/bucket/path/to/file.json`;
/// `file://` URIs and bare paths are read as-is.
#[derive(Debug, Clone)]
pub struct LocalMetricsStore {
    root: PathBuf,
}

impl LocalMetricsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Maps a storage URI onto the local filesystem.
    pub fn local_path(&self, uri: &str) -> Result<PathBuf, InputError> {
        if let Some(path) = uri.strip_prefix("file://") {
            return Ok(PathBuf::from(path));
        }
        if !uri.contains("://") {
            return Ok(PathBuf::from(uri));
        }
        let parsed = StorageUri::parse(uri)?;
        let relative = Path::new(&parsed.bucket).join(&parsed.key);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(InputError::InvalidUri(uri.to_string()));
        }
        Ok(self.root.join(relative))
    }

    /// Writes a manifest to the location `uri` maps to.
    pub async fn put_manifest(
        &self,
        uri: &str,
        manifest: &MetricsManifest,
    ) -> Result<PathBuf, PlatformError> {
        let path = self.local_path(uri)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        fs::write(&path, serde_json::to_vec_pretty(manifest)?).await?;
        Ok(path)
    }
}

#[async_trait]
impl MetricsStore for LocalMetricsStore {
    async fn fetch_manifest(&self, uri: &str) -> Result<MetricsManifest, PlatformError> {
        let path = self.local_path(uri)?;
        debug!(uri = %uri, path = %path.display(), "Loading metrics manifest");

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PlatformError::ManifestNotFound(uri.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        Ok(MetricsManifest::from_slice(&bytes)?)
    }
}
