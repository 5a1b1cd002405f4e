//! Evaluation metrics manifests and paths into them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::MetricPathError;

/// Separator between keys in a textual metric path.
pub const METRIC_PATH_SEPARATOR: char = '/';

/// A JSON evaluation document produced by a training/evaluation job.
///
/// Structurally a nested mapping from string keys to further mappings or
/// numeric leaves, e.g. `{"regression_metrics": {"mse": {"value": 4.9}}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricsManifest(Value);

impl MetricsManifest {
    /// Wraps an already-parsed JSON document.
    pub fn new(document: Value) -> Self {
        Self(document)
    }

    /// Parses a manifest from JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes).map(Self)
    }

    /// Returns the underlying JSON document.
    pub fn document(&self) -> &Value {
        &self.0
    }

    /// Resolves the numeric value at `path`.
    pub fn resolve(&self, path: &MetricPath) -> Result<f64, MetricPathError> {
        resolve(self, path)
    }
}

impl From<Value> for MetricsManifest {
    fn from(document: Value) -> Self {
        Self(document)
    }
}

/// Ordered keys identifying a numeric leaf inside a [`MetricsManifest`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricPath {
    keys: Vec<String>,
}

impl MetricPath {
    /// Parses a slash-delimited path such as `regression_metrics/mse/value`.
    pub fn parse(raw: &str) -> Result<Self, MetricPathError> {
        if raw.is_empty() {
            return Err(MetricPathError::EmptyPath);
        }
        Self::from_keys(raw.split(METRIC_PATH_SEPARATOR))
    }

    /// Builds a path from already-split keys.
    pub fn from_keys<I, S>(keys: I) -> Result<Self, MetricPathError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        if keys.is_empty() {
            return Err(MetricPathError::EmptyPath);
        }
        if keys.iter().any(String::is_empty) {
            return Err(MetricPathError::EmptySegment(
                keys.join(&METRIC_PATH_SEPARATOR.to_string()),
            ));
        }
        Ok(Self { keys })
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    fn prefix(&self, len: usize) -> String {
        self.keys[..len].join(&METRIC_PATH_SEPARATOR.to_string())
    }
}

impl fmt::Display for MetricPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.prefix(self.keys.len()))
    }
}

impl FromStr for MetricPath {
    type Err = MetricPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Returns the numeric value at `path` inside `manifest`.
///
/// Every non-final key must land on a mapping and the final key must exist
/// and hold a number. A miss at any level is an error; nothing is defaulted.
pub fn resolve(manifest: &MetricsManifest, path: &MetricPath) -> Result<f64, MetricPathError> {
    let mut current = manifest.document();

    for (depth, key) in path.keys().iter().enumerate() {
        let map = current
            .as_object()
            .ok_or_else(|| MetricPathError::NotAMapping {
                key: key.clone(),
                path: location(path, depth),
            })?;
        current = map.get(key).ok_or_else(|| MetricPathError::MissingKey {
            key: key.clone(),
            path: location(path, depth),
        })?;
    }

    current.as_f64().ok_or_else(|| MetricPathError::NotNumeric {
        path: path.to_string(),
    })
}

fn location(path: &MetricPath, depth: usize) -> String {
    if depth == 0 {
        "<root>".to_string()
    } else {
        path.prefix(depth)
    }
}
