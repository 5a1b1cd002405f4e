//! Evaluation metrics: manifests, metric paths, comparison and storage.
//!
//! A training job publishes a JSON manifest of evaluation metrics next to
//! each model package. Promotion decisions resolve one numeric leaf in the
//! candidate's and the deployed model's manifests and compare the two.
//!
//! ```
//! use mlops_utilities::metrics::{compare_metrics, MetricPath, MetricsManifest};
//! use serde_json::json;
//!
//! let new = MetricsManifest::new(json!({"regression_metrics": {"mse": {"value": 4.9}}}));
//! let old = MetricsManifest::new(json!({"regression_metrics": {"mse": {"value": 4.9}}}));
//! let path = MetricPath::parse("regression_metrics/mse/value").unwrap();
//!
//! assert!(compare_metrics(&new, &old, &path).unwrap());
//! ```

pub mod compare;
pub mod manifest;
pub mod store;

pub use compare::{compare_metrics, ComparisonGate, MetricComparison};
pub use manifest::{resolve, MetricPath, MetricsManifest, METRIC_PATH_SEPARATOR};
pub use store::{LocalMetricsStore, MetricsStore, StorageUri};
