//! Metric-gated model promotion onto serving endpoints.
//!
//! # Flow
//!
//! 1. **Lookup**: the latest approved package of a model package group
//! 2. **Create**: if the endpoint does not exist, deploy the package to a new endpoint
//! 3. **Decide**: otherwise compare the candidate's metric with the deployed model's
//! 4. **Update**: on `Update`, create a model from the package and repoint the endpoint,
//!    re-asserting the data capture settings
//!
//! A failed lookup or a missing metric aborts the run before anything is
//! changed.
//!
//! # Example
//!
//! ```rust,ignore
//! use mlops_utilities::metrics::MetricPath;
//! use mlops_utilities::promotion::{DeployRequest, ModelDeployer, PromotionPolicy};
//! use mlops_utilities::serving::DataCaptureConfig;
//!
//! let deployer = ModelDeployer::new(registry, metrics, serving);
//! let request = DeployRequest::new(
//!     "churn",
//!     "churn-endpoint",
//!     DataCaptureConfig::for_destination("s3://bucket/capture"),
//!     "arn:aws:iam::123456789000:role/Execution",
//! )
//! .with_policy(PromotionPolicy::gated_on(MetricPath::parse("regression_metrics/mse/value")?));
//!
//! let outcome = deployer.deploy(&request).await?;
//! ```

pub mod decision;
pub mod deploy;

pub use decision::{Decision, DecisionState, PromotionPolicy, UpdateReason};
pub use deploy::{DeployRequest, DeploymentOutcome, ModelDeployer};
