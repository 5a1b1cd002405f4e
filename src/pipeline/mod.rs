//! Pipeline definition, upsert and execution.
//!
//! # Architecture
//!
//! - **Config**: typed [`PipelineConfig`] resolved from ordered [`ConfigOverrides`] layers
//! - **Catalog**: pipeline kinds mapped to definition builders
//! - **Service**: the [`PipelineService`] collaborator storing pipelines and executions
//! - **Actions**: [`upsert_pipeline`] and [`run_pipeline`]
//!
//! # Example
//!
//! ```rust,ignore
//! use mlops_utilities::pipeline::{upsert_pipeline, ConfigOverrides, PipelineCatalog};
//!
//! let layers = vec![
//!     ConfigOverrides::from_yaml_file("conf/training.yml")?,
//!     ConfigOverrides::from_env()?,
//!     ConfigOverrides::role("arn:aws:iam::123456789000:role/Exec"),
//! ];
//! let outcome = upsert_pipeline(
//!     &service,
//!     &PipelineCatalog::with_builtin(),
//!     "training",
//!     "abalone-training",
//!     &layers,
//!     None,
//!     false,
//! )
//! .await?;
//! ```

pub mod actions;
pub mod builtin;
pub mod catalog;
pub mod config;
pub mod definition;
pub mod service;

pub use actions::{
    run_pipeline, start_request, upsert_pipeline, RunOutcome, UpsertOutcome,
    CLIENT_REQUEST_TOKEN_MIN_LEN,
};
pub use catalog::{PipelineBuilder, PipelineCatalog};
pub use config::{ConfigError, ConfigOverrides, PipelineConfig};
pub use definition::{PipelineDefinition, PipelineParameter, PipelineStep, StepKind};
pub use service::{
    LocalPipelineService, PipelineExecution, PipelineRecord, PipelineService,
    StartPipelineExecutionRequest, UpsertPipelineRequest,
};
