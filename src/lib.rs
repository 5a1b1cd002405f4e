//! mlops-utilities: lifecycle helpers for an ML platform.
//!
//! This library provides tools for upserting and running ML pipelines,
//! tracking model packages and their approval, and promoting the latest
//! approved model onto a serving endpoint when its evaluation metric is not
//! worse than the deployed model's.

pub mod cli;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod promotion;
pub mod registry;
pub mod serving;
pub mod utils;
pub mod workspace;

// Re-export commonly used error types
pub use error::{InputError, MetricPathError, PipelineError, PlatformError, PromotionError};
