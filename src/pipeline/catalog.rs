//! Registry of pipeline kinds.
//!
//! Each kind maps to a constructor building a [`PipelineDefinition`] from a
//! pipeline name and a resolved [`PipelineConfig`]. Kinds are registered
//! explicitly at startup.

use std::collections::BTreeMap;

use super::builtin::{processing_pipeline, training_pipeline};
use super::config::PipelineConfig;
use super::definition::PipelineDefinition;
use crate::error::PipelineError;

/// Constructor of a pipeline kind.
pub type PipelineBuilder = fn(&str, &PipelineConfig) -> PipelineDefinition;

/// Pipeline kinds by name.
#[derive(Debug, Clone, Default)]
pub struct PipelineCatalog {
    builders: BTreeMap<String, PipelineBuilder>,
}

impl PipelineCatalog {
    /// Create a new empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog with the `processing` and `training` kinds.
    pub fn with_builtin() -> Self {
        let mut catalog = Self::new();
        catalog.builders.insert("processing".to_string(), processing_pipeline);
        catalog.builders.insert("training".to_string(), training_pipeline);
        catalog
    }

    /// Register a pipeline kind.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::DuplicateKind` if `kind` is already registered.
    pub fn register(
        &mut self,
        kind: impl Into<String>,
        builder: PipelineBuilder,
    ) -> Result<(), PipelineError> {
        let kind = kind.into();
        if self.builders.contains_key(&kind) {
            return Err(PipelineError::DuplicateKind(kind));
        }
        self.builders.insert(kind, builder);
        Ok(())
    }

    /// Build the definition of `kind` named `pipeline_name`.
    pub fn build(
        &self,
        kind: &str,
        pipeline_name: &str,
        config: &PipelineConfig,
    ) -> Result<PipelineDefinition, PipelineError> {
        let builder = self
            .builders
            .get(kind)
            .ok_or_else(|| PipelineError::UnknownKind {
                kind: kind.to_string(),
                available: self.kinds().join(", "),
            })?;
        Ok(builder(pipeline_name, config))
    }

    /// Registered kinds, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        self.builders.keys().map(|s| s.as_str()).collect()
    }
}
