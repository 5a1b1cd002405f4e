//! Pipeline service collaborator and its local implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::error::PlatformError;
use crate::utils::{KeyValue, NameValue};

/// Name of the pipelines JSON file.
const PIPELINES_FILENAME: &str = "pipelines.json";

/// Create-or-update request for a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpsertPipelineRequest {
    pub pipeline_name: String,
    pub pipeline_definition: String,
    pub role_arn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<KeyValue>>,
}

/// Request to start a pipeline execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StartPipelineExecutionRequest {
    pub pipeline_name: String,
    pub pipeline_execution_display_name: String,
    pub pipeline_parameters: Vec<NameValue>,
    pub client_request_token: String,
}

/// A stored pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRecord {
    pub name: String,
    pub arn: String,
    pub role_arn: String,
    pub definition: String,
    #[serde(default)]
    pub tags: Vec<KeyValue>,
    /// Incremented on every upsert.
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub last_modified_at: DateTime<Utc>,
}

/// Handle of a started pipeline execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineExecution {
    pub arn: String,
    pub pipeline_name: String,
    pub display_name: String,
    pub parameters: Vec<NameValue>,
    pub client_request_token: String,
    pub started_at: DateTime<Utc>,
}

/// Pipeline operations.
#[async_trait]
pub trait PipelineService: Send + Sync {
    /// Create the pipeline, or replace its definition if it exists.
    async fn upsert_pipeline(
        &self,
        request: UpsertPipelineRequest,
    ) -> Result<PipelineRecord, PlatformError>;

    /// Start an execution of an existing pipeline.
    ///
    /// A repeated client request token returns the execution it started.
    async fn start_pipeline_execution(
        &self,
        request: StartPipelineExecutionRequest,
    ) -> Result<PipelineExecution, PlatformError>;
}

/// Persisted pipelines and executions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineState {
    pub pipelines: Vec<PipelineRecord>,
    pub executions: Vec<PipelineExecution>,
}

/// [`PipelineService`] persisting to `pipelines.json`.
pub struct LocalPipelineService {
    state_path: PathBuf,
    state: Mutex<PipelineState>,
}

impl LocalPipelineService {
    /// Open (or create) the service stored under `state_dir`.
    pub fn open(state_dir: PathBuf) -> Result<Self, PlatformError> {
        let state_path = state_dir.join(PIPELINES_FILENAME);
        let state = if state_path.exists() {
            serde_json::from_str(&fs::read_to_string(&state_path)?)?
        } else {
            PipelineState::default()
        };
        Ok(Self {
            state_path,
            state: Mutex::new(state),
        })
    }

    fn save(&self, state: &PipelineState) -> Result<(), PlatformError> {
        if let Some(parent) = self.state_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.state_path, serde_json::to_string_pretty(state)?)?;
        Ok(())
    }

    pub async fn pipeline(&self, name: &str) -> Option<PipelineRecord> {
        let state = self.state.lock().await;
        state.pipelines.iter().find(|p| p.name == name).cloned()
    }

    pub async fn executions(&self, pipeline_name: &str) -> Vec<PipelineExecution> {
        let state = self.state.lock().await;
        state
            .executions
            .iter()
            .filter(|e| e.pipeline_name == pipeline_name)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl PipelineService for LocalPipelineService {
    async fn upsert_pipeline(
        &self,
        request: UpsertPipelineRequest,
    ) -> Result<PipelineRecord, PlatformError> {
        let mut state = self.state.lock().await;
        let now = Utc::now();

        let position = state
            .pipelines
            .iter()
            .position(|p| p.name == request.pipeline_name);
        let record = match position {
            Some(index) => {
                let existing = &mut state.pipelines[index];
                existing.definition = request.pipeline_definition;
                existing.role_arn = request.role_arn;
                if let Some(tags) = request.tags {
                    existing.tags = tags;
                }
                existing.version += 1;
                existing.last_modified_at = now;
                existing.clone()
            }
            None => {
                let record = PipelineRecord {
                    arn: format!("arn:mlops:local:pipeline/{}", request.pipeline_name.to_lowercase()),
                    name: request.pipeline_name,
                    role_arn: request.role_arn,
                    definition: request.pipeline_definition,
                    tags: request.tags.unwrap_or_default(),
                    version: 1,
                    created_at: now,
                    last_modified_at: now,
                };
                state.pipelines.push(record.clone());
                record
            }
        };

        self.save(&state)?;
        info!(pipeline = %record.name, version = record.version, "Upserted pipeline");
        Ok(record)
    }

    async fn start_pipeline_execution(
        &self,
        request: StartPipelineExecutionRequest,
    ) -> Result<PipelineExecution, PlatformError> {
        let mut state = self.state.lock().await;
        let pipeline = state
            .pipelines
            .iter()
            .find(|p| p.name == request.pipeline_name)
            .ok_or_else(|| PlatformError::PipelineNotFound(request.pipeline_name.clone()))?;

        if let Some(existing) = state
            .executions
            .iter()
            .find(|e| e.client_request_token == request.client_request_token)
        {
            return Ok(existing.clone());
        }

        let execution = PipelineExecution {
            arn: format!("{}/execution/{}", pipeline.arn, Uuid::new_v4().simple()),
            pipeline_name: request.pipeline_name,
            display_name: request.pipeline_execution_display_name,
            parameters: request.pipeline_parameters,
            client_request_token: request.client_request_token,
            started_at: Utc::now(),
        };
        state.executions.push(execution.clone());
        self.save(&state)?;
        info!(
            pipeline = %execution.pipeline_name,
            execution = %execution.arn,
            "Started pipeline execution"
        );
        Ok(execution)
    }
}
