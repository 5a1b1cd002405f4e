//! Pipeline upsert and run operations.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use super::catalog::PipelineCatalog;
use super::config::{ConfigOverrides, PipelineConfig};
use super::definition::PipelineDefinition;
use super::service::{
    PipelineExecution, PipelineRecord, PipelineService, StartPipelineExecutionRequest,
    UpsertPipelineRequest,
};
use crate::error::PipelineError;
use crate::utils::{
    ensure_min_length, key_value_list, name_value_list, normalize_pipeline_name,
    timestamped_name, ParamMap,
};

/// Minimum length of a client request token.
pub const CLIENT_REQUEST_TOKEN_MIN_LEN: usize = 32;

/// Result of [`upsert_pipeline`].
#[derive(Debug, Clone)]
pub struct UpsertOutcome {
    /// Normalized pipeline name.
    pub pipeline_name: String,
    pub config: PipelineConfig,
    pub definition: PipelineDefinition,
    /// `None` on a dry run.
    pub record: Option<PipelineRecord>,
}

/// Result of [`run_pipeline`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RunOutcome {
    /// The request that would have been sent.
    DryRun(StartPipelineExecutionRequest),
    Started(PipelineExecution),
}

/// Creates or updates the pipeline `pipeline_name` of the given `kind`.
///
/// The configuration is resolved from `layers` (later layers win), and the
/// definition is built from the catalog. With `dryrun` the service is never
/// called.
pub async fn upsert_pipeline(
    service: &dyn PipelineService,
    catalog: &PipelineCatalog,
    kind: &str,
    pipeline_name: &str,
    layers: &[ConfigOverrides],
    tags: Option<&ParamMap>,
    dryrun: bool,
) -> Result<UpsertOutcome, PipelineError> {
    let config = PipelineConfig::layered(layers)?;
    info!("Result config:\n{}", config.to_yaml()?);

    let pipeline_name = normalize_pipeline_name(pipeline_name);
    let definition = catalog.build(kind, &pipeline_name, &config)?;
    info!("Pipeline definition:\n{}", definition.to_json_pretty()?);

    if dryrun {
        debug!(pipeline = %pipeline_name, "Dry run, pipeline not upserted");
        return Ok(UpsertOutcome {
            pipeline_name,
            config,
            definition,
            record: None,
        });
    }

    let tags = match tags {
        Some(tags) => Some(key_value_list(Some(tags))?),
        None => None,
    };
    let record = service
        .upsert_pipeline(UpsertPipelineRequest {
            pipeline_name: pipeline_name.clone(),
            pipeline_definition: definition.to_json()?,
            role_arn: config.pipeline.role.clone(),
            tags,
        })
        .await?;

    Ok(UpsertOutcome {
        pipeline_name,
        config,
        definition,
        record: Some(record),
    })
}

/// Builds the start request of an execution named `{prefix}-{timestamp}`.
pub fn start_request(
    pipeline_name: &str,
    execution_name_prefix: &str,
    params: &ParamMap,
    now: &DateTime<Utc>,
) -> Result<StartPipelineExecutionRequest, PipelineError> {
    let display_name = timestamped_name(execution_name_prefix, now);
    Ok(StartPipelineExecutionRequest {
        pipeline_name: pipeline_name.to_string(),
        client_request_token: ensure_min_length(&display_name, CLIENT_REQUEST_TOKEN_MIN_LEN),
        pipeline_execution_display_name: display_name,
        pipeline_parameters: name_value_list(Some(params))?,
    })
}

/// Starts an execution of an uploaded pipeline.
///
/// With `dryrun` returns the request instead of sending it.
pub async fn run_pipeline(
    service: &dyn PipelineService,
    pipeline_name: &str,
    execution_name_prefix: &str,
    params: &ParamMap,
    dryrun: bool,
) -> Result<RunOutcome, PipelineError> {
    let request = start_request(pipeline_name, execution_name_prefix, params, &Utc::now())?;
    if dryrun {
        return Ok(RunOutcome::DryRun(request));
    }

    let execution = service.start_pipeline_execution(request).await?;
    Ok(RunOutcome::Started(execution))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::service::LocalPipelineService;
    use crate::utils::param_map_from_pairs;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn layers() -> Vec<ConfigOverrides> {
        vec![ConfigOverrides::role("arn:aws:iam::123456789000:role/Exec")]
    }

    #[test]
    fn test_start_request_shape() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
        let params = param_map_from_pairs(&["InputDataUri=s3://b/data.csv", "Epochs=3"]).unwrap();
        let request = start_request("train", "exec", &params, &now).unwrap();

        assert_eq!(request.pipeline_execution_display_name, "exec-2024-03-05-07-08-09");
        assert_eq!(
            request.client_request_token,
            format!("exec-2024-03-05-07-08-09_ {}", "0".repeat(8))
        );
        assert_eq!(request.pipeline_parameters[0].name, "InputDataUri");
        assert_eq!(request.pipeline_parameters[1].value, "3");
    }

    #[test]
    fn test_long_display_name_is_its_own_token() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
        let request = start_request("p", "a-much-longer-prefix", &ParamMap::new(), &now).unwrap();
        assert_eq!(request.client_request_token, request.pipeline_execution_display_name);
    }

    #[tokio::test]
    async fn test_run_pipeline_dryrun_does_not_call_service() {
        let dir = tempdir().unwrap();
        let service = LocalPipelineService::open(dir.path().to_path_buf()).unwrap();

        let outcome = run_pipeline(&service, "missing", "exec", &ParamMap::new(), true)
            .await
            .unwrap();
        match outcome {
            RunOutcome::DryRun(request) => assert_eq!(request.pipeline_name, "missing"),
            other => panic!("expected dry run, got {:?}", other),
        }
        assert!(service.executions("missing").await.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_then_run() {
        let dir = tempdir().unwrap();
        let service = LocalPipelineService::open(dir.path().to_path_buf()).unwrap();
        let catalog = PipelineCatalog::with_builtin();
        let tags = param_map_from_pairs(&["team=ds"]).unwrap();

        let upserted = upsert_pipeline(
            &service,
            &catalog,
            "training",
            "abalone",
            &layers(),
            Some(&tags),
            false,
        )
        .await
        .unwrap();
        let record = upserted.record.unwrap();
        assert_eq!(record.role_arn, "arn:aws:iam::123456789000:role/Exec");
        assert_eq!(record.tags[0].key, "team");

        let outcome = run_pipeline(&service, "abalone", "exec", &ParamMap::new(), false)
            .await
            .unwrap();
        assert!(matches!(outcome, RunOutcome::Started(e) if e.pipeline_name == "abalone"));
    }

    #[tokio::test]
    async fn test_upsert_dryrun_normalizes_name() {
        let dir = tempdir().unwrap();
        let service = LocalPipelineService::open(dir.path().to_path_buf()).unwrap();
        let long_name = "p".repeat(100);

        let outcome = upsert_pipeline(
            &service,
            &PipelineCatalog::with_builtin(),
            "processing",
            &long_name,
            &layers(),
            None,
            true,
        )
        .await
        .unwrap();
        assert_eq!(outcome.pipeline_name.len(), 82);
        assert_eq!(outcome.definition.name, outcome.pipeline_name);
        assert!(outcome.record.is_none());
        assert!(service.pipeline(&outcome.pipeline_name).await.is_none());
    }

    #[tokio::test]
    async fn test_upsert_requires_role() {
        let dir = tempdir().unwrap();
        let service = LocalPipelineService::open(dir.path().to_path_buf()).unwrap();
        let result = upsert_pipeline(
            &service,
            &PipelineCatalog::with_builtin(),
            "processing",
            "p",
            &[],
            None,
            false,
        )
        .await;
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }
}
