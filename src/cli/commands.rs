//! CLI command definitions for mlops.
//!
//! Every command runs against a local workspace directory (see
//! [`crate::workspace`]) and prints its result as JSON.

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use crate::metrics::{ComparisonGate, MetricPath, MetricsManifest, MetricsStore};
use crate::pipeline::{run_pipeline, upsert_pipeline, ConfigOverrides, PipelineCatalog};
use crate::promotion::{DeployRequest, PromotionPolicy};
use crate::registry::ApprovalStatus;
use crate::serving::{CaptureMode, DataCaptureConfig};
use crate::utils::{key_value_list, param_map_from_pairs};
use crate::workspace::{Workspace, DEFAULT_WORKSPACE_DIR};

/// Default instance type for endpoints.
const DEFAULT_INSTANCE_TYPE: &str = "ml.m5.large";

/// MLOps lifecycle helper: pipelines, model registry and endpoint promotion.
#[derive(Parser)]
#[command(name = "mlops")]
#[command(about = "Upsert and run ML pipelines, manage model packages and promote them to endpoints")]
#[command(version)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,

    /// Workspace directory holding the local platform state.
    #[arg(short, long, env = "MLOPS_WORKSPACE", default_value = DEFAULT_WORKSPACE_DIR, global = true)]
    pub workspace: PathBuf,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Start an execution of an uploaded pipeline.
    RunPipeline(RunPipelineArgs),

    /// Create or update a pipeline from the catalog.
    UpsertPipeline(UpsertPipelineArgs),

    /// Deploy the latest approved model package, or update the endpoint if
    /// the package is not worse than the deployed one.
    Deploy(DeployArgs),

    /// Compare one metric between two metrics manifests.
    CompareMetrics(CompareMetricsArgs),

    /// Manage model packages.
    Registry(RegistryArgs),
}

/// Arguments for `mlops run-pipeline`.
#[derive(Parser, Debug)]
pub struct RunPipelineArgs {
    /// Name of the uploaded pipeline.
    #[arg(short = 'p', long)]
    pub pipeline_name: String,

    /// Prefix of the execution display name.
    #[arg(short = 'e', long)]
    pub execution_prefix: String,

    /// Pipeline parameter as KEY=VALUE; repeatable.
    #[arg(long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,

    /// Print the request instead of starting the execution.
    #[arg(long)]
    pub dryrun: bool,
}

/// Arguments for `mlops upsert-pipeline`.
#[derive(Parser, Debug)]
pub struct UpsertPipelineArgs {
    /// Pipeline kind from the catalog (processing, training).
    #[arg(short, long)]
    pub kind: String,

    /// Name of the pipeline.
    #[arg(short = 'p', long)]
    pub pipeline_name: String,

    /// YAML configuration file; repeatable, later files win.
    #[arg(short, long = "config", value_name = "FILE")]
    pub configs: Vec<PathBuf>,

    /// IAM role of the pipeline.
    #[arg(short, long, env = "MLOPS_PIPELINE_ROLE")]
    pub role: Option<String>,

    /// Processing instance type.
    #[arg(long)]
    pub instance_type: Option<String>,

    /// Processing instance count.
    #[arg(long)]
    pub instance_count: Option<u32>,

    /// Artifact bucket.
    #[arg(long)]
    pub default_bucket: Option<String>,

    /// Pipeline tag as KEY=VALUE; repeatable.
    #[arg(long = "tag", value_name = "KEY=VALUE")]
    pub tags: Vec<String>,

    /// Build and log the definition without upserting it.
    #[arg(long)]
    pub dryrun: bool,
}

impl UpsertPipelineArgs {
    /// Configuration layers: files in order, then environment, then flags.
    fn layers(&self) -> anyhow::Result<Vec<ConfigOverrides>> {
        let mut layers = Vec::with_capacity(self.configs.len() + 2);
        for path in &self.configs {
            layers.push(
                ConfigOverrides::from_yaml_file(path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
            );
        }
        layers.push(ConfigOverrides::from_env()?);

        let mut flags = ConfigOverrides::default();
        flags.pipeline.role = self.role.clone();
        flags.pipeline.default_bucket = self.default_bucket.clone();
        flags.processing.instance_type = self.instance_type.clone();
        flags.processing.instance_count = self.instance_count;
        layers.push(flags);
        Ok(layers)
    }
}

/// Arguments for `mlops deploy`.
#[derive(Parser, Debug)]
pub struct DeployArgs {
    /// Model package group to take the latest approved package from.
    #[arg(short = 'g', long)]
    pub model_package_group: String,

    /// Endpoint to create or update.
    #[arg(short, long)]
    pub endpoint_name: String,

    /// Destination of captured requests and responses.
    #[arg(short, long)]
    pub data_capture_uri: String,

    /// Percentage of requests captured.
    #[arg(long, default_value = "100")]
    pub sampling_percentage: u32,

    /// Captured side (input, output); repeatable. Both when absent.
    #[arg(long = "capture-mode", value_name = "MODE")]
    pub capture_modes: Vec<CaptureMode>,

    /// Send the capture settings with capture turned off.
    #[arg(long)]
    pub disable_capture: bool,

    /// Execution role of created models.
    #[arg(short, long, env = "MLOPS_EXECUTION_ROLE")]
    pub role: String,

    #[arg(long, default_value = DEFAULT_INSTANCE_TYPE)]
    pub instance_type: String,

    #[arg(long, default_value = "1")]
    pub instance_count: u32,

    /// Slash-delimited metric path gating the update; always update when absent.
    #[arg(short, long)]
    pub metric_path: Option<String>,

    /// Comparison gate (at-least, strictly-greater).
    #[arg(long, default_value = "at-least")]
    pub gate: ComparisonGate,

    /// Tag for created models as KEY=VALUE; repeatable.
    #[arg(long = "tag", value_name = "KEY=VALUE")]
    pub tags: Vec<String>,
}

/// Arguments for `mlops compare-metrics`.
#[derive(Parser, Debug)]
pub struct CompareMetricsArgs {
    /// Manifest of the new model (storage URI or path).
    #[arg(long)]
    pub new: String,

    /// Manifest of the deployed model (storage URI or path).
    #[arg(long)]
    pub old: String,

    /// Slash-delimited metric path.
    #[arg(short, long)]
    pub metric_path: String,

    #[arg(long, default_value = "at-least")]
    pub gate: ComparisonGate,
}

/// Arguments for `mlops registry`.
#[derive(Parser, Debug)]
pub struct RegistryArgs {
    #[command(subcommand)]
    pub command: RegistrySubcommand,
}

/// Registry subcommands.
#[derive(clap::Subcommand, Debug)]
pub enum RegistrySubcommand {
    /// Register a new package version in a group.
    Register {
        #[arg(short = 'g', long)]
        group: String,
        /// Storage URI of the evaluation metrics manifest.
        #[arg(short, long)]
        metrics_uri: Option<String>,
        /// Local JSON manifest to upload to `--metrics-uri` first.
        #[arg(long, requires = "metrics_uri", value_name = "FILE")]
        metrics_file: Option<PathBuf>,
        /// Initial approval status.
        #[arg(long, default_value = "PendingManualApproval")]
        status: ApprovalStatus,
    },
    /// Approve a package.
    Approve { arn: String },
    /// Reject a package.
    Reject { arn: String },
    /// List the packages of a group, newest first.
    List {
        #[arg(short = 'g', long)]
        group: String,
    },
}

/// Parse CLI arguments and return the Cli struct.
///
/// This allows main.rs to access CLI arguments (like log_level) before running commands.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    let workspace = Workspace::open(&cli.workspace)
        .with_context(|| format!("Failed to open workspace {}", cli.workspace.display()))?;

    match cli.command {
        Commands::RunPipeline(args) => run_pipeline_command(&workspace, args).await,
        Commands::UpsertPipeline(args) => run_upsert_pipeline_command(&workspace, args).await,
        Commands::Deploy(args) => run_deploy_command(&workspace, args).await,
        Commands::CompareMetrics(args) => run_compare_metrics_command(&workspace, args).await,
        Commands::Registry(args) => run_registry_command(&workspace, args.command).await,
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_pipeline_command(workspace: &Workspace, args: RunPipelineArgs) -> anyhow::Result<()> {
    let params = param_map_from_pairs(&args.params)?;
    let outcome = run_pipeline(
        workspace.pipelines.as_ref(),
        &args.pipeline_name,
        &args.execution_prefix,
        &params,
        args.dryrun,
    )
    .await?;
    print_json(&outcome)
}

async fn run_upsert_pipeline_command(
    workspace: &Workspace,
    args: UpsertPipelineArgs,
) -> anyhow::Result<()> {
    let layers = args.layers()?;
    let tags = if args.tags.is_empty() {
        None
    } else {
        Some(param_map_from_pairs(&args.tags)?)
    };

    let outcome = upsert_pipeline(
        workspace.pipelines.as_ref(),
        &PipelineCatalog::with_builtin(),
        &args.kind,
        &args.pipeline_name,
        &layers,
        tags.as_ref(),
        args.dryrun,
    )
    .await?;

    match outcome.record {
        Some(record) => print_json(&record),
        None => {
            info!(pipeline = %outcome.pipeline_name, "Dry run complete");
            print_json(&outcome.definition)
        }
    }
}

async fn run_deploy_command(workspace: &Workspace, args: DeployArgs) -> anyhow::Result<()> {
    let mut data_capture = DataCaptureConfig::for_destination(args.data_capture_uri)
        .with_sampling_percentage(args.sampling_percentage)?;
    if !args.capture_modes.is_empty() {
        data_capture = data_capture.with_capture_modes(&args.capture_modes);
    }
    if args.disable_capture {
        data_capture = data_capture.disabled();
    }
    let policy = match args.metric_path {
        Some(raw) => PromotionPolicy::gated_on(MetricPath::parse(&raw)?).with_gate(args.gate),
        None => PromotionPolicy::always_update(),
    };
    let tags = param_map_from_pairs(&args.tags)?;

    let request = DeployRequest::new(
        args.model_package_group,
        args.endpoint_name,
        data_capture,
        args.role,
    )
    .with_instances(args.instance_type, args.instance_count)
    .with_policy(policy)
    .with_model_tags(key_value_list(Some(&tags))?);

    let outcome = workspace.deployer().deploy(&request).await?;
    info!(endpoint = %outcome.endpoint_name(), "Deploy complete");
    print_json(&outcome)
}

async fn run_compare_metrics_command(
    workspace: &Workspace,
    args: CompareMetricsArgs,
) -> anyhow::Result<()> {
    let path = MetricPath::parse(&args.metric_path)?;
    let new = workspace.metrics.fetch_manifest(&args.new).await?;
    let old = workspace.metrics.fetch_manifest(&args.old).await?;
    let comparison = args.gate.evaluate(&new, &old, &path)?;
    info!(comparison = %comparison, "Compared metrics");
    print_json(&comparison)
}

async fn run_registry_command(
    workspace: &Workspace,
    command: RegistrySubcommand,
) -> anyhow::Result<()> {
    let registry = &workspace.registry;
    match command {
        RegistrySubcommand::Register {
            group,
            metrics_uri,
            metrics_file,
            status,
        } => {
            if let (Some(uri), Some(file)) = (&metrics_uri, &metrics_file) {
                let bytes = std::fs::read(file)
                    .with_context(|| format!("Failed to read manifest {}", file.display()))?;
                let manifest = MetricsManifest::from_slice(&bytes)?;
                let path = workspace.metrics.put_manifest(uri, &manifest).await?;
                info!(uri = %uri, path = %path.display(), "Uploaded metrics manifest");
            }
            print_json(&registry.register(&group, metrics_uri, status).await?)
        }
        RegistrySubcommand::Approve { arn } => print_json(
            &registry
                .update_approval_status(&arn, ApprovalStatus::Approved)
                .await?,
        ),
        RegistrySubcommand::Reject { arn } => print_json(
            &registry
                .update_approval_status(&arn, ApprovalStatus::Rejected)
                .await?,
        ),
        RegistrySubcommand::List { group } => print_json(&registry.list_group(&group).await),
    }
}
