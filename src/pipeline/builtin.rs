//! Built-in pipeline kinds.

use serde_json::json;

use super::config::PipelineConfig;
use super::definition::{
    processing_arguments, step_cache, PipelineDefinition, PipelineParameter, PipelineStep,
    StepKind, PROCESSING_CONTAINER_DIR,
};

/// Split outputs shared by both built-in pipelines.
const SPLIT_OUTPUTS: [&str; 4] = [
    "train-dataset-data",
    "train-dataset-labels",
    "test-dataset-data",
    "test-dataset-labels",
];

fn container_path(name: &str) -> String {
    format!("{}/{}", PROCESSING_CONTAINER_DIR, name)
}

fn input_parameters(config: &PipelineConfig) -> [PipelineParameter; 2] {
    [
        PipelineParameter::string("InputDataUri", config.inputs.data_uri.clone()),
        PipelineParameter::string("InputLabelUri", config.inputs.label_uri.clone()),
    ]
}

fn split_step(config: &PipelineConfig) -> PipelineStep {
    let mut job_arguments = vec![
        "split".to_string(),
        "--input-data-path".to_string(),
        container_path("data"),
        "--input-label-path".to_string(),
        container_path("label"),
    ];
    for output in SPLIT_OUTPUTS {
        job_arguments.push(format!("--output-{}", output));
        job_arguments.push(container_path(output));
    }

    PipelineStep {
        name: "Split".to_string(),
        kind: StepKind::Processing,
        depends_on: Vec::new(),
        arguments: processing_arguments(
            config,
            &[
                ("data", json!({"Get": "Parameters.InputDataUri"})),
                ("label", json!({"Get": "Parameters.InputLabelUri"})),
            ],
            &SPLIT_OUTPUTS,
            &job_arguments,
        ),
        cache_config: step_cache(config),
    }
}

/// Reference to an output of the split step.
fn split_output(name: &str) -> serde_json::Value {
    json!({
        "Get": format!(
            "Steps.Split.ProcessingOutputConfig.Outputs['{}'].S3Output.S3Uri",
            name
        )
    })
}

/// Single processing step splitting the input data into train and test sets.
pub fn processing_pipeline(name: &str, config: &PipelineConfig) -> PipelineDefinition {
    let [data, label] = input_parameters(config);
    PipelineDefinition::new(name)
        .with_parameter(data)
        .with_parameter(label)
        .with_step(split_step(config))
}

/// Split, train, evaluate and register a model package.
///
/// The evaluation step writes the metrics manifest that endpoint promotion
/// compares against; its URI is attached to the registered package.
pub fn training_pipeline(name: &str, config: &PipelineConfig) -> PipelineDefinition {
    let [data, label] = input_parameters(config);
    let group = PipelineParameter::string("ModelPackageGroupName", Some(name.to_string()));

    let train = PipelineStep {
        name: "Train".to_string(),
        kind: StepKind::Training,
        depends_on: vec!["Split".to_string()],
        arguments: json!({
            "ResourceConfig": {
                "InstanceType": config.processing.instance_type,
                "InstanceCount": config.processing.instance_count,
            },
            "RoleArn": config.pipeline.role,
            "InputDataConfig": [
                {"ChannelName": "train-data", "S3Uri": split_output("train-dataset-data")},
                {"ChannelName": "train-labels", "S3Uri": split_output("train-dataset-labels")},
            ],
        }),
        cache_config: step_cache(config),
    };

    let evaluate = PipelineStep {
        name: "Evaluate".to_string(),
        kind: StepKind::Processing,
        depends_on: vec!["Train".to_string()],
        arguments: processing_arguments(
            config,
            &[
                ("model", json!({"Get": "Steps.Train.ModelArtifacts.S3ModelArtifacts"})),
                ("test-data", split_output("test-dataset-data")),
                ("test-labels", split_output("test-dataset-labels")),
            ],
            &["evaluation"],
            &[
                "evaluate".to_string(),
                "--output-metrics-path".to_string(),
                format!("{}/evaluation.json", container_path("evaluation")),
            ],
        ),
        cache_config: None,
    };

    let register = PipelineStep {
        name: "Register".to_string(),
        kind: StepKind::RegisterModel,
        depends_on: vec!["Evaluate".to_string()],
        arguments: json!({
            "ModelPackageGroupName": {"Get": "Parameters.ModelPackageGroupName"},
            "ModelApprovalStatus": "PendingManualApproval",
            "ModelMetrics": {
                "ModelQuality": {
                    "Statistics": {
                        "ContentType": "application/json",
                        "S3Uri": {
                            "Get": "Steps.Evaluate.ProcessingOutputConfig.Outputs['evaluation'].S3Output.S3Uri"
                        },
                    },
                },
            },
        }),
        cache_config: None,
    };

    PipelineDefinition::new(name)
        .with_parameter(data)
        .with_parameter(label)
        .with_parameter(group)
        .with_step(split_step(config))
        .with_step(train)
        .with_step(evaluate)
        .with_step(register)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PipelineConfig {
        PipelineConfig::default().with_role("arn:role")
    }

    #[test]
    fn test_processing_pipeline() {
        let definition = processing_pipeline("abalone-process", &config());
        assert_eq!(definition.name, "abalone-process");
        assert_eq!(definition.steps.len(), 1);

        let split = definition.step("Split").unwrap();
        let args = split.arguments["AppSpecification"]["ContainerArguments"]
            .as_array()
            .unwrap();
        assert_eq!(args[0], "split");
        assert!(args.iter().any(|a| a == "--output-test-dataset-labels"));
    }

    #[test]
    fn test_training_pipeline_step_order() {
        let definition = training_pipeline("abalone-train", &config());
        let names: Vec<&str> = definition.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Split", "Train", "Evaluate", "Register"]);
        assert_eq!(definition.step("Register").unwrap().depends_on, vec!["Evaluate"]);
        assert_eq!(
            definition.parameters[2].default_value.as_deref(),
            Some("abalone-train")
        );
    }

    #[test]
    fn test_input_defaults_come_from_config() {
        let mut config = config();
        config.inputs.data_uri = Some("s3://bucket/data.csv".to_string());
        let definition = processing_pipeline("p", &config);
        assert_eq!(
            definition.parameters[0].default_value.as_deref(),
            Some("s3://bucket/data.csv")
        );
        assert!(definition.parameters[1].default_value.is_none());
    }
}
