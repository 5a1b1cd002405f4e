//! Shared utility functions for mlops-utilities.
//!
//! Naming helpers for executions and pipelines, and conversions of parameter
//! maps into the list shapes the platform expects.

pub mod naming;
pub mod params;

pub use naming::{
    datetime_str, ensure_min_length, normalize_pipeline_name, timestamped_name, truncate_name,
    validate_resource_name, PIPELINE_NAME_MAX_LEN, RESOURCE_NAME_MAX_LEN,
};
pub use params::{
    key_value_list, name_value_list, param_map_from_pairs, parse_key_value, KeyValue, NameValue,
    ParamMap,
};
