//! Conversions from parameter maps into the platform's list shapes.
//!
//! Resource tags are sent as `[{"Key": .., "Value": ..}]` and pipeline
//! parameters as `[{"Name": .., "Value": ..}]`. Both preserve the insertion
//! order of the source map.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::InputError;

/// Insertion-ordered string map used for tags and pipeline parameters.
pub type ParamMap = IndexMap<String, String>;

/// A resource tag entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

/// A pipeline parameter entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NameValue {
    pub name: String,
    pub value: String,
}

/// Converts a map into `{Key, Value}` pairs.
///
/// A missing map is rejected rather than treated as empty.
pub fn key_value_list(params: Option<&ParamMap>) -> Result<Vec<KeyValue>, InputError> {
    let params = params.ok_or(InputError::MissingMapping)?;
    Ok(params
        .iter()
        .map(|(k, v)| KeyValue {
            key: k.clone(),
            value: v.clone(),
        })
        .collect())
}

/// Converts a map into `{Name, Value}` pairs.
pub fn name_value_list(params: Option<&ParamMap>) -> Result<Vec<NameValue>, InputError> {
    let params = params.ok_or(InputError::MissingMapping)?;
    Ok(params
        .iter()
        .map(|(k, v)| NameValue {
            name: k.clone(),
            value: v.clone(),
        })
        .collect())
}

/// Parses a `KEY=VALUE` argument. The value may itself contain `=`.
pub fn parse_key_value(pair: &str) -> Result<(String, String), InputError> {
    match pair.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(InputError::InvalidPair(pair.to_string())),
    }
}

/// Builds a [`ParamMap`] from `KEY=VALUE` arguments; later keys win.
pub fn param_map_from_pairs<S: AsRef<str>>(pairs: &[S]) -> Result<ParamMap, InputError> {
    let mut map = ParamMap::new();
    for pair in pairs {
        let (key, value) = parse_key_value(pair.as_ref())?;
        map.insert(key, value);
    }
    Ok(map)
}
