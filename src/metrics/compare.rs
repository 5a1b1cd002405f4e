//! Comparison of a metric between a candidate and a deployed model.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::manifest::{resolve, MetricPath, MetricsManifest};
use crate::error::MetricPathError;

/// How the candidate value must relate to the deployed value to pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComparisonGate {
    /// `new >= old`: equal values count as "not worse".
    #[default]
    AtLeast,
    /// `new > old`: the candidate must strictly improve.
    StrictlyGreater,
}

impl ComparisonGate {
    /// Applies the gate to two resolved values.
    pub fn passes(self, new_value: f64, old_value: f64) -> bool {
        match self {
            ComparisonGate::AtLeast => new_value >= old_value,
            ComparisonGate::StrictlyGreater => new_value > old_value,
        }
    }

    /// Resolves `path` in both manifests and applies the gate.
    pub fn evaluate(
        self,
        new: &MetricsManifest,
        old: &MetricsManifest,
        path: &MetricPath,
    ) -> Result<MetricComparison, MetricPathError> {
        let new_value = resolve(new, path)?;
        let old_value = resolve(old, path)?;
        Ok(MetricComparison {
            path: path.to_string(),
            new_value,
            old_value,
            gate: self,
            passed: self.passes(new_value, old_value),
        })
    }

    fn symbol(self) -> &'static str {
        match self {
            ComparisonGate::AtLeast => ">=",
            ComparisonGate::StrictlyGreater => ">",
        }
    }
}

impl fmt::Display for ComparisonGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparisonGate::AtLeast => write!(f, "at-least"),
            ComparisonGate::StrictlyGreater => write!(f, "strictly-greater"),
        }
    }
}

impl FromStr for ComparisonGate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "at-least" | "ge" | ">=" => Ok(ComparisonGate::AtLeast),
            "strictly-greater" | "gt" | ">" => Ok(ComparisonGate::StrictlyGreater),
            other => Err(format!(
                "Unknown comparison gate '{}': expected 'at-least' or 'strictly-greater'",
                other
            )),
        }
    }
}

/// Outcome of comparing one metric between two manifests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricComparison {
    /// Slash-delimited metric path.
    pub path: String,
    /// Value in the candidate model's manifest.
    pub new_value: f64,
    /// Value in the deployed model's manifest.
    pub old_value: f64,
    /// Gate that was applied.
    pub gate: ComparisonGate,
    /// Whether the candidate passed the gate.
    pub passed: bool,
}

impl fmt::Display for MetricComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: new {} {} old {} -> {}",
            self.path,
            self.new_value,
            self.gate.symbol(),
            self.old_value,
            if self.passed { "passed" } else { "failed" }
        )
    }
}

/// Returns whether the new model's metric is greater than or equal to the
/// deployed model's metric at `path`.
pub fn compare_metrics(
    new: &MetricsManifest,
    old: &MetricsManifest,
    path: &MetricPath,
) -> Result<bool, MetricPathError> {
    ComparisonGate::AtLeast
        .evaluate(new, old, path)
        .map(|comparison| comparison.passed)
}
