//! The endpoint update decision.
//!
//! ```text
//! NoMetricSupplied ──────────────────────────────▶ Decided(Update)
//! MetricSupplied(path) ── compare(new, old) ──┬──▶ Decided(Update)
//!                                             └──▶ Decided(Skip)
//! ```
//!
//! Without a metric path the endpoint is always refreshed with the latest
//! approved package.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::MetricPathError;
use crate::metrics::{ComparisonGate, MetricComparison, MetricPath, MetricsManifest};

/// Why an update was decided.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum UpdateReason {
    /// No metric path was supplied; the endpoint is always refreshed.
    AlwaysRefresh,
    /// The candidate's metric passed the gate.
    MetricNotWorse { comparison: MetricComparison },
}

/// Result of the decision procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Update(UpdateReason),
    Skip { comparison: MetricComparison },
}

impl Decision {
    pub fn is_update(&self) -> bool {
        matches!(self, Decision::Update(_))
    }

    /// The metric comparison behind the decision, if one was made.
    pub fn comparison(&self) -> Option<&MetricComparison> {
        match self {
            Decision::Update(UpdateReason::AlwaysRefresh) => None,
            Decision::Update(UpdateReason::MetricNotWorse { comparison }) => Some(comparison),
            Decision::Skip { comparison } => Some(comparison),
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Update(UpdateReason::AlwaysRefresh) => {
                write!(f, "update (no metric supplied)")
            }
            Decision::Update(UpdateReason::MetricNotWorse { comparison }) => {
                write!(f, "update ({})", comparison)
            }
            Decision::Skip { comparison } => write!(f, "skip ({})", comparison),
        }
    }
}

/// States of the decision procedure.
#[derive(Debug, Clone, PartialEq)]
pub enum DecisionState {
    NoMetricSupplied,
    MetricSupplied(MetricPath),
    Decided(Decision),
}

/// Which metric gates promotion and how.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromotionPolicy {
    /// Metric to compare; `None` means always update.
    pub metric: Option<MetricPath>,
    pub gate: ComparisonGate,
}

impl PromotionPolicy {
    /// Policy that always updates.
    pub fn always_update() -> Self {
        Self::default()
    }

    /// Policy gated on `metric` with the default `>=` gate.
    pub fn gated_on(metric: MetricPath) -> Self {
        Self {
            metric: Some(metric),
            gate: ComparisonGate::default(),
        }
    }

    pub fn with_gate(mut self, gate: ComparisonGate) -> Self {
        self.gate = gate;
        self
    }

    /// Initial state of the procedure under this policy.
    pub fn initial_state(&self) -> DecisionState {
        match &self.metric {
            None => DecisionState::NoMetricSupplied,
            Some(path) => DecisionState::MetricSupplied(path.clone()),
        }
    }

    /// Whether deciding needs the candidate's and the deployed manifests.
    pub fn needs_manifests(&self) -> bool {
        self.metric.is_some()
    }

    /// Advances the procedure by one transition. `Decided` is terminal.
    pub fn step(
        &self,
        state: DecisionState,
        candidate: &MetricsManifest,
        deployed: &MetricsManifest,
    ) -> Result<DecisionState, MetricPathError> {
        let decision = match state {
            DecisionState::NoMetricSupplied => Decision::Update(UpdateReason::AlwaysRefresh),
            DecisionState::MetricSupplied(path) => {
                let comparison = self.gate.evaluate(candidate, deployed, &path)?;
                if comparison.passed {
                    Decision::Update(UpdateReason::MetricNotWorse { comparison })
                } else {
                    Decision::Skip { comparison }
                }
            }
            decided @ DecisionState::Decided(_) => return Ok(decided),
        };
        Ok(DecisionState::Decided(decision))
    }

    /// Decides between updating and skipping.
    ///
    /// With no metric path the manifests are ignored and the result is
    /// always `Update`. Otherwise a metric missing from either manifest is
    /// an error, never a default.
    pub fn decide(
        &self,
        candidate: &MetricsManifest,
        deployed: &MetricsManifest,
    ) -> Result<Decision, MetricPathError> {
        let mut state = self.initial_state();
        loop {
            state = match self.step(state, candidate, deployed)? {
                DecisionState::Decided(decision) => return Ok(decision),
                next => next,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manifest(mse: f64) -> MetricsManifest {
        MetricsManifest::new(json!({"regression_metrics": {"mse": {"value": mse}}}))
    }

    fn mse_policy() -> PromotionPolicy {
        PromotionPolicy::gated_on(MetricPath::parse("regression_metrics/mse/value").unwrap())
    }

    #[test]
    fn test_no_metric_always_updates() {
        let policy = PromotionPolicy::always_update();
        assert_eq!(policy.initial_state(), DecisionState::NoMetricSupplied);
        assert!(!policy.needs_manifests());

        let empty = MetricsManifest::new(json!({}));
        let decision = policy.decide(&empty, &manifest(1.0)).unwrap();
        assert_eq!(decision, Decision::Update(UpdateReason::AlwaysRefresh));
        assert!(decision.comparison().is_none());

        let junk = MetricsManifest::new(json!("not a mapping"));
        assert!(policy.decide(&junk, &junk).unwrap().is_update());
    }

    #[test]
    fn test_equal_metric_updates() {
        let decision = mse_policy().decide(&manifest(4.0), &manifest(4.0)).unwrap();
        assert!(decision.is_update());
        assert!(decision.comparison().unwrap().passed);
    }

    #[test]
    fn test_worse_metric_skips() {
        let decision = mse_policy().decide(&manifest(3.0), &manifest(4.0)).unwrap();
        match decision {
            Decision::Skip { comparison } => {
                assert_eq!(comparison.new_value, 3.0);
                assert_eq!(comparison.old_value, 4.0);
            }
            other => panic!("expected skip, got {:?}", other),
        }
    }

    #[test]
    fn test_strict_gate_skips_on_tie() {
        let policy = mse_policy().with_gate(ComparisonGate::StrictlyGreater);
        assert!(!policy
            .decide(&manifest(4.0), &manifest(4.0))
            .unwrap()
            .is_update());
    }

    #[test]
    fn test_missing_metric_is_an_error() {
        let other = MetricsManifest::new(json!({"regression_metrics": {"rmse": {"value": 1.0}}}));
        assert!(matches!(
            mse_policy().decide(&other, &manifest(4.0)),
            Err(MetricPathError::MissingKey { .. })
        ));
    }

    #[test]
    fn test_step_reaches_terminal_state() {
        let policy = mse_policy();
        let (new, old) = (manifest(5.0), manifest(4.0));

        let decided = policy.step(policy.initial_state(), &new, &old).unwrap();
        let decision = match &decided {
            DecisionState::Decided(decision) => decision.clone(),
            other => panic!("expected decided state, got {:?}", other),
        };
        assert!(decision.is_update());
        assert_eq!(policy.step(decided.clone(), &new, &old).unwrap(), decided);

        let refreshed = PromotionPolicy::always_update()
            .step(DecisionState::NoMetricSupplied, &new, &old)
            .unwrap();
        assert_eq!(
            refreshed,
            DecisionState::Decided(Decision::Update(UpdateReason::AlwaysRefresh))
        );
    }

    #[test]
    fn test_decision_serializes_with_reason() {
        let decision = Decision::Update(UpdateReason::AlwaysRefresh);
        assert_eq!(
            serde_json::to_value(&decision).unwrap(),
            json!({"decision": "update", "reason": "always_refresh"})
        );
    }
}
