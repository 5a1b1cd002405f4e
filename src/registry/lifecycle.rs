use std::collections::HashMap;
use tracing::info;

use crate::error::PlatformError;
use crate::registry::package::{ApprovalStatus, ModelPackage};

/// Enforces the allowed approval-status transitions of model packages.
pub struct ApprovalLifecycle {
    valid_transitions: HashMap<ApprovalStatus, Vec<ApprovalStatus>>,
}

impl ApprovalLifecycle {
    /// Create a lifecycle with the standard transition rules.
    ///
    /// Valid transitions:
    /// - PendingManualApproval -> Approved
    /// - PendingManualApproval -> Rejected
    /// - Approved -> Rejected (to pull a package back)
    /// - Rejected -> Approved (to reinstate a package)
    pub fn new() -> Self {
        let mut valid_transitions = HashMap::new();

        valid_transitions.insert(
            ApprovalStatus::PendingManualApproval,
            vec![ApprovalStatus::Approved, ApprovalStatus::Rejected],
        );
        valid_transitions.insert(ApprovalStatus::Approved, vec![ApprovalStatus::Rejected]);
        valid_transitions.insert(ApprovalStatus::Rejected, vec![ApprovalStatus::Approved]);

        Self { valid_transitions }
    }

    /// Check if a transition between two statuses is allowed.
    pub fn can_transition(&self, from: ApprovalStatus, to: ApprovalStatus) -> bool {
        self.valid_transitions
            .get(&from)
            .map(|targets| targets.contains(&to))
            .unwrap_or(false)
    }

    /// Move a package to `new_status`.
    ///
    /// # Errors
    /// Returns `InvalidApprovalTransition` if the transition is not allowed.
    pub fn transition(
        &self,
        package: &mut ModelPackage,
        new_status: ApprovalStatus,
    ) -> Result<(), PlatformError> {
        let current = package.approval_status;
        if !self.can_transition(current, new_status) {
            return Err(PlatformError::InvalidApprovalTransition {
                arn: package.arn.clone(),
                status: current.to_string(),
            });
        }

        package.approval_status = new_status;
        info!(
            arn = %package.arn,
            from = %current,
            to = %new_status,
            "Model package approval status changed"
        );
        Ok(())
    }
}

impl Default for ApprovalLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
