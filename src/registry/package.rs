use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Prefix of model package ARNs issued by the local registry.
pub const LOCAL_PACKAGE_ARN_PREFIX: &str = "arn:mlops:local:model-package";

/// Approval status of a model package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApprovalStatus {
    Approved,
    PendingManualApproval,
    Rejected,
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ApprovalStatus::Approved => "Approved",
            ApprovalStatus::PendingManualApproval => "PendingManualApproval",
            ApprovalStatus::Rejected => "Rejected",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for ApprovalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "approved" => Ok(ApprovalStatus::Approved),
            "pendingmanualapproval" | "pending" => Ok(ApprovalStatus::PendingManualApproval),
            "rejected" => Ok(ApprovalStatus::Rejected),
            other => Err(format!("Unknown approval status '{}'", other)),
        }
    }
}

/// A registered, versioned model artifact.
///
/// Everything except the approval status is fixed at registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPackage {
    /// ARN-like identifier.
    pub arn: String,
    /// Group the package belongs to.
    pub group_name: String,
    /// Version within the group, starting at 1.
    pub version: u32,
    /// Current approval status.
    pub approval_status: ApprovalStatus,
    /// Registration time.
    pub created_at: DateTime<Utc>,
    /// Storage URI of the evaluation metrics manifest, if one was published.
    pub metrics_uri: Option<String>,
}

impl ModelPackage {
    /// Create a package in `PendingManualApproval` status.
    pub fn new(group_name: impl Into<String>, version: u32, metrics_uri: Option<String>) -> Self {
        let group_name = group_name.into();
        Self {
            arn: package_arn(&group_name, version),
            group_name,
            version,
            approval_status: ApprovalStatus::PendingManualApproval,
            created_at: Utc::now(),
            metrics_uri,
        }
    }

    /// Set the approval status.
    pub fn with_status(mut self, status: ApprovalStatus) -> Self {
        self.approval_status = status;
        self
    }

    /// Set the creation time.
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn is_approved(&self) -> bool {
        self.approval_status == ApprovalStatus::Approved
    }
}

/// Builds the ARN for version `version` of `group_name`.
pub fn package_arn(group_name: &str, version: u32) -> String {
    format!("{}/{}/{}", LOCAL_PACKAGE_ARN_PREFIX, group_name, version)
}
