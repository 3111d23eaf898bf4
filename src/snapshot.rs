//! Workflow status snapshot returned by the status endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::stage::parse_timestamp;

/// Overall state of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    /// Workflow is still executing stages
    #[default]
    Running,
    /// Workflow finished and produced a summary
    Completed,
    /// Workflow aborted in the backend
    Failed,
}

impl OverallStatus {
    /// Check if polling should stop on this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Parse a backend status string, case-insensitively.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverallStatus::Running => write!(f, "running"),
            OverallStatus::Completed => write!(f, "completed"),
            OverallStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Terminal summary attached to a completed workflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSummary {
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub workflow_summary: String,
    #[serde(default)]
    pub final_decision: String,
    #[serde(default)]
    pub final_credit_limit: Option<f64>,
    #[serde(default)]
    pub final_block_status: bool,
    #[serde(default)]
    pub demo_talk_track: Vec<String>,
}

impl WorkflowSummary {
    /// Whether the final decision approved the request.
    pub fn is_approved(&self) -> bool {
        self.final_decision.eq_ignore_ascii_case("APPROVED")
    }
}

/// One observation of a workflow's status.
///
/// `result` is only ever `Some` when `overall_status` is
/// [`OverallStatus::Completed`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowStatusSnapshot {
    pub request_id: String,
    pub overall_status: OverallStatus,
    pub result: Option<WorkflowSummary>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawStatus {
    #[serde(default)]
    status: Option<serde_json::Value>,
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    started_at: Option<serde_json::Value>,
    #[serde(default)]
    completed_at: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

impl WorkflowStatusSnapshot {
    /// Build a snapshot from the status endpoint body.
    ///
    /// The body does not carry the request id, so the caller supplies it.
    /// A missing or unknown `status` reads as `Running` so the poller keeps
    /// going; a `result` on a non-completed status is discarded.
    pub fn from_value(request_id: &str, value: &serde_json::Value) -> Self {
        let raw = RawStatus::deserialize(value).unwrap_or_default();

        let overall_status = raw
            .status
            .as_ref()
            .and_then(|v| v.as_str())
            .and_then(OverallStatus::parse)
            .unwrap_or_else(|| {
                tracing::warn!(
                    request_id,
                    "status response without a recognised status, treating as running"
                );
                OverallStatus::Running
            });

        let result = if overall_status == OverallStatus::Completed {
            raw.result
                .filter(|v| !v.is_null())
                .and_then(|v| serde_json::from_value::<WorkflowSummary>(v).ok())
        } else {
            None
        };

        let timestamp = |v: Option<serde_json::Value>| {
            v.as_ref()
                .and_then(|v| v.as_str())
                .and_then(parse_timestamp)
        };

        Self {
            request_id: request_id.to_string(),
            overall_status,
            result,
            started_at: timestamp(raw.started_at),
            completed_at: timestamp(raw.completed_at),
            error: raw
                .error
                .as_ref()
                .and_then(|v| v.as_str())
                .map(str::to_string),
        }
    }

    /// Shorthand for `overall_status.is_terminal()`.
    pub fn is_terminal(&self) -> bool {
        self.overall_status.is_terminal()
    }
}
