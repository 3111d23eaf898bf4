//! HTTP client for the credit workflow backend.
//!
//! The poller only needs the two read endpoints, so those sit behind the
//! [`WorkflowApi`] trait; tests substitute scripted implementations. The
//! remaining endpoints (start, approve, summary, health) are plain methods on
//! [`HttpWorkflowClient`] used by the command-line front end.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::FetchError;
use crate::snapshot::{WorkflowStatusSnapshot, WorkflowSummary};
use crate::stage::WorkflowEvent;

/// Read side of the backend contract consumed by the poller.
#[async_trait]
pub trait WorkflowApi: Send + Sync {
    /// `GET /api/workflow/status/{request_id}`
    async fn fetch_status(&self, request_id: &str) -> Result<WorkflowStatusSnapshot, FetchError>;

    /// `GET /api/workflow/events/{request_id}`
    async fn fetch_events(&self, request_id: &str) -> Result<Vec<WorkflowEvent>, FetchError>;
}

/// Approver decision kinds accepted by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Approve,
    ApproveWithChanges,
    Reject,
}

impl std::str::FromStr for Decision {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "approve" => Ok(Decision::Approve),
            "approve_with_changes" => Ok(Decision::ApproveWithChanges),
            "reject" => Ok(Decision::Reject),
            _ => anyhow::bail!(
                "Invalid decision '{}'. Valid values: approve, approve-with-changes, reject",
                s
            ),
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Approve => write!(f, "APPROVE"),
            Decision::ApproveWithChanges => write!(f, "APPROVE_WITH_CHANGES"),
            Decision::Reject => write!(f, "REJECT"),
        }
    }
}

/// Body of `POST /api/workflow/approve/{request_id}`.
#[derive(Debug, Clone, Serialize)]
pub struct ApproverDecision {
    pub decision: Decision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_limit: Option<f64>,
    pub comments: String,
}

/// Acknowledgement returned by the start and approve endpoints.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Acknowledgement {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub decision: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

/// reqwest-backed implementation of the backend contract.
#[derive(Debug, Clone)]
pub struct HttpWorkflowClient {
    client: Client,
    base_url: String,
}

impl HttpWorkflowClient {
    /// Create a client for `base_url` with a per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(FetchError::Transport)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `GET /health`
    pub async fn health(&self) -> Result<serde_json::Value, FetchError> {
        let response = self
            .client
            .get(self.url("/health"))
            .send()
            .await
            .map_err(FetchError::Transport)?;
        read_json(check_status(response).await?).await
    }

    /// `POST /api/workflow/start/{request_id}`
    pub async fn start_workflow(&self, request_id: &str) -> Result<Acknowledgement, FetchError> {
        let response = self
            .client
            .post(self.url(&format!("/api/workflow/start/{}", request_id)))
            .send()
            .await
            .map_err(FetchError::Transport)?;
        let body = read_json(check_status(response).await?).await?;
        serde_json::from_value(body).map_err(|e| FetchError::Decode(e.to_string()))
    }

    /// `POST /api/workflow/approve/{request_id}`
    pub async fn submit_approval(
        &self,
        request_id: &str,
        decision: &ApproverDecision,
    ) -> Result<Acknowledgement, FetchError> {
        let response = self
            .client
            .post(self.url(&format!("/api/workflow/approve/{}", request_id)))
            .json(decision)
            .send()
            .await
            .map_err(FetchError::Transport)?;
        let body = read_json(check_status(response).await?).await?;
        serde_json::from_value(body).map_err(|e| FetchError::Decode(e.to_string()))
    }

    /// `GET /api/workflow/summary/{request_id}`
    ///
    /// The backend answers 400 while the workflow is still running.
    pub async fn fetch_summary(&self, request_id: &str) -> Result<WorkflowSummary, FetchError> {
        let response = self
            .client
            .get(self.url(&format!("/api/workflow/summary/{}", request_id)))
            .send()
            .await
            .map_err(FetchError::Transport)?;
        let body = read_json(check_status(response).await?).await?;
        serde_json::from_value(body).map_err(|e| FetchError::Decode(e.to_string()))
    }
}

#[async_trait]
impl WorkflowApi for HttpWorkflowClient {
    async fn fetch_status(&self, request_id: &str) -> Result<WorkflowStatusSnapshot, FetchError> {
        let response = self
            .client
            .get(self.url(&format!("/api/workflow/status/{}", request_id)))
            .send()
            .await
            .map_err(FetchError::Transport)?;
        let body = read_json(check_status(response).await?).await?;
        if !body.is_object() {
            return Err(FetchError::Decode(format!(
                "status body is not a JSON object: {}",
                body
            )));
        }
        Ok(WorkflowStatusSnapshot::from_value(request_id, &body))
    }

    async fn fetch_events(&self, request_id: &str) -> Result<Vec<WorkflowEvent>, FetchError> {
        let response = self
            .client
            .get(self.url(&format!("/api/workflow/events/{}", request_id)))
            .send()
            .await
            .map_err(FetchError::Transport)?;
        let response = check_status(response).await?;
        let text = response.text().await.map_err(FetchError::Transport)?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let body: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| FetchError::Decode(e.to_string()))?;
        Ok(WorkflowEvent::list_from_value(&body))
    }
}

/// Map non-2xx responses to [`FetchError`], pulling FastAPI's `detail` field
/// out of the body when present.
async fn check_status(response: Response) -> Result<Response, FetchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.detail)
        .unwrap_or(body);
    if status == StatusCode::NOT_FOUND {
        Err(FetchError::NotFound { detail })
    } else {
        Err(FetchError::Status {
            status: status.as_u16(),
            body: detail,
        })
    }
}

async fn read_json(response: Response) -> Result<serde_json::Value, FetchError> {
    let text = response.text().await.map_err(FetchError::Transport)?;
    serde_json::from_str(&text).map_err(|e| FetchError::Decode(e.to_string()))
}
