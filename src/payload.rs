//! Typed views over stage payloads.
//!
//! Payloads arrive as free-form JSON. Each stage has a known shape; decoding
//! is lenient field by field, so a payload with a missing or mistyped field
//! still shows what it has. A payload that is not a JSON object decodes to
//! nothing.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

use crate::stage::StageName;

/// Decode a field, falling back to its default when the value has the wrong
/// shape.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Requestor {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub email: Option<String>,
}

/// Payload of the submission stage.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RequestPayload {
    #[serde(default, deserialize_with = "lenient")]
    pub customer_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub request_type: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub requestor: Option<Requestor>,
    #[serde(default, deserialize_with = "lenient")]
    pub reason: Option<String>,
}

/// Payload of the AI analysis stage.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AnalysisPayload {
    #[serde(default, deserialize_with = "lenient")]
    pub recommendation: Option<String>,
    /// 0.0 to 1.0
    #[serde(default, deserialize_with = "lenient")]
    pub confidence: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub rationale: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub key_metrics: BTreeMap<String, serde_json::Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub risk_signals: Vec<String>,
}

impl AnalysisPayload {
    /// Confidence as a whole percentage, if present.
    pub fn confidence_percent(&self) -> Option<u32> {
        self.confidence
            .filter(|c| c.is_finite())
            .map(|c| (c.clamp(0.0, 1.0) * 100.0).round() as u32)
    }

    /// Whether the recommendation favours the requester.
    pub fn is_favourable(&self) -> Option<bool> {
        let rec = self.recommendation.as_deref()?;
        if rec.contains("RELEASE") || rec.contains("FULL") || rec.contains("PARTIAL") {
            Some(true)
        } else if rec.contains("MAINTAIN") || rec.contains("REJECT") {
            Some(false)
        } else {
            None
        }
    }
}

/// Payload of the human approval stage.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ApprovalPayload {
    #[serde(default, deserialize_with = "lenient")]
    pub decision: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub approved_limit: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub comments: Option<String>,
}

/// Payload of the ERP update stage.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SystemUpdatePayload {
    #[serde(default, deserialize_with = "lenient")]
    pub action_taken: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub sap_reference_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub success: Option<bool>,
}

/// Payload of the notification stage.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NotificationPayload {
    #[serde(default, deserialize_with = "lenient")]
    pub email_sent_to: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub subject: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub timestamp: Option<String>,
}

/// A payload decoded according to its stage.
#[derive(Debug, Clone, PartialEq)]
pub enum StagePayload {
    Request(RequestPayload),
    Analysis(AnalysisPayload),
    Approval(ApprovalPayload),
    SystemUpdate(SystemUpdatePayload),
    Notification(NotificationPayload),
}

impl StagePayload {
    /// Decode `value` as the payload of `stage`.
    pub fn decode(stage: StageName, value: &serde_json::Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        let decoded = match stage {
            StageName::RequestSubmitted => {
                StagePayload::Request(RequestPayload::deserialize(value).ok()?)
            }
            StageName::AIAnalysis => {
                StagePayload::Analysis(AnalysisPayload::deserialize(value).ok()?)
            }
            StageName::HumanApproval => {
                StagePayload::Approval(ApprovalPayload::deserialize(value).ok()?)
            }
            StageName::SystemUpdate => {
                StagePayload::SystemUpdate(SystemUpdatePayload::deserialize(value).ok()?)
            }
            StageName::Notification => {
                StagePayload::Notification(NotificationPayload::deserialize(value).ok()?)
            }
        };
        Some(decoded)
    }

    /// Short `label: value` lines describing the payload.
    pub fn detail_lines(&self) -> Vec<(&'static str, String)> {
        let mut lines = Vec::new();
        match self {
            StagePayload::Request(p) => {
                if let Some(kind) = &p.request_type {
                    lines.push(("Type", kind.clone()));
                }
                if let Some(name) = p.requestor.as_ref().and_then(|r| r.name.clone()) {
                    lines.push(("Requestor", name));
                }
            }
            StagePayload::Analysis(p) => {
                if let Some(rec) = &p.recommendation {
                    lines.push(("Recommendation", rec.clone()));
                }
                if let Some(pct) = p.confidence_percent() {
                    lines.push(("Confidence", format!("{}%", pct)));
                }
            }
            StagePayload::Approval(p) => {
                if let Some(decision) = &p.decision {
                    lines.push(("Decision", decision.replace('_', " ")));
                }
                if let Some(limit) = p.approved_limit {
                    lines.push(("Approved Limit", format_crore(limit)));
                }
            }
            StagePayload::SystemUpdate(p) => {
                lines.push((
                    "Action",
                    p.action_taken.clone().unwrap_or_else(|| "No action".to_string()),
                ));
                lines.push((
                    "SAP Ref",
                    p.sap_reference_id.clone().unwrap_or_else(|| "N/A".to_string()),
                ));
            }
            StagePayload::Notification(p) => {
                if let Some(to) = &p.email_sent_to {
                    lines.push(("Sent to", to.clone()));
                }
                if let Some(subject) = &p.subject {
                    lines.push(("Subject", subject.clone()));
                }
            }
        }
        lines
    }
}

/// Format an INR amount in crores, e.g. `50000000.0` -> `"₹5.0Cr"`.
pub fn format_crore(amount: f64) -> String {
    format!("₹{:.1}Cr", amount / 10_000_000.0)
}
