//! Stage schema for the credit approval workflow.
//!
//! The pipeline has exactly five stages in a fixed order. Events arrive from
//! the backend keyed by a human-readable step label; this module owns the
//! mapping between those labels and [`StageName`], plus the lenient decoding
//! of a single wire event into a [`WorkflowEvent`].

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// One step of the workflow pipeline.
///
/// Declaration order is pipeline order. Nothing in this crate re-sorts stages
/// from input data; iterate [`StageName::ALL`] when order matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StageName {
    RequestSubmitted,
    AIAnalysis,
    HumanApproval,
    SystemUpdate,
    Notification,
}

impl StageName {
    /// All stages in pipeline order.
    pub const ALL: [StageName; 5] = [
        StageName::RequestSubmitted,
        StageName::AIAnalysis,
        StageName::HumanApproval,
        StageName::SystemUpdate,
        StageName::Notification,
    ];

    /// The step label the backend uses for this stage.
    pub fn label(&self) -> &'static str {
        match self {
            StageName::RequestSubmitted => "Credit Block Request",
            StageName::AIAnalysis => "AI Analysis & Recommendation",
            StageName::HumanApproval => "Human Approval",
            StageName::SystemUpdate => "SAP Update",
            StageName::Notification => "Notification",
        }
    }

    /// Resolve a backend step label (or a variant name) to a stage.
    ///
    /// Returns `None` for labels outside the pipeline; callers drop those
    /// events rather than failing.
    pub fn from_label(label: &str) -> Option<Self> {
        let trimmed = label.trim();
        StageName::ALL.into_iter().find(|stage| {
            stage.label().eq_ignore_ascii_case(trimmed)
                || stage.variant_name().eq_ignore_ascii_case(trimmed)
        })
    }

    /// 1-based position in the pipeline.
    pub fn position(&self) -> usize {
        StageName::ALL
            .iter()
            .position(|s| s == self)
            .map_or(0, |idx| idx + 1)
    }

    fn variant_name(&self) -> &'static str {
        match self {
            StageName::RequestSubmitted => "RequestSubmitted",
            StageName::AIAnalysis => "AIAnalysis",
            StageName::HumanApproval => "HumanApproval",
            StageName::SystemUpdate => "SystemUpdate",
            StageName::Notification => "Notification",
        }
    }
}

impl std::fmt::Display for StageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Status carried by a received event. `Pending` is never received; it is
/// only derived for stages without an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventStatus {
    InProgress,
    Completed,
    Rejected,
}

impl EventStatus {
    /// Parse a backend status string. Returns `None` for anything that is not
    /// an in-flight or finished status (including `"Pending"`).
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "inprogress" => Some(EventStatus::InProgress),
            "completed" => Some(EventStatus::Completed),
            "rejected" => Some(EventStatus::Rejected),
            _ => None,
        }
    }
}

/// Who acted on a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Actor {
    AI,
    Human,
    System,
}

impl Actor {
    /// Parse a backend actor string. The backend reports the ERP update as
    /// `"SAP"`, which is the system actor.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "ai" => Some(Actor::AI),
            "human" => Some(Actor::Human),
            "system" | "sap" => Some(Actor::System),
            _ => None,
        }
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Actor::AI => write!(f, "AI"),
            Actor::Human => write!(f, "Human"),
            Actor::System => write!(f, "System"),
        }
    }
}

/// A stage event as observed by the client. Immutable once received.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowEvent {
    pub stage: StageName,
    pub status: EventStatus,
    pub actor: Option<Actor>,
    pub timestamp: Option<DateTime<Utc>>,
    pub payload: Option<serde_json::Value>,
}

/// Wire shape of an event. Every field is optional so one malformed entry
/// never fails the whole list.
#[derive(Debug, Default, Deserialize)]
struct RawWorkflowEvent {
    #[serde(default, alias = "stage")]
    step: Option<serde_json::Value>,
    #[serde(default)]
    status: Option<serde_json::Value>,
    #[serde(default)]
    actor: Option<serde_json::Value>,
    #[serde(default)]
    timestamp: Option<serde_json::Value>,
    #[serde(default)]
    payload: Option<serde_json::Value>,
}

impl WorkflowEvent {
    /// Decode one event from its JSON form.
    ///
    /// Returns `None` when the step is unknown or the status is not one of
    /// in-progress/completed/rejected. Unparseable actor or timestamp values
    /// are treated as absent, and a `null` payload is absent.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        let raw = RawWorkflowEvent::deserialize(value).ok()?;
        let stage = StageName::from_label(raw.step.as_ref()?.as_str()?)?;
        let status = EventStatus::parse(raw.status.as_ref()?.as_str()?)?;
        Some(Self {
            stage,
            status,
            actor: raw
                .actor
                .as_ref()
                .and_then(|v| v.as_str())
                .and_then(Actor::parse),
            timestamp: raw
                .timestamp
                .as_ref()
                .and_then(|v| v.as_str())
                .and_then(parse_timestamp),
            payload: raw.payload.filter(|p| !p.is_null()),
        })
    }

    /// Decode a response body into events, dropping entries that do not
    /// describe a known stage. A body that is not a JSON array yields no
    /// events.
    pub fn list_from_value(value: &serde_json::Value) -> Vec<Self> {
        match value.as_array() {
            Some(items) => items.iter().filter_map(Self::from_value).collect(),
            None => Vec::new(),
        }
    }
}

/// Parse an ISO-8601 timestamp. Offset-less values (the backend emits local
/// naive datetimes) are read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stage_order_is_pipeline_order() {
        assert_eq!(StageName::ALL[0], StageName::RequestSubmitted);
        assert_eq!(StageName::ALL[4], StageName::Notification);
        let positions: Vec<usize> = StageName::ALL.iter().map(|s| s.position()).collect();
        assert_eq!(positions, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_from_label_accepts_backend_labels_and_variant_names() {
        assert_eq!(
            StageName::from_label("AI Analysis & Recommendation"),
            Some(StageName::AIAnalysis)
        );
        assert_eq!(StageName::from_label("SAP Update"), Some(StageName::SystemUpdate));
        assert_eq!(
            StageName::from_label("humanapproval"),
            Some(StageName::HumanApproval)
        );
        assert_eq!(StageName::from_label("Escalation"), None);
    }

    #[test]
    fn test_event_status_parse() {
        assert_eq!(EventStatus::parse("In Progress"), Some(EventStatus::InProgress));
        assert_eq!(EventStatus::parse("in_progress"), Some(EventStatus::InProgress));
        assert_eq!(EventStatus::parse("Completed"), Some(EventStatus::Completed));
        assert_eq!(EventStatus::parse("REJECTED"), Some(EventStatus::Rejected));
        assert_eq!(EventStatus::parse("Pending"), None);
    }

    #[test]
    fn test_actor_parse_maps_sap_to_system() {
        assert_eq!(Actor::parse("SAP"), Some(Actor::System));
        assert_eq!(Actor::parse("AI"), Some(Actor::AI));
        assert_eq!(Actor::parse("robot"), None);
    }

    #[test]
    fn test_event_from_backend_json() {
        let value = json!({
            "step": "Human Approval",
            "status": "Completed",
            "timestamp": "2025-01-15T10:30:00.123456",
            "actor": "Human",
            "payload": {"decision": "APPROVE"}
        });
        let event = WorkflowEvent::from_value(&value).unwrap();
        assert_eq!(event.stage, StageName::HumanApproval);
        assert_eq!(event.status, EventStatus::Completed);
        assert_eq!(event.actor, Some(Actor::Human));
        assert_eq!(
            event.timestamp.unwrap().to_rfc3339(),
            "2025-01-15T10:30:00.123456+00:00"
        );
        assert_eq!(event.payload.unwrap()["decision"], "APPROVE");
    }

    #[test]
    fn test_event_with_malformed_optional_fields_degrades_to_absent() {
        let value = json!({
            "step": "SAP Update",
            "status": "In Progress",
            "timestamp": "yesterday",
            "actor": 42,
            "payload": null
        });
        let event = WorkflowEvent::from_value(&value).unwrap();
        assert_eq!(event.stage, StageName::SystemUpdate);
        assert_eq!(event.actor, None);
        assert_eq!(event.timestamp, None);
        assert_eq!(event.payload, None);

        let value = json!({"step": "SAP Update", "status": "In Progress", "actor": "robot"});
        assert_eq!(WorkflowEvent::from_value(&value).unwrap().actor, None);
    }

    #[test]
    fn test_event_without_step_or_status_is_dropped() {
        assert!(WorkflowEvent::from_value(&json!({"status": "Completed"})).is_none());
        assert!(WorkflowEvent::from_value(&json!({"step": "Notification"})).is_none());
        assert!(
            WorkflowEvent::from_value(&json!({"step": "Notification", "status": "Pending"}))
                .is_none()
        );
    }

    #[test]
    fn test_list_from_value_skips_unknown_stages() {
        let body = json!([
            {"step": "Credit Block Request", "status": "Completed", "actor": "Human"},
            {"step": "Escalation", "status": "Completed"},
            "garbage"
        ]);
        let events = WorkflowEvent::list_from_value(&body);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].stage, StageName::RequestSubmitted);

        assert!(WorkflowEvent::list_from_value(&json!({"detail": "x"})).is_empty());
    }

    #[test]
    fn test_parse_timestamp_with_offset() {
        let ts = parse_timestamp("2025-01-15T10:30:00+05:30").unwrap();
        assert_eq!(ts.to_rfc3339(), "2025-01-15T05:00:00+00:00");
    }
}
