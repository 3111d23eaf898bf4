//! Event reconciliation.
//!
//! Turns a sparse, unordered set of received events into exactly one
//! [`StageView`] per pipeline stage. Everything here is pure: no I/O, no
//! clocks, and the same input always yields the same output.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::stage::{Actor, EventStatus, StageName, WorkflowEvent};

/// Displayed status of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StageStatus {
    Pending,
    InProgress,
    Completed,
    Rejected,
}

impl From<EventStatus> for StageStatus {
    fn from(status: EventStatus) -> Self {
        match status {
            EventStatus::InProgress => StageStatus::InProgress,
            EventStatus::Completed => StageStatus::Completed,
            EventStatus::Rejected => StageStatus::Rejected,
        }
    }
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageStatus::Pending => write!(f, "Pending"),
            StageStatus::InProgress => write!(f, "In Progress"),
            StageStatus::Completed => write!(f, "Completed"),
            StageStatus::Rejected => write!(f, "Rejected"),
        }
    }
}

/// Derived per-stage view. A `Pending` view never carries actor, timestamp
/// or payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageView {
    pub name: StageName,
    pub status: StageStatus,
    pub actor: Option<Actor>,
    pub timestamp: Option<DateTime<Utc>>,
    pub payload: Option<serde_json::Value>,
}

impl StageView {
    /// View for a stage with no received event.
    pub fn pending(name: StageName) -> Self {
        Self {
            name,
            status: StageStatus::Pending,
            actor: None,
            timestamp: None,
            payload: None,
        }
    }

    fn from_event(event: &WorkflowEvent) -> Self {
        Self {
            name: event.stage,
            status: event.status.into(),
            actor: event.actor,
            timestamp: event.timestamp,
            payload: event.payload.clone(),
        }
    }
}

/// At most one event per stage, the most recently received one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageEvents {
    by_stage: BTreeMap<StageName, WorkflowEvent>,
}

impl StageEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the mapping from events in arrival order. A later event for a
    /// stage replaces an earlier one; timestamps are not consulted.
    pub fn from_events(events: impl IntoIterator<Item = WorkflowEvent>) -> Self {
        let mut mapping = Self::new();
        for event in events {
            mapping.insert(event);
        }
        mapping
    }

    /// Record an event, replacing any cached event for the same stage.
    pub fn insert(&mut self, event: WorkflowEvent) {
        self.by_stage.insert(event.stage, event);
    }

    /// Fold a fresher poll's events into this mapping.
    pub fn merge(&mut self, newer: StageEvents) {
        self.by_stage.extend(newer.by_stage);
    }

    pub fn get(&self, stage: StageName) -> Option<&WorkflowEvent> {
        self.by_stage.get(&stage)
    }

    pub fn len(&self) -> usize {
        self.by_stage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_stage.is_empty()
    }
}

/// Map received events onto the given stage order.
///
/// Emits one view per entry of `known_stages`, in that order. Events for
/// stages not listed are ignored.
pub fn reconcile(known_stages: &[StageName], events: &StageEvents) -> Vec<StageView> {
    known_stages
        .iter()
        .map(|&stage| match events.get(stage) {
            Some(event) => StageView::from_event(event),
            None => StageView::pending(stage),
        })
        .collect()
}

/// Reconcile against the full pipeline.
pub fn reconcile_pipeline(events: &StageEvents) -> Vec<StageView> {
    reconcile(&StageName::ALL, events)
}

/// Read-only queries over a reconciled view list.
pub struct Timeline<'a> {
    views: &'a [StageView],
}

impl<'a> Timeline<'a> {
    pub fn new(views: &'a [StageView]) -> Self {
        Self { views }
    }

    /// Look up the view for a stage.
    pub fn stage(&self, name: StageName) -> Option<&'a StageView> {
        self.views.iter().find(|v| v.name == name)
    }

    /// Whether a stage has received any event.
    pub fn has_event(&self, name: StageName) -> bool {
        self.stage(name)
            .is_some_and(|v| v.status != StageStatus::Pending)
    }

    pub fn completed_count(&self) -> usize {
        self.views
            .iter()
            .filter(|v| v.status == StageStatus::Completed)
            .count()
    }

    /// First stage in pipeline order that is not completed.
    pub fn current_stage(&self) -> Option<&'a StageView> {
        self.views
            .iter()
            .find(|v| v.status != StageStatus::Completed)
    }

    pub fn is_rejected(&self) -> bool {
        self.views.iter().any(|v| v.status == StageStatus::Rejected)
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}
