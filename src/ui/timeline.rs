use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::errors::PollError;
use crate::payload::{StagePayload, format_crore};
use crate::reconcile::{StageStatus, StageView, Timeline};
use crate::snapshot::{OverallStatus, WorkflowStatusSnapshot, WorkflowSummary};
use crate::stage::StageName;
use crate::ui::icons::{CHECK, CROSS, RUNNING, SPARKLE, WARN, actor_icon, stage_icon, status_icon};

/// Render the header line for a snapshot.
pub fn render_header(snapshot: &WorkflowStatusSnapshot) -> String {
    let status = match snapshot.overall_status {
        OverallStatus::Running => style(format!("{}RUNNING", RUNNING)).cyan().bold(),
        OverallStatus::Completed => style(format!("{}COMPLETED", CHECK)).green().bold(),
        OverallStatus::Failed => style(format!("{}FAILED", CROSS)).red().bold(),
    };
    let mut line = format!("{} {}", style(&snapshot.request_id).bold(), status);
    if let Some(started) = snapshot.started_at {
        line.push_str(&format!(
            "  {}",
            style(format!("started {}", started.format("%Y-%m-%d %H:%M:%S UTC"))).dim()
        ));
    }
    line
}

fn status_badge(status: StageStatus) -> String {
    let text = format!("[{}]", status);
    match status {
        StageStatus::Pending => style(text).dim().to_string(),
        StageStatus::InProgress => style(text).yellow().to_string(),
        StageStatus::Completed => style(text).green().to_string(),
        StageStatus::Rejected => style(text).red().to_string(),
    }
}

/// Render one stage: a title line followed by indented payload details.
pub fn render_stage(view: &StageView) -> Vec<String> {
    let mut lines = Vec::new();
    let mut title = format!(
        "  {}{}{} {}",
        status_icon(view.status),
        stage_icon(view.name),
        style(view.name.label()).bold(),
        status_badge(view.status)
    );
    if let Some(actor) = view.actor {
        title.push_str(&format!(" {}{}", actor_icon(actor), style(actor).dim()));
    }
    if let Some(ts) = view.timestamp {
        title.push_str(&format!(" {}", style(ts.format("%H:%M:%S")).dim()));
    }
    lines.push(title);

    if let Some(payload) = view
        .payload
        .as_ref()
        .and_then(|value| StagePayload::decode(view.name, value))
    {
        let favourable = match &payload {
            StagePayload::Analysis(p) => p.is_favourable(),
            _ => None,
        };
        for (label, value) in payload.detail_lines() {
            let value = match (label, favourable) {
                ("Recommendation", Some(true)) => style(value).green().to_string(),
                ("Recommendation", Some(false)) => style(value).red().to_string(),
                _ => value,
            };
            lines.push(format!("      {} {}", style(format!("{}:", label)).dim(), value));
        }
    }
    lines
}

/// Notice shown under the stages when the workflow needs attention: a
/// rejection, or an analysis waiting for the human decision.
pub fn render_notice(snapshot: &WorkflowStatusSnapshot, views: &[StageView]) -> Option<String> {
    let timeline = Timeline::new(views);
    if timeline.is_rejected() {
        let stage = timeline
            .current_stage()
            .map(|v| v.name.label())
            .unwrap_or("a stage");
        return Some(format!(
            "  {}{}",
            CROSS,
            style(format!("Request rejected at {}", stage)).red().bold()
        ));
    }
    if snapshot.overall_status == OverallStatus::Running
        && timeline.has_event(StageName::AIAnalysis)
        && !timeline.has_event(StageName::HumanApproval)
    {
        return Some(format!(
            "  {}{} {}",
            WARN,
            style("Awaiting approval:").yellow(),
            style(format!("creditwatch approve {}", snapshot.request_id)).cyan()
        ));
    }
    None
}

/// Render the header, the progress line and all stages.
pub fn render_timeline(snapshot: &WorkflowStatusSnapshot, views: &[StageView]) -> String {
    let timeline = Timeline::new(views);
    let mut lines = vec![render_header(snapshot)];
    lines.push(format!(
        "  {}",
        style(format!(
            "{}/{} stages completed",
            timeline.completed_count(),
            timeline.len()
        ))
        .dim()
    ));
    for view in views {
        lines.extend(render_stage(view));
    }
    if let Some(notice) = render_notice(snapshot, views) {
        lines.push(notice);
    }
    if let Some(error) = &snapshot.error {
        lines.push(format!("  {}{}", CROSS, style(error).red()));
    }
    lines.join("\n")
}

/// Render the summary of a completed workflow.
pub fn render_summary(summary: &WorkflowSummary) -> String {
    let decision = if summary.is_approved() {
        style(&summary.final_decision).green().bold()
    } else {
        style(&summary.final_decision).red().bold()
    };
    let mut lines = vec![
        format!("{}{}", SPARKLE, style("Workflow summary").bold()),
        format!("  {} {}", style("Decision:").dim(), decision),
    ];
    if let Some(limit) = summary.final_credit_limit {
        lines.push(format!(
            "  {} {}",
            style("Credit limit:").dim(),
            format_crore(limit)
        ));
    }
    lines.push(format!(
        "  {} {}",
        style("Block status:").dim(),
        if summary.final_block_status {
            "BLOCKED"
        } else {
            "RELEASED"
        }
    ));
    if !summary.workflow_summary.is_empty() {
        lines.push(format!("  {}", summary.workflow_summary));
    }
    for (i, step) in summary.demo_talk_track.iter().enumerate() {
        lines.push(format!("    {}. {}", i + 1, step));
    }
    lines.join("\n")
}

/// One-line description of a poll error.
pub fn render_poll_error(err: &PollError) -> String {
    if err.is_soft() {
        format!("{}{}", WARN, style(err).yellow())
    } else {
        format!("{}{}", CROSS, style(err).red())
    }
}

/// Terminal output for `creditwatch watch`.
///
/// Shows a spinner until the first update arrives, then prints the timeline
/// whenever it changes. Identical consecutive ticks print nothing.
pub struct WatchUI {
    spinner: ProgressBar,
    last_render: Option<String>,
    last_error: Option<String>,
}

impl WatchUI {
    pub fn new(request_id: &str) -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner} {msg}") {
            spinner.set_style(spinner_style);
        }
        spinner.set_message(format!("Waiting for workflow {}...", style(request_id).cyan()));
        spinner.enable_steady_tick(Duration::from_millis(100));
        Self {
            spinner,
            last_render: None,
            last_error: None,
        }
    }

    fn print_block(&self, text: &str) {
        self.spinner.suspend(|| println!("{}\n", text));
    }

    pub fn update(&mut self, snapshot: &WorkflowStatusSnapshot, views: &[StageView]) {
        self.last_error = None;
        let rendered = render_timeline(snapshot, views);
        if self.last_render.as_deref() != Some(rendered.as_str()) {
            self.print_block(&rendered);
            self.last_render = Some(rendered);
        }

        let timeline = Timeline::new(views);
        let current = timeline
            .current_stage()
            .map(|v| v.name.label())
            .unwrap_or("waiting for next stage");
        self.spinner.set_message(format!(
            "{} {}",
            style(&snapshot.request_id).cyan(),
            style(current).dim()
        ));

        if snapshot.is_terminal() {
            self.spinner.finish_and_clear();
            if let Some(summary) = &snapshot.result {
                println!("{}", render_summary(summary));
            }
        }
    }

    pub fn error(&mut self, err: &PollError) {
        let rendered = render_poll_error(err);
        if self.last_error.as_deref() != Some(rendered.as_str()) {
            self.spinner.suspend(|| eprintln!("{}", rendered));
            self.last_error = Some(rendered);
        }
    }

    pub fn finish(&self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::{StageEvents, reconcile_pipeline};
    use crate::stage::{Actor, EventStatus, WorkflowEvent};
    use serde_json::json;

    fn completed(stage: StageName, actor: Actor) -> WorkflowEvent {
        WorkflowEvent {
            stage,
            status: EventStatus::Completed,
            actor: Some(actor),
            timestamp: None,
            payload: None,
        }
    }

    fn plain(s: &str) -> String {
        console::strip_ansi_codes(s).to_string()
    }

    fn snapshot(status: OverallStatus) -> WorkflowStatusSnapshot {
        WorkflowStatusSnapshot {
            request_id: "REQ-7".into(),
            overall_status: status,
            result: None,
            started_at: None,
            completed_at: None,
            error: None,
        }
    }

    #[test]
    fn test_timeline_lists_every_stage_in_order() {
        let views = reconcile_pipeline(&StageEvents::new());
        let out = plain(&render_timeline(&snapshot(OverallStatus::Running), &views));
        assert!(out.contains("REQ-7"));
        assert!(out.contains("0/5 stages completed"));
        let positions: Vec<usize> = StageName::ALL
            .iter()
            .map(|s| out.find(s.label()).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(out.matches("[Pending]").count(), 5);
    }

    #[test]
    fn test_stage_with_payload_shows_details() {
        let events = StageEvents::from_events([WorkflowEvent {
            stage: StageName::AIAnalysis,
            status: EventStatus::Completed,
            actor: Some(Actor::AI),
            timestamp: None,
            payload: Some(json!({"recommendation": "RELEASE_BLOCK", "confidence": 0.9})),
        }]);
        let views = reconcile_pipeline(&events);
        let lines: Vec<String> = render_stage(&views[1]).iter().map(|l| plain(l)).collect();
        assert!(lines[0].contains("[Completed]"));
        assert!(lines[0].contains("AI"));
        assert!(lines.iter().any(|l| l.contains("Recommendation: RELEASE_BLOCK")));
        assert!(lines.iter().any(|l| l.contains("Confidence: 90%")));
    }

    #[test]
    fn test_analysis_without_decision_hints_at_approve() {
        let events = StageEvents::from_events([
            completed(StageName::RequestSubmitted, Actor::Human),
            completed(StageName::AIAnalysis, Actor::AI),
        ]);
        let views = reconcile_pipeline(&events);
        let out = plain(&render_timeline(&snapshot(OverallStatus::Running), &views));
        assert!(out.contains("Awaiting approval: creditwatch approve REQ-7"));
        assert!(!out.contains("Request rejected"));
    }

    #[test]
    fn test_no_approval_hint_before_analysis_or_after_decision() {
        let running = snapshot(OverallStatus::Running);
        let early = reconcile_pipeline(&StageEvents::from_events([completed(
            StageName::RequestSubmitted,
            Actor::Human,
        )]));
        assert!(render_notice(&running, &early).is_none());

        let decided = reconcile_pipeline(&StageEvents::from_events([
            completed(StageName::AIAnalysis, Actor::AI),
            completed(StageName::HumanApproval, Actor::Human),
        ]));
        assert!(render_notice(&running, &decided).is_none());
    }

    #[test]
    fn test_rejection_banner_names_the_stage() {
        let mut rejected = completed(StageName::HumanApproval, Actor::Human);
        rejected.status = EventStatus::Rejected;
        let events = StageEvents::from_events([
            completed(StageName::RequestSubmitted, Actor::Human),
            completed(StageName::AIAnalysis, Actor::AI),
            rejected,
        ]);
        let views = reconcile_pipeline(&events);
        let out = plain(&render_timeline(&snapshot(OverallStatus::Completed), &views));
        assert!(out.contains("Request rejected at Human Approval"));
        assert!(!out.contains("Awaiting approval"));
    }

    #[test]
    fn test_unfavourable_recommendation_still_renders_plainly() {
        let mut analysis = completed(StageName::AIAnalysis, Actor::AI);
        analysis.payload = Some(json!({"recommendation": "MAINTAIN_BLOCK"}));
        let views = reconcile_pipeline(&StageEvents::from_events([analysis]));
        let lines: Vec<String> = render_stage(&views[1]).iter().map(|l| plain(l)).collect();
        assert!(lines.iter().any(|l| l.contains("Recommendation: MAINTAIN_BLOCK")));
    }

    #[test]
    fn test_failed_snapshot_shows_error() {
        let mut snap = snapshot(OverallStatus::Failed);
        snap.error = Some("SAP timeout".into());
        let out = plain(&render_timeline(&snap, &reconcile_pipeline(&StageEvents::new())));
        assert!(out.contains("FAILED"));
        assert!(out.contains("SAP timeout"));
    }

    #[test]
    fn test_render_summary() {
        let summary = WorkflowSummary {
            request_id: "REQ-7".into(),
            workflow_summary: "Block released after approval".into(),
            final_decision: "APPROVED".into(),
            final_credit_limit: Some(50_000_000.0),
            final_block_status: false,
            demo_talk_track: vec!["Request raised".into(), "AI recommended release".into()],
        };
        let out = plain(&render_summary(&summary));
        assert!(out.contains("APPROVED"));
        assert!(out.contains("₹5.0Cr"));
        assert!(out.contains("RELEASED"));
        assert!(out.contains("2. AI recommended release"));
    }

    #[test]
    fn test_render_poll_error_names_request() {
        let err = PollError::NotYetAvailable {
            request_id: "REQ-7".into(),
            attempts: 2,
            detail: "Workflow not found".into(),
        };
        assert!(plain(&render_poll_error(&err)).contains("REQ-7"));
    }
}
