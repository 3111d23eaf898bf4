//! One-shot status (`creditwatch status`).

use anyhow::Result;
use serde_json::json;

use creditwatch::client::WorkflowApi;
use creditwatch::config::WatchConfig;
use creditwatch::errors::FetchError;
use creditwatch::reconcile::{StageEvents, reconcile_pipeline};
use creditwatch::ui::{render_summary, render_timeline};

use super::http_client;

/// Run a single tick against the backend and print the result.
///
/// Mirrors the poller: an events failure shows the stages as pending, a
/// status failure is an error.
pub async fn cmd_status(config: &WatchConfig, request_id: &str, json: bool) -> Result<()> {
    let client = http_client(config)?;

    let snapshot = match client.fetch_status(request_id).await {
        Ok(snapshot) => snapshot,
        Err(FetchError::NotFound { .. }) => {
            anyhow::bail!("Workflow {} not found (has it been started?)", request_id)
        }
        Err(err) => {
            return Err(anyhow::Error::new(err)
                .context(format!("Failed to fetch status for {}", request_id)));
        }
    };

    let events = match client.fetch_events(request_id).await {
        Ok(events) => StageEvents::from_events(events),
        Err(err) => {
            tracing::debug!(request_id, error = %err, "events unavailable");
            StageEvents::new()
        }
    };
    let stages = reconcile_pipeline(&events);

    if json {
        let body = json!({
            "snapshot": snapshot,
            "stages": stages,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    println!();
    println!("{}", render_timeline(&snapshot, &stages));
    if let Some(summary) = &snapshot.result {
        println!();
        println!("{}", render_summary(summary));
    }
    println!();
    Ok(())
}
