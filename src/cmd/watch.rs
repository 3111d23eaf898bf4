//! Live timeline (`creditwatch watch`).

use anyhow::{Context, Result};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use creditwatch::client::WorkflowApi;
use creditwatch::config::WatchConfig;
use creditwatch::errors::PollError;
use creditwatch::poller::StatusPoller;
use creditwatch::reconcile::StageView;
use creditwatch::snapshot::{OverallStatus, WorkflowStatusSnapshot};
use creditwatch::ui::WatchUI;

use super::http_client;

/// Follow `request_id` until it reaches a terminal status or Ctrl-C.
///
/// A workflow that ends `failed` is reported as an error so the exit code
/// reflects it.
pub async fn cmd_watch(config: &WatchConfig, request_id: &str) -> Result<()> {
    let api: Arc<dyn WorkflowApi> = Arc::new(http_client(config)?);
    let poller = StatusPoller::new(api, config.poller_config());
    tracing::debug!(
        request_id,
        base_url = config.base_url(),
        interval_ms = poller.config().interval.as_millis() as u64,
        not_found_grace = poller.config().not_found_grace,
        "watching workflow"
    );

    let ui = Rc::new(RefCell::new(WatchUI::new(request_id)));
    let on_update = {
        let ui = ui.clone();
        move |snapshot: &WorkflowStatusSnapshot, stages: &[StageView]| {
            ui.borrow_mut().update(snapshot, stages)
        }
    };
    let on_error = {
        let ui = ui.clone();
        move |err: &PollError| ui.borrow_mut().error(err)
    };
    let handle = poller.subscribe(request_id, on_update, on_error);

    tokio::select! {
        _ = handle.finished() => {}
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            poller.unsubscribe(&handle);
            ui.borrow().finish();
            eprintln!("Stopped watching {}", request_id);
            return Ok(());
        }
    }

    ui.borrow().finish();
    match handle.state().snapshot {
        Some(snapshot) if snapshot.overall_status == OverallStatus::Failed => anyhow::bail!(
            "Workflow {} failed: {}",
            request_id,
            snapshot.error.as_deref().unwrap_or("no error message")
        ),
        _ => Ok(()),
    }
}
