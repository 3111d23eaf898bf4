//! Per-workflow subscription: the tick loop and its handle.
//!
//! Everything here lives on the scheduling thread (`spawn_local`), so shared
//! state is `Rc` + `Cell`/`RefCell` and never locked.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Notify;

use super::PollerConfig;
use crate::client::WorkflowApi;
use crate::errors::{FetchError, PollError};
use crate::reconcile::{StageEvents, StageView, reconcile_pipeline};
use crate::snapshot::WorkflowStatusSnapshot;

/// Lifecycle phase of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionPhase {
    /// Ticking normally
    #[default]
    Polling,
    /// Ticking, but the last status fetch failed
    ErrorVisible,
    /// Workflow reached Completed or Failed; no more ticks
    Terminal,
    /// Consumer cancelled; no more ticks or callbacks
    Unsubscribed,
}

impl SubscriptionPhase {
    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Terminal | Self::Unsubscribed)
    }
}

/// Latest state of a subscription, replaced wholesale on every applied tick.
#[derive(Debug, Clone, Default)]
pub struct PollState {
    pub snapshot: Option<WorkflowStatusSnapshot>,
    pub stage_views: Vec<StageView>,
    pub poll_error: Option<PollError>,
    pub phase: SubscriptionPhase,
    /// Number of ticks whose results were applied
    pub ticks: u64,
}

pub(super) type UpdateFn = Box<dyn FnMut(&WorkflowStatusSnapshot, &[StageView])>;
pub(super) type ErrorFn = Box<dyn FnMut(&PollError)>;

pub(super) struct Shared {
    pub(super) request_id: String,
    pub(super) generation: u64,
    cancelled: Cell<bool>,
    finished: Cell<bool>,
    /// Cuts the inter-tick sleep short on cancellation
    wake: Notify,
    /// Signals `finished()` waiters
    done: Notify,
    state: RefCell<PollState>,
}

impl Shared {
    pub(super) fn new(request_id: &str, generation: u64) -> Self {
        Self {
            request_id: request_id.to_string(),
            generation,
            cancelled: Cell::new(false),
            finished: Cell::new(false),
            wake: Notify::new(),
            done: Notify::new(),
            state: RefCell::new(PollState::default()),
        }
    }

    fn cancel(&self) {
        if self.cancelled.replace(true) {
            return;
        }
        {
            let mut state = self.state.borrow_mut();
            if !state.phase.is_stopped() {
                state.phase = SubscriptionPhase::Unsubscribed;
            }
        }
        self.wake.notify_one();
        self.finish();
    }

    fn finish(&self) {
        if !self.finished.replace(true) {
            self.done.notify_waiters();
        }
    }
}

/// Handle returned by [`super::StatusPoller::subscribe`].
///
/// Dropping the handle does not cancel the subscription; call
/// [`SubscriptionHandle::unsubscribe`].
#[derive(Clone)]
pub struct SubscriptionHandle {
    pub(super) shared: Rc<Shared>,
}

impl SubscriptionHandle {
    pub fn request_id(&self) -> &str {
        &self.shared.request_id
    }

    /// Stop the subscription. The pending tick is cancelled immediately and
    /// results of fetches already in flight are discarded. Idempotent, and a
    /// no-op after natural termination apart from marking it cancelled.
    pub fn unsubscribe(&self) {
        if !self.shared.cancelled.get() {
            tracing::info!(
                request_id = %self.shared.request_id,
                generation = self.shared.generation,
                "unsubscribed"
            );
        }
        self.shared.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.get()
    }

    /// Whether no further ticks will run.
    pub fn is_finished(&self) -> bool {
        self.shared.finished.get()
    }

    /// Copy of the latest applied state.
    pub fn state(&self) -> PollState {
        self.shared.state.borrow().clone()
    }

    pub fn phase(&self) -> SubscriptionPhase {
        self.shared.state.borrow().phase
    }

    /// Resolves once the subscription is terminal or unsubscribed.
    pub async fn finished(&self) {
        loop {
            let notified = self.shared.done.notified();
            if self.shared.finished.get() {
                return;
            }
            notified.await;
        }
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("request_id", &self.shared.request_id)
            .field("generation", &self.shared.generation)
            .field("cancelled", &self.shared.cancelled.get())
            .finish()
    }
}

/// Outcome of one tick's fetches, computed before anything is applied.
enum TickOutcome {
    Fetched {
        snapshot: WorkflowStatusSnapshot,
        received: StageEvents,
    },
    StatusFailed(FetchError),
}

/// The tick loop. Runs until terminal or cancelled.
pub(super) async fn run(
    api: Arc<dyn WorkflowApi>,
    config: PollerConfig,
    shared: Rc<Shared>,
    mut on_update: UpdateFn,
    mut on_error: ErrorFn,
) {
    let request_id = shared.request_id.clone();
    let mut cached = StageEvents::new();
    let mut not_found_streak: u32 = 0;

    loop {
        if shared.cancelled.get() {
            break;
        }

        let outcome = fetch_tick(api.as_ref(), &request_id).await;

        // Results of a tick whose subscription was cancelled mid-flight are
        // never applied.
        if shared.cancelled.get() {
            tracing::debug!(%request_id, "discarding results of cancelled tick");
            break;
        }

        match outcome {
            TickOutcome::Fetched { snapshot, received } => {
                not_found_streak = 0;
                cached.merge(received);
                let stage_views = reconcile_pipeline(&cached);
                let terminal = snapshot.is_terminal();

                {
                    let mut state = shared.state.borrow_mut();
                    state.ticks += 1;
                    state.snapshot = Some(snapshot.clone());
                    state.stage_views = stage_views.clone();
                    state.poll_error = None;
                    state.phase = if terminal {
                        SubscriptionPhase::Terminal
                    } else {
                        SubscriptionPhase::Polling
                    };
                }

                tracing::debug!(
                    %request_id,
                    status = %snapshot.overall_status,
                    events = cached.len(),
                    "tick applied"
                );
                on_update(&snapshot, &stage_views);

                if terminal {
                    tracing::info!(
                        %request_id,
                        status = %snapshot.overall_status,
                        "workflow reached terminal state, polling stopped"
                    );
                    break;
                }
            }
            TickOutcome::StatusFailed(err) => {
                if let Some(report) = classify_failure(
                    &request_id,
                    &err,
                    &mut not_found_streak,
                    config.not_found_grace,
                ) {
                    {
                        let mut state = shared.state.borrow_mut();
                        state.poll_error = Some(report.clone());
                        state.phase = SubscriptionPhase::ErrorVisible;
                    }
                    on_error(&report);
                }
            }
        }

        // A callback may have unsubscribed.
        if shared.cancelled.get() {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(config.interval) => {}
            _ = shared.wake.notified() => {}
        }
    }

    shared.finish();
}

/// Status fetch, then events fetch. An events failure counts as "no events
/// this tick".
async fn fetch_tick(api: &dyn WorkflowApi, request_id: &str) -> TickOutcome {
    let snapshot = match api.fetch_status(request_id).await {
        Ok(snapshot) => snapshot,
        Err(err) => return TickOutcome::StatusFailed(err),
    };

    let received = match api.fetch_events(request_id).await {
        Ok(events) => StageEvents::from_events(events),
        Err(err) => {
            if err.is_not_found() {
                tracing::debug!(%request_id, "no events yet");
            } else {
                tracing::warn!(
                    %request_id,
                    error = %err,
                    "events fetch failed, treating as no events"
                );
            }
            StageEvents::new()
        }
    };

    TickOutcome::Fetched { snapshot, received }
}

/// Decide whether a status failure is reported, and as what.
///
/// 404s are silent until `grace` consecutive occurrences; everything else is
/// reported immediately. Returns `None` when the failure stays silent.
fn classify_failure(
    request_id: &str,
    err: &FetchError,
    not_found_streak: &mut u32,
    grace: u32,
) -> Option<PollError> {
    match err {
        FetchError::NotFound { detail } => {
            *not_found_streak += 1;
            if *not_found_streak < grace {
                tracing::debug!(
                    %request_id,
                    attempts = *not_found_streak,
                    "workflow record not available yet"
                );
                return None;
            }
            tracing::warn!(
                %request_id,
                attempts = *not_found_streak,
                "workflow record still not available"
            );
            Some(PollError::NotYetAvailable {
                request_id: request_id.to_string(),
                attempts: *not_found_streak,
                detail: detail.clone(),
            })
        }
        other => {
            *not_found_streak = 0;
            tracing::warn!(%request_id, error = %other, "status fetch failed, retrying next tick");
            Some(PollError::TransientFetchFailure {
                request_id: request_id.to_string(),
                status: other.status_code(),
                message: other.to_string(),
            })
        }
    }
}
