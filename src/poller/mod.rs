//! Status poller.
//!
//! Owns one polling task per workflow id. Each tick fetches the status, then
//! the events, reconciles them into stage views and hands the result to the
//! consumer. Polling stops on a terminal workflow status or on unsubscribe.
//!
//! ## Scheduling model
//!
//! The poller is single-threaded: subscriptions are spawned with
//! [`tokio::task::spawn_local`], so [`StatusPoller::subscribe`] must be
//! called from inside a [`tokio::task::LocalSet`]. A tick runs to completion
//! before the next one is scheduled, `interval` after it finished.
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use creditwatch::client::HttpWorkflowClient;
//! use creditwatch::poller::{PollerConfig, StatusPoller};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let api = Arc::new(HttpWorkflowClient::new("http://localhost:8000", Duration::from_secs(30))?);
//! let local = tokio::task::LocalSet::new();
//! local
//!     .run_until(async move {
//!         let poller = StatusPoller::new(api, PollerConfig::default());
//!         let handle = poller.subscribe(
//!             "REQ-001",
//!             |snapshot, stages| println!("{} {:?}", snapshot.overall_status, stages),
//!             |err| eprintln!("{}", err),
//!         );
//!         handle.finished().await;
//!     })
//!     .await;
//! # Ok(())
//! # }
//! ```

mod subscription;

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use tracing::Instrument;

use crate::client::WorkflowApi;
use crate::errors::PollError;
use crate::reconcile::StageView;
use crate::snapshot::WorkflowStatusSnapshot;

pub use subscription::{PollState, SubscriptionHandle, SubscriptionPhase};

/// Default time between the end of one tick and the start of the next.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Default number of consecutive 404s tolerated silently.
pub const DEFAULT_NOT_FOUND_GRACE: u32 = 2;

/// Tunables for a poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    /// Delay between ticks
    pub interval: Duration,
    /// Consecutive "not found" status responses before a
    /// [`PollError::NotYetAvailable`] is reported
    pub not_found_grace: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            not_found_grace: DEFAULT_NOT_FOUND_GRACE,
        }
    }
}

impl PollerConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_not_found_grace(mut self, grace: u32) -> Self {
        self.not_found_grace = grace;
        self
    }
}

/// Registry of active subscriptions, at most one per workflow id.
pub struct StatusPoller {
    api: Arc<dyn WorkflowApi>,
    config: PollerConfig,
    active: RefCell<HashMap<String, SubscriptionHandle>>,
    next_generation: Cell<u64>,
}

impl StatusPoller {
    pub fn new(api: Arc<dyn WorkflowApi>, config: PollerConfig) -> Self {
        Self {
            api,
            config,
            active: RefCell::new(HashMap::new()),
            next_generation: Cell::new(1),
        }
    }

    pub fn config(&self) -> PollerConfig {
        self.config
    }

    /// Start polling `request_id`. The first tick runs immediately.
    ///
    /// `on_update` receives every applied tick, including the final terminal
    /// one. `on_error` receives status-fetch failures; it never ends the
    /// subscription. An existing subscription for the same id is superseded
    /// and stops without further callbacks.
    ///
    /// # Panics
    ///
    /// Panics if called outside a [`tokio::task::LocalSet`].
    pub fn subscribe<U, E>(&self, request_id: &str, on_update: U, on_error: E) -> SubscriptionHandle
    where
        U: FnMut(&WorkflowStatusSnapshot, &[StageView]) + 'static,
        E: FnMut(&PollError) + 'static,
    {
        let generation = self.next_generation.get();
        self.next_generation.set(generation + 1);

        let handle = SubscriptionHandle {
            shared: Rc::new(subscription::Shared::new(request_id, generation)),
        };

        let previous = {
            let mut active = self.active.borrow_mut();
            // Subscriptions that stopped on their own leave their entry behind.
            active.retain(|_, h| !h.is_finished());
            active.insert(request_id.to_string(), handle.clone())
        };
        if let Some(previous) = previous {
            tracing::debug!(
                request_id,
                superseded = previous.shared.generation,
                "replacing existing subscription"
            );
            previous.unsubscribe();
        }

        let span = tracing::info_span!("poll", request_id, generation);
        tokio::task::spawn_local(
            subscription::run(
                self.api.clone(),
                self.config,
                handle.shared.clone(),
                Box::new(on_update),
                Box::new(on_error),
            )
            .instrument(span),
        );

        handle
    }

    /// Cancel a subscription. Idempotent; unsubscribing a handle that was
    /// already superseded leaves the newer subscription running.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) {
        handle.unsubscribe();
        let mut active = self.active.borrow_mut();
        if active
            .get(handle.request_id())
            .is_some_and(|current| Rc::ptr_eq(&current.shared, &handle.shared))
        {
            active.remove(handle.request_id());
        }
    }

    /// Cancel every subscription.
    pub fn unsubscribe_all(&self) {
        let drained: Vec<SubscriptionHandle> =
            self.active.borrow_mut().drain().map(|(_, h)| h).collect();
        for handle in drained {
            handle.unsubscribe();
        }
    }

    /// Current subscription for `request_id`, if any.
    pub fn subscription(&self, request_id: &str) -> Option<SubscriptionHandle> {
        self.active.borrow().get(request_id).cloned()
    }

    /// Number of subscriptions that are still ticking.
    pub fn active_count(&self) -> usize {
        self.active
            .borrow()
            .values()
            .filter(|h| !h.is_finished())
            .count()
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.unsubscribe_all();
    }
}
