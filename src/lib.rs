//! Watch credit-approval workflows.
//!
//! [`poller::StatusPoller`] polls the workflow backend for one or more
//! request ids and turns each tick into a five-stage timeline via
//! [`reconcile::reconcile`].

pub mod client;
pub mod config;
pub mod errors;
pub mod logging;
pub mod payload;
pub mod poller;
pub mod reconcile;
pub mod snapshot;
pub mod stage;
pub mod ui;
