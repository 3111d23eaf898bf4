//! CLI command implementations.
//!
//! | Module    | Commands handled                       |
//! |-----------|----------------------------------------|
//! | `watch`   | `Watch`, `Start --watch`               |
//! | `status`  | `Status`                               |
//! | `actions` | `Start`, `Approve`, `Summary`, `Health`|
//! | `config`  | `Config`                               |

pub mod actions;
pub mod config;
pub mod status;
pub mod watch;

pub use actions::{cmd_approve, cmd_health, cmd_start, cmd_summary};
pub use config::cmd_config;
pub use status::cmd_status;
pub use watch::cmd_watch;

use anyhow::{Context, Result};
use creditwatch::client::HttpWorkflowClient;
use creditwatch::config::WatchConfig;

/// Build the backend client from resolved configuration.
pub(crate) fn http_client(config: &WatchConfig) -> Result<HttpWorkflowClient> {
    HttpWorkflowClient::new(config.base_url(), config.timeout())
        .with_context(|| format!("Failed to create HTTP client for {}", config.base_url()))
}
