//! Logging setup for the `creditwatch` binary.
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the binary. Output goes to stderr so `--json` output on stdout stays
//! machine-readable.

use std::sync::Once;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// JSON structured logs
    Json,
    /// Human-readable logs
    #[default]
    Pretty,
}

/// Filter used when `RUST_LOG` is unset.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose { "creditwatch=debug,warn" } else { "warn" }
}

/// Install the global subscriber. Safe to call more than once; only the
/// first call has an effect.
///
/// `RUST_LOG` takes precedence over `verbose`.
pub fn init_logging(format: LogFormat, verbose: bool) {
    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

        match format {
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().json().with_writer(std::io::stderr))
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().compact().with_writer(std::io::stderr))
                    .init();
            }
        }
    });
}
