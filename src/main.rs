use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use creditwatch::config::{CliOverrides, WatchConfig};
use creditwatch::logging::{LogFormat, init_logging};

mod cmd;

#[derive(Parser)]
#[command(name = "creditwatch")]
#[command(version, about = "Watch credit approval workflows stage by stage")]
pub struct Cli {
    /// Show debug logs (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the config file (default: ./creditwatch.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend base URL. Overrides the config file and CREDITWATCH_API_BASE.
    #[arg(long, global = true)]
    pub api_base: Option<String>,

    #[arg(long, value_enum, default_value_t = LogFormat::Pretty, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Follow a workflow until it completes or fails
    Watch {
        request_id: String,

        /// Poll interval in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,
    },
    /// Fetch the current status and timeline once
    Status {
        request_id: String,

        /// Print JSON instead of the timeline
        #[arg(long)]
        json: bool,
    },
    /// Start a workflow for a credit block request
    Start {
        request_id: String,

        /// Follow the workflow after starting it
        #[arg(long)]
        watch: bool,

        /// Poll interval in milliseconds (with --watch)
        #[arg(long)]
        interval_ms: Option<u64>,
    },
    /// Submit the human approval decision
    Approve {
        request_id: String,

        /// approve, approve-with-changes or reject. Prompts when omitted.
        #[arg(long)]
        decision: Option<String>,

        /// Approved credit limit in INR
        #[arg(long)]
        limit: Option<f64>,

        #[arg(long)]
        comments: Option<String>,
    },
    /// Show the summary of a completed workflow
    Summary {
        request_id: String,

        #[arg(long)]
        json: bool,
    },
    /// Check that the backend is reachable
    Health,
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show effective configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Write a default creditwatch.toml
    Init,
}

impl Cli {
    fn resolve_config(&self, interval_ms: Option<u64>) -> Result<WatchConfig> {
        let overrides = CliOverrides {
            api_base: self.api_base.clone(),
            interval_ms,
        };
        WatchConfig::resolve(self.config.as_deref(), &overrides)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.verbose);

    // The poller is single-threaded: subscriptions run as local tasks.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let local = tokio::task::LocalSet::new();

    local.block_on(&runtime, run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Commands::Watch {
            request_id,
            interval_ms,
        } => {
            let config = cli.resolve_config(*interval_ms)?;
            cmd::cmd_watch(&config, request_id).await?;
        }
        Commands::Status { request_id, json } => {
            let config = cli.resolve_config(None)?;
            cmd::cmd_status(&config, request_id, *json).await?;
        }
        Commands::Start {
            request_id,
            watch,
            interval_ms,
        } => {
            let config = cli.resolve_config(*interval_ms)?;
            cmd::cmd_start(&config, request_id).await?;
            if *watch {
                cmd::cmd_watch(&config, request_id).await?;
            }
        }
        Commands::Approve {
            request_id,
            decision,
            limit,
            comments,
        } => {
            let config = cli.resolve_config(None)?;
            cmd::cmd_approve(
                &config,
                request_id,
                decision.as_deref(),
                *limit,
                comments.clone(),
            )
            .await?;
        }
        Commands::Summary { request_id, json } => {
            let config = cli.resolve_config(None)?;
            cmd::cmd_summary(&config, request_id, *json).await?;
        }
        Commands::Health => {
            let config = cli.resolve_config(None)?;
            cmd::cmd_health(&config).await?;
        }
        Commands::Config { command } => {
            cmd::cmd_config(&cli, command.clone())?;
        }
    }

    Ok(())
}
