//! Configuration view and validation commands (`creditwatch config`).

use anyhow::{Context, Result};
use std::path::PathBuf;

use creditwatch::config::{CONFIG_FILE_NAME, WatchToml};

use super::super::{Cli, ConfigCommands};

fn config_path(cli: &Cli) -> Result<PathBuf> {
    match &cli.config {
        Some(path) => Ok(path.clone()),
        None => Ok(std::env::current_dir()
            .context("Failed to get current directory")?
            .join(CONFIG_FILE_NAME)),
    }
}

pub fn cmd_config(cli: &Cli, command: Option<ConfigCommands>) -> Result<()> {
    let path = config_path(cli)?;

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("creditwatch configuration");
            println!("=========================");
            println!();

            // Effective values, including env and CLI overrides.
            let config = cli.resolve_config(None)?;
            match &config.source {
                Some(source) => println!("Config file: {}", source.display()),
                None => println!(
                    "No {} found at {}, using defaults.",
                    CONFIG_FILE_NAME,
                    path.display()
                ),
            }
            println!();

            println!("[api]");
            println!("  base_url = \"{}\"", config.toml.api.base_url);
            println!("  timeout_secs = {}", config.toml.api.timeout_secs);
            println!();
            println!("[poll]");
            println!("  interval_ms = {}", config.toml.poll.interval_ms);
            println!("  not_found_grace = {}", config.toml.poll.not_found_grace);
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !path.exists() {
                println!("No {} found. Using defaults (valid).", CONFIG_FILE_NAME);
                return Ok(());
            }

            let warnings = cli.resolve_config(None)?.validate();

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if path.exists() {
                println!("{} already exists at {}", CONFIG_FILE_NAME, path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
                && !parent.exists()
            {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create directory {}", parent.display())
                })?;
            }

            WatchToml::default().save(&path)?;

            println!("Created {} at {}", CONFIG_FILE_NAME, path.display());
            println!();
            println!("You can now customize:");
            println!("  - [api] base_url, timeout_secs");
            println!("  - [poll] interval_ms, not_found_grace");
            println!();
        }
    }

    Ok(())
}
