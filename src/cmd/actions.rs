//! Backend actions (`creditwatch start|approve|summary|health`).

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Input, Select, theme::ColorfulTheme};

use creditwatch::client::{ApproverDecision, Decision};
use creditwatch::config::WatchConfig;
use creditwatch::errors::FetchError;
use creditwatch::payload::format_crore;
use creditwatch::ui::icons::CHECK;
use creditwatch::ui::render_summary;

use super::http_client;

pub async fn cmd_start(config: &WatchConfig, request_id: &str) -> Result<()> {
    let client = http_client(config)?;
    let ack = client
        .start_workflow(request_id)
        .await
        .with_context(|| format!("Failed to start workflow for {}", request_id))?;

    let message = if ack.message.is_empty() {
        "Workflow started".to_string()
    } else {
        ack.message
    };
    println!("{}{} {}", CHECK, message, style(request_id).cyan());
    Ok(())
}

pub async fn cmd_approve(
    config: &WatchConfig,
    request_id: &str,
    decision: Option<&str>,
    limit: Option<f64>,
    comments: Option<String>,
) -> Result<()> {
    let body = match decision {
        Some(raw) => ApproverDecision {
            decision: raw.parse()?,
            approved_limit: limit,
            comments: comments.unwrap_or_default(),
        },
        None => prompt_decision(limit, comments)?,
    };

    let client = http_client(config)?;
    let ack = client
        .submit_approval(request_id, &body)
        .await
        .with_context(|| format!("Failed to submit decision for {}", request_id))?;

    println!(
        "{}Decision {} submitted for {}",
        CHECK,
        style(body.decision).bold(),
        style(request_id).cyan()
    );
    if let Some(limit) = body.approved_limit {
        println!("  Approved limit: {}", format_crore(limit));
    }
    if !ack.message.is_empty() {
        println!("  {}", style(ack.message).dim());
    }
    Ok(())
}

fn prompt_decision(limit: Option<f64>, comments: Option<String>) -> Result<ApproverDecision> {
    let options = &["Approve", "Approve with changes", "Reject"];

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Decision")
        .items(options)
        .default(0)
        .interact()
        .context("Failed to read decision")?;

    let decision = match selection {
        0 => Decision::Approve,
        1 => Decision::ApproveWithChanges,
        _ => Decision::Reject,
    };

    let approved_limit = match (decision, limit) {
        (_, Some(limit)) => Some(limit),
        (Decision::ApproveWithChanges, None) => Some(
            Input::<f64>::with_theme(&ColorfulTheme::default())
                .with_prompt("Approved limit (INR)")
                .interact_text()
                .context("Failed to read approved limit")?,
        ),
        _ => None,
    };

    let comments = match comments {
        Some(comments) => comments,
        None => Input::<String>::with_theme(&ColorfulTheme::default())
            .with_prompt("Comments")
            .allow_empty(true)
            .interact_text()
            .context("Failed to read comments")?,
    };

    Ok(ApproverDecision {
        decision,
        approved_limit,
        comments,
    })
}

pub async fn cmd_summary(config: &WatchConfig, request_id: &str, json: bool) -> Result<()> {
    let client = http_client(config)?;
    let summary = match client.fetch_summary(request_id).await {
        Ok(summary) => summary,
        Err(FetchError::NotFound { .. }) => anyhow::bail!("Workflow {} not found", request_id),
        Err(FetchError::Status { status: 400, body }) => {
            anyhow::bail!("Workflow {} has not completed yet: {}", request_id, body)
        }
        Err(err) => {
            return Err(anyhow::Error::new(err)
                .context(format!("Failed to fetch summary for {}", request_id)));
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!();
        println!("{}", render_summary(&summary));
        println!();
    }
    Ok(())
}

pub async fn cmd_health(config: &WatchConfig) -> Result<()> {
    let client = http_client(config)?;
    let body = client
        .health()
        .await
        .with_context(|| format!("Backend at {} is not reachable", config.base_url()))?;

    let status = body
        .get("status")
        .and_then(|v| v.as_str())
        .unwrap_or("ok");
    println!(
        "{}Backend {} is {}",
        CHECK,
        style(config.base_url()).cyan(),
        style(status).green()
    );
    Ok(())
}
