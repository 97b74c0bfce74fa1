use anyhow::{bail, Context};
use clap::Subcommand;
use serde_json::Value;

use crate::cli::utils::{output_details, resolve_api_url};
use crate::cli::OutputFormat;
use crate::config::AppConfig;

#[derive(Subcommand)]
pub enum CronCommands {
    #[command(about = "Process pending CSV import jobs")]
    Imports {
        #[arg(long, help = "API base URL (defaults to BACKOFFICE_API_URL or localhost)")]
        url: Option<String>,
        #[arg(long, help = "Shared cron secret (defaults to CRON_SECRET)")]
        secret: Option<String>,
    },

    #[command(about = "Send due booking reminders")]
    Reminders {
        #[arg(long, help = "API base URL (defaults to BACKOFFICE_API_URL or localhost)")]
        url: Option<String>,
        #[arg(long, help = "Shared cron secret (defaults to CRON_SECRET)")]
        secret: Option<String>,
    },
}

pub async fn handle(cmd: CronCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let (path, url, secret, label) = match cmd {
        CronCommands::Imports { url, secret } => ("/api/cron/import-jobs", url, secret, "Import job run"),
        CronCommands::Reminders { url, secret } => ("/api/cron/reminders", url, secret, "Reminder run"),
    };

    let config = AppConfig::from_env();
    let Some(secret) = secret.or_else(|| config.jobs.cron_secret.clone()) else {
        bail!("no cron secret: pass --secret or set CRON_SECRET");
    };
    let endpoint = format!("{}{}", resolve_api_url(url, config.api.port), path);

    let response = reqwest::Client::new()
        .post(&endpoint)
        .header("x-cron-secret", secret)
        .send()
        .await
        .with_context(|| format!("request to {} failed", endpoint))?;

    let status = response.status();
    let body: Value = response.json().await.context("response was not JSON")?;
    if !status.is_success() {
        let message = body.get("error").and_then(Value::as_str).unwrap_or("request failed");
        bail!("{} ({})", message, status);
    }

    let summary = body.get("data").cloned().unwrap_or(Value::Null);
    output_details(&output_format, &format!("{} finished", label), summary)
}
