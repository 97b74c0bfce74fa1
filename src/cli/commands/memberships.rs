use anyhow::Context;
use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::output_details;
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::DatabaseManager;
use crate::jobs::backfill_super_admin_memberships;
use crate::store::PgStore;

#[derive(Subcommand)]
pub enum MembershipCommands {
    #[command(about = "Give every super admin without a tenant a default membership")]
    Backfill {
        #[arg(long, help = "Report what would change without writing")]
        dry_run: bool,
        #[arg(long, help = "Tenant for super admins with no home tenant")]
        tenant: Option<String>,
    },
}

/// Runs against the database directly, so it works while the API is down.
pub async fn handle(cmd: MembershipCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        MembershipCommands::Backfill { dry_run, tenant } => {
            let config = AppConfig::from_env();
            let db = DatabaseManager::connect(&config.database)
                .await
                .context("backfill needs DATABASE_URL")?;
            let store = PgStore::new(db.clone());

            let report = backfill_super_admin_memberships(&store, tenant.as_deref(), dry_run).await?;
            db.close().await;

            let message = if dry_run {
                format!("Dry run: {} membership(s) would be created", report.created.len())
            } else {
                format!("Created {} membership(s)", report.created.len())
            };
            output_details(
                &output_format,
                &message,
                json!({
                    "examined": report.examined,
                    "created": report.created,
                    "skipped": report.skipped,
                }),
            )
        }
    }
}
