use anyhow::bail;
use clap::Subcommand;
use serde_json::json;

use crate::auth::{Claims, JwtService};
use crate::cli::utils::output_details;
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::permissions::Role;

#[derive(Subcommand)]
pub enum TokenCommands {
    #[command(about = "Sign a session token with the server's JWT secret")]
    Issue {
        #[arg(long, help = "User id (token subject)")]
        user: String,
        #[arg(long, help = "Tenant id")]
        tenant: Option<String>,
        #[arg(long, help = "Global role, e.g. ADMIN or SUPER_ADMIN")]
        role: Option<String>,
        #[arg(long, help = "Role inside the tenant")]
        tenant_role: Option<String>,
        #[arg(long, help = "User email")]
        email: Option<String>,
        #[arg(long, help = "Display name")]
        name: Option<String>,
        #[arg(long, help = "Lifetime in hours (defaults to the configured session lifetime)")]
        hours: Option<u64>,
    },
}

pub async fn handle(cmd: TokenCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        TokenCommands::Issue { user, tenant, role, tenant_role, email, name, hours } => {
            let config = AppConfig::from_env();
            if config.jwt_secret_missing() {
                bail!("JWT_SECRET is not set");
            }
            for value in [&role, &tenant_role].into_iter().flatten() {
                if Role::parse(value) == Role::Unrecognized {
                    bail!("Unknown role '{}'", value);
                }
            }

            let jwt = JwtService::from_config(&config.security);
            let lifetime = hours.unwrap_or_else(|| jwt.session_hours());
            let claims = Claims::new(user, tenant, role, lifetime)
                .with_tenant_role(tenant_role)
                .with_profile(email, name);
            let token = jwt.issue_session(&claims)?;

            match output_format {
                OutputFormat::Text => {
                    println!("{}", token);
                    Ok(())
                }
                OutputFormat::Json => output_details(
                    &output_format,
                    "Token issued",
                    json!({ "token": token, "subject": claims.sub, "expiresAt": claims.exp }),
                ),
            }
        }
    }
}
