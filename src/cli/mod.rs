pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "backoffice")]
#[command(about = "Backoffice CLI - operator tooling for the back-office API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Session token utilities")]
    Token {
        #[command(subcommand)]
        cmd: commands::token::TokenCommands,
    },

    #[command(about = "Trigger scheduled jobs on a running server")]
    Cron {
        #[command(subcommand)]
        cmd: commands::cron::CronCommands,
    },

    #[command(about = "Tenant membership maintenance")]
    Memberships {
        #[command(subcommand)]
        cmd: commands::memberships::MembershipCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Token { cmd } => commands::token::handle(cmd, output_format).await,
        Commands::Cron { cmd } => commands::cron::handle(cmd, output_format).await,
        Commands::Memberships { cmd } => commands::memberships::handle(cmd, output_format).await,
    }
}
