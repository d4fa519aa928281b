#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![allow(clippy::print_stdout)]

mod explain;
mod logging;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use crm_access::AccessConfig;
use crm_db::Pagination;

use crate::explain::{ExplainRequest, explain};

/// CRM access policy tool: validate configuration and explain decisions
#[derive(Parser)]
#[command(name = "crm-authz")]
#[command(about = "Validate CRM access policy and explain access decisions")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate configuration and compile the policy
    Check,
    /// Print the effective configuration (JSON) and exit
    PrintConfig,
    /// Resolve a subject and show the permission decision and scoped SQL
    Explain {
        /// Subject id to look up in the configured profiles
        #[arg(long)]
        subject: String,
        /// Email of the subject
        #[arg(long, default_value = "")]
        email: String,
        /// Treat the email as unverified
        #[arg(long)]
        unverified: bool,
        /// Target module, e.g. `properties`
        #[arg(long)]
        module: String,
        /// Raw action, e.g. `list` or `download`
        #[arg(long)]
        action: String,
        /// List options as JSON
        #[arg(long)]
        options: Option<String>,
        #[arg(long)]
        page: Option<u64>,
        #[arg(long)]
        limit: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.json_logs);

    // defaults -> YAML (if provided) -> env (CRM__*)
    let config = AccessConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Check => {
            let policy = config.compile_policy()?;
            tracing::info!(
                modules = policy.matrix().modules().count(),
                profiles = config.profiles.len(),
                "configuration is valid"
            );
            println!("Configuration is valid.");
        }
        Commands::PrintConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Explain {
            subject,
            email,
            unverified,
            module,
            action,
            options,
            page,
            limit,
        } => {
            let pagination = (page.is_some() || limit.is_some()).then(|| {
                Pagination::new(page.unwrap_or(1), limit.unwrap_or(config.default_page_size))
            });
            let req = ExplainRequest {
                subject,
                email,
                email_verified: !unverified,
                module,
                action,
                options,
                pagination,
            };
            let out = explain(&config, &req).await?;
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }
    Ok(())
}
