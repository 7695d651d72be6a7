mod commands;
mod config;
mod logging;
mod render;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ledger_db::{ConnectOpts, DbHandle, redact_credentials_in_dsn};
use referral_ledger::{ReferralLedgerClient, ReferralLedgerModule};
use serde_json::Value;

use crate::commands::{AdminsCommand, LinksCommand, RewardsCommand, SettingsCommand, UsersCommand};
use crate::config::{AppConfig, CliOverrides};

/// Referral ledger operator tool
#[derive(Parser)]
#[command(name = "ledger-admin")]
#[command(about = "Referral ledger operator tool")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database DSN override (overrides config and environment)
    #[arg(long)]
    dsn: Option<String>,

    /// Print effective configuration (YAML) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate configuration and exit
    Check,
    /// Apply pending schema migrations
    Migrate,
    /// Platform users and referral attribution
    #[command(subcommand)]
    Users(UsersCommand),
    /// Referral accounts and invite links
    #[command(subcommand)]
    Links(LinksCommand),
    /// Reward balances and journal
    #[command(subcommand)]
    Rewards(RewardsCommand),
    /// Namespaced settings and their audit trail
    #[command(subcommand)]
    Settings(SettingsCommand),
    /// Operator accounts
    #[command(subcommand)]
    Admins(AdminsCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) defaults -> 2) YAML (if provided) -> 3) env (LEDGER__*) -> 4) CLI overrides
    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_cli_overrides(&CliOverrides {
        dsn: cli.dsn,
        verbose: cli.verbose,
    });
    logging::init(&config.logging)?;

    if cli.print_config {
        println!("Effective configuration:\n{}", config.to_yaml()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Check) {
        Commands::Check => check_config(&config),
        Commands::Migrate => {
            let db = connect(&config).await?;
            ReferralLedgerModule::migrate(&db).await?;
            println!("Migrations applied");
            Ok(())
        }
        Commands::Users(cmd) => print(&commands::users(open_client(&config).await?.as_ref(), cmd).await?),
        Commands::Links(cmd) => print(&commands::links(open_client(&config).await?.as_ref(), cmd).await?),
        Commands::Rewards(cmd) => {
            print(&commands::rewards(open_client(&config).await?.as_ref(), cmd).await?)
        }
        Commands::Settings(cmd) => {
            print(&commands::settings(open_client(&config).await?.as_ref(), cmd).await?)
        }
        Commands::Admins(cmd) => print(&commands::admins(open_client(&config).await?.as_ref(), cmd).await?),
    }
}

fn print(output: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(output)?);
    Ok(())
}

fn check_config(config: &AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");
    config.validate()?;
    println!("Configuration is valid");
    println!("{}", config.to_yaml()?);
    Ok(())
}

async fn connect(config: &AppConfig) -> Result<DbHandle> {
    let dsn = &config.database.dsn;
    let opts: ConnectOpts = config.database.pool.clone();
    DbHandle::connect(dsn, opts)
        .await
        .with_context(|| format!("failed to connect to {}", redact_credentials_in_dsn(Some(dsn))))
}

/// Connect, bring the schema up to date and build the in-process client.
async fn open_client(config: &AppConfig) -> Result<Arc<dyn ReferralLedgerClient>> {
    let db = connect(config).await?;
    ReferralLedgerModule::migrate(&db).await?;
    let module = ReferralLedgerModule::init(&db, &config.referral_ledger)?;
    Ok(module.client())
}
