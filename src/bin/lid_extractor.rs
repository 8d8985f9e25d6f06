// Copyright 2024 Saorsa Labs Limited
//
// This software is dual-licensed under:
// - GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later)
// - Commercial License
//
// For AGPL-3.0 license, see LICENSE-AGPL-3.0
// For commercial licensing, contact: saorsalabs@gmail.com
//
// Unless required by applicable law or agreed to in writing, software
// distributed under these licenses is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lid_extractor::{Config, LidRegistry, Persisted, run_extraction};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};

/// Resolve the bot's own linked identifiers from its whatsmeow store
#[derive(Parser, Debug)]
#[command(name = "lid-extractor")]
#[command(about = "Resolve WhatsApp bot LIDs from the session store")]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Store connection string: `postgres://...` or `sqlite:<path>`.
    ///
    /// PostgreSQL URLs without `sslmode` require TLS with full certificate
    /// verification; append `?sslmode=disable` for a local server without TLS.
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: Option<String>,

    /// Output file for the LID document
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Accept self-signed database certificates
    #[arg(long)]
    accept_invalid_certs: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve LIDs and write the output file (default)
    Extract,

    /// List the LIDs stored in the output file
    Show,

    /// Print the LID recorded for a phone number or JID
    Lookup {
        /// Phone number or JID
        phone: String,
    },

    /// Check whether a sender is the bot's own account
    CheckOwner {
        /// Bot JID or phone number
        #[arg(long)]
        bot: String,

        /// Sender JID
        #[arg(long)]
        sender: String,
    },
}

fn banner() {
    info!("{}", "═".repeat(60));
    info!("🛡️ LID extractor: looking up the bot's own identifiers");
    info!("{}", "═".repeat(60));
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = Config::load_with_path(args.config.as_ref())
        .context("Failed to load configuration")?;

    if let Some(url) = &args.database_url {
        config.database.url = url.clone();
    }
    if let Some(path) = &args.output {
        config.output.path = path.clone();
    }
    if args.accept_invalid_certs {
        config.database.accept_invalid_certs = true;
    }

    Ok(config)
}

async fn extract(config: &Config) -> Result<ExitCode> {
    config.validate().context("Invalid configuration")?;
    banner();

    let outcome = run_extraction(config)
        .await
        .context("LID extraction failed")?;

    for number in &outcome.report.unresolved {
        warn!("No LID found for {}", number);
    }
    if outcome.persisted == Persisted::Skipped {
        info!("Nothing resolved, output file left untouched");
    }
    Ok(ExitCode::SUCCESS)
}

fn show(config: &Config) -> Result<ExitCode> {
    let registry = LidRegistry::load(&config.output.path)?;
    if registry.is_empty() {
        println!("No LIDs recorded in {}", config.output.path.display());
        return Ok(ExitCode::SUCCESS);
    }

    println!("📊 Registered bot LIDs:");
    for (phone, mapping) in registry.entries() {
        println!("    📱 {} → 🆔 {} ({})", phone, mapping.lid, mapping.method);
    }
    Ok(ExitCode::SUCCESS)
}

fn lookup(config: &Config, phone: &str) -> Result<ExitCode> {
    let registry = LidRegistry::load(&config.output.path)?;
    match registry.lid_for_phone(phone) {
        Some(lid) => {
            println!("{}", lid);
            Ok(ExitCode::SUCCESS)
        }
        None => {
            eprintln!("No LID recorded for {}", phone);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn check_owner(config: &Config, bot: &str, sender: &str) -> Result<ExitCode> {
    let registry = LidRegistry::load(&config.output.path)?;
    let owner = registry.is_owner(bot, sender);
    println!("{}", if owner { "owner" } else { "not owner" });
    Ok(if owner {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let filter = if args.debug {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = load_config(&args)?;

    match &args.command {
        None | Some(Command::Extract) => extract(&config).await,
        Some(Command::Show) => show(&config),
        Some(Command::Lookup { phone }) => lookup(&config, phone),
        Some(Command::CheckOwner { bot, sender }) => check_owner(&config, bot, sender),
    }
}
