//! verbach CLI - MEC diploma verification
//!
//! Usage:
//!   verbach serve                     Run the HTTP API
//!   verbach check <document>          Run one lookup and print the result
//!   verbach config                    Show the effective configuration
//!   verbach config --write            Write the default configuration file

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use verbach_browser::VerificationAgent;
use verbach_core::config::CONFIG_FILE_NAME;
use verbach_core::{VerbachConfig, VerificationRequest, VerificationResult};

#[derive(Parser)]
#[command(name = "verbach")]
#[command(author, version, about = "Automated diploma verification on the MEC portal")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to ./verbach.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API and artifact server
    Serve {
        /// Port to listen on (overrides config and PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Look up one document and print the outcome
    Check {
        /// Student document number
        identifier: String,

        /// Birth date, DD/MM/YYYY
        #[arg(long)]
        birth_date: Option<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,

        /// Show the browser window and slow it down
        #[arg(long)]
        debug_browser: bool,
    },

    /// Show or write the configuration
    Config {
        /// Write the defaults to the configuration file instead of printing
        #[arg(long)]
        write: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));

    match cli.command {
        Commands::Serve { port } => cmd_serve(&config_path, port).await,
        Commands::Check {
            identifier,
            birth_date,
            json,
            debug_browser,
        } => cmd_check(&config_path, identifier, birth_date, json, debug_browser).await,
        Commands::Config { write } => cmd_config(&config_path, write),
    }
}

fn load_config(path: &Path) -> Result<VerbachConfig> {
    VerbachConfig::load(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

async fn cmd_serve(config_path: &Path, port: Option<u16>) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(port) = port {
        config.server.port = port;
    }

    println!(
        "verbach listening on http://{}:{}",
        config.server.host, config.server.port
    );
    println!("Press Ctrl+C to stop");

    verbach_server::run(config).await
}

async fn cmd_check(
    config_path: &Path,
    identifier: String,
    birth_date: Option<String>,
    json: bool,
    debug_browser: bool,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if debug_browser {
        config.browser.debug = true;
    }

    let request = VerificationRequest::new(&identifier, birth_date.as_deref())?;
    info!("Checking document {}", request.identifier());

    let agent = VerificationAgent::new(Arc::new(config));
    let result = agent
        .run(&request)
        .await
        .with_context(|| format!("Lookup for document {} failed", request.identifier()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }
    Ok(())
}

fn print_result(result: &VerificationResult) {
    println!("Document:  {}", result.identifier);
    println!("Status:    {}", result.status);
    println!("Checked:   {}", result.timestamp.to_rfc3339());
    if let Some(url) = &result.artifact_url {
        println!("PDF:       {}", url);
    }
    println!();
    println!("{}", result.message);
}

fn cmd_config(config_path: &Path, write: bool) -> Result<()> {
    if write {
        if config_path.exists() {
            anyhow::bail!(
                "{} already exists; remove it first to regenerate the defaults",
                config_path.display()
            );
        }
        VerbachConfig::write_default(config_path)?;
        println!("Wrote default configuration to {}", config_path.display());
        return Ok(());
    }

    let config = load_config(config_path)?;
    print!("{}", config.to_toml()?);
    Ok(())
}
