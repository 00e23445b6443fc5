//! Wellmed CLI — the main entry point.
//!
//! Commands:
//! - `init`      — Write a default config file
//! - `gateway`   — Start the HTTP API server
//! - `doctor`    — Diagnose configuration problems
//! - `extract`   — Extract text from a local PDF
//! - `classify`  — Run the topic gate against one message

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "wellmed",
    about = "Wellmed AI — medical-coding assistant gateway",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Config file (defaults to ~/.wellmed/config.toml)
    #[arg(short, long, global = true, env = "WELLMED_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,

    /// Start the HTTP gateway server
    Gateway {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check configuration and report problems
    Doctor,

    /// Extract text, page count and metadata from a PDF
    Extract {
        /// Path to the PDF file
        file: PathBuf,
    },

    /// Decide whether a message passes the topic gate
    Classify {
        /// The user message to classify
        text: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is normal.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    match cli.log_format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init(),
    }

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Init => commands::init::run(config).await?,
        Commands::Gateway { port } => commands::gateway::run(config, port).await?,
        Commands::Doctor => commands::doctor::run(config).await?,
        Commands::Extract { file } => commands::extract::run(&file).await?,
        Commands::Classify { text } => commands::classify::run(config, &text).await?,
    }

    Ok(())
}
