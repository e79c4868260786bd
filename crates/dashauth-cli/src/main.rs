//! dashauth - command-line front end for the admin dashboard session.
//!
//! Drives the same session lifecycle a browser front end would: restore
//! on startup, sign in, sign out, and open a route through the guard.

mod commands;

use std::io;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use dashauth_core::Config;

/// Log file prefix in the data directory
const LOG_FILE_PREFIX: &str = "dashauth.log";

#[derive(Parser)]
#[command(name = "dashauth", version, about = "Sign in to the admin dashboard API")]
struct Cli {
    /// Backend origin, e.g. https://admin.example.com
    #[arg(long, global = true)]
    api_origin: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and store the issued tokens
    Login {
        #[arg(short, long)]
        username: Option<String>,
        /// Ask the server for a long-lived session
        #[arg(long)]
        remember: bool,
    },
    /// Sign out and drop stored tokens
    Logout,
    /// Restore the session and print the current user
    Whoami,
    /// Show what is stored locally, without touching the network
    Status,
    /// Open a client route through the route guard
    Open {
        /// Route path such as /dashboard or /login
        path: String,
    },
}

/// Initialize the tracing subscriber for logging
fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match config.log_to_file.then(|| config.data_dir()) {
        Some(Ok(dir)) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {}", e);
        Config::default()
    });
    if let Ok(origin) = std::env::var("DASHAUTH_API_ORIGIN") {
        config.api_origin = origin;
    }
    if let Some(origin) = cli.api_origin {
        config.api_origin = origin;
    }

    let _log_guard = init_tracing(&config);
    info!(api_origin = %config.api_origin, "dashauth starting");

    match cli.command {
        Command::Login { username, remember } => commands::login(&mut config, username, remember).await,
        Command::Logout => commands::logout(&config).await,
        Command::Whoami => commands::whoami(&config).await,
        Command::Status => commands::status(&config),
        Command::Open { path } => commands::open(&config, &path).await,
    }
}
