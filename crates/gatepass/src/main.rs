// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gatepass - invite link manager for an external identity provider.
//!
//! Binary entry point: CLI parsing, configuration loading, logging setup,
//! and the HTTP gateway.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod serve;
mod service;

/// Gatepass - invite link manager for an external identity provider.
#[derive(Parser, Debug)]
#[command(name = "gatepass", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Gatepass HTTP gateway.
    Serve,
    /// Load the configuration, validate it, and print a summary.
    CheckConfig,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup
    let config = match gatepass_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            gatepass_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    // RUST_LOG overrides the configured level.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.server.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Some(Commands::CheckConfig) => {
            println!(
                "gatepass: config ok ({} policy rules, flow slug {:?})",
                config.policy.rules.len(),
                config.directory.flow_slug
            );
        }
        Some(Commands::Serve) | None => {
            if let Err(err) = serve::run(config).await {
                tracing::error!(error = %err, "server exited");
                std::process::exit(1);
            }
        }
    }
}
