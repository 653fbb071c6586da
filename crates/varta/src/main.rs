// SPDX-FileCopyrightText: 2026 Varta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Varta -- a generative-AI chat assistant.
//!
//! This is the binary entry point: configuration loading, logging setup,
//! and dispatch into the interactive shell.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod shell;

/// Varta -- a generative-AI chat assistant.
#[derive(Parser, Debug)]
#[command(name = "varta", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Launch the interactive chat shell (default).
    Shell,
    /// Print the resolved configuration.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup.
    let config = match varta_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            varta_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.agent.log_level.clone())),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or(Commands::Shell) {
        Commands::Shell => {
            if let Err(error) = shell::run_shell(config).await {
                eprintln!("error: {error}");
                std::process::exit(1);
            }
        }
        Commands::Config => {
            match toml::to_string_pretty(&config) {
                Ok(rendered) => println!("{rendered}"),
                Err(error) => {
                    eprintln!("error: failed to render config: {error}");
                    std::process::exit(1);
                }
            }
        }
    }
}
