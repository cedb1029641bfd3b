//! Warden command-line interface.
//!
//! Role-gated record keeping with a full audit trail, driven from an
//! interactive banking shell.
//!
//! # Quick Start
//!
//! ```bash
//! # Write a default warden.toml into the current directory
//! warden config init
//!
//! # Start the shell and log in as the bootstrap admin
//! warden shell
//! warden> login admin admin123
//! ```

mod bank;
mod commands;
mod style;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use warden_config::WardenConfig;

/// Warden - role-gated records with an audit trail.
#[derive(Parser)]
#[command(name = "warden")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version information.
    Version,

    /// Interactive banking shell.
    Shell {
        /// Project directory holding warden.toml.
        #[arg(short, long, default_value = ".")]
        project: String,

        /// Disable colored output.
        #[arg(long)]
        no_color: bool,
    },

    /// Configuration management commands.
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration.
    Show {
        /// Project directory holding warden.toml.
        #[arg(short, long, default_value = ".")]
        project: String,

        /// Output format (toml, json).
        #[arg(short, long, default_value = "toml")]
        format: String,
    },

    /// Write a default warden.toml.
    Init {
        /// Project directory.
        #[arg(default_value = ".")]
        path: String,
    },

    /// Validate the configuration files.
    Validate {
        /// Project directory holding warden.toml.
        #[arg(short, long, default_value = ".")]
        project: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if std::env::var_os("NO_COLOR").is_some() {
        style::set_no_color(true);
    }

    match cli.command {
        Commands::Version => {
            commands::version::run();
            Ok(())
        }
        Commands::Shell { project, no_color } => {
            if no_color {
                style::set_no_color(true);
            }
            let config =
                WardenConfig::load_from_dir(&project).context("Failed to load configuration")?;
            init_logging(&config.logging.level);
            commands::shell::run(&config)
        }
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show { project, format } => commands::config::show(&project, &format),
            ConfigCommands::Init { path } => commands::config::init(&path),
            ConfigCommands::Validate { project } => commands::config::validate(&project),
        },
    }
}

/// Logs to stderr so shell output stays clean; `RUST_LOG` overrides `level`.
fn init_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .init();
}
