//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod admin;
mod config_cmd;
mod geo;
mod init;
mod serve;
mod sessions;
mod stats;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings_with_options, LoadOptions};

#[derive(Parser)]
#[command(name = "ligabairro")]
#[command(about = "Neighborhood mutual-aid marketplace server")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Data directory (overrides config file and environment)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory and database
    Init,

    /// Start the API server
    Serve {
        /// Address to bind to: PORT, HOST, or HOST:PORT (default: 127.0.0.1:4000)
        #[arg(default_value = "127.0.0.1:4000")]
        bind: String,
    },

    /// Manage user roles and bans
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Show platform statistics
    Stats {
        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Service-area utilities
    Geo {
        #[command(subcommand)]
        command: GeoCommands,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Session maintenance
    Sessions {
        #[command(subcommand)]
        command: SessionCommands,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Grant the admin role
    Promote { email: String },
    /// Revoke the admin role
    Demote { email: String },
    /// Ban a user and end their sessions
    Ban { email: String },
    /// Lift a ban
    Unban { email: String },
}

#[derive(Subcommand)]
enum GeoCommands {
    /// Check whether a point is inside the service area
    #[command(allow_negative_numbers = true)]
    Check { lat: f64, lng: f64 },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
}

#[derive(Subcommand)]
enum SessionCommands {
    /// Delete expired sessions
    Purge,
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        data_dir: cli.data_dir,
    };
    let (settings, config) = load_settings_with_options(options).await;

    match cli.command {
        Commands::Init => init::cmd_init(&settings).await,
        Commands::Serve { bind } => serve::cmd_serve(settings, &bind).await,
        Commands::Admin { command } => match command {
            AdminCommands::Promote { email } => admin::cmd_promote(&settings, &email).await,
            AdminCommands::Demote { email } => admin::cmd_demote(&settings, &email).await,
            AdminCommands::Ban { email } => admin::cmd_ban(&settings, &email, true).await,
            AdminCommands::Unban { email } => admin::cmd_ban(&settings, &email, false).await,
        },
        Commands::Stats { json } => stats::cmd_stats(&settings, json).await,
        Commands::Geo { command } => match command {
            GeoCommands::Check { lat, lng } => geo::cmd_geo_check(&settings, lat, lng),
        },
        Commands::Config { command } => match command {
            ConfigCommands::Show => config_cmd::cmd_config_show(&settings, &config),
        },
        Commands::Sessions { command } => match command {
            SessionCommands::Purge => sessions::cmd_sessions_purge(&settings).await,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve_default_bind() {
        let cli = Cli::try_parse_from(["ligabairro", "serve"]).unwrap();
        match cli.command {
            Commands::Serve { bind } => assert_eq!(bind, "127.0.0.1:4000"),
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["ligabairro", "stats", "--json", "--data-dir", "/tmp/x", "-v"])
                .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/x")));
        assert!(matches!(cli.command, Commands::Stats { json: true }));
    }

    #[test]
    fn test_parse_negative_coordinates() {
        let cli = Cli::try_parse_from(["ligabairro", "geo", "check", "-29.64", "-53.25"]).unwrap();
        match cli.command {
            Commands::Geo {
                command: GeoCommands::Check { lat, lng },
            } => {
                assert_eq!(lat, -29.64);
                assert_eq!(lng, -53.25);
            }
            _ => panic!("expected geo check"),
        }
    }

    #[test]
    fn test_parse_admin_ban() {
        let cli = Cli::try_parse_from(["ligabairro", "admin", "ban", "x@example.com"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Admin {
                command: AdminCommands::Ban { .. }
            }
        ));
    }
}
