#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line entry point for the `AlertaUTEC` backend.
//!
//! Runs the API server, the classification sweep (once or on a timer) and
//! the offline analytics jobs against the configured `SQLite` store. Every
//! report-producing subcommand prints JSON to stdout.

mod commands;

use std::path::PathBuf;

use alerta_config::AppConfig;
use alerta_report_models::{Role, Sector};
use clap::{Parser, Subcommand};

/// `AlertaUTEC` incident backend.
#[derive(Parser)]
#[command(name = "alerta")]
#[command(about = "AlertaUTEC incident classification and lifecycle backend")]
struct Cli {
    /// TOML config file. Defaults to `$ALERTA_CONFIG`, then built-in
    /// defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server.
    Serve {
        /// Also run the classification sweep in the background.
        #[arg(long)]
        sweep: bool,
    },

    /// Classify unclassified open reports and raise alerts.
    Sweep {
        /// Keep sweeping every `sweep.interval_secs` instead of exiting.
        #[arg(long)]
        watch: bool,
    },

    /// Print the analytics summary.
    Analytics {
        /// `today`, `week`, `month` or `year`.
        #[arg(long)]
        period: Option<String>,

        /// Restrict to one sector.
        #[arg(long)]
        sector: Option<Sector>,
    },

    /// Print counts of reports filed in the last 24 hours.
    DailyReport,

    /// Print role statistics as seen by one user.
    Stats {
        /// User id.
        #[arg(long)]
        user: String,

        /// `student`, `authority` or `admin`.
        #[arg(long)]
        role: Role,

        /// Sector, required for authorities.
        #[arg(long)]
        sector: Option<Sector>,

        #[arg(long)]
        period: Option<String>,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => {
            let mut config = AppConfig::from_file(path)?;
            config.apply_overrides(|key| std::env::var(key).ok())?;
            config
        }
        None => AppConfig::load()?,
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Serve { sweep } => {
            // actix-web runs its own system; keep it off the tokio runtime
            tokio::task::spawn_blocking(move || {
                actix_web::rt::System::new().block_on(alerta_server::run_server(config, sweep))
            })
            .await??;
        }
        Commands::Sweep { watch } => commands::sweep(&config, watch).await?,
        Commands::Analytics { period, sector } => {
            commands::analytics(&config, period.as_deref(), sector).await?;
        }
        Commands::DailyReport => commands::daily_report(&config).await?,
        Commands::Stats {
            user,
            role,
            sector,
            period,
        } => {
            let identity = alerta_report_models::Identity {
                id: user,
                role,
                sector: if role == Role::Authority { sector } else { None },
            };
            commands::stats(&config, &identity, period.as_deref()).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stats_with_typed_role_and_sector() {
        let cli = Cli::try_parse_from([
            "alerta", "stats", "--user", "a-1", "--role", "authority", "--sector", "security",
        ])
        .unwrap();

        match cli.command {
            Commands::Stats { role, sector, .. } => {
                assert_eq!(role, Role::Authority);
                assert_eq!(sector, Some(Sector::Security));
            }
            _ => panic!("expected stats"),
        }
    }

    #[test]
    fn rejects_unknown_role() {
        assert!(Cli::try_parse_from(["alerta", "stats", "--user", "x", "--role", "janitor"]).is_err());
    }
}
