//! admin-cli - user directory admin client
//!
//! Logs in against the directory API, keeps the session token pair in local
//! storage and lists users page by page.

mod api;
mod app;
mod auth;
mod config;
mod fake;
mod models;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::App;
use crate::config::Config;

#[derive(Parser)]
#[command(name = "admin-cli")]
#[command(about = "Terminal admin client for the user directory API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the session tokens
    Login {
        #[arg(short, long)]
        username: String,

        /// Password (falls back to ADMIN_CLI_PASSWORD)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Log out and clear stored tokens
    Logout,

    /// Show current session status
    Status,

    /// List users
    Users {
        /// Page number, starting at 1
        #[arg(short, long, default_value = "1")]
        page: usize,

        /// Rows per page (defaults to users.page_size from config)
        #[arg(long)]
        page_size: Option<usize>,

        /// Only show users whose name or email contains this text
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Show the effective configuration
    Config {
        /// Write it to the config file, creating the file if needed
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Login { username, password } => {
            let app = App::from_config(config)?;
            tracing::info!("Logging in...");
            auth::login(&app, &username, password).await?;
        }
        Commands::Logout => {
            let app = App::from_config(config)?;
            tracing::info!("Logging out...");
            auth::logout(&app).await?;
        }
        Commands::Status => {
            let app = App::from_config(config)?;
            auth::status(&app).await?;
        }
        Commands::Users {
            page,
            page_size,
            filter,
        } => {
            let app = App::from_config(config)?;
            tracing::info!("Fetching users...");
            api::list_users(&app, page, page_size, filter.as_deref()).await?;
        }
        Commands::Config { init } => {
            let path = match cli.config {
                Some(path) => path,
                None => Config::default_path()?,
            };
            show_config(&config, &path, init)?;
        }
    }

    Ok(())
}

/// Print the effective config, or write it to `path` with `--init`
fn show_config(config: &Config, path: &Path, init: bool) -> Result<()> {
    if init {
        config.save(path)?;
        println!("Config written to {}", path.display());
    } else {
        println!("# {}", path.display());
        print!("{}", toml::to_string_pretty(config)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_config_init_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.users.page_size = 7;

        show_config(&config, &path, true).unwrap();
        assert_eq!(Config::load(Some(&path)).unwrap(), config);
    }

    #[test]
    fn test_show_config_without_init_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        show_config(&Config::default(), &path, false).unwrap();
        assert!(!path.exists());
    }
}
