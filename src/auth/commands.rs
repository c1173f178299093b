//! `login`, `logout` and `status` commands

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use super::{LoginRequest, SessionStatus};
use crate::app::App;

/// Environment variable consulted when `--password` is not given
pub const PASSWORD_ENV: &str = "ADMIN_CLI_PASSWORD";

/// Log in and persist the returned credential record
pub async fn login(app: &App, username: &str, password: Option<String>) -> Result<()> {
    let password = match password {
        Some(p) => p,
        None => std::env::var(PASSWORD_ENV).with_context(|| {
            format!("No password given. Pass --password or set {}.", PASSWORD_ENV)
        })?,
    };

    app.session
        .login(&LoginRequest::new(username, password))
        .await
        .context("Login failed")?;
    app.query.invalidate();

    println!("Login successful.");
    Ok(())
}

/// Clear stored credentials
pub async fn logout(app: &App) -> Result<()> {
    app.session.logout();
    app.query.invalidate();
    println!("Logged out.");
    Ok(())
}

/// Display current auth status
pub async fn status(app: &App) -> Result<()> {
    println!("{}", describe_status(&app.session.status()));
    if app.session.get_current_token().is_none() {
        println!("\nRun 'admin-cli login' to authenticate.");
    }
    Ok(())
}

fn format_timestamp(secs: f64) -> String {
    DateTime::<Utc>::from_timestamp(secs.floor() as i64, 0)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| format!("{} (unix)", secs))
}

fn describe_status(status: &SessionStatus) -> String {
    match status {
        SessionStatus::NoSession => "Session:     none".to_string(),
        SessionStatus::Invalid(reason) => format!("Session:     invalid ({})", reason),
        SessionStatus::Active { expires_at: None } => {
            "Session:     valid\n  expires_at: never".to_string()
        }
        SessionStatus::Active {
            expires_at: Some(exp),
        } => format!("Session:     valid\n  expires_at: {}", format_timestamp(*exp)),
        SessionStatus::Expired { expired_at } => format!(
            "Session:     expired (refreshed on next request)\n  expired_at: {}",
            format_timestamp(*expired_at)
        ),
    }
}
