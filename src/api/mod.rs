//! API client module for the user directory

pub mod client;
mod error;
pub mod query;
pub mod users;

use anyhow::{Context, Result};

pub use client::AuthedClient;
pub use error::ApiError;
pub use query::UsersQuery;
pub use users::{UsersApiService, UsersFakeService, UsersService};

use crate::app::App;
use crate::models::{filter_users, paginate, UserPage};

/// Fetch, filter and print one page of users.
pub async fn list_users(
    app: &App,
    page: usize,
    page_size: Option<usize>,
    filter: Option<&str>,
) -> Result<()> {
    let page_size = page_size.unwrap_or(app.config.users.page_size);
    let users = app
        .query
        .fetch(app.users.as_ref())
        .await
        .context("Failed to fetch users")?;

    let matches = filter_users(&users.list, filter.unwrap_or(""));
    let page = paginate(&matches, page, page_size);
    print!("{}", render_users_table(&page, users.total));
    Ok(())
}

const COLUMNS: [&str; 6] = ["ID", "First Name", "Last Name", "Name", "Email", "Image"];

fn row(user: &crate::models::User) -> [String; 6] {
    [
        user.id.to_string(),
        user.first_name.clone(),
        user.last_name.clone(),
        user.full_name(),
        user.email.clone(),
        user.image.clone(),
    ]
}

/// Plain-text table with a page footer.
fn render_users_table(page: &UserPage, server_total: u64) -> String {
    let rows: Vec<[String; 6]> = page.items.iter().map(row).collect();

    let mut widths = COLUMNS.map(|c| c.chars().count());
    for r in &rows {
        for (width, cell) in widths.iter_mut().zip(r.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let format_line = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(widths.iter())
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    out.push('\n');
    let header: Vec<String> = COLUMNS.iter().map(|c| c.to_string()).collect();
    out.push_str(&format_line(&header[..]));
    out.push('\n');
    let rule_len = widths.iter().sum::<usize>() + 2 * (widths.len() - 1);
    out.push_str(&"-".repeat(rule_len));
    out.push('\n');

    if rows.is_empty() {
        out.push_str("  (no users found)\n");
    }
    for r in &rows {
        out.push_str(&format_line(&r[..]));
        out.push('\n');
    }

    out.push_str(&format!(
        "\nPage {} of {} ({} matching, {} total)\n",
        page.page,
        page.total_pages.max(1),
        page.total_matches,
        server_total
    ));
    out
}
