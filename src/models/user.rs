//! User directory models

use serde::{Deserialize, Serialize};

/// User profile as served by the directory API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub image: String,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    fn matches(&self, needle: &str) -> bool {
        self.first_name.to_lowercase().contains(needle)
            || self.last_name.to_lowercase().contains(needle)
            || self.full_name().to_lowercase().contains(needle)
            || self.email.to_lowercase().contains(needle)
    }
}

/// A user list with the server-side total
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PaginatedUsers {
    pub list: Vec<User>,
    pub total: u64,
}

/// One page of a (possibly filtered) user list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPage {
    pub items: Vec<User>,
    /// 1-based
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub total_matches: usize,
}

/// Case-insensitive match on first, last and full name and email.
pub fn filter_users<'a>(users: &'a [User], query: &str) -> Vec<&'a User> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return users.iter().collect();
    }
    users.iter().filter(|u| u.matches(&needle)).collect()
}

/// Cut `page` (1-based, 0 treated as 1) out of `users`.
pub fn paginate(users: &[&User], page: usize, page_size: usize) -> UserPage {
    let page_size = page_size.max(1);
    let page = page.max(1);
    let total_matches = users.len();
    let total_pages = total_matches.div_ceil(page_size);

    let start = (page - 1).saturating_mul(page_size);
    let items = users
        .iter()
        .skip(start)
        .take(page_size)
        .map(|u| (*u).clone())
        .collect();

    UserPage {
        items,
        page,
        page_size,
        total_pages,
        total_matches,
    }
}
