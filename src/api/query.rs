//! Cached, retrying user list query
//!
//! The last successful list is kept in the key-value storage next to the
//! session, so it stays fresh across runs until `stale_time` has passed.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::users::UsersService;
use super::ApiError;
use crate::auth::{jwt, KeyValueStorage};
use crate::models::PaginatedUsers;

/// Storage key holding the cached user list
pub const USERS_CACHE_KEY: &str = "users";

/// Upper bound for the delay between attempts
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize, Deserialize)]
struct CachedUsers {
    /// Wall clock of the fetch, Unix seconds
    fetched_at: f64,
    users: PaginatedUsers,
}

/// Serves the last user list while it is fresh; refetches with retries otherwise.
pub struct UsersQuery {
    storage: Arc<dyn KeyValueStorage>,
    stale_time: Duration,
    retries: u32,
    retry_delay: Duration,
}

impl UsersQuery {
    pub fn new(storage: Arc<dyn KeyValueStorage>, stale_time: Duration, retries: u32) -> Self {
        Self {
            storage,
            stale_time,
            retries,
            retry_delay: Duration::from_secs(1),
        }
    }

    /// Base delay, doubled after every failed attempt.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub async fn fetch(&self, service: &dyn UsersService) -> Result<PaginatedUsers, ApiError> {
        if let Some(users) = self.fresh() {
            tracing::debug!("Serving cached user list");
            return Ok(users);
        }

        let mut attempt = 0;
        loop {
            match service.get_all().await {
                Ok(users) => {
                    self.store(&users);
                    return Ok(users);
                }
                Err(e) if attempt < self.retries => {
                    let delay = self.backoff(attempt);
                    attempt += 1;
                    tracing::warn!(
                        "Fetching users failed ({}), retry {}/{} in {:?}",
                        e,
                        attempt,
                        self.retries,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Drop the cached list so the next fetch goes to the service.
    pub fn invalidate(&self) {
        if let Err(e) = self.storage.remove_item(USERS_CACHE_KEY) {
            tracing::warn!("Failed to drop cached user list: {:#}", e);
        }
    }

    fn fresh(&self) -> Option<PaginatedUsers> {
        let raw = self.storage.get_item(USERS_CACHE_KEY)?;
        let cached: CachedUsers = match serde_json::from_str(&raw) {
            Ok(cached) => cached,
            Err(e) => {
                tracing::debug!("Ignoring unreadable user cache: {}", e);
                return None;
            }
        };
        let age = jwt::now_secs() - cached.fetched_at;
        (0.0..self.stale_time.as_secs_f64())
            .contains(&age)
            .then_some(cached.users)
    }

    fn store(&self, users: &PaginatedUsers) {
        let cached = CachedUsers {
            fetched_at: jwt::now_secs(),
            users: users.clone(),
        };
        let result = serde_json::to_string(&cached)
            .map_err(anyhow::Error::from)
            .and_then(|json| self.storage.set_item(USERS_CACHE_KEY, &json));
        if let Err(e) = result {
            tracing::warn!("Failed to cache user list: {:#}", e);
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.retry_delay
            .checked_mul(factor)
            .unwrap_or(MAX_RETRY_DELAY)
            .min(MAX_RETRY_DELAY)
    }
}
