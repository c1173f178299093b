//! User directory service

use async_trait::async_trait;
use serde::Deserialize;

use super::client::AuthedClient;
use super::ApiError;
use crate::fake::FakeBehavior;
use crate::models::{PaginatedUsers, User};

#[async_trait]
pub trait UsersService: Send + Sync {
    async fn get_all(&self) -> Result<PaginatedUsers, ApiError>;
}

/// `GET {users_url}` response envelope
#[derive(Debug, Deserialize)]
struct UsersResponse {
    users: Vec<User>,
    total: u64,
}

pub struct UsersApiService {
    client: AuthedClient,
    users_url: String,
}

impl UsersApiService {
    pub fn new(client: AuthedClient, users_url: impl Into<String>) -> Self {
        Self {
            client,
            users_url: users_url.into(),
        }
    }
}

#[async_trait]
impl UsersService for UsersApiService {
    async fn get_all(&self) -> Result<PaginatedUsers, ApiError> {
        let resp: UsersResponse = self.client.get_json(&self.users_url).await?;
        Ok(PaginatedUsers {
            list: resp.users,
            total: resp.total,
        })
    }
}

/// Serves a fixed pair of users.
pub struct UsersFakeService {
    behavior: FakeBehavior,
}

impl UsersFakeService {
    pub fn new(behavior: FakeBehavior) -> Self {
        Self { behavior }
    }
}

fn mocked_users() -> Vec<User> {
    vec![
        User {
            id: 1,
            first_name: "Emily".to_string(),
            last_name: "Johnson".to_string(),
            email: "emily.johnson@x.dummyjson.com".to_string(),
            image: "https://dummyjson.com/icon/emilys/128".to_string(),
        },
        User {
            id: 2,
            first_name: "Michael".to_string(),
            last_name: "Williams".to_string(),
            email: "michael.williams@x.dummyjson.com".to_string(),
            image: "https://dummyjson.com/icon/michaelw/128".to_string(),
        },
    ]
}

#[async_trait]
impl UsersService for UsersFakeService {
    async fn get_all(&self) -> Result<PaginatedUsers, ApiError> {
        self.behavior
            .simulate(|| {
                let list = mocked_users();
                let total = list.len() as u64;
                PaginatedUsers { list, total }
            })
            .await
            .map_err(|_| ApiError::Simulated)
    }
}
