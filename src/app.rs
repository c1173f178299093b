//! Wiring: builds storage, transport, session and services from config

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::api::{AuthedClient, UsersApiService, UsersFakeService, UsersQuery, UsersService};
use crate::auth::{
    AuthTransport, FakeAuthTransport, FileStorage, HttpAuthTransport, KeyValueStorage,
    MemoryStorage, SessionManager, SessionOptions, TokenStore,
};
use crate::config::{Backend, Config, StorageKind};

/// Process-wide services, constructed once in `main`.
pub struct App {
    pub config: Config,
    pub session: SessionManager,
    pub users: Arc<dyn UsersService>,
    pub query: UsersQuery,
}

impl App {
    pub fn from_config(config: Config) -> Result<Self> {
        let storage: Arc<dyn KeyValueStorage> = match config.session.storage {
            StorageKind::File => {
                let storage = FileStorage::new(Config::storage_path()?);
                tracing::debug!("Session storage at {}", storage.path().display());
                Arc::new(storage)
            }
            StorageKind::Memory => Arc::new(MemoryStorage::new()),
        };
        Self::with_storage(config, storage)
    }

    pub fn with_storage(config: Config, storage: Arc<dyn KeyValueStorage>) -> Result<Self> {
        let transport: Arc<dyn AuthTransport> = match config.api.backend {
            Backend::Api => Arc::new(
                HttpAuthTransport::new(&config.api.base_url, config.timeout())
                    .context("Failed to build auth transport")?,
            ),
            Backend::Fake => Arc::new(FakeAuthTransport::new(
                config.fake_behavior(),
                config.token_lifetime(),
            )),
        };

        let session = SessionManager::new(
            transport,
            TokenStore::new(storage.clone()),
            SessionOptions {
                return_unexpired_token: config.session.return_unexpired_token,
            },
        );

        let users: Arc<dyn UsersService> = match config.api.backend {
            Backend::Api => {
                let client = AuthedClient::new(session.clone(), config.timeout())
                    .context("Failed to build HTTP client")?;
                Arc::new(UsersApiService::new(client, config.api.users_url.clone()))
            }
            Backend::Fake => Arc::new(UsersFakeService::new(config.fake_behavior())),
        };

        let query = UsersQuery::new(storage, config.stale_time(), config.users.retries);

        Ok(Self {
            config,
            session,
            users,
            query,
        })
    }
}
