//! Credential record and its persistence

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::storage::KeyValueStorage;

/// Storage key holding the serialized credential record
pub const LOGIN_DATA_KEY: &str = "loginData";

/// Access/refresh token pair returned by `/login/` and `/refresh/`.
///
/// Missing fields decode as empty strings so that a record without an
/// access token is seen as invalid rather than unreadable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    #[serde(default)]
    pub access: String,
    #[serde(default)]
    pub refresh: String,
}

impl CredentialRecord {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
        }
    }

    pub fn has_access(&self) -> bool {
        !self.access.is_empty()
    }
}

/// Saves, loads and clears the single credential record.
#[derive(Clone)]
pub struct TokenStore {
    storage: Arc<dyn KeyValueStorage>,
}

impl TokenStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    /// Overwrite the stored record.
    pub fn save(&self, record: &CredentialRecord) {
        let serialized = match serde_json::to_string(record) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("Failed to serialize credential record: {}", e);
                return;
            }
        };
        if let Err(e) = self.storage.set_item(LOGIN_DATA_KEY, &serialized) {
            tracing::warn!("Failed to persist credential record: {:#}", e);
        }
    }

    /// Read the stored record. Missing or unparsable data reads as `None`.
    pub fn load(&self) -> Option<CredentialRecord> {
        let serialized = self.storage.get_item(LOGIN_DATA_KEY)?;
        if serialized.is_empty() {
            return None;
        }
        match serde_json::from_str(&serialized) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::debug!("Stored credential record is unreadable: {}", e);
                None
            }
        }
    }

    pub fn clear(&self) {
        if let Err(e) = self.storage.remove_item(LOGIN_DATA_KEY) {
            tracing::warn!("Failed to remove credential record: {:#}", e);
        }
    }
}
