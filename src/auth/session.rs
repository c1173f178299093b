//! Session manager: login, logout and deduplicated token refresh
//!
//! Any number of callers asking for a valid token while the stored access
//! token is expired share one refresh request. The in-flight refresh is kept
//! as a `Shared` future in a mutex-guarded slot; the future empties the slot
//! itself once the transport answers, before any waiter sees the outcome.

use std::sync::{Arc, Mutex, Weak};

use futures::future::{BoxFuture, FutureExt, Shared};

use super::jwt;
use super::transport::{AuthTransport, LoginRequest};
use super::{AuthError, CredentialRecord, TokenStore};

type RefreshOutcome = Result<Option<CredentialRecord>, AuthError>;
type RefreshHandle = Shared<BoxFuture<'static, RefreshOutcome>>;
type RefreshSlot = Mutex<Option<RefreshHandle>>;

#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Hand back the stored record when its access token is still valid.
    /// Off by default: `get_valid_token` then only yields a record after a refresh.
    pub return_unexpired_token: bool,
}

/// Read-only view of the stored session, for display.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionStatus {
    NoSession,
    /// A record is stored but its access token is empty or undecodable
    Invalid(String),
    Active { expires_at: Option<f64> },
    Expired { expired_at: f64 },
}

#[derive(Clone)]
pub struct SessionManager {
    transport: Arc<dyn AuthTransport>,
    store: TokenStore,
    options: SessionOptions,
    refresh_slot: Arc<RefreshSlot>,
}

impl SessionManager {
    pub fn new(transport: Arc<dyn AuthTransport>, store: TokenStore, options: SessionOptions) -> Self {
        Self {
            transport,
            store,
            options,
            refresh_slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Exchange credentials for a credential record and persist it.
    pub async fn login(&self, request: &LoginRequest) -> Result<CredentialRecord, AuthError> {
        tracing::debug!("Logging in as {}", request.username);
        let record = self.transport.login(request).await?;
        self.store.save(&record);
        tracing::info!("Logged in as {}", request.username);
        Ok(record)
    }

    /// Drop the stored record. Safe to call with nothing stored.
    pub fn logout(&self) {
        tracing::debug!("Clearing stored session");
        self.store.clear();
    }

    pub fn get_current_token(&self) -> Option<CredentialRecord> {
        self.store.load()
    }

    /// Resolve the token to use for an authenticated request.
    ///
    /// Missing, empty or undecodable access tokens log the session out and
    /// yield `None`. An expired token triggers (or joins) a refresh whose
    /// failure is returned to every waiter; the stale record is kept.
    pub async fn get_valid_token(&self) -> Result<Option<CredentialRecord>, AuthError> {
        let record = match self.get_current_token() {
            Some(record) if record.has_access() => record,
            _ => {
                self.logout();
                return Ok(None);
            }
        };

        let claims = match jwt::decode(&record.access) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::warn!("Discarding stored session: {}", e);
                self.logout();
                return Ok(None);
            }
        };

        if !claims.is_expired() {
            if self.options.return_unexpired_token {
                return Ok(Some(record));
            }
            return Ok(None);
        }

        self.refresh_handle(&record.refresh).await
    }

    /// Whether a refresh request is currently outstanding.
    pub fn is_refreshing(&self) -> bool {
        lock_slot(&self.refresh_slot).is_some()
    }

    /// Live references to the in-flight refresh handle, the slot's own included.
    #[cfg(test)]
    fn refresh_waiters(&self) -> usize {
        lock_slot(&self.refresh_slot)
            .as_ref()
            .and_then(|handle| handle.strong_count())
            .unwrap_or(0)
    }

    pub fn status(&self) -> SessionStatus {
        let record = match self.get_current_token() {
            Some(record) => record,
            None => return SessionStatus::NoSession,
        };
        if !record.has_access() {
            return SessionStatus::Invalid("access token is empty".to_string());
        }
        match jwt::decode(&record.access) {
            Err(e) => SessionStatus::Invalid(e.to_string()),
            Ok(claims) => match claims.exp {
                Some(exp) if claims.is_expired() => {
                    SessionStatus::Expired { expired_at: exp }
                }
                exp => SessionStatus::Active { expires_at: exp },
            },
        }
    }

    /// Join the in-flight refresh, or start one.
    fn refresh_handle(&self, refresh_token: &str) -> RefreshHandle {
        let mut slot = lock_slot(&self.refresh_slot);
        if let Some(handle) = slot.as_ref() {
            tracing::debug!("Joining in-flight token refresh");
            return handle.clone();
        }

        let handle = self
            .refresh_access_token(refresh_token.to_string())
            .boxed()
            .shared();
        *slot = Some(handle.clone());
        handle
    }

    fn refresh_access_token(
        &self,
        refresh_token: String,
    ) -> impl std::future::Future<Output = RefreshOutcome> + Send + 'static {
        let transport = Arc::clone(&self.transport);
        let store = self.store.clone();
        // Weak so an abandoned handle does not keep its own slot alive
        let slot: Weak<RefreshSlot> = Arc::downgrade(&self.refresh_slot);

        async move {
            tracing::info!("Access token expired, refreshing...");

            let outcome = match transport.refresh(&refresh_token).await {
                Ok(record) => {
                    store.save(&record);
                    tracing::info!("Access token refreshed");
                    Ok(store.load())
                }
                Err(e) => {
                    tracing::warn!("Token refresh failed: {}", e);
                    Err(e.into_refresh_failure())
                }
            };

            if let Some(slot) = slot.upgrade() {
                *lock_slot(&slot) = None;
            }
            outcome
        }
    }
}

fn lock_slot(slot: &RefreshSlot) -> std::sync::MutexGuard<'_, Option<RefreshHandle>> {
    slot.lock().unwrap_or_else(|e| e.into_inner())
}
