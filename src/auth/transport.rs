//! Login/refresh transports
//!
//! `HttpAuthTransport` talks to the real API (`POST /login/`,
//! `POST /refresh/`); `FakeAuthTransport` issues unsigned tokens in-process.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;

use super::jwt::{encode_unsigned, now_secs};
use super::{truncate_body, AuthError, CredentialRecord};
use crate::fake::FakeBehavior;

const FAKE_REFRESH_PREFIX: &str = "fake-refresh-";

/// Credentials payload for `/login/`
#[derive(Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

/// Network side of the session manager.
#[async_trait]
pub trait AuthTransport: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> Result<CredentialRecord, AuthError>;
    async fn refresh(&self, refresh_token: &str) -> Result<CredentialRecord, AuthError>;
}

/// reqwest-backed transport against `{base_url}/login/` and `{base_url}/refresh/`.
pub struct HttpAuthTransport {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAuthTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(AuthError::transport)?;
        Ok(Self::with_client(http, base_url))
    }

    pub fn with_client(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}/", self.base_url, path)
    }

    async fn post(
        &self,
        url: &str,
        body: &(impl Serialize + Sync),
    ) -> Result<reqwest::Response, AuthError> {
        tracing::debug!("Auth POST {}", url);
        self.http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(AuthError::transport)
    }
}

async fn parse_record(resp: reqwest::Response) -> Result<CredentialRecord, AuthError> {
    resp.json::<CredentialRecord>()
        .await
        .map_err(|e| AuthError::TransportFailure(format!("invalid credential response: {}", e)))
}

#[async_trait]
impl AuthTransport for HttpAuthTransport {
    async fn login(&self, request: &LoginRequest) -> Result<CredentialRecord, AuthError> {
        let url = self.endpoint("login");
        let resp = self.post(&url, request).await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::LoginRejected {
                status: status.as_u16(),
                message: truncate_body(&body),
            });
        }

        parse_record(resp).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<CredentialRecord, AuthError> {
        let url = self.endpoint("refresh");
        let resp = self
            .post(&url, &RefreshRequest {
                refresh: refresh_token,
            })
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::RefreshFailed(format!(
                "HTTP {}: {}",
                status.as_u16(),
                truncate_body(&body)
            )));
        }

        parse_record(resp).await
    }
}

/// In-process token issuer for offline use and demos.
///
/// Accepts any non-empty username/password and refresh tokens it issued itself.
pub struct FakeAuthTransport {
    behavior: FakeBehavior,
    token_lifetime: Duration,
}

impl FakeAuthTransport {
    pub fn new(behavior: FakeBehavior, token_lifetime: Duration) -> Self {
        Self {
            behavior,
            token_lifetime,
        }
    }

    fn issue(&self, subject: &str) -> CredentialRecord {
        let exp = (now_secs() + self.token_lifetime.as_secs_f64()).floor();
        let access = encode_unsigned(&json!({
            "sub": subject,
            "exp": exp,
            "jti": uuid::Uuid::new_v4().to_string(),
        }));
        let refresh = format!("{}{}:{}", FAKE_REFRESH_PREFIX, subject, uuid::Uuid::new_v4());
        CredentialRecord::new(access, refresh)
    }
}

#[async_trait]
impl AuthTransport for FakeAuthTransport {
    async fn login(&self, request: &LoginRequest) -> Result<CredentialRecord, AuthError> {
        let issued = self
            .behavior
            .simulate(|| {
                if request.username.is_empty() || request.password.is_empty() {
                    None
                } else {
                    Some(self.issue(&request.username))
                }
            })
            .await
            .map_err(AuthError::transport)?;

        issued.ok_or_else(|| AuthError::LoginRejected {
            status: 401,
            message: "username and password are required".to_string(),
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<CredentialRecord, AuthError> {
        let subject = refresh_token
            .strip_prefix(FAKE_REFRESH_PREFIX)
            .and_then(|rest| rest.rsplit_once(':'))
            .map(|(subject, _)| subject.to_string());

        let issued = self
            .behavior
            .simulate(|| subject.map(|s| self.issue(&s)))
            .await
            .map_err(|e| AuthError::RefreshFailed(e.to_string()))?;

        issued.ok_or_else(|| AuthError::RefreshFailed("unknown refresh token".to_string()))
    }
}
