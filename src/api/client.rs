//! Authenticated HTTP client
//!
//! Wraps reqwest::Client, asking the session manager for a token before
//! every request.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::ApiError;
use crate::auth::SessionManager;

#[derive(Clone)]
pub struct AuthedClient {
    http: reqwest::Client,
    session: SessionManager,
}

impl AuthedClient {
    pub fn new(session: SessionManager, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, session })
    }

    /// Attach the bearer token when the session hands one out.
    /// Without one the request goes out anonymously.
    async fn authorize(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, ApiError> {
        match self.session.get_valid_token().await? {
            Some(record) => Ok(request.bearer_auth(record.access)),
            None => {
                tracing::debug!("No token to attach, sending request without credentials");
                Ok(request)
            }
        }
    }

    /// GET `url` and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        tracing::debug!("GET {}", url);
        let request = self.authorize(self.http.get(url)).await?;
        let resp = check_response(request.send().await?).await?;
        decode_json(resp, url).await
    }

    /// POST `body` as JSON to `url` and decode the JSON reply.
    pub async fn post_json<B, T>(&self, url: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        tracing::debug!("POST {}", url);
        let request = self.authorize(self.http.post(url).json(body)).await?;
        let resp = check_response(request.send().await?).await?;
        decode_json(resp, url).await
    }
}

/// Map non-success statuses to `ApiError`.
async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ApiError::from_status(status, &body))
}

async fn decode_json<T: DeserializeOwned>(resp: reqwest::Response, url: &str) -> Result<T, ApiError> {
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes)
        .map_err(|e| ApiError::InvalidResponse(format!("{} returned unexpected JSON: {}", url, e)))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{json, Value};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::auth::{
        jwt, CredentialRecord, HttpAuthTransport, MemoryStorage, SessionOptions, TokenStore,
    };

    fn client_for(server: &MockServer, options: SessionOptions) -> (AuthedClient, TokenStore) {
        let store = TokenStore::new(Arc::new(MemoryStorage::new()));
        let transport = HttpAuthTransport::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let session = SessionManager::new(Arc::new(transport), store.clone(), options);
        (
            AuthedClient::new(session, Duration::from_secs(5)).unwrap(),
            store,
        )
    }

    fn token(offset_secs: f64) -> String {
        jwt::encode_unsigned(&json!({"exp": jwt::now_secs() + offset_secs}))
    }

    #[tokio::test]
    async fn test_attaches_bearer_token() {
        let server = MockServer::start().await;
        let (client, store) = client_for(
            &server,
            SessionOptions {
                return_unexpired_token: true,
            },
        );
        let access = token(600.0);
        store.save(&CredentialRecord::new(access.clone(), "r1"));

        Mock::given(method("GET"))
            .and(path("/users"))
            .and(header("authorization", format!("Bearer {}", access).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let body: Value = client
            .get_json(&format!("{}/users", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, json!({"ok": true}));
    }

    #[tokio::test]
    async fn test_refreshes_expired_token_before_request() {
        let server = MockServer::start().await;
        let (client, store) = client_for(&server, SessionOptions::default());
        store.save(&CredentialRecord::new(token(-60.0), "r1"));
        let fresh = token(600.0);

        Mock::given(method("POST"))
            .and(path("/refresh/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"access": fresh, "refresh": "r2"})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/items"))
            .and(header("authorization", format!("Bearer {}", fresh).as_str()))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 1})))
            .expect(1)
            .mount(&server)
            .await;

        let body: Value = client
            .post_json(&format!("{}/items", server.uri()), &json!({"name": "x"}))
            .await
            .unwrap();
        assert_eq!(body["id"], 1);
        assert_eq!(store.load().unwrap().refresh, "r2");
    }

    #[tokio::test]
    async fn test_sends_anonymously_without_session() {
        let server = MockServer::start().await;
        let (client, _) = client_for(&server, SessionOptions::default());

        Mock::given(method("GET"))
            .and(path("/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let _: Value = client
            .get_json(&format!("{}/users", server.uri()))
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(!requests[0].headers.contains_key("authorization"));
    }

    #[tokio::test]
    async fn test_refresh_failure_aborts_request() {
        let server = MockServer::start().await;
        let (client, store) = client_for(&server, SessionOptions::default());
        store.save(&CredentialRecord::new(token(-60.0), "r1"));

        Mock::given(method("POST"))
            .and(path("/refresh/"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client
            .get_json::<Value>(&format!("{}/users", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Auth(_)), "{:?}", err);

        let requests = server.received_requests().await.unwrap();
        assert!(requests.iter().all(|r| r.url.path() != "/users"));
    }

    #[tokio::test]
    async fn test_unauthorized_status() {
        let server = MockServer::start().await;
        let (client, _) = client_for(&server, SessionOptions::default());

        Mock::given(method("GET"))
            .and(path("/users"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client
            .get_json::<Value>(&format!("{}/users", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
    }
}
