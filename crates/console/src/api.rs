//! The one request helper every backend call goes through.
//!
//! Every request carries the persisted credential as a bearer token when one
//! exists. A 401/403 answer to such a request means the credential is no
//! longer valid: the persisted credential is cleared, a single
//! [`SessionSignal::CredentialExpired`] is broadcast, and the caller gets
//! [`ApiError::AuthorizationExpired`] instead of a normal failure.
//!
//! `POST /login` is the exception: it never carries a credential, so a
//! rejected login is an ordinary [`ApiError::RequestFailed`].

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use async_trait::async_trait;

use munifact_auth::Credential;
use munifact_core::SubjectId;
use munifact_events::{broadcast, SessionSignal, SignalBus};

use crate::backend::AuthBackend;
use crate::config::ConsoleConfig;
use crate::error::ApiError;
use crate::persistence;
use crate::resources::Resource;
use crate::storage::SharedStore;
use crate::types::{AuthorizationPayload, LoginRequest, LoginResponse};

/// HTTP client for the console backend.
///
/// Cloning is cheap; clones share the connection pool, the persisted store
/// and the signal bus.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    store: SharedStore,
    bus: SignalBus,
}

impl ApiClient {
    pub fn new(config: &ConsoleConfig, store: SharedStore, bus: SignalBus) -> Self {
        Self {
            base_url: config.api_url.clone(),
            http: reqwest::Client::new(),
            store,
            bus,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn bus(&self) -> &SignalBus {
        &self.bus
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(Method::GET, path, None::<&()>).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized + Sync,
    {
        self.send(Method::POST, path, Some(body)).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized + Sync,
    {
        self.send(Method::PUT, path, Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(Method::DELETE, path, None::<&()>).await
    }

    pub async fn list(&self, resource: Resource) -> Result<Value, ApiError> {
        self.get(&resource.collection_path()).await
    }

    pub async fn show(&self, resource: Resource, id: u64) -> Result<Value, ApiError> {
        self.get(&resource.item_path(id)).await
    }

    pub async fn create(&self, resource: Resource, body: &Value) -> Result<Value, ApiError> {
        self.post(&resource.collection_path(), body).await
    }

    pub async fn update(&self, resource: Resource, id: u64, body: &Value) -> Result<Value, ApiError> {
        self.put(&resource.item_path(id), body).await
    }

    pub async fn destroy(&self, resource: Resource, id: u64) -> Result<(), ApiError> {
        self.delete::<Value>(&resource.item_path(id)).await.map(|_| ())
    }

    async fn send<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized + Sync,
    {
        let credential = persistence::credential(&*self.store);
        self.dispatch(method, path, body, credential).await
    }

    /// Like `send`, but never attaches the credential, so a 401/403 is an
    /// ordinary failure (used for `POST /login`).
    async fn send_anonymous<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized + Sync,
    {
        self.dispatch(method, path, body, None).await
    }

    async fn dispatch<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        credential: Option<Credential>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized + Sync,
    {
        let mut req = self.http.request(method.clone(), self.url(path));
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = self.execute(&method, path, req, credential.as_ref()).await?;
        decode(resp).await
    }

    /// Attach `credential`, send, and classify the response status.
    async fn execute(
        &self,
        method: &Method,
        path: &str,
        req: RequestBuilder,
        credential: Option<&Credential>,
    ) -> Result<Response, ApiError> {
        let req = match credential {
            Some(c) => req.bearer_auth(c.expose()),
            None => req,
        };

        let resp = req.send().await.map_err(|e| {
            tracing::warn!(%method, path, error = %e, "backend unreachable");
            ApiError::Transport(e.to_string())
        })?;

        let status = resp.status();
        if status.is_success() {
            tracing::debug!(%method, path, status = status.as_u16(), "backend call ok");
            return Ok(resp);
        }

        if let Some(sent) = credential {
            if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
                self.expire_credential(method, path, status, sent);
                return Err(ApiError::AuthorizationExpired);
            }
        }

        let body = resp.text().await.unwrap_or_default();
        tracing::info!(%method, path, status = status.as_u16(), "backend call failed");
        Err(ApiError::RequestFailed {
            status: status.as_u16(),
            body,
        })
    }

    /// Clear the persisted credential and broadcast the expiry, unless a
    /// newer credential has replaced the rejected one in the meantime.
    fn expire_credential(&self, method: &Method, path: &str, status: StatusCode, sent: &Credential) {
        let current = persistence::credential(&*self.store);
        if current.as_ref().map(Credential::expose) != Some(sent.expose()) {
            tracing::debug!(%method, path, status = status.as_u16(), "rejected credential already replaced");
            return;
        }

        tracing::warn!(%method, path, status = status.as_u16(), "credential rejected; expiring session");
        if let Err(e) = persistence::clear_credential(&*self.store) {
            tracing::error!(error = %e, "failed to clear persisted credential");
        }
        broadcast(&self.bus, SessionSignal::CredentialExpired);
    }
}

/// Decode a success body; an empty body decodes as JSON `null`.
async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    let text = resp.text().await?;
    let text = if text.trim().is_empty() { "null" } else { text.as_str() };
    serde_json::from_str(text).map_err(|e| ApiError::Decode(e.to_string()))
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl AuthBackend for ApiClient {
    async fn login(&self, identifier: &str, secret: &str) -> Result<LoginResponse, ApiError> {
        let body = LoginRequest {
            identifier: identifier.to_string(),
            secret: secret.to_string(),
        };
        self.send_anonymous(Method::POST, "/login", Some(&body)).await
    }

    async fn fetch_authorization(&self, subject: SubjectId) -> Result<Option<AuthorizationPayload>, ApiError> {
        match self.get(&format!("/users/{subject}")).await {
            Err(ApiError::RequestFailed { status: 404, .. }) => Ok(None),
            other => other,
        }
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.post::<Value, _>("/logout", &serde_json::json!({})).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use munifact_events::{EventBus, InMemoryEventBus};

    use crate::storage::{KeyValueStore, MemoryStore};

    #[test]
    fn url_joins_without_double_slash() {
        let config = ConsoleConfig::new("http://localhost:8000/api/").unwrap();
        let client = ApiClient::new(&config, MemoryStore::shared(), Arc::new(InMemoryEventBus::new()));

        assert_eq!(client.url("/clientes"), "http://localhost:8000/api/clientes");
        assert_eq!(client.url("users/3"), "http://localhost:8000/api/users/3");
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_transport_failure() {
        // Port 9 (discard) on loopback is not expected to accept HTTP.
        let config = ConsoleConfig::new("http://127.0.0.1:9").unwrap();
        let store = MemoryStore::shared();
        store.set(persistence::TOKEN, "tok").unwrap();
        let bus: SignalBus = Arc::new(InMemoryEventBus::new());
        let signals = bus.subscribe();
        let client = ApiClient::new(&config, store.clone(), bus);

        let err = client.list(Resource::Clientes).await.unwrap_err();

        assert!(matches!(err, ApiError::Transport(_)), "got {err:?}");
        assert_eq!(store.get(persistence::TOKEN).as_deref(), Some("tok"));
        assert!(signals.drain().is_empty());
    }
}
