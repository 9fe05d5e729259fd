//! Authentication endpoints consumed by the session store.

use async_trait::async_trait;

use munifact_core::SubjectId;

use crate::error::ApiError;
use crate::types::{AuthorizationPayload, LoginResponse};

/// The part of the backend the session store depends on.
///
/// [`crate::ApiClient`] implements it over HTTP; tests substitute in-memory
/// fakes to control timing and payloads.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait AuthBackend {
    /// Exchange credentials for a token and the user's authorization set.
    async fn login(&self, identifier: &str, secret: &str) -> Result<LoginResponse, ApiError>;

    /// Current roles/permissions/services of `subject`; `Ok(None)` when the
    /// backend no longer knows the subject.
    async fn fetch_authorization(&self, subject: SubjectId) -> Result<Option<AuthorizationPayload>, ApiError>;

    /// Best-effort server-side revoke of the current credential.
    async fn logout(&self) -> Result<(), ApiError>;
}
