use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{EventBus, InMemoryEventBus};

/// Cross-component notifications about the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionSignal {
    /// The backend rejected the bearer credential (401/403).
    CredentialExpired,
    /// The permission set changed (login, refresh, logout).
    PermissionsUpdated,
}

/// The bus type shared by one console process.
pub type SignalBus = Arc<InMemoryEventBus<SessionSignal>>;

/// Publish `signal`, logging instead of failing: a lost notification must
/// not turn a completed backend call into an error.
pub fn broadcast(bus: &SignalBus, signal: SessionSignal) {
    if let Err(e) = bus.publish(signal) {
        tracing::error!(?signal, error = ?e, "failed to broadcast session signal");
    }
}
