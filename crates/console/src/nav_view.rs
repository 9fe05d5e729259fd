//! Mounted consumers of session signals.
//!
//! A view reads the session store on mount (the bus does not replay past
//! signals) and re-derives itself whenever a signal arrives while mounted.

use munifact_auth::{NavCatalog, NavEntry};
use munifact_events::{SessionSignal, Subscription};

use crate::backend::AuthBackend;
use crate::session_store::SessionStore;

/// The visible entries of one catalog, kept current with the session.
pub struct NavigationView {
    catalog: &'static NavCatalog,
    entries: Vec<&'static NavEntry>,
    signals: Option<Subscription<SessionSignal>>,
}

impl NavigationView {
    pub fn mount<B: AuthBackend>(catalog: &'static NavCatalog, store: &SessionStore<B>) -> Self {
        let signals = store.subscribe();
        let entries = catalog.visible(&store.authorizer());
        tracing::debug!(catalog = catalog.name, visible = entries.len(), "navigation mounted");
        Self {
            catalog,
            entries,
            signals: Some(signals),
        }
    }

    /// Re-derive the entries if any signal arrived since the last poll.
    /// Returns whether the entries were recomputed.
    pub fn poll<B: AuthBackend>(&mut self, store: &SessionStore<B>) -> bool {
        let Some(signals) = &self.signals else {
            return false;
        };
        if signals.drain().is_empty() {
            return false;
        }
        self.entries = self.catalog.visible(&store.authorizer());
        true
    }

    pub fn catalog(&self) -> &'static NavCatalog {
        self.catalog
    }

    pub fn entries(&self) -> &[&'static NavEntry] {
        &self.entries
    }

    pub fn is_mounted(&self) -> bool {
        self.signals.is_some()
    }

    /// Stop listening; the last derived entries stay readable.
    pub fn unmount(&mut self) {
        if let Some(signals) = self.signals.take() {
            signals.unsubscribe();
        }
    }
}

/// User-facing notice that the session ended because the credential expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryNotice;

impl ExpiryNotice {
    pub const MESSAGE: &'static str = "Su sesión ha expirado. Inicie sesión nuevamente.";

    pub fn message(&self) -> &'static str {
        Self::MESSAGE
    }
}

/// Listens for credential expiry so the UI can tell the user why they were
/// sent back to the login screen.
pub struct ExpiryWatcher {
    signals: Subscription<SessionSignal>,
}

impl ExpiryWatcher {
    pub fn mount<B: AuthBackend>(store: &SessionStore<B>) -> Self {
        Self {
            signals: store.subscribe(),
        }
    }

    /// One notice per poll, however many expiries were queued.
    pub fn poll(&self) -> Option<ExpiryNotice> {
        self.signals
            .drain()
            .into_iter()
            .any(|signal| signal == SessionSignal::CredentialExpired)
            .then_some(ExpiryNotice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use munifact_core::SubjectId;
    use munifact_events::{broadcast, InMemoryEventBus};

    use crate::catalog;
    use crate::error::ApiError;
    use crate::storage::MemoryStore;
    use crate::types::{
        AuthorizationPayload, LoginResponse, PermissionPayload, RolePayload, UserPayload,
    };

    struct Backend {
        permissions: Vec<&'static str>,
    }

    #[async_trait]
    impl AuthBackend for Backend {
        async fn login(&self, _identifier: &str, _secret: &str) -> Result<LoginResponse, ApiError> {
            Ok(LoginResponse {
                token: "tok".into(),
                user: UserPayload {
                    id: SubjectId::new(5),
                    name: "Marta".into(),
                    roles: vec![RolePayload {
                        name: "operador".into(),
                        permissions: self
                            .permissions
                            .iter()
                            .map(|p| PermissionPayload { name: p.to_string() })
                            .collect(),
                    }],
                    servicios: Vec::new(),
                },
            })
        }

        async fn fetch_authorization(&self, _subject: SubjectId) -> Result<Option<AuthorizationPayload>, ApiError> {
            Ok(Some(AuthorizationPayload::default()))
        }

        async fn logout(&self) -> Result<(), ApiError> {
            Ok(())
        }
    }

    fn store(permissions: Vec<&'static str>) -> SessionStore<Backend> {
        SessionStore::new(
            Backend { permissions },
            MemoryStore::shared(),
            Arc::new(InMemoryEventBus::new()),
        )
    }

    fn targets(view: &NavigationView) -> Vec<&str> {
        view.entries().iter().map(|e| e.target.as_ref()).collect()
    }

    #[tokio::test]
    async fn view_follows_login_and_logout() {
        let store = store(vec!["users.index"]);
        let mut view = NavigationView::mount(&catalog::USUARIOS, &store);
        assert!(view.entries().is_empty());

        store.login("marta", "secreto").await;
        assert!(view.poll(&store));
        assert_eq!(targets(&view), vec!["/usuarios"]);

        store.logout().await;
        assert!(view.poll(&store));
        assert!(view.entries().is_empty());

        assert!(!view.poll(&store));
    }

    #[tokio::test]
    async fn view_mounted_after_login_reads_current_state() {
        let store = store(vec!["clientes.index", "cuentas.index"]);
        store.login("marta", "secreto").await;

        let view = NavigationView::mount(&catalog::CLIENTES, &store);
        assert_eq!(targets(&view), vec!["/clientes", "/cuentas"]);
    }

    #[tokio::test]
    async fn unmounted_view_stops_updating() {
        let store = store(vec!["users.index"]);
        let mut view = NavigationView::mount(&catalog::USUARIOS, &store);
        view.unmount();

        store.login("marta", "secreto").await;
        assert!(!view.is_mounted());
        assert!(!view.poll(&store));
        assert!(view.entries().is_empty());
    }

    #[tokio::test]
    async fn expiry_raises_a_single_notice_and_hides_entries() {
        let store = store(vec!["users.index"]);
        store.login("marta", "secreto").await;
        let mut view = NavigationView::mount(&catalog::USUARIOS, &store);
        let watcher = ExpiryWatcher::mount(&store);

        broadcast(store.bus(), SessionSignal::CredentialExpired);

        assert_eq!(watcher.poll(), Some(ExpiryNotice));
        assert_eq!(watcher.poll(), None);
        assert!(view.poll(&store));
        assert!(view.entries().is_empty());
    }
}
