//! The single source of truth for the console session.
//!
//! All mutation goes through four operations: [`SessionStore::initialize`],
//! [`SessionStore::login`], [`SessionStore::logout`] and
//! [`SessionStore::refresh_authorization`]; plus the local logout applied when
//! a credential-expired signal is observed. Everything else reads snapshots.
//!
//! Concurrent refreshes are not ordered: whichever response resolves last
//! overwrites the authorization snapshot. A refresh that resolves after the
//! session was cleared (or replaced by another subject) is dropped.

use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use munifact_auth::{authorize, AuthStatus, Authorizer, AuthzError, Permission, Session};
use munifact_events::{broadcast, EventBus, SessionSignal, SignalBus, Subscription};

use crate::backend::AuthBackend;
use crate::error::ApiError;
use crate::persistence::{self, Restored};
use crate::storage::SharedStore;
use crate::types::AuthorizationPayload;

/// Result of a successful [`SessionStore::refresh_authorization`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The fresh authorization set replaced the previous one.
    Applied,
    /// Nothing to refresh (unauthenticated), or the session changed while
    /// the request was in flight.
    Skipped,
    /// The backend no longer knows the subject; the session was logged out.
    SubjectMissing,
}

#[derive(Debug, Default)]
struct State {
    session: Session,
    status: AuthStatus,
}

pub struct SessionStore<B> {
    backend: B,
    store: SharedStore,
    bus: SignalBus,
    state: Mutex<State>,
    expiry: Mutex<Subscription<SessionSignal>>,
}

impl<B: AuthBackend> SessionStore<B> {
    /// Create the store in the `Undetermined` state; call
    /// [`SessionStore::initialize`] to settle it.
    pub fn new(backend: B, store: SharedStore, bus: SignalBus) -> Self {
        let expiry = bus.subscribe();
        Self {
            backend,
            store,
            bus,
            state: Mutex::new(State::default()),
            expiry: Mutex::new(expiry),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn bus(&self) -> &SignalBus {
        &self.bus
    }

    /// Subscribe to session signals (navigation, notices).
    pub fn subscribe(&self) -> Subscription<SessionSignal> {
        self.bus.subscribe()
    }

    /// Restore the persisted session, then confirm it with the backend.
    ///
    /// A persisted credential makes the session optimistically authenticated
    /// before the refresh runs; if the backend no longer knows the subject,
    /// the session is logged out. A refresh that fails for other reasons
    /// keeps the optimistic session.
    pub async fn initialize(&self) -> AuthStatus {
        match persistence::load(&*self.store) {
            Restored::Empty => {
                self.with_state(|state| state.status = AuthStatus::Unauthenticated);
                tracing::debug!("no persisted session");
            }
            Restored::Orphaned => {
                tracing::warn!("persisted credential has no subject; clearing it");
                self.clear_local();
            }
            Restored::Session(snapshot) => {
                let subject = snapshot.subject.id;
                self.with_state(|state| {
                    state.session = Session::restore(snapshot);
                    state.status = AuthStatus::Authenticated;
                });
                tracing::info!(%subject, "restored persisted session");
                broadcast(&self.bus, SessionSignal::PermissionsUpdated);

                match self.refresh_authorization().await {
                    Ok(outcome) => tracing::debug!(?outcome, "initial authorization refresh"),
                    Err(e) => tracing::warn!(error = %e, "initial authorization refresh failed"),
                }
            }
        }
        self.status()
    }

    /// Exchange credentials for a session. Returns `false` on any failure,
    /// leaving the current session untouched.
    pub async fn login(&self, identifier: &str, secret: &str) -> bool {
        self.observe_signals();

        let response = match self.backend.login(identifier, secret).await {
            Ok(response) => response,
            Err(e) => {
                tracing::info!(identifier, error = %e, "login failed");
                self.with_state(|state| {
                    if state.status == AuthStatus::Undetermined {
                        state.status = AuthStatus::Unauthenticated;
                    }
                });
                return false;
            }
        };

        let authorization = response.user.authorization();
        let session = Session::authenticated(
            response.user.subject(),
            response.credential(),
            &authorization.grants(),
            authorization.service_ids(),
            Utc::now(),
        );

        // Expiries queued by requests made with the previous credential belong
        // to the old session and must not clear this one.
        self.observe_signals();

        let subject = session.subject_id();
        self.with_state(|state| {
            if let Some(snapshot) = session.snapshot() {
                if let Err(e) = persistence::save(&*self.store, &snapshot) {
                    tracing::error!(error = %e, "failed to persist session; it will not survive a reload");
                }
            }
            state.session = session;
            state.status = AuthStatus::Authenticated;
        });
        tracing::info!(subject = ?subject, "login succeeded");
        broadcast(&self.bus, SessionSignal::PermissionsUpdated);
        true
    }

    /// End the session. Always succeeds locally; the server-side revoke is
    /// best effort. Calling it again is a no-op.
    pub async fn logout(&self) {
        self.observe_signals();

        if persistence::credential(&*self.store).is_some() {
            if let Err(e) = self.backend.logout().await {
                tracing::warn!(error = %e, "server-side logout failed; clearing local session anyway");
            }
        }

        // A rejected revoke queues an expiry; consume it here so it cannot
        // clear the next session.
        let expired = self.observe_signals();
        if self.clear_local() || expired {
            tracing::info!("logged out");
            broadcast(&self.bus, SessionSignal::PermissionsUpdated);
        }
    }

    /// Re-fetch roles, permissions and services and overwrite them.
    pub async fn refresh_authorization(&self) -> Result<RefreshOutcome, ApiError> {
        self.observe_signals();

        let subject = self.with_state(|state| {
            state
                .session
                .is_authenticated()
                .then(|| state.session.subject_id())
                .flatten()
        });
        let Some(subject) = subject else {
            return Ok(RefreshOutcome::Skipped);
        };

        let fetched = self.backend.fetch_authorization(subject).await;
        self.observe_signals();

        let payload: AuthorizationPayload = match fetched? {
            Some(payload) => payload,
            None => {
                tracing::warn!(%subject, "subject no longer exists; logging out");
                self.logout().await;
                return Ok(RefreshOutcome::SubjectMissing);
            }
        };

        // Memory and storage are updated under the same lock so a concurrent
        // logout or refresh cannot interleave with the write.
        let applied = self.with_state(|state| {
            if !state.session.is_authenticated() || state.session.subject_id() != Some(subject) {
                return None;
            }
            let session = &mut state.session;
            session.apply_authorization(&payload.grants(), payload.service_ids());
            if let Err(e) = persistence::save_authorization(
                &*self.store,
                session.roles(),
                session.permissions(),
                session.services(),
            ) {
                tracing::error!(error = %e, "failed to persist refreshed authorization");
            }
            Some(session.permissions().len())
        });

        let Some(permissions) = applied else {
            tracing::debug!(%subject, "session changed while refreshing; dropping stale result");
            return Ok(RefreshOutcome::Skipped);
        };

        tracing::info!(%subject, permissions, "authorization refreshed");
        broadcast(&self.bus, SessionSignal::PermissionsUpdated);
        Ok(RefreshOutcome::Applied)
    }

    /// Apply any pending credential-expired signal. Returns `true` when the
    /// session was cleared as a result.
    pub fn observe_signals(&self) -> bool {
        let expired = match self.expiry.lock() {
            Ok(sub) => sub
                .drain()
                .into_iter()
                .any(|signal| signal == SessionSignal::CredentialExpired),
            Err(_) => false,
        };

        if expired && self.clear_local() {
            tracing::warn!("credential expired; session cleared");
            return true;
        }
        false
    }

    /// Snapshot of the current session.
    pub fn session(&self) -> Session {
        self.observe_signals();
        self.with_state(|state| state.session.clone())
    }

    pub fn status(&self) -> AuthStatus {
        self.observe_signals();
        self.with_state(|state| state.status)
    }

    pub fn is_authenticated(&self) -> bool {
        self.status() == AuthStatus::Authenticated
    }

    /// Predicate over the current permission set.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.observe_signals();
        self.with_state(|state| state.session.has_permission(permission))
    }

    /// `Ok` when the current session holds `permission`.
    pub fn authorize(&self, permission: &Permission) -> Result<(), AuthzError> {
        authorize(&self.authorizer(), permission)
    }

    /// Predicate snapshot for rendering one view of the current session.
    pub fn authorizer(&self) -> Authorizer {
        self.observe_signals();
        self.with_state(|state| state.session.authorizer())
    }

    /// Clear persisted and in-memory state. Returns whether anything was
    /// authenticated before.
    fn clear_local(&self) -> bool {
        self.with_state(|state| {
            if let Err(e) = persistence::clear(&*self.store) {
                tracing::error!(error = %e, "failed to clear persisted session");
            }
            let was_authenticated = state.session.is_authenticated();
            state.session.clear();
            state.status = AuthStatus::Unauthenticated;
            was_authenticated
        })
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        f(&mut lock(&self.state))
    }
}

/// A poisoned lock only means a panic happened mid-update elsewhere; the
/// session is still a plain value, so keep using it.
fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use munifact_core::{ServiceId, SubjectId};
    use munifact_events::InMemoryEventBus;
    use tokio::sync::oneshot;

    use crate::storage::{KeyValueStore, MemoryStore};
    use crate::types::{LoginResponse, PermissionPayload, RolePayload, ServicePayload, UserPayload};

    fn role(name: &str, perms: &[&str]) -> RolePayload {
        RolePayload {
            name: name.to_string(),
            permissions: perms
                .iter()
                .map(|p| PermissionPayload { name: p.to_string() })
                .collect(),
        }
    }

    fn authorization(roles: Vec<RolePayload>, services: &[u64]) -> AuthorizationPayload {
        AuthorizationPayload {
            roles,
            servicios: services
                .iter()
                .map(|id| ServicePayload { id: ServiceId::new(*id) })
                .collect(),
        }
    }

    type Pending = oneshot::Receiver<Result<Option<AuthorizationPayload>, ApiError>>;

    /// Backend fake: login answers are fixed; each refresh waits on the next
    /// queued oneshot so tests decide completion order.
    #[derive(Default)]
    struct FakeBackend {
        login: Mutex<Option<Result<LoginResponse, ApiError>>>,
        refreshes: Mutex<VecDeque<Pending>>,
        issued: AtomicUsize,
        logouts: AtomicUsize,
        logout_fails: bool,
    }

    impl FakeBackend {
        fn accepting(roles: Vec<RolePayload>, services: &[u64]) -> Self {
            let auth = authorization(roles, services);
            let response = LoginResponse {
                token: "tok-1".into(),
                user: UserPayload {
                    id: SubjectId::new(1),
                    name: "Ana".into(),
                    roles: auth.roles,
                    servicios: auth.servicios,
                },
            };
            Self {
                login: Mutex::new(Some(Ok(response))),
                ..Self::default()
            }
        }

        fn rejecting() -> Self {
            Self {
                login: Mutex::new(Some(Err(ApiError::RequestFailed {
                    status: 422,
                    body: r#"{"message":"credenciales inválidas"}"#.into(),
                }))),
                ..Self::default()
            }
        }

        fn queue_refresh(&self) -> oneshot::Sender<Result<Option<AuthorizationPayload>, ApiError>> {
            let (tx, rx) = oneshot::channel();
            self.refreshes.lock().unwrap().push_back(rx);
            tx
        }
    }

    #[async_trait]
    impl AuthBackend for FakeBackend {
        async fn login(&self, _identifier: &str, _secret: &str) -> Result<LoginResponse, ApiError> {
            self.login
                .lock()
                .unwrap()
                .clone()
                .unwrap_or(Err(ApiError::Transport("no login configured".into())))
        }

        async fn fetch_authorization(&self, _subject: SubjectId) -> Result<Option<AuthorizationPayload>, ApiError> {
            let pending = self.refreshes.lock().unwrap().pop_front();
            self.issued.fetch_add(1, Ordering::SeqCst);
            match pending {
                Some(rx) => rx.await.unwrap_or(Err(ApiError::Transport("dropped".into()))),
                None => Err(ApiError::Transport("no refresh queued".into())),
            }
        }

        async fn logout(&self) -> Result<(), ApiError> {
            self.logouts.fetch_add(1, Ordering::SeqCst);
            if self.logout_fails {
                Err(ApiError::Transport("offline".into()))
            } else {
                Ok(())
            }
        }
    }

    fn bus() -> SignalBus {
        Arc::new(InMemoryEventBus::new())
    }

    fn store_with(backend: FakeBackend) -> (SessionStore<FakeBackend>, SharedStore) {
        let storage = MemoryStore::shared();
        (SessionStore::new(backend, storage.clone(), bus()), storage)
    }

    #[tokio::test]
    async fn starts_undetermined() {
        let (store, _) = store_with(FakeBackend::default());
        assert_eq!(store.status(), AuthStatus::Undetermined);
    }

    #[tokio::test]
    async fn login_grants_exactly_the_role_permissions() {
        let (store, storage) = store_with(FakeBackend::accepting(vec![role("admin", &["users.index"])], &[4]));

        assert!(store.login("ana", "secreto").await);

        assert!(store.has_permission("users.index"));
        assert!(!store.has_permission("users.destroy"));
        assert_eq!(store.status(), AuthStatus::Authenticated);
        assert!(store.session().is_subscribed_to(ServiceId::new(4)));
        assert_eq!(storage.get(persistence::TOKEN).as_deref(), Some("tok-1"));
    }

    #[tokio::test]
    async fn failed_login_returns_false_and_stays_unauthenticated() {
        let (store, storage) = store_with(FakeBackend::rejecting());

        assert!(!store.login("ana", "mala").await);

        assert_eq!(store.status(), AuthStatus::Unauthenticated);
        assert!(store.session().credential().is_none());
        assert_eq!(storage.get(persistence::TOKEN), None);
    }

    #[tokio::test]
    async fn logout_is_idempotent_even_when_revoke_fails() {
        let mut backend = FakeBackend::accepting(vec![role("admin", &["users.index"])], &[1]);
        backend.logout_fails = true;
        let (store, storage) = store_with(backend);
        store.login("ana", "secreto").await;
        let signals = store.subscribe();

        store.logout().await;
        let once = store.session();
        store.logout().await;

        assert_eq!(store.session(), once);
        assert_eq!(once, Session::empty());
        assert_eq!(store.backend().logouts.load(Ordering::SeqCst), 1);
        assert_eq!(persistence::load(&*storage), Restored::Empty);
        assert_eq!(signals.drain(), vec![SessionSignal::PermissionsUpdated]);
    }

    #[tokio::test]
    async fn expiry_queued_before_relogin_does_not_clear_the_new_session() {
        let (store, storage) = store_with(FakeBackend::accepting(vec![role("admin", &["users.index"])], &[1]));
        store.login("ana", "secreto").await;

        broadcast(store.bus(), SessionSignal::CredentialExpired);
        assert!(store.login("ana", "secreto").await);

        assert_eq!(store.status(), AuthStatus::Authenticated);
        assert!(store.has_permission("users.index"));
        assert_eq!(storage.get(persistence::TOKEN).as_deref(), Some("tok-1"));
    }

    #[tokio::test]
    async fn authorize_reports_why_access_is_refused() {
        let (store, _) = store_with(FakeBackend::accepting(vec![role("admin", &["users.index"])], &[1]));
        let index = Permission::from_static("users.index");
        assert_eq!(store.authorize(&index), Err(AuthzError::Unauthenticated));

        store.login("ana", "secreto").await;

        assert_eq!(store.authorize(&index), Ok(()));
        assert_eq!(
            store.authorize(&Permission::from_static("users.destroy")),
            Err(AuthzError::Forbidden("users.destroy".into()))
        );
    }

    #[tokio::test]
    async fn refresh_overwrites_with_the_union_of_new_roles() {
        let (store, _) = store_with(FakeBackend::accepting(vec![role("admin", &["users.index"])], &[1]));
        store.login("ana", "secreto").await;

        let tx = store.backend().queue_refresh();
        tx.send(Ok(Some(authorization(
            vec![role("caja", &["recibos.index"]), role("lectura", &["recibos.index", "clientes.index"])],
            &[2],
        ))))
        .unwrap();

        assert_eq!(store.refresh_authorization().await, Ok(RefreshOutcome::Applied));

        let session = store.session();
        let perms: Vec<&str> = session.permissions().iter().map(|p| p.as_str()).collect();
        assert_eq!(perms, vec!["clientes.index", "recibos.index"]);
        assert!(!session.roles().contains("admin"));
        assert_eq!(session.subject_id(), Some(SubjectId::new(1)));
        assert!(session.is_subscribed_to(ServiceId::new(2)));
    }

    #[tokio::test]
    async fn refresh_without_session_is_a_noop() {
        let (store, _) = store_with(FakeBackend::default());
        assert_eq!(store.refresh_authorization().await, Ok(RefreshOutcome::Skipped));
        assert_eq!(store.backend().issued.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn restores_persisted_session_and_refreshes() {
        let storage = MemoryStore::shared();
        {
            let first = SessionStore::new(
                FakeBackend::accepting(vec![role("admin", &["users.index"])], &[7]),
                storage.clone(),
                bus(),
            );
            first.login("ana", "secreto").await;
        }

        let backend = FakeBackend::default();
        let tx = backend.queue_refresh();
        tx.send(Ok(Some(authorization(vec![role("admin", &["users.index", "roles.index"])], &[7]))))
            .unwrap();
        let reloaded = SessionStore::new(backend, storage, bus());

        assert_eq!(reloaded.initialize().await, AuthStatus::Authenticated);
        assert!(reloaded.has_permission("roles.index"));
        assert!(reloaded.session().is_subscribed_to(ServiceId::new(7)));
    }

    #[tokio::test]
    async fn restored_session_is_logged_out_when_subject_is_gone() {
        let storage = MemoryStore::shared();
        let first = SessionStore::new(
            FakeBackend::accepting(vec![role("admin", &["users.index"])], &[]),
            storage.clone(),
            bus(),
        );
        first.login("ana", "secreto").await;

        let backend = FakeBackend::default();
        backend.queue_refresh().send(Ok(None)).unwrap();
        let reloaded = SessionStore::new(backend, storage.clone(), bus());

        assert_eq!(reloaded.initialize().await, AuthStatus::Unauthenticated);
        assert_eq!(persistence::load(&*storage), Restored::Empty);
    }

    #[tokio::test]
    async fn restored_session_survives_an_unreachable_backend() {
        let storage = MemoryStore::shared();
        let first = SessionStore::new(
            FakeBackend::accepting(vec![role("admin", &["users.index"])], &[]),
            storage.clone(),
            bus(),
        );
        first.login("ana", "secreto").await;

        let reloaded = SessionStore::new(FakeBackend::default(), storage, bus());

        assert_eq!(reloaded.initialize().await, AuthStatus::Authenticated);
        assert!(reloaded.has_permission("users.index"));
    }

    #[tokio::test]
    async fn orphaned_credential_is_cleared() {
        let storage = MemoryStore::shared();
        storage.set(persistence::TOKEN, "tok").unwrap();
        let store = SessionStore::new(FakeBackend::default(), storage.clone(), bus());

        assert_eq!(store.initialize().await, AuthStatus::Unauthenticated);
        assert_eq!(storage.get(persistence::TOKEN), None);
    }

    #[tokio::test]
    async fn expiry_signal_clears_the_session() {
        let (store, storage) = store_with(FakeBackend::accepting(vec![role("admin", &["users.index"])], &[]));
        store.login("ana", "secreto").await;

        broadcast(store.bus(), SessionSignal::CredentialExpired);

        assert!(store.session().credential().is_none());
        assert_eq!(store.status(), AuthStatus::Unauthenticated);
        assert!(!store.has_permission("users.index"));
        assert_eq!(storage.get(persistence::USER_ID), None);
    }

    #[tokio::test]
    async fn out_of_order_refreshes_keep_the_last_to_complete() {
        let backend = FakeBackend::accepting(vec![role("admin", &["users.index"])], &[]);
        let first_tx = backend.queue_refresh();
        let second_tx = backend.queue_refresh();
        let store = Arc::new(SessionStore::new(backend, MemoryStore::shared(), bus()));
        store.login("ana", "secreto").await;

        let first = tokio::spawn({
            let store = store.clone();
            async move { store.refresh_authorization().await }
        });
        while store.backend().issued.load(Ordering::SeqCst) < 1 {
            tokio::task::yield_now().await;
        }
        let second = tokio::spawn({
            let store = store.clone();
            async move { store.refresh_authorization().await }
        });
        while store.backend().issued.load(Ordering::SeqCst) < 2 {
            tokio::task::yield_now().await;
        }

        // The later-issued request resolves first...
        second_tx
            .send(Ok(Some(authorization(vec![role("second", &["roles.index"])], &[2]))))
            .unwrap();
        assert_eq!(second.await.unwrap(), Ok(RefreshOutcome::Applied));

        // ...and the earlier-issued one resolves last and wins.
        first_tx
            .send(Ok(Some(authorization(vec![role("first", &["clientes.index"])], &[1]))))
            .unwrap();
        assert_eq!(first.await.unwrap(), Ok(RefreshOutcome::Applied));

        let session = store.session();
        assert!(session.has_permission("clientes.index"));
        assert!(!session.has_permission("roles.index"));
        assert!(session.is_subscribed_to(ServiceId::new(1)));
        assert!(!session.is_subscribed_to(ServiceId::new(2)));
    }

    #[tokio::test]
    async fn refresh_resolving_after_logout_is_dropped() {
        let backend = FakeBackend::accepting(vec![role("admin", &["users.index"])], &[]);
        let tx = backend.queue_refresh();
        let store = Arc::new(SessionStore::new(backend, MemoryStore::shared(), bus()));
        store.login("ana", "secreto").await;

        let refresh = tokio::spawn({
            let store = store.clone();
            async move { store.refresh_authorization().await }
        });
        while store.backend().issued.load(Ordering::SeqCst) < 1 {
            tokio::task::yield_now().await;
        }
        store.logout().await;

        tx.send(Ok(Some(authorization(vec![role("admin", &["users.index"])], &[3]))))
            .unwrap();

        assert_eq!(refresh.await.unwrap(), Ok(RefreshOutcome::Skipped));
        assert_eq!(store.session(), Session::empty());
    }
}
