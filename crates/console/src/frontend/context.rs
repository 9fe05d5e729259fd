//! Reactive session context shared by every component.

use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use leptos::*;

use munifact_auth::{AuthStatus, Authorizer};
use munifact_events::{InMemoryEventBus, SessionSignal, Subscription};

use crate::api::ApiClient;
use crate::config::ConsoleConfig;
use crate::nav_view::{ExpiryNotice, ExpiryWatcher};
use crate::session_store::SessionStore;
use crate::storage::{LocalStorage, SharedStore};

const SIGNAL_POLL: Duration = Duration::from_millis(250);

/// Session store plus the reactive mirrors the views render from.
///
/// The mirrors are re-read from the store whenever a session signal is
/// observed, so components never patch them directly.
#[derive(Clone)]
pub struct SessionContext {
    store: Rc<SessionStore<ApiClient>>,
    status: RwSignal<AuthStatus>,
    authorizer: RwSignal<Authorizer>,
    display_name: RwSignal<Option<String>>,
    expiry: RwSignal<Option<ExpiryNotice>>,
}

impl SessionContext {
    fn new() -> Self {
        let config = ConsoleConfig::from_lookup(|key| match key {
            "MUNIFACT_API_URL" => option_env!("MUNIFACT_API_URL").map(String::from),
            _ => None,
        })
        .unwrap_or_else(|e| {
            logging::warn!("invalid build-time API URL ({e}); using the default");
            ConsoleConfig::default()
        });

        let bus = Arc::new(InMemoryEventBus::new());
        let storage: SharedStore = Arc::new(LocalStorage);
        let client = ApiClient::new(&config, storage.clone(), bus.clone());
        let store = Rc::new(SessionStore::new(client, storage, bus));

        Self {
            store,
            status: create_rw_signal(AuthStatus::Undetermined),
            authorizer: create_rw_signal(Authorizer::anonymous()),
            display_name: create_rw_signal(None),
            expiry: create_rw_signal(None),
        }
    }

    pub fn store(&self) -> Rc<SessionStore<ApiClient>> {
        self.store.clone()
    }

    pub fn status(&self) -> AuthStatus {
        self.status.get()
    }

    pub fn authorizer(&self) -> Authorizer {
        self.authorizer.get()
    }

    pub fn display_name(&self) -> Option<String> {
        self.display_name.get()
    }

    pub fn expiry(&self) -> Option<ExpiryNotice> {
        self.expiry.get()
    }

    pub fn expiry_signal(&self) -> RwSignal<Option<ExpiryNotice>> {
        self.expiry
    }

    pub fn dismiss_expiry(&self) {
        self.expiry.set(None);
    }

    /// Copy the store's current state into the reactive mirrors.
    pub fn sync(&self) {
        let session = self.store.session();
        self.status.set(self.store.status());
        self.authorizer.set(session.authorizer());
        self.display_name.set(session.display_name().map(str::to_string));
    }

    pub async fn login(&self, identifier: String, secret: String) -> bool {
        let ok = self.store.login(&identifier, &secret).await;
        self.sync();
        ok
    }

    pub async fn logout(&self) {
        self.store.logout().await;
        self.sync();
    }
}

/// Provides [`SessionContext`] to its children and keeps it current.
#[component]
pub fn SessionProvider(children: Children) -> impl IntoView {
    let ctx = SessionContext::new();
    provide_context(ctx.clone());

    let changes: Rc<Subscription<SessionSignal>> = Rc::new(ctx.store.subscribe());
    let watcher = Rc::new(ExpiryWatcher::mount(&ctx.store));
    {
        let ctx = ctx.clone();
        set_interval(
            move || {
                if let Some(notice) = watcher.poll() {
                    ctx.expiry.set(Some(notice));
                }
                if !changes.drain().is_empty() || ctx.store.observe_signals() {
                    ctx.sync();
                }
            },
            SIGNAL_POLL,
        );
    }

    {
        let ctx = ctx.clone();
        spawn_local(async move {
            ctx.store.initialize().await;
            ctx.sync();
        });
    }

    children()
}

pub fn use_session() -> SessionContext {
    expect_context::<SessionContext>()
}
