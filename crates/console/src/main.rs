//! Headless console entry point.
//!
//! ```text
//! munifact-console login <usuario> <contraseña>
//! munifact-console whoami
//! munifact-console nav <catalogo>
//! munifact-console list <recurso>
//! munifact-console logout
//! ```

#[cfg(not(target_arch = "wasm32"))]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::run(std::env::args().skip(1).collect()).await
}

#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use std::sync::Arc;

    use anyhow::{bail, Context};

    use munifact_auth::AuthStatus;
    use munifact_console::{
        catalog, Action, ApiClient, ConsoleConfig, FileStore, NavigationView, Resource, SessionStore, SharedStore,
    };
    use munifact_events::InMemoryEventBus;

    const USAGE: &str =
        "usage: munifact-console <login <usuario> <contraseña> | whoami | nav <catalogo> | list <recurso> | logout>";

    pub async fn run(args: Vec<String>) -> anyhow::Result<()> {
        let config = ConsoleConfig::from_env().context("invalid console configuration")?;
        munifact_observability::init(&config.log_filter);

        let state_file = config.require_state_file()?;
        let storage: SharedStore = Arc::new(
            FileStore::open(state_file)
                .with_context(|| format!("cannot open session state at {}", state_file.display()))?,
        );
        let bus = Arc::new(InMemoryEventBus::new());
        let client = ApiClient::new(&config, storage.clone(), bus.clone());
        let store = SessionStore::new(client, storage, bus);

        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        match args.as_slice() {
            ["login", identifier, secret] => {
                store.initialize().await;
                if !store.login(identifier, secret).await {
                    bail!("login failed");
                }
                whoami(&store);
            }
            ["whoami"] => {
                store.initialize().await;
                whoami(&store);
            }
            ["nav", name] => {
                let Some(catalog) = catalog::by_name(name) else {
                    bail!("unknown catalog {name:?}");
                };
                if store.initialize().await != AuthStatus::Authenticated {
                    bail!("not logged in");
                }
                let view = NavigationView::mount(catalog, &store);
                for entry in view.entries() {
                    println!("{}\t{}", entry.target, entry.label);
                }
            }
            ["list", name] => {
                let Some(resource) = Resource::from_domain(name) else {
                    bail!("unknown resource {name:?}");
                };
                store.initialize().await;
                store
                    .authorize(&resource.permission(Action::Index))
                    .with_context(|| format!("cannot list {}", resource.domain()))?;
                let rows = store.backend().list(resource).await?;
                println!("{}", serde_json::to_string_pretty(&rows)?);
            }
            ["logout"] => {
                store.initialize().await;
                store.logout().await;
                println!("sesión cerrada");
            }
            _ => bail!(USAGE),
        }
        Ok(())
    }

    fn whoami(store: &SessionStore<ApiClient>) {
        let session = store.session();
        match session.subject() {
            Some(subject) => {
                println!("{} ({})", subject.display_name, subject.id);
                for permission in session.permissions() {
                    println!("  {permission}");
                }
            }
            None => println!("sin sesión"),
        }
    }
}
