//! Leptos application with guarded routing.

use leptos::*;
use leptos_router::*;

use munifact_auth::{GuardDecision, NavCatalog, Permission, RouteGuard, LOGIN_PATH};

use crate::catalog;
use crate::frontend::context::{use_session, SessionProvider};

#[component]
pub fn App() -> impl IntoView {
    view! {
        <SessionProvider>
            <Router>
                <ExpiryToast/>
                <Routes>
                    <Route path=LOGIN_PATH view=LoginPage/>
                    <Route path="/" view=|| view! { <PrivateRoute><Shell title="Inicio"/></PrivateRoute> }/>
                    <Route path="/*any" view=GatedSection/>
                </Routes>
            </Router>
        </SessionProvider>
    }
}

/// Any catalog route; gated on the permission of its navigation entry.
#[component]
fn GatedSection() -> impl IntoView {
    let location = use_location();
    move || {
        let path = location.pathname.get();
        match catalog::route_permission(&path) {
            Some(entry) => {
                let title = entry.label.to_string();
                let permission = entry.required.clone();
                view! {
                    <PrivateRoute permission=permission>
                        <Shell title=title.clone()/>
                    </PrivateRoute>
                }
                .into_view()
            }
            None => view! { <p class="not-found">"Página no encontrada"</p> }.into_view(),
        }
    }
}

/// Renders `children` only when the guard allows it.
#[component]
pub fn PrivateRoute(#[prop(default = None)] permission: Option<Permission>, children: ChildrenFn) -> impl IntoView {
    let session = use_session();
    let guard = match permission {
        Some(p) => RouteGuard::new().requiring(p),
        None => RouteGuard::new(),
    };

    move || match guard.decide(session.status(), &session.authorizer()) {
        GuardDecision::Loading => view! { <div class="spinner" aria-busy="true"></div> }.into_view(),
        GuardDecision::Render => children().into_view(),
        GuardDecision::Denied => view! {
            <div class="denied">"No tiene permiso para acceder a esta sección."</div>
        }
        .into_view(),
        GuardDecision::Redirect { to, replace } => view! {
            <Redirect path=to options=NavigateOptions { replace, ..Default::default() }/>
        }
        .into_view(),
    }
}

/// Authenticated layout: sidebar of permitted links plus the section body.
#[component]
fn Shell(#[prop(into)] title: String) -> impl IntoView {
    let session = use_session();
    let logout = move |_| {
        let session = session.clone();
        spawn_local(async move { session.logout().await });
    };
    let name = {
        let session = use_session();
        move || session.display_name().unwrap_or_default()
    };

    view! {
        <div class="app">
            <aside>
                <p class="user">{name}</p>
                {catalog::ALL.iter().map(|c| view! { <AsideLinks catalog=*c/> }).collect_view()}
                <button on:click=logout>"Cerrar sesión"</button>
            </aside>
            <main>
                <h1>{title}</h1>
            </main>
        </div>
    }
}

/// The links of one catalog the current session may follow.
#[component]
pub fn AsideLinks(catalog: &'static NavCatalog) -> impl IntoView {
    let session = use_session();
    move || {
        let visible = catalog.visible(&session.authorizer());
        (!visible.is_empty()).then(|| {
            view! {
                <nav class="aside-links" data-catalog=catalog.name>
                    {visible
                        .into_iter()
                        .map(|entry| view! { <A href=entry.target.to_string()>{entry.label.to_string()}</A> })
                        .collect_view()}
                </nav>
            }
        })
    }
}

#[component]
fn LoginPage() -> impl IntoView {
    let session = use_session();
    let identifier = create_rw_signal(String::new());
    let secret = create_rw_signal(String::new());
    let failed = create_rw_signal(false);
    let submitting = create_rw_signal(false);
    let navigate = use_navigate();

    let submit = move |ev: ev::SubmitEvent| {
        ev.prevent_default();
        if submitting.get() {
            return;
        }
        submitting.set(true);
        let session = session.clone();
        let navigate = navigate.clone();
        spawn_local(async move {
            let ok = session.login(identifier.get_untracked(), secret.get_untracked()).await;
            failed.set(!ok);
            submitting.set(false);
            if ok {
                session.dismiss_expiry();
                navigate("/", NavigateOptions { replace: true, ..Default::default() });
            }
        });
    };

    view! {
        <form class="login" on:submit=submit>
            <h1>"Munifact"</h1>
            <input
                type="text"
                placeholder="Usuario"
                prop:value=move || identifier.get()
                on:input=move |ev| identifier.set(event_target_value(&ev))
            />
            <input
                type="password"
                placeholder="Contraseña"
                prop:value=move || secret.get()
                on:input=move |ev| secret.set(event_target_value(&ev))
            />
            <Show when=move || failed.get()>
                <p class="error">"Usuario o contraseña incorrectos."</p>
            </Show>
            <button type="submit" disabled=move || submitting.get()>"Ingresar"</button>
        </form>
    }
}

/// Tells the user the session ended because the credential expired.
#[component]
fn ExpiryToast() -> impl IntoView {
    let session = use_session();
    let notice = session.expiry_signal();

    view! {
        <Show when=move || notice.get().is_some()>
            <div class="toast" role="alert">
                {move || notice.get().map(|n| n.message()).unwrap_or_default()}
                <button on:click=move |_| notice.set(None)>"×"</button>
            </div>
        </Show>
    }
}
