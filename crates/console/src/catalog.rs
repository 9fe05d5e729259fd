//! Navigation catalogs of the console subsystems.
//!
//! Each entry's permission is the one the backend enforces for the list
//! endpoint behind the screen.

use munifact_auth::{NavCatalog, NavEntry};

pub static DASHBOARD: NavCatalog = NavCatalog {
    name: "dashboard",
    entries: &[NavEntry::open("/", "Inicio")],
};

pub static FACTURACION: NavCatalog = NavCatalog {
    name: "facturacion",
    entries: &[
        NavEntry::gated("/facturacion/bombeo-agua", "Bombeo de agua", "bombeoagua.access"),
        NavEntry::gated("/facturacion/recibos", "Recibos", "recibos.index"),
        NavEntry::gated("/facturacion/tributos", "Tributos", "tributos.index"),
        NavEntry::gated("/facturacion/servicios", "Servicios", "servicios.index"),
    ],
};

pub static CLIENTES: NavCatalog = NavCatalog {
    name: "clientes",
    entries: &[
        NavEntry::gated("/clientes", "Clientes", "clientes.index"),
        NavEntry::gated("/cuentas", "Cuentas", "cuentas.index"),
    ],
};

pub static USUARIOS: NavCatalog = NavCatalog {
    name: "usuarios",
    entries: &[
        NavEntry::gated("/usuarios", "Usuarios", "users.index"),
        NavEntry::gated("/roles", "Roles", "roles.index"),
        NavEntry::gated("/permisos", "Permisos", "permisos.index"),
    ],
};

/// Every catalog, in sidebar order.
pub static ALL: [&NavCatalog; 4] = [&DASHBOARD, &FACTURACION, &CLIENTES, &USUARIOS];

pub fn by_name(name: &str) -> Option<&'static NavCatalog> {
    ALL.iter().copied().find(|catalog| catalog.name.eq_ignore_ascii_case(name))
}

/// Every route a catalog links to, with the permission its guard requires.
pub fn route_permission(target: &str) -> Option<&'static NavEntry> {
    ALL.iter()
        .flat_map(|catalog| catalog.entries.iter())
        .find(|entry| entry.target == target)
}
