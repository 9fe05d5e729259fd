//! Backend resources and the permission strings that gate their actions.

use munifact_auth::Permission;

/// CRUD resources exposed by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Clientes,
    Users,
    Roles,
    Permisos,
    Cuentas,
    Recibos,
    Servicios,
    Tributos,
}

/// Per-resource actions; the names follow the backend's permission naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Index,
    Show,
    Store,
    Update,
    Destroy,
    /// Screen-level access without a CRUD counterpart.
    Access,
}

impl Resource {
    pub const ALL: [Resource; 8] = [
        Resource::Clientes,
        Resource::Users,
        Resource::Roles,
        Resource::Permisos,
        Resource::Cuentas,
        Resource::Recibos,
        Resource::Servicios,
        Resource::Tributos,
    ];

    /// Permission domain, also the collection path segment.
    pub fn domain(&self) -> &'static str {
        match self {
            Resource::Clientes => "clientes",
            Resource::Users => "users",
            Resource::Roles => "roles",
            Resource::Permisos => "permisos",
            Resource::Cuentas => "cuentas",
            Resource::Recibos => "recibos",
            Resource::Servicios => "servicios",
            Resource::Tributos => "tributos",
        }
    }

    /// Resource whose domain is `name` (case-insensitive).
    pub fn from_domain(name: &str) -> Option<Resource> {
        Self::ALL
            .into_iter()
            .find(|resource| resource.domain().eq_ignore_ascii_case(name))
    }

    pub fn collection_path(&self) -> String {
        format!("/{}", self.domain())
    }

    pub fn item_path(&self, id: u64) -> String {
        format!("/{}/{}", self.domain(), id)
    }

    /// `<domain>.<action>`, e.g. `clientes.destroy`.
    pub fn permission(&self, action: Action) -> Permission {
        Permission::new(format!("{}.{}", self.domain(), action.as_str()))
    }
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Index => "index",
            Action::Show => "show",
            Action::Store => "store",
            Action::Update => "update",
            Action::Destroy => "destroy",
            Action::Access => "access",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_strings_follow_domain_action() {
        assert_eq!(Resource::Clientes.permission(Action::Destroy).as_str(), "clientes.destroy");
        assert_eq!(Resource::Users.permission(Action::Index).as_str(), "users.index");
    }

    #[test]
    fn every_permission_parses() {
        for resource in Resource::ALL {
            let p = resource.permission(Action::Update);
            assert!(Permission::parse(p.as_str().to_string()).is_ok());
            assert_eq!(p.domain(), resource.domain());
        }
    }

    #[test]
    fn lookup_by_domain() {
        assert_eq!(Resource::from_domain("Recibos"), Some(Resource::Recibos));
        assert_eq!(Resource::from_domain("bombeoagua"), None);
    }

    #[test]
    fn paths() {
        assert_eq!(Resource::Recibos.collection_path(), "/recibos");
        assert_eq!(Resource::Tributos.item_path(8), "/tributos/8");
    }
}
