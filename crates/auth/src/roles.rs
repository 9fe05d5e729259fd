use std::borrow::{Borrow, Cow};
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use munifact_core::Entity;

use crate::Permission;

/// Role identifier used for RBAC.
///
/// Roles are opaque names at this layer; the backend owns the mapping from a
/// role to its permission grants and ships it with every user payload.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Role {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A role together with the permissions it grants, as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleGrant {
    pub role: Role,
    pub permissions: Vec<Permission>,
}

impl RoleGrant {
    pub fn new(role: Role, permissions: impl IntoIterator<Item = Permission>) -> Self {
        Self {
            role,
            permissions: permissions.into_iter().collect(),
        }
    }
}

impl Entity for RoleGrant {
    type Id = Role;

    fn id(&self) -> &Role {
        &self.role
    }
}

/// Union of the permissions granted by `grants`, duplicates collapsed.
pub fn flatten_permissions<'a, I>(grants: I) -> BTreeSet<Permission>
where
    I: IntoIterator<Item = &'a RoleGrant>,
{
    grants
        .into_iter()
        .flat_map(|grant| grant.permissions.iter().cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant(role: &'static str, perms: &[&'static str]) -> RoleGrant {
        RoleGrant::new(
            Role::new(role),
            perms.iter().copied().map(Permission::from_static),
        )
    }

    #[test]
    fn flatten_collapses_duplicates_across_roles() {
        let grants = [
            grant("admin", &["users.index", "roles.index"]),
            grant("cajero", &["recibos.index", "users.index"]),
        ];

        let perms = flatten_permissions(&grants);
        let names: Vec<&str> = perms.iter().map(Permission::as_str).collect();
        assert_eq!(names, vec!["recibos.index", "roles.index", "users.index"]);
    }

    #[test]
    fn flatten_of_nothing_is_empty() {
        assert!(flatten_permissions(&[]).is_empty());
    }
}
