use std::collections::BTreeSet;
use std::sync::Arc;

use thiserror::Error;

use crate::Permission;

/// Permission predicate derived from one session state.
///
/// An `Authorizer` is a cheap, immutable view: it answers for the session it
/// was taken from. Consumers re-derive it whenever the session changes
/// instead of holding on to an old one across a refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Authorizer {
    authenticated: bool,
    permissions: Arc<BTreeSet<Permission>>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("not authenticated")]
    Unauthenticated,

    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Something gated by (at most) one permission: routes, nav links, buttons.
pub trait RequiresPermission {
    fn required_permission(&self) -> Option<&Permission>;
}

impl Authorizer {
    pub fn new(authenticated: bool, permissions: impl IntoIterator<Item = Permission>) -> Self {
        let permissions: BTreeSet<Permission> = if authenticated {
            permissions.into_iter().collect()
        } else {
            BTreeSet::new()
        };
        Self {
            authenticated,
            permissions: Arc::new(permissions),
        }
    }

    /// Predicate for the unauthenticated state.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Exact membership test. No IO, no wildcard expansion.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    /// Whether `gated` may be shown/used: ungated items always pass.
    pub fn permits<G: RequiresPermission + ?Sized>(&self, gated: &G) -> bool {
        gated
            .required_permission()
            .is_none_or(|p| self.has_permission(p.as_str()))
    }

    pub fn permissions(&self) -> impl Iterator<Item = &Permission> {
        self.permissions.iter()
    }
}

/// Authorize a single affordance against the current predicate.
///
/// - No IO
/// - No panics
pub fn authorize(authz: &Authorizer, required: &Permission) -> Result<(), AuthzError> {
    if !authz.is_authenticated() {
        return Err(AuthzError::Unauthenticated);
    }

    if authz.has_permission(required.as_str()) {
        Ok(())
    } else {
        tracing::debug!(permission = %required, "authorization denied");
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authz(perms: &[&'static str]) -> Authorizer {
        Authorizer::new(true, perms.iter().copied().map(Permission::from_static))
    }

    #[test]
    fn grants_exact_matches_only() {
        let a = authz(&["users.index"]);

        assert!(authorize(&a, &Permission::from_static("users.index")).is_ok());
        assert_eq!(
            authorize(&a, &Permission::from_static("users.destroy")),
            Err(AuthzError::Forbidden("users.destroy".into()))
        );
    }

    #[test]
    fn no_wildcard_semantics() {
        let a = authz(&["*"]);
        assert!(!a.has_permission("clientes.index"));
    }

    #[test]
    fn anonymous_is_unauthenticated() {
        let a = Authorizer::anonymous();
        assert_eq!(
            authorize(&a, &Permission::from_static("users.index")),
            Err(AuthzError::Unauthenticated)
        );
    }

    #[test]
    fn unauthenticated_predicate_drops_permissions() {
        let a = Authorizer::new(false, [Permission::from_static("users.index")]);
        assert!(!a.has_permission("users.index"));
    }
}
