use std::borrow::{Borrow, Cow};

use serde::{Deserialize, Serialize};

use munifact_core::{DomainError, DomainResult};

/// Permission identifier.
///
/// Permissions are `<domain>.<action>` strings granted by the backend
/// (e.g. `clientes.destroy`, `bombeoagua.access`). The action part may itself
/// contain dashes (`roles.sync-perm`). Equality and ordering are by value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Build a permission from a string literal (usable in `const` catalogs).
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Parse and validate the `<domain>.<action>` shape.
    pub fn parse(name: impl Into<Cow<'static, str>>) -> DomainResult<Self> {
        let name = name.into();
        let Some((domain, action)) = name.split_once('.') else {
            return Err(DomainError::validation(format!(
                "permission '{name}' must have the form <domain>.<action>"
            )));
        };
        if domain.is_empty() || action.is_empty() {
            return Err(DomainError::validation(format!(
                "permission '{name}' has an empty domain or action"
            )));
        }
        if name.chars().any(char::is_whitespace) {
            return Err(DomainError::validation(format!(
                "permission '{name}' must not contain whitespace"
            )));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The part before the first dot (`clientes` in `clientes.index`).
    pub fn domain(&self) -> &str {
        self.as_str().split_once('.').map_or(self.as_str(), |(d, _)| d)
    }

    /// The part after the first dot (`index` in `clientes.index`).
    pub fn action(&self) -> &str {
        self.as_str().split_once('.').map_or("", |(_, a)| a)
    }
}

impl Borrow<str> for Permission {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_domain_action() {
        let p = Permission::parse("roles.sync-perm").unwrap();
        assert_eq!(p.domain(), "roles");
        assert_eq!(p.action(), "sync-perm");
    }

    #[test]
    fn parse_rejects_malformed() {
        for bad in ["clientes", ".index", "clientes.", "clientes. index"] {
            assert!(Permission::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn static_and_owned_compare_equal() {
        const INDEX: Permission = Permission::from_static("users.index");
        assert_eq!(INDEX, Permission::new(String::from("users.index")));
    }
}
