//! Route guard decisions.
//!
//! The guard is a pure function of the authentication status and the
//! permission predicate; the UI layer turns the decision into a spinner, the
//! guarded view, a "no access" notice, or a history-replacing redirect.

use crate::{Authorizer, Permission, RequiresPermission};

/// Login entry point of the console.
pub const LOGIN_PATH: &str = "/login";

/// Whether the session's authentication has been settled yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthStatus {
    /// Persisted state not yet checked; nothing may be rendered but a spinner.
    #[default]
    Undetermined,
    Authenticated,
    Unauthenticated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Render only a neutral loading indicator.
    Loading,
    /// Render the guarded subtree.
    Render,
    /// Authenticated, but the section permission is missing.
    Denied,
    /// Navigate to `to`; `replace` keeps back-navigation from re-entering.
    Redirect { to: &'static str, replace: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteGuard {
    login_path: &'static str,
    required: Option<Permission>,
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteGuard {
    pub fn new() -> Self {
        Self {
            login_path: LOGIN_PATH,
            required: None,
        }
    }

    /// Additionally gate the section on `permission`.
    pub fn requiring(mut self, permission: Permission) -> Self {
        self.required = Some(permission);
        self
    }

    pub fn decide(&self, status: AuthStatus, authz: &Authorizer) -> GuardDecision {
        match status {
            AuthStatus::Undetermined => GuardDecision::Loading,
            AuthStatus::Unauthenticated => GuardDecision::Redirect {
                to: self.login_path,
                replace: true,
            },
            AuthStatus::Authenticated if authz.permits(self) => GuardDecision::Render,
            AuthStatus::Authenticated => GuardDecision::Denied,
        }
    }
}

impl RequiresPermission for RouteGuard {
    fn required_permission(&self) -> Option<&Permission> {
        self.required.as_ref()
    }
}
