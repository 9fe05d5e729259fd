//! The in-memory session of the console user.
//!
//! # Invariants
//! - A credential is present if and only if the session is authenticated.
//! - `permissions` is always the union of the current role grants; it is
//!   recomputed, never patched, whenever the grants change.
//! - Without a subject, permissions and subscribed services are empty.
//!
//! Fields are private; the only mutations are the constructors,
//! [`Session::apply_authorization`] and [`Session::clear`].

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use munifact_core::{EntitySet, ServiceId, SubjectId};

use crate::{flatten_permissions, Authorizer, Credential, Permission, Role, RoleGrant, Subject};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    subject: Option<Subject>,
    credential: Option<Credential>,
    roles: BTreeSet<Role>,
    permissions: BTreeSet<Permission>,
    services: BTreeSet<ServiceId>,
    authenticated_at: Option<DateTime<Utc>>,
}

/// Flattened, storage-friendly view of an authenticated session.
///
/// Role grants are not kept: only the role names and the already-flattened
/// permission set survive a reload, and the next authorization refresh
/// recomputes them from the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub subject: Subject,
    pub credential: Credential,
    pub roles: BTreeSet<Role>,
    pub permissions: BTreeSet<Permission>,
    pub services: BTreeSet<ServiceId>,
    pub authenticated_at: Option<DateTime<Utc>>,
}

impl Session {
    /// The unauthenticated session.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A freshly logged-in session.
    pub fn authenticated(
        subject: Subject,
        credential: Credential,
        grants: &[RoleGrant],
        services: impl IntoIterator<Item = ServiceId>,
        authenticated_at: DateTime<Utc>,
    ) -> Self {
        let mut session = Self {
            subject: Some(subject),
            credential: Some(credential),
            authenticated_at: Some(authenticated_at),
            ..Self::default()
        };
        session.apply_authorization(grants, services);
        session
    }

    /// Rebuild a session from its persisted snapshot.
    pub fn restore(snapshot: SessionSnapshot) -> Self {
        Self {
            subject: Some(snapshot.subject),
            credential: Some(snapshot.credential),
            roles: snapshot.roles,
            permissions: snapshot.permissions,
            services: snapshot.services,
            authenticated_at: snapshot.authenticated_at,
        }
    }

    /// Overwrite roles, permissions and services with a fresh authorization set.
    ///
    /// Grants are keyed by role name, so a role reported twice counts once.
    /// Returns `false` (and changes nothing) when there is no subject.
    pub fn apply_authorization(
        &mut self,
        grants: &[RoleGrant],
        services: impl IntoIterator<Item = ServiceId>,
    ) -> bool {
        if self.subject.is_none() {
            return false;
        }

        let grants: EntitySet<RoleGrant> = grants.iter().cloned().collect();
        self.roles = grants.ids().cloned().collect();
        self.permissions = flatten_permissions(grants.iter());
        self.services = services.into_iter().collect();
        true
    }

    /// Drop every field, returning to the unauthenticated session.
    pub fn clear(&mut self) {
        *self = Self::empty();
    }

    pub fn is_authenticated(&self) -> bool {
        self.credential.is_some()
    }

    pub fn subject(&self) -> Option<&Subject> {
        self.subject.as_ref()
    }

    pub fn subject_id(&self) -> Option<SubjectId> {
        self.subject.as_ref().map(|s| s.id)
    }

    pub fn display_name(&self) -> Option<&str> {
        self.subject.as_ref().map(|s| s.display_name.as_str())
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn roles(&self) -> &BTreeSet<Role> {
        &self.roles
    }

    pub fn permissions(&self) -> &BTreeSet<Permission> {
        &self.permissions
    }

    pub fn services(&self) -> &BTreeSet<ServiceId> {
        &self.services
    }

    pub fn authenticated_at(&self) -> Option<DateTime<Utc>> {
        self.authenticated_at
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    pub fn is_subscribed_to(&self, service: ServiceId) -> bool {
        self.services.contains(&service)
    }

    /// Predicate over the current permission set.
    pub fn authorizer(&self) -> Authorizer {
        Authorizer::new(self.is_authenticated(), self.permissions.iter().cloned())
    }

    /// Storage view; `None` unless authenticated.
    pub fn snapshot(&self) -> Option<SessionSnapshot> {
        Some(SessionSnapshot {
            subject: self.subject.clone()?,
            credential: self.credential.clone()?,
            roles: self.roles.clone(),
            permissions: self.permissions.clone(),
            services: self.services.clone(),
            authenticated_at: self.authenticated_at,
        })
    }
}
