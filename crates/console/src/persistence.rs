//! Session fields persisted in the keyed store.
//!
//! Each field lives under its own key as a string; collections are JSON
//! arrays. Only what is needed to survive a reload is kept: the credential,
//! the subject, and the flattened roles/permissions/services.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;

use munifact_auth::{Credential, Permission, Role, SessionSnapshot, Subject};
use munifact_core::{ServiceId, SubjectId};

use crate::error::StorageError;
use crate::storage::KeyValueStore;

pub const TOKEN: &str = "token";
pub const USER_ID: &str = "user_id";
pub const USER_NAME: &str = "user_name";
pub const ROLES: &str = "roles";
pub const PERMISSIONS: &str = "permissions";
pub const SERVICIOS: &str = "servicios";
pub const AUTHENTICATED_AT: &str = "authenticated_at";

const ALL_KEYS: [&str; 7] = [
    TOKEN,
    USER_ID,
    USER_NAME,
    ROLES,
    PERMISSIONS,
    SERVICIOS,
    AUTHENTICATED_AT,
];

/// What a reload finds in storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Restored {
    /// No credential persisted.
    Empty,
    /// A credential without a usable subject; the state cannot be refreshed.
    Orphaned,
    Session(SessionSnapshot),
}

pub fn save(store: &dyn KeyValueStore, snapshot: &SessionSnapshot) -> Result<(), StorageError> {
    store.set(TOKEN, snapshot.credential.expose())?;
    store.set(USER_ID, &snapshot.subject.id.to_string())?;
    store.set(USER_NAME, &snapshot.subject.display_name)?;
    save_authorization(store, &snapshot.roles, &snapshot.permissions, &snapshot.services)?;
    match snapshot.authenticated_at {
        Some(at) => store.set(AUTHENTICATED_AT, &at.to_rfc3339()),
        None => store.remove(AUTHENTICATED_AT),
    }
}

/// Overwrite only the derived authorization fields.
pub fn save_authorization(
    store: &dyn KeyValueStore,
    roles: &BTreeSet<Role>,
    permissions: &BTreeSet<Permission>,
    services: &BTreeSet<ServiceId>,
) -> Result<(), StorageError> {
    store.set(ROLES, &serde_json::to_string(roles)?)?;
    store.set(PERMISSIONS, &serde_json::to_string(permissions)?)?;
    store.set(SERVICIOS, &serde_json::to_string(services)?)?;
    Ok(())
}

pub fn load(store: &dyn KeyValueStore) -> Restored {
    let Some(token) = credential(store) else {
        return Restored::Empty;
    };

    let Some(subject_id) = store.get(USER_ID).and_then(|raw| raw.parse::<SubjectId>().ok()) else {
        return Restored::Orphaned;
    };

    let authenticated_at = store
        .get(AUTHENTICATED_AT)
        .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
        .map(|at| at.with_timezone(&Utc));

    Restored::Session(SessionSnapshot {
        subject: Subject::new(subject_id, store.get(USER_NAME).unwrap_or_default()),
        credential: token,
        roles: load_set(store, ROLES),
        permissions: load_set(store, PERMISSIONS),
        services: load_set(store, SERVICIOS),
        authenticated_at,
    })
}

pub fn credential(store: &dyn KeyValueStore) -> Option<Credential> {
    store
        .get(TOKEN)
        .filter(|token| !token.is_empty())
        .map(Credential::new)
}

pub fn clear_credential(store: &dyn KeyValueStore) -> Result<(), StorageError> {
    store.remove(TOKEN)
}

/// Remove every persisted session field. Keeps going past individual
/// failures and reports the first one.
pub fn clear(store: &dyn KeyValueStore) -> Result<(), StorageError> {
    let mut first_err = None;
    for key in ALL_KEYS {
        if let Err(e) = store.remove(key) {
            first_err.get_or_insert(e);
        }
    }
    first_err.map_or(Ok(()), Err)
}

fn load_set<T: DeserializeOwned + Ord>(store: &dyn KeyValueStore, key: &str) -> BTreeSet<T> {
    let Some(raw) = store.get(key) else {
        return BTreeSet::new();
    };
    serde_json::from_str(&raw).unwrap_or_else(|e| {
        tracing::warn!(key, error = %e, "ignoring malformed persisted session field");
        BTreeSet::new()
    })
}
