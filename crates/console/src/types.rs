//! Wire shapes of the authentication endpoints (match the API payloads).

use serde::{Deserialize, Serialize};

use munifact_auth::{Credential, Permission, Role, RoleGrant, Subject};
use munifact_core::{ServiceId, SubjectId};

/// `POST /login` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub secret: String,
}

/// `POST /login` success body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserPayload,
}

/// The authenticated user as returned at login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPayload {
    pub id: SubjectId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub roles: Vec<RolePayload>,
    #[serde(default)]
    pub servicios: Vec<ServicePayload>,
}

/// `GET /users/{id}` body, as far as authorization is concerned.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorizationPayload {
    #[serde(default)]
    pub roles: Vec<RolePayload>,
    #[serde(default)]
    pub servicios: Vec<ServicePayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolePayload {
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<PermissionPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionPayload {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicePayload {
    pub id: ServiceId,
}

impl RolePayload {
    /// The role's grant. Permission names that are not `<domain>.<action>`
    /// can never match a gate, so they are dropped with a warning.
    pub fn to_grant(&self) -> RoleGrant {
        let permissions = self.permissions.iter().filter_map(|p| {
            Permission::parse(p.name.clone())
                .map_err(|e| tracing::warn!(role = %self.name, error = %e, "ignoring malformed permission"))
                .ok()
        });
        RoleGrant::new(Role::new(self.name.clone()), permissions)
    }
}

impl AuthorizationPayload {
    pub fn grants(&self) -> Vec<RoleGrant> {
        self.roles.iter().map(RolePayload::to_grant).collect()
    }

    pub fn service_ids(&self) -> Vec<ServiceId> {
        self.servicios.iter().map(|s| s.id).collect()
    }
}

impl UserPayload {
    pub fn subject(&self) -> Subject {
        Subject::new(self.id, self.name.clone())
    }

    pub fn authorization(&self) -> AuthorizationPayload {
        AuthorizationPayload {
            roles: self.roles.clone(),
            servicios: self.servicios.clone(),
        }
    }
}

impl LoginResponse {
    pub fn credential(&self) -> Credential {
        Credential::new(self.token.clone())
    }
}
