//! `munifact-auth`: pure session/authorization boundary for the console.
//!
//! This crate is intentionally decoupled from HTTP and storage: it models the
//! authenticated session, the permission predicate derived from it, and the
//! two consumers of that predicate (route guard and navigation filtering).

pub mod authorize;
pub mod guard;
pub mod navigation;
pub mod permissions;
pub mod principal;
pub mod roles;
pub mod session;

pub use authorize::{authorize, Authorizer, AuthzError, RequiresPermission};
pub use guard::{AuthStatus, GuardDecision, RouteGuard, LOGIN_PATH};
pub use navigation::{visible_entries, NavCatalog, NavEntry};
pub use permissions::Permission;
pub use principal::{Credential, Subject};
pub use roles::{flatten_permissions, Role, RoleGrant};
pub use session::{Session, SessionSnapshot};
