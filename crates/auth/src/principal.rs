use serde::{Deserialize, Serialize};

use munifact_core::SubjectId;

/// Identity of the authenticated console user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectId,
    pub display_name: String,
}

impl Subject {
    pub fn new(id: SubjectId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
        }
    }
}

/// Opaque bearer credential issued by the backend at login.
///
/// The token value is never printed by `Debug`; use [`Credential::expose`]
/// when attaching it to a request.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for Credential {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_token() {
        let c = Credential::new("secret-token");
        assert_eq!(format!("{c:?}"), "Credential(***)");
        assert_eq!(c.expose(), "secret-token");
    }
}
