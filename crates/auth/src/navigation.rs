//! Permission-filtered navigation.
//!
//! Each subsystem of the console ships a static, ordered catalog of entries.
//! What the user sees is the catalog filtered through the current
//! [`Authorizer`], so a link is only shown when the permission the backend
//! enforces for that screen is held.

use std::borrow::Cow;

use crate::{Authorizer, Permission, RequiresPermission};

/// One navigation link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavEntry {
    pub target: Cow<'static, str>,
    pub label: Cow<'static, str>,
    pub required: Option<Permission>,
}

impl NavEntry {
    /// Entry gated by `required`.
    pub const fn gated(target: &'static str, label: &'static str, required: &'static str) -> Self {
        Self {
            target: Cow::Borrowed(target),
            label: Cow::Borrowed(label),
            required: Some(Permission::from_static(required)),
        }
    }

    /// Entry visible to every authenticated user.
    pub const fn open(target: &'static str, label: &'static str) -> Self {
        Self {
            target: Cow::Borrowed(target),
            label: Cow::Borrowed(label),
            required: None,
        }
    }
}

impl RequiresPermission for NavEntry {
    fn required_permission(&self) -> Option<&Permission> {
        self.required.as_ref()
    }
}

/// Static entry catalog of one subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavCatalog {
    pub name: &'static str,
    pub entries: &'static [NavEntry],
}

impl NavCatalog {
    pub fn visible(&self, authz: &Authorizer) -> Vec<&'static NavEntry> {
        visible_entries(self.entries, authz)
    }
}

/// Entries whose permission is absent or held, in catalog order.
pub fn visible_entries<'a>(entries: &'a [NavEntry], authz: &Authorizer) -> Vec<&'a NavEntry> {
    entries.iter().filter(|entry| authz.permits(*entry)).collect()
}
