//! Entity trait: identity + continuity across backend responses.
//!
//! The backend returns structurally new objects on every fetch. Two payloads
//! describing the same record are the same entity when their ids match, so
//! collections of entities are keyed by id and never compared by reference.

use std::collections::BTreeMap;

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Ord + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

/// Collection of entities keyed by their identifier.
///
/// Collecting entities with a repeated id keeps the last one (last write
/// wins); iteration follows id order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySet<E: Entity> {
    items: BTreeMap<E::Id, E>,
}

impl<E: Entity> EntitySet<E> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.items.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &E::Id> {
        self.items.keys()
    }
}

impl<E: Entity> FromIterator<E> for EntitySet<E> {
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().map(|e| (e.id().clone(), e)).collect(),
        }
    }
}
