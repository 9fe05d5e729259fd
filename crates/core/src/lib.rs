//! `munifact-core`: shared building blocks for the console crates.
//!
//! This crate contains **pure** primitives (no IO, no transport concerns).

pub mod entity;
pub mod error;
pub mod id;

pub use entity::{Entity, EntitySet};
pub use error::{DomainError, DomainResult};
pub use id::{ServiceId, SubjectId};
