//! `munifact-console`
//!
//! **Responsibility:** client-side session and access-control core of the
//! municipal billing console.
//!
//! This crate provides:
//! - The shared request helper with the session refresh protocol (`api`)
//! - The session store and its persisted state (`session_store`, `persistence`)
//! - Navigation catalogs and mounted navigation views (`catalog`, `nav_view`)
//! - A Leptos frontend for wasm32 builds (`frontend`)
//!
//! The backend is the authority for every business rule; this crate only
//! decides what the current user may see and keeps the session consistent.

pub mod api;
pub mod backend;
pub mod catalog;
pub mod config;
pub mod error;
pub mod nav_view;
pub mod persistence;
pub mod resources;
pub mod session_store;
pub mod storage;
pub mod types;

#[cfg(target_arch = "wasm32")]
pub mod frontend;

pub use api::ApiClient;
pub use backend::AuthBackend;
pub use config::ConsoleConfig;
pub use error::{ApiError, ConfigError, StorageError};
pub use nav_view::{ExpiryNotice, ExpiryWatcher, NavigationView};
pub use resources::{Action, Resource};
pub use session_store::{RefreshOutcome, SessionStore};
pub use storage::{KeyValueStore, MemoryStore, SharedStore};

#[cfg(not(target_arch = "wasm32"))]
pub use storage::FileStore;
