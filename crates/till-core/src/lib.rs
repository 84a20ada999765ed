//! till-core - Core library for Till
//!
//! This crate contains the synchronized record models, the local key-value
//! store with its per-entity mutation logs, the server-side merge engine, and
//! the client sync reconciler shared by the CLI and the sync backend.

pub mod config;
pub mod db;
pub mod error;
pub mod merge;
pub mod models;
pub mod mutation_log;
pub mod services;
pub mod state;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{
    Branch, Cashier, Customer, Entity, EntityKind, Owner, Product, Sale, Supplier, SyncConflict,
};
pub use mutation_log::{LocalMutationLog, SyncSnapshot};
pub use services::LocalStoreService;
pub use state::{AppState, Role, Session};
pub use sync::{SyncClient, SyncError, SyncReconciler, SyncReport, SyncState};
