//! Services shared by the CLI and the sync reconciler

mod local_store;

pub use local_store::LocalStoreService;
