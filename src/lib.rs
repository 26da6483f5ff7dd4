//! Organizational reference data for the HR console.
//!
//! One [`OrgStore`] per process holds departments, designations, operations,
//! machines, process expertise, skill metrics, and salary grades. It persists
//! the whole set as a single JSON snapshot and, with [`start_sync_listener`],
//! picks up snapshots written by other processes sharing the same slot.

pub mod config;
mod dedup;
mod defaults;
pub mod error;
pub mod notifier;
pub mod persistence;
pub mod store;
pub mod types;
mod watcher;

pub use config::{load_config, ReferencePolicy, StoreConfig, UniquenessPolicy};
pub use dedup::Pruned;
pub use error::StoreError;
pub use notifier::StoreEvent;
pub use persistence::{Collections, FileSlot, MemorySlot, Slot};
pub use store::{CollectionCount, OrgStore, StoreStatus};
pub use watcher::{start_sync_listener, SyncListener};
