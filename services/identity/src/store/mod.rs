//! Process-wide configuration store.
//!
//! The active [`ConfigSnapshot`] is the single source of truth for every
//! other component. It is replaced wholesale through [`ConfigStore::commit`],
//! never mutated in place.

pub mod config_store;
pub mod keys;
pub mod snapshot;

pub use config_store::ConfigStore;
pub use snapshot::ConfigSnapshot;
