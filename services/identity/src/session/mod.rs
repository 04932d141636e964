//! In-memory registry of live sessions keyed by fingerprint hash.

pub mod registry;

pub use registry::{SessionEntry, SessionRegistry};
