//! Identity Service library.
//!
//! Credential lifecycle for end users: signing key management with hot
//! reconfiguration, access and verification tokens, in-memory sessions and
//! the super-administrator configuration transaction.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod admin;
pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod request;
pub mod service;
pub mod session;
pub mod storage;
pub mod store;
pub mod token;

// Re-exports for convenience
pub use config::Config;
pub use error::IdentityError;
pub use request::RequestContext;
pub use service::{Collaborators, IdentityService};
