//! Super-administrator surface: the typed update schema, the admin check,
//! cookies and the configuration update transaction.

pub mod auth;
pub mod cookie;
pub mod orchestrator;
pub mod update;

pub use auth::{ADMIN_SECRET_HEADER, is_super_admin};
pub use cookie::Cookie;
pub use orchestrator::{ConfigUpdateOrchestrator, UpdateOutcome};
pub use update::{ConfigUpdate, validate_role_sets};
