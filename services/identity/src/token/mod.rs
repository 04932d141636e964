//! Access tokens, session fingerprints and verification tokens.

pub mod builder;
pub mod claims;
pub mod fingerprint;
pub mod service;
pub mod verification;

pub use builder::AccessTokenBuilder;
pub use claims::AccessClaims;
pub use fingerprint::FingerprintGenerator;
pub use service::{AuthToken, DEFAULT_SCOPE, REFRESH_WINDOW_SECONDS, SessionToken, TokenService};
pub use verification::{VERIFICATION_TOKEN_TTL_SECONDS, VerificationClaims};
