use rust_common::PlatformError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid role configuration: {0}")]
    InvalidRoleConfiguration(String),

    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Malformed key: {0}")]
    MalformedKey(String),

    #[error("Token expired")]
    ExpiredToken,

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Verification token already consumed")]
    AlreadyConsumed,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Disabled: {0}")]
    Disabled(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The persisted configuration may no longer match the in-memory one.
    #[error("Persisted configuration diverged from memory: {0}")]
    PersistenceDivergence(String),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Subsystem {subsystem} failed to reinitialize: {reason}")]
    SubsystemReinit { subsystem: String, reason: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IdentityError {
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    pub fn invalid_roles(msg: impl Into<String>) -> Self {
        Self::InvalidRoleConfiguration(msg.into())
    }

    pub fn malformed_key(msg: impl Into<String>) -> Self {
        Self::MalformedKey(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    pub fn encryption(msg: impl Into<String>) -> Self {
        Self::Encryption(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Stable code for transport responses.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfiguration(_) => INVALID_CONFIGURATION,
            Self::InvalidRoleConfiguration(_) => INVALID_ROLE_CONFIGURATION,
            Self::UnsupportedAlgorithm(_) => UNSUPPORTED_ALGORITHM,
            Self::MalformedKey(_) => MALFORMED_KEY,
            Self::ExpiredToken => EXPIRED_TOKEN,
            Self::InvalidSignature(_) => INVALID_SIGNATURE,
            Self::AlreadyConsumed => ALREADY_CONSUMED,
            Self::Unauthorized => UNAUTHORIZED,
            Self::NotFound(_) => NOT_FOUND,
            Self::Conflict(_) => CONFLICT,
            Self::InvalidInput(_) => INVALID_INPUT,
            Self::Disabled(_) => DISABLED,
            Self::Persistence(_) => PERSISTENCE_FAILED,
            Self::PersistenceDivergence(_) => PERSISTENCE_DIVERGENCE,
            Self::Encryption(_) => ENCRYPTION_FAILED,
            Self::SubsystemReinit { .. } => SUBSYSTEM_REINIT_FAILED,
            Self::Internal(_) => INTERNAL,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for IdentityError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => Self::ExpiredToken,
            ErrorKind::InvalidRsaKey(_)
            | ErrorKind::InvalidEcdsaKey
            | ErrorKind::InvalidKeyFormat
            | ErrorKind::RsaFailedSigning => Self::MalformedKey(err.to_string()),
            _ => Self::InvalidSignature(err.to_string()),
        }
    }
}

impl From<IdentityError> for PlatformError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Persistence(msg) => Self::Unavailable(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

// Error codes for transport responses
pub const INVALID_CONFIGURATION: &str = "INVALID_CONFIGURATION";
pub const INVALID_ROLE_CONFIGURATION: &str = "INVALID_ROLE_CONFIGURATION";
pub const UNSUPPORTED_ALGORITHM: &str = "UNSUPPORTED_ALGORITHM";
pub const MALFORMED_KEY: &str = "MALFORMED_KEY";
pub const EXPIRED_TOKEN: &str = "EXPIRED_TOKEN";
pub const INVALID_SIGNATURE: &str = "INVALID_SIGNATURE";
pub const ALREADY_CONSUMED: &str = "ALREADY_CONSUMED";
pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
pub const NOT_FOUND: &str = "NOT_FOUND";
pub const CONFLICT: &str = "CONFLICT";
pub const INVALID_INPUT: &str = "INVALID_INPUT";
pub const DISABLED: &str = "DISABLED";
pub const PERSISTENCE_FAILED: &str = "PERSISTENCE_FAILED";
pub const PERSISTENCE_DIVERGENCE: &str = "PERSISTENCE_DIVERGENCE";
pub const ENCRYPTION_FAILED: &str = "ENCRYPTION_FAILED";
pub const SUBSYSTEM_REINIT_FAILED: &str = "SUBSYSTEM_REINIT_FAILED";
pub const INTERNAL: &str = "INTERNAL";
