//! External collaborators: persistence, mail and the OAuth provider registry.

pub mod memory;
pub mod models;
pub mod oauth;
pub mod provider;

pub use memory::{EnvWriteFault, InMemoryProvider, LogMailSender, RecordingMailSender, SentMail};
pub use models::{
    SIGNUP_METHOD_BASIC_AUTH, SIGNUP_METHOD_MAGIC_LINK, SessionRecord, User, VerificationPurpose,
    VerificationRequest,
};
pub use oauth::{OAuthProvider, OAuthProviders, validate_providers};
pub use provider::{MailSender, OAuthRegistry, PersistenceProvider};
