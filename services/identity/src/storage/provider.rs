use crate::crypto::EncryptedBlob;
use crate::error::IdentityError;
use crate::storage::models::{SessionRecord, User, VerificationPurpose, VerificationRequest};
use crate::store::ConfigSnapshot;
use async_trait::async_trait;

/// Database collaborator. Every call is fallible and may be slow.
#[async_trait]
pub trait PersistenceProvider: Send + Sync {
    /// `NotFound` when no user has this (lower-cased) email.
    async fn get_user_by_email(&self, email: &str) -> Result<User, IdentityError>;

    async fn get_user_by_id(&self, id: &str) -> Result<User, IdentityError>;

    async fn add_user(&self, user: User) -> Result<User, IdentityError>;

    async fn update_user(&self, user: User) -> Result<User, IdentityError>;

    /// Store a request, replacing any earlier one for the same email and purpose.
    async fn add_verification_request(
        &self,
        request: VerificationRequest,
    ) -> Result<VerificationRequest, IdentityError>;

    async fn get_verification_request_by_email(
        &self,
        email: &str,
        purpose: VerificationPurpose,
    ) -> Result<VerificationRequest, IdentityError>;

    /// Remove and return the request for `token` in one step.
    ///
    /// `Ok(None)` means no such request exists (never issued or already taken).
    async fn take_verification_request(
        &self,
        token: &str,
    ) -> Result<Option<VerificationRequest>, IdentityError>;

    async fn add_session(&self, record: SessionRecord) -> Result<(), IdentityError>;

    /// Persisted encrypted configuration, if one was ever written.
    async fn get_env(&self) -> Result<Option<EncryptedBlob>, IdentityError>;

    async fn update_env(&self, blob: EncryptedBlob) -> Result<(), IdentityError>;
}

/// Outbound mail collaborator.
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send_verification_mail(
        &self,
        email: &str,
        token: &str,
        host: &str,
        purpose: VerificationPurpose,
    ) -> Result<(), IdentityError>;
}

/// Third-party login provider registry, rebuilt whenever configuration changes.
#[async_trait]
pub trait OAuthRegistry: Send + Sync {
    async fn reinitialize(&self, snapshot: &ConfigSnapshot) -> Result<(), IdentityError>;
}
