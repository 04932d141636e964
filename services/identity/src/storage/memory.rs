use crate::crypto::EncryptedBlob;
use crate::error::IdentityError;
use crate::storage::models::{SessionRecord, User, VerificationPurpose, VerificationRequest};
use crate::storage::provider::{MailSender, PersistenceProvider};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;

/// Failure to inject into the next `update_env` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvWriteFault {
    #[default]
    None,
    /// Reject the write without touching the stored blob.
    Reject,
    /// Store the blob, then report failure (write status unknown to the caller).
    WriteThenFail,
    /// Reject the write and fail the subsequent read-back.
    RejectAndUnreadable,
}

#[derive(Default)]
struct State {
    users: HashMap<String, User>,
    verification_requests: HashMap<String, VerificationRequest>,
    sessions: Vec<SessionRecord>,
    env: Option<EncryptedBlob>,
    env_fault: EnvWriteFault,
    env_unreadable: bool,
}

/// Process-local persistence, used by the binary's default wiring and tests.
#[derive(Default)]
pub struct InMemoryProvider {
    state: RwLock<State>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `update_env` fail as described by `fault`.
    pub async fn inject_env_fault(&self, fault: EnvWriteFault) {
        self.state.write().await.env_fault = fault;
    }

    pub async fn verification_requests(&self) -> Vec<VerificationRequest> {
        self.state.read().await.verification_requests.values().cloned().collect()
    }

    pub async fn session_records(&self) -> Vec<SessionRecord> {
        self.state.read().await.sessions.clone()
    }

    pub async fn user_count(&self) -> usize {
        self.state.read().await.users.len()
    }
}

#[async_trait]
impl PersistenceProvider for InMemoryProvider {
    async fn get_user_by_email(&self, email: &str) -> Result<User, IdentityError> {
        self.state
            .read()
            .await
            .users
            .values()
            .find(|user| user.email == email)
            .cloned()
            .ok_or_else(|| IdentityError::not_found(format!("user {email}")))
    }

    async fn get_user_by_id(&self, id: &str) -> Result<User, IdentityError> {
        self.state
            .read()
            .await
            .users
            .get(id)
            .cloned()
            .ok_or_else(|| IdentityError::not_found(format!("user id {id}")))
    }

    async fn add_user(&self, user: User) -> Result<User, IdentityError> {
        let mut state = self.state.write().await;
        if state.users.values().any(|existing| existing.email == user.email) {
            return Err(IdentityError::Conflict(format!("{} already exists", user.email)));
        }
        state.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn update_user(&self, mut user: User) -> Result<User, IdentityError> {
        let mut state = self.state.write().await;
        let Some(slot) = state.users.get_mut(&user.id) else {
            return Err(IdentityError::not_found(format!("user id {}", user.id)));
        };
        user.updated_at = chrono::Utc::now();
        *slot = user.clone();
        Ok(user)
    }

    async fn add_verification_request(
        &self,
        request: VerificationRequest,
    ) -> Result<VerificationRequest, IdentityError> {
        let mut state = self.state.write().await;
        state
            .verification_requests
            .retain(|_, r| !(r.email == request.email && r.purpose == request.purpose));
        state
            .verification_requests
            .insert(request.token.clone(), request.clone());
        Ok(request)
    }

    async fn get_verification_request_by_email(
        &self,
        email: &str,
        purpose: VerificationPurpose,
    ) -> Result<VerificationRequest, IdentityError> {
        self.state
            .read()
            .await
            .verification_requests
            .values()
            .find(|r| r.email == email && r.purpose == purpose)
            .cloned()
            .ok_or_else(|| IdentityError::not_found(format!("{purpose} request for {email}")))
    }

    async fn take_verification_request(
        &self,
        token: &str,
    ) -> Result<Option<VerificationRequest>, IdentityError> {
        Ok(self.state.write().await.verification_requests.remove(token))
    }

    async fn add_session(&self, record: SessionRecord) -> Result<(), IdentityError> {
        self.state.write().await.sessions.push(record);
        Ok(())
    }

    async fn get_env(&self) -> Result<Option<EncryptedBlob>, IdentityError> {
        let state = self.state.read().await;
        if state.env_unreadable {
            return Err(IdentityError::persistence("env store unreachable"));
        }
        Ok(state.env.clone())
    }

    async fn update_env(&self, blob: EncryptedBlob) -> Result<(), IdentityError> {
        let mut state = self.state.write().await;
        match std::mem::take(&mut state.env_fault) {
            EnvWriteFault::None => {
                state.env = Some(blob);
                state.env_unreadable = false;
                Ok(())
            }
            EnvWriteFault::Reject => Err(IdentityError::persistence("env write rejected")),
            EnvWriteFault::WriteThenFail => {
                state.env = Some(blob);
                Err(IdentityError::persistence("env write acknowledgement lost"))
            }
            EnvWriteFault::RejectAndUnreadable => {
                state.env_unreadable = true;
                Err(IdentityError::persistence("env store unreachable"))
            }
        }
    }
}

/// Mail sender that only logs; the token itself is never logged.
#[derive(Debug, Default)]
pub struct LogMailSender;

#[async_trait]
impl MailSender for LogMailSender {
    async fn send_verification_mail(
        &self,
        email: &str,
        _token: &str,
        host: &str,
        purpose: VerificationPurpose,
    ) -> Result<(), IdentityError> {
        info!(email = %email, host = %host, purpose = %purpose, "Verification mail dispatched");
        Ok(())
    }
}

/// A mail the [`RecordingMailSender`] accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub email: String,
    pub token: String,
    pub host: String,
    pub purpose: VerificationPurpose,
}

/// Mail sender keeping every message in memory; optionally failing.
#[derive(Default)]
pub struct RecordingMailSender {
    sent: RwLock<Vec<SentMail>>,
    fail: bool,
}

impl RecordingMailSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            sent: RwLock::default(),
            fail: true,
        }
    }

    pub async fn sent(&self) -> Vec<SentMail> {
        self.sent.read().await.clone()
    }
}

#[async_trait]
impl MailSender for RecordingMailSender {
    async fn send_verification_mail(
        &self,
        email: &str,
        token: &str,
        host: &str,
        purpose: VerificationPurpose,
    ) -> Result<(), IdentityError> {
        if self.fail {
            return Err(IdentityError::internal("smtp connection refused"));
        }
        self.sent.write().await.push(SentMail {
            email: email.to_string(),
            token: token.to_string(),
            host: host.to_string(),
            purpose,
        });
        Ok(())
    }
}
