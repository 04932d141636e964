//! Property-based tests for token issuance and verification.
//!
//! Property 1: Issue/verify roundtrip for every signable algorithm
//! Property 2: Expired tokens are rejected
//! Property 3: Switching algorithms invalidates earlier tokens
//! Property 4: Verification tokens are consumed at most once
//! Property 5: Revoking a user's sessions invalidates their tokens

mod common;

use common::{admin_request, service, user};
use identity_service::IdentityError;
use identity_service::admin::ConfigUpdate;
use identity_service::crypto::JwtAlgorithm;
use identity_service::session::SessionEntry;
use identity_service::storage::{PersistenceProvider, VerificationPurpose, VerificationRequest};
use identity_service::store::keys;
use identity_service::token::{AccessClaims, FingerprintGenerator};
use proptest::prelude::*;

/// Algorithms with fast key generation; RSA is covered by a single test below.
fn arb_fast_algorithm() -> impl Strategy<Value = JwtAlgorithm> {
    prop_oneof![
        Just(JwtAlgorithm::HS256),
        Just(JwtAlgorithm::HS384),
        Just(JwtAlgorithm::HS512),
        Just(JwtAlgorithm::ES256),
        Just(JwtAlgorithm::ES384),
    ]
}

fn arb_email() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{2,12}@[a-z]{3,8}\\.(com|org|io)".prop_map(|s| s)
}

fn arb_roles() -> impl Strategy<Value = Vec<String>> {
    prop::sample::subsequence(vec!["user".to_string(), "admin".to_string()], 1..=2)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    /// Property 1: Issue/verify roundtrip
    ///
    /// A token issued with a live session verifies to the same subject,
    /// roles and audience under the same configuration.
    #[test]
    fn prop_issue_verify_roundtrip(
        algorithm in arb_fast_algorithm(),
        email in arb_email(),
        roles in arb_roles(),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let t = service(algorithm);
            let user = user(&email);

            let issued = t.service.tokens().start_session(&user, &roles, &[]).await.unwrap();
            prop_assert!(issued.expires_in >= 1);

            let claims = t.service.verify_access_token(&issued.access_token).await.unwrap();
            prop_assert_eq!(&claims.sub, &user.id);
            prop_assert_eq!(&claims.roles, &roles);
            prop_assert_eq!(claims.aud.as_str(), "integration-client");
            prop_assert_eq!(claims.email.as_deref(), Some(email.as_str()));

            Ok(())
        })?;
    }

    /// Property 2: Expired tokens are rejected
    #[test]
    fn prop_expired_token_rejected(
        algorithm in arb_fast_algorithm(),
        expired_for in 1i64..3600,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let t = service(algorithm);
            let fingerprint = FingerprintGenerator::generate();
            let claims = AccessClaims::new(
                "https://auth.example.com".to_string(),
                "user-1".to_string(),
                "integration-client".to_string(),
                -expired_for,
            )
            .unwrap()
            .with_fingerprint(fingerprint);

            let raw = t.service.tokens().encode_access_claims(&claims).unwrap();
            let result = t.service.verify_access_token(&raw).await;
            prop_assert!(matches!(result, Err(IdentityError::ExpiredToken)), "got {:?}", result);

            Ok(())
        })?;
    }

    /// Property 5: Revoking a user's sessions invalidates their tokens
    #[test]
    fn prop_revoked_sessions_unauthorized(devices in 1usize..5) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let t = service(JwtAlgorithm::HS256);
            let user = user("multi@example.com");
            let roles = vec!["user".to_string()];

            let mut tokens = Vec::new();
            for _ in 0..devices {
                tokens.push(t.service.tokens().start_session(&user, &roles, &[]).await.unwrap());
            }

            let removed = t.service.revoke_user_sessions(&user.id).await;
            prop_assert_eq!(removed, devices);

            for token in &tokens {
                let result = t.service.verify_access_token(&token.access_token).await;
                prop_assert!(matches!(result, Err(IdentityError::Unauthorized)));
            }

            Ok(())
        })?;
    }
}

#[tokio::test]
async fn test_rsa_roundtrip_and_jwks() {
    let t = service(JwtAlgorithm::RS256);
    let user = user("rsa@example.com");

    let issued = t
        .service
        .tokens()
        .start_session(&user, &["user".to_string()], &[])
        .await
        .unwrap();
    let claims = t.service.verify_access_token(&issued.access_token).await.unwrap();
    assert_eq!(claims.sub, user.id);

    let jwks = t.service.public_key_set().unwrap();
    assert_eq!(jwks.keys.len(), 1);
    assert_eq!(jwks.keys[0].kty, "RSA");
    assert_eq!(jwks.keys[0].kid, "integration-client");
    assert!(jwks.keys[0].n.is_some());
}

/// Property 3: Switching algorithms invalidates earlier tokens
#[tokio::test]
async fn test_algorithm_switch_invalidates_old_tokens() {
    let t = service(JwtAlgorithm::HS256);
    let user = user("switch@example.com");
    let roles = vec!["user".to_string()];

    let before = t.service.tokens().start_session(&user, &roles, &[]).await.unwrap();
    assert!(t.service.verify_access_token(&before.access_token).await.is_ok());

    let generated = t.service.generate_jwt_keys(&admin_request(), "ES256").await.unwrap();
    let update = ConfigUpdate {
        jwt_type: Some("ES256".to_string()),
        jwt_private_key: generated.private_key,
        jwt_public_key: generated.public_key,
        ..ConfigUpdate::default()
    };
    let outcome = t.service.update_configuration(&admin_request(), update).await.unwrap();
    assert_eq!(outcome.jwks.keys[0].kty, "EC");
    assert_eq!(t.service.store().get_string(keys::JWT_TYPE), "ES256");
    assert!(t.service.store().get_string(keys::JWT_SECRET).is_empty());

    assert!(t.service.verify_access_token(&before.access_token).await.is_err());

    let after = t.service.tokens().start_session(&user, &roles, &[]).await.unwrap();
    assert!(t.service.verify_access_token(&after.access_token).await.is_ok());
}

/// Property 3: An HMAC token is refused once RSA signing is active, even
/// while its session is still registered
#[tokio::test]
async fn test_hmac_token_rejected_after_switch_to_rsa() {
    let t = service(JwtAlgorithm::HS256);
    let user = user("rsa-switch@example.com");
    let roles = vec!["user".to_string()];
    let before = t.service.tokens().start_session(&user, &roles, &[]).await.unwrap();

    let generated = t.service.generate_jwt_keys(&admin_request(), "RS256").await.unwrap();
    let update = ConfigUpdate {
        jwt_type: Some("RS256".to_string()),
        jwt_private_key: generated.private_key,
        jwt_public_key: generated.public_key,
        ..ConfigUpdate::default()
    };
    t.service.update_configuration(&admin_request(), update).await.unwrap();
    assert_eq!(t.service.store().get_string(keys::JWT_TYPE), "RS256");

    t.service
        .sessions()
        .put(
            before.fingerprint_hash.clone(),
            SessionEntry::new(&before.fingerprint, &user.id, 3600).unwrap(),
        )
        .await;

    let result = t.service.verify_access_token(&before.access_token).await;
    assert!(matches!(result, Err(IdentityError::InvalidSignature(_))), "got {result:?}");
}

/// Property 4: Verification tokens are consumed at most once
#[tokio::test]
async fn test_verification_token_consumed_once() {
    let t = service(JwtAlgorithm::ES256);
    let (nonce, digest) = FingerprintGenerator::nonce();
    let token = t
        .service
        .tokens()
        .create_verification_token(
            "verify@example.com",
            VerificationPurpose::BasicAuthSignup,
            "https://auth.example.com",
            &digest,
            "https://app.example.com",
        )
        .unwrap();

    let now = chrono::Utc::now();
    t.persistence
        .add_verification_request(VerificationRequest {
            id: "vr-1".to_string(),
            token: token.clone(),
            purpose: VerificationPurpose::BasicAuthSignup,
            email: "verify@example.com".to_string(),
            nonce,
            redirect_uri: "https://app.example.com".to_string(),
            expires_at: now + chrono::Duration::minutes(30),
            created_at: now,
        })
        .await
        .unwrap();

    let (claims, _) = t
        .service
        .tokens()
        .consume_verification_token(&token, t.persistence.as_ref())
        .await
        .unwrap();
    assert_eq!(claims.email(), "verify@example.com");

    let replay = t
        .service
        .tokens()
        .consume_verification_token(&token, t.persistence.as_ref())
        .await;
    assert!(matches!(replay, Err(IdentityError::AlreadyConsumed)));

    let request_count = t.persistence.verification_requests().await.len();
    assert_eq!(request_count, 0);
}
