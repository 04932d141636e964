//! Signing key generation, parsing and validation.
//!
//! Sizes: HMAC secrets are 32/48/64 random bytes (HS256/384/512), RSA keys
//! use a 2048-bit modulus (PKCS#1 PEM), ECDSA keys use P-256 or P-384
//! (PKCS#8 private PEM, SPKI public PEM).

use crate::crypto::algorithm::{AlgorithmFamily, JwtAlgorithm};
use crate::crypto::jwks::{Jwk, Jwks};
use crate::error::IdentityError;
use crate::store::{ConfigSnapshot, keys};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::RngCore;
use ring::rand::SystemRandom;
use ring::signature::{
    ECDSA_P256_SHA256_FIXED_SIGNING, ECDSA_P384_SHA384_FIXED_SIGNING, EcdsaKeyPair,
    EcdsaSigningAlgorithm, KeyPair,
};
use rsa::pkcs1::{
    DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey, EncodeRsaPublicKey, LineEnding,
};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;
use zeroize::Zeroizing;

pub const RSA_MODULUS_BITS: usize = 2048;

// DER SubjectPublicKeyInfo headers preceding the uncompressed EC point.
const P256_SPKI_PREFIX: &[u8] = &[
    0x30, 0x59, 0x30, 0x13, 0x06, 0x07, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01, 0x06, 0x08, 0x2a,
    0x86, 0x48, 0xce, 0x3d, 0x03, 0x01, 0x07, 0x03, 0x42, 0x00,
];
const P384_SPKI_PREFIX: &[u8] = &[
    0x30, 0x76, 0x30, 0x10, 0x06, 0x07, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01, 0x06, 0x05, 0x2b,
    0x81, 0x04, 0x00, 0x22, 0x03, 0x62, 0x00,
];

struct Curve {
    name: &'static str,
    signing: &'static EcdsaSigningAlgorithm,
    spki_prefix: &'static [u8],
    coordinate_len: usize,
}

fn curve_for(algorithm: JwtAlgorithm) -> Result<Curve, IdentityError> {
    match algorithm {
        JwtAlgorithm::ES256 => Ok(Curve {
            name: "P-256",
            signing: &ECDSA_P256_SHA256_FIXED_SIGNING,
            spki_prefix: P256_SPKI_PREFIX,
            coordinate_len: 32,
        }),
        JwtAlgorithm::ES384 => Ok(Curve {
            name: "P-384",
            signing: &ECDSA_P384_SHA384_FIXED_SIGNING,
            spki_prefix: P384_SPKI_PREFIX,
            coordinate_len: 48,
        }),
        other => Err(IdentityError::UnsupportedAlgorithm(format!(
            "{other} has no supported curve"
        ))),
    }
}

/// Secret half of a signing key.
#[derive(Clone)]
pub enum KeyMaterial {
    Symmetric {
        secret: Zeroizing<String>,
    },
    Asymmetric {
        private_key_pem: Zeroizing<String>,
        public_key_pem: String,
    },
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Symmetric { .. } => f.write_str("KeyMaterial::Symmetric([redacted])"),
            Self::Asymmetric { public_key_pem, .. } => f
                .debug_struct("KeyMaterial::Asymmetric")
                .field("public_key_pem", public_key_pem)
                .finish_non_exhaustive(),
        }
    }
}

/// Freshly generated key material plus its publishable JWK.
#[derive(Debug, Clone)]
pub struct SigningKeyMaterial {
    pub algorithm: JwtAlgorithm,
    pub key_id: String,
    pub material: KeyMaterial,
    pub jwk: Jwk,
}

/// Response body of the key generation command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedKeys {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
}

impl From<&SigningKeyMaterial> for GeneratedKeys {
    fn from(material: &SigningKeyMaterial) -> Self {
        match &material.material {
            KeyMaterial::Symmetric { secret } => Self {
                secret: Some(secret.to_string()),
                ..Self::default()
            },
            KeyMaterial::Asymmetric {
                private_key_pem,
                public_key_pem,
            } => Self {
                secret: None,
                private_key: Some(private_key_pem.to_string()),
                public_key: Some(public_key_pem.clone()),
            },
        }
    }
}

/// Parsed keys for the active snapshot, ready to sign and verify.
#[derive(Clone)]
pub struct SigningKeys {
    pub version: u64,
    pub algorithm: JwtAlgorithm,
    pub key_id: String,
    backend: Algorithm,
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKeys {
    pub const fn backend_algorithm(&self) -> Algorithm {
        self.backend
    }

    pub const fn encoding_key(&self) -> &EncodingKey {
        &self.encoding
    }

    pub const fn decoding_key(&self) -> &DecodingKey {
        &self.decoding
    }
}

impl fmt::Debug for SigningKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKeys")
            .field("version", &self.version)
            .field("algorithm", &self.algorithm)
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize, Deserialize)]
struct PairCheck {
    sub: String,
    exp: i64,
}

pub struct KeyManager;

impl KeyManager {
    /// Generate new signing material for `algorithm`, identified by `owner_id`.
    pub fn generate(algorithm: JwtAlgorithm, owner_id: &str) -> Result<SigningKeyMaterial, IdentityError> {
        algorithm.to_jsonwebtoken()?;

        let (material, jwk) = match algorithm.family() {
            AlgorithmFamily::Hmac => {
                let secret = Zeroizing::new(Self::generate_hmac_secret(algorithm));
                (
                    KeyMaterial::Symmetric { secret },
                    Jwk::symmetric(owner_id, algorithm.as_str()),
                )
            }
            AlgorithmFamily::Rsa => {
                let (private_key_pem, public_key_pem) = Self::generate_rsa_pair()?;
                let jwk = Self::public_jwk(algorithm, owner_id, &public_key_pem)?;
                (
                    KeyMaterial::Asymmetric {
                        private_key_pem,
                        public_key_pem,
                    },
                    jwk,
                )
            }
            AlgorithmFamily::Ecdsa => {
                let (private_key_pem, public_key_pem) = Self::generate_ecdsa_pair(algorithm)?;
                let jwk = Self::public_jwk(algorithm, owner_id, &public_key_pem)?;
                (
                    KeyMaterial::Asymmetric {
                        private_key_pem,
                        public_key_pem,
                    },
                    jwk,
                )
            }
        };

        info!(algorithm = %algorithm, kid = %owner_id, "Generated signing key material");

        Ok(SigningKeyMaterial {
            algorithm,
            key_id: owner_id.to_string(),
            material,
            jwk,
        })
    }

    /// Parse a tag then generate; unknown tags fail with `UnsupportedAlgorithm`.
    pub fn generate_for_tag(tag: &str, owner_id: &str) -> Result<SigningKeyMaterial, IdentityError> {
        Self::generate(tag.parse()?, owner_id)
    }

    fn generate_hmac_secret(algorithm: JwtAlgorithm) -> String {
        let len = match algorithm {
            JwtAlgorithm::HS384 => 48,
            JwtAlgorithm::HS512 => 64,
            _ => 32,
        };
        let mut bytes = vec![0u8; len];
        rand::thread_rng().fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    fn generate_rsa_pair() -> Result<(Zeroizing<String>, String), IdentityError> {
        let private_key = RsaPrivateKey::new(&mut rand::thread_rng(), RSA_MODULUS_BITS)
            .map_err(|e| IdentityError::internal(format!("RSA key generation failed: {e}")))?;
        let private_pem = private_key
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| IdentityError::internal(format!("RSA private key encoding failed: {e}")))?;
        let public_pem = private_key
            .to_public_key()
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| IdentityError::internal(format!("RSA public key encoding failed: {e}")))?;

        Ok((private_pem, public_pem))
    }

    fn generate_ecdsa_pair(algorithm: JwtAlgorithm) -> Result<(Zeroizing<String>, String), IdentityError> {
        let curve = curve_for(algorithm)?;
        let rng = SystemRandom::new();

        let document = EcdsaKeyPair::generate_pkcs8(curve.signing, &rng)
            .map_err(|_| IdentityError::internal("ECDSA key generation failed"))?;
        let key_pair = EcdsaKeyPair::from_pkcs8(curve.signing, document.as_ref(), &rng)
            .map_err(|e| IdentityError::internal(format!("ECDSA key rejected: {e}")))?;

        let mut spki = curve.spki_prefix.to_vec();
        spki.extend_from_slice(key_pair.public_key().as_ref());

        let private_pem = pem::encode(&pem::Pem::new("PRIVATE KEY", document.as_ref().to_vec()));
        let public_pem = pem::encode(&pem::Pem::new("PUBLIC KEY", spki));

        Ok((Zeroizing::new(private_pem), public_pem))
    }

    /// Parse a PEM private key for `algorithm`.
    pub fn parse_private_key(pem_str: &str, algorithm: JwtAlgorithm) -> Result<EncodingKey, IdentityError> {
        match algorithm.family() {
            AlgorithmFamily::Hmac => Err(IdentityError::malformed_key(
                "HMAC algorithms use a shared secret, not a private key",
            )),
            AlgorithmFamily::Rsa => {
                RsaPrivateKey::from_pkcs1_pem(pem_str)
                    .or_else(|_| RsaPrivateKey::from_pkcs8_pem(pem_str))
                    .map_err(|e| IdentityError::malformed_key(format!("invalid RSA private key: {e}")))?;
                EncodingKey::from_rsa_pem(pem_str.as_bytes())
                    .map_err(|e| IdentityError::malformed_key(e.to_string()))
            }
            AlgorithmFamily::Ecdsa => {
                let curve = curve_for(algorithm)?;
                let parsed = pem::parse(pem_str)
                    .map_err(|e| IdentityError::malformed_key(format!("invalid PEM: {e}")))?;
                if parsed.tag() != "PRIVATE KEY" {
                    return Err(IdentityError::malformed_key(format!(
                        "expected a PKCS#8 PRIVATE KEY block, found {}",
                        parsed.tag()
                    )));
                }
                EcdsaKeyPair::from_pkcs8(curve.signing, parsed.contents(), &SystemRandom::new())
                    .map_err(|e| IdentityError::malformed_key(format!("invalid ECDSA private key: {e}")))?;
                EncodingKey::from_ec_pem(pem_str.as_bytes())
                    .map_err(|e| IdentityError::malformed_key(e.to_string()))
            }
        }
    }

    /// Parse a PEM public key for `algorithm`.
    pub fn parse_public_key(pem_str: &str, algorithm: JwtAlgorithm) -> Result<DecodingKey, IdentityError> {
        match algorithm.family() {
            AlgorithmFamily::Hmac => Err(IdentityError::malformed_key(
                "HMAC algorithms use a shared secret, not a public key",
            )),
            AlgorithmFamily::Rsa => {
                Self::rsa_public_key(pem_str)?;
                DecodingKey::from_rsa_pem(pem_str.as_bytes())
                    .map_err(|e| IdentityError::malformed_key(e.to_string()))
            }
            AlgorithmFamily::Ecdsa => {
                Self::ec_point(pem_str, algorithm)?;
                DecodingKey::from_ec_pem(pem_str.as_bytes())
                    .map_err(|e| IdentityError::malformed_key(e.to_string()))
            }
        }
    }

    fn rsa_public_key(pem_str: &str) -> Result<RsaPublicKey, IdentityError> {
        RsaPublicKey::from_pkcs1_pem(pem_str)
            .or_else(|_| RsaPublicKey::from_public_key_pem(pem_str))
            .map_err(|e| IdentityError::malformed_key(format!("invalid RSA public key: {e}")))
    }

    /// Uncompressed EC point carried by an SPKI public key.
    fn ec_point(pem_str: &str, algorithm: JwtAlgorithm) -> Result<Vec<u8>, IdentityError> {
        let curve = curve_for(algorithm)?;
        let parsed = pem::parse(pem_str)
            .map_err(|e| IdentityError::malformed_key(format!("invalid PEM: {e}")))?;
        if parsed.tag() != "PUBLIC KEY" {
            return Err(IdentityError::malformed_key(format!(
                "expected a PUBLIC KEY block, found {}",
                parsed.tag()
            )));
        }

        let point = parsed
            .contents()
            .strip_prefix(curve.spki_prefix)
            .ok_or_else(|| IdentityError::malformed_key(format!("not a {} public key", curve.name)))?;
        if point.len() != 1 + 2 * curve.coordinate_len || point.first() != Some(&0x04) {
            return Err(IdentityError::malformed_key("EC point must be uncompressed"));
        }
        Ok(point.to_vec())
    }

    /// Check both halves parse and belong together.
    ///
    /// A check token is signed with the private key and verified with the
    /// public key, so a valid private key is never paired with a foreign or
    /// corrupt public key.
    pub fn validate_pair(
        algorithm: JwtAlgorithm,
        private_pem: &str,
        public_pem: &str,
    ) -> Result<(), IdentityError> {
        let backend = algorithm.to_jsonwebtoken()?;
        let encoding = Self::parse_private_key(private_pem, algorithm)?;
        let decoding = Self::parse_public_key(public_pem, algorithm)?;

        let check = PairCheck {
            sub: "key-pair-check".to_string(),
            exp: chrono::Utc::now().timestamp() + 60,
        };
        let token = encode(&Header::new(backend), &check, &encoding)
            .map_err(|e| IdentityError::malformed_key(format!("private key cannot sign: {e}")))?;
        decode::<PairCheck>(&token, &decoding, &Validation::new(backend))
            .map_err(|_| IdentityError::malformed_key("public key does not match private key"))?;

        Ok(())
    }

    /// Validate the signing fields a snapshot would carry for `algorithm`.
    ///
    /// HMAC requires a secret and no key pair; RSA/ECDSA require a matching
    /// pair and no secret.
    pub fn validate_material(
        algorithm: JwtAlgorithm,
        secret: &str,
        private_pem: &str,
        public_pem: &str,
    ) -> Result<(), IdentityError> {
        algorithm.to_jsonwebtoken()?;

        if algorithm.is_hmac() {
            if secret.is_empty() {
                return Err(IdentityError::invalid_configuration(format!(
                    "jwt secret is required for {algorithm}"
                )));
            }
            if !private_pem.is_empty() || !public_pem.is_empty() {
                return Err(IdentityError::invalid_configuration(
                    "HMAC configuration must not carry a key pair",
                ));
            }
            return Ok(());
        }

        if private_pem.is_empty() || public_pem.is_empty() {
            return Err(IdentityError::invalid_configuration(format!(
                "jwt private and public key are required for {algorithm}"
            )));
        }
        if !secret.is_empty() {
            return Err(IdentityError::invalid_configuration(format!(
                "{algorithm} configuration must not carry an HMAC secret"
            )));
        }
        Self::validate_pair(algorithm, private_pem, public_pem)
    }

    /// Parse the signing keys named by `snapshot`.
    pub fn signing_keys(snapshot: &ConfigSnapshot) -> Result<SigningKeys, IdentityError> {
        let algorithm: JwtAlgorithm = snapshot.get_string(keys::JWT_TYPE).parse()?;
        let backend = algorithm.to_jsonwebtoken()?;
        let secret = snapshot.get_string(keys::JWT_SECRET);
        let private_pem = snapshot.get_string(keys::JWT_PRIVATE_KEY);
        let public_pem = snapshot.get_string(keys::JWT_PUBLIC_KEY);

        let (encoding, decoding) = if algorithm.is_hmac() {
            if secret.is_empty() || !private_pem.is_empty() || !public_pem.is_empty() {
                return Err(IdentityError::invalid_configuration(
                    "HMAC configuration requires a secret and no key pair",
                ));
            }
            (
                EncodingKey::from_secret(secret.as_bytes()),
                DecodingKey::from_secret(secret.as_bytes()),
            )
        } else {
            if !secret.is_empty() || private_pem.is_empty() || public_pem.is_empty() {
                return Err(IdentityError::invalid_configuration(format!(
                    "{algorithm} configuration requires a key pair and no secret"
                )));
            }
            (
                Self::parse_private_key(private_pem, algorithm)?,
                Self::parse_public_key(public_pem, algorithm)?,
            )
        };

        Ok(SigningKeys {
            version: snapshot.version(),
            algorithm,
            key_id: snapshot.get_string(keys::CLIENT_ID).to_string(),
            backend,
            encoding,
            decoding,
        })
    }

    /// Publishable verification entry for a public key.
    pub fn public_jwk(algorithm: JwtAlgorithm, key_id: &str, public_pem: &str) -> Result<Jwk, IdentityError> {
        match algorithm.family() {
            AlgorithmFamily::Hmac => Ok(Jwk::symmetric(key_id, algorithm.as_str())),
            AlgorithmFamily::Rsa => {
                let public_key = Self::rsa_public_key(public_pem)?;
                Ok(Jwk::rsa(
                    key_id,
                    algorithm.as_str(),
                    URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be()),
                    URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be()),
                ))
            }
            AlgorithmFamily::Ecdsa => {
                let curve = curve_for(algorithm)?;
                let point = Self::ec_point(public_pem, algorithm)?;
                let (x, y) = point
                    .get(1..)
                    .unwrap_or_default()
                    .split_at(curve.coordinate_len);
                Ok(Jwk::ec(
                    key_id,
                    algorithm.as_str(),
                    curve.name,
                    URL_SAFE_NO_PAD.encode(x),
                    URL_SAFE_NO_PAD.encode(y),
                ))
            }
        }
    }

    /// Derive the public key set from whichever key type `snapshot` names.
    pub fn build_public_key_set(snapshot: &ConfigSnapshot) -> Result<Jwks, IdentityError> {
        let algorithm: JwtAlgorithm = snapshot.get_string(keys::JWT_TYPE).parse()?;
        let key_id = snapshot.get_string(keys::CLIENT_ID);
        let jwk = Self::public_jwk(algorithm, key_id, snapshot.get_string(keys::JWT_PUBLIC_KEY))?;
        Ok(Jwks::single(jwk))
    }

    /// Write generated material into the signing fields of `snapshot`.
    pub fn install(snapshot: &mut ConfigSnapshot, material: &SigningKeyMaterial) {
        snapshot.set_string(keys::JWT_TYPE, material.algorithm.as_str());
        match &material.material {
            KeyMaterial::Symmetric { secret } => {
                snapshot.set_string(keys::JWT_SECRET, secret.as_str());
                snapshot.set_string(keys::JWT_PRIVATE_KEY, "");
                snapshot.set_string(keys::JWT_PUBLIC_KEY, "");
            }
            KeyMaterial::Asymmetric {
                private_key_pem,
                public_key_pem,
            } => {
                snapshot.set_string(keys::JWT_SECRET, "");
                snapshot.set_string(keys::JWT_PRIVATE_KEY, private_key_pem.as_str());
                snapshot.set_string(keys::JWT_PUBLIC_KEY, public_key_pem.as_str());
            }
        }
        snapshot.set_string(keys::JWK, Jwks::single(material.jwk.clone()).to_json());
    }
}
