//! JWT algorithm tags and their signing family.

use crate::error::IdentityError;
use jsonwebtoken::Algorithm;
use std::fmt;
use std::str::FromStr;

/// Signing family. Every algorithm belongs to exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlgorithmFamily {
    Hmac,
    Rsa,
    Ecdsa,
}

/// JWT signing algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JwtAlgorithm {
    HS256,
    HS384,
    HS512,
    RS256,
    RS384,
    RS512,
    ES256,
    ES384,
    /// Recognised but not signable: no P-521 support in the JWT backend.
    ES512,
}

impl JwtAlgorithm {
    pub const ALL: [Self; 9] = [
        Self::HS256,
        Self::HS384,
        Self::HS512,
        Self::RS256,
        Self::RS384,
        Self::RS512,
        Self::ES256,
        Self::ES384,
        Self::ES512,
    ];

    /// Get algorithm name for JWT header.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::HS256 => "HS256",
            Self::HS384 => "HS384",
            Self::HS512 => "HS512",
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::RS512 => "RS512",
            Self::ES256 => "ES256",
            Self::ES384 => "ES384",
            Self::ES512 => "ES512",
        }
    }

    pub const fn family(&self) -> AlgorithmFamily {
        match self {
            Self::HS256 | Self::HS384 | Self::HS512 => AlgorithmFamily::Hmac,
            Self::RS256 | Self::RS384 | Self::RS512 => AlgorithmFamily::Rsa,
            Self::ES256 | Self::ES384 | Self::ES512 => AlgorithmFamily::Ecdsa,
        }
    }

    pub const fn is_hmac(&self) -> bool {
        matches!(self.family(), AlgorithmFamily::Hmac)
    }

    pub const fn is_rsa(&self) -> bool {
        matches!(self.family(), AlgorithmFamily::Rsa)
    }

    pub const fn is_ecdsa(&self) -> bool {
        matches!(self.family(), AlgorithmFamily::Ecdsa)
    }

    /// Backend algorithm used to sign and verify.
    pub fn to_jsonwebtoken(self) -> Result<Algorithm, IdentityError> {
        match self {
            Self::HS256 => Ok(Algorithm::HS256),
            Self::HS384 => Ok(Algorithm::HS384),
            Self::HS512 => Ok(Algorithm::HS512),
            Self::RS256 => Ok(Algorithm::RS256),
            Self::RS384 => Ok(Algorithm::RS384),
            Self::RS512 => Ok(Algorithm::RS512),
            Self::ES256 => Ok(Algorithm::ES256),
            Self::ES384 => Ok(Algorithm::ES384),
            Self::ES512 => Err(IdentityError::UnsupportedAlgorithm(
                "ES512 signing is not available".to_string(),
            )),
        }
    }
}

impl FromStr for JwtAlgorithm {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.as_str() == s)
            .ok_or_else(|| IdentityError::UnsupportedAlgorithm(s.to_string()))
    }
}

impl fmt::Display for JwtAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn is_hmac(tag: &str) -> bool {
    tag.parse::<JwtAlgorithm>().is_ok_and(|alg| alg.is_hmac())
}

pub fn is_rsa(tag: &str) -> bool {
    tag.parse::<JwtAlgorithm>().is_ok_and(|alg| alg.is_rsa())
}

pub fn is_ecdsa(tag: &str) -> bool {
    tag.parse::<JwtAlgorithm>().is_ok_and(|alg| alg.is_ecdsa())
}
