use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    pub kid: String,
    #[serde(rename = "use")]
    pub key_use: String,
    pub alg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
}

impl Jwk {
    /// Entry for an HMAC key: identifies the algorithm, publishes no material.
    pub fn symmetric(kid: impl Into<String>, alg: impl Into<String>) -> Self {
        Self {
            kty: "oct".to_string(),
            kid: kid.into(),
            key_use: "sig".to_string(),
            alg: alg.into(),
            n: None,
            e: None,
            x: None,
            y: None,
            crv: None,
        }
    }

    pub fn rsa(kid: impl Into<String>, alg: impl Into<String>, n: String, e: String) -> Self {
        Self {
            kty: "RSA".to_string(),
            n: Some(n),
            e: Some(e),
            ..Self::symmetric(kid, alg)
        }
    }

    pub fn ec(
        kid: impl Into<String>,
        alg: impl Into<String>,
        crv: impl Into<String>,
        x: String,
        y: String,
    ) -> Self {
        Self {
            kty: "EC".to_string(),
            crv: Some(crv.into()),
            x: Some(x),
            y: Some(y),
            ..Self::symmetric(kid, alg)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

impl Jwks {
    pub fn single(key: Jwk) -> Self {
        Self { keys: vec![key] }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|key| key.kid == kid)
    }
}
