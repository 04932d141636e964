//! Session and admin cookies.

use crate::request::RequestContext;
use crate::store::{ConfigSnapshot, keys};
use std::fmt;
use url::form_urlencoded;

pub const DEFAULT_COOKIE_NAME: &str = "authorizer";
pub const DEFAULT_ADMIN_COOKIE_NAME: &str = "authorizer-admin";
pub const ADMIN_COOKIE_TTL_SECONDS: i64 = 3600;

/// A cookie to set on the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    /// Decoded value; encoded when rendered.
    pub value: String,
    /// Negative clears the cookie.
    pub max_age: i64,
    pub path: String,
    pub domain: String,
    pub secure: bool,
    pub http_only: bool,
}

impl Cookie {
    pub const fn is_clearing(&self) -> bool {
        self.max_age < 0
    }
}

impl fmt::Display for Cookie {
    /// `Set-Cookie` header value.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value: String = form_urlencoded::byte_serialize(self.value.as_bytes()).collect();
        write!(f, "{}={}; Path={}", self.name, value, self.path)?;
        if !self.domain.is_empty() {
            write!(f, "; Domain={}", self.domain)?;
        }
        // A negative max-age is sent as an immediate expiry.
        write!(f, "; Max-Age={}", self.max_age.max(0))?;
        if self.secure {
            f.write_str("; Secure")?;
        }
        if self.http_only {
            f.write_str("; HttpOnly")?;
        }
        Ok(())
    }
}

/// Host with any port removed; IPv6 literals keep their brackets.
pub fn host_without_port(host: &str) -> &str {
    if host.starts_with('[') {
        return host.find(']').map_or(host, |end| &host[..=end]);
    }
    host.split(':').next().unwrap_or(host)
}

fn name_or<'a>(snapshot: &'a ConfigSnapshot, key: &str, default: &'a str) -> &'a str {
    let name = snapshot.get_string(key);
    if name.is_empty() { default } else { name }
}

pub fn admin_cookie_name(snapshot: &ConfigSnapshot) -> &str {
    name_or(snapshot, keys::ADMIN_COOKIE_NAME, DEFAULT_ADMIN_COOKIE_NAME)
}

pub fn session_cookie_name(snapshot: &ConfigSnapshot) -> String {
    format!("{}_session", name_or(snapshot, keys::COOKIE_NAME, DEFAULT_COOKIE_NAME))
}

/// Admin cookie carrying `value` (a digest of the admin-secret digest) for one hour.
pub fn admin_cookie(snapshot: &ConfigSnapshot, host: &str, value: impl Into<String>) -> Cookie {
    Cookie {
        name: admin_cookie_name(snapshot).to_string(),
        value: value.into(),
        max_age: ADMIN_COOKIE_TTL_SECONDS,
        path: "/".to_string(),
        domain: host_without_port(host).to_string(),
        secure: false,
        http_only: true,
    }
}

pub fn clear_admin_cookie(snapshot: &ConfigSnapshot, host: &str) -> Cookie {
    Cookie {
        max_age: -1,
        ..admin_cookie(snapshot, host, "")
    }
}

/// URL-decoded admin cookie value, if the request carries one.
pub fn read_admin_cookie(snapshot: &ConfigSnapshot, request: &RequestContext) -> Option<String> {
    request.cookie(admin_cookie_name(snapshot)).map(decode_value)
}

/// Session cookie carrying the fingerprint hash for the session lifetime.
pub fn session_cookie(snapshot: &ConfigSnapshot, host: &str, fingerprint_hash: &str) -> Cookie {
    Cookie {
        name: session_cookie_name(snapshot),
        value: fingerprint_hash.to_string(),
        max_age: snapshot.session_ttl_seconds(),
        path: "/".to_string(),
        domain: host_without_port(host).to_string(),
        secure: true,
        http_only: true,
    }
}

pub fn clear_session_cookie(snapshot: &ConfigSnapshot, host: &str) -> Cookie {
    Cookie {
        max_age: -1,
        ..session_cookie(snapshot, host, "")
    }
}

pub fn read_session_cookie(snapshot: &ConfigSnapshot, request: &RequestContext) -> Option<String> {
    request
        .cookie(&session_cookie_name(snapshot))
        .map(decode_value)
        .filter(|value| !value.is_empty())
}

fn decode_value(raw: &str) -> String {
    form_urlencoded::parse(format!("v={raw}").as_bytes())
        .next()
        .map(|(_, value)| value.into_owned())
        .unwrap_or_default()
}
