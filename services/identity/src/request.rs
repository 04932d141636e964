use std::collections::HashMap;

/// Transport-neutral view of an incoming request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Host the request was addressed to, possibly with a port.
    pub host: String,
    headers: HashMap<String, String>,
}

impl RequestContext {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            headers: HashMap::new(),
        }
    }

    /// Header names are case-insensitive.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Append a `name=value` pair to the `cookie` header.
    pub fn with_cookie(mut self, name: &str, value: &str) -> Self {
        let pair = format!("{name}={value}");
        self.headers
            .entry("cookie".to_string())
            .and_modify(|existing| {
                existing.push_str("; ");
                existing.push_str(&pair);
            })
            .or_insert(pair);
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Raw (still encoded) cookie value.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.header("cookie")?
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }

    /// Token from an `Authorization: Bearer` header.
    pub fn bearer_token(&self) -> Option<&str> {
        self.header("authorization")?
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }

    pub fn user_agent(&self) -> &str {
        self.header("user-agent").unwrap_or_default()
    }

    /// Client address from `x-forwarded-for`, first hop.
    pub fn client_ip(&self) -> &str {
        self.header("x-forwarded-for")
            .and_then(|value| value.split(',').next())
            .map_or("", str::trim)
    }

    /// Scheme and host used in links sent back to the caller.
    pub fn origin(&self) -> String {
        let scheme = self.header("x-forwarded-proto").unwrap_or("https");
        format!("{scheme}://{}", self.host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_lookup() {
        let request = RequestContext::new("auth.example.com")
            .with_cookie("a", "1")
            .with_cookie("b", "two%24");

        assert_eq!(request.cookie("a"), Some("1"));
        assert_eq!(request.cookie("b"), Some("two%24"));
        assert_eq!(request.cookie("c"), None);
    }

    #[test]
    fn test_headers_case_insensitive() {
        let request = RequestContext::new("h")
            .with_header("X-Forwarded-For", "10.0.0.1, 10.0.0.2")
            .with_header("User-Agent", "curl");

        assert_eq!(request.client_ip(), "10.0.0.1");
        assert_eq!(request.user_agent(), "curl");
        assert_eq!(request.origin(), "https://h");
    }

    #[test]
    fn test_bearer_token() {
        let request = RequestContext::new("h").with_header("Authorization", "Bearer abc.def");
        assert_eq!(request.bearer_token(), Some("abc.def"));
        assert_eq!(RequestContext::new("h").bearer_token(), None);
        assert_eq!(
            RequestContext::new("h").with_header("authorization", "Basic xyz").bearer_token(),
            None
        );
    }
}
