//! Input checks shared by the signup and login flows.

use crate::error::IdentityError;
use once_cell::sync::Lazy;
use regex::Regex;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_PASSWORD_LEN: usize = 36;

static EMAIL_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());

/// Lower-cased, trimmed email; `InvalidInput` when it is not an address.
pub fn normalize_email(raw: &str) -> Result<String, IdentityError> {
    let email = raw.trim().to_lowercase();
    if EMAIL_PATTERN.as_ref().is_some_and(|re| re.is_match(&email)) {
        Ok(email)
    } else {
        Err(IdentityError::invalid_input("invalid email address"))
    }
}

/// 6 to 36 characters with a lower-case letter, an upper-case letter, a
/// digit and a special character.
pub fn is_strong_password(password: &str) -> bool {
    let len = password.chars().count();
    (MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len)
        && password.chars().any(char::is_lowercase)
        && password.chars().any(char::is_uppercase)
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| !c.is_alphanumeric())
}

pub fn validate_password(password: &str, confirm_password: &str) -> Result<(), IdentityError> {
    if password != confirm_password {
        return Err(IdentityError::invalid_input(
            "password and confirm password does not match",
        ));
    }
    if !is_strong_password(password) {
        return Err(IdentityError::invalid_input(
            "password is not valid. It needs to be at least 6 characters long and contain number, uppercase letter, lowercase letter and special character",
        ));
    }
    Ok(())
}

/// Requested roles when all of them are configured, default roles when none were requested.
pub fn resolve_roles(
    requested: &[String],
    configured: &[String],
    defaults: &[String],
) -> Result<Vec<String>, IdentityError> {
    if requested.is_empty() {
        return Ok(defaults.to_vec());
    }
    if let Some(role) = requested.iter().find(|role| !configured.contains(role)) {
        return Err(IdentityError::invalid_input(format!("invalid role {role}")));
    }
    Ok(requested.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Alice@Example.COM ").unwrap(), "alice@example.com");
        assert!(normalize_email("not-an-email").is_err());
        assert!(normalize_email("a b@example.com").is_err());
    }

    #[test]
    fn test_password_strength() {
        assert!(is_strong_password("Passw0rd!"));
        assert!(!is_strong_password("password"));
        assert!(!is_strong_password("Pa0!"));
        assert!(!is_strong_password("PASSW0RD!"));
        assert!(!is_strong_password("Password!"));
        assert!(!is_strong_password(&format!("Aa1!{}", "x".repeat(40))));
    }

    #[test]
    fn test_password_mismatch() {
        assert!(matches!(
            validate_password("Passw0rd!", "Passw0rd?"),
            Err(IdentityError::InvalidInput(_))
        ));
        assert!(validate_password("Passw0rd!", "Passw0rd!").is_ok());
    }

    #[test]
    fn test_resolve_roles() {
        let configured = vec!["user".to_string(), "admin".to_string()];
        let defaults = vec!["user".to_string()];

        assert_eq!(resolve_roles(&[], &configured, &defaults).unwrap(), defaults);
        assert_eq!(
            resolve_roles(&["admin".to_string()], &configured, &defaults).unwrap(),
            vec!["admin"]
        );
        assert!(resolve_roles(&["root".to_string()], &configured, &defaults).is_err());
    }
}
