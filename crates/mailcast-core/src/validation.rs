//! Input validation helpers

use mailcast_common::types::EmailAddress;
use mailcast_common::{Error, Result};

pub const MIN_PASSWORD_LEN: usize = 8;

/// Trimmed, non-empty text of at most `max` characters
pub fn required_text(field: &str, value: &str, max: usize) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::Validation(format!("{} must not be empty", field)));
    }
    bounded_text(field, value, max)
}

/// Text of at most `max` characters; blank becomes `None`
pub fn optional_text(field: &str, value: Option<&str>, max: usize) -> Result<Option<String>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => bounded_text(field, value, max).map(Some),
    }
}

fn bounded_text(field: &str, value: &str, max: usize) -> Result<String> {
    if value.chars().count() > max {
        return Err(Error::Validation(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(value.to_string())
}

/// Normalized email address of at most `max` characters
pub fn email(value: &str, max: usize) -> Result<String> {
    let address: EmailAddress = value.parse()?;
    let address = address.to_string();
    bounded_text("email", &address, max)
}

pub fn password(password: &str, confirmation: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if password != confirmation {
        return Err(Error::Validation("Passwords do not match".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_required_text() {
        assert_eq!(required_text("name", "  Ann ", 10).unwrap(), "Ann");
        assert!(required_text("name", "   ", 10).is_err());
        assert!(required_text("name", "abcdefghijk", 10).is_err());
    }

    #[test]
    fn test_optional_text() {
        assert_eq!(optional_text("comment", Some(""), 5).unwrap(), None);
        assert_eq!(optional_text("comment", None, 5).unwrap(), None);
        assert_eq!(optional_text("comment", Some("hi"), 5).unwrap(), Some("hi".to_string()));
        assert!(optional_text("comment", Some("too long"), 5).is_err());
    }

    #[test]
    fn test_email() {
        assert_eq!(email(" Ann@Example.COM ", 150).unwrap(), "Ann@example.com");
        assert!(email("ann.example.com", 150).is_err());
        assert!(email("a@example.com", 5).is_err());
    }

    #[test]
    fn test_password() {
        assert!(password("long enough", "long enough").is_ok());
        assert!(password("short", "short").is_err());
        assert!(password("long enough", "different!").is_err());
    }
}
