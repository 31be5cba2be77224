//! Common types for Mailcast

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for users
pub type UserId = Uuid;

/// Unique identifier for recipients
pub type RecipientId = Uuid;

/// Unique identifier for messages
pub type MessageId = Uuid;

/// Unique identifier for mailings
pub type MailingId = Uuid;

/// Unique identifier for mailing attempts
pub type AttemptId = Uuid;

/// Timestamp wrapper
pub type Timestamp = DateTime<Utc>;

/// Group whose members see every user's data
pub const GROUP_MANAGERS: &str = "managers";

/// Group whose members see only their own data
pub const GROUP_USERS: &str = "users";

/// Permission required to stop a mailing
pub const PERM_STOP_MAILING: &str = "mailing.stop";

/// Email address
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddress {
    pub local: String,
    pub domain: String,
}

impl EmailAddress {
    /// Create a new email address
    pub fn new(local: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            local: local.into(),
            domain: domain.into(),
        }
    }

    /// Parse an email address from a string
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let (local, domain) = s.split_once('@')?;
        if local.is_empty()
            || domain.is_empty()
            || domain.contains('@')
            || !domain.contains('.')
            || s.chars().any(char::is_whitespace)
        {
            return None;
        }
        Some(Self::new(local, domain.to_ascii_lowercase()))
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.local, self.domain)
    }
}

impl std::str::FromStr for EmailAddress {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| crate::Error::Validation(format!("Invalid email address: {}", s)))
    }
}

/// Pagination window for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_address_parse() {
        let email = EmailAddress::parse("user@Example.com").unwrap();
        assert_eq!(email.local, "user");
        assert_eq!(email.domain, "example.com");
        assert_eq!(email.to_string(), "user@example.com");
    }

    #[test]
    fn test_email_address_invalid() {
        assert!(EmailAddress::parse("invalid").is_none());
        assert!(EmailAddress::parse("@example.com").is_none());
        assert!(EmailAddress::parse("user@").is_none());
        assert!(EmailAddress::parse("user@localhost").is_none());
        assert!(EmailAddress::parse("a b@example.com").is_none());
        assert!(EmailAddress::parse("a@b@example.com").is_none());
    }

    #[test]
    fn test_email_from_str_error() {
        let err = "nope".parse::<EmailAddress>().unwrap_err();
        assert_eq!(err.status_code(), 422);
    }
}
