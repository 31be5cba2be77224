//! Database models

use chrono::{DateTime, Utc};
use mailcast_common::types::{AttemptId, MailingId, MessageId, RecipientId, UserId};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Anything that carries a (nullable) owner
pub trait Owned {
    fn owner_id(&self) -> Option<UserId>;
}

// ============================================================================
// Accounts
// ============================================================================

/// User model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub country: String,
    pub is_active: bool,
    pub is_superuser: bool,
    pub email_confirmed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create user input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub country: Option<String>,
    /// New accounts stay inactive until the email is confirmed
    pub is_active: bool,
    pub is_superuser: bool,
}

/// Update user profile input
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub country: Option<String>,
}

/// Groups and permissions attached to a user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRoles {
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Kind of one-time/account token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Email confirmation link
    Confirmation,
    /// Password reset link
    PasswordReset,
    /// Bearer token for the API
    Session,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Confirmation => write!(f, "confirmation"),
            TokenKind::PasswordReset => write!(f, "password_reset"),
            TokenKind::Session => write!(f, "session"),
        }
    }
}

impl std::str::FromStr for TokenKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmation" => Ok(TokenKind::Confirmation),
            "password_reset" => Ok(TokenKind::PasswordReset),
            "session" => Ok(TokenKind::Session),
            _ => Err(format!("Invalid token kind: {}", s)),
        }
    }
}

impl TryFrom<String> for TokenKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Stored account token (only the SHA-256 of the secret is kept)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AccountToken {
    pub id: Uuid,
    pub user_id: UserId,
    #[sqlx(try_from = "String")]
    pub kind: TokenKind,
    pub token_hash: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AccountToken {
    /// Check if the token has expired
    pub fn is_expired(&self) -> bool {
        if let Some(expires_at) = self.expires_at {
            expires_at < Utc::now()
        } else {
            false
        }
    }
}

/// Create token input
#[derive(Debug, Clone)]
pub struct CreateToken {
    pub user_id: UserId,
    pub kind: TokenKind,
    pub token_hash: String,
    pub expires_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Recipients & messages
// ============================================================================

/// Recipient model
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Recipient {
    pub id: RecipientId,
    pub email: String,
    pub name: String,
    pub comment: Option<String>,
    pub photo: Option<String>,
    pub is_active: bool,
    pub owner_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Owned for Recipient {
    fn owner_id(&self) -> Option<UserId> {
        self.owner_id
    }
}

/// Create recipient input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRecipient {
    pub email: String,
    pub name: String,
    pub comment: Option<String>,
    pub photo: Option<String>,
    pub is_active: Option<bool>,
    pub owner_id: Option<UserId>,
}

/// Update recipient input
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateRecipient {
    pub email: Option<String>,
    pub name: Option<String>,
    pub comment: Option<String>,
    pub photo: Option<String>,
    pub is_active: Option<bool>,
}

/// Message model
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub subject: String,
    pub body: String,
    pub owner_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Owned for Message {
    fn owner_id(&self) -> Option<UserId> {
        self.owner_id
    }
}

/// Create message input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMessage {
    pub subject: String,
    pub body: String,
    pub owner_id: Option<UserId>,
}

/// Update message input
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateMessage {
    pub subject: Option<String>,
    pub body: Option<String>,
}

// ============================================================================
// Mailings
// ============================================================================

/// Mailing status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MailingStatus {
    Created,
    Launched,
    Completed,
    Stopped,
}

impl MailingStatus {
    /// Every status, in lifecycle order
    pub const ALL: [MailingStatus; 4] = [
        MailingStatus::Created,
        MailingStatus::Launched,
        MailingStatus::Completed,
        MailingStatus::Stopped,
    ];

    /// Transition table: created -> launched -> completed, anything -> stopped
    pub fn can_transition_to(self, next: MailingStatus) -> bool {
        matches!(
            (self, next),
            (MailingStatus::Created, MailingStatus::Launched)
                | (MailingStatus::Launched, MailingStatus::Completed)
                | (_, MailingStatus::Stopped)
        )
    }
}

impl std::fmt::Display for MailingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MailingStatus::Created => write!(f, "created"),
            MailingStatus::Launched => write!(f, "launched"),
            MailingStatus::Completed => write!(f, "completed"),
            MailingStatus::Stopped => write!(f, "stopped"),
        }
    }
}

impl std::str::FromStr for MailingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(MailingStatus::Created),
            "launched" => Ok(MailingStatus::Launched),
            "completed" => Ok(MailingStatus::Completed),
            "stopped" => Ok(MailingStatus::Stopped),
            _ => Err(format!("Invalid mailing status: {}", s)),
        }
    }
}

impl TryFrom<String> for MailingStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Mailing model
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Mailing {
    pub id: MailingId,
    pub first_sending: Option<DateTime<Utc>>,
    pub end_sending: Option<DateTime<Utc>>,
    #[sqlx(try_from = "String")]
    pub status: MailingStatus,
    pub message_id: MessageId,
    pub is_active: bool,
    pub owner_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Owned for Mailing {
    fn owner_id(&self) -> Option<UserId> {
        self.owner_id
    }
}

/// Create mailing input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMailing {
    pub message_id: MessageId,
    pub recipient_ids: Vec<RecipientId>,
    pub is_active: Option<bool>,
    pub owner_id: Option<UserId>,
}

/// Update mailing input. Status fields are only changed by launch/stop.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateMailing {
    pub message_id: Option<MessageId>,
    pub recipient_ids: Option<Vec<RecipientId>>,
    pub is_active: Option<bool>,
}

/// Outcome of one send attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    Success,
    Failure,
}

impl std::fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptStatus::Success => write!(f, "success"),
            AttemptStatus::Failure => write!(f, "failure"),
        }
    }
}

impl std::str::FromStr for AttemptStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(AttemptStatus::Success),
            "failure" => Ok(AttemptStatus::Failure),
            _ => Err(format!("Invalid attempt status: {}", s)),
        }
    }
}

impl TryFrom<String> for AttemptStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Mailing attempt model (append-only)
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct MailingAttempt {
    pub id: AttemptId,
    pub attempted_at: DateTime<Utc>,
    #[sqlx(try_from = "String")]
    pub status: AttemptStatus,
    pub server_response: String,
    pub mailing_id: MailingId,
    pub owner_id: Option<UserId>,
}

impl Owned for MailingAttempt {
    fn owner_id(&self) -> Option<UserId> {
        self.owner_id
    }
}

/// Create attempt input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAttempt {
    pub mailing_id: MailingId,
    pub status: AttemptStatus,
    pub server_response: String,
    pub owner_id: Option<UserId>,
}

/// Dashboard counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailingStats {
    pub total_mailings: i64,
    pub active_mailings: i64,
    pub unique_recipients: i64,
}
