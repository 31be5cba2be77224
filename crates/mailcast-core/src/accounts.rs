//! Accounts - registration, confirmation, password recovery, sessions and
//! user administration

use crate::mailing::{MailTransport, OutgoingMail};
use crate::policy::Actor;
use crate::validation;
use argon2::password_hash::rand_core::{OsRng, RngCore};
use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::{Argon2, PasswordHash, PasswordVerifier};
use chrono::{DateTime, Duration, Utc};
use mailcast_common::types::{Page, UserId, GROUP_MANAGERS, GROUP_USERS, PERM_STOP_MAILING};
use mailcast_common::{Config, Error, Result};
use mailcast_storage::models::{CreateToken, CreateUser, TokenKind, UpdateUser, User, UserRoles};
use mailcast_storage::repository::{TokenRepository, UserRepository};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info, warn};

const USER_EMAIL_MAX_LEN: usize = 254;
const NAME_MAX_LEN: usize = 50;
const PHONE_MAX_LEN: usize = 20;
const COUNTRY_MAX_LEN: usize = 50;

/// Random bytes in confirmation and reset tokens
const ONE_TIME_TOKEN_BYTES: usize = 16;
/// Random bytes in bearer tokens
const SESSION_TOKEN_BYTES: usize = 32;

/// Groups and permissions that can be assigned
const KNOWN_GROUPS: [&str; 2] = [GROUP_MANAGERS, GROUP_USERS];
const KNOWN_PERMISSIONS: [&str; 1] = [PERM_STOP_MAILING];

/// Account settings derived from configuration
#[derive(Debug, Clone)]
pub struct AccountSettings {
    pub base_url: String,
    pub from_address: String,
    pub session_ttl: Duration,
    pub reset_ttl: Duration,
}

impl AccountSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_url: config.server.base_url.trim_end_matches('/').to_string(),
            from_address: config.mail.from_address.clone(),
            session_ttl: Duration::hours(config.auth.token_ttl_hours),
            reset_ttl: Duration::minutes(config.auth.reset_token_ttl_minutes),
        }
    }
}

/// Registration form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub country: Option<String>,
}

/// Issued bearer token
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

/// User with groups and permissions
#[derive(Debug, Clone, Serialize)]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: User,
    pub roles: UserRoles,
}

/// Account service
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    tokens: Arc<dyn TokenRepository>,
    transport: Arc<dyn MailTransport>,
    settings: AccountSettings,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: Arc<dyn TokenRepository>,
        transport: Arc<dyn MailTransport>,
        settings: AccountSettings,
    ) -> Self {
        Self {
            users,
            tokens,
            transport,
            settings,
        }
    }

    /// Create an inactive account and mail a confirmation link
    pub async fn register(&self, form: Registration) -> Result<User> {
        let email = validation::email(&form.email, USER_EMAIL_MAX_LEN)?;
        validation::password(&form.password, &form.password_confirm)?;
        let first_name = validation::required_text("first_name", &form.first_name, NAME_MAX_LEN)?;
        let last_name = validation::required_text("last_name", &form.last_name, NAME_MAX_LEN)?;
        let phone_number =
            validation::optional_text("phone_number", form.phone_number.as_deref(), PHONE_MAX_LEN)?;
        let country = validation::optional_text("country", form.country.as_deref(), COUNTRY_MAX_LEN)?;

        if self.users.get_by_email(&email).await?.is_some() {
            return Err(Error::Validation(
                "User with this email already exists".to_string(),
            ));
        }

        let user = self
            .users
            .create(
                CreateUser {
                    email,
                    first_name,
                    last_name,
                    phone_number,
                    country,
                    is_active: false,
                    is_superuser: false,
                },
                hash_password(&form.password)?,
            )
            .await?;

        let token = generate_token(ONE_TIME_TOKEN_BYTES);
        self.tokens
            .create(CreateToken {
                user_id: user.id,
                kind: TokenKind::Confirmation,
                token_hash: hash_token(&token),
                expires_at: None,
            })
            .await?;

        let link = format!("{}/api/v1/accounts/confirm/{}", self.settings.base_url, token);
        let mail = self.mail_to(
            &user.email,
            "Confirm your email",
            format!("Hello {}!\n\nFollow this link to confirm your email:\n{}\n", user.first_name, link),
        );
        // The account exists either way; a failed delivery is only logged
        match self.transport.send(&mail).await {
            Ok(response) if response.accepted => {
                debug!(user_id = %user.id, "Confirmation email sent")
            }
            Ok(response) => {
                warn!(user_id = %user.id, response = %response.response, "Confirmation email rejected")
            }
            Err(e) => warn!(user_id = %user.id, error = %e, "Confirmation email failed"),
        }

        info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Activate the account behind a confirmation token
    pub async fn confirm_email(&self, token: &str) -> Result<User> {
        let stored = self
            .tokens
            .find(&hash_token(token), TokenKind::Confirmation)
            .await?
            .ok_or_else(|| Error::NotFound("Confirmation link".to_string()))?;

        self.users.confirm_email(stored.user_id).await?;
        self.users.add_group(stored.user_id, GROUP_USERS).await?;
        self.tokens.delete(stored.id).await?;

        let user = self.fetch(stored.user_id).await?;
        info!(user_id = %user.id, "Email confirmed");
        Ok(user)
    }

    /// Mail a one-time password reset token
    pub async fn request_password_reset(&self, email: &str) -> Result<()> {
        let email = validation::email(email, USER_EMAIL_MAX_LEN)?;
        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or_else(|| Error::Validation("No account uses this email".to_string()))?;

        self.tokens
            .delete_for_user(user.id, TokenKind::PasswordReset)
            .await?;

        let token = generate_token(ONE_TIME_TOKEN_BYTES);
        let expires_at = Utc::now() + self.settings.reset_ttl;
        self.tokens
            .create(CreateToken {
                user_id: user.id,
                kind: TokenKind::PasswordReset,
                token_hash: hash_token(&token),
                expires_at: Some(expires_at),
            })
            .await?;

        let mail = self.mail_to(
            &user.email,
            "Password recovery",
            format!(
                "Hello {}!\n\nUse this code to set a new password at {}/api/v1/accounts/password-reset:\n{}\n\nThe code expires at {}.\n",
                user.first_name,
                self.settings.base_url,
                token,
                expires_at.format("%Y-%m-%d %H:%M UTC")
            ),
        );
        let response = self.transport.send(&mail).await?;
        if !response.accepted {
            return Err(Error::Smtp(response.response));
        }

        info!(user_id = %user.id, "Password reset requested");
        Ok(())
    }

    /// Consume a reset token and set a new password. Open sessions are revoked.
    pub async fn reset_password(&self, token: &str, password: &str, confirmation: &str) -> Result<()> {
        validation::password(password, confirmation)?;

        let stored = self
            .tokens
            .find(&hash_token(token), TokenKind::PasswordReset)
            .await?
            .ok_or_else(|| Error::Validation("Invalid or expired reset token".to_string()))?;
        if stored.is_expired() {
            self.tokens.delete(stored.id).await?;
            return Err(Error::Validation(
                "Invalid or expired reset token".to_string(),
            ));
        }

        self.users
            .update_password(stored.user_id, hash_password(password)?)
            .await?;
        self.tokens.delete(stored.id).await?;
        self.tokens
            .delete_for_user(stored.user_id, TokenKind::Session)
            .await?;

        info!(user_id = %stored.user_id, "Password reset");
        Ok(())
    }

    /// Issue a bearer token for an active account
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let invalid = || Error::Auth("Invalid email or password".to_string());

        let email = validation::email(email, USER_EMAIL_MAX_LEN).map_err(|_| invalid())?;
        let user = self.users.get_by_email(&email).await?.ok_or_else(invalid)?;
        if !verify_password(password, &user.password_hash)? {
            debug!(user_id = %user.id, "Invalid password");
            return Err(invalid());
        }
        if !user.is_active {
            return Err(Error::Auth("Account is not active".to_string()));
        }

        let token = generate_token(SESSION_TOKEN_BYTES);
        let expires_at = Utc::now() + self.settings.session_ttl;
        self.tokens
            .create(CreateToken {
                user_id: user.id,
                kind: TokenKind::Session,
                token_hash: hash_token(&token),
                expires_at: Some(expires_at),
            })
            .await?;

        info!(user_id = %user.id, "User logged in");
        Ok(Session {
            token,
            expires_at,
            user,
        })
    }

    /// Revoke a bearer token
    pub async fn logout(&self, token: &str) -> Result<()> {
        if let Some(stored) = self.tokens.find(&hash_token(token), TokenKind::Session).await? {
            self.tokens.delete(stored.id).await?;
            info!(user_id = %stored.user_id, "User logged out");
        }
        Ok(())
    }

    /// Resolve a bearer token to the acting user
    pub async fn authenticate(&self, token: &str) -> Result<Actor> {
        let stored = self
            .tokens
            .find(&hash_token(token), TokenKind::Session)
            .await?
            .ok_or_else(|| Error::Auth("Invalid token".to_string()))?;
        if stored.is_expired() {
            self.tokens.delete(stored.id).await?;
            return Err(Error::Auth("Token expired".to_string()));
        }

        let user = self
            .users
            .get(stored.user_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| Error::Auth("Account is disabled".to_string()))?;
        let roles = self.users.roles(user.id).await?;

        Ok(Actor::from_roles(user.id, user.is_superuser, roles))
    }

    /// Create an active superuser unless the email is already taken
    pub async fn ensure_superuser(&self, email: &str, password: &str) -> Result<User> {
        let email = validation::email(email, USER_EMAIL_MAX_LEN)?;
        if let Some(existing) = self.users.get_by_email(&email).await? {
            return Ok(existing);
        }
        validation::password(password, password)?;

        let user = self
            .users
            .create(
                CreateUser {
                    email,
                    first_name: "Admin".to_string(),
                    last_name: "Admin".to_string(),
                    phone_number: None,
                    country: None,
                    is_active: true,
                    is_superuser: true,
                },
                hash_password(password)?,
            )
            .await?;
        self.users.confirm_email(user.id).await?;

        info!(user_id = %user.id, email = %user.email, "Superuser created");
        self.fetch(user.id).await
    }

    // ------------------------------------------------------------------
    // Administration
    // ------------------------------------------------------------------

    pub async fn list_users(&self, actor: &Actor, page: Page) -> Result<Vec<User>> {
        require(actor.sees_all(), "Only managers can list users")?;
        self.users.list(page).await
    }

    pub async fn get_user(&self, actor: &Actor, id: UserId) -> Result<UserDetail> {
        require(actor.is_superuser, "Only superusers can view accounts")?;
        let user = self.fetch(id).await?;
        let roles = self.users.roles(id).await?;
        Ok(UserDetail { user, roles })
    }

    pub async fn update_user(&self, actor: &Actor, id: UserId, input: UpdateUser) -> Result<User> {
        require(actor.is_superuser, "Only superusers can edit accounts")?;

        let email = match input.email.as_deref() {
            Some(email) => {
                let email = validation::email(email, USER_EMAIL_MAX_LEN)?;
                if let Some(other) = self.users.get_by_email(&email).await? {
                    if other.id != id {
                        return Err(Error::Validation(
                            "User with this email already exists".to_string(),
                        ));
                    }
                }
                Some(email)
            }
            None => None,
        };
        let input = UpdateUser {
            email,
            first_name: input
                .first_name
                .as_deref()
                .map(|v| validation::required_text("first_name", v, NAME_MAX_LEN))
                .transpose()?,
            last_name: input
                .last_name
                .as_deref()
                .map(|v| validation::required_text("last_name", v, NAME_MAX_LEN))
                .transpose()?,
            phone_number: validation::optional_text(
                "phone_number",
                input.phone_number.as_deref(),
                PHONE_MAX_LEN,
            )?,
            country: validation::optional_text("country", input.country.as_deref(), COUNTRY_MAX_LEN)?,
        };

        let user = self
            .users
            .update(id, input)
            .await?
            .ok_or_else(|| Error::NotFound(format!("User {}", id)))?;
        info!(user_id = %id, "User updated");
        Ok(user)
    }

    /// Block or unblock an account. Blocking revokes its sessions.
    pub async fn set_active(&self, actor: &Actor, id: UserId, active: bool) -> Result<User> {
        require(actor.sees_all(), "Only managers can block users")?;
        if actor.user_id == id && !active {
            return Err(Error::Validation("You cannot block yourself".to_string()));
        }

        let target = self.fetch(id).await?;
        if target.is_superuser && !actor.is_superuser {
            return Err(Error::PermissionDenied(
                "Only superusers can block superusers".to_string(),
            ));
        }

        self.users.set_active(id, active).await?;
        if !active {
            self.tokens.delete_for_user(id, TokenKind::Session).await?;
        }

        info!(user_id = %id, active, by = %actor.user_id, "User activity changed");
        self.fetch(id).await
    }

    /// Replace a user's groups and permissions
    pub async fn set_roles(&self, actor: &Actor, id: UserId, roles: UserRoles) -> Result<UserDetail> {
        require(actor.is_superuser, "Only superusers can assign roles")?;

        if let Some(group) = roles.groups.iter().find(|g| !KNOWN_GROUPS.contains(&g.as_str())) {
            return Err(Error::Validation(format!("Unknown group: {}", group)));
        }
        if let Some(permission) = roles
            .permissions
            .iter()
            .find(|p| !KNOWN_PERMISSIONS.contains(&p.as_str()))
        {
            return Err(Error::Validation(format!("Unknown permission: {}", permission)));
        }

        let user = self.fetch(id).await?;
        self.users.set_roles(id, &roles).await?;

        info!(user_id = %id, groups = ?roles.groups, permissions = ?roles.permissions, "Roles updated");
        let roles = self.users.roles(id).await?;
        Ok(UserDetail { user, roles })
    }

    async fn fetch(&self, id: UserId) -> Result<User> {
        self.users
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("User {}", id)))
    }

    fn mail_to(&self, to: &str, subject: &str, body: String) -> OutgoingMail {
        OutgoingMail {
            from: self.settings.from_address.clone(),
            to: vec![to.to_string()],
            subject: subject.to_string(),
            body,
        }
    }
}

fn require(allowed: bool, message: &str) -> Result<()> {
    if allowed {
        Ok(())
    } else {
        Err(Error::PermissionDenied(message.to_string()))
    }
}

/// Hash a password with Argon2 and a random salt
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::Internal(format!("Failed to hash password: {}", e)))
}

/// Verify a password against an Argon2 hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| Error::Internal(format!("Invalid password hash format: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(Error::Internal(format!("Password verification error: {}", e))),
    }
}

/// Random hex token
fn generate_token(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}

/// SHA-256 hex digest of a token; only digests are stored
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailing::MemoryTransport;
    use mailcast_storage::MemoryStore;
    use pretty_assertions::assert_eq;

    fn service(transport: MemoryTransport) -> AccountService {
        let store = MemoryStore::new();
        AccountService::new(
            Arc::new(store.clone()),
            Arc::new(store),
            Arc::new(transport),
            AccountSettings {
                base_url: "http://mail.test".to_string(),
                from_address: "robot@mail.test".to_string(),
                session_ttl: Duration::hours(1),
                reset_ttl: Duration::minutes(10),
            },
        )
    }

    fn registration(email: &str) -> Registration {
        Registration {
            email: email.to_string(),
            password: "correct horse".to_string(),
            password_confirm: "correct horse".to_string(),
            first_name: "Ann".to_string(),
            last_name: "Lee".to_string(),
            phone_number: None,
            country: Some("NZ".to_string()),
        }
    }

    /// Pull the token out of the last mail body
    async fn last_token(transport: &MemoryTransport) -> String {
        let sent = transport.sent().await;
        let body = &sent.last().unwrap().body;
        body.split(|c: char| !c.is_ascii_hexdigit())
            .find(|part| part.len() == ONE_TIME_TOKEN_BYTES * 2)
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("secret password").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("secret password", &hash).unwrap());
        assert!(!verify_password("wrong password", &hash).unwrap());
    }

    #[test]
    fn test_token_hashing() {
        let token = generate_token(ONE_TIME_TOKEN_BYTES);
        assert_eq!(token.len(), 32);
        assert_eq!(hash_token(&token).len(), 64);
        assert_ne!(generate_token(ONE_TIME_TOKEN_BYTES), token);
    }

    #[tokio::test]
    async fn test_registration_flow() {
        let transport = MemoryTransport::new();
        let accounts = service(transport.clone());

        let user = accounts.register(registration("ann@example.com")).await.unwrap();
        assert!(!user.is_active);

        let err = accounts.login("ann@example.com", "correct horse").await.unwrap_err();
        assert_eq!(err.code(), "UNAUTHORIZED");

        let sent = transport.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, vec!["ann@example.com".to_string()]);
        assert!(sent[0].body.contains("http://mail.test/api/v1/accounts/confirm/"));

        let token = last_token(&transport).await;
        let confirmed = accounts.confirm_email(&token).await.unwrap();
        assert!(confirmed.is_active);
        assert!(confirmed.email_confirmed);

        // Tokens are single use
        assert_eq!(accounts.confirm_email(&token).await.unwrap_err().status_code(), 404);

        let session = accounts.login("ann@example.com", "correct horse").await.unwrap();
        let actor = accounts.authenticate(&session.token).await.unwrap();
        assert_eq!(actor.user_id, user.id);
        assert_eq!(actor.groups, vec![GROUP_USERS.to_string()]);

        accounts.logout(&session.token).await.unwrap();
        assert!(accounts.authenticate(&session.token).await.is_err());
    }

    #[tokio::test]
    async fn test_duplicate_registration() {
        let accounts = service(MemoryTransport::new());
        accounts.register(registration("ann@example.com")).await.unwrap();
        let err = accounts.register(registration("ann@example.com")).await.unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_password_mismatch() {
        let accounts = service(MemoryTransport::new());
        let mut form = registration("ann@example.com");
        form.password_confirm = "something else".to_string();
        assert!(accounts.register(form).await.is_err());
    }

    #[tokio::test]
    async fn test_password_reset() {
        let transport = MemoryTransport::new();
        let accounts = service(transport.clone());
        let admin = accounts.ensure_superuser("admin@example.com", "initial pass").await.unwrap();
        let session = accounts.login("admin@example.com", "initial pass").await.unwrap();

        assert!(accounts.request_password_reset("nobody@example.com").await.is_err());

        accounts.request_password_reset("admin@example.com").await.unwrap();
        let token = last_token(&transport).await;

        assert!(accounts.reset_password(&token, "short", "short").await.is_err());
        accounts
            .reset_password(&token, "brand new pass", "brand new pass")
            .await
            .unwrap();

        // Old sessions and the used token are gone
        assert!(accounts.authenticate(&session.token).await.is_err());
        assert!(accounts
            .reset_password(&token, "another pass!", "another pass!")
            .await
            .is_err());

        assert!(accounts.login("admin@example.com", "initial pass").await.is_err());
        let session = accounts.login("admin@example.com", "brand new pass").await.unwrap();
        assert_eq!(session.user.id, admin.id);
    }

    #[tokio::test]
    async fn test_administration() {
        let accounts = service(MemoryTransport::new());
        let admin = accounts.ensure_superuser("admin@example.com", "admin pass").await.unwrap();
        let admin = Actor::superuser(admin.id);

        let user = accounts.register(registration("ann@example.com")).await.unwrap();
        let ann = Actor::new(user.id).with_group(GROUP_USERS);

        assert_eq!(accounts.list_users(&ann, Page::default()).await.unwrap_err().status_code(), 403);
        assert_eq!(accounts.list_users(&admin, Page::default()).await.unwrap().len(), 2);

        let detail = accounts
            .set_roles(
                &admin,
                user.id,
                UserRoles {
                    groups: vec![GROUP_MANAGERS.to_string()],
                    permissions: vec![PERM_STOP_MAILING.to_string()],
                },
            )
            .await
            .unwrap();
        assert_eq!(detail.roles.groups, vec![GROUP_MANAGERS.to_string()]);

        let unknown = UserRoles {
            groups: vec!["admins".to_string()],
            permissions: vec![],
        };
        assert!(accounts.set_roles(&admin, user.id, unknown).await.is_err());

        let blocked = accounts.set_active(&admin, user.id, false).await.unwrap();
        assert!(!blocked.is_active);
        assert!(accounts.set_active(&admin, admin.user_id, false).await.is_err());
    }
}
