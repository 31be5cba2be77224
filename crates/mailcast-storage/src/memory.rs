//! In-memory store
//!
//! Implements every repository trait over a single lock-protected state, with
//! the same uniqueness and cascade rules as the PostgreSQL schema. Used by the
//! test suites and for running the API without a database.

use crate::models::*;
use crate::repository::{
    AttemptRepository, MailingRepository, MessageRepository, RecipientRepository,
    TokenRepository, UserRepository,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mailcast_common::types::{MailingId, MessageId, Page, RecipientId, UserId};
use mailcast_common::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct State {
    users: Vec<User>,
    roles: HashMap<UserId, UserRoles>,
    tokens: Vec<AccountToken>,
    recipients: Vec<Recipient>,
    messages: Vec<Message>,
    mailings: Vec<Mailing>,
    mailing_recipients: HashMap<MailingId, Vec<RecipientId>>,
    attempts: Vec<MailingAttempt>,
}

impl State {
    fn remove_mailing(&mut self, id: MailingId) -> bool {
        let before = self.mailings.len();
        self.mailings.retain(|m| m.id != id);
        self.mailing_recipients.remove(&id);
        self.attempts.retain(|a| a.mailing_id != id);
        self.mailings.len() != before
    }

    fn check_recipients_exist(&self, ids: &[RecipientId]) -> Result<()> {
        if ids.iter().all(|id| self.recipients.iter().any(|r| r.id == *id)) {
            Ok(())
        } else {
            Err(Error::Validation(
                "Mailing recipient references a missing record".to_string(),
            ))
        }
    }

    fn mailing_mut(&mut self, id: MailingId) -> Option<&mut Mailing> {
        self.mailings.iter_mut().find(|m| m.id == id)
    }
}

fn dedup(ids: &[RecipientId]) -> Vec<RecipientId> {
    let mut out: Vec<RecipientId> = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(id) {
            out.push(*id);
        }
    }
    out
}

fn sort_recipients(rows: &mut [Recipient]) {
    rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
}

/// Shared in-memory store
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, input: CreateUser, password_hash: String) -> Result<User> {
        let mut state = self.state.write().await;
        if state.users.iter().any(|u| u.email == input.email) {
            return Err(Error::Validation(
                "User with this email already exists".to_string(),
            ));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::now_v7(),
            email: input.email,
            password_hash,
            first_name: input.first_name,
            last_name: input.last_name,
            phone_number: input.phone_number,
            country: input.country.unwrap_or_default(),
            is_active: input.is_active,
            is_superuser: input.is_superuser,
            email_confirmed: false,
            created_at: now,
            updated_at: now,
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn get(&self, id: UserId) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|u| u.email == email).cloned())
    }

    async fn list(&self, page: Page) -> Result<Vec<User>> {
        let state = self.state.read().await;
        let mut users = state.users.clone();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users
            .into_iter()
            .skip(page.offset.max(0) as usize)
            .take(page.limit.max(0) as usize)
            .collect())
    }

    async fn update(&self, id: UserId, input: UpdateUser) -> Result<Option<User>> {
        let mut state = self.state.write().await;
        if let Some(email) = &input.email {
            if state.users.iter().any(|u| u.id != id && &u.email == email) {
                return Err(Error::Validation(
                    "User with this email already exists".to_string(),
                ));
            }
        }

        let Some(user) = state.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(email) = input.email {
            user.email = email;
        }
        if let Some(first_name) = input.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = input.last_name {
            user.last_name = last_name;
        }
        if input.phone_number.is_some() {
            user.phone_number = input.phone_number;
        }
        if let Some(country) = input.country {
            user.country = country;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn update_password(&self, id: UserId, password_hash: String) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(user) = state.users.iter_mut().find(|u| u.id == id) {
            user.password_hash = password_hash;
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_active(&self, id: UserId, active: bool) -> Result<bool> {
        let mut state = self.state.write().await;
        match state.users.iter_mut().find(|u| u.id == id) {
            Some(user) => {
                user.is_active = active;
                user.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn confirm_email(&self, id: UserId) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(user) = state.users.iter_mut().find(|u| u.id == id) {
            user.is_active = true;
            user.email_confirmed = true;
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn roles(&self, id: UserId) -> Result<UserRoles> {
        let state = self.state.read().await;
        Ok(state.roles.get(&id).cloned().unwrap_or_default())
    }

    async fn set_roles(&self, id: UserId, roles: &UserRoles) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.users.iter().any(|u| u.id == id) {
            return Err(Error::Validation(
                "User references a missing record".to_string(),
            ));
        }

        let mut roles = roles.clone();
        roles.groups.sort();
        roles.groups.dedup();
        roles.permissions.sort();
        roles.permissions.dedup();
        state.roles.insert(id, roles);
        Ok(())
    }

    async fn add_group(&self, id: UserId, group: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.users.iter().any(|u| u.id == id) {
            return Err(Error::Validation(
                "User references a missing record".to_string(),
            ));
        }

        let roles = state.roles.entry(id).or_default();
        if !roles.groups.iter().any(|g| g == group) {
            roles.groups.push(group.to_string());
            roles.groups.sort();
        }
        Ok(())
    }
}

#[async_trait]
impl TokenRepository for MemoryStore {
    async fn create(&self, input: CreateToken) -> Result<AccountToken> {
        let mut state = self.state.write().await;
        if state.tokens.iter().any(|t| t.token_hash == input.token_hash) {
            return Err(Error::Validation("Token already exists".to_string()));
        }

        let token = AccountToken {
            id: Uuid::now_v7(),
            user_id: input.user_id,
            kind: input.kind,
            token_hash: input.token_hash,
            expires_at: input.expires_at,
            created_at: Utc::now(),
        };
        state.tokens.push(token.clone());
        Ok(token)
    }

    async fn find(&self, token_hash: &str, kind: TokenKind) -> Result<Option<AccountToken>> {
        let state = self.state.read().await;
        Ok(state
            .tokens
            .iter()
            .find(|t| t.token_hash == token_hash && t.kind == kind)
            .cloned())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        let before = state.tokens.len();
        state.tokens.retain(|t| t.id != id);
        Ok(state.tokens.len() != before)
    }

    async fn delete_for_user(&self, user_id: UserId, kind: TokenKind) -> Result<u64> {
        let mut state = self.state.write().await;
        let before = state.tokens.len();
        state
            .tokens
            .retain(|t| !(t.user_id == user_id && t.kind == kind));
        Ok((before - state.tokens.len()) as u64)
    }
}

#[async_trait]
impl RecipientRepository for MemoryStore {
    async fn create(&self, input: CreateRecipient) -> Result<Recipient> {
        let mut state = self.state.write().await;
        if state.recipients.iter().any(|r| r.email == input.email) {
            return Err(Error::Validation(
                "Recipient with this email already exists".to_string(),
            ));
        }

        let now = Utc::now();
        let recipient = Recipient {
            id: Uuid::now_v7(),
            email: input.email,
            name: input.name,
            comment: input.comment,
            photo: input.photo,
            is_active: input.is_active.unwrap_or(true),
            owner_id: input.owner_id,
            created_at: now,
            updated_at: now,
        };
        state.recipients.push(recipient.clone());
        Ok(recipient)
    }

    async fn get(&self, id: RecipientId) -> Result<Option<Recipient>> {
        let state = self.state.read().await;
        Ok(state.recipients.iter().find(|r| r.id == id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Recipient>> {
        let state = self.state.read().await;
        Ok(state.recipients.iter().find(|r| r.email == email).cloned())
    }

    async fn get_many(&self, ids: &[RecipientId]) -> Result<Vec<Recipient>> {
        let state = self.state.read().await;
        let mut rows: Vec<Recipient> = state
            .recipients
            .iter()
            .filter(|r| ids.contains(&r.id))
            .cloned()
            .collect();
        sort_recipients(&mut rows);
        Ok(rows)
    }

    async fn list(&self, owner: Option<UserId>) -> Result<Vec<Recipient>> {
        let state = self.state.read().await;
        let mut rows: Vec<Recipient> = state
            .recipients
            .iter()
            .filter(|r| owner.is_none() || r.owner_id == owner)
            .cloned()
            .collect();
        sort_recipients(&mut rows);
        Ok(rows)
    }

    async fn update(&self, id: RecipientId, input: UpdateRecipient) -> Result<Option<Recipient>> {
        let mut state = self.state.write().await;
        if let Some(email) = &input.email {
            if state.recipients.iter().any(|r| r.id != id && &r.email == email) {
                return Err(Error::Validation(
                    "Recipient with this email already exists".to_string(),
                ));
            }
        }

        let Some(recipient) = state.recipients.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        if let Some(email) = input.email {
            recipient.email = email;
        }
        if let Some(name) = input.name {
            recipient.name = name;
        }
        if input.comment.is_some() {
            recipient.comment = input.comment;
        }
        if input.photo.is_some() {
            recipient.photo = input.photo;
        }
        if let Some(is_active) = input.is_active {
            recipient.is_active = is_active;
        }
        recipient.updated_at = Utc::now();
        Ok(Some(recipient.clone()))
    }

    async fn delete(&self, id: RecipientId) -> Result<bool> {
        let mut state = self.state.write().await;
        let before = state.recipients.len();
        state.recipients.retain(|r| r.id != id);
        for members in state.mailing_recipients.values_mut() {
            members.retain(|r| *r != id);
        }
        Ok(state.recipients.len() != before)
    }

    async fn count_distinct_emails(&self) -> Result<i64> {
        let state = self.state.read().await;
        let mut emails: Vec<&str> = state.recipients.iter().map(|r| r.email.as_str()).collect();
        emails.sort_unstable();
        emails.dedup();
        Ok(emails.len() as i64)
    }
}

#[async_trait]
impl MessageRepository for MemoryStore {
    async fn create(&self, input: CreateMessage) -> Result<Message> {
        let mut state = self.state.write().await;
        let now = Utc::now();
        let message = Message {
            id: Uuid::now_v7(),
            subject: input.subject,
            body: input.body,
            owner_id: input.owner_id,
            created_at: now,
            updated_at: now,
        };
        state.messages.push(message.clone());
        Ok(message)
    }

    async fn get(&self, id: MessageId) -> Result<Option<Message>> {
        let state = self.state.read().await;
        Ok(state.messages.iter().find(|m| m.id == id).cloned())
    }

    async fn list(&self, owner: Option<UserId>) -> Result<Vec<Message>> {
        let state = self.state.read().await;
        let mut rows: Vec<Message> = state
            .messages
            .iter()
            .filter(|m| owner.is_none() || m.owner_id == owner)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.subject.cmp(&b.subject).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn update(&self, id: MessageId, input: UpdateMessage) -> Result<Option<Message>> {
        let mut state = self.state.write().await;
        let Some(message) = state.messages.iter_mut().find(|m| m.id == id) else {
            return Ok(None);
        };
        if let Some(subject) = input.subject {
            message.subject = subject;
        }
        if let Some(body) = input.body {
            message.body = body;
        }
        message.updated_at = Utc::now();
        Ok(Some(message.clone()))
    }

    async fn delete(&self, id: MessageId) -> Result<bool> {
        let mut state = self.state.write().await;
        let before = state.messages.len();
        state.messages.retain(|m| m.id != id);
        if state.messages.len() == before {
            return Ok(false);
        }

        let orphaned: Vec<MailingId> = state
            .mailings
            .iter()
            .filter(|m| m.message_id == id)
            .map(|m| m.id)
            .collect();
        for mailing_id in orphaned {
            state.remove_mailing(mailing_id);
        }
        Ok(true)
    }
}

#[async_trait]
impl MailingRepository for MemoryStore {
    async fn create(&self, input: CreateMailing) -> Result<Mailing> {
        let mut state = self.state.write().await;
        if !state.messages.iter().any(|m| m.id == input.message_id) {
            return Err(Error::Validation(
                "Mailing references a missing record".to_string(),
            ));
        }
        state.check_recipients_exist(&input.recipient_ids)?;

        let now = Utc::now();
        let mailing = Mailing {
            id: Uuid::now_v7(),
            first_sending: None,
            end_sending: None,
            status: MailingStatus::Created,
            message_id: input.message_id,
            is_active: input.is_active.unwrap_or(true),
            owner_id: input.owner_id,
            created_at: now,
            updated_at: now,
        };
        state
            .mailing_recipients
            .insert(mailing.id, dedup(&input.recipient_ids));
        state.mailings.push(mailing.clone());
        Ok(mailing)
    }

    async fn get(&self, id: MailingId) -> Result<Option<Mailing>> {
        let state = self.state.read().await;
        Ok(state.mailings.iter().find(|m| m.id == id).cloned())
    }

    async fn list(&self, owner: Option<UserId>) -> Result<Vec<Mailing>> {
        let state = self.state.read().await;
        let mut rows: Vec<Mailing> = state
            .mailings
            .iter()
            .filter(|m| owner.is_none() || m.owner_id == owner)
            .cloned()
            .collect();
        // NULLS LAST on first_sending
        rows.sort_by(|a, b| {
            (a.first_sending.is_none(), a.first_sending, a.created_at, a.id).cmp(&(
                b.first_sending.is_none(),
                b.first_sending,
                b.created_at,
                b.id,
            ))
        });
        Ok(rows)
    }

    async fn update(&self, id: MailingId, input: UpdateMailing) -> Result<Option<Mailing>> {
        let mut state = self.state.write().await;
        if let Some(message_id) = input.message_id {
            if !state.messages.iter().any(|m| m.id == message_id) {
                return Err(Error::Validation(
                    "Mailing references a missing record".to_string(),
                ));
            }
        }
        if let Some(ids) = &input.recipient_ids {
            state.check_recipients_exist(ids)?;
        }

        let Some(mailing) = state.mailing_mut(id) else {
            return Ok(None);
        };
        if let Some(message_id) = input.message_id {
            mailing.message_id = message_id;
        }
        if let Some(is_active) = input.is_active {
            mailing.is_active = is_active;
        }
        mailing.updated_at = Utc::now();
        let mailing = mailing.clone();

        if let Some(ids) = input.recipient_ids {
            state.mailing_recipients.insert(id, dedup(&ids));
        }
        Ok(Some(mailing))
    }

    async fn delete(&self, id: MailingId) -> Result<bool> {
        let mut state = self.state.write().await;
        Ok(state.remove_mailing(id))
    }

    async fn recipients(&self, id: MailingId) -> Result<Vec<Recipient>> {
        let state = self.state.read().await;
        let members = state.mailing_recipients.get(&id).cloned().unwrap_or_default();
        let mut rows: Vec<Recipient> = state
            .recipients
            .iter()
            .filter(|r| members.contains(&r.id))
            .cloned()
            .collect();
        sort_recipients(&mut rows);
        Ok(rows)
    }

    async fn mark_launched(&self, id: MailingId, at: DateTime<Utc>) -> Result<Option<Mailing>> {
        let mut state = self.state.write().await;
        match state.mailing_mut(id) {
            Some(mailing) if mailing.status == MailingStatus::Created => {
                mailing.status = MailingStatus::Launched;
                mailing.first_sending = Some(at);
                mailing.updated_at = Utc::now();
                Ok(Some(mailing.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn mark_completed(&self, id: MailingId, at: DateTime<Utc>) -> Result<Option<Mailing>> {
        let mut state = self.state.write().await;
        match state.mailing_mut(id) {
            Some(mailing) if mailing.status == MailingStatus::Launched => {
                mailing.status = MailingStatus::Completed;
                mailing.end_sending = Some(at);
                mailing.updated_at = Utc::now();
                Ok(Some(mailing.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn set_status(&self, id: MailingId, status: MailingStatus) -> Result<Option<Mailing>> {
        let mut state = self.state.write().await;
        Ok(state.mailing_mut(id).map(|mailing| {
            mailing.status = status;
            mailing.updated_at = Utc::now();
            mailing.clone()
        }))
    }

    async fn count(&self, status: Option<MailingStatus>) -> Result<i64> {
        let state = self.state.read().await;
        Ok(state
            .mailings
            .iter()
            .filter(|m| status.map_or(true, |s| m.status == s))
            .count() as i64)
    }
}

#[async_trait]
impl AttemptRepository for MemoryStore {
    async fn record(&self, input: CreateAttempt) -> Result<MailingAttempt> {
        let mut state = self.state.write().await;
        if !state.mailings.iter().any(|m| m.id == input.mailing_id) {
            return Err(Error::Validation(
                "Attempt references a missing record".to_string(),
            ));
        }

        let attempt = MailingAttempt {
            id: Uuid::now_v7(),
            attempted_at: Utc::now(),
            status: input.status,
            server_response: input.server_response,
            mailing_id: input.mailing_id,
            owner_id: input.owner_id,
        };
        state.attempts.push(attempt.clone());
        Ok(attempt)
    }

    async fn list(&self, owner: Option<UserId>) -> Result<Vec<MailingAttempt>> {
        let state = self.state.read().await;
        let mut rows: Vec<MailingAttempt> = state
            .attempts
            .iter()
            .filter(|a| owner.is_none() || a.owner_id == owner)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.attempted_at
                .cmp(&b.attempted_at)
                .then_with(|| a.status.to_string().cmp(&b.status.to_string()))
        });
        Ok(rows)
    }

    async fn list_for_mailing(&self, mailing_id: MailingId) -> Result<Vec<MailingAttempt>> {
        let state = self.state.read().await;
        Ok(state
            .attempts
            .iter()
            .filter(|a| a.mailing_id == mailing_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn recipient(email: &str, name: &str, owner: Option<UserId>) -> CreateRecipient {
        CreateRecipient {
            email: email.to_string(),
            name: name.to_string(),
            comment: None,
            photo: None,
            is_active: None,
            owner_id: owner,
        }
    }

    async fn seed_mailing(store: &MemoryStore) -> (Message, Recipient, Mailing) {
        let owner = Some(Uuid::now_v7());
        let message = MessageRepository::create(
            store,
            CreateMessage {
                subject: "Hello".to_string(),
                body: "World".to_string(),
                owner_id: owner,
            },
        )
        .await
        .unwrap();
        let recipient = RecipientRepository::create(store, recipient("r@example.com", "R", owner))
            .await
            .unwrap();
        let mailing = MailingRepository::create(
            store,
            CreateMailing {
                message_id: message.id,
                recipient_ids: vec![recipient.id, recipient.id],
                is_active: None,
                owner_id: owner,
            },
        )
        .await
        .unwrap();
        (message, recipient, mailing)
    }

    #[tokio::test]
    async fn test_recipient_email_is_unique() {
        let store = MemoryStore::new();
        let repo: &dyn RecipientRepository = &store;

        repo.create(recipient("a@example.com", "A", None)).await.unwrap();
        let err = repo
            .create(recipient("a@example.com", "Other", None))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert_eq!(repo.list(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_recipients_filtered_by_owner_and_ordered_by_name() {
        let store = MemoryStore::new();
        let repo: &dyn RecipientRepository = &store;
        let alice = Uuid::now_v7();
        let bob = Uuid::now_v7();

        repo.create(recipient("z@example.com", "Zed", Some(alice))).await.unwrap();
        repo.create(recipient("a@example.com", "Amy", Some(alice))).await.unwrap();
        repo.create(recipient("b@example.com", "Bea", Some(bob))).await.unwrap();

        let names: Vec<String> = repo
            .list(Some(alice))
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["Amy".to_string(), "Zed".to_string()]);
        assert_eq!(repo.list(None).await.unwrap().len(), 3);
        assert_eq!(repo.count_distinct_emails().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_mailing_recipient_set_is_deduplicated() {
        let store = MemoryStore::new();
        let (_, recipient, mailing) = seed_mailing(&store).await;

        let members = MailingRepository::recipients(&store, mailing.id).await.unwrap();
        assert_eq!(members, vec![recipient]);
        assert_eq!(mailing.status, MailingStatus::Created);
        assert!(mailing.first_sending.is_none());
    }

    #[tokio::test]
    async fn test_mark_launched_is_conditional() {
        let store = MemoryStore::new();
        let (_, _, mailing) = seed_mailing(&store).await;
        let repo: &dyn MailingRepository = &store;

        let launched = repo.mark_launched(mailing.id, Utc::now()).await.unwrap().unwrap();
        assert_eq!(launched.status, MailingStatus::Launched);
        assert!(launched.first_sending.is_some());

        assert!(repo.mark_launched(mailing.id, Utc::now()).await.unwrap().is_none());

        let completed = repo.mark_completed(mailing.id, Utc::now()).await.unwrap().unwrap();
        assert_eq!(completed.status, MailingStatus::Completed);
        assert!(repo.mark_completed(mailing.id, Utc::now()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_deleting_recipient_removes_it_from_mailings() {
        let store = MemoryStore::new();
        let (_, recipient, mailing) = seed_mailing(&store).await;

        assert!(RecipientRepository::delete(&store, recipient.id).await.unwrap());
        let members = MailingRepository::recipients(&store, mailing.id).await.unwrap();
        assert!(members.is_empty());
    }

    #[tokio::test]
    async fn test_deleting_message_cascades_to_mailings_and_attempts() {
        let store = MemoryStore::new();
        let (message, _, mailing) = seed_mailing(&store).await;

        AttemptRepository::record(
            &store,
            CreateAttempt {
                mailing_id: mailing.id,
                status: AttemptStatus::Success,
                server_response: "250 OK".to_string(),
                owner_id: mailing.owner_id,
            },
        )
        .await
        .unwrap();

        assert!(MessageRepository::delete(&store, message.id).await.unwrap());
        assert!(MailingRepository::get(&store, mailing.id).await.unwrap().is_none());
        assert!(AttemptRepository::list(&store, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mailing_requires_existing_message() {
        let store = MemoryStore::new();
        let err = MailingRepository::create(
            &store,
            CreateMailing {
                message_id: Uuid::now_v7(),
                recipient_ids: vec![],
                is_active: None,
                owner_id: None,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_unlaunched_mailings_sort_last() {
        let store = MemoryStore::new();
        let (_, _, first) = seed_mailing(&store).await;
        let second = MailingRepository::create(
            &store,
            CreateMailing {
                message_id: first.message_id,
                recipient_ids: vec![],
                is_active: None,
                owner_id: first.owner_id,
            },
        )
        .await
        .unwrap();

        MailingRepository::mark_launched(&store, second.id, Utc::now())
            .await
            .unwrap();

        let ids: Vec<MailingId> = MailingRepository::list(&store, None)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn test_roles_are_replaced() {
        let store = MemoryStore::new();
        let repo: &dyn UserRepository = &store;
        let user = repo
            .create(
                CreateUser {
                    email: "u@example.com".to_string(),
                    first_name: "U".to_string(),
                    last_name: "Ser".to_string(),
                    phone_number: None,
                    country: None,
                    is_active: false,
                    is_superuser: false,
                },
                "hash".to_string(),
            )
            .await
            .unwrap();

        repo.add_group(user.id, "users").await.unwrap();
        repo.add_group(user.id, "users").await.unwrap();
        assert_eq!(repo.roles(user.id).await.unwrap().groups, vec!["users".to_string()]);

        let roles = UserRoles {
            groups: vec!["managers".to_string()],
            permissions: vec!["mailing.stop".to_string()],
        };
        repo.set_roles(user.id, &roles).await.unwrap();
        assert_eq!(repo.roles(user.id).await.unwrap(), roles);
    }
}
