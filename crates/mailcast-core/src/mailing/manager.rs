//! Mailing Manager - create, read, update and delete mailings

use super::attempts::AttemptLog;
use super::cache::MailingListCache;
use crate::policy::{self, Action, Actor};
use mailcast_common::types::{MailingId, MessageId, RecipientId};
use mailcast_common::{Error, Result};
use mailcast_storage::models::{
    CreateMailing, Mailing, MailingAttempt, Message, Recipient, UpdateMailing,
};
use mailcast_storage::repository::{MailingRepository, MessageRepository, RecipientRepository};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Fields accepted when creating a mailing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailingInput {
    pub message_id: MessageId,
    #[serde(default)]
    pub recipient_ids: Vec<RecipientId>,
    pub is_active: Option<bool>,
}

/// A mailing with its message, recipient set and send attempts
#[derive(Debug, Clone, Serialize)]
pub struct MailingDetail {
    #[serde(flatten)]
    pub mailing: Mailing,
    pub message: Message,
    pub recipients: Vec<Recipient>,
    pub attempts: Vec<MailingAttempt>,
}

/// Mailing Manager
pub struct MailingManager {
    mailings: Arc<dyn MailingRepository>,
    messages: Arc<dyn MessageRepository>,
    recipients: Arc<dyn RecipientRepository>,
    attempts: AttemptLog,
    cache: Arc<MailingListCache>,
}

impl MailingManager {
    pub fn new(
        mailings: Arc<dyn MailingRepository>,
        messages: Arc<dyn MessageRepository>,
        recipients: Arc<dyn RecipientRepository>,
        attempts: AttemptLog,
        cache: Arc<MailingListCache>,
    ) -> Self {
        Self {
            mailings,
            messages,
            recipients,
            attempts,
            cache,
        }
    }

    /// Mailings visible to `actor`, through the listing cache
    pub async fn list(&self, actor: &Actor) -> Result<Arc<Vec<Mailing>>> {
        let scope = policy::list_scope(actor)?;
        let mailings = Arc::clone(&self.mailings);
        self.cache
            .get_or_load(scope, move || async move { mailings.list(scope.owner()).await })
            .await
    }

    pub async fn get(&self, actor: &Actor, id: MailingId) -> Result<MailingDetail> {
        let mailing = self.fetch(id).await?;
        policy::authorize_entity(actor, &mailing, Action::Detail)?;

        let message = self
            .messages
            .get(mailing.message_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Message {}", mailing.message_id)))?;
        let recipients = self.mailings.recipients(id).await?;
        let attempts = self.attempts.for_mailing(id).await?;

        Ok(MailingDetail {
            mailing,
            message,
            recipients,
            attempts,
        })
    }

    pub async fn create(&self, actor: &Actor, input: MailingInput) -> Result<Mailing> {
        self.check_message(actor, input.message_id).await?;
        self.check_recipients(actor, &input.recipient_ids).await?;

        let mailing = self
            .mailings
            .create(CreateMailing {
                message_id: input.message_id,
                recipient_ids: input.recipient_ids,
                is_active: input.is_active,
                owner_id: Some(actor.user_id),
            })
            .await?;
        self.cache.invalidate().await;

        info!(mailing_id = %mailing.id, owner = %actor.user_id, "Mailing created");
        Ok(mailing)
    }

    pub async fn update(&self, actor: &Actor, id: MailingId, input: UpdateMailing) -> Result<Mailing> {
        let existing = self.fetch(id).await?;
        policy::authorize_entity(actor, &existing, Action::Update)?;

        if let Some(message_id) = input.message_id {
            self.check_message(actor, message_id).await?;
        }
        if let Some(recipient_ids) = &input.recipient_ids {
            self.check_recipients(actor, recipient_ids).await?;
        }

        let mailing = self
            .mailings
            .update(id, input)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Mailing {}", id)))?;
        self.cache.invalidate().await;

        info!(mailing_id = %id, "Mailing updated");
        Ok(mailing)
    }

    pub async fn delete(&self, actor: &Actor, id: MailingId) -> Result<()> {
        let existing = self.fetch(id).await?;
        policy::authorize_entity(actor, &existing, Action::Delete)?;

        self.mailings.delete(id).await?;
        self.cache.invalidate().await;

        info!(mailing_id = %id, "Mailing deleted");
        Ok(())
    }

    async fn fetch(&self, id: MailingId) -> Result<Mailing> {
        self.mailings
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Mailing {}", id)))
    }

    async fn check_message(&self, actor: &Actor, id: MessageId) -> Result<()> {
        match self.messages.get(id).await? {
            Some(message) if policy::can_access(actor, message.owner_id, Action::Detail) => Ok(()),
            _ => Err(Error::Validation(format!("Message {} does not exist", id))),
        }
    }

    async fn check_recipients(&self, actor: &Actor, ids: &[RecipientId]) -> Result<()> {
        let found = self.recipients.get_many(ids).await?;
        for id in ids {
            let visible = found
                .iter()
                .any(|r| r.id == *id && policy::can_access(actor, r.owner_id, Action::Detail));
            if !visible {
                return Err(Error::Validation(format!("Recipient {} does not exist", id)));
            }
        }
        Ok(())
    }
}
