//! Message catalog

use crate::mailing::MailingListCache;
use crate::policy::{self, Action, Actor};
use crate::validation;
use mailcast_common::types::MessageId;
use mailcast_common::{Error, Result};
use mailcast_storage::models::{CreateMessage, Message, UpdateMessage};
use mailcast_storage::repository::MessageRepository;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

pub const SUBJECT_MAX_LEN: usize = 255;
pub const BODY_MAX_LEN: usize = 800;

/// Fields accepted when creating a message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageInput {
    pub subject: String,
    pub body: String,
}

pub struct MessageCatalog {
    repo: Arc<dyn MessageRepository>,
    mailing_cache: Option<Arc<MailingListCache>>,
}

impl MessageCatalog {
    pub fn new(repo: Arc<dyn MessageRepository>) -> Self {
        Self {
            repo,
            mailing_cache: None,
        }
    }

    /// Deleting a message deletes its mailings, so the listing cache must hear about it
    pub fn with_mailing_cache(mut self, cache: Arc<MailingListCache>) -> Self {
        self.mailing_cache = Some(cache);
        self
    }

    pub async fn list(&self, actor: &Actor) -> Result<Vec<Message>> {
        let scope = policy::list_scope(actor)?;
        self.repo.list(scope.owner()).await
    }

    pub async fn get(&self, actor: &Actor, id: MessageId) -> Result<Message> {
        let message = self.fetch(id).await?;
        policy::authorize_entity(actor, &message, Action::Detail)?;
        Ok(message)
    }

    pub async fn create(&self, actor: &Actor, input: MessageInput) -> Result<Message> {
        let message = self
            .repo
            .create(CreateMessage {
                subject: validation::required_text("subject", &input.subject, SUBJECT_MAX_LEN)?,
                body: validation::required_text("body", &input.body, BODY_MAX_LEN)?,
                owner_id: Some(actor.user_id),
            })
            .await?;

        info!(message_id = %message.id, owner = %actor.user_id, "Message created");
        Ok(message)
    }

    pub async fn update(&self, actor: &Actor, id: MessageId, input: UpdateMessage) -> Result<Message> {
        let existing = self.fetch(id).await?;
        policy::authorize_entity(actor, &existing, Action::Update)?;

        let input = UpdateMessage {
            subject: input
                .subject
                .as_deref()
                .map(|s| validation::required_text("subject", s, SUBJECT_MAX_LEN))
                .transpose()?,
            body: input
                .body
                .as_deref()
                .map(|b| validation::required_text("body", b, BODY_MAX_LEN))
                .transpose()?,
        };

        let message = self
            .repo
            .update(id, input)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Message {}", id)))?;

        info!(message_id = %id, "Message updated");
        Ok(message)
    }

    /// Delete a message together with the mailings that send it
    pub async fn delete(&self, actor: &Actor, id: MessageId) -> Result<()> {
        let existing = self.fetch(id).await?;
        policy::authorize_entity(actor, &existing, Action::Delete)?;

        self.repo.delete(id).await?;
        if let Some(cache) = &self.mailing_cache {
            cache.invalidate().await;
        }

        info!(message_id = %id, "Message deleted");
        Ok(())
    }

    async fn fetch(&self, id: MessageId) -> Result<Message> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Message {}", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailcast_common::types::{GROUP_MANAGERS, GROUP_USERS};
    use mailcast_storage::MemoryStore;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn input(subject: &str) -> MessageInput {
        MessageInput {
            subject: subject.to_string(),
            body: "Body".to_string(),
        }
    }

    #[tokio::test]
    async fn test_listing_is_scoped_and_ordered() {
        let catalog = MessageCatalog::new(Arc::new(MemoryStore::new()));
        let alice = Actor::new(Uuid::now_v7()).with_group(GROUP_USERS);
        let bob = Actor::new(Uuid::now_v7()).with_group(GROUP_USERS);
        let manager = Actor::new(Uuid::now_v7()).with_group(GROUP_MANAGERS);

        catalog.create(&alice, input("Zebra")).await.unwrap();
        catalog.create(&alice, input("Apple")).await.unwrap();
        catalog.create(&bob, input("Mango")).await.unwrap();

        let subjects: Vec<String> = catalog
            .list(&alice)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.subject)
            .collect();
        assert_eq!(subjects, vec!["Apple".to_string(), "Zebra".to_string()]);
        assert_eq!(catalog.list(&manager).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_body_limit() {
        let catalog = MessageCatalog::new(Arc::new(MemoryStore::new()));
        let actor = Actor::new(Uuid::now_v7()).with_group(GROUP_USERS);

        let err = catalog
            .create(
                &actor,
                MessageInput {
                    subject: "Hello".to_string(),
                    body: "x".repeat(BODY_MAX_LEN + 1),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_manager_may_update_any_message() {
        let catalog = MessageCatalog::new(Arc::new(MemoryStore::new()));
        let alice = Actor::new(Uuid::now_v7()).with_group(GROUP_USERS);
        let manager = Actor::new(Uuid::now_v7()).with_group(GROUP_MANAGERS);

        let message = catalog.create(&alice, input("Hello")).await.unwrap();
        let updated = catalog
            .update(
                &manager,
                message.id,
                UpdateMessage {
                    subject: Some("Hi".to_string()),
                    body: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.subject, "Hi");
        assert_eq!(updated.owner_id, Some(alice.user_id));
    }
}
