//! Recipient directory

use crate::policy::{self, Action, Actor};
use crate::validation;
use mailcast_common::types::RecipientId;
use mailcast_common::{Error, Result};
use mailcast_storage::models::{CreateRecipient, Recipient, UpdateRecipient};
use mailcast_storage::repository::RecipientRepository;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

pub const EMAIL_MAX_LEN: usize = 150;
pub const NAME_MAX_LEN: usize = 150;
pub const COMMENT_MAX_LEN: usize = 255;

/// Fields accepted when creating a recipient
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipientInput {
    pub email: String,
    pub name: String,
    pub comment: Option<String>,
    pub photo: Option<String>,
    pub is_active: Option<bool>,
}

pub struct RecipientDirectory {
    repo: Arc<dyn RecipientRepository>,
}

impl RecipientDirectory {
    pub fn new(repo: Arc<dyn RecipientRepository>) -> Self {
        Self { repo }
    }

    pub async fn list(&self, actor: &Actor) -> Result<Vec<Recipient>> {
        let scope = policy::list_scope(actor)?;
        self.repo.list(scope.owner()).await
    }

    pub async fn get(&self, actor: &Actor, id: RecipientId) -> Result<Recipient> {
        let recipient = self.fetch(id).await?;
        policy::authorize_entity(actor, &recipient, Action::Detail)?;
        Ok(recipient)
    }

    pub async fn create(&self, actor: &Actor, input: RecipientInput) -> Result<Recipient> {
        let email = validation::email(&input.email, EMAIL_MAX_LEN)?;
        let name = validation::required_text("name", &input.name, NAME_MAX_LEN)?;
        let comment = validation::optional_text("comment", input.comment.as_deref(), COMMENT_MAX_LEN)?;
        self.ensure_email_free(&email, None).await?;

        let recipient = self
            .repo
            .create(CreateRecipient {
                email,
                name,
                comment,
                photo: input.photo.filter(|p| !p.trim().is_empty()),
                is_active: input.is_active,
                owner_id: Some(actor.user_id),
            })
            .await?;

        info!(recipient_id = %recipient.id, owner = %actor.user_id, "Recipient created");
        Ok(recipient)
    }

    pub async fn update(
        &self,
        actor: &Actor,
        id: RecipientId,
        input: UpdateRecipient,
    ) -> Result<Recipient> {
        let existing = self.fetch(id).await?;
        policy::authorize_entity(actor, &existing, Action::Update)?;

        let email = match input.email.as_deref() {
            Some(email) => {
                let email = validation::email(email, EMAIL_MAX_LEN)?;
                self.ensure_email_free(&email, Some(id)).await?;
                Some(email)
            }
            None => None,
        };
        let name = input
            .name
            .as_deref()
            .map(|name| validation::required_text("name", name, NAME_MAX_LEN))
            .transpose()?;
        let comment = validation::optional_text("comment", input.comment.as_deref(), COMMENT_MAX_LEN)?;

        let recipient = self
            .repo
            .update(
                id,
                UpdateRecipient {
                    email,
                    name,
                    comment,
                    photo: input.photo,
                    is_active: input.is_active,
                },
            )
            .await?
            .ok_or_else(|| Error::NotFound(format!("Recipient {}", id)))?;

        info!(recipient_id = %id, "Recipient updated");
        Ok(recipient)
    }

    /// Delete a recipient; it leaves every mailing's recipient set
    pub async fn delete(&self, actor: &Actor, id: RecipientId) -> Result<()> {
        let existing = self.fetch(id).await?;
        policy::authorize_entity(actor, &existing, Action::Delete)?;

        self.repo.delete(id).await?;
        info!(recipient_id = %id, "Recipient deleted");
        Ok(())
    }

    async fn fetch(&self, id: RecipientId) -> Result<Recipient> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Recipient {}", id)))
    }

    async fn ensure_email_free(&self, email: &str, except: Option<RecipientId>) -> Result<()> {
        match self.repo.get_by_email(email).await? {
            Some(other) if Some(other.id) != except => Err(Error::Validation(
                "Recipient with this email already exists".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailcast_common::types::GROUP_USERS;
    use mailcast_storage::MemoryStore;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn input(email: &str) -> RecipientInput {
        RecipientInput {
            email: email.to_string(),
            name: "Recipient".to_string(),
            comment: None,
            photo: None,
            is_active: None,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let directory = RecipientDirectory::new(Arc::new(MemoryStore::new()));
        let alice = Actor::new(Uuid::now_v7()).with_group(GROUP_USERS);
        let bob = Actor::new(Uuid::now_v7()).with_group(GROUP_USERS);

        directory.create(&alice, input("r@example.com")).await.unwrap();
        let err = directory.create(&bob, input("r@Example.com")).await.unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert!(directory.list(&bob).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_field_limits() {
        let directory = RecipientDirectory::new(Arc::new(MemoryStore::new()));
        let actor = Actor::new(Uuid::now_v7()).with_group(GROUP_USERS);

        let mut long_comment = input("c@example.com");
        long_comment.comment = Some("x".repeat(COMMENT_MAX_LEN + 1));
        assert!(directory.create(&actor, long_comment).await.is_err());

        let mut blank_name = input("n@example.com");
        blank_name.name = "  ".to_string();
        assert!(directory.create(&actor, blank_name).await.is_err());

        assert!(directory.create(&actor, input("not-an-email")).await.is_err());
    }

    #[tokio::test]
    async fn test_other_owner_is_forbidden_not_hidden() {
        let directory = RecipientDirectory::new(Arc::new(MemoryStore::new()));
        let alice = Actor::new(Uuid::now_v7()).with_group(GROUP_USERS);
        let bob = Actor::new(Uuid::now_v7()).with_group(GROUP_USERS);

        let recipient = directory.create(&alice, input("r@example.com")).await.unwrap();

        let err = directory.get(&bob, recipient.id).await.unwrap_err();
        assert_eq!(err.status_code(), 403);
        let err = directory.get(&bob, Uuid::now_v7()).await.unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_update_keeps_own_email() {
        let directory = RecipientDirectory::new(Arc::new(MemoryStore::new()));
        let actor = Actor::new(Uuid::now_v7()).with_group(GROUP_USERS);
        let recipient = directory.create(&actor, input("r@example.com")).await.unwrap();

        let updated = directory
            .update(
                &actor,
                recipient.id,
                UpdateRecipient {
                    email: Some("r@example.com".to_string()),
                    name: Some("Renamed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.email, "r@example.com");
    }
}
