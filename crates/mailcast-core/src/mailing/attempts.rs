//! Attempt log - one immutable row per send operation

use crate::policy::{self, Actor};
use mailcast_common::types::{MailingId, UserId};
use mailcast_common::Result;
use mailcast_storage::models::{AttemptStatus, CreateAttempt, MailingAttempt};
use mailcast_storage::repository::AttemptRepository;
use std::sync::Arc;
use tracing::info;

/// Append-only attempt log
#[derive(Clone)]
pub struct AttemptLog {
    repo: Arc<dyn AttemptRepository>,
}

impl AttemptLog {
    pub fn new(repo: Arc<dyn AttemptRepository>) -> Self {
        Self { repo }
    }

    /// Append one attempt
    pub async fn record(
        &self,
        mailing_id: MailingId,
        status: AttemptStatus,
        server_response: String,
        owner_id: Option<UserId>,
    ) -> Result<MailingAttempt> {
        let attempt = self
            .repo
            .record(CreateAttempt {
                mailing_id,
                status,
                server_response,
                owner_id,
            })
            .await?;

        info!(
            attempt_id = %attempt.id,
            mailing_id = %mailing_id,
            status = %attempt.status,
            "Mailing attempt recorded"
        );
        Ok(attempt)
    }

    /// Attempts visible to `actor`, ordered by (attempted_at, status)
    pub async fn list_for(&self, actor: &Actor) -> Result<Vec<MailingAttempt>> {
        let scope = policy::list_scope(actor)?;
        self.repo.list(scope.owner()).await
    }

    /// Attempts of one mailing; callers check access to the mailing first
    pub async fn for_mailing(&self, mailing_id: MailingId) -> Result<Vec<MailingAttempt>> {
        self.repo.list_for_mailing(mailing_id).await
    }
}
