//! Dashboard statistics

use mailcast_common::Result;
use mailcast_storage::models::{MailingStats, MailingStatus};
use mailcast_storage::repository::{MailingRepository, RecipientRepository};
use std::sync::Arc;

pub struct StatsService {
    mailings: Arc<dyn MailingRepository>,
    recipients: Arc<dyn RecipientRepository>,
}

impl StatsService {
    pub fn new(mailings: Arc<dyn MailingRepository>, recipients: Arc<dyn RecipientRepository>) -> Self {
        Self {
            mailings,
            recipients,
        }
    }

    /// Total mailings, mailings currently sending, distinct recipients
    pub async fn stats(&self) -> Result<MailingStats> {
        Ok(MailingStats {
            total_mailings: self.mailings.count(None).await?,
            active_mailings: self.mailings.count(Some(MailingStatus::Launched)).await?,
            unique_recipients: self.recipients.count_distinct_emails().await?,
        })
    }
}
