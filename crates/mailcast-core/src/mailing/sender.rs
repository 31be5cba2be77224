//! Mailing Sender - launch and stop
//!
//! Launch runs in two phases. Phase one moves the mailing `created ->
//! launched` with a conditional update, so of two concurrent launches only
//! one proceeds. Phase two always runs once phase one succeeded: the
//! transport is called, the mailing is completed and one attempt row is
//! written, whatever the transport said.

use super::attempts::AttemptLog;
use super::cache::MailingListCache;
use super::transport::{MailTransport, OutgoingMail};
use crate::policy::Actor;
use chrono::Utc;
use mailcast_common::types::{MailingId, PERM_STOP_MAILING};
use mailcast_common::{Error, Result};
use mailcast_storage::models::{AttemptStatus, Mailing, MailingAttempt, MailingStatus};
use mailcast_storage::repository::{MailingRepository, MessageRepository};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Result of a launch that went through
#[derive(Debug, Clone, Serialize)]
pub struct LaunchOutcome {
    pub mailing: Mailing,
    pub attempt: MailingAttempt,
}

/// Mailing Sender
pub struct MailingSender {
    mailings: Arc<dyn MailingRepository>,
    messages: Arc<dyn MessageRepository>,
    attempts: AttemptLog,
    transport: Arc<dyn MailTransport>,
    cache: Arc<MailingListCache>,
    from_address: String,
}

impl MailingSender {
    pub fn new(
        mailings: Arc<dyn MailingRepository>,
        messages: Arc<dyn MessageRepository>,
        attempts: AttemptLog,
        transport: Arc<dyn MailTransport>,
        cache: Arc<MailingListCache>,
        from_address: String,
    ) -> Self {
        Self {
            mailings,
            messages,
            attempts,
            transport,
            cache,
            from_address,
        }
    }

    /// Send a mailing owned by `actor` that is still in `created`
    pub async fn launch(&self, actor: &Actor, id: MailingId) -> Result<LaunchOutcome> {
        let mailing = self
            .mailings
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Mailing {}", id)))?;

        if !actor.owns(mailing.owner_id) {
            warn!(mailing_id = %id, user_id = %actor.user_id, "Launch denied: not the owner");
            return Err(Error::PermissionDenied(
                "Only the owner can launch a mailing".to_string(),
            ));
        }
        if !mailing.status.can_transition_to(MailingStatus::Launched) {
            return Err(Error::InvalidTransition(format!(
                "Mailing is {}, only created mailings can be launched",
                mailing.status
            )));
        }

        let message = self
            .messages
            .get(mailing.message_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Message {}", mailing.message_id)))?;
        let to: Vec<String> = self
            .mailings
            .recipients(id)
            .await?
            .into_iter()
            .map(|r| r.email)
            .collect();

        // Phase one
        let launched = self
            .mailings
            .mark_launched(id, Utc::now())
            .await?
            .ok_or_else(|| Error::InvalidTransition("Mailing was already launched".to_string()))?;
        self.cache.invalidate().await;
        info!(mailing_id = %id, recipients = to.len(), "Mailing launched");

        // Phase two
        let mail = OutgoingMail {
            from: self.from_address.clone(),
            to,
            subject: message.subject,
            body: message.body,
        };
        let (status, server_response) = match self.transport.send(&mail).await {
            Ok(response) if response.accepted => (AttemptStatus::Success, response.response),
            Ok(response) => (AttemptStatus::Failure, response.response),
            Err(Error::Smtp(text)) => (AttemptStatus::Failure, text),
            Err(e) => (AttemptStatus::Failure, e.to_string()),
        };

        let completed = self.mailings.mark_completed(id, Utc::now()).await;
        let attempt = self
            .attempts
            .record(id, status, server_response, Some(actor.user_id))
            .await;
        self.cache.invalidate().await;

        let completed = completed.map_err(|e| {
            error!(mailing_id = %id, error = %e, "Failed to complete mailing");
            e
        })?;
        let attempt = attempt.map_err(|e| {
            error!(mailing_id = %id, error = %e, "Failed to record attempt");
            e
        })?;

        // A concurrent stop wins over completion
        let mailing = match completed {
            Some(mailing) => mailing,
            None => self.mailings.get(id).await?.unwrap_or(launched),
        };

        info!(mailing_id = %id, status = %mailing.status, attempt = %attempt.status, "Mailing sent");
        Ok(LaunchOutcome { mailing, attempt })
    }

    /// Stop a mailing. Requires the `mailing.stop` permission; stopping a
    /// stopped mailing changes nothing.
    pub async fn stop(&self, actor: &Actor, id: MailingId) -> Result<Mailing> {
        if !actor.has_permission(PERM_STOP_MAILING) {
            warn!(mailing_id = %id, user_id = %actor.user_id, "Stop denied: missing permission");
            return Err(Error::PermissionDenied(format!(
                "The {} permission is required",
                PERM_STOP_MAILING
            )));
        }

        let mailing = self
            .mailings
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Mailing {}", id)))?;
        if mailing.status == MailingStatus::Stopped {
            return Ok(mailing);
        }

        let stopped = self
            .mailings
            .set_status(id, MailingStatus::Stopped)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Mailing {}", id)))?;
        self.cache.invalidate().await;

        info!(mailing_id = %id, previous = %mailing.status, "Mailing stopped");
        Ok(stopped)
    }
}
