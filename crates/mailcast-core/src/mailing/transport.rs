//! Outbound mail transport

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use mailcast_common::config::MailConfig;
use mailcast_common::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// A single dispatch: one message, every recipient in `To`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

/// What the relay said about a dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// The relay accepted the message for delivery
    pub accepted: bool,
    /// Raw response text
    pub response: String,
}

/// Mail transport
///
/// `Err` means the exchange itself failed (connection, TLS, timeout, a
/// rejected envelope); a completed exchange is reported through
/// [`TransportResponse::accepted`].
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<TransportResponse>;
}

/// SMTP relay transport
pub struct LettreTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl LettreTransport {
    /// Build the relay client from configuration. No connection is opened here.
    pub fn new(config: &MailConfig) -> Result<Self> {
        let builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
                .map_err(|e| Error::Config(format!("Invalid SMTP relay: {}", e)))?
        } else if config.use_starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                .map_err(|e| Error::Config(format!("Invalid SMTP relay: {}", e)))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
        };

        let mut builder = builder
            .port(config.smtp_port)
            .timeout(Some(Duration::from_secs(config.timeout_secs)));

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        info!(
            host = %config.smtp_host,
            port = config.smtp_port,
            tls = config.use_tls,
            starttls = config.use_starttls,
            "SMTP transport configured"
        );

        Ok(Self {
            mailer: builder.build(),
        })
    }

    fn build_message(mail: &OutgoingMail) -> Result<Message> {
        let from: Mailbox = mail
            .from
            .parse()
            .map_err(|e| Error::Smtp(format!("Invalid from address: {}", e)))?;

        let mut builder = Message::builder().from(from).subject(&mail.subject);
        for address in &mail.to {
            let to: Mailbox = address
                .parse()
                .map_err(|e| Error::Smtp(format!("Invalid recipient address {}: {}", address, e)))?;
            builder = builder.to(to);
        }

        builder
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body.clone())
            .map_err(|e| Error::Smtp(format!("Failed to build email: {}", e)))
    }
}

#[async_trait]
impl MailTransport for LettreTransport {
    async fn send(&self, mail: &OutgoingMail) -> Result<TransportResponse> {
        if mail.to.is_empty() {
            return Ok(TransportResponse {
                accepted: false,
                response: "No recipients".to_string(),
            });
        }

        let email = Self::build_message(mail)?;

        match self.mailer.send(email).await {
            Ok(response) => {
                let text = format!(
                    "{} {}",
                    response.code(),
                    response.message().collect::<Vec<_>>().join(" ")
                );
                debug!(recipients = mail.to.len(), response = %text, "Email sent");
                Ok(TransportResponse {
                    accepted: response.is_positive(),
                    response: text,
                })
            }
            Err(e) => {
                warn!(error = %e, "SMTP send failed");
                Err(Error::Smtp(e.to_string()))
            }
        }
    }
}

/// Transport that keeps every dispatch in memory instead of sending it
#[derive(Clone, Default)]
pub struct MemoryTransport {
    sent: Arc<Mutex<Vec<OutgoingMail>>>,
    failure: Option<String>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every send fails with `message`
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            sent: Arc::default(),
            failure: Some(message.into()),
        }
    }

    /// Dispatches accepted so far
    pub async fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl MailTransport for MemoryTransport {
    async fn send(&self, mail: &OutgoingMail) -> Result<TransportResponse> {
        if let Some(message) = &self.failure {
            return Err(Error::Smtp(message.clone()));
        }
        if mail.to.is_empty() {
            return Ok(TransportResponse {
                accepted: false,
                response: "No recipients".to_string(),
            });
        }

        self.sent.lock().await.push(mail.clone());
        Ok(TransportResponse {
            accepted: true,
            response: format!("250 OK: queued for {} recipient(s)", mail.to.len()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn mail(to: &[&str]) -> OutgoingMail {
        OutgoingMail {
            from: "robot@example.com".to_string(),
            to: to.iter().map(|s| s.to_string()).collect(),
            subject: "Hello".to_string(),
            body: "World".to_string(),
        }
    }

    #[test]
    fn test_build_message_with_all_recipients() {
        let message = LettreTransport::build_message(&mail(&["a@example.com", "b@example.com"]))
            .unwrap();
        let to: Vec<String> = message
            .envelope()
            .to()
            .iter()
            .map(|a| a.to_string())
            .collect();
        assert_eq!(to, vec!["a@example.com".to_string(), "b@example.com".to_string()]);
    }

    #[test]
    fn test_build_message_rejects_bad_address() {
        let err = LettreTransport::build_message(&mail(&["not an address"])).unwrap_err();
        assert_eq!(err.code(), "SMTP_ERROR");
    }

    #[tokio::test]
    async fn test_empty_recipient_list_is_not_accepted() {
        let transport = LettreTransport::new(&MailConfig::default()).unwrap();
        let response = transport.send(&mail(&[])).await.unwrap();
        assert!(!response.accepted);
    }

    #[tokio::test]
    async fn test_memory_transport() {
        let transport = MemoryTransport::new();
        let response = transport.send(&mail(&["a@example.com"])).await.unwrap();
        assert!(response.accepted);
        assert_eq!(transport.sent().await.len(), 1);

        let failing = MemoryTransport::failing("connection refused");
        let err = failing.send(&mail(&["a@example.com"])).await.unwrap_err();
        assert_eq!(err.to_string(), "SMTP error: connection refused");
    }
}
