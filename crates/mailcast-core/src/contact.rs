//! Contact form

use crate::mailing::{MailTransport, OutgoingMail};
use crate::validation;
use mailcast_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Contact form submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactForm {
    pub name: String,
    pub phone: Option<String>,
    pub message: String,
}

/// Forwards contact form submissions to the site's contact address
pub struct ContactService {
    transport: Arc<dyn MailTransport>,
    from_address: String,
    contact_address: String,
}

impl ContactService {
    /// Submissions go to `contact_address`, or back to `from_address` when unset
    pub fn new(
        transport: Arc<dyn MailTransport>,
        from_address: String,
        contact_address: Option<String>,
    ) -> Self {
        let contact_address = contact_address.unwrap_or_else(|| from_address.clone());
        Self {
            transport,
            from_address,
            contact_address,
        }
    }

    /// Deliver the submission and return the reply text
    pub async fn submit(&self, form: ContactForm) -> Result<String> {
        let name = validation::required_text("name", &form.name, 100)?;
        let phone = validation::optional_text("phone", form.phone.as_deref(), 20)?;
        let message = validation::required_text("message", &form.message, 2000)?;

        let mail = OutgoingMail {
            from: self.from_address.clone(),
            to: vec![self.contact_address.clone()],
            subject: format!("Contact form: {}", name),
            body: format!(
                "Name: {}\nPhone: {}\n\n{}\n",
                name,
                phone.as_deref().unwrap_or("-"),
                message
            ),
        };

        let response = self.transport.send(&mail).await?;
        if !response.accepted {
            return Err(Error::Smtp(response.response));
        }

        info!(name = %name, "Contact form submitted");
        Ok(format!("Thank you, {}! Your message has been received.", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailing::MemoryTransport;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_submission_is_forwarded() {
        let transport = MemoryTransport::new();
        let service = ContactService::new(
            Arc::new(transport.clone()),
            "robot@example.com".to_string(),
            Some("desk@example.com".to_string()),
        );

        let reply = service
            .submit(ContactForm {
                name: "Ann".to_string(),
                phone: Some("+64 21 000".to_string()),
                message: "Please call me".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(reply, "Thank you, Ann! Your message has been received.");

        let sent = transport.sent().await;
        assert_eq!(sent[0].to, vec!["desk@example.com".to_string()]);
        assert!(sent[0].body.contains("Please call me"));
    }

    #[tokio::test]
    async fn test_transport_failure_is_reported() {
        let service = ContactService::new(
            Arc::new(MemoryTransport::failing("relay down")),
            "robot@example.com".to_string(),
            None,
        );
        let err = service
            .submit(ContactForm {
                name: "Ann".to_string(),
                phone: None,
                message: "Hi".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 502);
    }
}
