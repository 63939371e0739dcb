use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Serialize;

use crate::config::MailConfig;
use crate::error::{AppError, Result};
use crate::mail::{EmailMessage, Mailer};

/// Mail relay client: a single JSON POST per message to an HTTP mail API,
/// authenticated by bearer token.
pub struct HttpMailer {
    client: reqwest::Client,
    config: MailConfig,
}

#[derive(Serialize)]
struct SendPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    attachment_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attachment_name: Option<&'a str>,
}

impl HttpMailer {
    pub fn new(config: MailConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let payload = SendPayload {
            from: &self.config.from,
            to: &message.to,
            subject: &message.subject,
            text: &message.body,
            attachment_url: message.attachment.as_ref().map(|a| a.url.as_str()),
            attachment_name: message.attachment.as_ref().map(|a| a.file_name.as_str()),
        };

        let resp = self
            .client
            .post(&self.config.api_url)
            .header(AUTHORIZATION, format!("Bearer {}", self.config.api_token))
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::Notification(format!("mail relay request failed: {}", e)))?;

        if !resp.status().is_success() {
            return Err(AppError::Notification(format!(
                "mail relay returned {}",
                resp.status()
            )));
        }

        tracing::debug!("Sent mail to {}", message.to);
        Ok(())
    }
}
