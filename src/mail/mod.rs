pub mod http;

pub use http::*;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{AppError, Result};

/// A remotely-resolvable reference to an attachment. Bytes live in the blob
/// store, so mails carry a download link rather than a local path.
#[derive(Debug, Clone)]
pub struct AttachmentRef {
    pub file_name: String,
    pub url: String,
}

/// Outbound email
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachment: Option<AttachmentRef>,
}

/// Opaque email-sending capability. Failures propagate unmodified; the
/// sender never retries on its own.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Mailer used when no relay is configured: every send fails, so share
/// counters are never incremented for mail that could not have gone out.
pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        Err(AppError::Notification(format!(
            "Mail transport not configured, cannot send to {}",
            message.to
        )))
    }
}

/// Build the mailer from configuration; constructed once at boot.
pub fn from_config(config: &Config) -> Arc<dyn Mailer> {
    if config.mail_enabled() {
        Arc::new(HttpMailer::new(config.mail.clone()))
    } else {
        tracing::warn!("No mail relay configured, outbound mail is disabled");
        Arc::new(DisabledMailer)
    }
}
