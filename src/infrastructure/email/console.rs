use super::Mailer;
use crate::domain::notification::RenderedMessage;
use crate::error::Result;
use async_trait::async_trait;
use tracing::info;

/// Logs messages instead of sending them. Used when no SMTP host is configured.
#[derive(Clone, Debug, Default)]
pub struct ConsoleMailer;

impl ConsoleMailer {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Mailer for ConsoleMailer {
    async fn deliver(&self, to: &str, message: &RenderedMessage) -> Result<()> {
        info!(
            to = %to,
            subject = %message.subject,
            body = %message.body,
            "email (console delivery)"
        );
        Ok(())
    }
}
