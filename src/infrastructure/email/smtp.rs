//! SMTP transport using Lettre.

use super::Mailer;
use crate::domain::notification::RenderedMessage;
use crate::error::{BakeryError, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

/// Sends mail through an authenticated SMTP relay.
///
/// The transport is built once at startup and injected; there is no shared
/// global client.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    /// # Errors
    ///
    /// Returns error if the relay host cannot be configured.
    pub fn new(
        host: &str,
        port: u16,
        username: String,
        password: String,
        from: String,
    ) -> Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| BakeryError::NotificationError(format!("SMTP relay error: {e}")))?
            .port(port)
            .credentials(Credentials::new(username, password))
            .build();
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn deliver(&self, to: &str, message: &RenderedMessage) -> Result<()> {
        let email = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| BakeryError::NotificationError(format!("Invalid from address: {e}")))?,
            )
            .to(to
                .parse()
                .map_err(|e| BakeryError::NotificationError(format!("Invalid to address: {e}")))?)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())
            .map_err(|e| BakeryError::NotificationError(format!("Failed to build email: {e}")))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| BakeryError::NotificationError(format!("Failed to send email: {e}")))?;
        Ok(())
    }
}
