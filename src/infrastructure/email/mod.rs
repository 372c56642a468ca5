//! Email-backed [`Notifier`]: a renderer produces the text, a [`Mailer`]
//! delivers it to the customer or the business owner.

pub mod console;
pub mod renderer;
pub mod smtp;

pub use console::ConsoleMailer;
pub use renderer::PlainTextRenderer;
pub use smtp::SmtpMailer;

use crate::domain::notification::{Audience, NotificationKind, RenderedMessage, Snapshot};
use crate::domain::ports::{NotificationRenderer, Notifier};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Delivers a rendered message to a single address.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn deliver(&self, to: &str, message: &RenderedMessage) -> Result<()>;
}

#[derive(Clone)]
pub struct EmailNotifier {
    renderer: Arc<dyn NotificationRenderer>,
    mailer: Arc<dyn Mailer>,
    owner_email: String,
}

impl EmailNotifier {
    pub fn new(
        renderer: Arc<dyn NotificationRenderer>,
        mailer: Arc<dyn Mailer>,
        owner_email: impl Into<String>,
    ) -> Self {
        Self {
            renderer,
            mailer,
            owner_email: owner_email.into(),
        }
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send(&self, kind: NotificationKind, snapshot: &Snapshot) -> Result<()> {
        let message = self.renderer.render(kind, snapshot)?;
        let to = match kind.audience() {
            Audience::Customer => snapshot.customer_email(),
            Audience::Owner => self.owner_email.as_str(),
        };
        self.mailer.deliver(to, &message).await
    }
}
