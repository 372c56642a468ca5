//! Fault-isolated notification sends.

use crate::domain::notification::{NotificationKind, Snapshot};
use crate::domain::ports::SharedNotifier;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// What happened to one notification attempt. Never an error for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Sent,
    Failed,
    TimedOut,
    Panicked,
}

impl DeliveryOutcome {
    pub fn is_sent(self) -> bool {
        self == Self::Sent
    }
}

/// Sends each notification on its own task under a timeout. Failures, timeouts
/// and panics are logged and reported as a [`DeliveryOutcome`].
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: SharedNotifier,
    timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(notifier: SharedNotifier, timeout: Duration) -> Self {
        Self { notifier, timeout }
    }

    /// Starts a send and returns its handle without waiting.
    pub fn spawn(&self, kind: NotificationKind, snapshot: Snapshot) -> JoinHandle<DeliveryOutcome> {
        let notifier = self.notifier.clone();
        let timeout = self.timeout;
        tokio::spawn(async move {
            let reference = snapshot.reference();
            let mut send = tokio::spawn(async move { notifier.send(kind, &snapshot).await });
            match tokio::time::timeout(timeout, &mut send).await {
                Ok(Ok(Ok(()))) => {
                    debug!(%kind, %reference, "notification sent");
                    DeliveryOutcome::Sent
                }
                Ok(Ok(Err(e))) => {
                    warn!(%kind, %reference, error = %e, "notification failed");
                    DeliveryOutcome::Failed
                }
                Ok(Err(join_error)) => {
                    warn!(%kind, %reference, error = %join_error, "notifier panicked");
                    DeliveryOutcome::Panicked
                }
                Err(_) => {
                    send.abort();
                    warn!(%kind, %reference, ?timeout, "notification timed out");
                    DeliveryOutcome::TimedOut
                }
            }
        })
    }

    /// Sends one notification and waits for its outcome.
    pub async fn notify(&self, kind: NotificationKind, snapshot: Snapshot) -> DeliveryOutcome {
        settle(self.spawn(kind, snapshot)).await
    }

    /// Sends several notifications concurrently and waits for all of them.
    pub async fn notify_all(
        &self,
        messages: impl IntoIterator<Item = (NotificationKind, Snapshot)>,
    ) -> Vec<DeliveryOutcome> {
        let handles: Vec<_> = messages
            .into_iter()
            .map(|(kind, snapshot)| self.spawn(kind, snapshot))
            .collect();
        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            outcomes.push(settle(handle).await);
        }
        outcomes
    }
}

async fn settle(handle: JoinHandle<DeliveryOutcome>) -> DeliveryOutcome {
    handle.await.unwrap_or_else(|e| {
        warn!(error = %e, "notification task aborted");
        DeliveryOutcome::Panicked
    })
}
