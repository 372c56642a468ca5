//! Status changes for bookings and orders, with post-commit hooks.

use super::dispatch::NotificationDispatcher;
use crate::domain::booking::{Booking, BookingId};
use crate::domain::notification::{NotificationKind, Snapshot};
use crate::domain::order::{Order, OrderNumber, Payment, PaymentMethod, PaymentStatus};
use crate::domain::ports::{SharedBookingStore, SharedOrderStore};
use crate::domain::status::{BookingStatus, OrderStatus, apply_transition};
use crate::error::{BakeryError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Identifies the hooks to run after a record enters a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKey {
    Booking(BookingStatus),
    Order(OrderStatus),
}

/// Work run after a status change is committed. Hooks never affect the
/// outcome of the transition.
#[async_trait]
pub trait StatusHook: Send + Sync {
    fn name(&self) -> &str;
    async fn after_commit(&self, snapshot: &Snapshot) -> Result<()>;
}

/// Sends one notification about the updated record.
pub struct NotifyHook {
    kind: NotificationKind,
    dispatcher: NotificationDispatcher,
}

impl NotifyHook {
    pub fn new(kind: NotificationKind, dispatcher: NotificationDispatcher) -> Self {
        Self { kind, dispatcher }
    }
}

#[async_trait]
impl StatusHook for NotifyHook {
    fn name(&self) -> &str {
        self.kind.as_str()
    }

    async fn after_commit(&self, snapshot: &Snapshot) -> Result<()> {
        self.dispatcher.notify(self.kind, snapshot.clone()).await;
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct HookRegistry {
    hooks: HashMap<StatusKey, Vec<Arc<dyn StatusHook>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The base hooks: a thank-you message when a booking completes.
    pub fn with_defaults(dispatcher: NotificationDispatcher) -> Self {
        let mut registry = Self::new();
        registry.register(
            StatusKey::Booking(BookingStatus::Completed),
            Arc::new(NotifyHook::new(NotificationKind::BookingCompleted, dispatcher)),
        );
        registry
    }

    pub fn register(&mut self, key: StatusKey, hook: Arc<dyn StatusHook>) {
        self.hooks.entry(key).or_default().push(hook);
    }

    pub fn hooks_for(&self, key: StatusKey) -> &[Arc<dyn StatusHook>] {
        self.hooks.get(&key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Runs every hook for `key`, each on its own task. Failures are logged.
    async fn run(&self, key: StatusKey, snapshot: Snapshot) {
        let handles: Vec<_> = self
            .hooks_for(key)
            .iter()
            .map(|hook| {
                let hook = hook.clone();
                let snapshot = snapshot.clone();
                tokio::spawn(async move {
                    if let Err(e) = hook.after_commit(&snapshot).await {
                        warn!(
                            hook = hook.name(),
                            reference = %snapshot.reference(),
                            error = %e,
                            "status hook failed"
                        );
                    }
                })
            })
            .collect();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(?key, error = %e, "status hook panicked");
            }
        }
    }
}

/// Applies validated single-step transitions as compare-and-set writes.
#[derive(Clone)]
pub struct StatusManager {
    bookings: SharedBookingStore,
    orders: SharedOrderStore,
    hooks: Arc<HookRegistry>,
}

impl StatusManager {
    pub fn new(bookings: SharedBookingStore, orders: SharedOrderStore, hooks: HookRegistry) -> Self {
        Self {
            bookings,
            orders,
            hooks: Arc::new(hooks),
        }
    }

    #[instrument(skip(self))]
    pub async fn transition_booking(&self, id: BookingId, to: BookingStatus) -> Result<Booking> {
        let current = self
            .bookings
            .get(id)
            .await?
            .ok_or_else(|| BakeryError::NotFound(format!("booking {id}")))?;
        let next = apply_transition(current.status, to)?;
        let updated = self.bookings.update_status(id, current.status, next).await?;
        info!(from = %current.status, to = %next, "booking status changed");

        self.hooks
            .run(StatusKey::Booking(next), Snapshot::Booking(updated.clone()))
            .await;
        Ok(updated)
    }

    #[instrument(skip(self, number), fields(order_number = %number))]
    pub async fn transition_order(&self, number: &OrderNumber, to: OrderStatus) -> Result<Order> {
        let current = self
            .orders
            .get(number)
            .await?
            .ok_or_else(|| BakeryError::NotFound(format!("order {number}")))?;
        let next = apply_transition(current.status, to)?;
        let updated = self.orders.update_status(number, current.status, next).await?;
        info!(from = %current.status, to = %next, "order status changed");

        self.hooks
            .run(StatusKey::Order(next), Snapshot::Order(updated.clone()))
            .await;
        Ok(updated)
    }

    /// Confirms payment for a cash order collected in person.
    #[instrument(skip(self, number), fields(order_number = %number))]
    pub async fn mark_order_paid(&self, number: &OrderNumber) -> Result<Order> {
        let order = self
            .orders
            .get(number)
            .await?
            .ok_or_else(|| BakeryError::NotFound(format!("order {number}")))?;
        if order.payment.method != PaymentMethod::Cash {
            return Err(BakeryError::ValidationError(
                "only cash orders can be marked paid".to_string(),
            ));
        }
        if order.payment.status == PaymentStatus::Paid {
            return Err(BakeryError::Conflict(format!("order {number} is already paid")));
        }
        if order.status == OrderStatus::Cancelled {
            return Err(BakeryError::Conflict(format!("order {number} is cancelled")));
        }
        let payment = Payment {
            status: PaymentStatus::Paid,
            ..order.payment
        };
        let updated = self.orders.update_payment(number, payment).await?;
        info!("cash payment recorded");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{BookingStore, OrderStore};
    use crate::infrastructure::in_memory::{InMemoryBookingStore, InMemoryOrderStore};
    use crate::test_support::{RecordingNotifier, sample_booking, sample_order};
    use std::time::Duration;

    struct FailingHook;

    #[async_trait]
    impl StatusHook for FailingHook {
        fn name(&self) -> &str {
            "failing"
        }
        async fn after_commit(&self, _snapshot: &Snapshot) -> Result<()> {
            Err(BakeryError::internal("hook exploded"))
        }
    }

    fn manager(
        bookings: Arc<InMemoryBookingStore>,
        orders: Arc<InMemoryOrderStore>,
        notifier: Arc<RecordingNotifier>,
    ) -> StatusManager {
        let dispatcher = NotificationDispatcher::new(notifier, Duration::from_secs(1));
        let mut hooks = HookRegistry::with_defaults(dispatcher);
        hooks.register(
            StatusKey::Booking(BookingStatus::Completed),
            Arc::new(FailingHook),
        );
        StatusManager::new(bookings, orders, hooks)
    }

    #[tokio::test]
    async fn test_completion_sends_thank_you_despite_failing_hook() {
        let bookings = Arc::new(InMemoryBookingStore::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let booking = bookings
            .insert(sample_booking(BookingStatus::Delivered))
            .await
            .unwrap();
        let mgr = manager(bookings.clone(), Arc::new(InMemoryOrderStore::new()), notifier.clone());

        let updated = mgr
            .transition_booking(booking.id, BookingStatus::Completed)
            .await
            .unwrap();

        assert_eq!(updated.status, BookingStatus::Completed);
        assert_eq!(notifier.kinds(), vec![NotificationKind::BookingCompleted]);
    }

    #[tokio::test]
    async fn test_other_transitions_have_no_side_effect() {
        let bookings = Arc::new(InMemoryBookingStore::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let booking = bookings
            .insert(sample_booking(BookingStatus::Pending))
            .await
            .unwrap();
        let mgr = manager(bookings.clone(), Arc::new(InMemoryOrderStore::new()), notifier.clone());

        mgr.transition_booking(booking.id, BookingStatus::Confirmed)
            .await
            .unwrap();
        assert!(notifier.kinds().is_empty());
    }

    #[tokio::test]
    async fn test_skipping_a_step_is_rejected_and_not_written() {
        let bookings = Arc::new(InMemoryBookingStore::new());
        let booking = bookings
            .insert(sample_booking(BookingStatus::Pending))
            .await
            .unwrap();
        let mgr = manager(
            bookings.clone(),
            Arc::new(InMemoryOrderStore::new()),
            Arc::new(RecordingNotifier::default()),
        );

        let err = mgr
            .transition_booking(booking.id, BookingStatus::Ready)
            .await
            .unwrap_err();
        assert!(matches!(err, BakeryError::InvalidTransition { .. }));
        let stored = bookings.get(booking.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Pending);
    }

    #[tokio::test]
    async fn test_ready_order_cannot_be_cancelled() {
        let orders = Arc::new(InMemoryOrderStore::new());
        let mut order = sample_order("ARG000111222");
        order.status = OrderStatus::Ready;
        orders.insert(order).await.unwrap();
        let mgr = manager(
            Arc::new(InMemoryBookingStore::new()),
            orders,
            Arc::new(RecordingNotifier::default()),
        );
        let number = OrderNumber::parse("ARG000111222").unwrap();

        let err = mgr
            .transition_order(&number, OrderStatus::Cancelled)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 409);
        let done = mgr
            .transition_order(&number, OrderStatus::Completed)
            .await
            .unwrap();
        assert_eq!(done.status, OrderStatus::Completed);
    }

    #[tokio::test]
    async fn test_mark_cash_order_paid_once() {
        let orders = Arc::new(InMemoryOrderStore::new());
        orders.insert(sample_order("ARG000111333")).await.unwrap();
        let mgr = manager(
            Arc::new(InMemoryBookingStore::new()),
            orders.clone(),
            Arc::new(RecordingNotifier::default()),
        );
        let number = OrderNumber::parse("ARG000111333").unwrap();

        let paid = mgr.mark_order_paid(&number).await.unwrap();
        assert_eq!(paid.payment.status, PaymentStatus::Paid);
        assert!(matches!(
            mgr.mark_order_paid(&number).await,
            Err(BakeryError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_records_are_not_found() {
        let mgr = manager(
            Arc::new(InMemoryBookingStore::new()),
            Arc::new(InMemoryOrderStore::new()),
            Arc::new(RecordingNotifier::default()),
        );
        let err = mgr
            .transition_booking(uuid::Uuid::new_v4(), BookingStatus::Confirmed)
            .await
            .unwrap_err();
        assert!(matches!(err, BakeryError::NotFound(_)));
        let number = OrderNumber::parse("ARG999999999").unwrap();
        assert!(matches!(
            mgr.mark_order_paid(&number).await,
            Err(BakeryError::NotFound(_))
        ));
    }
}
