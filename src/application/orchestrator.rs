use super::dispatch::NotificationDispatcher;
use super::retry::retry_with_backoff;
use crate::config::{BookingConfig, CheckoutConfig};
use crate::domain::booking::{Booking, BookingDraft, NewBooking};
use crate::domain::money::Money;
use crate::domain::notification::{ContactMessage, NotificationKind, Snapshot, UnrecordedPayment};
use crate::domain::order::{CheckoutRequest, Order, OrderDraft, OrderNumber, PaymentStatus};
use crate::domain::ports::{
    CaptureOutcome, CaptureRequest, SharedBookingStore, SharedClock, SharedOrderStore,
    SharedPaymentGateway,
};
use crate::domain::validation;
use crate::error::{BakeryError, Result};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{Instrument, error, info, instrument, warn};

const MAX_CONTACT_MESSAGE: usize = 5000;

/// The only component that creates bookings and orders.
///
/// Each creation validates first, then runs capture, insert and notify on a
/// spawned task so a dropped caller cannot abandon a captured payment.
#[derive(Clone)]
pub struct Orchestrator {
    bookings: SharedBookingStore,
    orders: SharedOrderStore,
    gateway: SharedPaymentGateway,
    dispatcher: NotificationDispatcher,
    clock: SharedClock,
    checkout: CheckoutConfig,
    booking: BookingConfig,
}

impl Orchestrator {
    pub fn new(
        bookings: SharedBookingStore,
        orders: SharedOrderStore,
        gateway: SharedPaymentGateway,
        dispatcher: NotificationDispatcher,
        clock: SharedClock,
    ) -> Self {
        Self {
            bookings,
            orders,
            gateway,
            dispatcher,
            clock,
            checkout: CheckoutConfig::default(),
            booking: BookingConfig::default(),
        }
    }

    #[must_use]
    pub fn with_checkout_config(mut self, config: CheckoutConfig) -> Self {
        self.checkout = config;
        self
    }

    #[must_use]
    pub fn with_booking_config(mut self, config: BookingConfig) -> Self {
        self.booking = config;
        self
    }

    /// Validates a cart, charges it if paid by card and records the order.
    ///
    /// A declined card returns `PaymentDeclined` and stores nothing. A capture
    /// that cannot be recorded returns `PaymentUnrecorded` after alerting the owner.
    #[instrument(skip_all, fields(order_number = tracing::field::Empty))]
    pub async fn checkout(&self, request: CheckoutRequest) -> Result<Order> {
        let now = self.clock.now();
        let number = OrderNumber::generate(&self.checkout.order_prefix, now);
        tracing::Span::current().record("order_number", tracing::field::display(&number));

        let draft = request.validate(number, now)?;
        if let Some(sent) = draft.order.client_total {
            warn!(
                client_total = %sent,
                total = %draft.order.total,
                "client total disagrees with item prices, using recomputed total"
            );
        }

        let this = self.clone();
        run_detached(async move { this.settle_order(draft).await }.in_current_span()).await
    }

    async fn settle_order(&self, draft: OrderDraft) -> Result<Order> {
        let OrderDraft {
            mut order,
            payment_token,
        } = draft;

        let mut captured = None;
        if let Some(token) = payment_token {
            let request = CaptureRequest {
                amount_minor_units: order.total.to_minor_units()?,
                currency: self.checkout.currency.clone(),
                payment_method_token: token,
                description: format!("Order {}", order.order_number),
                receipt_email: order.customer.email.clone(),
                idempotency_key: order.order_number.to_string(),
            };
            match self.capture(&request).await? {
                CaptureOutcome::Declined { reason } => {
                    info!(%reason, "card declined, order not recorded");
                    return Err(BakeryError::PaymentDeclined(reason));
                }
                CaptureOutcome::Captured { reference } => {
                    order.payment.status = PaymentStatus::Paid;
                    order.payment.payment_intent_id = Some(reference.clone());
                    captured = Some(reference);
                }
            }
        }

        let charged_as = order.order_number.clone();
        let saved = match self.persist_order(order.clone()).await {
            Ok(saved) => saved,
            Err(e) => {
                return Err(match captured {
                    Some(reference) => {
                        self.report_unrecorded(UnrecordedPayment {
                            payment_reference: reference,
                            intended_record: order.order_number.to_string(),
                            amount: order.total.to_string(),
                            customer_email: order.customer.email.clone(),
                            failure: e.to_string(),
                        })
                        .await
                    }
                    None => e,
                });
            }
        };

        if let Some(reference) = &captured
            && saved.order_number != charged_as
        {
            warn!(
                payment_reference = %reference,
                charged_as = %charged_as,
                order_number = %saved.order_number,
                "payment was charged under an earlier order number"
            );
        }
        info!(
            order_number = %saved.order_number,
            total = %saved.total,
            payment = ?saved.payment.status,
            "order created"
        );
        let snapshot = Snapshot::Order(saved.clone());
        self.dispatcher
            .notify_all([
                (NotificationKind::OrderReceipt, snapshot.clone()),
                (NotificationKind::OrderReceived, snapshot),
            ])
            .await;
        Ok(saved)
    }

    /// Inserts the order, regenerating its number on a collision. Other
    /// transient failures are retried under the persist policy.
    ///
    /// A write can land even though the store reported a fault. When a retry
    /// then hits our own key, the stored record is ours and is returned as is.
    async fn persist_order(&self, mut order: Order) -> Result<Order> {
        let mut attempt = 1;
        loop {
            let faulted = AtomicBool::new(false);
            let result = retry_with_backoff(&self.checkout.persist_retry, is_transient, || {
                let candidate = order.clone();
                let faulted = &faulted;
                async move {
                    let result = self.orders.insert(candidate).await;
                    if matches!(&result, Err(e) if is_transient(e)) {
                        faulted.store(true, Ordering::Relaxed);
                    }
                    result
                }
            })
            .await;
            match result {
                Ok(saved) => return Ok(saved),
                Err(BakeryError::DuplicateKey(taken)) => {
                    if faulted.load(Ordering::Relaxed)
                        && let Some(stored) = self.orders.get(&order.order_number).await?
                        && stored == order
                    {
                        info!(%taken, "insert had landed before the store fault, keeping it");
                        return Ok(stored);
                    }
                    if attempt >= self.checkout.number_attempts {
                        return Err(BakeryError::Conflict(format!(
                            "no unique order number after {attempt} attempts (last tried {taken})"
                        )));
                    }
                    let next = OrderNumber::generate(&self.checkout.order_prefix, self.clock.now());
                    warn!(attempt, %taken, %next, "order number collision, regenerating");
                    order.order_number = next;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Validates a booking, captures its deposit if any and records it.
    #[instrument(skip_all, fields(booking_id = tracing::field::Empty))]
    pub async fn create_booking(&self, input: NewBooking) -> Result<Booking> {
        let draft = input.validate(&self.booking.policy, self.clock.now())?;
        tracing::Span::current().record("booking_id", tracing::field::display(draft.booking.id));

        let this = self.clone();
        run_detached(async move { this.settle_booking(draft).await }.in_current_span()).await
    }

    async fn settle_booking(&self, draft: BookingDraft) -> Result<Booking> {
        let BookingDraft {
            mut booking,
            deposit,
        } = draft;

        let mut captured = None;
        if let Some(deposit) = deposit {
            let request = CaptureRequest {
                amount_minor_units: deposit.amount.to_minor_units()?,
                currency: self.checkout.currency.clone(),
                payment_method_token: deposit.payment_method_id,
                description: format!("Deposit for {} cake booking {}", booking.cake_type, booking.id),
                receipt_email: booking.customer_email.clone(),
                idempotency_key: booking.id.to_string(),
            };
            match self.capture(&request).await? {
                CaptureOutcome::Declined { reason } => {
                    info!(%reason, "deposit declined, booking not recorded");
                    return Err(BakeryError::PaymentDeclined(reason));
                }
                CaptureOutcome::Captured { reference } => {
                    booking.payment_intent_id = Some(reference.clone());
                    captured = Some(reference);
                }
            }
        }

        let result = retry_with_backoff(&self.checkout.persist_retry, is_transient, || {
            self.bookings.insert(booking.clone())
        })
        .await;
        let saved = match result {
            Ok(saved) => saved,
            Err(e) => {
                return Err(match captured {
                    Some(reference) => {
                        self.report_unrecorded(UnrecordedPayment {
                            payment_reference: reference,
                            intended_record: booking.id.to_string(),
                            amount: booking.deposit_amount.unwrap_or(Money::ZERO).to_string(),
                            customer_email: booking.customer_email.clone(),
                            failure: e.to_string(),
                        })
                        .await
                    }
                    None => e,
                });
            }
        };

        info!(
            booking_id = %saved.id,
            delivery_date = %saved.delivery_date,
            deposit = saved.payment_intent_id.is_some(),
            "booking created"
        );
        let snapshot = Snapshot::Booking(saved.clone());
        self.dispatcher
            .notify_all([
                (NotificationKind::BookingCreated, snapshot.clone()),
                (NotificationKind::BookingReceived, snapshot),
            ])
            .await;
        Ok(saved)
    }

    /// Acknowledges a contact-form message and forwards it to the owner.
    #[instrument(skip_all)]
    pub async fn submit_contact(&self, message: ContactMessage) -> Result<()> {
        let text = validation::required("message", &message.message)?;
        validation::max_chars("message", &text, MAX_CONTACT_MESSAGE)?;
        let message = ContactMessage {
            name: validation::required("name", &message.name)?,
            email: validation::email("email", &message.email)?,
            message: text,
        };
        info!(from = %message.email, "contact message received");
        let snapshot = Snapshot::Contact(message);
        self.dispatcher
            .notify_all([
                (NotificationKind::ContactAck, snapshot.clone()),
                (NotificationKind::ContactReceived, snapshot),
            ])
            .await;
        Ok(())
    }

    /// One capture, retried once on a gateway fault with the same idempotency key.
    async fn capture(&self, request: &CaptureRequest) -> Result<CaptureOutcome> {
        match self.capture_once(request).await {
            Err(BakeryError::GatewayError(first)) => {
                warn!(
                    idempotency_key = %request.idempotency_key,
                    error = %first,
                    "capture failed, retrying once"
                );
                self.capture_once(request).await
            }
            other => other,
        }
    }

    async fn capture_once(&self, request: &CaptureRequest) -> Result<CaptureOutcome> {
        let timeout = self.checkout.payment_timeout;
        tokio::time::timeout(timeout, self.gateway.capture(request))
            .await
            .map_err(|_| BakeryError::GatewayError(format!("capture timed out after {timeout:?}")))?
    }

    async fn report_unrecorded(&self, payment: UnrecordedPayment) -> BakeryError {
        error!(
            target: "cakehouse::reconciliation",
            payment_reference = %payment.payment_reference,
            intended_record = %payment.intended_record,
            amount = %payment.amount,
            customer_email = %payment.customer_email,
            failure = %payment.failure,
            "payment captured but record not saved"
        );
        let reference = payment.payment_reference.clone();
        self.dispatcher
            .notify(
                NotificationKind::ReconciliationAlert,
                Snapshot::Reconciliation(payment),
            )
            .await;
        BakeryError::PaymentUnrecorded { reference }
    }
}

fn is_transient(error: &BakeryError) -> bool {
    !matches!(
        error,
        BakeryError::DuplicateKey(_) | BakeryError::ValidationError(_) | BakeryError::Conflict(_)
    )
}

/// Runs the future on its own task and waits for it.
async fn run_detached<T, F>(work: F) -> Result<T>
where
    F: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(work)
        .await
        .map_err(|e| BakeryError::internal(format!("settlement task failed: {e}")))?
}
