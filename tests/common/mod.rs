#![allow(dead_code)]

use async_trait::async_trait;
use cakehouse::application::dispatch::NotificationDispatcher;
use cakehouse::application::orchestrator::Orchestrator;
use cakehouse::application::retry::RetryPolicy;
use cakehouse::application::status::{HookRegistry, StatusManager};
use cakehouse::config::CheckoutConfig;
use cakehouse::domain::booking::{Booking, NewBooking};
use cakehouse::domain::notification::{NotificationKind, Snapshot};
use cakehouse::domain::order::{CheckoutRequest, Order, OrderNumber, Payment};
use cakehouse::domain::ports::{
    CaptureOutcome, CaptureRequest, Notifier, OrderStore, PaymentGateway, SharedNotifier,
    SharedOrderStore,
};
use cakehouse::domain::status::{BookingStatus, OrderStatus};
use cakehouse::error::{BakeryError, Result};
use cakehouse::infrastructure::clock::FixedClock;
use cakehouse::infrastructure::in_memory::{InMemoryBookingStore, InMemoryOrderStore};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 1, 10, 0, 0).unwrap()
}

/// Rejects the first `rejections` inserts as duplicates and records every
/// order number it was offered.
pub struct FlakyOrderStore {
    inner: InMemoryOrderStore,
    rejections: AtomicUsize,
    pub offered: Mutex<Vec<OrderNumber>>,
}

impl FlakyOrderStore {
    pub fn rejecting(rejections: usize) -> Self {
        Self {
            inner: InMemoryOrderStore::new(),
            rejections: AtomicUsize::new(rejections),
            offered: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl OrderStore for FlakyOrderStore {
    async fn insert(&self, order: Order) -> Result<Order> {
        self.offered.lock().unwrap().push(order.order_number.clone());
        let left = self.rejections.load(Ordering::SeqCst);
        if left > 0 {
            self.rejections.store(left - 1, Ordering::SeqCst);
            return Err(BakeryError::DuplicateKey(order.order_number.to_string()));
        }
        self.inner.insert(order).await
    }

    async fn get(&self, number: &OrderNumber) -> Result<Option<Order>> {
        self.inner.get(number).await
    }

    async fn get_all(&self) -> Result<Vec<Order>> {
        self.inner.get_all().await
    }

    async fn update_status(
        &self,
        number: &OrderNumber,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Result<Order> {
        self.inner.update_status(number, expected, next).await
    }

    async fn update_payment(&self, number: &OrderNumber, payment: Payment) -> Result<Order> {
        self.inner.update_payment(number, payment).await
    }
}

/// Fails the first `failures` inserts with a store fault. With
/// `write_before_failing` the failed inserts still reach the inner store.
pub struct UnreliableOrderStore {
    inner: InMemoryOrderStore,
    failures: AtomicUsize,
    write_before_failing: bool,
    pub inserts: AtomicUsize,
}

impl UnreliableOrderStore {
    pub fn failing_first(failures: usize) -> Self {
        Self {
            inner: InMemoryOrderStore::new(),
            failures: AtomicUsize::new(failures),
            write_before_failing: false,
            inserts: AtomicUsize::new(0),
        }
    }

    /// The first insert is written but reported as a timeout.
    pub fn losing_first_ack() -> Self {
        Self {
            write_before_failing: true,
            ..Self::failing_first(1)
        }
    }

    pub fn insert_count(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OrderStore for UnreliableOrderStore {
    async fn insert(&self, order: Order) -> Result<Order> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        let left = self.failures.load(Ordering::SeqCst);
        if left == 0 {
            return self.inner.insert(order).await;
        }
        self.failures.store(left - 1, Ordering::SeqCst);
        if self.write_before_failing {
            self.inner.insert(order).await?;
            return Err(BakeryError::internal("timeout after write"));
        }
        Err(BakeryError::internal("connection refused"))
    }

    async fn get(&self, number: &OrderNumber) -> Result<Option<Order>> {
        self.inner.get(number).await
    }

    async fn get_all(&self) -> Result<Vec<Order>> {
        self.inner.get_all().await
    }

    async fn update_status(
        &self,
        number: &OrderNumber,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Result<Order> {
        self.inner.update_status(number, expected, next).await
    }

    async fn update_payment(&self, number: &OrderNumber, payment: Payment) -> Result<Order> {
        self.inner.update_payment(number, payment).await
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(NotificationKind, String)>>,
}

impl RecordingNotifier {
    pub fn kinds(&self) -> Vec<NotificationKind> {
        self.sent.lock().unwrap().iter().map(|(k, _)| *k).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, kind: NotificationKind, snapshot: &Snapshot) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((kind, snapshot.customer_email().to_string()));
        Ok(())
    }
}

/// Fails every send addressed to `bad_address`, records the rest.
pub struct FailingNotifier {
    pub bad_address: String,
    pub delivered: RecordingNotifier,
    pub attempts: AtomicUsize,
}

impl FailingNotifier {
    pub fn for_address(address: &str) -> Self {
        Self {
            bad_address: address.to_string(),
            delivered: RecordingNotifier::default(),
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn always() -> Self {
        Self::for_address("*")
    }
}

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send(&self, kind: NotificationKind, snapshot: &Snapshot) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.bad_address == "*" || snapshot.customer_email() == self.bad_address {
            return Err(BakeryError::NotificationError("mailbox unavailable".into()));
        }
        self.delivered.send(kind, snapshot).await
    }
}

#[derive(Default)]
pub struct ScriptedGateway {
    script: Mutex<VecDeque<Result<CaptureOutcome>>>,
    pub requests: Mutex<Vec<CaptureRequest>>,
}

impl ScriptedGateway {
    pub fn with(script: Vec<Result<CaptureOutcome>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn declining(reason: &str) -> Self {
        Self::with(vec![Ok(CaptureOutcome::Declined {
            reason: reason.to_string(),
        })])
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn capture(&self, request: &CaptureRequest) -> Result<CaptureOutcome> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| {
            Ok(CaptureOutcome::Captured {
                reference: format!("pi_{}", request.idempotency_key),
            })
        })
    }
}

pub struct Harness {
    pub orchestrator: Orchestrator,
    pub status: StatusManager,
    pub bookings: Arc<InMemoryBookingStore>,
    pub orders: SharedOrderStore,
}

pub fn harness(
    orders: SharedOrderStore,
    gateway: Arc<ScriptedGateway>,
    notifier: SharedNotifier,
) -> Harness {
    let bookings = Arc::new(InMemoryBookingStore::new());
    let dispatcher = NotificationDispatcher::new(notifier, std::time::Duration::from_secs(2));
    let orchestrator = Orchestrator::new(
        bookings.clone(),
        orders.clone(),
        gateway,
        dispatcher.clone(),
        Arc::new(FixedClock(now())),
    )
    .with_checkout_config(
        CheckoutConfig::default().with_persist_retry(
            RetryPolicy::default().with_initial_delay(std::time::Duration::from_millis(1)),
        ),
    );
    let status = StatusManager::new(
        bookings.clone(),
        orders.clone(),
        HookRegistry::with_defaults(dispatcher),
    );
    Harness {
        orchestrator,
        status,
        bookings,
        orders,
    }
}

pub fn default_harness(notifier: Arc<RecordingNotifier>) -> Harness {
    harness(
        Arc::new(InMemoryOrderStore::new()),
        Arc::new(ScriptedGateway::default()),
        notifier,
    )
}

pub fn cash_checkout() -> CheckoutRequest {
    serde_json::from_value(json!({
        "items": [
            {"id": 1, "name": "Chocolate Fudge Cake", "price": "24.99", "quantity": 1},
            {"id": 4, "name": "Macaron Box", "price": "3.35", "quantity": 3, "category": "treats"}
        ],
        "total": "35.04",
        "customer": {"name": "Grace Hopper", "email": "grace@example.com", "phone": "07700 900123"},
        "delivery": {"method": "delivery", "address": "1 Bakery Lane", "date": "2026-05-03", "time": "10:00-12:00"},
        "payment": {"method": "cash"},
        "specialInstructions": "Ring the bell twice"
    }))
    .unwrap()
}

pub fn card_checkout(token: &str) -> CheckoutRequest {
    let mut request = cash_checkout();
    request.payment = serde_json::from_value(json!({
        "method": "card",
        "paymentMethodId": token
    }))
    .unwrap();
    request
}

pub fn booking_for(delivery: DateTime<Utc>) -> NewBooking {
    serde_json::from_value(json!({
        "customerName": "Ada Lovelace",
        "customerEmail": "ada@example.com",
        "cakeType": "Wedding",
        "cakeSize": "3 tier",
        "cakeFlavor": "Lemon",
        "specialRequests": "Fresh flowers on top",
        "deliveryDate": delivery.to_rfc3339()
    }))
    .unwrap()
}

pub fn lead() -> Duration {
    Duration::days(2)
}

pub fn sample_booking(email: &str) -> Booking {
    Booking {
        id: Uuid::new_v4(),
        customer_name: "Sample Customer".into(),
        customer_email: email.into(),
        customer_phone: None,
        cake_type: "Birthday".into(),
        cake_size: "10 inch".into(),
        cake_flavor: "Vanilla".into(),
        special_requests: None,
        delivery_date: now() + Duration::days(3),
        delivery_address: Some("1 Bakery Lane".into()),
        status: BookingStatus::Pending,
        deposit_amount: None,
        payment_intent_id: None,
        last_reminder_sent_on: None,
        created_at: now(),
    }
}
