use super::booking::{Booking, BookingId};
use super::notification::{NotificationKind, RenderedMessage, Snapshot};
use super::order::{Order, OrderNumber, Payment};
use super::status::{BookingStatus, OrderStatus};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Persistence for bookings. Every method is a single atomic record operation.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Inserts a new booking; `DuplicateKey` if the id already exists.
    async fn insert(&self, booking: Booking) -> Result<Booking>;
    async fn get(&self, id: BookingId) -> Result<Option<Booking>>;
    async fn get_all(&self) -> Result<Vec<Booking>>;
    /// Sets `next` only if the stored status is still `expected`.
    async fn update_status(
        &self,
        id: BookingId,
        expected: BookingStatus,
        next: BookingStatus,
    ) -> Result<Booking>;
    /// Hard delete. Returns the removed booking, if it existed.
    async fn delete(&self, id: BookingId) -> Result<Option<Booking>>;
    /// Bookings whose delivery falls in `[start, end]` with one of `statuses`.
    async fn find_due(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        statuses: &[BookingStatus],
    ) -> Result<Vec<Booking>>;
    async fn mark_reminded(&self, id: BookingId, on: NaiveDate) -> Result<()>;
}

/// Persistence for orders, keyed by a unique order number.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts a new order; `DuplicateKey` if the order number is taken.
    async fn insert(&self, order: Order) -> Result<Order>;
    async fn get(&self, number: &OrderNumber) -> Result<Option<Order>>;
    async fn get_all(&self) -> Result<Vec<Order>>;
    /// Sets `next` only if the stored status is still `expected`.
    async fn update_status(
        &self,
        number: &OrderNumber,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Result<Order>;
    async fn update_payment(&self, number: &OrderNumber, payment: Payment) -> Result<Order>;
}

/// A charge request in the smallest currency unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRequest {
    pub amount_minor_units: i64,
    pub currency: String,
    pub payment_method_token: String,
    pub description: String,
    pub receipt_email: String,
    /// Reused on retry so the processor charges at most once.
    pub idempotency_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    Captured { reference: String },
    Declined { reason: String },
}

/// External card processing. Faults are reported as `GatewayError`.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn capture(&self, request: &CaptureRequest) -> Result<CaptureOutcome>;
}

/// Best-effort message dispatch. Never mutates records.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, kind: NotificationKind, snapshot: &Snapshot) -> Result<()>;
}

/// Turns a notification into subject and body text.
pub trait NotificationRenderer: Send + Sync {
    fn render(&self, kind: NotificationKind, snapshot: &Snapshot) -> Result<RenderedMessage>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[serde(other)]
    Customer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub role: Role,
}

/// Decodes a bearer credential.
pub trait Authorizer: Send + Sync {
    fn authorize(&self, token: &str) -> Result<Principal>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub type SharedBookingStore = Arc<dyn BookingStore>;
pub type SharedOrderStore = Arc<dyn OrderStore>;
pub type SharedPaymentGateway = Arc<dyn PaymentGateway>;
pub type SharedNotifier = Arc<dyn Notifier>;
pub type SharedAuthorizer = Arc<dyn Authorizer>;
pub type SharedClock = Arc<dyn Clock>;
