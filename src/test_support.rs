//! Record builders and port stubs shared by unit tests.

use crate::domain::booking::Booking;
use crate::domain::money::Money;
use crate::domain::order::{
    Customer, Delivery, DeliveryMethod, LineItem, Order, OrderNumber, Payment, PaymentMethod,
    PaymentStatus,
};
use crate::domain::status::{BookingStatus, OrderStatus};
use crate::domain::notification::{NotificationKind, Snapshot};
use crate::domain::ports::{CaptureOutcome, CaptureRequest, Notifier, PaymentGateway};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal_macros::dec;
use std::collections::VecDeque;
use uuid::Uuid;

pub fn sample_booking(status: BookingStatus) -> Booking {
    Booking {
        id: Uuid::new_v4(),
        customer_name: "Ada Lovelace".into(),
        customer_email: "ada@example.com".into(),
        customer_phone: None,
        cake_type: "Birthday".into(),
        cake_size: "8 inch".into(),
        cake_flavor: "Chocolate".into(),
        special_requests: None,
        delivery_date: Utc.with_ymd_and_hms(2026, 6, 10, 15, 0, 0).unwrap(),
        delivery_address: None,
        status,
        deposit_amount: None,
        payment_intent_id: None,
        last_reminder_sent_on: None,
        created_at: Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap(),
    }
}

pub fn sample_order(number: &str) -> Order {
    Order {
        order_number: OrderNumber::parse(number).unwrap(),
        items: vec![LineItem {
            id: 1,
            name: "Victoria Sponge".into(),
            price: Money::new(dec!(18.50)).unwrap(),
            quantity: 1,
            image: None,
            category: Some("cakes".into()),
        }],
        total: Money::new(dec!(18.50)).unwrap(),
        client_total: None,
        customer: Customer {
            name: "Grace Hopper".into(),
            email: "grace@example.com".into(),
            phone: None,
        },
        delivery: Delivery {
            method: DeliveryMethod::Pickup,
            address: None,
            date: NaiveDate::from_ymd_opt(2026, 6, 12).unwrap(),
            time: "10:00".into(),
        },
        payment: Payment {
            method: PaymentMethod::Cash,
            status: PaymentStatus::Pending,
            payment_intent_id: None,
        },
        special_instructions: None,
        status: OrderStatus::New,
        created_at: Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap(),
    }
}

/// Records every notification it is asked to send.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: std::sync::Mutex<Vec<(NotificationKind, String)>>,
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
            .push((kind, snapshot.reference()));
        Ok(())
    }
}

/// Replays queued capture results and records each request. Captures with a
/// fresh reference once the queue is empty.
#[derive(Default)]
pub struct ScriptedGateway {
    pub script: std::sync::Mutex<VecDeque<Result<CaptureOutcome>>>,
    pub requests: std::sync::Mutex<Vec<CaptureRequest>>,
}

impl ScriptedGateway {
    pub fn with(script: Vec<Result<CaptureOutcome>>) -> Self {
        Self {
            script: std::sync::Mutex::new(script.into()),
            requests: Default::default(),
        }
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn capture(&self, request: &CaptureRequest) -> Result<CaptureOutcome> {
        self.requests.lock().unwrap().push(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(CaptureOutcome::Captured {
                    reference: format!("pi_test_{}", request.idempotency_key),
                })
            })
    }
}
