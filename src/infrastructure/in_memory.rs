use crate::domain::booking::{Booking, BookingId};
use crate::domain::order::{Order, OrderNumber, Payment};
use crate::domain::ports::{BookingStore, OrderStore};
use crate::domain::status::{BookingStatus, OrderStatus};
use crate::error::{BakeryError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory store for bookings.
///
/// Uses `Arc<RwLock<HashMap<BookingId, Booking>>>`; each operation holds the
/// write lock for its whole check-and-write, which makes it atomic.
#[derive(Default, Clone)]
pub struct InMemoryBookingStore {
    bookings: Arc<RwLock<HashMap<BookingId, Booking>>>,
}

impl InMemoryBookingStore {
    /// Creates a new, empty in-memory booking store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn stale_status(record: &str, expected: &str, actual: &str) -> BakeryError {
    BakeryError::Conflict(format!(
        "{record} status changed concurrently (expected '{expected}', found '{actual}')"
    ))
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn insert(&self, booking: Booking) -> Result<Booking> {
        let mut bookings = self.bookings.write().await;
        if bookings.contains_key(&booking.id) {
            return Err(BakeryError::DuplicateKey(booking.id.to_string()));
        }
        bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn get(&self, id: BookingId) -> Result<Option<Booking>> {
        let bookings = self.bookings.read().await;
        Ok(bookings.get(&id).cloned())
    }

    async fn get_all(&self) -> Result<Vec<Booking>> {
        let bookings = self.bookings.read().await;
        Ok(bookings.values().cloned().collect())
    }

    async fn update_status(
        &self,
        id: BookingId,
        expected: BookingStatus,
        next: BookingStatus,
    ) -> Result<Booking> {
        let mut bookings = self.bookings.write().await;
        let booking = bookings
            .get_mut(&id)
            .ok_or_else(|| BakeryError::NotFound(format!("booking {id}")))?;
        if booking.status != expected {
            return Err(stale_status(
                "booking",
                expected.as_str(),
                booking.status.as_str(),
            ));
        }
        booking.status = next;
        Ok(booking.clone())
    }

    async fn delete(&self, id: BookingId) -> Result<Option<Booking>> {
        let mut bookings = self.bookings.write().await;
        Ok(bookings.remove(&id))
    }

    async fn find_due(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        statuses: &[BookingStatus],
    ) -> Result<Vec<Booking>> {
        let bookings = self.bookings.read().await;
        let mut due: Vec<Booking> = bookings
            .values()
            .filter(|b| b.delivery_date >= start && b.delivery_date <= end)
            .filter(|b| statuses.contains(&b.status))
            .cloned()
            .collect();
        due.sort_by_key(|b| b.delivery_date);
        Ok(due)
    }

    async fn mark_reminded(&self, id: BookingId, on: NaiveDate) -> Result<()> {
        let mut bookings = self.bookings.write().await;
        let booking = bookings
            .get_mut(&id)
            .ok_or_else(|| BakeryError::NotFound(format!("booking {id}")))?;
        booking.last_reminder_sent_on = Some(on);
        Ok(())
    }
}

/// A thread-safe in-memory store for orders, unique on order number.
#[derive(Default, Clone)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderNumber, Order>>>,
}

impl InMemoryOrderStore {
    /// Creates a new, empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: Order) -> Result<Order> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.order_number) {
            return Err(BakeryError::DuplicateKey(order.order_number.to_string()));
        }
        orders.insert(order.order_number.clone(), order.clone());
        Ok(order)
    }

    async fn get(&self, number: &OrderNumber) -> Result<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders.get(number).cloned())
    }

    async fn get_all(&self) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        Ok(orders.values().cloned().collect())
    }

    async fn update_status(
        &self,
        number: &OrderNumber,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Result<Order> {
        let mut orders = self.orders.write().await;
        let order = orders
            .get_mut(number)
            .ok_or_else(|| BakeryError::NotFound(format!("order {number}")))?;
        if order.status != expected {
            return Err(stale_status(
                "order",
                expected.as_str(),
                order.status.as_str(),
            ));
        }
        order.status = next;
        Ok(order.clone())
    }

    async fn update_payment(&self, number: &OrderNumber, payment: Payment) -> Result<Order> {
        let mut orders = self.orders.write().await;
        let order = orders
            .get_mut(number)
            .ok_or_else(|| BakeryError::NotFound(format!("order {number}")))?;
        order.payment = payment;
        Ok(order.clone())
    }
}
