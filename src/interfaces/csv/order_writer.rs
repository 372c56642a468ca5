use crate::domain::money::Money;
use crate::domain::order::{DeliveryMethod, Order, PaymentMethod, PaymentStatus};
use crate::domain::status::OrderStatus;
use crate::error::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::io::Write;

/// One report row per order.
#[derive(Debug, Serialize)]
struct OrderRow<'a> {
    order_number: &'a str,
    created_at: DateTime<Utc>,
    status: OrderStatus,
    customer_name: &'a str,
    customer_email: &'a str,
    delivery_method: DeliveryMethod,
    delivery_date: NaiveDate,
    delivery_time: &'a str,
    payment_method: PaymentMethod,
    payment_status: PaymentStatus,
    payment_reference: Option<&'a str>,
    items: u64,
    total: Money,
    total_mismatch: bool,
}

impl<'a> From<&'a Order> for OrderRow<'a> {
    fn from(order: &'a Order) -> Self {
        Self {
            order_number: order.order_number.as_str(),
            created_at: order.created_at,
            status: order.status,
            customer_name: &order.customer.name,
            customer_email: &order.customer.email,
            delivery_method: order.delivery.method,
            delivery_date: order.delivery.date,
            delivery_time: &order.delivery.time,
            payment_method: order.payment.method,
            payment_status: order.payment.status,
            payment_reference: order.payment.payment_intent_id.as_deref(),
            items: order.items.iter().map(|i| u64::from(i.quantity)).sum(),
            total: order.total,
            total_mismatch: order.has_total_mismatch(),
        }
    }
}

/// Writes the order report as CSV.
pub struct OrderWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> OrderWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_orders<'a>(&mut self, orders: impl IntoIterator<Item = &'a Order>) -> Result<()> {
        for order in orders {
            self.writer.serialize(OrderRow::from(order))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
