use super::booking::Booking;
use super::order::Order;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    BookingCreated,
    BookingReceived,
    BookingCompleted,
    OrderReceipt,
    OrderReceived,
    DeliveryReminder,
    ContactAck,
    ContactReceived,
    ReconciliationAlert,
}

/// Who a notification is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Customer,
    Owner,
}

impl NotificationKind {
    pub fn audience(&self) -> Audience {
        match self {
            Self::BookingReceived
            | Self::OrderReceived
            | Self::ContactReceived
            | Self::ReconciliationAlert => Audience::Owner,
            _ => Audience::Customer,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BookingCreated => "booking_created",
            Self::BookingReceived => "booking_received",
            Self::BookingCompleted => "booking_completed",
            Self::OrderReceipt => "order_receipt",
            Self::OrderReceived => "order_received",
            Self::DeliveryReminder => "delivery_reminder",
            Self::ContactAck => "contact_ack",
            Self::ContactReceived => "contact_received",
            Self::ReconciliationAlert => "reconciliation_alert",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message sent through the contact form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub message: String,
}

/// Money captured with no record behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnrecordedPayment {
    pub payment_reference: String,
    /// Order number or booking id the payment was meant for.
    pub intended_record: String,
    pub amount: String,
    pub customer_email: String,
    pub failure: String,
}

/// Read-only copy of the record a notification is about.
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    Booking(Booking),
    Order(Order),
    Contact(ContactMessage),
    Reconciliation(UnrecordedPayment),
}

impl Snapshot {
    /// Customer address for customer-facing notifications.
    pub fn customer_email(&self) -> &str {
        match self {
            Self::Booking(b) => &b.customer_email,
            Self::Order(o) => &o.customer.email,
            Self::Contact(c) => &c.email,
            Self::Reconciliation(r) => &r.customer_email,
        }
    }

    pub fn customer_name(&self) -> &str {
        match self {
            Self::Booking(b) => &b.customer_name,
            Self::Order(o) => &o.customer.name,
            Self::Contact(c) => &c.name,
            Self::Reconciliation(_) => "",
        }
    }

    /// Identifier used in log lines.
    pub fn reference(&self) -> String {
        match self {
            Self::Booking(b) => b.id.to_string(),
            Self::Order(o) => o.order_number.to_string(),
            Self::Contact(c) => c.email.clone(),
            Self::Reconciliation(r) => r.payment_reference.clone(),
        }
    }
}

/// A notification body ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub subject: String,
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_kinds() {
        assert_eq!(NotificationKind::OrderReceived.audience(), Audience::Owner);
        assert_eq!(
            NotificationKind::ReconciliationAlert.audience(),
            Audience::Owner
        );
        assert_eq!(NotificationKind::OrderReceipt.audience(), Audience::Customer);
        assert_eq!(
            NotificationKind::DeliveryReminder.audience(),
            Audience::Customer
        );
    }

    #[test]
    fn test_contact_snapshot_addresses_sender() {
        let snapshot = Snapshot::Contact(ContactMessage {
            name: "Lin".into(),
            email: "lin@example.com".into(),
            message: "Do you do vegan sponges?".into(),
        });
        assert_eq!(snapshot.customer_email(), "lin@example.com");
        assert_eq!(snapshot.reference(), "lin@example.com");
    }
}
