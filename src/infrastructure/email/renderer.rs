use crate::domain::notification::{NotificationKind, RenderedMessage, Snapshot};
use crate::domain::ports::NotificationRenderer;
use crate::error::{BakeryError, Result};
use std::fmt::Write;

/// Plain-text message bodies branded with the business name.
#[derive(Debug, Clone)]
pub struct PlainTextRenderer {
    business_name: String,
}

impl PlainTextRenderer {
    pub fn new(business_name: impl Into<String>) -> Self {
        Self {
            business_name: business_name.into(),
        }
    }

    fn mismatch(kind: NotificationKind, snapshot: &Snapshot) -> BakeryError {
        BakeryError::NotificationError(format!(
            "{kind} cannot be rendered for {}",
            snapshot.reference()
        ))
    }
}

impl NotificationRenderer for PlainTextRenderer {
    fn render(&self, kind: NotificationKind, snapshot: &Snapshot) -> Result<RenderedMessage> {
        let shop = &self.business_name;
        let mut body = String::new();
        let subject = match (kind, snapshot) {
            (NotificationKind::BookingCreated, Snapshot::Booking(b)) => {
                let _ = writeln!(body, "Hi {},\n", b.customer_name);
                let _ = writeln!(body, "Thank you for booking a cake with {shop}!\n");
                let _ = writeln!(body, "Booking reference: {}", b.id);
                let _ = writeln!(body, "Cake: {} ({}, {})", b.cake_type, b.cake_size, b.cake_flavor);
                let _ = writeln!(body, "Delivery date: {}", b.delivery_date.format("%A %-d %B %Y"));
                let _ = writeln!(body, "\nWe look forward to baking for you!");
                "Your Cake Booking Confirmation".to_string()
            }
            (NotificationKind::BookingReceived, Snapshot::Booking(b)) => {
                let _ = writeln!(body, "New cake booking #{}\n", b.id);
                let _ = writeln!(body, "Customer: {} <{}>", b.customer_name, b.customer_email);
                let _ = writeln!(
                    body,
                    "Phone: {}",
                    b.customer_phone.as_deref().unwrap_or("Not provided")
                );
                let _ = writeln!(body, "Cake: {} / {} / {}", b.cake_type, b.cake_size, b.cake_flavor);
                let _ = writeln!(body, "Delivery date: {}", b.delivery_date.format("%Y-%m-%d %H:%M"));
                if let Some(address) = &b.delivery_address {
                    let _ = writeln!(body, "Delivery address: {address}");
                }
                if let Some(requests) = &b.special_requests {
                    let _ = writeln!(body, "Special requests: {requests}");
                }
                match &b.payment_intent_id {
                    Some(reference) => {
                        let _ = writeln!(body, "Deposit: paid ({reference})");
                    }
                    None => {
                        let _ = writeln!(body, "Deposit: pending");
                    }
                }
                format!("New Cake Booking #{} - {shop}", b.id)
            }
            (NotificationKind::BookingCompleted, Snapshot::Booking(b)) => {
                let _ = writeln!(body, "Dear {},\n", b.customer_name);
                let _ = writeln!(
                    body,
                    "We hope you enjoyed your cake! Thank you for choosing {shop} for your special occasion."
                );
                let _ = writeln!(body, "We'd love to hear your feedback, and we look forward to serving you again!");
                format!("Thank You for Your Order - {shop}")
            }
            (NotificationKind::DeliveryReminder, Snapshot::Booking(b)) => {
                let _ = writeln!(body, "Dear {},\n", b.customer_name);
                let _ = writeln!(body, "Just a friendly reminder that your cake will be ready in 2 days!\n");
                let _ = writeln!(body, "Booking reference: {}", b.id);
                let _ = writeln!(body, "Delivery date: {}", b.delivery_date.format("%A %-d %B %Y"));
                let _ = writeln!(body, "Cake: {} ({})", b.cake_type, b.cake_size);
                let _ = writeln!(body, "\nIf you need any last-minute changes, please get in touch as soon as possible.");
                format!("Your Cake Order Reminder - {shop}")
            }
            (NotificationKind::OrderReceipt, Snapshot::Order(o)) => {
                let _ = writeln!(body, "Hi {},\n", o.customer.name);
                let _ = writeln!(body, "Thank you for your order! Order number: {}\n", o.order_number);
                for item in &o.items {
                    match item.subtotal() {
                        Ok(subtotal) => {
                            let _ = writeln!(body, "  {} x {} @ {} = {}", item.quantity, item.name, item.price, subtotal);
                        }
                        Err(_) => {
                            let _ = writeln!(body, "  {} x {} @ {}", item.quantity, item.name, item.price);
                        }
                    }
                }
                let _ = writeln!(body, "\nTotal: {}", o.total);
                let _ = writeln!(
                    body,
                    "{:?} on {} at {}",
                    o.delivery.method, o.delivery.date, o.delivery.time
                );
                let _ = writeln!(body, "Payment: {:?} ({:?})", o.payment.method, o.payment.status);
                format!("Order Confirmation #{} - {shop}", o.order_number)
            }
            (NotificationKind::OrderReceived, Snapshot::Order(o)) => {
                let _ = writeln!(body, "New order #{}\n", o.order_number);
                let _ = writeln!(body, "Customer: {} <{}>", o.customer.name, o.customer.email);
                if let Some(phone) = &o.customer.phone {
                    let _ = writeln!(body, "Phone: {phone}");
                }
                for item in &o.items {
                    let _ = writeln!(body, "  {} x {} (#{})", item.quantity, item.name, item.id);
                }
                let _ = writeln!(body, "Total: {}", o.total);
                if let Some(sent) = o.client_total {
                    let _ = writeln!(body, "NOTE: client submitted total {sent}, charged {}", o.total);
                }
                let _ = writeln!(body, "{:?}: {} {}", o.delivery.method, o.delivery.date, o.delivery.time);
                if let Some(address) = &o.delivery.address {
                    let _ = writeln!(body, "Address: {address}");
                }
                if let Some(notes) = &o.special_instructions {
                    let _ = writeln!(body, "Instructions: {notes}");
                }
                format!("New Order #{} - {shop}", o.order_number)
            }
            (NotificationKind::ContactAck, Snapshot::Contact(c)) => {
                let _ = writeln!(body, "Hi {},\n", c.name);
                let _ = writeln!(body, "Thanks for getting in touch with {shop}. We'll reply as soon as we can.\n");
                let _ = writeln!(body, "Your message:\n{}", c.message);
                format!("Thank you for contacting {shop}")
            }
            (NotificationKind::ContactReceived, Snapshot::Contact(c)) => {
                let _ = writeln!(body, "From: {} <{}>\n", c.name, c.email);
                let _ = writeln!(body, "{}", c.message);
                format!("New Contact Form Submission - {shop}")
            }
            (NotificationKind::ReconciliationAlert, Snapshot::Reconciliation(r)) => {
                let _ = writeln!(body, "A payment was captured but no record was saved.\n");
                let _ = writeln!(body, "Payment reference: {}", r.payment_reference);
                let _ = writeln!(body, "Intended record: {}", r.intended_record);
                let _ = writeln!(body, "Amount: {}", r.amount);
                let _ = writeln!(body, "Customer: {}", r.customer_email);
                let _ = writeln!(body, "Failure: {}", r.failure);
                format!("URGENT: unrecorded payment {}", r.payment_reference)
            }
            _ => return Err(Self::mismatch(kind, snapshot)),
        };
        Ok(RenderedMessage { subject, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::notification::ContactMessage;
    use crate::domain::status::BookingStatus;
    use crate::test_support::{sample_booking, sample_order};

    #[test]
    fn test_receipt_lists_items_and_total() {
        let renderer = PlainTextRenderer::new("Argies Cake");
        let order = sample_order("ARG111111111");
        let message = renderer
            .render(NotificationKind::OrderReceipt, &Snapshot::Order(order))
            .unwrap();
        assert_eq!(message.subject, "Order Confirmation #ARG111111111 - Argies Cake");
        assert!(message.body.contains("Victoria Sponge"));
        assert!(message.body.contains("Total: 18.50"));
    }

    #[test]
    fn test_reminder_mentions_booking() {
        let renderer = PlainTextRenderer::new("Argies Cake");
        let booking = sample_booking(BookingStatus::Confirmed);
        let id = booking.id.to_string();
        let message = renderer
            .render(NotificationKind::DeliveryReminder, &Snapshot::Booking(booking))
            .unwrap();
        assert!(message.body.contains(&id));
    }

    #[test]
    fn test_kind_snapshot_mismatch_is_error() {
        let renderer = PlainTextRenderer::new("Argies Cake");
        let result = renderer.render(
            NotificationKind::OrderReceipt,
            &Snapshot::Contact(ContactMessage::default()),
        );
        assert!(matches!(result, Err(BakeryError::NotificationError(_))));
    }
}
