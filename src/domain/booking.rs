use super::money::Money;
use super::status::{BookingStatus, Lifecycle};
use super::validation;
use crate::error::{BakeryError, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type BookingId = Uuid;

/// Rules applied when a booking is submitted.
#[derive(Debug, Clone)]
pub struct BookingPolicy {
    /// Minimum gap between submission and delivery.
    pub min_lead: Duration,
    pub max_special_requests: usize,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            min_lead: Duration::days(2),
            max_special_requests: 500,
        }
    }
}

/// Optional deposit captured when the booking is placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositInput {
    pub amount: Money,
    #[serde(default)]
    pub payment_method_id: String,
}

/// A booking as submitted by a customer. Status and identity are not accepted
/// from the client.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewBooking {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub cake_type: String,
    pub cake_size: String,
    pub cake_flavor: String,
    pub special_requests: Option<String>,
    pub delivery_date: Option<DateTime<Utc>>,
    pub delivery_address: Option<String>,
    pub deposit: Option<DepositInput>,
}

/// A custom-cake booking record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: BookingId,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub cake_type: String,
    pub cake_size: String,
    pub cake_flavor: String,
    pub special_requests: Option<String>,
    /// Fixed at creation.
    pub delivery_date: DateTime<Utc>,
    pub delivery_address: Option<String>,
    pub status: BookingStatus,
    pub deposit_amount: Option<Money>,
    pub payment_intent_id: Option<String>,
    /// Calendar day the last delivery reminder went out, when the ledger is on.
    #[serde(default)]
    pub last_reminder_sent_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// A validated booking that has not been persisted yet.
#[derive(Debug, Clone)]
pub struct BookingDraft {
    pub booking: Booking,
    pub deposit: Option<DepositInput>,
}

impl NewBooking {
    /// Validates the submission against `policy` at time `now`.
    pub fn validate(self, policy: &BookingPolicy, now: DateTime<Utc>) -> Result<BookingDraft> {
        let customer_name = validation::required("customerName", &self.customer_name)?;
        let customer_email = validation::email("customerEmail", &self.customer_email)?;
        let cake_type = validation::required("cakeType", &self.cake_type)?;
        let cake_size = validation::required("cakeSize", &self.cake_size)?;
        let cake_flavor = validation::required("cakeFlavor", &self.cake_flavor)?;

        let special_requests = validation::optional(self.special_requests.as_deref());
        if let Some(text) = &special_requests {
            validation::max_chars("specialRequests", text, policy.max_special_requests)?;
        }

        let delivery_date = self.delivery_date.ok_or_else(|| {
            BakeryError::ValidationError("deliveryDate is required".to_string())
        })?;
        let earliest = now + policy.min_lead;
        if delivery_date < earliest {
            return Err(BakeryError::ValidationError(format!(
                "deliveryDate must be on or after {}",
                earliest.to_rfc3339()
            )));
        }

        if let Some(deposit) = &self.deposit {
            if deposit.amount.is_zero() {
                return Err(BakeryError::ValidationError(
                    "deposit amount must be greater than zero".to_string(),
                ));
            }
            validation::required("deposit.paymentMethodId", &deposit.payment_method_id)?;
        }

        let booking = Booking {
            id: Uuid::new_v4(),
            customer_name,
            customer_email,
            customer_phone: validation::optional(self.customer_phone.as_deref()),
            cake_type,
            cake_size,
            cake_flavor,
            special_requests,
            delivery_date,
            delivery_address: validation::optional(self.delivery_address.as_deref()),
            status: BookingStatus::initial(),
            deposit_amount: self.deposit.as_ref().map(|d| d.amount),
            payment_intent_id: None,
            last_reminder_sent_on: None,
            created_at: now,
        };

        Ok(BookingDraft {
            booking,
            deposit: self.deposit,
        })
    }
}

/// The reduced view shown to customers checking on their booking.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicBooking {
    pub id: BookingId,
    pub status: BookingStatus,
    pub delivery_date: DateTime<Utc>,
    pub cake_type: String,
    pub cake_size: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Booking> for PublicBooking {
    fn from(booking: &Booking) -> Self {
        Self {
            id: booking.id,
            status: booking.status,
            delivery_date: booking.delivery_date,
            cake_type: booking.cake_type.clone(),
            cake_size: booking.cake_size.clone(),
            created_at: booking.created_at,
        }
    }
}
