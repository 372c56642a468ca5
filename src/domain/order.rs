use super::money::Money;
use super::status::{Lifecycle, OrderStatus};
use super::validation;
use crate::error::{BakeryError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Human-readable order identity: a 3-letter prefix, 6 digits taken from the
/// creation time and a 3-digit random suffix, e.g. `ARG482913057`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    pub fn generate(prefix: &str, now: DateTime<Utc>) -> Self {
        let time_part = now.timestamp_millis().rem_euclid(1_000_000);
        let suffix: u16 = rand::thread_rng().gen_range(0..1000);
        Self(format!("{prefix}{time_part:06}{suffix:03}"))
    }

    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        if Self::is_well_formed(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(BakeryError::ValidationError(format!(
                "'{value}' is not a valid order number"
            )))
        }
    }

    pub fn is_well_formed(value: &str) -> bool {
        value.is_ascii()
            && value.len() == 12
            && value[..3].chars().all(|c| c.is_ascii_uppercase())
            && value[3..].chars().all(|c| c.is_ascii_digit())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// Product identifier.
    pub id: u64,
    #[serde(default)]
    pub name: String,
    pub price: Money,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

fn default_quantity() -> u32 {
    1
}

impl LineItem {
    pub fn subtotal(&self) -> Result<Money> {
        self.price.checked_mul(self.quantity)
    }
}

/// Server-side total: the sum of every item's `price * quantity`.
pub fn items_total(items: &[LineItem]) -> Result<Money> {
    items
        .iter()
        .try_fold(Money::ZERO, |acc, item| acc.checked_add(item.subtotal()?))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Customer {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMethod {
    Pickup,
    Delivery,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeliveryInput {
    pub method: Option<DeliveryMethod>,
    pub address: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    pub method: DeliveryMethod,
    pub address: Option<String>,
    pub date: NaiveDate,
    /// Requested time slot, e.g. "10:00-12:00".
    pub time: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Card,
    Cash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentInput {
    pub method: Option<PaymentMethod>,
    /// Card token from the payment form; required for card payments.
    pub payment_method_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub payment_intent_id: Option<String>,
}

/// A checkout submission from the cart.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckoutRequest {
    pub items: Vec<LineItem>,
    /// Client-computed total. Never trusted, only compared.
    pub total: Option<Money>,
    pub customer: Customer,
    pub delivery: DeliveryInput,
    pub payment: PaymentInput,
    pub special_instructions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_number: OrderNumber,
    pub items: Vec<LineItem>,
    pub total: Money,
    /// Set when the client-sent total disagreed with the recomputed one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_total: Option<Money>,
    pub customer: Customer,
    pub delivery: Delivery,
    pub payment: Payment,
    pub special_instructions: Option<String>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn has_total_mismatch(&self) -> bool {
        self.client_total.is_some()
    }
}

/// A validated order waiting for payment and persistence.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub order: Order,
    /// Card token to charge; `None` for cash.
    pub payment_token: Option<String>,
}

impl CheckoutRequest {
    /// Validates the submission and builds the not-yet-persisted order.
    pub fn validate(self, order_number: OrderNumber, now: DateTime<Utc>) -> Result<OrderDraft> {
        if self.items.is_empty() {
            return Err(BakeryError::ValidationError(
                "at least one item is required".to_string(),
            ));
        }
        let mut items = Vec::with_capacity(self.items.len());
        for (idx, mut item) in self.items.into_iter().enumerate() {
            item.name = validation::required(&format!("items[{idx}].name"), &item.name)?;
            if item.quantity < 1 {
                return Err(BakeryError::ValidationError(format!(
                    "items[{idx}].quantity must be at least 1"
                )));
            }
            items.push(item);
        }

        let customer = Customer {
            name: validation::required("customer.name", &self.customer.name)?,
            email: validation::email("customer.email", &self.customer.email)?,
            phone: validation::optional(self.customer.phone.as_deref()),
        };

        let delivery = validate_delivery(self.delivery, now)?;

        let (method, payment_token) = match self.payment.method {
            Some(PaymentMethod::Card) => {
                let token = validation::optional(self.payment.payment_method_id.as_deref())
                    .ok_or_else(|| {
                        BakeryError::ValidationError(
                            "payment.paymentMethodId is required for card payments".to_string(),
                        )
                    })?;
                (PaymentMethod::Card, Some(token))
            }
            Some(PaymentMethod::Cash) => (PaymentMethod::Cash, None),
            None => {
                return Err(BakeryError::ValidationError(
                    "payment.method is required".to_string(),
                ));
            }
        };

        let total = items_total(&items)?;
        let client_total = self.total.filter(|sent| sent.differs_from(total));

        let order = Order {
            order_number,
            items,
            total,
            client_total,
            customer,
            delivery,
            payment: Payment {
                method,
                status: PaymentStatus::Pending,
                payment_intent_id: None,
            },
            special_instructions: validation::optional(self.special_instructions.as_deref()),
            status: OrderStatus::initial(),
            created_at: now,
        };

        Ok(OrderDraft {
            order,
            payment_token,
        })
    }
}

fn validate_delivery(input: DeliveryInput, now: DateTime<Utc>) -> Result<Delivery> {
    let method = input.method.ok_or_else(|| {
        BakeryError::ValidationError("delivery.method is required".to_string())
    })?;
    let address = validation::optional(input.address.as_deref());
    if method == DeliveryMethod::Delivery && address.is_none() {
        return Err(BakeryError::ValidationError(
            "delivery.address is required for delivery orders".to_string(),
        ));
    }
    let date = input
        .date
        .ok_or_else(|| BakeryError::ValidationError("delivery.date is required".to_string()))?;
    if date < now.date_naive() {
        return Err(BakeryError::ValidationError(
            "delivery.date must not be in the past".to_string(),
        ));
    }
    let time = validation::required("delivery.time", &input.time)?;
    Ok(Delivery {
        method,
        address,
        date,
        time,
    })
}

/// Order details safe to show without authentication.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicOrder {
    pub order_number: OrderNumber,
    pub status: OrderStatus,
    pub items: Vec<LineItem>,
    pub total: Money,
    pub delivery_method: DeliveryMethod,
    pub delivery_date: NaiveDate,
    pub delivery_time: String,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

impl From<&Order> for PublicOrder {
    fn from(order: &Order) -> Self {
        Self {
            order_number: order.order_number.clone(),
            status: order.status,
            items: order.items.clone(),
            total: order.total,
            delivery_method: order.delivery.method,
            delivery_date: order.delivery.date,
            delivery_time: order.delivery.time.clone(),
            payment_status: order.payment.status,
            created_at: order.created_at,
        }
    }
}
