//! Runtime configuration for the orchestrator, reminder task and notifier.
//!
//! Values are supplied by the binary (CLI flags and environment); every struct
//! has a `Default` suitable for tests.

use crate::application::retry::RetryPolicy;
use crate::domain::booking::BookingPolicy;
use crate::error::{BakeryError, Result};
use chrono::{FixedOffset, Offset, Utc};
use std::time::Duration;

/// Checkout settings.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// ISO currency code sent to the payment gateway.
    ///
    /// Default: `gbp`
    pub currency: String,

    /// Three uppercase letters leading every order number.
    ///
    /// Default: `ARG`
    pub order_prefix: String,

    /// Insert attempts before an order-number collision is reported.
    ///
    /// Default: 3
    pub number_attempts: u32,

    /// Upper bound for a single capture call.
    ///
    /// Default: 10 seconds
    pub payment_timeout: Duration,

    /// Retries for a store write that fails for reasons other than a duplicate key.
    pub persist_retry: RetryPolicy,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            currency: "gbp".to_string(),
            order_prefix: "ARG".to_string(),
            number_attempts: 3,
            payment_timeout: Duration::from_secs(10),
            persist_retry: RetryPolicy::default(),
        }
    }
}

impl CheckoutConfig {
    /// # Errors
    ///
    /// Returns a validation error if the prefix is not three uppercase ASCII letters.
    pub fn with_order_prefix(mut self, prefix: impl Into<String>) -> Result<Self> {
        let prefix = prefix.into();
        if prefix.len() != 3 || !prefix.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(BakeryError::ValidationError(format!(
                "order prefix '{prefix}' must be three uppercase letters"
            )));
        }
        self.order_prefix = prefix;
        Ok(self)
    }

    #[must_use]
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into().to_lowercase();
        self
    }

    #[must_use]
    pub const fn with_number_attempts(mut self, attempts: u32) -> Self {
        self.number_attempts = if attempts == 0 { 1 } else { attempts };
        self
    }

    #[must_use]
    pub const fn with_payment_timeout(mut self, timeout: Duration) -> Self {
        self.payment_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_persist_retry(mut self, policy: RetryPolicy) -> Self {
        self.persist_retry = policy;
        self
    }
}

/// Booking settings.
#[derive(Debug, Clone, Default)]
pub struct BookingConfig {
    pub policy: BookingPolicy,
}

impl BookingConfig {
    #[must_use]
    pub fn with_min_lead(mut self, lead: chrono::Duration) -> Self {
        self.policy.min_lead = lead;
        self
    }

    #[must_use]
    pub fn with_max_special_requests(mut self, limit: usize) -> Self {
        self.policy.max_special_requests = limit;
        self
    }
}

/// Daily delivery-reminder settings.
#[derive(Debug, Clone)]
pub struct ReminderConfig {
    /// Local hour (0-23) the scan runs at.
    ///
    /// Default: 9
    pub run_hour: u32,

    /// Days between the scan and the deliveries it reminds about.
    ///
    /// Default: 2
    pub lead_days: i64,

    /// Offset defining the business's local calendar day.
    ///
    /// Default: UTC
    pub utc_offset: FixedOffset,

    /// Record a per-booking reminder date and skip bookings already reminded that day.
    ///
    /// Default: off
    pub ledger: bool,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            run_hour: 9,
            lead_days: 2,
            utc_offset: Utc.fix(),
            ledger: false,
        }
    }
}

impl ReminderConfig {
    /// # Errors
    ///
    /// Returns a validation error for hours outside 0-23.
    pub fn with_run_hour(mut self, hour: u32) -> Result<Self> {
        if hour > 23 {
            return Err(BakeryError::ValidationError(format!(
                "reminder hour {hour} is out of range"
            )));
        }
        self.run_hour = hour;
        Ok(self)
    }

    /// # Errors
    ///
    /// Returns a validation error if the offset is not within a day.
    pub fn with_utc_offset_minutes(mut self, minutes: i32) -> Result<Self> {
        self.utc_offset = FixedOffset::east_opt(minutes * 60).ok_or_else(|| {
            BakeryError::ValidationError(format!("UTC offset {minutes}m is out of range"))
        })?;
        Ok(self)
    }

    #[must_use]
    pub const fn with_lead_days(mut self, days: i64) -> Self {
        self.lead_days = days;
        self
    }

    #[must_use]
    pub const fn with_ledger(mut self, enabled: bool) -> Self {
        self.ledger = enabled;
        self
    }
}

/// Notification settings.
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    /// Upper bound for one send; a slower send is abandoned and logged.
    ///
    /// Default: 10 seconds
    pub timeout: Duration,

    /// Address receiving owner copies and reconciliation alerts.
    pub owner_email: String,

    pub business_name: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            owner_email: "owner@localhost".to_string(),
            business_name: "Argies Cake".to_string(),
        }
    }
}

impl NotifyConfig {
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_owner_email(mut self, email: impl Into<String>) -> Self {
        self.owner_email = email.into();
        self
    }

    #[must_use]
    pub fn with_business_name(mut self, name: impl Into<String>) -> Self {
        self.business_name = name.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_must_be_three_letters() {
        assert!(CheckoutConfig::default().with_order_prefix("CAK").is_ok());
        assert!(CheckoutConfig::default().with_order_prefix("ca").is_err());
        assert!(CheckoutConfig::default().with_order_prefix("C4K").is_err());
    }

    #[test]
    fn test_reminder_bounds() {
        assert!(ReminderConfig::default().with_run_hour(24).is_err());
        let cfg = ReminderConfig::default()
            .with_utc_offset_minutes(60)
            .unwrap()
            .with_ledger(true);
        assert_eq!(cfg.utc_offset.local_minus_utc(), 3600);
        assert!(cfg.ledger);
    }

    #[test]
    fn test_zero_attempts_means_one() {
        assert_eq!(
            CheckoutConfig::default()
                .with_number_attempts(0)
                .number_attempts,
            1
        );
    }
}
