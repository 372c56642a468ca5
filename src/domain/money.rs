use crate::error::{BakeryError, Result};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Differences below this are treated as rounding noise when comparing totals.
pub const TOTAL_EPSILON: Decimal = Decimal::from_parts(5, 0, 0, false, 3);

/// A non-negative monetary value in major currency units (e.g. pounds).
///
/// Wraps `rust_decimal::Decimal` so that prices and totals never pass through
/// binary floating point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(value: Decimal) -> Result<Self> {
        if value >= Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(BakeryError::ValidationError(
                "Amount must not be negative".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Converts to the smallest currency unit, `round(amount * 100)`.
    pub fn to_minor_units(&self) -> Result<i64> {
        self.0
            .checked_mul(Decimal::ONE_HUNDRED)
            .map(|cents| cents.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
            .and_then(|cents| cents.to_i64())
            .ok_or_else(|| {
                BakeryError::ValidationError("Amount is too large to charge".to_string())
            })
    }

    pub fn checked_add(self, rhs: Money) -> Result<Money> {
        self.0.checked_add(rhs.0).map(Self).ok_or_else(too_large)
    }

    pub fn checked_mul(self, quantity: u32) -> Result<Money> {
        self.0
            .checked_mul(Decimal::from(quantity))
            .map(Self)
            .ok_or_else(too_large)
    }

    /// Sums the amounts, failing instead of overflowing.
    pub fn checked_sum(amounts: impl IntoIterator<Item = Money>) -> Result<Money> {
        amounts
            .into_iter()
            .try_fold(Money::ZERO, |acc, m| acc.checked_add(m))
    }

    /// True when the two values differ by more than [`TOTAL_EPSILON`].
    pub fn differs_from(&self, other: Money) -> bool {
        (self.0 - other.0).abs() > TOTAL_EPSILON
    }
}

fn too_large() -> BakeryError {
    BakeryError::ValidationError("order total is too large".to_string())
}

impl TryFrom<Decimal> for Money {
    type Error = BakeryError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}
