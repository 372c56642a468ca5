use crate::domain::ports::{CaptureOutcome, CaptureRequest, PaymentGateway};
use crate::error::{BakeryError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

/// Offline gateway that understands Stripe's test payment-method tokens.
///
/// `pm_card_*` tokens capture, tokens containing `chargeDeclined` decline and
/// `pm_card_gatewayError` fails like an unreachable processor. Outcomes are
/// remembered per idempotency key, as Stripe does.
#[derive(Default, Clone)]
pub struct SimulatedGateway {
    outcomes: Arc<Mutex<HashMap<String, CaptureOutcome>>>,
}

impl SimulatedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn decide(token: &str) -> Result<CaptureOutcome> {
        if token == "pm_card_gatewayError" {
            return Err(BakeryError::GatewayError(
                "simulated processor unavailable".to_string(),
            ));
        }
        if token.contains("InsufficientFunds") {
            return Ok(CaptureOutcome::Declined {
                reason: "Your card has insufficient funds.".to_string(),
            });
        }
        if token.contains("chargeDeclined") || !token.starts_with("pm_") {
            return Ok(CaptureOutcome::Declined {
                reason: "Your card was declined.".to_string(),
            });
        }
        Ok(CaptureOutcome::Captured {
            reference: format!("pi_sim_{}", Uuid::new_v4().simple()),
        })
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn capture(&self, request: &CaptureRequest) -> Result<CaptureOutcome> {
        let mut outcomes = self.outcomes.lock().await;
        if let Some(previous) = outcomes.get(&request.idempotency_key) {
            return Ok(previous.clone());
        }
        let outcome = Self::decide(&request.payment_method_token)?;
        info!(
            amount_minor_units = request.amount_minor_units,
            currency = %request.currency,
            outcome = ?outcome,
            "simulated capture"
        );
        outcomes.insert(request.idempotency_key.clone(), outcome.clone());
        Ok(outcome)
    }
}
