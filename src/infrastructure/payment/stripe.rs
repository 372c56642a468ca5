use crate::domain::ports::{CaptureOutcome, CaptureRequest, PaymentGateway};
use crate::error::{BakeryError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

/// Card capture through Stripe PaymentIntents (create and confirm in one call).
#[derive(Clone)]
pub struct StripeGateway {
    http: Client,
    api_base: String,
    secret_key: String,
}

#[derive(Debug, Deserialize)]
struct PaymentIntent {
    id: String,
    status: String,
    #[serde(default)]
    last_payment_error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ApiError,
}

#[derive(Debug, Default, Deserialize)]
struct ApiError {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    decline_code: Option<String>,
}

impl ApiError {
    fn reason(&self) -> String {
        self.message
            .clone()
            .or_else(|| self.decline_code.clone())
            .unwrap_or_else(|| "Your card was declined.".to_string())
    }
}

impl StripeGateway {
    pub fn new(secret_key: String, api_base: String, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BakeryError::GatewayError(format!("http client: {e}")))?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key,
        })
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn capture(&self, request: &CaptureRequest) -> Result<CaptureOutcome> {
        let params = [
            ("amount", request.amount_minor_units.to_string()),
            ("currency", request.currency.clone()),
            ("payment_method", request.payment_method_token.clone()),
            ("confirm", "true".to_string()),
            ("description", request.description.clone()),
            ("receipt_email", request.receipt_email.clone()),
            ("automatic_payment_methods[enabled]", "true".to_string()),
            ("automatic_payment_methods[allow_redirects]", "never".to_string()),
        ];

        let response = self
            .http
            .post(format!("{}/v1/payment_intents", self.api_base))
            .bearer_auth(&self.secret_key)
            .header("Idempotency-Key", &request.idempotency_key)
            .form(&params)
            .send()
            .await
            .map_err(|e| BakeryError::GatewayError(format!("stripe request failed: {e}")))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| BakeryError::GatewayError(format!("stripe response: {e}")))?;
        debug!(%status, idempotency_key = %request.idempotency_key, "stripe responded");

        if !status.is_success() {
            let error = serde_json::from_slice::<ErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or_default();
            return if status == StatusCode::PAYMENT_REQUIRED
                || error.kind.as_deref() == Some("card_error")
            {
                Ok(CaptureOutcome::Declined {
                    reason: error.reason(),
                })
            } else {
                Err(BakeryError::GatewayError(format!(
                    "stripe returned {status}: {}",
                    error.message.unwrap_or_default()
                )))
            };
        }

        let intent: PaymentIntent = serde_json::from_slice(&body)
            .map_err(|e| BakeryError::GatewayError(format!("unexpected stripe payload: {e}")))?;

        match intent.status.as_str() {
            "succeeded" => Ok(CaptureOutcome::Captured {
                reference: intent.id,
            }),
            "requires_payment_method" | "requires_action" | "canceled" => {
                Ok(CaptureOutcome::Declined {
                    reason: intent
                        .last_payment_error
                        .map(|e| e.reason())
                        .unwrap_or_else(|| format!("payment {}", intent.status.replace('_', " "))),
                })
            }
            other => Err(BakeryError::GatewayError(format!(
                "payment intent {} left in status '{other}'",
                intent.id
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> CaptureRequest {
        CaptureRequest {
            amount_minor_units: 2450,
            currency: "gbp".into(),
            payment_method_token: "pm_card_visa".into(),
            description: "Order #ARG123456789".into(),
            receipt_email: "grace@example.com".into(),
            idempotency_key: "ARG123456789".into(),
        }
    }

    async fn gateway(server: &MockServer) -> StripeGateway {
        StripeGateway::new("sk_test_123".into(), server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_succeeded_intent_is_captured() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .and(header("Idempotency-Key", "ARG123456789"))
            .and(body_string_contains("amount=2450"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": "pi_123", "status": "succeeded"})),
            )
            .mount(&server)
            .await;

        let outcome = gateway(&server).await.capture(&request()).await.unwrap();
        assert_eq!(
            outcome,
            CaptureOutcome::Captured {
                reference: "pi_123".into()
            }
        );
    }

    #[tokio::test]
    async fn test_card_error_is_a_decline_not_a_fault() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(402).set_body_json(json!({
                "error": {"type": "card_error", "message": "Your card has insufficient funds.", "decline_code": "insufficient_funds"}
            })))
            .mount(&server)
            .await;

        let outcome = gateway(&server).await.capture(&request()).await.unwrap();
        assert_eq!(
            outcome,
            CaptureOutcome::Declined {
                reason: "Your card has insufficient funds.".into()
            }
        );
    }

    #[tokio::test]
    async fn test_payment_required_without_card_error_is_a_decline() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(402).set_body_json(json!({
                "error": {"type": "invalid_request_error"}
            })))
            .mount(&server)
            .await;

        let outcome = gateway(&server).await.capture(&request()).await.unwrap();
        assert_eq!(
            outcome,
            CaptureOutcome::Declined {
                reason: "Your card was declined.".into()
            }
        );
    }

    #[tokio::test]
    async fn test_server_error_is_gateway_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "error": {"type": "api_error", "message": "Something went wrong"}
            })))
            .mount(&server)
            .await;

        let result = gateway(&server).await.capture(&request()).await;
        assert!(matches!(result, Err(BakeryError::GatewayError(_))));
    }

    #[tokio::test]
    async fn test_requires_action_is_declined() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"id": "pi_9", "status": "requires_action"})),
            )
            .mount(&server)
            .await;

        let outcome = gateway(&server).await.capture(&request()).await.unwrap();
        assert!(matches!(outcome, CaptureOutcome::Declined { .. }));
    }
}
