//! Request-level facade over the core: authorization, envelopes and the
//! operations behind each endpoint.

use crate::application::orchestrator::Orchestrator;
use crate::application::status::StatusManager;
use crate::domain::booking::{Booking, BookingId, NewBooking, PublicBooking};
use crate::domain::notification::ContactMessage;
use crate::domain::order::{CheckoutRequest, Order, OrderNumber, PublicOrder};
use crate::domain::ports::{Principal, Role, SharedAuthorizer, SharedBookingStore, SharedOrderStore};
use crate::domain::status::{BookingStatus, OrderStatus};
use crate::error::{BakeryError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, warn};
use uuid::Uuid;

/// One API call, as read from a request stream.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ApiRequest {
    CreateBooking { booking: NewBooking },
    SetBookingStatus { id: BookingId, status: BookingStatus },
    GetBooking { id: BookingId },
    PublicBooking { id: BookingId },
    ListBookings,
    DeleteBooking { id: BookingId },
    Checkout { order: CheckoutRequest },
    GetOrder { order_number: String },
    ListOrders,
    SetOrderStatus { order_number: String, status: OrderStatus },
    MarkOrderPaid { order_number: String },
    Contact { message: ContactMessage },
    Health,
}

/// A request plus its optional bearer credential.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestLine {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(flatten)]
    pub request: ApiRequest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
}

/// Uniform response: `{success, data}` or `{success, error}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    #[serde(skip)]
    pub status: u16,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Envelope {
    pub fn ok<T: Serialize>(status: u16, data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(data) => Self {
                status,
                success: true,
                data: Some(data),
                error: None,
            },
            Err(e) => Self::from_error(&BakeryError::from(e)),
        }
    }

    /// Internal details are logged and replaced with a generic message.
    pub fn from_error(err: &BakeryError) -> Self {
        let status = err.status_code();
        let message = match err {
            BakeryError::PaymentUnrecorded { .. } => err.to_string(),
            BakeryError::GatewayError(_) => {
                "The payment service is unavailable, please try again".to_string()
            }
            _ if err.is_user_correctable() => err.to_string(),
            _ => {
                error!(error = %err, "request failed");
                "Internal server error".to_string()
            }
        };
        Self {
            status,
            success: false,
            data: None,
            error: Some(ErrorBody {
                kind: err.kind().to_string(),
                message,
            }),
        }
    }

    pub fn respond<T: Serialize>(status: u16, result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(status, &data),
            Err(e) => Self::from_error(&e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    pub service: &'static str,
    pub version: &'static str,
    pub store_reachable: bool,
}

#[derive(Clone)]
pub struct ApiService {
    orchestrator: Orchestrator,
    status: StatusManager,
    bookings: SharedBookingStore,
    orders: SharedOrderStore,
    authorizer: SharedAuthorizer,
}

impl ApiService {
    pub fn new(
        orchestrator: Orchestrator,
        status: StatusManager,
        bookings: SharedBookingStore,
        orders: SharedOrderStore,
        authorizer: SharedAuthorizer,
    ) -> Self {
        Self {
            orchestrator,
            status,
            bookings,
            orders,
            authorizer,
        }
    }

    /// Runs one request and wraps the outcome in an [`Envelope`].
    pub async fn handle(&self, line: RequestLine) -> Envelope {
        let token = line.token.as_deref();
        match line.request {
            ApiRequest::CreateBooking { booking } => {
                Envelope::respond(201, self.create_booking(booking).await)
            }
            ApiRequest::SetBookingStatus { id, status } => {
                Envelope::respond(200, self.set_booking_status(token, id, status).await)
            }
            ApiRequest::GetBooking { id } => Envelope::respond(200, self.get_booking(token, id).await),
            ApiRequest::PublicBooking { id } => Envelope::respond(200, self.public_booking(id).await),
            ApiRequest::ListBookings => Envelope::respond(200, self.list_bookings(token).await),
            ApiRequest::DeleteBooking { id } => {
                Envelope::respond(200, self.delete_booking(token, id).await)
            }
            ApiRequest::Checkout { order } => Envelope::respond(201, self.checkout(order).await),
            ApiRequest::GetOrder { order_number } => {
                Envelope::respond(200, self.get_order(&order_number).await)
            }
            ApiRequest::ListOrders => Envelope::respond(200, self.list_orders(token).await),
            ApiRequest::SetOrderStatus {
                order_number,
                status,
            } => Envelope::respond(
                200,
                self.set_order_status(token, &order_number, status).await,
            ),
            ApiRequest::MarkOrderPaid { order_number } => {
                Envelope::respond(200, self.mark_order_paid(token, &order_number).await)
            }
            ApiRequest::Contact { message } => Envelope::respond(
                200,
                self.contact(message)
                    .await
                    .map(|()| serde_json::json!({"message": "Thanks, we'll be in touch soon"})),
            ),
            ApiRequest::Health => Envelope::ok(200, &self.health().await),
        }
    }

    pub async fn create_booking(&self, input: NewBooking) -> Result<Booking> {
        self.orchestrator.create_booking(input).await
    }

    pub async fn set_booking_status(
        &self,
        token: Option<&str>,
        id: BookingId,
        status: BookingStatus,
    ) -> Result<Booking> {
        self.require_admin(token)?;
        self.status.transition_booking(id, status).await
    }

    pub async fn get_booking(&self, token: Option<&str>, id: BookingId) -> Result<Booking> {
        self.require_admin(token)?;
        self.find_booking(id).await
    }

    pub async fn public_booking(&self, id: BookingId) -> Result<PublicBooking> {
        self.find_booking(id).await.map(|b| PublicBooking::from(&b))
    }

    /// All bookings, newest first.
    pub async fn list_bookings(&self, token: Option<&str>) -> Result<Vec<Booking>> {
        self.require_admin(token)?;
        let mut bookings = self.bookings.get_all().await?;
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    /// Hard delete.
    pub async fn delete_booking(&self, token: Option<&str>, id: BookingId) -> Result<Booking> {
        let admin = self.require_admin(token)?;
        let removed = self
            .bookings
            .delete(id)
            .await?
            .ok_or_else(|| BakeryError::NotFound(format!("booking {id}")))?;
        warn!(booking_id = %id, admin = %admin.user_id, "booking deleted");
        Ok(removed)
    }

    pub async fn checkout(&self, request: CheckoutRequest) -> Result<Order> {
        self.orchestrator.checkout(request).await
    }

    pub async fn get_order(&self, order_number: &str) -> Result<PublicOrder> {
        let number = OrderNumber::parse(order_number)?;
        self.find_order(&number).await.map(|o| PublicOrder::from(&o))
    }

    /// All orders, newest first.
    pub async fn list_orders(&self, token: Option<&str>) -> Result<Vec<Order>> {
        self.require_admin(token)?;
        let mut orders = self.orders.get_all().await?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    pub async fn set_order_status(
        &self,
        token: Option<&str>,
        order_number: &str,
        status: OrderStatus,
    ) -> Result<Order> {
        self.require_admin(token)?;
        let number = OrderNumber::parse(order_number)?;
        self.status.transition_order(&number, status).await
    }

    pub async fn mark_order_paid(&self, token: Option<&str>, order_number: &str) -> Result<Order> {
        self.require_admin(token)?;
        let number = OrderNumber::parse(order_number)?;
        self.status.mark_order_paid(&number).await
    }

    pub async fn contact(&self, message: ContactMessage) -> Result<()> {
        self.orchestrator.submit_contact(message).await
    }

    pub async fn health(&self) -> Health {
        Health {
            service: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            store_reachable: self.bookings.get(Uuid::nil()).await.is_ok(),
        }
    }

    fn require_admin(&self, token: Option<&str>) -> Result<Principal> {
        let token =
            token.ok_or_else(|| BakeryError::Unauthorized("No token provided".to_string()))?;
        let principal = self.authorizer.authorize(token)?;
        if principal.role != Role::Admin {
            return Err(BakeryError::Forbidden("Admin access required".to_string()));
        }
        Ok(principal)
    }

    async fn find_booking(&self, id: BookingId) -> Result<Booking> {
        self.bookings
            .get(id)
            .await?
            .ok_or_else(|| BakeryError::NotFound(format!("booking {id}")))
    }

    async fn find_order(&self, number: &OrderNumber) -> Result<Order> {
        self.orders
            .get(number)
            .await?
            .ok_or_else(|| BakeryError::NotFound(format!("order {number}")))
    }
}
