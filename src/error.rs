use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum BakeryError {
    #[error("Validation error: {0}")]
    #[diagnostic(code(cakehouse::validation))]
    ValidationError(String),

    #[error("Payment declined: {0}")]
    #[diagnostic(code(cakehouse::payment_declined))]
    PaymentDeclined(String),

    #[error("Not found: {0}")]
    #[diagnostic(code(cakehouse::not_found))]
    NotFound(String),

    #[error("Invalid status transition from '{from}' to '{to}'")]
    #[diagnostic(code(cakehouse::invalid_transition))]
    InvalidTransition { from: String, to: String },

    #[error("Conflict: {0}")]
    #[diagnostic(code(cakehouse::conflict))]
    Conflict(String),

    /// Raised by stores when a unique key already exists.
    #[error("Duplicate key: {0}")]
    #[diagnostic(code(cakehouse::duplicate_key))]
    DuplicateKey(String),

    #[error("Unauthorized: {0}")]
    #[diagnostic(code(cakehouse::unauthorized))]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    #[diagnostic(code(cakehouse::forbidden))]
    Forbidden(String),

    #[error("Payment gateway error: {0}")]
    #[diagnostic(code(cakehouse::gateway))]
    GatewayError(String),

    #[error("Notification error: {0}")]
    #[diagnostic(code(cakehouse::notification))]
    NotificationError(String),

    /// Money was captured but no record could be written.
    #[error(
        "Payment {reference} was captured but the record could not be saved; the business has been alerted"
    )]
    #[diagnostic(
        code(cakehouse::payment_unrecorded),
        help("quote the payment reference when contacting the business")
    )]
    PaymentUnrecorded { reference: String },

    #[error("IO error: {0}")]
    #[diagnostic(code(cakehouse::io))]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    #[diagnostic(code(cakehouse::csv))]
    CsvError(#[from] csv::Error),

    #[error("JSON error: {0}")]
    #[diagnostic(code(cakehouse::json))]
    JsonError(#[from] serde_json::Error),

    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    #[diagnostic(code(cakehouse::rocksdb))]
    RocksDbError(#[from] rocksdb::Error),

    #[error("Internal error: {0}")]
    #[diagnostic(code(cakehouse::internal))]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

impl BakeryError {
    /// Wraps any message as an internal fault.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into().into())
    }

    /// Stable machine-readable category used in response envelopes.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ValidationError(_) => "validation_error",
            Self::PaymentDeclined(_) => "payment_declined",
            Self::NotFound(_) => "not_found",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::Conflict(_) | Self::DuplicateKey(_) => "conflict",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::PaymentUnrecorded { .. } => "payment_unrecorded",
            _ => "internal_error",
        }
    }

    /// HTTP-equivalent status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::ValidationError(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::PaymentDeclined(_) => 402,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::InvalidTransition { .. } | Self::Conflict(_) | Self::DuplicateKey(_) => 409,
            Self::GatewayError(_) => 502,
            _ => 500,
        }
    }

    /// Whether the caller can fix the request and try again.
    pub fn is_user_correctable(&self) -> bool {
        self.status_code() < 500
    }
}

pub type Result<T> = std::result::Result<T, BakeryError>;
