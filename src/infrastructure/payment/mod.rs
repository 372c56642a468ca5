//! PaymentGateway adapters.

pub mod simulated;
pub mod stripe;

pub use simulated::SimulatedGateway;
pub use stripe::StripeGateway;
