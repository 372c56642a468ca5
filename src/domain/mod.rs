//! Domain layer: records, value objects, status machines and the ports the
//! application layer talks through.

pub mod booking;
pub mod money;
pub mod notification;
pub mod order;
pub mod ports;
pub mod status;
pub mod validation;
