//! Adapters implementing the domain ports.

pub mod auth;
pub mod clock;
pub mod email;
pub mod in_memory;
pub mod payment;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
