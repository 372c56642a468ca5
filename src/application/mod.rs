//! Application layer: the order and booking lifecycle around the domain ports.
//!
//! [`orchestrator::Orchestrator`] creates bookings and orders,
//! [`status::StatusManager`] moves them through their state machines, and
//! [`reminders::ReminderTask`] runs the daily delivery scan. All notification
//! goes through [`dispatch::NotificationDispatcher`], which never fails its caller.

pub mod dispatch;
pub mod orchestrator;
pub mod reminders;
pub mod retry;
pub mod status;
