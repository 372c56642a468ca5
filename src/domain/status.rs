//! Finite state machines governing booking and order status.

use crate::error::{BakeryError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A status enum whose values form a directed transition graph.
pub trait Lifecycle: Copy + Eq + fmt::Display + Send + Sync + 'static {
    /// The status every new record starts in. Never client-settable.
    fn initial() -> Self;

    /// Statuses reachable in one step from `self`.
    fn successors(self) -> &'static [Self];

    fn is_terminal(self) -> bool {
        self.successors().is_empty()
    }

    fn can_transition_to(self, next: Self) -> bool {
        self.successors().contains(&next)
    }
}

/// Validates a single-step transition and returns the new status.
pub fn apply_transition<S: Lifecycle>(from: S, to: S) -> Result<S> {
    if from.can_transition_to(to) {
        Ok(to)
    } else {
        Err(BakeryError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Preparing,
    Ready,
    Delivered,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 7] = [
        Self::Pending,
        Self::Confirmed,
        Self::Preparing,
        Self::Ready,
        Self::Delivered,
        Self::Completed,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Preparing => "preparing",
            Self::Ready => "ready",
            Self::Delivered => "delivered",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Lifecycle for BookingStatus {
    fn initial() -> Self {
        Self::Pending
    }

    fn successors(self) -> &'static [Self] {
        use BookingStatus::*;
        match self {
            Pending => &[Confirmed, Cancelled],
            Confirmed => &[Preparing, Cancelled],
            Preparing => &[Ready, Cancelled],
            Ready => &[Delivered, Cancelled],
            Delivered => &[Completed, Cancelled],
            Completed | Cancelled => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    New,
    Processing,
    Ready,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        Self::New,
        Self::Processing,
        Self::Ready,
        Self::Completed,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Processing => "processing",
            Self::Ready => "ready",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Lifecycle for OrderStatus {
    fn initial() -> Self {
        Self::New
    }

    // Once ready the goods are prepared, so cancellation is no longer offered.
    fn successors(self) -> &'static [Self] {
        use OrderStatus::*;
        match self {
            New => &[Processing, Cancelled],
            Processing => &[Ready, Cancelled],
            Ready => &[Completed],
            Completed | Cancelled => &[],
        }
    }
}
