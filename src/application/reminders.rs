//! Daily delivery-reminder scan.

use super::dispatch::NotificationDispatcher;
use crate::config::ReminderConfig;
use crate::domain::notification::{NotificationKind, Snapshot};
use crate::domain::ports::{SharedBookingStore, SharedClock};
use crate::domain::status::BookingStatus;
use crate::error::{BakeryError, Result};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

/// Statuses that still get a reminder before delivery.
pub const REMINDABLE: [BookingStatus; 2] = [BookingStatus::Confirmed, BookingStatus::Preparing];

/// Summary of one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderReport {
    pub target_day: Option<NaiveDate>,
    pub matched: usize,
    pub sent: usize,
    pub failed: usize,
    /// Already reminded today according to the ledger.
    pub skipped: usize,
}

#[derive(Clone)]
pub struct ReminderTask {
    bookings: SharedBookingStore,
    dispatcher: NotificationDispatcher,
    config: ReminderConfig,
}

impl ReminderTask {
    pub fn new(
        bookings: SharedBookingStore,
        dispatcher: NotificationDispatcher,
        config: ReminderConfig,
    ) -> Self {
        Self {
            bookings,
            dispatcher,
            config,
        }
    }

    /// Reminds every confirmed or preparing booking delivered on the local day
    /// `lead_days` after `now`. Each send is independent.
    #[instrument(skip(self))]
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<ReminderReport> {
        let offset = self.config.utc_offset;
        let today = now.with_timezone(&offset).date_naive();
        let target = today + Duration::days(self.config.lead_days);
        let (start, end) = local_day_window(target, offset)?;

        let due = self.bookings.find_due(start, end, &REMINDABLE).await?;
        let mut report = ReminderReport {
            target_day: Some(target),
            matched: due.len(),
            ..Default::default()
        };

        for booking in due {
            if self.config.ledger && booking.last_reminder_sent_on == Some(today) {
                report.skipped += 1;
                continue;
            }
            let id = booking.id;
            let outcome = self
                .dispatcher
                .notify(NotificationKind::DeliveryReminder, Snapshot::Booking(booking))
                .await;
            if !outcome.is_sent() {
                report.failed += 1;
                continue;
            }
            report.sent += 1;
            if self.config.ledger
                && let Err(e) = self.bookings.mark_reminded(id, today).await
            {
                warn!(booking_id = %id, error = %e, "could not record reminder");
            }
        }

        info!(
            target_day = %target,
            matched = report.matched,
            sent = report.sent,
            failed = report.failed,
            skipped = report.skipped,
            "reminder scan finished"
        );
        Ok(report)
    }

    /// Runs the scan once per day at the configured local hour until `cancel`
    /// fires. Runs never overlap.
    pub async fn run_scheduler(self, clock: SharedClock, cancel: CancellationToken) -> Result<()> {
        loop {
            let now = clock.now();
            let next = next_run_after(now, self.config.run_hour, self.config.utc_offset)?;
            let wait = (next - now).to_std().unwrap_or_default();
            info!(next_run = %next, "reminder scan scheduled");

            tokio::select! {
                () = cancel.cancelled() => {
                    info!("reminder scheduler stopped");
                    return Ok(());
                }
                () = tokio::time::sleep(wait) => {
                    if let Err(e) = self.run_once(clock.now()).await {
                        error!(error = %e, "reminder scan failed");
                    }
                }
            }
        }
    }
}

/// UTC bounds of a local calendar day: `[00:00:00, 23:59:59.999]`.
pub fn local_day_window(
    day: NaiveDate,
    offset: FixedOffset,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let start = day
        .and_time(NaiveTime::MIN)
        .and_local_timezone(offset)
        .single()
        .ok_or_else(|| BakeryError::internal(format!("no local midnight for {day}")))?
        .with_timezone(&Utc);
    Ok((start, start + Duration::days(1) - Duration::milliseconds(1)))
}

/// The first instant strictly after `now` at `hour:00` local time.
pub fn next_run_after(
    now: DateTime<Utc>,
    hour: u32,
    offset: FixedOffset,
) -> Result<DateTime<Utc>> {
    let local_now = now.with_timezone(&offset);
    let at = NaiveTime::from_hms_opt(hour, 0, 0)
        .ok_or_else(|| BakeryError::ValidationError(format!("invalid reminder hour {hour}")))?;
    let mut candidate = local_now.date_naive().and_time(at);
    if candidate <= local_now.naive_local() {
        candidate += Duration::days(1);
    }
    candidate
        .and_local_timezone(offset)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| BakeryError::internal(format!("no local time {candidate}")))
}
