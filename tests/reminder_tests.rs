mod common;

use cakehouse::application::dispatch::NotificationDispatcher;
use cakehouse::application::reminders::ReminderTask;
use cakehouse::config::ReminderConfig;
use cakehouse::domain::booking::Booking;
use cakehouse::domain::notification::NotificationKind;
use cakehouse::domain::ports::{BookingStore, SharedNotifier};
use cakehouse::domain::status::BookingStatus;
use cakehouse::infrastructure::in_memory::InMemoryBookingStore;
use chrono::{DateTime, TimeZone, Utc};
use common::*;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

fn scan_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 7, 1, 9, 0, 0).unwrap()
}

fn booking(email: &str, status: BookingStatus, hour: u32) -> Booking {
    let mut booking = sample_booking(email);
    booking.status = status;
    booking.delivery_date = Utc.with_ymd_and_hms(2026, 7, 3, hour, 30, 0).unwrap();
    booking
}

async fn task_with(
    bookings: Vec<Booking>,
    notifier: SharedNotifier,
) -> (ReminderTask, Arc<InMemoryBookingStore>) {
    let store = Arc::new(InMemoryBookingStore::new());
    for b in bookings {
        store.insert(b).await.unwrap();
    }
    let task = ReminderTask::new(
        store.clone(),
        NotificationDispatcher::new(notifier, Duration::from_secs(1)),
        ReminderConfig::default(),
    );
    (task, store)
}

#[tokio::test]
async fn test_two_confirmed_one_cancelled_sends_two() {
    let notifier = Arc::new(RecordingNotifier::default());
    let (task, _) = task_with(
        vec![
            booking("a@example.com", BookingStatus::Confirmed, 0),
            booking("b@example.com", BookingStatus::Confirmed, 23),
            booking("c@example.com", BookingStatus::Cancelled, 12),
        ],
        notifier.clone(),
    )
    .await;

    let report = task.run_once(scan_time()).await.unwrap();

    assert_eq!(report.matched, 2);
    assert_eq!(report.sent, 2);
    let sent = notifier.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|(k, _)| *k == NotificationKind::DeliveryReminder));
    assert!(!sent.iter().any(|(_, to)| to == "c@example.com"));
}

#[tokio::test]
async fn test_one_failed_send_does_not_stop_the_rest() {
    let notifier = Arc::new(FailingNotifier::for_address("a@example.com"));
    let (task, _) = task_with(
        vec![
            booking("a@example.com", BookingStatus::Confirmed, 8),
            booking("b@example.com", BookingStatus::Preparing, 9),
            booking("c@example.com", BookingStatus::Confirmed, 10),
        ],
        notifier.clone(),
    )
    .await;

    let report = task.run_once(scan_time()).await.unwrap();

    assert_eq!(report.matched, 3);
    assert_eq!(report.failed, 1);
    assert_eq!(report.sent, 2);
    assert_eq!(notifier.attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_bookings_outside_target_day_are_ignored() {
    let notifier = Arc::new(RecordingNotifier::default());
    let mut tomorrow = booking("t@example.com", BookingStatus::Confirmed, 12);
    tomorrow.delivery_date = Utc.with_ymd_and_hms(2026, 7, 2, 23, 59, 59).unwrap();
    let mut later = booking("l@example.com", BookingStatus::Confirmed, 12);
    later.delivery_date = Utc.with_ymd_and_hms(2026, 7, 4, 0, 0, 0).unwrap();
    let (task, _) = task_with(vec![tomorrow, later], notifier.clone()).await;

    let report = task.run_once(scan_time()).await.unwrap();

    assert_eq!(report.matched, 0);
    assert!(notifier.kinds().is_empty());
}
