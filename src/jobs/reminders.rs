//! Booking reminders. Each run looks for unreminded bookings scheduled about
//! N hours from now (for every configured N), interleaves them by tenant so
//! one busy tenant cannot starve the others, and notifies with bounded
//! concurrency.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

use crate::config::JobsConfig;
use crate::database::models::Booking;
use crate::store::{BookingStore, StoreError};

#[derive(Debug, Error)]
#[error("Notification failed: {0}")]
pub struct NotifyError(pub String);

#[async_trait]
pub trait ReminderNotifier: Send + Sync {
    async fn send_reminder(&self, booking: &Booking, hours_before: f64) -> Result<(), NotifyError>;
}

/// Default notifier: records the reminder in the log.
pub struct LogNotifier;

#[async_trait]
impl ReminderNotifier for LogNotifier {
    async fn send_reminder(&self, booking: &Booking, hours_before: f64) -> Result<(), NotifyError> {
        info!(
            booking_id = %booking.id,
            tenant_id = %booking.tenant_id,
            scheduled_at = %booking.scheduled_at,
            hours_before,
            "Booking reminder"
        );
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderRunSummary {
    pub candidates: usize,
    pub sent: usize,
    pub already_sent: usize,
    pub failed: usize,
    pub tenants: usize,
}

enum Delivery {
    Sent,
    AlreadySent,
    Failed,
}

/// Candidates fetched per window, as a multiple of the batch size, so the
/// tenant interleaving has more than one tenant's bookings to choose from.
const CANDIDATE_FACTOR: usize = 4;

pub async fn send_due_reminders(
    bookings: &dyn BookingStore,
    notifier: Arc<dyn ReminderNotifier>,
    config: &JobsConfig,
    now: DateTime<Utc>,
) -> Result<ReminderRunSummary, StoreError> {
    let window = hours(config.reminder_window_hours);
    let mut seen = HashSet::new();
    let mut due = Vec::new();

    for &lead in &config.reminder_hours {
        let target = now + hours(lead);
        for booking in bookings
            .due_for_reminder(
                target - window,
                target + window,
                config.reminder_batch_size.saturating_mul(CANDIDATE_FACTOR),
            )
            .await?
        {
            if seen.insert(booking.id.clone()) {
                due.push((booking, lead));
            }
        }
    }

    let mut queue = round_robin_by_tenant(due, |(b, _)| b.tenant_id.clone());
    queue.truncate(config.reminder_batch_size);

    let mut summary = ReminderRunSummary {
        candidates: queue.len(),
        tenants: queue.iter().map(|(b, _)| b.tenant_id.as_str()).collect::<HashSet<_>>().len(),
        ..ReminderRunSummary::default()
    };

    for chunk in queue.chunks(config.reminder_concurrency.max(1)) {
        let results = join_all(chunk.iter().map(|(booking, lead)| deliver(bookings, notifier.as_ref(), booking, *lead))).await;
        for result in results {
            match result? {
                Delivery::Sent => summary.sent += 1,
                Delivery::AlreadySent => summary.already_sent += 1,
                Delivery::Failed => summary.failed += 1,
            }
        }
    }

    info!(
        candidates = summary.candidates,
        sent = summary.sent,
        already_sent = summary.already_sent,
        failed = summary.failed,
        tenants = summary.tenants,
        "Reminder run finished"
    );
    Ok(summary)
}

/// Marks first so overlapping runs never notify twice.
async fn deliver(
    bookings: &dyn BookingStore,
    notifier: &dyn ReminderNotifier,
    booking: &Booking,
    lead: f64,
) -> Result<Delivery, StoreError> {
    if !bookings.mark_reminded(&booking.id).await? {
        return Ok(Delivery::AlreadySent);
    }
    match notifier.send_reminder(booking, lead).await {
        Ok(()) => Ok(Delivery::Sent),
        Err(e) => {
            error!(booking_id = %booking.id, "Reminder not delivered: {}", e);
            Ok(Delivery::Failed)
        }
    }
}

/// Interleaves items by key, keeping each key's relative order and the order
/// in which keys first appear.
pub fn round_robin_by_tenant<T, F>(items: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> String,
{
    let mut groups: Vec<(String, VecDeque<T>)> = Vec::new();
    for item in items {
        let k = key(&item);
        match groups.iter_mut().find(|(g, _)| *g == k) {
            Some((_, queue)) => queue.push_back(item),
            None => groups.push((k, VecDeque::from([item]))),
        }
    }

    let mut out = Vec::new();
    loop {
        let mut progressed = false;
        for (_, queue) in groups.iter_mut() {
            if let Some(item) = queue.pop_front() {
                out.push(item);
                progressed = true;
            }
        }
        if !progressed {
            return out;
        }
    }
}

fn hours(value: f64) -> Duration {
    Duration::milliseconds((value * 3_600_000.0).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::store::MemoryStore;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(String, f64)>>,
    }

    #[async_trait]
    impl ReminderNotifier for RecordingNotifier {
        async fn send_reminder(&self, booking: &Booking, hours_before: f64) -> Result<(), NotifyError> {
            self.sent.lock().await.push((booking.id.clone(), hours_before));
            Ok(())
        }
    }

    fn booking(id: &str, tenant: &str, at: DateTime<Utc>) -> Booking {
        Booking {
            id: id.into(),
            tenant_id: tenant.into(),
            client_email: format!("{}@example.com", id),
            scheduled_at: at,
            reminder_sent: false,
        }
    }

    #[test]
    fn interleaves_tenants() {
        let items = vec![("a", 1), ("a", 2), ("a", 3), ("b", 1), ("c", 1), ("b", 2)];
        let ordered = round_robin_by_tenant(items, |(t, _)| t.to_string());
        assert_eq!(ordered, vec![("a", 1), ("b", 1), ("c", 1), ("a", 2), ("b", 2), ("a", 3)]);
    }

    #[tokio::test]
    async fn sends_each_window_once() {
        let now = Utc::now();
        let store = MemoryStore::new();
        store.insert_booking(booking("day", "t1", now + Duration::hours(24))).await;
        store.insert_booking(booking("soon", "t2", now + Duration::hours(2) + Duration::minutes(10))).await;
        store.insert_booking(booking("later", "t1", now + Duration::hours(10))).await;

        let notifier = Arc::new(RecordingNotifier::default());
        let config = AppConfig::development().jobs;
        let summary = send_due_reminders(&store, notifier.clone(), &config, now).await.unwrap();
        assert_eq!(summary.sent, 2);
        assert_eq!(summary.tenants, 2);

        let mut sent = notifier.sent.lock().await.clone();
        sent.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(sent, vec![("day".to_string(), 24.0), ("soon".to_string(), 2.0)]);

        let again = send_due_reminders(&store, notifier.clone(), &config, now).await.unwrap();
        assert_eq!(again.candidates, 0);
    }

    #[tokio::test]
    async fn batch_limit_is_shared_fairly() {
        let now = Utc::now();
        let store = MemoryStore::new();
        for i in 0..5 {
            store.insert_booking(booking(&format!("a{}", i), "busy", now + Duration::hours(2))).await;
        }
        store.insert_booking(booking("b0", "quiet", now + Duration::hours(2))).await;

        let config = JobsConfig { reminder_batch_size: 3, ..AppConfig::development().jobs };
        let notifier = Arc::new(RecordingNotifier::default());
        send_due_reminders(&store, notifier.clone(), &config, now).await.unwrap();

        let sent: Vec<String> = notifier.sent.lock().await.iter().map(|(id, _)| id.clone()).collect();
        assert_eq!(sent.len(), 3);
        assert!(sent.contains(&"b0".to_string()));
    }
}
