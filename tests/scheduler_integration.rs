//! Scheduler loop integration tests
//!
//! Run the real loop on a short interval against in-memory stores.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use ara_notification_engine::channel::{ChannelDispatcher, ChannelError, ChannelSender};
use ara_notification_engine::clock::{Clock, SystemClock};
use ara_notification_engine::config::SchedulerConfig;
use ara_notification_engine::notification::{
    Notification, NotificationEngine, NotificationRequest, NotificationStatus, NotificationType,
};
use ara_notification_engine::scheduler::Scheduler;
use ara_notification_engine::store::Stores;

/// Sender that takes a while to deliver
struct SlowSender {
    delay: Duration,
    calls: AtomicUsize,
}

#[async_trait]
impl ChannelSender for SlowSender {
    async fn send(&self, _notification: &Notification) -> Result<(), ChannelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(())
    }

    async fn test_connection(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}

fn create_engine(delay: Duration) -> (Arc<NotificationEngine>, Arc<SlowSender>) {
    let sender = Arc::new(SlowSender {
        delay,
        calls: AtomicUsize::new(0),
    });
    let stores = Stores::memory();
    let dispatcher = ChannelDispatcher::new(sender.clone(), sender.clone(), sender.clone());
    let engine = Arc::new(NotificationEngine::new(
        stores.notifications.clone(),
        stores.templates.clone(),
        Arc::new(dispatcher),
        Arc::new(SystemClock),
    ));
    (engine, sender)
}

fn reminder() -> NotificationRequest {
    NotificationRequest::new(NotificationType::InApp, "Reminder", "Stand-up in 5", "user-1")
}

#[tokio::test]
async fn test_stop_drains_in_flight_tick() {
    let (engine, sender) = create_engine(Duration::from_millis(150));
    let due = engine
        .schedule(reminder(), engine.clock().now())
        .await
        .unwrap();

    let scheduler = Scheduler::with_interval(engine.clone(), Duration::from_secs(60));
    assert!(scheduler.start().await);

    // First tick fires immediately and is now inside the slow send
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(sender.calls.load(Ordering::SeqCst), 1);

    assert!(scheduler.stop().await);

    let stored = engine.get(due.id).await.unwrap();
    assert_eq!(stored.status, NotificationStatus::Sent);
}

#[tokio::test]
async fn test_no_tick_after_stop() {
    let (engine, sender) = create_engine(Duration::from_millis(1));
    let scheduler = Scheduler::with_interval(engine.clone(), Duration::from_millis(10));

    scheduler.start().await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    scheduler.stop().await;

    let late = engine
        .schedule(reminder(), engine.clock().now())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let stored = engine.get(late.id).await.unwrap();
    assert_eq!(stored.status, NotificationStatus::Scheduled);
    assert_eq!(sender.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_scheduler_from_config() {
    let (engine, _) = create_engine(Duration::from_millis(1));
    let config = SchedulerConfig {
        enabled: true,
        interval_seconds: 1,
        ..SchedulerConfig::default()
    };
    let scheduler = Scheduler::new(engine, &config);

    assert!(!scheduler.is_running().await);
    assert!(scheduler.start().await);
    assert!(scheduler.is_running().await);
    assert!(scheduler.stop().await);
}
