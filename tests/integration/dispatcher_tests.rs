//! Integration tests for the open-event state machine.
//!
//! Validates:
//! - An accepted open stores a notification, bumps `opentimes`, and notifies
//! - Event time equals observation time plus the task's adjust
//! - The open limit stops further notifications, including under concurrency
//! - Too-long IDs, missing tasks, store and notifier failures end quietly

use std::sync::Arc;

use chrono::{TimeDelta, TimeZone, Utc};

use email_tracker::clock::LocalZone;
use email_tracker::models::task::Task;
use email_tracker::persistence::Database;
use email_tracker::tracker::{DispatchOutcome, OpenDispatcher, OpenRequest, MAX_TASK_ID_LEN};

use super::test_helpers::{
    insert_task, memory_store, FailingStore, Reply, ScriptedNotifier, TEST_OPEN_LIMIT,
};

fn zone() -> LocalZone {
    LocalZone::from_offset_minutes(480).expect("zone")
}

fn dispatcher(db: Arc<dyn Database>, notifier: Arc<ScriptedNotifier>) -> Arc<OpenDispatcher> {
    Arc::new(OpenDispatcher::new(db, notifier, TEST_OPEN_LIMIT, zone()))
}

fn sample_task(adjust: TimeDelta) -> Task {
    let submit_at = Utc::now().with_timezone(&zone().offset()) + adjust;
    Task::new("sender@example.com".into(), "quarterly report".into(), submit_at, adjust)
}

fn open_request(task_id: &str, ip: &str) -> OpenRequest {
    OpenRequest {
        task_id: task_id.to_owned(),
        ip: ip.to_owned(),
        user_agent: "Mozilla/5.0 (Test Mail)".to_owned(),
    }
}

// ── Accepted open ────────────────────────────────────────────

#[tokio::test]
async fn accepted_open_records_notification_and_notifies_sender() {
    let store = memory_store().await;
    let notifier = ScriptedNotifier::accepting();
    let task = insert_task(store.as_ref(), sample_task(TimeDelta::zero())).await;
    let dispatcher = dispatcher(store.clone(), notifier.clone());

    let outcome = dispatcher
        .handle(open_request(&task.id, "203.0.113.5"), Utc::now())
        .await;
    assert_eq!(outcome, DispatchOutcome::Dispatched);

    let stored = store.find_task(&task.id).await.expect("find").expect("exists");
    assert_eq!(stored.opentimes, 1);

    let notifications = store.notifications_for_task(&task.id).await.expect("list");
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].task_id, task.id);
    assert_eq!(notifications[0].event.ip, "203.0.113.5");
    assert_eq!(notifications[0].event.user_agent, "Mozilla/5.0 (Test Mail)");

    let sent = notifier.sent.lock().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "sender@example.com");
    assert!(sent[0].1.subject.contains("quarterly report"));
    assert!(sent[0].1.body.contains("203.0.113.5"));
}

#[tokio::test]
async fn event_time_is_observation_time_plus_adjust() {
    let store = memory_store().await;
    let task = insert_task(store.as_ref(), sample_task(TimeDelta::hours(-1))).await;
    let dispatcher = dispatcher(store.clone(), ScriptedNotifier::accepting());

    let observed_at = Utc
        .with_ymd_and_hms(2024, 5, 6, 7, 8, 9)
        .single()
        .expect("valid instant");
    dispatcher
        .handle(open_request(&task.id, "198.51.100.1"), observed_at)
        .await;

    let notifications = store.notifications_for_task(&task.id).await.expect("list");
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].event.time, observed_at - TimeDelta::hours(1));
}

#[tokio::test]
async fn spawned_dispatch_completes_detached() {
    let store = memory_store().await;
    let task = insert_task(store.as_ref(), sample_task(TimeDelta::zero())).await;
    let dispatcher = dispatcher(store.clone(), ScriptedNotifier::accepting());

    let handle = dispatcher
        .spawn(open_request(&task.id, "192.0.2.10"))
        .expect("accepted id spawns");
    assert_eq!(handle.await.expect("join"), DispatchOutcome::Dispatched);
}

// ── Open limit ───────────────────────────────────────────────

#[tokio::test]
async fn task_at_limit_produces_no_notification() {
    let store = memory_store().await;
    let notifier = ScriptedNotifier::accepting();
    let mut task = sample_task(TimeDelta::zero());
    task.opentimes = TEST_OPEN_LIMIT;
    let task = insert_task(store.as_ref(), task).await;
    let dispatcher = dispatcher(store.clone(), notifier.clone());

    let before = store.status(Utc::now()).await.expect("status").total.notification;
    let outcome = dispatcher
        .handle(open_request(&task.id, "203.0.113.5"), Utc::now())
        .await;
    let after = store.status(Utc::now()).await.expect("status").total.notification;

    assert_eq!(outcome, DispatchOutcome::Limited);
    assert_eq!(before, after);
    assert_eq!(notifier.sent_count().await, 0);
    let stored = store.find_task(&task.id).await.expect("find").expect("exists");
    assert_eq!(stored.opentimes, TEST_OPEN_LIMIT);
}

#[tokio::test]
async fn opens_beyond_limit_are_limited() {
    let store = memory_store().await;
    let task = insert_task(store.as_ref(), sample_task(TimeDelta::zero())).await;
    let dispatcher = dispatcher(store.clone(), ScriptedNotifier::accepting());

    for i in 0..TEST_OPEN_LIMIT {
        let outcome = dispatcher
            .handle(open_request(&task.id, &format!("10.0.0.{i}")), Utc::now())
            .await;
        assert_eq!(outcome, DispatchOutcome::Dispatched);
    }
    let outcome = dispatcher
        .handle(open_request(&task.id, "10.0.1.1"), Utc::now())
        .await;
    assert_eq!(outcome, DispatchOutcome::Limited);

    let notifications = store.notifications_for_task(&task.id).await.expect("list");
    assert_eq!(notifications.len(), TEST_OPEN_LIMIT as usize);
}

#[tokio::test]
async fn concurrent_opens_never_exceed_limit() {
    let store = memory_store().await;
    let notifier = ScriptedNotifier::accepting();
    let task = insert_task(store.as_ref(), sample_task(TimeDelta::zero())).await;
    let dispatcher = dispatcher(store.clone(), notifier.clone());

    let handles: Vec<_> = (0..10)
        .map(|i| {
            dispatcher
                .spawn(open_request(&task.id, &format!("172.16.0.{i}")))
                .expect("spawned")
        })
        .collect();

    let mut dispatched = 0;
    for handle in handles {
        match handle.await.expect("join") {
            DispatchOutcome::Dispatched => dispatched += 1,
            DispatchOutcome::Limited => {}
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    assert_eq!(dispatched, TEST_OPEN_LIMIT);
    assert_eq!(notifier.sent_count().await, TEST_OPEN_LIMIT as usize);
    let stored = store.find_task(&task.id).await.expect("find").expect("exists");
    assert_eq!(stored.opentimes, TEST_OPEN_LIMIT);
}

// ── Quiet terminal states ────────────────────────────────────

#[tokio::test]
async fn overlong_task_id_is_ignored_without_spawning() {
    let store = memory_store().await;
    let notifier = ScriptedNotifier::accepting();
    let dispatcher = dispatcher(store.clone(), notifier.clone());
    let long_id = "a".repeat(MAX_TASK_ID_LEN + 1);

    assert!(dispatcher.spawn(open_request(&long_id, "1.2.3.4")).is_none());
    let outcome = dispatcher
        .handle(open_request(&long_id, "1.2.3.4"), Utc::now())
        .await;
    assert_eq!(outcome, DispatchOutcome::Ignored);
    assert_eq!(notifier.sent_count().await, 0);
}

#[tokio::test]
async fn id_at_length_bound_is_looked_up() {
    let store = memory_store().await;
    let dispatcher = dispatcher(store.clone(), ScriptedNotifier::accepting());
    let id = "b".repeat(MAX_TASK_ID_LEN);

    let outcome = dispatcher.handle(open_request(&id, "1.2.3.4"), Utc::now()).await;
    assert_eq!(outcome, DispatchOutcome::TaskMissing);
}

#[tokio::test]
async fn unknown_task_is_missing() {
    let store = memory_store().await;
    let notifier = ScriptedNotifier::accepting();
    let dispatcher = dispatcher(store.clone(), notifier.clone());

    let outcome = dispatcher
        .handle(open_request("does-not-exist", "1.2.3.4"), Utc::now())
        .await;
    assert_eq!(outcome, DispatchOutcome::TaskMissing);
    assert_eq!(notifier.sent_count().await, 0);
}

#[tokio::test]
async fn failing_store_ends_without_notifying() {
    let notifier = ScriptedNotifier::accepting();
    let dispatcher = dispatcher(Arc::new(FailingStore), notifier.clone());

    let outcome = dispatcher
        .handle(open_request("0123456789abcdef", "1.2.3.4"), Utc::now())
        .await;
    assert_eq!(outcome, DispatchOutcome::StoreFailed);
    assert_eq!(notifier.sent_count().await, 0);
}

#[tokio::test]
async fn transport_error_is_dispatch_failure_but_notification_is_kept() {
    let store = memory_store().await;
    let task = insert_task(store.as_ref(), sample_task(TimeDelta::zero())).await;
    let dispatcher = dispatcher(store.clone(), ScriptedNotifier::new(Reply::TransportError));

    let outcome = dispatcher
        .handle(open_request(&task.id, "1.2.3.4"), Utc::now())
        .await;
    assert_eq!(outcome, DispatchOutcome::DispatchFailed);

    let notifications = store.notifications_for_task(&task.id).await.expect("list");
    assert_eq!(notifications.len(), 1);
}

#[tokio::test]
async fn non_accepted_status_is_dispatch_failure() {
    let store = memory_store().await;
    let task = insert_task(store.as_ref(), sample_task(TimeDelta::zero())).await;
    let dispatcher = dispatcher(store.clone(), ScriptedNotifier::new(Reply::Status(401)));

    let outcome = dispatcher
        .handle(open_request(&task.id, "1.2.3.4"), Utc::now())
        .await;
    assert_eq!(outcome, DispatchOutcome::DispatchFailed);
}

#[tokio::test]
async fn ok_status_other_than_accepted_is_dispatch_failure() {
    let store = memory_store().await;
    let task = insert_task(store.as_ref(), sample_task(TimeDelta::zero())).await;
    let dispatcher = dispatcher(store.clone(), ScriptedNotifier::new(Reply::Status(200)));

    let outcome = dispatcher
        .handle(open_request(&task.id, "1.2.3.4"), Utc::now())
        .await;
    assert_eq!(outcome, DispatchOutcome::DispatchFailed);
}
