use chrono::{DateTime, TimeDelta, TimeZone, Utc};

use email_tracker::models::notification::Notification;
use email_tracker::models::status::Status;
use email_tracker::models::task::Task;

#[test]
fn new_task_is_unsaved_and_unopened() {
    let submit_at = DateTime::parse_from_rfc3339("2024-03-01T09:30:00+08:00").expect("rfc3339");
    let task = Task::new("a@b.com".into(), "hi".into(), submit_at, TimeDelta::minutes(5));
    assert!(task.id.is_empty());
    assert_eq!(task.opentimes, 0);
    assert_eq!(task.adjust, TimeDelta::minutes(5));
}

#[test]
fn task_adjust_serializes_as_seconds() {
    let submit_at = DateTime::parse_from_rfc3339("2024-03-01T09:30:00+08:00").expect("rfc3339");
    let task = Task::new("a@b.com".into(), "hi".into(), submit_at, TimeDelta::hours(-1));

    let json = serde_json::to_value(&task).expect("serialize");
    assert_eq!(json["adjust"], -3600);
    assert_eq!(json["submit_at"], "2024-03-01T09:30:00+08:00");

    let back: Task = serde_json::from_value(json).expect("deserialize");
    assert_eq!(back, task);
}

#[test]
fn notification_time_is_observation_plus_adjust() {
    let observed = Utc
        .with_ymd_and_hms(2024, 3, 1, 12, 0, 0)
        .single()
        .expect("instant");
    let n = Notification::new(
        "task-1".into(),
        "1.2.3.4".into(),
        "Mail/1".into(),
        observed,
        TimeDelta::hours(-1),
    );
    assert_eq!(n.event.time, observed - TimeDelta::hours(1));
    assert_eq!(n.task_id, "task-1");
    assert_eq!(n.id.len(), 40);
}

#[test]
fn status_defaults_to_zero() {
    let status = Status::default();
    assert_eq!(status.daily.task_submit, 0);
    assert_eq!(status.total.notification, 0);

    let json = serde_json::to_value(status).expect("serialize");
    assert_eq!(json["daily"]["task_submit"], 0);
    assert_eq!(json["total"]["notification"], 0);
}
