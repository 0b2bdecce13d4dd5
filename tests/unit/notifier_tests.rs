//! Unit tests for notification rendering and the notifier backends.
//!
//! The `SendGrid` client is exercised against a local axum stub that
//! records what it receives.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use chrono::{TimeDelta, TimeZone, Utc};
use tokio::sync::Mutex;

use email_tracker::clock::LocalZone;
use email_tracker::config::{NotifierConfig, NotifierProvider};
use email_tracker::models::notification::Notification;
use email_tracker::notify::log::LogNotifier;
use email_tracker::notify::sendgrid::SendGridNotifier;
use email_tracker::notify::{self, Delivery, NotificationContent, Notifier, ACCEPTED};
use email_tracker::AppError;

fn sample_notification() -> Notification {
    let observed = Utc
        .with_ymd_and_hms(2024, 3, 1, 1, 2, 3)
        .single()
        .expect("instant");
    Notification::new(
        "task-abc".into(),
        "203.0.113.7".into(),
        "Mail/1".into(),
        observed,
        TimeDelta::zero(),
    )
}

fn zone() -> LocalZone {
    LocalZone::from_offset_minutes(480).expect("zone")
}

// ── Content ──────────────────────────────────────────────────

#[test]
fn content_names_comment_and_local_open_time() {
    let content = NotificationContent::new(&sample_notification(), "Q1 report", zone());

    assert_eq!(content.subject, "Your email \"Q1 report\" was opened");
    assert!(content.body.contains("Comments: Q1 report"));
    assert!(content.body.contains("Opened at: 2024-03-01 09:02:03 +08:00"));
    assert!(content.body.contains("IP address: 203.0.113.7"));
    assert!(content.body.contains("User agent: Mail/1"));
    assert!(content.body.contains("Task: task-abc"));
}

#[test]
fn blank_comment_gives_generic_subject() {
    let content = NotificationContent::new(&sample_notification(), "  ", zone());
    assert_eq!(content.subject, "Your email was opened");
}

#[test]
fn delivery_accepts_only_202() {
    let accepted = Delivery {
        status: ACCEPTED,
        body: String::new(),
    };
    let ok = Delivery {
        status: 200,
        body: String::new(),
    };
    assert!(accepted.is_accepted());
    assert!(!ok.is_accepted());
}

// ── Backends ─────────────────────────────────────────────────

#[tokio::test]
async fn log_notifier_accepts_everything() {
    let content = NotificationContent::new(&sample_notification(), "x", zone());
    let delivery = LogNotifier.send("a@b.com", &content).await.expect("send");
    assert!(delivery.is_accepted());
}

#[test]
fn factory_builds_log_notifier_by_default() {
    assert!(notify::from_config(&NotifierConfig::default()).is_ok());
}

#[test]
fn sendgrid_without_key_is_config_error() {
    let config = NotifierConfig {
        provider: NotifierProvider::Sendgrid,
        from_address: "noreply@example.com".into(),
        ..NotifierConfig::default()
    };
    assert!(matches!(
        notify::from_config(&config).err(),
        Some(AppError::Config(_))
    ));
}

#[derive(Default)]
struct Captured {
    authorization: Option<String>,
    payload: Option<serde_json::Value>,
}

type Shared = Arc<Mutex<Captured>>;

async fn stub_provider(status: StatusCode) -> (String, Shared) {
    let captured = Shared::default();
    let app = Router::new()
        .route(
            "/v3/mail/send",
            post(
                move |State(captured): State<Shared>,
                      headers: HeaderMap,
                      Json(payload): Json<serde_json::Value>| async move {
                    let mut guard = captured.lock().await;
                    guard.authorization = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_owned);
                    guard.payload = Some(payload);
                    (status, "stub reply")
                },
            ),
        )
        .with_state(Arc::clone(&captured));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (format!("http://{addr}/v3/mail/send"), captured)
}

fn sendgrid_config(api_url: String) -> NotifierConfig {
    NotifierConfig {
        provider: NotifierProvider::Sendgrid,
        from_address: "noreply@example.com".into(),
        from_name: "Tracker".into(),
        api_url,
        api_key: "SG.test".into(),
    }
}

#[tokio::test]
async fn sendgrid_posts_plain_text_mail_with_bearer_key() {
    let (url, captured) = stub_provider(StatusCode::ACCEPTED).await;
    let notifier = SendGridNotifier::new(&sendgrid_config(url)).expect("notifier");
    let content = NotificationContent::new(&sample_notification(), "Q1", zone());

    let delivery = notifier.send("a@b.com", &content).await.expect("send");
    assert!(delivery.is_accepted());

    let captured = captured.lock().await;
    assert_eq!(captured.authorization.as_deref(), Some("Bearer SG.test"));
    let payload = captured.payload.as_ref().expect("payload");
    assert_eq!(payload["personalizations"][0]["to"][0]["email"], "a@b.com");
    assert_eq!(payload["from"]["email"], "noreply@example.com");
    assert_eq!(payload["from"]["name"], "Tracker");
    assert_eq!(payload["subject"], content.subject.as_str());
    assert_eq!(payload["content"][0]["type"], "text/plain");
    assert_eq!(payload["content"][0]["value"], content.body.as_str());
}

#[tokio::test]
async fn sendgrid_returns_rejections_as_deliveries() {
    let (url, _captured) = stub_provider(StatusCode::UNAUTHORIZED).await;
    let notifier = SendGridNotifier::new(&sendgrid_config(url)).expect("notifier");
    let content = NotificationContent::new(&sample_notification(), "Q1", zone());

    let delivery = notifier.send("a@b.com", &content).await.expect("send");
    assert_eq!(delivery.status, 401);
    assert_eq!(delivery.body, "stub reply");
    assert!(!delivery.is_accepted());
}

#[tokio::test]
async fn sendgrid_unreachable_is_dispatch_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let notifier = SendGridNotifier::new(&sendgrid_config(format!("http://{addr}/v3/mail/send")))
        .expect("notifier");
    let content = NotificationContent::new(&sample_notification(), "Q1", zone());

    let err = notifier
        .send("a@b.com", &content)
        .await
        .expect_err("connection refused");
    assert!(matches!(err, AppError::Dispatch(_)));
}
