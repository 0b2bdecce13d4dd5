//! Request handlers.
//!
//! The open handler answers with the pixel before any tracking work
//! happens; only submission reports failures to its caller.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::{BytesRejection, PathRejection};
use axum::extract::{ConnectInfo, Path, Request, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, warn};

use super::badge::{self, BadgeColor, BADGE_CONTENT_TYPE};
use super::pixel::PIXEL_CONTENT_TYPE;
use super::AppState;
use crate::models::status::Status;
use crate::tracker::{status, OpenRequest, SubmitRequest};
use crate::AppError;

const NO_CACHE: &str = "no-cache, no-store, must-revalidate";

/// Error body returned by the submit endpoint.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Handler for `GET /health`.
pub async fn health() -> &'static str {
    "ok"
}

/// Handler for `GET /t/{task_id}`: always the pixel, whatever happens.
///
/// The identifier is percent-decoded before its length is checked. A
/// segment that does not decode to UTF-8 is used as sent, so no extractor
/// rejection can replace the image with an error page.
pub async fn open(
    State(state): State<Arc<AppState>>,
    path: Result<Path<String>, PathRejection>,
    request: Request,
) -> Response {
    let task_id = match path {
        Ok(Path(task_id)) => task_id,
        Err(rejection) => {
            debug!(%rejection, "undecodable task id; using raw path");
            request
                .uri()
                .path()
                .strip_prefix("/t/")
                .unwrap_or_default()
                .to_owned()
        }
    };
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip = client_ip(request.headers(), peer);
    let user_agent = request
        .headers()
        .get(axum::http::header::USER_AGENT)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .unwrap_or_default();

    // Fire and forget: the handle is dropped, the task keeps running.
    let _ = state.dispatcher.spawn(OpenRequest {
        task_id,
        ip,
        user_agent,
    });

    (
        [(CONTENT_TYPE, PIXEL_CONTENT_TYPE), (CACHE_CONTROL, NO_CACHE)],
        state.pixel.clone(),
    )
        .into_response()
}

/// Handler for `POST /submit`.
///
/// The body is parsed as JSON whatever `Content-Type` the client sent.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let payload = body
        .map_err(|rejection| AppError::Binding(rejection.body_text()))
        .and_then(|body| {
            Json::<SubmitRequest>::from_bytes(&body)
                .map_err(|rejection| AppError::Binding(rejection.body_text()))
        });
    let result = match payload {
        Ok(Json(request)) => state.submitter.submit(request, Utc::now()).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(submitted) => (StatusCode::OK, Json(submitted)).into_response(),
        Err(err) => {
            warn!(%err, "task submission rejected");
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody {
                    error: err.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// Handler for `GET /status`: counters as JSON.
pub async fn status_json(State(state): State<Arc<AppState>>) -> Response {
    match status::snapshot(state.db.as_ref(), state.zone, Utc::now()).await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(err) => {
            error!(%err, "status query failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    error: err.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// Handler for `GET /status/tasks[?daily]`.
pub async fn status_tasks(State(state): State<Arc<AppState>>, uri: Uri) -> Response {
    counter_badge(&state, &uri, "task", |s, daily| {
        if daily {
            s.daily.task_submit
        } else {
            s.total.task_submit
        }
    })
    .await
}

/// Handler for `GET /status/notified[?daily]`.
pub async fn status_notified(State(state): State<Arc<AppState>>, uri: Uri) -> Response {
    counter_badge(&state, &uri, "notified", |s, daily| {
        if daily {
            s.daily.notification
        } else {
            s.total.notification
        }
    })
    .await
}

async fn counter_badge(
    state: &AppState,
    uri: &Uri,
    noun: &str,
    pick: impl Fn(&Status, bool) -> u64,
) -> Response {
    let daily = has_query_flag(uri, "daily");
    let value = match status::snapshot(state.db.as_ref(), state.zone, Utc::now()).await {
        Ok(snapshot) => pick(&snapshot, daily).to_string(),
        Err(err) => {
            error!(%err, "status query failed");
            "unknown".to_owned()
        }
    };

    let svg = if daily {
        badge::render(&format!("daily {noun}"), &value, BadgeColor::Green)
    } else {
        badge::render(&format!("total {noun}"), &value, BadgeColor::Blue)
    };

    (
        [(CONTENT_TYPE, BADGE_CONTENT_TYPE), (CACHE_CONTROL, NO_CACHE)],
        svg,
    )
        .into_response()
}

/// Whether the query string names `flag`, with or without a value.
fn has_query_flag(uri: &Uri, flag: &str) -> bool {
    uri.query().is_some_and(|q| {
        q.split('&')
            .map(|pair| pair.split_once('=').map_or(pair, |(k, _)| k))
            .any(|key| key == flag)
    })
}

/// Client address, preferring proxy headers over the socket peer.
fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    forwarded
        .or(real_ip)
        .map(str::to_owned)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_default()
}
