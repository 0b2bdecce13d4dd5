//! HTTP surface: track-link pixel, task submission, and status badges.

pub mod badge;
pub mod handlers;
pub mod pixel;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use bytes::Bytes;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::clock::LocalZone;
use crate::config::GlobalConfig;
use crate::notify::Notifier;
use crate::persistence::Database;
use crate::tracker::{OpenDispatcher, Submitter};
use crate::validation::TaskValidator;
use crate::{AppError, Result};

/// Immutable state shared by every request handler.
pub struct AppState {
    /// Task store.
    pub db: Arc<dyn Database>,
    /// Deployment local zone.
    pub zone: LocalZone,
    /// Submit flow.
    pub submitter: Submitter,
    /// Open flow.
    pub dispatcher: Arc<OpenDispatcher>,
    /// Tracking pixel body.
    pub pixel: Bytes,
}

impl AppState {
    /// Assemble handler state from configuration and collaborators.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the local zone or validator cannot be
    /// built from `config`.
    pub fn new(
        config: &GlobalConfig,
        db: Arc<dyn Database>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let zone = LocalZone::from_offset_minutes(config.tracking.utc_offset_minutes)?;
        let validator = TaskValidator::new(config.validation.clone())?;
        let submitter = Submitter::new(Arc::clone(&db), validator, zone, config.link_prefix());
        let dispatcher = Arc::new(OpenDispatcher::new(
            Arc::clone(&db),
            notifier,
            config.tracking.open_limit,
            zone,
        ));

        Ok(Self {
            db,
            zone,
            submitter,
            dispatcher,
            pixel: pixel::pixel(),
        })
    }
}

/// Build the application router.
#[must_use]
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/t/{*task_id}", get(handlers::open))
        .route("/submit", post(handlers::submit))
        .route("/status", get(handlers::status_json))
        .route("/status/tasks", get(handlers::status_tasks))
        .route("/status/notified", get(handlers::status_notified))
        .route("/health", get(handlers::health))
        .with_state(state)
}

/// Serve the router on `listener` until `ct` is cancelled.
///
/// # Errors
///
/// Returns `AppError::Io` if the server fails.
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    ct: CancellationToken,
) -> Result<()> {
    let addr = listener
        .local_addr()
        .map_err(|err| AppError::Io(format!("listener has no local address: {err}")))?;
    info!(%addr, "starting HTTP server");

    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(async move { ct.cancelled().await })
    .await
    .map_err(|err| AppError::Io(format!("http server error: {err}")))?;

    info!("HTTP server shut down");
    Ok(())
}
