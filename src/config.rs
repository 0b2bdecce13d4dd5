//! Global configuration parsing, validation, and credential loading.

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::{AppError, Result};

const KEYRING_SERVICE: &str = "email-tracker";

/// Maximum UTC offset accepted for the local zone, in minutes.
const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// Open tracking behavior.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct TrackingConfig {
    /// Accepted opens per task before further opens are ignored.
    #[serde(default = "default_open_limit")]
    pub open_limit: u32,
    /// Offset of the deployment's local zone from UTC.
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            open_limit: default_open_limit(),
            utc_offset_minutes: default_utc_offset_minutes(),
        }
    }
}

fn default_open_limit() -> u32 {
    50
}

fn default_utc_offset_minutes() -> i32 {
    480
}

/// Bounds applied to submitted tasks.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ValidationConfig {
    /// Longest accepted `notify_to` address, in bytes.
    #[serde(default = "default_max_address_len")]
    pub max_address_len: usize,
    /// Longest accepted comment, in characters.
    #[serde(default = "default_max_comments_chars")]
    pub max_comments_chars: usize,
    /// Furthest a declared local time may sit from the submission instant.
    #[serde(default = "default_max_adjust_days")]
    pub max_adjust_days: i64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_address_len: default_max_address_len(),
            max_comments_chars: default_max_comments_chars(),
            max_adjust_days: default_max_adjust_days(),
        }
    }
}

fn default_max_address_len() -> usize {
    254
}

fn default_max_comments_chars() -> usize {
    256
}

fn default_max_adjust_days() -> i64 {
    365
}

/// Which delivery backend informs senders about opens.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotifierProvider {
    /// Write notifications to the log only.
    #[default]
    Log,
    /// Deliver through the `SendGrid` v3 mail API.
    Sendgrid,
}

/// Outbound notification settings.
///
/// The API key is loaded at runtime via OS keychain or environment
/// variable, never from the TOML file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct NotifierConfig {
    /// Delivery backend.
    #[serde(default)]
    pub provider: NotifierProvider,
    /// Sender address on outgoing notifications.
    #[serde(default)]
    pub from_address: String,
    /// Display name on outgoing notifications.
    #[serde(default = "default_from_name")]
    pub from_name: String,
    /// Mail-send endpoint.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Provider API key (populated at runtime).
    #[serde(skip)]
    pub api_key: String,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            provider: NotifierProvider::default(),
            from_address: String::new(),
            from_name: default_from_name(),
            api_url: default_api_url(),
            api_key: String::new(),
        }
    }
}

fn default_from_name() -> String {
    "Email Tracker".into()
}

fn default_api_url() -> String {
    "https://api.sendgrid.com/v3/mail/send".into()
}

fn default_http_host() -> String {
    "127.0.0.1".into()
}

fn default_http_port() -> u16 {
    8080
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Interface the HTTP server binds to.
    #[serde(default = "default_http_host")]
    pub http_host: String,
    /// Port the HTTP server binds to.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Public URL prefix used to build track-links.
    pub domain_prefix: String,
    /// `SQLite` database file.
    pub db_path: PathBuf,
    /// Open tracking behavior.
    #[serde(default)]
    pub tracking: TrackingConfig,
    /// Submission bounds.
    #[serde(default)]
    pub validation: ValidationConfig,
    /// Outbound notification settings.
    #[serde(default)]
    pub notifier: NotifierConfig,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the notifier API key from OS keychain with env-var fallback.
    ///
    /// Only the `SendGrid` provider needs a key; the log provider returns
    /// immediately.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if neither keychain nor env var provides
    /// the key.
    pub async fn load_credentials(&mut self) -> Result<()> {
        if self.notifier.provider == NotifierProvider::Sendgrid {
            self.notifier.api_key = load_credential("sendgrid_api_key", "SENDGRID_API_KEY").await?;
        }
        Ok(())
    }

    /// Socket address the HTTP server binds to.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `http_host` is not an IP address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.http_host, self.http_port)
            .parse()
            .map_err(|err| AppError::Config(format!("invalid http bind address: {err}")))
    }

    /// Track-link prefix without a trailing slash.
    #[must_use]
    pub fn link_prefix(&self) -> &str {
        self.domain_prefix.trim_end_matches('/')
    }

    fn validate(&mut self) -> Result<()> {
        if !(self.domain_prefix.starts_with("http://") || self.domain_prefix.starts_with("https://"))
        {
            return Err(AppError::Config(
                "domain_prefix must start with http:// or https://".into(),
            ));
        }

        if self.tracking.open_limit == 0 {
            return Err(AppError::Config(
                "tracking.open_limit must be greater than zero".into(),
            ));
        }

        if self.tracking.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            return Err(AppError::Config(format!(
                "tracking.utc_offset_minutes must be within ±{MAX_UTC_OFFSET_MINUTES}"
            )));
        }

        if self.validation.max_comments_chars == 0 || self.validation.max_address_len == 0 {
            return Err(AppError::Config(
                "validation bounds must be greater than zero".into(),
            ));
        }

        if self.validation.max_adjust_days <= 0 {
            return Err(AppError::Config(
                "validation.max_adjust_days must be greater than zero".into(),
            ));
        }

        if self.notifier.provider == NotifierProvider::Sendgrid
            && self.notifier.from_address.trim().is_empty()
        {
            return Err(AppError::Config(
                "notifier.from_address is required for the sendgrid provider".into(),
            ));
        }

        Ok(())
    }
}

/// Load a single credential from OS keychain with env-var fallback.
async fn load_credential(keyring_key: &str, env_key: &str) -> Result<String> {
    let key = keyring_key.to_owned();

    // keyring is synchronous I/O.
    let keychain_result = tokio::task::spawn_blocking(move || {
        keyring::Entry::new(KEYRING_SERVICE, &key).and_then(|entry| entry.get_password())
    })
    .await
    .map_err(|err| AppError::Config(format!("keychain task panicked: {err}")))?;

    match keychain_result {
        Ok(value) if !value.is_empty() => return Ok(value),
        Ok(_) => {
            warn!(key = keyring_key, "keychain entry is empty, trying env var");
        }
        Err(err) => {
            warn!(
                key = keyring_key,
                ?err,
                "keychain lookup failed, trying env var"
            );
        }
    }

    match env::var(env_key) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(AppError::Config(format!(
            "credential {keyring_key} not found in keychain or {env_key} env var"
        ))),
    }
}
