#![forbid(unsafe_code)]

pub mod clock;
pub mod config;
pub mod errors;
pub mod http;
pub mod identity;
pub mod models;
pub mod notify;
pub mod persistence;
pub mod tracker;
pub mod validation;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
