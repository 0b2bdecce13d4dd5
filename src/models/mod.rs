//! Domain model module declarations.

pub mod notification;
pub mod status;
pub mod task;
