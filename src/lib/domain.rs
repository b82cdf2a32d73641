//! Domain layer: data-quality failures and notification dispatch

pub mod notification;
pub mod quality;
