//! Infrastructure layer: concrete transports and the clients they use

pub mod auth;
pub mod email;
pub mod http;
