//! Email transports

pub mod graph;
pub mod smtp;
