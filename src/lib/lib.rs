#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    missing_docs,
    rustdoc::broken_intra_doc_links,
    rustdoc::missing_crate_level_docs
)]

//! Data-quality failure taxonomy and alert dispatch over SMTP or a mail API

pub mod domain;
pub mod infrastructure;
