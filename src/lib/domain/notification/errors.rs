//! Error types for notification dispatch

use std::{io, path::PathBuf};

use thiserror::Error;
use tracing::debug;

use super::email_address::EmailAddressError;

/// Longest response body kept in an error
const SNIPPET_LEN: usize = 512;

/// Shorten a response body for inclusion in an error
pub fn snippet(body: &str) -> String {
    match body.char_indices().nth(SNIPPET_LEN) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

/// Errors obtaining a bearer token from the identity endpoint
#[derive(Debug, Error)]
pub enum AuthError {
    /// The token request never produced a response
    #[error("token request failed")]
    Request(#[source] anyhow::Error),

    /// The identity endpoint refused the client credentials
    #[error("token request rejected with status {status}: {body}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Response body snippet
        body: String,
    },

    /// The response was not JSON
    #[error("token response with status {status} is not valid JSON: {body}")]
    InvalidResponse {
        /// HTTP status code
        status: u16,
        /// Response body snippet
        body: String,
        /// Parse failure
        #[source]
        source: serde_json::Error,
    },

    /// The response was JSON but had no usable `access_token`
    #[error("token response with status {status} has no access_token: {body}")]
    MissingAccessToken {
        /// HTTP status code
        status: u16,
        /// Response body snippet
        body: String,
    },
}

/// Errors reading an attachment from disk
#[derive(Debug, Error)]
pub enum AttachmentError {
    /// The file could not be read
    #[error("could not read attachment {}", path.display())]
    Unreadable {
        /// The attachment path
        path: PathBuf,
        /// The underlying I/O failure
        #[source]
        source: io::Error,
    },

    /// The path has no file name to display
    #[error("attachment path {} has no file name", path.display())]
    NoFileName {
        /// The attachment path
        path: PathBuf,
    },
}

/// Errors building a message before anything is sent
#[derive(Debug, Error)]
pub enum MessageError {
    /// A message needs at least one recipient
    #[error("at least one recipient is required")]
    NoRecipients,

    /// A recipient or sender address is malformed
    #[error(transparent)]
    InvalidAddress(#[from] EmailAddressError),
}

/// Errors delivering a built message
#[derive(Debug, Error)]
pub enum TransportError {
    /// The mail API refused the bearer token
    #[error("mail API rejected authorization with status {status}: {body}")]
    Unauthorized {
        /// HTTP status code, 401 or 403
        status: u16,
        /// Response body snippet
        body: String,
    },

    /// The mail API answered with a non-success status
    #[error("mail API returned status {status}: {body}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Response body snippet
        body: String,
    },

    /// The HTTP request did not complete
    #[error("mail API request failed")]
    Request(#[source] anyhow::Error),

    /// Building or delivering the SMTP message failed
    #[error("SMTP delivery failed")]
    Smtp(#[source] anyhow::Error),

    /// No token could be obtained or renewed
    #[error("could not authenticate with the mail API")]
    Authentication(#[from] AuthError),
}

impl TransportError {
    /// Whether this is an authorization failure worth one token renewal
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

/// Every way [`Dispatcher::send`](super::Dispatcher::send) can fail
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The message itself is invalid
    #[error(transparent)]
    Message(#[from] MessageError),

    /// An attachment could not be read; nothing was sent
    #[error(transparent)]
    Attachment(#[from] AttachmentError),

    /// Delivery failed
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl From<AuthError> for NotifyError {
    fn from(err: AuthError) -> Self {
        debug!("AuthError -> NotifyError");

        NotifyError::Transport(TransportError::Authentication(err))
    }
}

impl From<EmailAddressError> for NotifyError {
    fn from(err: EmailAddressError) -> Self {
        debug!("EmailAddressError -> NotifyError");

        NotifyError::Message(MessageError::InvalidAddress(err))
    }
}
