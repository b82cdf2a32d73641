//! Transport capability

use std::fmt;

use async_trait::async_trait;

#[cfg(test)]
use mockall::mock;

use super::{
    errors::{AuthError, NotifyError},
    message::{Attachment, Message},
};

/// Which channel delivered a message
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportKind {
    /// Direct SMTP with STARTTLS and login
    Smtp,

    /// Cloud mail API with an OAuth2 bearer token
    Graph,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Smtp => write!(f, "smtp"),
            Self::Graph => write!(f, "graph"),
        }
    }
}

/// Outcome of a successful delivery
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Receipt {
    /// The channel used
    pub transport: TransportKind,

    /// HTTP status for the mail API, SMTP reply code for SMTP
    pub status: u16,
}

/// A channel that can deliver a [`Message`]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Which channel this is
    fn kind(&self) -> TransportKind;

    /// Send a message once, with no retry.
    ///
    /// `attachments` are the message's files, already read into memory, so
    /// a retry sends exactly the bytes of the first attempt.
    ///
    /// # Returns
    /// - [`Ok`] with a [`Receipt`] if the server accepted the message.
    /// - [`Err`] containing a [`NotifyError`] otherwise. An authorization
    ///   failure is reported as
    ///   [`TransportError::Unauthorized`](super::TransportError::Unauthorized).
    async fn send(
        &self,
        message: &Message,
        attachments: &[Attachment],
    ) -> Result<Receipt, NotifyError>;

    /// Replace any held credential with a fresh one.
    ///
    /// Stateless transports have nothing to renew.
    async fn renew(&self) -> Result<(), AuthError> {
        Ok(())
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    fn kind(&self) -> TransportKind {
        (**self).kind()
    }

    async fn send(
        &self,
        message: &Message,
        attachments: &[Attachment],
    ) -> Result<Receipt, NotifyError> {
        (**self).send(message, attachments).await
    }

    async fn renew(&self) -> Result<(), AuthError> {
        (**self).renew().await
    }
}

#[cfg(test)]
mock! {
    pub Transport {}

    #[async_trait]
    impl Transport for Transport {
        fn kind(&self) -> TransportKind;
        async fn send(&self, message: &Message, attachments: &[Attachment]) -> Result<Receipt, NotifyError>;
        async fn renew(&self) -> Result<(), AuthError>;
    }
}
