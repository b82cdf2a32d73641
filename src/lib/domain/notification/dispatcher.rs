//! Notification dispatcher
//!
//! The single entry point callers use. It builds a [`Message`], hands it to
//! the configured [`Transport`] and owns the one recovery the system has:
//! on an authorization failure it renews the transport's credential and
//! retries exactly once.

use std::{fmt, path::PathBuf};

use tracing::{info, warn};

use super::{
    errors::{NotifyError, TransportError},
    message::Message,
    transport::{Receipt, Transport},
};

/// Sends notifications through one transport
pub struct Dispatcher<T: Transport> {
    transport: T,
}

impl<T: Transport> Dispatcher<T> {
    /// Create a dispatcher over a transport
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// The configured transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send a notification.
    ///
    /// # Arguments
    /// * `recipients` - At least one recipient address.
    /// * `subject` - The subject line.
    /// * `body` - The body; plain text for SMTP, HTML for the mail API.
    /// * `attachments` - Paths of files to attach, read at send time.
    ///
    /// # Returns
    /// - [`Ok`] with the [`Receipt`] from the transport.
    /// - [`Err`] containing a [`NotifyError`]; invalid recipients and
    ///   unreadable attachments fail before any network call.
    pub async fn send<R, S, A, P>(
        &self,
        recipients: R,
        subject: &str,
        body: &str,
        attachments: A,
    ) -> Result<Receipt, NotifyError>
    where
        R: IntoIterator<Item = S>,
        S: AsRef<str>,
        A: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let message = Message::parse(recipients, subject, body)?.with_attachments(attachments);

        self.send_message(&message).await
    }

    /// Send a prebuilt message, renewing and retrying once on an
    /// authorization failure.
    ///
    /// Attachments are read once, before the first attempt; the retry
    /// reuses the same bytes.
    pub async fn send_message(&self, message: &Message) -> Result<Receipt, NotifyError> {
        let attachments = message.load_attachments().await?;

        let receipt = match self.transport.send(message, &attachments).await {
            Err(NotifyError::Transport(err)) if err.is_unauthorized() => {
                warn!(
                    transport = %self.transport.kind(),
                    error = %err,
                    "authorization failed, renewing credentials and retrying once"
                );

                self.transport
                    .renew()
                    .await
                    .map_err(TransportError::Authentication)?;

                self.transport.send(message, &attachments).await?
            }
            result => result?,
        };

        info!(
            transport = %receipt.transport,
            status = receipt.status,
            recipients = message.recipients().len(),
            "notification delivered"
        );

        Ok(receipt)
    }
}

impl<T: Transport> fmt::Debug for Dispatcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("transport", &self.transport.kind())
            .finish()
    }
}
