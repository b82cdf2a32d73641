//! Notification message

use std::path::{Path, PathBuf};

use super::{
    email_address::EmailAddress,
    errors::{AttachmentError, MessageError},
};

/// A notification to deliver, built fresh for each send
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    recipients: Vec<EmailAddress>,
    subject: String,
    body: String,
    attachments: Vec<PathBuf>,
}

impl Message {
    /// Create a message without attachments
    ///
    /// # Errors
    /// [`MessageError::NoRecipients`] if `recipients` is empty.
    pub fn new(
        recipients: Vec<EmailAddress>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<Self, MessageError> {
        if recipients.is_empty() {
            return Err(MessageError::NoRecipients);
        }

        Ok(Self {
            recipients,
            subject: subject.into(),
            body: body.into(),
            attachments: Vec::new(),
        })
    }

    /// Parse raw recipient strings and create a message
    pub fn parse<I, S>(
        recipients: I,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<Self, MessageError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let recipients = recipients
            .into_iter()
            .map(|raw| EmailAddress::new(raw.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(recipients, subject, body)
    }

    /// Attach files, resolved only when the message is sent
    pub fn with_attachments<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.attachments.extend(paths.into_iter().map(Into::into));
        self
    }

    /// The recipients, in the order given
    pub fn recipients(&self) -> &[EmailAddress] {
        &self.recipients
    }

    /// The subject line
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// The body text
    pub fn body(&self) -> &str {
        &self.body
    }

    /// The attachment paths
    pub fn attachments(&self) -> &[PathBuf] {
        &self.attachments
    }

    /// Read every attachment into memory, failing on the first unreadable one
    pub async fn load_attachments(&self) -> Result<Vec<Attachment>, AttachmentError> {
        let mut loaded = Vec::with_capacity(self.attachments.len());

        for path in &self.attachments {
            loaded.push(Attachment::load(path).await?);
        }

        Ok(loaded)
    }
}

/// An attachment resolved to its display name and bytes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    /// File name shown to the recipient
    pub name: String,

    /// Raw file contents
    pub content: Vec<u8>,
}

impl Attachment {
    /// Read a file fully into memory
    pub async fn load(path: &Path) -> Result<Self, AttachmentError> {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| AttachmentError::NoFileName {
                path: path.to_path_buf(),
            })?;

        let content = tokio::fs::read(path)
            .await
            .map_err(|source| AttachmentError::Unreadable {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Self { name, content })
    }
}
