//! SMTP transport implementation

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use clap::{ArgAction, Parser};
use lettre::{
    message::{header::ContentType, Attachment as MimeAttachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
        response::Response,
    },
    AsyncSmtpTransport, AsyncTransport, Tokio1Executor,
};

use crate::domain::notification::{
    Attachment, EmailAddress, Message, NotifyError, Receipt, Secret, Transport, TransportError,
    TransportKind,
};

/// SMTP configuration
#[derive(Clone, Default, Debug, Parser)]
pub struct SMTPConfig {
    /// The SMTP host
    #[clap(long, env = "SMTP_SERVER")]
    pub smtp_server: String,

    /// The SMTP port
    #[clap(long, env = "SMTP_PORT", default_value = "587")]
    pub smtp_port: u16,

    /// The SMTP username
    #[clap(long, env = "SMTP_USERNAME")]
    pub username: String,

    /// The SMTP password
    #[clap(long, env = "SMTP_PASSWORD", hide_env_values = true)]
    pub password: Secret,

    /// The sender email address
    #[clap(long, env = "SMTP_SENDER_EMAIL")]
    pub sender_email: String,

    /// Verify the TLS certificate
    #[clap(long, env = "SMTP_VERIFY_TLS", default_value = "true", action = ArgAction::Set)]
    pub verify_tls: bool,

    /// Upgrade with STARTTLS; otherwise connect with implicit TLS
    #[clap(long, env = "SMTP_STARTTLS", default_value = "true", action = ArgAction::Set)]
    pub starttls: bool,

    /// Timeout in seconds for each SMTP command
    #[clap(long, env = "SMTP_TIMEOUT_SECS", default_value = "30")]
    pub timeout_secs: u64,
}

/// SMTP transport
///
/// Stateless between sends: each send opens its own connection, logs in,
/// and drops the connection when it returns, whatever the outcome.
#[derive(Debug, Clone)]
pub struct SMTPTransport {
    config: SMTPConfig,
    sender: Mailbox,
}

impl SMTPTransport {
    /// Create a new SMTP transport
    pub fn new(config: SMTPConfig) -> Result<Self> {
        let sender = EmailAddress::new(&config.sender_email)?;
        let sender = sender.as_str().parse::<Mailbox>()?;

        Ok(Self { config, sender })
    }

    /// Build a single-use connection to the configured relay
    pub fn mailer(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let creds = Credentials::new(
            self.config.username.clone(),
            self.config.password.expose().to_string(),
        );

        let tls = TlsParameters::builder(self.config.smtp_server.to_string())
            .dangerous_accept_invalid_certs(!self.config.verify_tls)
            .build()?;

        let relay = if self.config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_server)?
                .tls(Tls::Required(tls))
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.smtp_server)?
                .tls(Tls::Wrapper(tls))
        };

        Ok(relay
            .credentials(creds)
            .port(self.config.smtp_port)
            .timeout(Some(Duration::from_secs(self.config.timeout_secs)))
            .build())
    }

    /// Build the MIME message: the plain-text body part followed by one
    /// part per attachment
    pub fn build_email(
        &self,
        message: &Message,
        attachments: &[Attachment],
    ) -> Result<lettre::Message, TransportError> {
        let mut builder = lettre::Message::builder().from(self.sender.clone());

        for recipient in message.recipients() {
            let mailbox = recipient
                .as_str()
                .parse::<Mailbox>()
                .map_err(|e| TransportError::Smtp(e.into()))?;

            builder = builder.to(mailbox);
        }

        let octet_stream = ContentType::parse("application/octet-stream")
            .map_err(|e| TransportError::Smtp(anyhow!("invalid content type: {e}")))?;

        let mut body =
            MultiPart::mixed().singlepart(SinglePart::plain(message.body().to_string()));

        for attachment in attachments {
            body = body.singlepart(
                MimeAttachment::new(attachment.name.clone())
                    .body(attachment.content.clone(), octet_stream.clone()),
            );
        }

        builder
            .subject(message.subject())
            .multipart(body)
            .map_err(|e| TransportError::Smtp(e.into()))
    }
}

/// The three-digit reply code, e.g. 250
fn reply_code(response: &Response) -> u16 {
    let code = response.code();

    100 * code.severity as u16 + 10 * code.category as u16 + code.detail as u16
}

#[async_trait]
impl Transport for SMTPTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Smtp
    }

    async fn send(
        &self,
        message: &Message,
        attachments: &[Attachment],
    ) -> Result<Receipt, NotifyError> {
        let email = self.build_email(message, attachments)?;

        let mailer = self.mailer().map_err(TransportError::Smtp)?;

        match mailer.send(email).await {
            Ok(response) => Ok(Receipt {
                transport: TransportKind::Smtp,
                status: reply_code(&response),
            }),
            Err(e) => Err(TransportError::Smtp(e.into()).into()),
        }
    }
}
