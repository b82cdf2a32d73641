#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    missing_docs,
    rustdoc::broken_intra_doc_links,
    rustdoc::missing_crate_level_docs
)]

//! Send a data-quality alert over SMTP or the mail API

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use dq_notify::{
    domain::{
        notification::{Dispatcher, Transport},
        quality::{DQFailure, FailureKind},
    },
    infrastructure::email::{
        graph::{GraphConfig, GraphTransport},
        smtp::{SMTPConfig, SMTPTransport},
    },
};

/// Command-line arguments / environment variables
#[derive(Debug, Parser)]
#[clap(name = "dq-notify", version)]
pub struct Args {
    /// The transport to send with
    #[clap(subcommand)]
    pub channel: Channel,
}

/// Available transports
#[derive(Debug, Subcommand)]
pub enum Channel {
    /// Send over SMTP with STARTTLS and login
    Smtp {
        /// SMTP connection details
        #[clap(flatten)]
        config: SMTPConfig,

        /// What to send
        #[clap(flatten)]
        alert: AlertArgs,
    },

    /// Send through the mail API with client credentials
    Graph {
        /// Mail API credentials
        #[clap(flatten)]
        config: GraphConfig,

        /// What to send
        #[clap(flatten)]
        alert: AlertArgs,
    },
}

/// The alert to send
#[derive(Debug, clap::Args)]
pub struct AlertArgs {
    /// Recipient address, repeatable
    #[clap(long = "to", required = true)]
    pub recipients: Vec<String>,

    /// Subject line; defaults to one derived from --failure
    #[clap(long)]
    pub subject: Option<String>,

    /// Message body; defaults to the failure message
    #[clap(long)]
    pub body: Option<String>,

    /// File to attach, repeatable
    #[clap(long = "attach")]
    pub attachments: Vec<PathBuf>,

    /// The data-quality failure being reported
    #[clap(long)]
    pub failure: Option<FailureKind>,
}

impl AlertArgs {
    /// Resolve the subject and body, falling back to the failure's description
    fn content(&self) -> Result<(String, String)> {
        let failure = self.failure.map(DQFailure::new);

        let subject = match (&self.subject, &failure) {
            (Some(subject), _) => subject.clone(),
            (None, Some(failure)) => failure.alert_subject(),
            (None, None) => return Err(anyhow!("either --subject or --failure is required")),
        };

        let body = match (&self.body, &failure) {
            (Some(body), _) => body.clone(),
            (None, Some(failure)) => failure.message().to_string(),
            (None, None) => String::new(),
        };

        Ok((subject, body))
    }
}

#[mutants::skip]
#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let (transport, alert) = match args.channel {
        Channel::Smtp { config, alert } => {
            let transport: Box<dyn Transport> = Box::new(SMTPTransport::new(config)?);
            (transport, alert)
        }
        Channel::Graph { config, alert } => {
            let transport: Box<dyn Transport> = Box::new(GraphTransport::from_config(&config)?);
            (transport, alert)
        }
    };

    let (subject, body) = alert.content()?;
    let dispatcher = Dispatcher::new(transport);

    dispatcher
        .send(&alert.recipients, &subject, &body, alert.attachments.clone())
        .await?;

    Ok(())
}
