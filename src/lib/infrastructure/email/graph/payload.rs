//! `sendMail` request body

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;

use crate::domain::notification::{Attachment, Message};

const FILE_ATTACHMENT_TYPE: &str = "#microsoft.graph.fileAttachment";

/// Body of `POST /users/{sender}/sendMail`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMailRequest<'a> {
    message: MailMessage<'a>,
    save_to_sent_items: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MailMessage<'a> {
    subject: &'a str,
    body: ItemBody<'a>,
    to_recipients: Vec<Recipient<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<FileAttachment<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ItemBody<'a> {
    content_type: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Recipient<'a> {
    email_address: Address<'a>,
}

#[derive(Debug, Serialize)]
struct Address<'a> {
    address: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileAttachment<'a> {
    #[serde(rename = "@odata.type")]
    odata_type: &'static str,
    name: &'a str,
    content_bytes: String,
}

impl<'a> SendMailRequest<'a> {
    /// Build the request for a message whose attachments are already loaded.
    ///
    /// The body is sent as HTML and a copy is saved to the sender's Sent Items.
    pub fn new(message: &'a Message, attachments: &'a [Attachment]) -> Self {
        let to_recipients = message
            .recipients()
            .iter()
            .map(|recipient| Recipient {
                email_address: Address {
                    address: recipient.as_str(),
                },
            })
            .collect();

        let attachments = attachments
            .iter()
            .map(|attachment| FileAttachment {
                odata_type: FILE_ATTACHMENT_TYPE,
                name: &attachment.name,
                content_bytes: STANDARD.encode(&attachment.content),
            })
            .collect();

        Self {
            message: MailMessage {
                subject: message.subject(),
                body: ItemBody {
                    content_type: "HTML",
                    content: message.body(),
                },
                to_recipients,
                attachments,
            },
            save_to_sent_items: true,
        }
    }
}
