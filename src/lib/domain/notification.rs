//! Notification dispatch: message model, transport capability and dispatcher

pub mod dispatcher;
pub mod email_address;
pub mod errors;
pub mod message;
pub mod secret;
pub mod transport;

pub use dispatcher::Dispatcher;
pub use email_address::{EmailAddress, EmailAddressError};
pub use errors::{AttachmentError, AuthError, MessageError, NotifyError, TransportError};
pub use message::{Attachment, Message};
pub use secret::Secret;
pub use transport::{Receipt, Transport, TransportKind};
