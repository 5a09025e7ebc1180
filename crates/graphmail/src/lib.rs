//! # graphmail
//!
//! Compose, persist and send Outlook messages through the Microsoft Graph
//! mail API.
//!
//! The crate maps an imperative "build a message, attach files, send it"
//! model onto Graph's resource contract: messages are created as drafts,
//! updated with `PATCH`, and delivered with a `send` action.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use graphmail::{Account, GraphClient, GraphConfig};
//! use graphmail_oauth::ClientCredentials;
//!
//! #[tokio::main]
//! async fn main() -> graphmail::Result<()> {
//!     let config = GraphConfig::default();
//!     let client = Arc::new(GraphClient::new(ClientCredentials::from_env()?, &config)?);
//!     let account = Account::for_user(client, &config, "reports@contoso.com");
//!
//!     let mut message = account.create_message();
//!     message.to_recipients_mut().add("someone@example.com")?;
//!     message.set_subject("Test123");
//!     message.set_body("This is a test.");
//!     message.save_draft().await?;
//!
//!     message.set_body("This is an update test.");
//!     message.save_draft().await?;
//!
//!     message.send().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Message lifecycle
//!
//! ```text
//! ┌─────┐  save_draft()  ┌───────┐   send()   ┌──────┐
//! │ New │ ─────────────→ │ Draft │ ─────────→ │ Sent │
//! └─────┘                └───────┘            └──────┘
//!    │                                           ↑
//!    └────────────────── send() ─────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`recipient`]: recipient values and ordered collections
//! - [`attachment`]: file, in-memory and cloud-resident attachments
//! - [`message`]: the message aggregate and its state machine
//! - [`account`]: mailbox-bound message factory
//! - [`transport`]: the HTTP seam and its reqwest implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod account;
pub mod attachment;
mod config;
pub mod endpoint;
mod error;
pub mod message;
pub mod recipient;
pub mod transport;

pub use account::Account;
pub use attachment::{
    Attachment, AttachmentInput, Attachments, FileSource, LARGE_ATTACHMENT_THRESHOLD, LocalFs,
    UploadOutcome, UploadRoute, UploadSession,
};
pub use config::{GraphConfig, GraphConfigBuilder};
pub use endpoint::{Endpoints, Mailbox};
pub use error::{Error, Result};
pub use message::{
    Body, BodyType, DIRECT_SEND_ID, FlagStatus, Importance, LifecycleState, Message,
    MessageFields, SAVE_AFTER_SEND_WHITELIST, WireKey,
};
pub use recipient::{Recipient, RecipientInput, Recipients};
pub use transport::{GraphClient, Response, Transport};
