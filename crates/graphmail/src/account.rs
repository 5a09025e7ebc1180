//! Mailbox-bound message factory.

use std::sync::Arc;

use serde_json::Value;

use crate::config::GraphConfig;
use crate::endpoint::{Endpoints, Mailbox};
use crate::error::Result;
use crate::message::{Message, MessageFields};
use crate::transport::Transport;

/// A mailbox (the caller's own, or a delegated user's) plus the transport
/// used to reach it.
///
/// Creating messages never touches the network.
#[derive(Debug)]
pub struct Account<T> {
    transport: Arc<T>,
    endpoints: Endpoints,
}

impl<T> Clone for Account<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            endpoints: self.endpoints.clone(),
        }
    }
}

impl<T: Transport> Account<T> {
    /// Account for the signed-in caller (`/me`).
    #[must_use]
    pub fn new(transport: Arc<T>, config: &GraphConfig) -> Self {
        Self::with_mailbox(transport, config, Mailbox::Me)
    }

    /// Account for a delegated mailbox (`/users/{user}`). An empty user
    /// name addresses `/me`.
    #[must_use]
    pub fn for_user(transport: Arc<T>, config: &GraphConfig, user: impl Into<String>) -> Self {
        Self::with_mailbox(transport, config, Mailbox::user(user))
    }

    /// Account for an explicit mailbox.
    #[must_use]
    pub fn with_mailbox(transport: Arc<T>, config: &GraphConfig, mailbox: Mailbox) -> Self {
        Self {
            transport,
            endpoints: Endpoints::new(config, mailbox),
        }
    }

    /// Mailbox URLs of this account.
    #[must_use]
    pub const fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// The addressed mailbox.
    #[must_use]
    pub const fn mailbox(&self) -> &Mailbox {
        self.endpoints.mailbox()
    }

    /// A fresh, unbound message with default fields.
    #[must_use]
    pub fn create_message(&self) -> Message<T> {
        Message::new(Arc::clone(&self.transport), self.endpoints.clone())
    }

    /// A fresh, unbound message pre-populated from `fields`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`](crate::Error::Validation) if a recipient
    /// or attachment is malformed.
    pub fn create_message_with(&self, fields: MessageFields) -> Result<Message<T>> {
        Message::with_fields(Arc::clone(&self.transport), self.endpoints.clone(), fields)
    }

    /// Rehydrates a message from its server JSON, keeping its id, draft
    /// flag and timestamps.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`](crate::Error::Validation) if the JSON
    /// is not a message object.
    pub fn load_message(&self, value: &Value) -> Result<Message<T>> {
        Message::from_remote(Arc::clone(&self.transport), self.endpoints.clone(), value)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::message::LifecycleState;
    use crate::transport::Response;
    use serde_json::json;

    #[derive(Debug)]
    struct Offline;

    impl Transport for Offline {
        async fn post(&self, url: &str, _body: Option<&Value>) -> Result<Response> {
            panic!("unexpected POST {url}")
        }

        async fn patch(&self, url: &str, _body: &Value) -> Result<Response> {
            panic!("unexpected PATCH {url}")
        }
    }

    #[test]
    fn test_empty_user_means_me() {
        let account = Account::for_user(Arc::new(Offline), &GraphConfig::default(), "");
        assert_eq!(account.mailbox(), &Mailbox::Me);
    }

    #[test]
    fn test_create_message_binds_mailbox() {
        let account = Account::for_user(
            Arc::new(Offline),
            &GraphConfig::default(),
            "reports@contoso.com",
        );
        let msg = account.create_message();
        assert_eq!(msg.state(), LifecycleState::New);
        assert_eq!(
            msg.endpoints().drafts(),
            "https://graph.microsoft.com/v1.0/users/reports@contoso.com/mailFolders/drafts/messages"
        );
    }

    #[test]
    fn test_create_message_with_fields() {
        let account = Account::new(Arc::new(Offline), &GraphConfig::default());
        let msg = account
            .create_message_with(
                MessageFields::new()
                    .to("a@b.com")
                    .cc(("c@d.com", "Carol"))
                    .subject("Hi")
                    .body("Hello"),
            )
            .unwrap();
        assert_eq!(msg.subject(), "Hi");
        assert_eq!(msg.body().content, "Hello");
        assert_eq!(msg.to_recipients().len(), 1);
        assert_eq!(msg.cc_recipients().get(0).unwrap().name(), Some("Carol"));
    }

    #[test]
    fn test_create_message_with_bad_recipient() {
        let account = Account::new(Arc::new(Offline), &GraphConfig::default());
        let err = account
            .create_message_with(MessageFields::new().to("not-an-address"))
            .unwrap_err();
        assert!(err.is_local());
    }

    #[test]
    fn test_load_message_keeps_identity() {
        let account = Account::new(Arc::new(Offline), &GraphConfig::default());
        let msg = account
            .load_message(&json!({"id": "AAMk9", "isDraft": true, "subject": "Draft"}))
            .unwrap();
        assert_eq!(msg.state(), LifecycleState::Draft);
        assert_eq!(msg.id(), Some("AAMk9"));
    }
}
