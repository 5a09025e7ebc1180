//! The message aggregate and its draft/send state machine.
//!
//! ```text
//! New ──save_draft()──→ Draft ──send()──→ Sent
//!  └──────────────send()──────────────────↗
//! ```
//!
//! Every operation first checks everything it can check locally, then
//! talks to the service, and only touches in-memory fields after the
//! service confirmed the request. A failed call leaves the message as it
//! was.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use crate::attachment::{AttachmentInput, Attachments, UploadOutcome, UploadRoute};
use crate::endpoint::Endpoints;
use crate::error::{Error, Result};
use crate::recipient::{Recipient, RecipientInput, Recipients};
use crate::transport::Transport;

/// Id given to messages delivered through `sendMail`, which returns no body.
pub const DIRECT_SEND_ID: &str = "message_sent";

/// Keys a message may still change once it was sent.
pub const SAVE_AFTER_SEND_WHITELIST: [WireKey; 4] = [
    WireKey::IsRead,
    WireKey::Categories,
    WireKey::Flag,
    WireKey::Subject,
];

/// Body content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyType {
    /// HTML body.
    #[default]
    Html,
    /// Plain text body.
    Text,
}

/// Message body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Body {
    /// Content type tag.
    #[serde(default)]
    pub content_type: BodyType,
    /// Content.
    #[serde(default)]
    pub content: String,
}

/// Message importance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    /// Low.
    Low,
    /// Normal.
    #[default]
    Normal,
    /// High.
    High,
}

/// Follow-up flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FlagStatus {
    /// No flag.
    NotFlagged,
    /// Flagged for follow-up.
    Flagged,
    /// Follow-up done.
    Complete,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Flag {
    flag_status: FlagStatus,
}

/// Lifecycle state derived from id and draft flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Not persisted yet; no id.
    New,
    /// Persisted as a draft.
    Draft,
    /// Delivered.
    Sent,
}

/// Top-level keys of the message projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireKey {
    /// `subject`
    Subject,
    /// `body`
    Body,
    /// `importance`
    Importance,
    /// `from`
    From,
    /// `toRecipients`
    ToRecipients,
    /// `ccRecipients`
    CcRecipients,
    /// `bccRecipients`
    BccRecipients,
    /// `categories`
    Categories,
    /// `flag`
    Flag,
    /// `isRead`
    IsRead,
}

impl WireKey {
    /// JSON key as the service spells it.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Subject => "subject",
            Self::Body => "body",
            Self::Importance => "importance",
            Self::From => "from",
            Self::ToRecipients => "toRecipients",
            Self::CcRecipients => "ccRecipients",
            Self::BccRecipients => "bccRecipients",
            Self::Categories => "categories",
            Self::Flag => "flag",
            Self::IsRead => "isRead",
        }
    }
}

/// Initial field values for a new message.
#[derive(Debug, Clone, Default)]
pub struct MessageFields {
    /// `To` recipients.
    pub to: Vec<RecipientInput>,
    /// `Cc` recipients.
    pub cc: Vec<RecipientInput>,
    /// `Bcc` recipients.
    pub bcc: Vec<RecipientInput>,
    /// Subject line.
    pub subject: Option<String>,
    /// Body content.
    pub body: Option<String>,
    /// Body content type.
    pub body_type: Option<BodyType>,
    /// Importance.
    pub importance: Option<Importance>,
    /// Attachments.
    pub attachments: Vec<AttachmentInput>,
}

impl MessageFields {
    /// Empty field bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a `To` recipient.
    #[must_use]
    pub fn to(mut self, recipient: impl Into<RecipientInput>) -> Self {
        self.to.push(recipient.into());
        self
    }

    /// Adds a `Cc` recipient.
    #[must_use]
    pub fn cc(mut self, recipient: impl Into<RecipientInput>) -> Self {
        self.cc.push(recipient.into());
        self
    }

    /// Adds a `Bcc` recipient.
    #[must_use]
    pub fn bcc(mut self, recipient: impl Into<RecipientInput>) -> Self {
        self.bcc.push(recipient.into());
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Adds an attachment.
    #[must_use]
    pub fn attach(mut self, attachment: impl Into<AttachmentInput>) -> Self {
        self.attachments.push(attachment.into());
        self
    }
}

/// Server-assigned fields returned when a draft is created.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerStamp {
    id: String,
    parent_folder_id: Option<String>,
    #[serde(rename = "createdDateTime")]
    created_at: Option<DateTime<Utc>>,
    #[serde(rename = "lastModifiedDateTime")]
    last_modified_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteMessage {
    id: Option<String>,
    parent_folder_id: Option<String>,
    #[serde(default = "default_true")]
    is_draft: bool,
    is_read: Option<bool>,
    #[serde(rename = "createdDateTime")]
    created_at: Option<DateTime<Utc>>,
    #[serde(rename = "lastModifiedDateTime")]
    last_modified_at: Option<DateTime<Utc>>,
    from: Option<Value>,
    to_recipients: Option<Value>,
    cc_recipients: Option<Value>,
    bcc_recipients: Option<Value>,
    subject: Option<String>,
    body: Option<Body>,
    importance: Option<Importance>,
    #[serde(default)]
    categories: Vec<String>,
    flag: Option<Flag>,
    attachments: Option<Value>,
}

const fn default_true() -> bool {
    true
}

/// An Outlook message bound to one mailbox.
pub struct Message<T> {
    transport: Arc<T>,
    endpoints: Endpoints,
    id: Option<String>,
    folder_id: Option<String>,
    is_draft: bool,
    is_read: Option<bool>,
    created_at: Option<DateTime<Utc>>,
    last_modified_at: Option<DateTime<Utc>>,
    sender: Option<Recipient>,
    to_recipients: Recipients,
    cc_recipients: Recipients,
    bcc_recipients: Recipients,
    attachments: Attachments,
    subject: String,
    body: Body,
    importance: Importance,
    categories: Vec<String>,
    flag: Option<FlagStatus>,
    save_to_sent_items: bool,
}

impl<T> fmt::Debug for Message<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("mailbox", self.endpoints.mailbox())
            .field("id", &self.id)
            .field("is_draft", &self.is_draft)
            .field("subject", &self.subject)
            .field("to", &self.to_recipients.len())
            .field("cc", &self.cc_recipients.len())
            .field("bcc", &self.bcc_recipients.len())
            .field("attachments", &self.attachments.len())
            .finish_non_exhaustive()
    }
}

impl<T: Transport> Message<T> {
    /// Creates an unbound message. No request is made.
    #[must_use]
    pub fn new(transport: Arc<T>, endpoints: Endpoints) -> Self {
        Self {
            transport,
            endpoints,
            id: None,
            folder_id: None,
            is_draft: true,
            is_read: None,
            created_at: None,
            last_modified_at: None,
            sender: None,
            to_recipients: Recipients::new(),
            cc_recipients: Recipients::new(),
            bcc_recipients: Recipients::new(),
            attachments: Attachments::new(),
            subject: String::new(),
            body: Body::default(),
            importance: Importance::Normal,
            categories: Vec::new(),
            flag: None,
            save_to_sent_items: true,
        }
    }

    /// Creates an unbound message pre-populated from `fields`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if any recipient or attachment is malformed.
    pub fn with_fields(transport: Arc<T>, endpoints: Endpoints, fields: MessageFields) -> Result<Self> {
        let mut message = Self::new(transport, endpoints);
        message.to_recipients.extend(fields.to)?;
        message.cc_recipients.extend(fields.cc)?;
        message.bcc_recipients.extend(fields.bcc)?;
        message.attachments.extend(fields.attachments)?;
        if let Some(subject) = fields.subject {
            message.subject = subject;
        }
        if let Some(content) = fields.body {
            message.body.content = content;
        }
        if let Some(content_type) = fields.body_type {
            message.body.content_type = content_type;
        }
        if let Some(importance) = fields.importance {
            message.importance = importance;
        }
        Ok(message)
    }

    /// Rebuilds a message from its server representation, including id,
    /// flags and timestamps.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the representation is malformed.
    pub fn from_remote(transport: Arc<T>, endpoints: Endpoints, value: &Value) -> Result<Self> {
        let remote: RemoteMessage = serde_json::from_value(value.clone())
            .map_err(|e| Error::validation(format!("unrecognized message object: {e}")))?;

        let mut message = Self::new(transport, endpoints);
        message.id = remote.id;
        message.folder_id = remote.parent_folder_id;
        message.is_draft = remote.is_draft;
        message.is_read = remote.is_read;
        message.created_at = remote.created_at;
        message.last_modified_at = remote.last_modified_at;
        if let Some(from) = remote.from.filter(|v| !v.is_null()) {
            message.sender = Some(RecipientInput::try_from(&from)?.into_recipient()?);
        }
        for (list, value) in [
            (&mut message.to_recipients, remote.to_recipients),
            (&mut message.cc_recipients, remote.cc_recipients),
            (&mut message.bcc_recipients, remote.bcc_recipients),
        ] {
            if let Some(value) = value.filter(|v| !v.is_null()) {
                list.add_json(&value)?;
            }
        }
        if let Some(value) = remote.attachments.filter(|v| !v.is_null()) {
            message.attachments.add_json(&value)?;
        }
        message.subject = remote.subject.unwrap_or_default();
        message.body = remote.body.unwrap_or_default();
        message.importance = remote.importance.unwrap_or_default();
        message.categories = remote.categories;
        message.flag = remote.flag.map(|f| f.flag_status);
        Ok(message)
    }

    /// Server id; `None` until first persisted.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Parent folder id as reported by the service.
    #[must_use]
    pub fn folder_id(&self) -> Option<&str> {
        self.folder_id.as_deref()
    }

    /// True until the message has been sent.
    #[must_use]
    pub const fn is_draft(&self) -> bool {
        self.is_draft
    }

    /// Read state as last confirmed by the service.
    #[must_use]
    pub const fn is_read(&self) -> Option<bool> {
        self.is_read
    }

    /// Creation time reported by the service.
    #[must_use]
    pub const fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    /// Last modification time (server value or local estimate after a save).
    #[must_use]
    pub const fn last_modified_at(&self) -> Option<DateTime<Utc>> {
        self.last_modified_at
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> LifecycleState {
        match (&self.id, self.is_draft) {
            (None, _) => LifecycleState::New,
            (Some(_), true) => LifecycleState::Draft,
            (Some(_), false) => LifecycleState::Sent,
        }
    }

    /// Mailbox URLs this message is bound to.
    #[must_use]
    pub const fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Sender (`from`), if set.
    #[must_use]
    pub const fn sender(&self) -> Option<&Recipient> {
        self.sender.as_ref()
    }

    /// Sets the sender from an address string or a full recipient.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the address is malformed.
    pub fn set_sender(&mut self, sender: impl Into<RecipientInput>) -> Result<()> {
        self.sender = Some(sender.into().into_recipient()?);
        Ok(())
    }

    /// Subject line.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Sets the subject line.
    pub fn set_subject(&mut self, subject: impl Into<String>) {
        self.subject = subject.into();
    }

    /// Body.
    #[must_use]
    pub const fn body(&self) -> &Body {
        &self.body
    }

    /// Sets the body content, keeping the content type.
    pub fn set_body(&mut self, content: impl Into<String>) {
        self.body.content = content.into();
    }

    /// Sets the body content type.
    pub const fn set_body_type(&mut self, content_type: BodyType) {
        self.body.content_type = content_type;
    }

    /// Importance.
    #[must_use]
    pub const fn importance(&self) -> Importance {
        self.importance
    }

    /// Sets the importance.
    pub const fn set_importance(&mut self, importance: Importance) {
        self.importance = importance;
    }

    /// Categories.
    #[must_use]
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Replaces the categories.
    pub fn set_categories<I, S>(&mut self, categories: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
    }

    /// Follow-up flag.
    #[must_use]
    pub const fn flag(&self) -> Option<FlagStatus> {
        self.flag
    }

    /// Sets the follow-up flag.
    pub const fn set_flag(&mut self, flag: FlagStatus) {
        self.flag = Some(flag);
    }

    /// Whether a direct send keeps a copy in Sent Items (default true).
    pub const fn set_save_to_sent_items(&mut self, save: bool) {
        self.save_to_sent_items = save;
    }

    /// `To` recipients.
    #[must_use]
    pub const fn to_recipients(&self) -> &Recipients {
        &self.to_recipients
    }

    /// `To` recipients, for editing.
    pub const fn to_recipients_mut(&mut self) -> &mut Recipients {
        &mut self.to_recipients
    }

    /// `Cc` recipients.
    #[must_use]
    pub const fn cc_recipients(&self) -> &Recipients {
        &self.cc_recipients
    }

    /// `Cc` recipients, for editing.
    pub const fn cc_recipients_mut(&mut self) -> &mut Recipients {
        &mut self.cc_recipients
    }

    /// `Bcc` recipients.
    #[must_use]
    pub const fn bcc_recipients(&self) -> &Recipients {
        &self.bcc_recipients
    }

    /// `Bcc` recipients, for editing.
    pub const fn bcc_recipients_mut(&mut self) -> &mut Recipients {
        &mut self.bcc_recipients
    }

    /// Attachments.
    #[must_use]
    pub const fn attachments(&self) -> &Attachments {
        &self.attachments
    }

    /// Attachments, for editing.
    pub const fn attachments_mut(&mut self) -> &mut Attachments {
        &mut self.attachments
    }

    /// JSON projection sent on create, update and send.
    ///
    /// Collections and optional fields are left out when empty. With
    /// `limit`, only the listed keys survive.
    #[must_use]
    pub fn to_wire_format(&self, limit: Option<&[WireKey]>) -> Value {
        let mut map = Map::new();
        let mut put = |key: WireKey, value: Value| {
            if limit.is_none_or(|keys| keys.contains(&key)) {
                map.insert(key.as_str().to_string(), value);
            }
        };

        put(WireKey::Subject, json!(self.subject));
        put(WireKey::Body, json!(self.body));
        put(WireKey::Importance, json!(self.importance));
        if let Some(sender) = &self.sender {
            put(WireKey::From, sender.to_wire_format());
        }
        for (key, list) in [
            (WireKey::ToRecipients, &self.to_recipients),
            (WireKey::CcRecipients, &self.cc_recipients),
            (WireKey::BccRecipients, &self.bcc_recipients),
        ] {
            if !list.is_empty() {
                put(key, Value::Array(list.to_wire_format()));
            }
        }
        if !self.categories.is_empty() {
            put(WireKey::Categories, json!(self.categories));
        }
        if let Some(flag) = self.flag {
            put(WireKey::Flag, json!({ "flagStatus": flag }));
        }
        if let Some(is_read) = self.is_read {
            put(WireKey::IsRead, json!(is_read));
        }

        Value::Object(map)
    }

    /// Id usable in a resource URL.
    fn addressable_id(&self, operation: &str) -> Result<String> {
        match self.id.as_deref() {
            None => Err(Error::state(format!(
                "cannot {operation}: message has no id yet; save it first"
            ))),
            Some(DIRECT_SEND_ID) => Err(Error::state(format!(
                "cannot {operation}: message was sent directly and has no server id"
            ))),
            Some(id) => Ok(id.to_string()),
        }
    }

    /// Loads every pending attachment and rejects any that would need an
    /// upload session. Runs before the first request of a send.
    fn ensure_pending_inline(&self) -> Result<()> {
        for attachment in self.attachments.pending() {
            if attachment.upload_route()? == UploadRoute::UploadSession {
                return Err(Error::state(format!(
                    "attachment {:?} is too large to send inline; open an upload session with upload_attachments() on the saved draft",
                    attachment.name()
                )));
            }
        }
        Ok(())
    }

    /// Creates the draft, or updates it if it already exists.
    ///
    /// # Errors
    ///
    /// [`Error::State`] if the message was already sent; a remote error if
    /// the service rejects the request (the message is then unchanged).
    pub async fn save_draft(&mut self) -> Result<()> {
        match self.state() {
            LifecycleState::Sent => Err(Error::state(
                "message was already sent; it cannot be saved as a draft",
            )),
            LifecycleState::New => {
                let body = self.to_wire_format(None);
                let url = self.endpoints.drafts();
                debug!(%url, "creating draft");

                let created = self
                    .transport
                    .post(&url, Some(&body))
                    .await?
                    .into_result("create draft")?
                    .ok_or_else(|| Error::remote("create draft", "empty response"))?;
                let stamp: ServerStamp = serde_json::from_value(created).map_err(|e| {
                    Error::remote("create draft", format!("unexpected response: {e}"))
                })?;

                info!(id = %stamp.id, "draft created");
                self.id = Some(stamp.id);
                self.folder_id = stamp.parent_folder_id;
                self.created_at = stamp.created_at;
                self.last_modified_at = stamp.last_modified_at;
                Ok(())
            }
            LifecycleState::Draft => {
                let id = self.addressable_id("update draft")?;
                let body = self.to_wire_format(None);
                debug!(%id, "updating draft");

                let updated = self
                    .transport
                    .patch(&self.endpoints.message(&id), &body)
                    .await?
                    .into_result("update draft")?;
                self.touch(updated.as_ref());
                Ok(())
            }
        }
    }

    /// Saves the message.
    ///
    /// A sent message only patches the whitelisted after-send fields
    /// ([`SAVE_AFTER_SEND_WHITELIST`]); anything else goes through
    /// [`save_draft`](Self::save_draft).
    ///
    /// # Errors
    ///
    /// [`Error::State`] if a sent message has no addressable id; a remote
    /// error if the service rejects the request.
    pub async fn save(&mut self) -> Result<()> {
        if self.state() != LifecycleState::Sent {
            return self.save_draft().await;
        }

        let id = self.addressable_id("save")?;
        let body = self.to_wire_format(Some(&SAVE_AFTER_SEND_WHITELIST));
        debug!(%id, "updating sent message");

        let updated = self
            .transport
            .patch(&self.endpoints.message(&id), &body)
            .await?
            .into_result("update message")?;
        self.touch(updated.as_ref());
        Ok(())
    }

    /// Adopts the server's modification time, or stamps a local estimate.
    fn touch(&mut self, response: Option<&Value>) {
        let server_time = response
            .and_then(|b| b.get("lastModifiedDateTime"))
            .and_then(|v| serde_json::from_value::<DateTime<Utc>>(v.clone()).ok());
        self.last_modified_at = Some(server_time.unwrap_or_else(Utc::now));
    }

    /// Uploads every pending attachment to the draft, in order.
    ///
    /// Small attachments are attached directly; large ones get an upload
    /// session, returned for the caller to fill. Attachments that already
    /// have a session are skipped, and no longer block [`send`](Self::send).
    ///
    /// # Errors
    ///
    /// [`Error::State`] unless the message is a saved draft,
    /// [`Error::Resource`] if a file cannot be read (checked before any
    /// request), and remote errors from the service.
    pub async fn upload_attachments(&mut self) -> Result<Vec<UploadOutcome>> {
        if self.state() != LifecycleState::Draft {
            return Err(Error::state(
                "attachments can only be uploaded to a saved draft",
            ));
        }
        let id = self.addressable_id("upload attachments")?;

        for attachment in self.attachments.pending() {
            attachment.size()?;
        }

        let mut outcomes = Vec::new();
        for attachment in self
            .attachments
            .iter_mut()
            .filter(|a| a.is_pending())
        {
            outcomes.push(
                attachment
                    .upload(self.transport.as_ref(), &self.endpoints, &id)
                    .await?,
            );
        }
        Ok(outcomes)
    }

    /// Sends the message.
    ///
    /// A draft is flushed with [`save_draft`](Self::save_draft), its pending
    /// attachments are uploaded, and the draft is sent. A new message is
    /// sent in one `sendMail` request with its attachments inline; no draft
    /// is created.
    ///
    /// # Errors
    ///
    /// [`Error::State`] if the message was already sent or an attachment is
    /// too large to go inline; [`Error::Resource`] if a file cannot be read;
    /// remote errors from the service.
    pub async fn send(&mut self) -> Result<()> {
        match self.state() {
            LifecycleState::Sent => Err(Error::state("message was already sent")),
            LifecycleState::Draft => {
                self.ensure_pending_inline()?;
                self.save_draft().await?;
                self.upload_attachments().await?;

                let id = self.addressable_id("send draft")?;
                self.transport
                    .post(&self.endpoints.send_draft(&id), None)
                    .await?
                    .into_result("send draft")?;

                info!(%id, "draft sent");
                self.is_draft = false;
                Ok(())
            }
            LifecycleState::New => {
                self.ensure_pending_inline()?;
                let mut message = self.to_wire_format(None);
                if self.attachments.pending().next().is_some() {
                    message["attachments"] = Value::Array(self.attachments.to_wire_format()?);
                }
                let envelope = json!({
                    "message": message,
                    "saveToSentItems": self.save_to_sent_items,
                });

                self.transport
                    .post(&self.endpoints.send_mail(), Some(&envelope))
                    .await?
                    .into_result("send message")?;

                info!("message sent directly");
                self.id = Some(DIRECT_SEND_ID.to_string());
                self.is_draft = false;
                Ok(())
            }
        }
    }

    /// Marks the message read.
    ///
    /// # Errors
    ///
    /// [`Error::State`] if the message has no id; remote errors from the service.
    pub async fn mark_as_read(&mut self) -> Result<()> {
        self.set_read(true).await
    }

    /// Marks the message unread.
    ///
    /// # Errors
    ///
    /// [`Error::State`] if the message has no id; remote errors from the service.
    pub async fn mark_as_unread(&mut self) -> Result<()> {
        self.set_read(false).await
    }

    async fn set_read(&mut self, read: bool) -> Result<()> {
        let id = self.addressable_id("change read state")?;
        self.transport
            .patch(&self.endpoints.message(&id), &json!({ "isRead": read }))
            .await?
            .into_result("change read state")?;
        self.is_read = Some(read);
        Ok(())
    }
}
