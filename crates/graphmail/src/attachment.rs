//! File attachments.
//!
//! An attachment comes from exactly one place: a local file (read lazily,
//! once), bytes supplied in memory, or the server itself (cloud-resident,
//! already carrying an id). Local and in-memory payloads below
//! [`LARGE_ATTACHMENT_THRESHOLD`] are posted inline as base64; anything at
//! or above it must go through an upload session.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::endpoint::Endpoints;
use crate::error::{Error, Result};
use crate::transport::Transport;

/// Size in bytes from which inline attachment is refused by the service.
pub const LARGE_ATTACHMENT_THRESHOLD: u64 = 5_000_000;

const FILE_ATTACHMENT_TYPE: &str = "#microsoft.graph.fileAttachment";

/// Reads local attachment content.
pub trait FileSource: Send + Sync + fmt::Debug {
    /// Reads the whole file.
    ///
    /// # Errors
    ///
    /// Any I/O error reading `path`.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl FileSource for LocalFs {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}

/// Where an attachment's bytes come from.
#[derive(Debug, Clone)]
pub enum AttachmentOrigin {
    /// A local file, loaded on first access and cached.
    File {
        /// Path on disk.
        path: PathBuf,
        /// Cached content.
        content: OnceLock<Vec<u8>>,
        /// Reader used to load `path`.
        source: Arc<dyn FileSource>,
    },
    /// Bytes held in memory.
    Memory {
        /// Raw content.
        content: Vec<u8>,
    },
    /// Already stored by the service.
    Cloud {
        /// Size reported by the service.
        size: u64,
    },
}

/// How an attachment has to be transferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadRoute {
    /// One `POST` with base64 `contentBytes`.
    Inline,
    /// A chunked upload session.
    UploadSession,
}

impl UploadRoute {
    /// Route for a payload of `size` bytes.
    #[must_use]
    pub const fn for_size(size: u64) -> Self {
        if size >= LARGE_ATTACHMENT_THRESHOLD {
            Self::UploadSession
        } else {
            Self::Inline
        }
    }
}

/// Upload session opened for a large attachment.
///
/// The byte-range `PUT`s against `upload_url` are up to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSession {
    /// Pre-authenticated URL accepting the byte ranges.
    pub upload_url: String,
    /// When the session lapses.
    #[serde(default, rename = "expirationDateTime")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Ranges the service still expects (e.g. `"0-"`).
    #[serde(default)]
    pub next_expected_ranges: Vec<String>,
}

/// Result of [`Attachment::upload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Attached inline; the service assigned `id`.
    Attached {
        /// Server attachment id.
        id: String,
    },
    /// Too large to inline; a session was opened instead.
    SessionOpened(UploadSession),
}

/// A file attached to a message.
#[derive(Debug, Clone)]
pub struct Attachment {
    name: String,
    origin: AttachmentOrigin,
    content_type: Option<String>,
    is_inline: bool,
    content_id: Option<String>,
    id: Option<String>,
    session: Option<UploadSession>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteAttachment {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    size: u64,
    content_type: Option<String>,
    #[serde(default)]
    is_inline: bool,
    content_id: Option<String>,
}

impl Attachment {
    fn with_origin(name: String, origin: AttachmentOrigin) -> Self {
        Self {
            name,
            origin,
            content_type: None,
            is_inline: false,
            content_id: None,
            id: None,
            session: None,
        }
    }

    /// Attaches a local file. Nothing is read until the content is needed.
    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::from_path_with_source(path, Arc::new(LocalFs))
    }

    /// Attaches a file read through `source`.
    #[must_use]
    pub fn from_path_with_source(path: impl Into<PathBuf>, source: Arc<dyn FileSource>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map_or_else(|| "attachment".to_string(), |n| n.to_string_lossy().into_owned());
        Self::with_origin(
            name,
            AttachmentOrigin::File {
                path,
                content: OnceLock::new(),
                source,
            },
        )
    }

    /// Attaches raw bytes.
    #[must_use]
    pub fn from_bytes(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self::with_origin(
            name.into(),
            AttachmentOrigin::Memory {
                content: content.into(),
            },
        )
    }

    /// Attaches content that is already base64-encoded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if `encoded` is not valid base64.
    pub fn from_base64(name: impl Into<String>, encoded: &str) -> Result<Self> {
        let content = STANDARD
            .decode(encoded.trim())
            .map_err(|e| Error::validation(format!("attachment content is not base64: {e}")))?;
        Ok(Self::from_bytes(name, content))
    }

    /// Mirrors a server `attachment` resource. No local I/O is ever done for it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the object has no `id`.
    pub fn from_remote(value: &Value) -> Result<Self> {
        let remote: RemoteAttachment = serde_json::from_value(value.clone())
            .map_err(|e| Error::validation(format!("unrecognized attachment object: {e}")))?;

        Ok(Self {
            name: remote.name,
            origin: AttachmentOrigin::Cloud { size: remote.size },
            content_type: remote.content_type,
            is_inline: remote.is_inline,
            content_id: remote.content_id,
            id: Some(remote.id),
            session: None,
        })
    }

    /// Overrides the file name shown to recipients.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the MIME type (otherwise the service infers one).
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Marks the attachment inline, referenced from the HTML body as `cid:{content_id}`.
    #[must_use]
    pub fn inline(mut self, content_id: impl Into<String>) -> Self {
        self.is_inline = true;
        self.content_id = Some(content_id.into());
        self
    }

    /// File name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Server id, present once cloud-resident or successfully attached.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// MIME type, if known.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Whether the attachment is rendered inline.
    #[must_use]
    pub const fn is_inline(&self) -> bool {
        self.is_inline
    }

    /// Content id for inline attachments.
    #[must_use]
    pub fn content_id(&self) -> Option<&str> {
        self.content_id.as_deref()
    }

    /// Where the content comes from.
    #[must_use]
    pub const fn origin(&self) -> &AttachmentOrigin {
        &self.origin
    }

    /// True for attachments that only exist server-side.
    #[must_use]
    pub const fn is_cloud(&self) -> bool {
        matches!(self.origin, AttachmentOrigin::Cloud { .. })
    }

    /// True once the service holds this attachment.
    #[must_use]
    pub const fn is_uploaded(&self) -> bool {
        self.id.is_some()
    }

    /// Upload session opened for this attachment, if any.
    #[must_use]
    pub const fn upload_session(&self) -> Option<&UploadSession> {
        self.session.as_ref()
    }

    /// True while the service has neither the attachment nor an open
    /// upload session for it.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        !self.is_cloud() && !self.is_uploaded() && self.session.is_none()
    }

    /// Content bytes, reading the file on first call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Resource`] if the file cannot be read, or
    /// [`Error::State`] for cloud-resident attachments.
    pub fn content(&self) -> Result<&[u8]> {
        match &self.origin {
            AttachmentOrigin::File {
                path,
                content,
                source,
            } => {
                if let Some(bytes) = content.get() {
                    return Ok(bytes.as_slice());
                }
                let bytes = source.read(path).map_err(|source| Error::Resource {
                    path: path.clone(),
                    source,
                })?;
                debug!(path = %path.display(), bytes = bytes.len(), "loaded attachment");
                Ok(content.get_or_init(|| bytes).as_slice())
            }
            AttachmentOrigin::Memory { content } => Ok(content.as_slice()),
            AttachmentOrigin::Cloud { .. } => Err(Error::state(format!(
                "content of cloud attachment {:?} is held by the service",
                self.name
            ))),
        }
    }

    /// Size in bytes. Loads local files.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Resource`] if a local file cannot be read.
    pub fn size(&self) -> Result<u64> {
        match &self.origin {
            AttachmentOrigin::Cloud { size } => Ok(*size),
            _ => Ok(self.content()?.len() as u64),
        }
    }

    /// Decides between inline and upload-session transfer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Resource`] if a local file cannot be read.
    pub fn upload_route(&self) -> Result<UploadRoute> {
        Ok(UploadRoute::for_size(self.size()?))
    }

    /// Graph `fileAttachment` body with base64 content.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Resource`] or [`Error::State`] as [`content`](Self::content) does.
    pub fn to_wire_format(&self) -> Result<Value> {
        let mut body = Map::new();
        body.insert("@odata.type".into(), json!(FILE_ATTACHMENT_TYPE));
        body.insert("name".into(), json!(self.name));
        body.insert("contentBytes".into(), json!(STANDARD.encode(self.content()?)));
        if let Some(content_type) = &self.content_type {
            body.insert("contentType".into(), json!(content_type));
        }
        body.insert("isInline".into(), json!(self.is_inline));
        if let Some(content_id) = &self.content_id {
            body.insert("contentId".into(), json!(content_id));
        }
        Ok(Value::Object(body))
    }

    fn upload_session_request(&self) -> Result<Value> {
        let mut item = Map::new();
        item.insert("attachmentType".into(), json!("file"));
        item.insert("name".into(), json!(self.name));
        item.insert("size".into(), json!(self.size()?));
        if let Some(content_type) = &self.content_type {
            item.insert("contentType".into(), json!(content_type));
        }
        if self.is_inline {
            item.insert("isInline".into(), json!(true));
        }
        if let Some(content_id) = &self.content_id {
            item.insert("contentId".into(), json!(content_id));
        }
        Ok(json!({ "AttachmentItem": item }))
    }

    /// Checks that this attachment may still be uploaded.
    pub(crate) fn ensure_uploadable(&self) -> Result<()> {
        if self.is_cloud() {
            return Err(Error::state(format!(
                "attachment {:?} already exists server-side",
                self.name
            )));
        }
        if self.is_uploaded() {
            return Err(Error::state(format!(
                "attachment {:?} was already uploaded",
                self.name
            )));
        }
        if self.session.is_some() {
            return Err(Error::state(format!(
                "attachment {:?} already has an upload session",
                self.name
            )));
        }
        Ok(())
    }

    /// Uploads to the message `message_id`.
    ///
    /// Below the threshold the file is attached in one request and this
    /// attachment adopts the returned id. At or above it an upload session is
    /// opened, remembered on the attachment and returned; transferring the
    /// bytes into it is up to the caller.
    ///
    /// # Errors
    ///
    /// [`Error::State`] for cloud-resident or already uploaded attachments and
    /// for attachments that already have a session,
    /// [`Error::Resource`] if the file cannot be read, and a remote error if
    /// the service rejects the request.
    pub async fn upload<T: Transport>(
        &mut self,
        transport: &T,
        endpoints: &Endpoints,
        message_id: &str,
    ) -> Result<UploadOutcome> {
        self.ensure_uploadable()?;

        match self.upload_route()? {
            UploadRoute::Inline => {
                let body = self.to_wire_format()?;
                let created = transport
                    .post(&endpoints.attachments(message_id), Some(&body))
                    .await?
                    .into_result("attach file")?;

                let id = created
                    .as_ref()
                    .and_then(|b| b.get("id"))
                    .and_then(Value::as_str)
                    .ok_or_else(|| Error::remote("attach file", "response carried no id"))?
                    .to_string();

                debug!(name = %self.name, %id, "attachment uploaded inline");
                self.id = Some(id.clone());
                Ok(UploadOutcome::Attached { id })
            }
            UploadRoute::UploadSession => {
                let body = self.upload_session_request()?;
                let created = transport
                    .post(&endpoints.upload_session(message_id), Some(&body))
                    .await?
                    .into_result("create upload session")?
                    .ok_or_else(|| Error::remote("create upload session", "empty response"))?;

                let session: UploadSession = serde_json::from_value(created).map_err(|e| {
                    Error::remote("create upload session", format!("unexpected response: {e}"))
                })?;
                debug!(name = %self.name, "upload session opened");
                self.session = Some(session.clone());
                Ok(UploadOutcome::SessionOpened(session))
            }
        }
    }
}

/// Any accepted way of naming an attachment.
#[derive(Debug, Clone)]
pub enum AttachmentInput {
    /// A local file; the name is taken from the path.
    Path(PathBuf),
    /// `(path, name)`.
    Named(PathBuf, String),
    /// An already-built attachment.
    Attachment(Attachment),
}

impl AttachmentInput {
    /// Resolves the input into an [`Attachment`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an empty path or name.
    pub fn into_attachment(self) -> Result<Attachment> {
        match self {
            Self::Path(path) => {
                ensure_path(&path)?;
                Ok(Attachment::from_path(path))
            }
            Self::Named(path, name) => {
                ensure_path(&path)?;
                if name.trim().is_empty() {
                    return Err(Error::validation("attachment name cannot be empty"));
                }
                Ok(Attachment::from_path(path).with_name(name))
            }
            Self::Attachment(attachment) => Ok(attachment),
        }
    }
}

fn ensure_path(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(Error::validation("attachment path cannot be empty"));
    }
    Ok(())
}

impl From<&str> for AttachmentInput {
    fn from(path: &str) -> Self {
        Self::Path(path.into())
    }
}

impl From<String> for AttachmentInput {
    fn from(path: String) -> Self {
        Self::Path(path.into())
    }
}

impl From<&Path> for AttachmentInput {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for AttachmentInput {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl<P: Into<PathBuf>, N: Into<String>> From<(P, N)> for AttachmentInput {
    fn from((path, name): (P, N)) -> Self {
        Self::Named(path.into(), name.into())
    }
}

impl From<Attachment> for AttachmentInput {
    fn from(attachment: Attachment) -> Self {
        Self::Attachment(attachment)
    }
}

impl TryFrom<&Value> for AttachmentInput {
    type Error = Error;

    fn try_from(value: &Value) -> Result<Self> {
        match value {
            Value::String(path) => Ok(Self::Path(path.into())),
            Value::Array(pair) => match pair.as_slice() {
                [Value::String(path), Value::String(name)] => {
                    Ok(Self::Named(path.into(), name.clone()))
                }
                _ => Err(Error::validation(
                    "attachment pair must be [path, name] strings",
                )),
            },
            Value::Object(_) => Ok(Self::Attachment(Attachment::from_remote(value)?)),
            other => Err(Error::validation(format!(
                "unrecognized attachment value: {other}"
            ))),
        }
    }
}

/// Ordered attachment list.
#[derive(Debug, Clone, Default)]
pub struct Attachments {
    items: Vec<Attachment>,
}

impl Attachments {
    /// Creates an empty collection.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Appends one attachment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the input is malformed.
    pub fn add(&mut self, input: impl Into<AttachmentInput>) -> Result<()> {
        self.items.push(input.into().into_attachment()?);
        Ok(())
    }

    /// Appends several attachments in order. Nothing is added if any fails.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for the first malformed input.
    pub fn extend<I, A>(&mut self, inputs: I) -> Result<()>
    where
        I: IntoIterator<Item = A>,
        A: Into<AttachmentInput>,
    {
        let resolved = inputs
            .into_iter()
            .map(|input| input.into().into_attachment())
            .collect::<Result<Vec<_>>>()?;
        self.items.extend(resolved);
        Ok(())
    }

    /// Appends a JSON value or array (paths, `[path, name]` pairs, or
    /// server attachment objects).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for any unrecognized shape.
    pub fn add_json(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Array(values) => self.extend(
                values
                    .iter()
                    .map(AttachmentInput::try_from)
                    .collect::<Result<Vec<_>>>()?,
            ),
            single => self.add(AttachmentInput::try_from(single)?),
        }
    }

    /// Number of attachments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when there are no attachments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Attachment at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Attachment> {
        self.items.get(index)
    }

    /// Iterates in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Attachment> {
        self.items.iter()
    }

    /// Iterates mutably in insertion order.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Attachment> {
        self.items.iter_mut()
    }

    /// Removes and returns the attachment at `index`.
    pub fn remove(&mut self, index: usize) -> Option<Attachment> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    /// Attachments the service neither holds nor has a session open for.
    pub fn pending(&self) -> impl Iterator<Item = &Attachment> {
        self.items.iter().filter(|a| a.is_pending())
    }

    /// Inline `fileAttachment` bodies for every pending attachment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Resource`] if any file cannot be read.
    pub fn to_wire_format(&self) -> Result<Vec<Value>> {
        self.pending().map(Attachment::to_wire_format).collect()
    }
}

impl<'a> IntoIterator for &'a Attachments {
    type Item = &'a Attachment;
    type IntoIter = std::slice::Iter<'a, Attachment>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::cast_possible_truncation)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory filesystem counting reads.
    #[derive(Debug, Default)]
    struct FakeFs {
        files: Mutex<std::collections::HashMap<PathBuf, Vec<u8>>>,
        reads: AtomicUsize,
    }

    impl FakeFs {
        fn with_file(path: &str, content: &[u8]) -> Arc<Self> {
            let fs = Self::default();
            fs.files
                .lock()
                .unwrap()
                .insert(PathBuf::from(path), content.to_vec());
            Arc::new(fs)
        }

        fn delete(&self, path: &str) {
            self.files.lock().unwrap().remove(Path::new(path));
        }
    }

    impl FileSource for FakeFs {
        fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.files
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
        }
    }

    #[test]
    fn test_threshold_boundary() {
        assert_eq!(UploadRoute::for_size(0), UploadRoute::Inline);
        assert_eq!(UploadRoute::for_size(4_999_999), UploadRoute::Inline);
        assert_eq!(UploadRoute::for_size(5_000_000), UploadRoute::UploadSession);
        assert_eq!(UploadRoute::for_size(5_000_001), UploadRoute::UploadSession);
    }

    #[test]
    fn test_route_from_content_size() {
        let below = Attachment::from_bytes("a.bin", vec![0u8; 4_999_999]);
        assert_eq!(below.upload_route().unwrap(), UploadRoute::Inline);

        let exact = Attachment::from_bytes("b.bin", vec![0u8; LARGE_ATTACHMENT_THRESHOLD as usize]);
        assert_eq!(exact.upload_route().unwrap(), UploadRoute::UploadSession);
    }

    #[test]
    fn test_file_read_lazily_and_once() {
        let fs = FakeFs::with_file("/docs/report.pdf", b"%PDF");
        let attachment = Attachment::from_path_with_source("/docs/report.pdf", fs.clone());

        assert_eq!(attachment.name(), "report.pdf");
        assert_eq!(fs.reads.load(Ordering::SeqCst), 0);

        assert_eq!(attachment.content().unwrap(), b"%PDF");
        assert_eq!(attachment.size().unwrap(), 4);
        assert_eq!(fs.reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_missing_file_fails_only_on_access() {
        let fs = FakeFs::with_file("/tmp/gone.txt", b"bye");
        let attachment = Attachment::from_path_with_source("/tmp/gone.txt", fs.clone());
        fs.delete("/tmp/gone.txt");

        let err = attachment.content().unwrap_err();
        assert!(matches!(err, Error::Resource { ref path, .. } if path == Path::new("/tmp/gone.txt")));
        assert!(matches!(attachment.upload_route(), Err(Error::Resource { .. })));
    }

    #[test]
    fn test_real_file_deleted_before_access() {
        let path = std::env::temp_dir().join(format!("graphmail-{}.txt", std::process::id()));
        std::fs::write(&path, b"hello").unwrap();

        let attachment = Attachment::from_path(&path);
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(attachment.content(), Err(Error::Resource { .. })));
    }

    #[test]
    fn test_cloud_attachment() {
        let attachment = Attachment::from_remote(&json!({
            "@odata.type": "#microsoft.graph.fileAttachment",
            "id": "AAMkAD=",
            "name": "logo.png",
            "size": 2048,
            "contentType": "image/png",
            "isInline": true,
            "contentId": "logo"
        }))
        .unwrap();

        assert!(attachment.is_cloud());
        assert!(attachment.is_uploaded());
        assert_eq!(attachment.size().unwrap(), 2048);
        assert_eq!(attachment.content_id(), Some("logo"));
        assert!(matches!(attachment.content(), Err(Error::State(_))));
        assert!(matches!(attachment.ensure_uploadable(), Err(Error::State(_))));
    }

    #[test]
    fn test_remote_without_id_rejected() {
        assert!(matches!(
            Attachment::from_remote(&json!({"name": "x"})),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_wire_format() {
        let attachment = Attachment::from_bytes("hi.txt", b"hi".to_vec())
            .with_content_type("text/plain")
            .inline("cid-1");
        assert_eq!(
            attachment.to_wire_format().unwrap(),
            json!({
                "@odata.type": "#microsoft.graph.fileAttachment",
                "name": "hi.txt",
                "contentBytes": "aGk=",
                "contentType": "text/plain",
                "isInline": true,
                "contentId": "cid-1"
            })
        );
    }

    #[test]
    fn test_upload_session_request() {
        let attachment = Attachment::from_bytes("big.iso", vec![1u8; 16]);
        assert_eq!(
            attachment.upload_session_request().unwrap(),
            json!({"AttachmentItem": {"attachmentType": "file", "name": "big.iso", "size": 16}})
        );
    }

    #[test]
    fn test_open_session_is_no_longer_pending() {
        let mut attachment = Attachment::from_bytes("big.iso", vec![1u8; 16]);
        assert!(attachment.is_pending());

        attachment.session = Some(UploadSession {
            upload_url: "https://outlook.office.com/upload/1".into(),
            expires_at: None,
            next_expected_ranges: vec!["0-".into()],
        });
        assert!(!attachment.is_pending());
        assert!(!attachment.is_uploaded());
        assert!(matches!(attachment.ensure_uploadable(), Err(Error::State(_))));
    }

    #[test]
    fn test_from_base64() {
        let attachment = Attachment::from_base64("hi.txt", "aGk=").unwrap();
        assert_eq!(attachment.content().unwrap(), b"hi");
        assert!(matches!(
            Attachment::from_base64("x", "***"),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_collection_inputs() {
        let mut list = Attachments::new();
        list.add("/srv/a.txt").unwrap();
        list.add(("/srv/b.txt", "renamed.txt")).unwrap();
        list.add_json(&json!([{"id": "c1", "name": "c.txt", "size": 1}]))
            .unwrap();

        let names: Vec<_> = list.iter().map(Attachment::name).collect();
        assert_eq!(names, ["a.txt", "renamed.txt", "c.txt"]);
        assert_eq!(list.pending().count(), 2);
    }

    #[test]
    fn test_collection_rejects_bad_input() {
        let mut list = Attachments::new();
        assert!(list.add("").is_err());
        assert!(list.add(("/srv/a.txt", " ")).is_err());
        assert!(list.add_json(&json!(7)).is_err());
        assert!(list.add_json(&json!([["only-path"]])).is_err());
        assert!(list.is_empty());
    }
}
