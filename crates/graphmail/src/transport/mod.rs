//! The HTTP seam between the object model and the Graph service.
//!
//! Messages and attachments never talk to the network directly; they hand
//! a URL and a JSON body to a [`Transport`] and only look at whether the
//! response succeeded and what JSON came back.

mod http;

use std::future::Future;

use serde_json::Value;

use crate::error::{Error, Result};

pub use http::GraphClient;

/// Authenticated JSON transport.
///
/// `Err` means the request could not be carried out at all (network, auth);
/// a delivered but rejected request is an `Ok` [`Response`] whose
/// [`is_success`](Response::is_success) is false.
pub trait Transport: Send + Sync {
    /// Issues a `POST`; `None` sends an empty body.
    fn post(
        &self,
        url: &str,
        body: Option<&Value>,
    ) -> impl Future<Output = Result<Response>> + Send;

    /// Issues a `PATCH`.
    fn patch(&self, url: &str, body: &Value) -> impl Future<Output = Result<Response>> + Send;
}

/// Outcome of a delivered request.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    success: bool,
    body: Option<Value>,
}

impl Response {
    /// A successful response with a JSON body.
    #[must_use]
    pub const fn ok(body: Value) -> Self {
        Self {
            success: true,
            body: Some(body),
        }
    }

    /// A successful response without a body (e.g. `202 Accepted`).
    #[must_use]
    pub const fn accepted() -> Self {
        Self {
            success: true,
            body: None,
        }
    }

    /// A rejected request, optionally carrying the service's error body.
    #[must_use]
    pub const fn failed(body: Option<Value>) -> Self {
        Self {
            success: false,
            body,
        }
    }

    /// Whether the service accepted the request.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.success
    }

    /// Decoded body, if any.
    #[must_use]
    pub const fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Turns a rejection into [`Error::Remote`], otherwise yields the body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Remote`] if the request was not successful.
    pub fn into_result(self, operation: &str) -> Result<Option<Value>> {
        if self.success {
            return Ok(self.body);
        }

        // Graph error envelope: {"error": {"code": "...", "message": "..."}}
        let message = self
            .body
            .as_ref()
            .and_then(|b| {
                let error = b.get("error")?;
                error
                    .get("message")
                    .or_else(|| error.get("code"))
                    .and_then(Value::as_str)
            })
            .unwrap_or("request rejected by service");
        Err(Error::remote(operation, message))
    }
}
