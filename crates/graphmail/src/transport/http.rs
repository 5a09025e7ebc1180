//! reqwest-backed [`Transport`] with lazily acquired bearer tokens.

use graphmail_oauth::{ClientCredentials, Token};
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH};
use reqwest::{Client, Method};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{Response, Transport};
use crate::config::GraphConfig;
use crate::error::{Error, Result};

/// Graph HTTP client.
///
/// The token is fetched on the first request and reused until it is about
/// to expire. One client may be shared (behind an `Arc`) by any number of
/// accounts and messages; concurrent callers serialize on the token lock.
#[derive(Debug)]
pub struct GraphClient {
    http: Client,
    credentials: Option<ClientCredentials>,
    token: Mutex<Option<Token>>,
}

impl GraphClient {
    /// Creates a client that authenticates with `credentials`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(credentials: ClientCredentials, config: &GraphConfig) -> Result<Self> {
        Ok(Self {
            http: Self::http_client(config)?,
            credentials: Some(credentials),
            token: Mutex::new(None),
        })
    }

    /// Creates a client around an already-issued token (no refresh).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn with_token(token: Token, config: &GraphConfig) -> Result<Self> {
        Ok(Self {
            http: Self::http_client(config)?,
            credentials: None,
            token: Mutex::new(Some(token)),
        })
    }

    fn http_client(config: &GraphConfig) -> Result<Client> {
        Ok(Client::builder().timeout(config.timeout()).build()?)
    }

    async fn authorization(&self) -> Result<String> {
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref().filter(|t| !t.is_expired()) {
            return Ok(token.authorization_header());
        }

        let credentials = self.credentials.as_ref().ok_or_else(|| {
            Error::InvalidConfig("token expired and no credentials to renew it".into())
        })?;

        debug!(client_id = %credentials.client_id, "acquiring Graph token");
        let token = credentials.acquire_token(&self.http).await?;
        let header = token.authorization_header();
        *cached = Some(token);
        Ok(header)
    }

    async fn request(&self, method: Method, url: &str, body: Option<&Value>) -> Result<Response> {
        let authorization = self.authorization().await?;

        debug!(%method, url, "Graph request");
        let mut request = self
            .http
            .request(method.clone(), url)
            .header(AUTHORIZATION, authorization);
        request = match body {
            Some(json) => request.json(json),
            // Graph rejects body-less POSTs that omit Content-Length.
            None => request.header(CONTENT_LENGTH, 0),
        };

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            warn!(%method, url, %status, "Graph request rejected");
            let body = if text.trim().is_empty() {
                None
            } else {
                Some(serde_json::from_str(&text).unwrap_or(Value::String(text)))
            };
            return Ok(Response::failed(body));
        }

        if text.trim().is_empty() {
            return Ok(Response::accepted());
        }
        Ok(Response::ok(serde_json::from_str(&text)?))
    }
}

impl Transport for GraphClient {
    async fn post(&self, url: &str, body: Option<&Value>) -> Result<Response> {
        self.request(Method::POST, url, body).await
    }

    async fn patch(&self, url: &str, body: &Value) -> Result<Response> {
        self.request(Method::PATCH, url, Some(body)).await
    }
}
