//! Service configuration.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// Graph v1.0 endpoint in the public cloud.
pub const DEFAULT_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Graph service configuration, threaded through every [`Account`](crate::Account).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Service root all resource paths are appended to.
    #[serde(
        default = "default_base_url",
        deserialize_with = "deserialize_base_url"
    )]
    base_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

/// Parses `raw` and returns it without a trailing slash.
fn validate_base_url(raw: &str) -> Result<String> {
    let url = Url::parse(raw).map_err(|e| Error::InvalidConfig(format!("base_url {raw:?}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::InvalidConfig(format!(
            "base_url must be http(s), got {}",
            url.scheme()
        )));
    }
    Ok(url.as_str().trim_end_matches('/').to_string())
}

fn deserialize_base_url<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    validate_base_url(&raw).map_err(serde::de::Error::custom)
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl GraphConfig {
    /// Creates a configuration builder.
    #[must_use]
    pub fn builder() -> GraphConfigBuilder {
        GraphConfigBuilder::default()
    }

    /// Request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Base URL without a trailing slash, ready for path concatenation.
    #[must_use]
    pub fn root(&self) -> &str {
        &self.base_url
    }
}

/// Builder for [`GraphConfig`].
#[derive(Debug, Clone, Default)]
pub struct GraphConfigBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
}

impl GraphConfigBuilder {
    /// Sets the service root (e.g. a national cloud or a test server).
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the base URL does not parse or is
    /// not http(s).
    pub fn build(self) -> Result<GraphConfig> {
        let base_url = match self.base_url {
            Some(raw) => validate_base_url(&raw)?,
            None => default_base_url(),
        };

        Ok(GraphConfig {
            base_url,
            timeout_secs: self
                .timeout
                .map_or(DEFAULT_TIMEOUT_SECS, |t| t.as_secs().max(1)),
        })
    }
}
