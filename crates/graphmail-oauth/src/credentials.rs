//! Client-credentials grant (RFC 6749 §4.4) against the Microsoft identity platform.

use crate::error::{Error, Result};
use crate::token::{ErrorResponse, Token, TokenResponse};
use chrono::Utc;
use reqwest::Client;
use std::collections::HashMap;
use std::env;
use tracing::debug;
use url::Url;

/// Scope requesting every application permission granted to the app.
pub const GRAPH_DEFAULT_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Public-cloud authority host.
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

/// Application identity used to obtain Graph tokens.
#[derive(Clone)]
pub struct ClientCredentials {
    /// Directory (tenant) id.
    pub tenant_id: String,
    /// Application (client) id.
    pub client_id: String,
    client_secret: String,
    /// Authority host, overridable for national clouds.
    pub authority: String,
    /// Requested scopes.
    pub scopes: Vec<String>,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("authority", &self.authority)
            .field("scopes", &self.scopes)
            .finish()
    }
}

impl ClientCredentials {
    /// Creates credentials for the public cloud with the Graph default scope.
    #[must_use]
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            authority: DEFAULT_AUTHORITY.to_string(),
            scopes: vec![GRAPH_DEFAULT_SCOPE.to_string()],
        }
    }

    /// Reads `GRAPH_TENANT_ID`, `GRAPH_CLIENT_ID` and `GRAPH_CLIENT_SECRET`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] naming the first missing variable.
    pub fn from_env() -> Result<Self> {
        let var = |name: &str| {
            env::var(name)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| Error::InvalidConfig(format!("{name} is not set")))
        };

        Ok(Self::new(
            var("GRAPH_TENANT_ID")?,
            var("GRAPH_CLIENT_ID")?,
            var("GRAPH_CLIENT_SECRET")?,
        ))
    }

    /// Overrides the authority host.
    #[must_use]
    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = authority.into();
        self
    }

    /// Overrides the requested scopes.
    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Token endpoint for this tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if the tenant is empty or the authority is not a URL.
    pub fn token_url(&self) -> Result<Url> {
        if self.tenant_id.trim().is_empty() {
            return Err(Error::InvalidConfig("tenant_id is empty".into()));
        }
        let authority = self.authority.trim_end_matches('/');
        Ok(Url::parse(&format!(
            "{authority}/{}/oauth2/v2.0/token",
            self.tenant_id
        ))?)
    }

    /// Exchanges the client secret for an access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the identity platform
    /// rejects the credentials.
    pub async fn acquire_token(&self, http: &Client) -> Result<Token> {
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err(Error::InvalidConfig(
                "client_id and client_secret are required".into(),
            ));
        }

        let token_url = self.token_url()?;
        let scope = self.scopes.join(" ");

        let mut params = HashMap::new();
        params.insert("grant_type", "client_credentials");
        params.insert("client_id", self.client_id.as_str());
        params.insert("client_secret", self.client_secret.as_str());
        params.insert("scope", scope.as_str());

        debug!(tenant = %self.tenant_id, "requesting client-credentials token");
        let response = http.post(token_url).form(&params).send().await?;

        if !response.status().is_success() {
            let error: ErrorResponse = response.json().await?;
            return Err(error.into_error());
        }

        let token_response: TokenResponse = response.json().await?;
        Token::from_response(token_response, Utc::now())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_token_url() {
        let creds = ClientCredentials::new("contoso", "app", "secret");
        assert_eq!(
            creds.token_url().unwrap().as_str(),
            "https://login.microsoftonline.com/contoso/oauth2/v2.0/token"
        );
    }

    #[test]
    fn test_national_cloud_authority() {
        let creds = ClientCredentials::new("contoso", "app", "secret")
            .with_authority("https://login.microsoftonline.us/");
        assert_eq!(
            creds.token_url().unwrap().as_str(),
            "https://login.microsoftonline.us/contoso/oauth2/v2.0/token"
        );
    }

    #[test]
    fn test_empty_tenant_rejected() {
        let creds = ClientCredentials::new(" ", "app", "secret");
        assert!(matches!(creds.token_url(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_default_scope() {
        let creds = ClientCredentials::new("t", "c", "s");
        assert_eq!(creds.scopes, vec![GRAPH_DEFAULT_SCOPE.to_string()]);
    }

    #[test]
    fn test_debug_hides_secret() {
        let creds = ClientCredentials::new("t", "c", "hunter2");
        assert!(!format!("{creds:?}").contains("hunter2"));
    }

    #[test]
    fn test_missing_secret_fails_before_request() {
        let creds = ClientCredentials::new("t", "c", "");
        let result = tokio_test::block_on(creds.acquire_token(&Client::new()));
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }
}
