//! # graphmail-oauth
//!
//! `OAuth2` client-credentials authentication for the Microsoft Graph API.
//!
//! An application registered in a Microsoft Entra tenant exchanges its
//! client id and secret for a bearer token scoped to
//! `https://graph.microsoft.com/.default`. The token is then attached to
//! every Graph request by the transport layer.
//!
//! ## Quick Start
//!
//! ```ignore
//! use graphmail_oauth::ClientCredentials;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let credentials = ClientCredentials::new("tenant-id", "client-id", "secret");
//!     let http = reqwest::Client::new();
//!
//!     let token = credentials.acquire_token(&http).await?;
//!     println!("expires at: {:?}", token.expires_at);
//!     Ok(())
//! }
//! ```
//!
//! Credentials can also be read from `GRAPH_TENANT_ID`, `GRAPH_CLIENT_ID`
//! and `GRAPH_CLIENT_SECRET` with [`ClientCredentials::from_env`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod credentials;
mod error;
pub mod token;

pub use credentials::{ClientCredentials, DEFAULT_AUTHORITY, GRAPH_DEFAULT_SCOPE};
pub use error::{Error, Result};
pub use token::Token;
