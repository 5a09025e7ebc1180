//! Drafts, updates and sends a message from a delegated mailbox.
//!
//! ```sh
//! export GRAPH_TENANT_ID=... GRAPH_CLIENT_ID=... GRAPH_CLIENT_SECRET=...
//! export GRAPH_MAILBOX=reports@contoso.com GRAPH_TO=someone@example.com
//! RUST_LOG=graphmail=debug cargo run --example create_and_send_message
//! ```

use std::sync::Arc;

use anyhow::Context;
use graphmail::{Account, GraphClient, GraphConfig};
use graphmail_oauth::ClientCredentials;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "graphmail=debug,graphmail_oauth=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mailbox = std::env::var("GRAPH_MAILBOX").context("GRAPH_MAILBOX is not set")?;
    let to = std::env::var("GRAPH_TO").context("GRAPH_TO is not set")?;

    let config = GraphConfig::default();
    let credentials = ClientCredentials::from_env()?;
    let client = Arc::new(GraphClient::new(credentials, &config)?);
    let account = Account::for_user(client, &config, mailbox);

    let mut message = account.create_message();
    message.to_recipients_mut().add(to.as_str())?;
    message.set_subject("Test123");
    message.set_body("This is a test.");
    message.save_draft().await?;
    info!(id = ?message.id(), "draft saved");

    message.set_body("This is an update test.");
    message.save_draft().await?;

    message.send().await?;
    info!(state = ?message.state(), "message sent");
    Ok(())
}
