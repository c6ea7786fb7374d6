//! Chat gateway seam.
//!
//! The hook handler and usage report post through this trait so tests can
//! swap in an in-memory fake for the Slack client.

use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by a chat post.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Slack API returned status {0}")]
    Status(u16),

    #[error("Slack API error: {0}")]
    Api(String),

    #[error("Slack API response missing {0}")]
    MissingField(&'static str),
}

#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Post `text` to `channel`. An empty `thread_anchor` starts a new thread.
    /// Returns the platform id of the posted message.
    async fn post_message(
        &self,
        channel: &str,
        text: &str,
        thread_anchor: &str,
    ) -> Result<String, GatewayError>;
}
