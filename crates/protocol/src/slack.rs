//! Slack Web API and Socket Mode payloads

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `chat.postMessage` request body.
#[derive(Debug, Clone, Serialize)]
pub struct PostMessageRequest<'a> {
    pub channel: &'a str,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<&'a str>,
}

/// `chat.postMessage` response.
#[derive(Debug, Clone, Deserialize)]
pub struct PostMessageResponse {
    pub ok: bool,
    #[serde(default)]
    pub ts: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// `apps.connections.open` response.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenConnectionResponse {
    pub ok: bool,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// A Socket Mode frame. `hello` frames carry no `envelope_id`.
#[derive(Debug, Clone, Deserialize)]
pub struct SocketEnvelope {
    #[serde(default)]
    pub envelope_id: Option<String>,
    #[serde(rename = "type")]
    pub envelope_type: String,
    #[serde(default)]
    pub payload: Value,
}

/// Socket Mode acknowledgement.
#[derive(Debug, Clone, Serialize)]
pub struct SocketAck<'a> {
    pub envelope_id: &'a str,
}

/// Payload of an `events_api` envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct EventCallback {
    #[serde(rename = "type")]
    pub callback_type: String,
    pub event: SlackEvent,
}

/// Inner event of an `event_callback` (we only read `app_mention` and `message`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlackEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub thread_ts: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
    #[serde(default)]
    pub subtype: Option<String>,
}

impl SlackEvent {
    /// Messages posted by a bot (including us) or carrying a platform subtype
    /// (edits, joins, bot_message, ...).
    pub fn is_bot_or_system(&self) -> bool {
        self.bot_id.as_deref().is_some_and(|id| !id.is_empty())
            || self.subtype.as_deref().is_some_and(|s| !s.is_empty())
    }
}
