//! Inbound relay: Slack thread replies → tmux.
//!
//! One Socket Mode websocket stays open for the life of the process. Every
//! envelope is acked immediately; each reply event is routed on its own task
//! so a slow `tmux` never stalls the read loop.

use std::sync::Arc;
use std::time::Duration;

use cc_slack_protocol::slack::{EventCallback, SocketAck, SocketEnvelope};
use cc_slack_protocol::SlackEvent;
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};

use crate::gateway::GatewayError;
use crate::mention::strip_mention;
use crate::registry::SessionRegistry;
use crate::slack::SlackClient;
use crate::terminal::TerminalRelay;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("open socket connection: {0}")]
    Open(#[from] GatewayError),

    #[error("websocket: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("websocket handshake timed out after {0:?}")]
    ConnectTimeout(Duration),

    #[error("encode ack: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Why a reply event was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    BotOrSystem,
    NotInThread,
    UnknownThread,
    NoTerminalTarget,
    UnauthorizedSender,
    EmptyText,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    Forwarded { target: String, text: String },
    Skipped(SkipReason),
    /// tmux failed; logged, never retried.
    Failed,
}

/// Decides whether a reply goes to a terminal, and sends it there.
pub struct ReplyRouter {
    registry: Arc<SessionRegistry>,
    terminal: Arc<dyn TerminalRelay>,
    allowed_user: Option<String>,
}

impl ReplyRouter {
    pub fn new(
        registry: Arc<SessionRegistry>,
        terminal: Arc<dyn TerminalRelay>,
        allowed_user: Option<String>,
    ) -> Self {
        Self {
            registry,
            terminal,
            allowed_user,
        }
    }

    pub async fn route(&self, event: &SlackEvent) -> ReplyOutcome {
        let outcome = self.forward(event).await;
        match &outcome {
            ReplyOutcome::Forwarded { target, text } => info!(
                component = "relay",
                event = "relay.forwarded",
                target = %target,
                chars = text.chars().count(),
                "Forwarded Slack reply to tmux"
            ),
            ReplyOutcome::Skipped(reason) => debug!(
                component = "relay",
                event = "relay.skipped",
                reason = ?reason,
                slack_event = %event.event_type,
                "Ignored Slack event"
            ),
            ReplyOutcome::Failed => {}
        }
        outcome
    }

    async fn forward(&self, event: &SlackEvent) -> ReplyOutcome {
        if event.is_bot_or_system() {
            return ReplyOutcome::Skipped(SkipReason::BotOrSystem);
        }

        let Some(thread_anchor) = event.thread_ts.as_deref().filter(|ts| !ts.is_empty()) else {
            return ReplyOutcome::Skipped(SkipReason::NotInThread);
        };

        let target = match self.registry.get_by_thread_anchor(thread_anchor) {
            None => return ReplyOutcome::Skipped(SkipReason::UnknownThread),
            Some(target) if target.is_empty() => {
                return ReplyOutcome::Skipped(SkipReason::NoTerminalTarget)
            }
            Some(target) => target,
        };

        if let Some(allowed) = &self.allowed_user {
            if event.user.as_deref() != Some(allowed.as_str()) {
                return ReplyOutcome::Skipped(SkipReason::UnauthorizedSender);
            }
        }

        let text = strip_mention(event.text.as_deref().unwrap_or_default());
        if text.is_empty() {
            return ReplyOutcome::Skipped(SkipReason::EmptyText);
        }

        if let Err(err) = self.terminal.send_keys(&target, text).await {
            warn!(
                component = "relay",
                event = "relay.send_keys_failed",
                target = %target,
                error = %err,
                "Failed to forward Slack reply to tmux"
            );
            return ReplyOutcome::Failed;
        }

        ReplyOutcome::Forwarded {
            target,
            text: text.to_string(),
        }
    }
}

/// Pull a reply-candidate event (`app_mention` or `message`) out of an
/// `events_api` envelope.
pub fn reply_event(envelope: &SocketEnvelope) -> Option<SlackEvent> {
    if envelope.envelope_type != "events_api" {
        return None;
    }
    let callback: EventCallback = serde_json::from_value(envelope.payload.clone()).ok()?;
    if callback.callback_type != "event_callback" {
        return None;
    }
    match callback.event.event_type.as_str() {
        "app_mention" | "message" => Some(callback.event),
        _ => None,
    }
}

enum SessionEnd {
    /// Slack asked us to reconnect, or the socket closed.
    Closed,
    Shutdown,
}

pub struct InboundRelay {
    router: Arc<ReplyRouter>,
    client: SlackClient,
    app_token: String,
    reconnect_delay: Duration,
}

impl InboundRelay {
    pub fn new(
        router: ReplyRouter,
        client: SlackClient,
        app_token: String,
        reconnect_delay: Duration,
    ) -> Self {
        Self {
            router: Arc::new(router),
            client,
            app_token,
            reconnect_delay,
        }
    }

    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Connect, read until the socket drops, wait `reconnect_delay`, repeat.
    /// Returns once `shutdown` flips to `true`.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            component = "relay",
            event = "relay.started",
            "Socket Mode relay started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.connect_and_read(&mut shutdown).await {
                Ok(SessionEnd::Shutdown) => break,
                Ok(SessionEnd::Closed) => info!(
                    component = "relay",
                    event = "relay.disconnected",
                    "Socket Mode connection closed, reconnecting"
                ),
                Err(err) => warn!(
                    component = "relay",
                    event = "relay.session_failed",
                    error = %err,
                    retry_secs = self.reconnect_delay.as_secs(),
                    "Socket Mode session failed"
                ),
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }

        info!(
            component = "relay",
            event = "relay.stopped",
            "Socket Mode relay stopped"
        );
    }

    async fn connect_and_read(
        &self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<SessionEnd, RelayError> {
        let connect = async {
            let url = self.client.open_socket_connection(&self.app_token).await?;
            let handshake = connect_async(url.as_str());
            let (stream, _response) = tokio::time::timeout(CONNECT_TIMEOUT, handshake)
                .await
                .map_err(|_| RelayError::ConnectTimeout(CONNECT_TIMEOUT))??;
            Ok::<_, RelayError>(stream)
        };
        let stream = tokio::select! {
            stream = connect => stream?,
            _ = shutdown_requested(shutdown) => return Ok(SessionEnd::Shutdown),
        };
        let (mut sink, mut source) = stream.split();
        info!(
            component = "relay",
            event = "relay.connected",
            "Socket Mode connected"
        );

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        let _ = sink.send(WsMessage::Close(None)).await;
                        return Ok(SessionEnd::Shutdown);
                    }
                }
                next = source.next() => {
                    let Some(message) = next else {
                        return Ok(SessionEnd::Closed);
                    };
                    let Some(envelope) = decode_envelope(message?) else {
                        continue;
                    };

                    if let Some(envelope_id) = envelope.envelope_id.as_deref() {
                        let ack = serde_json::to_string(&SocketAck { envelope_id })?;
                        sink.send(WsMessage::Text(ack.into())).await?;
                    }

                    if envelope.envelope_type == "disconnect" {
                        return Ok(SessionEnd::Closed);
                    }

                    if let Some(event) = reply_event(&envelope) {
                        let router = Arc::clone(&self.router);
                        tokio::spawn(async move {
                            router.route(&event).await;
                        });
                    }
                }
            }
        }
    }
}

/// Resolves once `shutdown` is `true` or its sender is gone.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

fn decode_envelope(message: WsMessage) -> Option<SocketEnvelope> {
    let decoded = match &message {
        WsMessage::Text(text) => serde_json::from_str::<SocketEnvelope>(text.as_str()),
        WsMessage::Binary(bytes) => serde_json::from_slice::<SocketEnvelope>(bytes),
        _ => return None,
    };
    match decoded {
        Ok(envelope) => Some(envelope),
        Err(err) => {
            warn!(
                component = "relay",
                event = "relay.decode_failed",
                error = %err,
                "Ignored undecodable Socket Mode frame"
            );
            None
        }
    }
}
