//! HTTP hook handler for Claude Code hooks.
//!
//! The hook script POSTs the raw hook JSON to `/hook`. The first successful
//! post for a session starts a Slack thread; later events for the same
//! session reply inside it.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{Method, StatusCode};
use axum::routing::{any, get};
use axum::Router;
use cc_slack_protocol::HookEvent;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::gateway::{ChatGateway, GatewayError};
use crate::mention::{resolve_mention_target, with_mention};
use crate::message::build_message;
use crate::registry::SessionRegistry;
use crate::transcript::scan_transcript;

pub struct HookState {
    pub registry: Arc<SessionRegistry>,
    pub gateway: Arc<dyn ChatGateway>,
    pub channel: String,
    /// Explicit user to mention; empty means "DM recipient or nobody".
    pub mention_user_id: String,
    /// Wait before reading the transcript so Claude can finish flushing it.
    pub grace: Duration,
}

pub fn router(state: Arc<HookState>) -> Router {
    Router::new()
        .route("/hook", any(hook_handler))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

/// Handler for `/hook`.
///
/// The work runs in its own task: a client that disconnects mid-request
/// does not cut the grace wait or the Slack post short.
pub async fn hook_handler(
    State(state): State<Arc<HookState>>,
    method: Method,
    body: Bytes,
) -> StatusCode {
    if method != Method::POST {
        return StatusCode::METHOD_NOT_ALLOWED;
    }

    let event: HookEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(err) => {
            warn!(
                component = "hook",
                event = "hook.decode_failed",
                error = %err,
                "Rejected undecodable hook payload"
            );
            return StatusCode::BAD_REQUEST;
        }
    };

    let request_id = Uuid::new_v4().to_string();
    let task = tokio::spawn(async move { ingest(&state, event, &request_id).await });

    match task.await {
        Ok(Ok(())) => StatusCode::OK,
        Ok(Err(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        Err(err) => {
            error!(
                component = "hook",
                event = "hook.task_failed",
                error = %err,
                "Hook task panicked"
            );
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Read transcript, resolve thread, format, post, then record the anchor.
///
/// Two concurrent first events for one session can both see no anchor and
/// both start a thread; the later `set` wins.
async fn ingest(state: &HookState, event: HookEvent, request_id: &str) -> Result<(), GatewayError> {
    if !state.grace.is_zero() {
        tokio::time::sleep(state.grace).await;
    }

    let (prompt, response) = scan_transcript(&event.transcript_path).await;
    let existing_anchor = state.registry.get(&event.session_id);
    let is_reply = existing_anchor.is_some();

    let mut text = build_message(&event, &prompt, &response, is_reply);
    if let Some(user) = resolve_mention_target(&state.mention_user_id, &state.channel) {
        text = with_mention(user, &text);
    }

    let thread_anchor = existing_anchor.as_deref().unwrap_or_default();
    let new_anchor = match state
        .gateway
        .post_message(&state.channel, &text, thread_anchor)
        .await
    {
        Ok(anchor) => anchor,
        Err(err) => {
            error!(
                component = "hook",
                event = "hook.post_failed",
                request_id = %request_id,
                session_id = %event.session_id,
                hook_event = %event.hook_event_name,
                error = %err,
                "Slack post failed"
            );
            return Err(err);
        }
    };

    if is_reply {
        debug!(
            component = "hook",
            event = "hook.replied",
            request_id = %request_id,
            session_id = %event.session_id,
            hook_event = %event.hook_event_name,
            thread_anchor = %thread_anchor,
            "Posted thread reply"
        );
        return Ok(());
    }

    if !event.session_id.is_empty() && !new_anchor.is_empty() {
        state
            .registry
            .set(&event.session_id, &new_anchor, &event.terminal_target);
    }
    info!(
        component = "hook",
        event = "hook.thread_started",
        request_id = %request_id,
        session_id = %event.session_id,
        hook_event = %event.hook_event_name,
        thread_anchor = %new_anchor,
        has_terminal_target = !event.terminal_target.is_empty(),
        "Started Slack thread"
    );
    Ok(())
}
