//! `cc-slack notify`: post a single hook event read from stdin.
//!
//! For setups without the server: one message per event, no threads, no
//! transcript response, no mention.

use anyhow::Context;
use cc_slack_protocol::HookEvent;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::gateway::ChatGateway;
use crate::message::truncate;
use crate::transcript::scan_transcript;

const PROMPT_MAX_CHARS: usize = 100;

pub fn notify_text(event: &HookEvent, prompt: &str) -> String {
    format!(
        "[{}] {:?}",
        event.hook_event_name,
        truncate(prompt, PROMPT_MAX_CHARS)
    )
}

pub async fn run<R>(mut input: R, gateway: &dyn ChatGateway, channel: &str) -> anyhow::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut data = Vec::new();
    input
        .read_to_end(&mut data)
        .await
        .context("failed to read stdin")?;

    let event: HookEvent =
        serde_json::from_slice(&data).context("failed to parse hook input")?;
    let (prompt, _response) = scan_transcript(&event.transcript_path).await;

    gateway
        .post_message(channel, &notify_text(&event, &prompt), "")
        .await
        .context("failed to send slack message")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use tempfile::NamedTempFile;

    use super::*;
    use crate::gateway::fake::FakeGateway;

    #[tokio::test]
    async fn posts_event_with_last_prompt() {
        let mut transcript = NamedTempFile::new().unwrap();
        writeln!(
            transcript,
            r#"{{"type":"user","message":{{"role":"user","content":"fix the build"}}}}"#
        )
        .unwrap();
        let input = format!(
            r#"{{"hook_event_name":"Stop","transcript_path":{:?}}}"#,
            transcript.path().to_str().unwrap()
        );
        let gateway = FakeGateway::returning("1.1");

        run(input.as_bytes(), &gateway, "C123").await.unwrap();

        let post = gateway.last();
        assert_eq!(post.text, "[Stop] \"fix the build\"");
        assert_eq!(post.channel, "C123");
        assert_eq!(post.thread_anchor, "");
    }

    #[tokio::test]
    async fn missing_transcript_uses_unknown_prompt() {
        let gateway = FakeGateway::returning("1.1");

        run(&br#"{"hook_event_name":"Notification"}"#[..], &gateway, "C1")
            .await
            .unwrap();

        assert_eq!(gateway.last().text, "[Notification] \"(unknown)\"");
    }

    #[tokio::test]
    async fn invalid_input_is_an_error() {
        let gateway = FakeGateway::returning("1.1");

        let err = run(&b"nope"[..], &gateway, "C1").await.unwrap_err();

        assert!(err.to_string().contains("parse hook input"));
        assert!(gateway.posts().is_empty());
    }

    #[tokio::test]
    async fn gateway_failure_is_an_error() {
        let gateway = FakeGateway::failing();

        let err = run(&br#"{"hook_event_name":"Stop"}"#[..], &gateway, "C1")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("send slack message"));
    }
}
