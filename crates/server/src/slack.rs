//! Slack Web API client: `chat.postMessage` for the gateway and
//! `apps.connections.open` for the Socket Mode relay.

use std::time::Duration;

use async_trait::async_trait;
use cc_slack_protocol::slack::{OpenConnectionResponse, PostMessageRequest, PostMessageResponse};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};

use crate::gateway::{ChatGateway, GatewayError};

pub const DEFAULT_API_BASE: &str = "https://slack.com/api";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct SlackClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
}

impl SlackClient {
    pub fn new(api_base: &str, bot_token: &str) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("cc-slack"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token: bot_token.trim().to_string(),
        })
    }

    /// Ask Slack for a Socket Mode websocket URL (needs the app-level token).
    pub async fn open_socket_connection(&self, app_token: &str) -> Result<String, GatewayError> {
        let resp = self
            .http
            .post(format!("{}/apps.connections.open", self.api_base))
            .bearer_auth(app_token.trim())
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(GatewayError::Status(status.as_u16()));
        }

        let body: OpenConnectionResponse = resp.json().await?;
        if !body.ok {
            return Err(GatewayError::Api(
                body.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        body.url
            .filter(|url| !url.trim().is_empty())
            .ok_or(GatewayError::MissingField("url"))
    }
}

#[async_trait]
impl ChatGateway for SlackClient {
    async fn post_message(
        &self,
        channel: &str,
        text: &str,
        thread_anchor: &str,
    ) -> Result<String, GatewayError> {
        let payload = PostMessageRequest {
            channel,
            text,
            thread_ts: Some(thread_anchor).filter(|ts| !ts.is_empty()),
        };

        let resp = self
            .http
            .post(format!("{}/chat.postMessage", self.api_base))
            .bearer_auth(&self.bot_token)
            .json(&payload)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(GatewayError::Status(status.as_u16()));
        }

        let body: PostMessageResponse = resp.json().await?;
        if !body.ok {
            return Err(GatewayError::Api(
                body.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        Ok(body.ts.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn successful_post_returns_ts() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/chat.postMessage")
                    .header("authorization", "Bearer xoxb-test")
                    .json_body(json!({"channel": "C123", "text": "hello"}));
                then.status(200)
                    .json_body(json!({"ok": true, "ts": "1234567890.123456"}));
            })
            .await;

        let client = SlackClient::new(&server.base_url(), "xoxb-test").unwrap();
        let ts = client.post_message("C123", "hello", "").await.unwrap();

        assert_eq!(ts, "1234567890.123456");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn thread_reply_sends_thread_ts() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/chat.postMessage").json_body(json!({
                    "channel": "C123",
                    "text": "reply",
                    "thread_ts": "111.222"
                }));
                then.status(200).json_body(json!({"ok": true, "ts": "333.444"}));
            })
            .await;

        let client = SlackClient::new(&server.base_url(), "xoxb-test").unwrap();
        let ts = client.post_message("C123", "reply", "111.222").await.unwrap();

        assert_eq!(ts, "333.444");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn api_error_is_surfaced() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat.postMessage");
                then.status(200)
                    .json_body(json!({"ok": false, "error": "channel_not_found"}));
            })
            .await;

        let client = SlackClient::new(&server.base_url(), "xoxb-test").unwrap();
        let err = client.post_message("C999", "x", "").await.unwrap_err();

        assert!(matches!(err, GatewayError::Api(ref e) if e == "channel_not_found"));
    }

    #[tokio::test]
    async fn http_error_status_is_surfaced() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat.postMessage");
                then.status(500);
            })
            .await;

        let client = SlackClient::new(&server.base_url(), "xoxb-test").unwrap();
        let err = client.post_message("C123", "x", "").await.unwrap_err();

        assert!(matches!(err, GatewayError::Status(500)));
    }

    #[tokio::test]
    async fn opens_socket_connection_with_app_token() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/apps.connections.open")
                    .header("authorization", "Bearer xapp-test");
                then.status(200)
                    .json_body(json!({"ok": true, "url": "wss://example.test/link"}));
            })
            .await;

        let client = SlackClient::new(&server.base_url(), "xoxb-test").unwrap();
        let url = client.open_socket_connection("xapp-test").await.unwrap();

        assert_eq!(url, "wss://example.test/link");
        mock.assert_async().await;
    }
}
