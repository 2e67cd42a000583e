use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use herald_ports::context::Context;
use herald_ports::error::ChatError;
use herald_ports::outbound::ChatApi;
use herald_ports::types::{ChatMessage, MessageRef};

pub const DEFAULT_API_URL: &str = "https://slack.com/api";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct SlackClient {
    http: Client,
    token: String,
    api_url: String,
}

#[derive(Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    attachments: [&'a ChatMessage; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    thread_ts: Option<&'a str>,
}

#[derive(Serialize)]
struct Reaction<'a> {
    channel: &'a str,
    name: &'a str,
    timestamp: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct SlackResponse {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    ts: Option<String>,
}

impl SlackClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            token: token.into(),
            api_url: DEFAULT_API_URL.to_string(),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn call<B: Serialize + Sync>(
        &self,
        ctx: &Context,
        method: &str,
        body: &B,
    ) -> Result<SlackResponse, ChatError> {
        let url = format!("{}/{method}", self.api_url);
        let resp: SlackResponse = ctx
            .run(REQUEST_TIMEOUT, async {
                let response = self
                    .http
                    .post(&url)
                    .bearer_auth(&self.token)
                    .json(body)
                    .send()
                    .await
                    .map_err(|e| ChatError::Transport(e.to_string()))?;

                // refusals mostly come back as 200 with `ok: false`
                let status = response.status();
                let text = response
                    .text()
                    .await
                    .map_err(|e| ChatError::Transport(e.to_string()))?;
                match serde_json::from_str::<SlackResponse>(&text) {
                    Ok(resp) => Ok(resp),
                    Err(_) if !status.is_success() => Err(ChatError::Transport(format!(
                        "{method} returned {status}"
                    ))),
                    Err(e) => Err(ChatError::Transport(format!(
                        "{method} returned an unreadable body: {e}"
                    ))),
                }
            })
            .await?;

        if !resp.ok {
            let code = resp.error.clone().unwrap_or_else(|| "unknown_error".into());
            return Err(ChatError::api(code));
        }
        Ok(resp)
    }
}

#[async_trait]
impl ChatApi for SlackClient {
    async fn post_message(
        &self,
        ctx: &Context,
        channel: &str,
        message: &ChatMessage,
        thread: Option<&str>,
    ) -> Result<String, ChatError> {
        let body = PostMessage {
            channel,
            attachments: [message],
            thread_ts: thread,
        };
        let resp = self.call(ctx, "chat.postMessage", &body).await?;
        resp.ts
            .filter(|ts| !ts.is_empty())
            .ok_or_else(|| ChatError::Transport("chat.postMessage returned no ts".into()))
    }

    async fn add_reaction(
        &self,
        ctx: &Context,
        name: &str,
        item: &MessageRef,
    ) -> Result<(), ChatError> {
        let body = Reaction {
            channel: &item.channel,
            name,
            timestamp: &item.timestamp,
        };
        self.call(ctx, "reactions.add", &body).await.map(|_| ())
    }

    async fn remove_reaction(
        &self,
        ctx: &Context,
        name: &str,
        item: &MessageRef,
    ) -> Result<(), ChatError> {
        let body = Reaction {
            channel: &item.channel,
            name,
            timestamp: &item.timestamp,
        };
        self.call(ctx, "reactions.remove", &body).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_ports::error::Interrupted;
    use mockito::Matcher;
    use serde_json::json;

    fn message() -> ChatMessage {
        ChatMessage {
            color: "danger".into(),
            title: "FIRING: HighLatency".into(),
            text: "*Severity:* critical".into(),
            footer: String::new(),
        }
    }

    fn client(server: &mockito::Server) -> SlackClient {
        SlackClient::new("xoxb-test").with_api_url(server.url())
    }

    #[tokio::test]
    async fn posts_attachment_and_returns_ts() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat.postMessage")
            .match_header("authorization", "Bearer xoxb-test")
            .match_body(Matcher::Json(json!({
                "channel": "C123",
                "attachments": [{
                    "color": "danger",
                    "title": "FIRING: HighLatency",
                    "text": "*Severity:* critical"
                }]
            })))
            .with_status(200)
            .with_body(r#"{"ok":true,"channel":"C123","ts":"1689457043.977957"}"#)
            .create_async()
            .await;

        let ts = client(&server)
            .post_message(&Context::default(), "C123", &message(), None)
            .await
            .unwrap();

        assert_eq!(ts, "1689457043.977957");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn replies_carry_thread_ts() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat.postMessage")
            .match_body(Matcher::PartialJson(json!({"thread_ts": "1689457000.000100"})))
            .with_body(r#"{"ok":true,"ts":"1689457043.000200"}"#)
            .create_async()
            .await;

        let ts = client(&server)
            .post_message(
                &Context::default(),
                "C123",
                &message(),
                Some("1689457000.000100"),
            )
            .await
            .unwrap();

        assert_eq!(ts, "1689457043.000200");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn api_refusal_surfaces_error_code() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat.postMessage")
            .with_body(r#"{"ok":false,"error":"channel_not_found"}"#)
            .create_async()
            .await;

        let err = client(&server)
            .post_message(&Context::default(), "C404", &message(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, ChatError::Api { ref code } if code == "channel_not_found"));
    }

    #[tokio::test]
    async fn http_failure_without_body_is_transport_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat.postMessage")
            .with_status(503)
            .with_body("upstream unavailable")
            .create_async()
            .await;

        let err = client(&server)
            .post_message(&Context::default(), "C123", &message(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, ChatError::Transport(_)));
    }

    #[tokio::test]
    async fn reactions_address_the_message() {
        let mut server = mockito::Server::new_async().await;
        let add = server
            .mock("POST", "/reactions.add")
            .match_body(Matcher::Json(json!({
                "channel": "C123",
                "name": "rotating_light",
                "timestamp": "1689457043.977957"
            })))
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;
        let remove = server
            .mock("POST", "/reactions.remove")
            .with_body(r#"{"ok":false,"error":"no_reaction"}"#)
            .create_async()
            .await;

        let slack = client(&server);
        let item = MessageRef {
            channel: "C123".into(),
            timestamp: "1689457043.977957".into(),
        };
        slack
            .add_reaction(&Context::default(), "rotating_light", &item)
            .await
            .unwrap();
        let err = slack
            .remove_reaction(&Context::default(), "white_check_mark", &item)
            .await
            .unwrap_err();

        assert!(err.is_no_reaction());
        add.assert_async().await;
        remove.assert_async().await;
    }

    #[tokio::test]
    async fn cancelled_context_skips_the_call() {
        let server = mockito::Server::new_async().await;
        let ctx = Context::default();
        ctx.cancel();

        let err = client(&server)
            .post_message(&ctx, "C123", &message(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, ChatError::Interrupted(Interrupted::Cancelled)));
    }
}
